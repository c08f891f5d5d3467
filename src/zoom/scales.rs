// ZoomTile -- Tile-based subsampling and zoom engine for huge images, written in Rust
//
// Copyright (c) 2024-2025 Martin van der Werff <github (at) newinnovations.nl>
//
// This file is part of ZoomTile.
//
// ZoomTile is free software: you can redistribute it and/or modify it under the terms of
// the GNU Affero General Public License as published by the Free Software Foundation, either
// version 3 of the License, or (at your option) any later version.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS" AND ANY EXPRESS OR
// IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND
// FITNESS FOR A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE AUTHOR BE LIABLE FOR ANY
// DIRECT, INDIRECT, INCIDENTAL, SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT
// LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR PROFITS; OR
// BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY, WHETHER IN CONTRACT,
// STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

use crate::{
    rect::SizeD,
    zoom::{
        calculate::{calculate_base_transform, Placement},
        content::ContentScale,
    },
};

/// Strategy for the minimum, medium and maximum scale
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ScalesCalculator {
    /// Medium scale adapts to the content (fill, 1:1 origin, read mode)
    Dynamic { multiple: f64 },
    /// Medium and maximum are fixed multiples of the minimum
    Fixed { multiple: f64 },
}

impl Default for ScalesCalculator {
    fn default() -> Self {
        Self::Dynamic { multiple: 3.0 }
    }
}

/// Final (base times user) scale bounds
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Scales {
    pub min: f64,
    pub medium: f64,
    pub max: f64,
}

impl Default for Scales {
    fn default() -> Self {
        Self {
            min: 1.0,
            medium: 1.0,
            max: 1.0,
        }
    }
}

impl ScalesCalculator {
    /// Computes the scale bounds.
    ///
    /// # Arguments
    /// * `placement` - Container, content, content scale, alignment and rotation
    /// * `content_origin` - Size of the original image, empty if unknown
    /// * `initial_user_scale` - User scale read mode starts at, 1.0 without read mode
    pub fn calculate(
        &self,
        placement: &Placement,
        content_origin: SizeD,
        initial_user_scale: f64,
    ) -> Scales {
        if placement.is_empty() {
            return Scales::default();
        }
        let min = calculate_base_transform(placement).scale.x;
        let (medium, max) = match *self {
            ScalesCalculator::Dynamic { multiple } => {
                let rotated = placement.rotated_content();
                let fill = if placement.content_scale == ContentScale::FillBounds {
                    0.0
                } else {
                    ContentScale::Crop
                        .compute_scale_factor(rotated, placement.container)
                        .x
                };
                let origin = if content_origin.is_empty() {
                    0.0
                } else {
                    content_origin.width() / placement.content.width()
                };
                let read_mode = min * initial_user_scale;
                let medium = (min * multiple).max(fill).max(origin).max(read_mode);
                (medium, medium * multiple)
            }
            ScalesCalculator::Fixed { multiple } => {
                let medium = min * multiple;
                (medium, medium * multiple)
            }
        };
        let medium = medium.max(min);
        Scales {
            min,
            medium,
            max: max.max(medium),
        }
    }
}
