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
    config::ZoomConfig,
    rect::SizeD,
    zoom::{
        calculate::{calculate_base_transform, Placement},
        content::{Alignment, AxisAlignment, ContentScale},
        transform::Transform,
    },
};

/// Which long images read mode applies to
#[derive(Default, Debug, Eq, PartialEq, Hash, Clone, Copy)]
pub enum ReadModeSizeType {
    Horizontal,
    Vertical,
    #[default]
    Both,
}

/// Decides whether content is long enough, compared to the container, to be
/// displayed in read mode.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct LongImageDecider {
    /// Required ratio of aspect ratios when content and container have the same orientation
    pub same_direction_multiple: f64,
    /// Required ratio of aspect ratios when their orientations differ
    pub not_same_direction_multiple: f64,
}

impl Default for LongImageDecider {
    fn default() -> Self {
        Self::from(&ZoomConfig::default())
    }
}

impl From<&ZoomConfig> for LongImageDecider {
    fn from(config: &ZoomConfig) -> Self {
        Self::new(
            config.read_mode_same_direction_multiple,
            config.read_mode_not_same_direction_multiple,
        )
    }
}

impl LongImageDecider {
    pub fn new(same_direction_multiple: f64, not_same_direction_multiple: f64) -> Self {
        Self {
            same_direction_multiple,
            not_same_direction_multiple,
        }
    }

    pub fn is_long_image(&self, content: SizeD, container: SizeD) -> bool {
        if content.is_empty() || container.is_empty() {
            return false;
        }
        let content_ratio = content.width() / content.height();
        let container_ratio = container.width() / container.height();
        let same_direction = (content_ratio >= 1.0) == (container_ratio >= 1.0);
        let multiple = if same_direction {
            self.same_direction_multiple
        } else {
            self.not_same_direction_multiple
        };
        content_ratio.max(container_ratio) / content_ratio.min(container_ratio) >= multiple
    }
}

/// Displays long images filling the container across their short axis,
/// starting at the beginning of the long axis.
#[derive(Debug, Default, PartialEq, Clone, Copy)]
pub struct ReadMode {
    pub size_type: ReadModeSizeType,
    pub decider: LongImageDecider,
}

impl ReadMode {
    pub fn new(size_type: ReadModeSizeType, decider: LongImageDecider) -> Self {
        Self { size_type, decider }
    }

    /// `content` is the rotated content size
    pub fn accept(&self, content: SizeD, container: SizeD) -> bool {
        let horizontal = content.width() > content.height();
        let size_type_ok = match self.size_type {
            ReadModeSizeType::Horizontal => horizontal,
            ReadModeSizeType::Vertical => !horizontal,
            ReadModeSizeType::Both => true,
        };
        size_type_ok && self.decider.is_long_image(content, container)
    }
}

/// Initial user transform for read mode, `None` when read mode does not apply.
pub fn calculate_read_mode_user_transform(
    placement: &Placement,
    read_mode: Option<&ReadMode>,
) -> Option<Transform> {
    let read_mode = read_mode?;
    if placement.is_empty() || placement.content_scale == ContentScale::FillBounds {
        return None;
    }
    let rotated = placement.rotated_content();
    if !read_mode.accept(rotated, placement.container) {
        return None;
    }
    let horizontal = rotated.width() > rotated.height();
    let long_axis = if placement.alignment.axis(horizontal).is_end() {
        AxisAlignment::End
    } else {
        AxisAlignment::Start
    };
    let alignment = match (horizontal, long_axis) {
        (true, AxisAlignment::End) => Alignment::CenterEnd,
        (true, _) => Alignment::CenterStart,
        (false, AxisAlignment::End) => Alignment::BottomCenter,
        (false, _) => Alignment::TopCenter,
    };
    let read_placement = Placement {
        content_scale: ContentScale::Crop,
        alignment,
        ..*placement
    };
    let base = calculate_base_transform(placement);
    let read = calculate_base_transform(&read_placement);
    Some(read.minus(&base))
}
