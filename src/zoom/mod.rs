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

pub mod animation;
pub mod calculate;
pub mod content;
pub mod read_mode;
pub mod scales;
pub mod transform;
mod zoomable;

use crate::{
    rect::{RectD, SizeD},
    zoom::{calculate::ScrollEdge, transform::Transform},
};

pub use zoomable::ZoomableCore;

/// Bit flags describing what is currently changing the transform
pub struct ContinuousTransformType;

impl ContinuousTransformType {
    pub const NONE: u32 = 0;
    pub const SCALE: u32 = 1;
    pub const OFFSET: u32 = 1 << 1;
    pub const LOCATE: u32 = 1 << 2;
    pub const GESTURE: u32 = 1 << 3;
    pub const FLING: u32 = 1 << 4;

    pub fn name(transform_type: u32) -> String {
        if transform_type == Self::NONE {
            return "NONE".to_string();
        }
        [
            (Self::SCALE, "SCALE"),
            (Self::OFFSET, "OFFSET"),
            (Self::LOCATE, "LOCATE"),
            (Self::GESTURE, "GESTURE"),
            (Self::FLING, "FLING"),
        ]
        .iter()
        .filter(|(flag, _)| transform_type & flag != 0)
        .map(|(_, name)| *name)
        .collect::<Vec<_>>()
        .join("|")
    }
}

/// Snapshot of the zoomable published to observers after every change
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ZoomableState {
    pub container_size: SizeD,
    pub content_size: SizeD,
    pub content_origin_size: SizeD,
    pub rotation: i32,
    pub base_transform: Transform,
    pub user_transform: Transform,
    pub transform: Transform,
    pub min_scale: f64,
    pub medium_scale: f64,
    pub max_scale: f64,
    pub content_display_rect: RectD,
    pub content_visible_rect: RectD,
    pub user_offset_bounds: RectD,
    pub scroll_edge: ScrollEdge,
    pub continuous_transform_type: u32,
}

impl ZoomableState {
    /// Container and content are both known
    pub fn is_ready(&self) -> bool {
        !self.container_size.is_empty() && !self.content_size.is_empty()
    }
}
