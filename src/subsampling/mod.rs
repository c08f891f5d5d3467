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

pub mod cache;
pub mod core;
pub mod decoder;
pub mod exif;
pub mod grid;
pub mod image_rs;
pub mod manager;
pub mod source;
pub mod tile;

use crate::{
    rect::{RectI, SizeI},
    subsampling::{source::ImageInfo, tile::TileSnapshot},
};

pub use self::core::{SubsamplingCore, ZoomableBridge};

/// Published after every change of the subsampling state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubsamplingState {
    pub ready: bool,
    pub image_info: Option<ImageInfo>,
    pub foreground_tiles: Vec<TileSnapshot>,
    pub background_tiles: Vec<TileSnapshot>,
    pub sample_size: u32,
    pub image_load_rect: RectI,
    /// (sample size, columns x rows), coarsest first
    pub tile_grid_size_map: Vec<(u32, SizeI)>,
}

impl SubsamplingState {
    pub fn loaded_count(&self) -> usize {
        self.foreground_tiles
            .iter()
            .filter(|tile| tile.state == tile::TileState::Loaded)
            .count()
    }
}
