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

use std::fmt::Display;

use crate::rect::{PointI, RectD, RectI, SizeI};

/// Nearest power of two to `scale` on a log2 scale, at least 1
pub fn closest_power_of_two(scale: f64) -> u32 {
    if scale.is_nan() || scale <= 1.0 {
        return 1;
    }
    let exponent = scale.log2().round().clamp(0.0, 30.0) as u32;
    1 << exponent
}

/// Sample size at which decoded tiles match the on-screen resolution of a
/// thumbnail displayed at `scale`. Returns 0 when subsampling is not usable.
pub fn find_sample_size(image: SizeI, thumbnail: SizeI, scale: f64) -> u32 {
    if image.is_empty() || thumbnail.is_empty() || scale.is_nan() || scale <= 0.0 {
        return 0;
    }
    let x = image.width() as f64 / (thumbnail.width() as f64 * scale);
    let y = image.height() as f64 / (thumbnail.height() as f64 * scale);
    closest_power_of_two(x.min(y))
}

pub fn calculate_preferred_tile_size(container: SizeI) -> SizeI {
    SizeI::new(container.width() / 2, container.height() / 2)
}

/// Whether `new` should replace `old` as the preferred tile size. Small
/// container changes keep the old grid.
pub fn check_new_preferred_tile_size(old: SizeI, new: SizeI) -> bool {
    if old.is_empty() {
        return !new.is_empty();
    }
    let changed = |old: i32, new: i32| (new - old).abs() as f64 / old as f64 >= 0.5;
    changed(old.width(), new.width()) || changed(old.height(), new.height())
}

/// Upper bound for the grid: the long axis gets `single_direction_max_tiles`,
/// the short axis proportionally fewer.
///
/// # Panics
/// Panics if `single_direction_max_tiles` is zero.
pub fn calculate_max_grid_size(image: SizeI, single_direction_max_tiles: u32) -> SizeI {
    assert!(
        single_direction_max_tiles > 0,
        "single_direction_max_tiles must be greater than 0"
    );
    let max = single_direction_max_tiles as i32;
    if image.is_empty() {
        return SizeI::new(max, max);
    }
    let (width, height) = (image.width() as f64, image.height() as f64);
    if width >= height {
        let rows = (max as f64 * height / width).round() as i32;
        SizeI::new(max, rows.max(1))
    } else {
        let cols = (max as f64 * width / height).round() as i32;
        SizeI::new(cols.max(1), max)
    }
}

fn axis_grid_size(image: i32, preferred: i32, sample_size: i32, max: i32) -> i32 {
    let sampled = (image + sample_size - 1) / sample_size;
    let count = (sampled + preferred - 1) / preferred.max(1);
    let mut count = count.clamp(1, max.max(1));
    // with ceil-sized tiles a large count can leave the last tile empty
    while count > 1 && (count - 1) * ((image + count - 1) / count) >= image {
        count -= 1;
    }
    count
}

/// Columns x rows for one sample size
pub fn calculate_grid_size(
    image: SizeI,
    preferred: SizeI,
    sample_size: u32,
    max_grid: SizeI,
) -> SizeI {
    if image.is_empty() || preferred.is_empty() || sample_size == 0 {
        return SizeI::new(1, 1);
    }
    let sample_size = sample_size as i32;
    SizeI::new(
        axis_grid_size(image.width(), preferred.width(), sample_size, max_grid.width()),
        axis_grid_size(
            image.height(),
            preferred.height(),
            sample_size,
            max_grid.height(),
        ),
    )
}

/// Grid position and source rectangle of one tile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileSpec {
    pub coordinate: PointI,
    pub src_rect: RectI,
    pub sample_size: u32,
}

/// Splits the image into `grid` tiles, row-major. Tiles are `ceil(w / cols)`
/// wide; the last column takes what remains.
pub fn calculate_tiles(image: SizeI, grid: SizeI, sample_size: u32) -> Vec<TileSpec> {
    if image.is_empty() || grid.is_empty() {
        return Vec::new();
    }
    let (cols, rows) = (grid.width(), grid.height());
    let tile_width = (image.width() + cols - 1) / cols;
    let tile_height = (image.height() + rows - 1) / rows;
    let mut tiles = Vec::with_capacity((cols * rows) as usize);
    for row in 0..rows {
        let y0 = row * tile_height;
        let y1 = if row == rows - 1 {
            image.height()
        } else {
            (y0 + tile_height).min(image.height())
        };
        for col in 0..cols {
            let x0 = col * tile_width;
            let x1 = if col == cols - 1 {
                image.width()
            } else {
                (x0 + tile_width).min(image.width())
            };
            tiles.push(TileSpec {
                coordinate: PointI::new(col, row),
                src_rect: RectI::new(x0, y0, x1, y1),
                sample_size,
            });
        }
    }
    tiles
}

/// The tiles of one sample size
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid {
    pub sample_size: u32,
    pub grid_size: SizeI,
    pub tiles: Vec<TileSpec>,
}

/// Grids for every sample size, coarsest first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileGridMap {
    grids: Vec<TileGrid>,
}

impl TileGridMap {
    pub fn get(&self, sample_size: u32) -> Option<&TileGrid> {
        self.grids.iter().find(|g| g.sample_size == sample_size)
    }

    pub fn grids(&self) -> &[TileGrid] {
        &self.grids
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }

    /// (sample size, grid size) pairs, coarsest first
    pub fn grid_sizes(&self) -> Vec<(u32, SizeI)> {
        self.grids
            .iter()
            .map(|g| (g.sample_size, g.grid_size))
            .collect()
    }
}

impl Display for TileGridMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let grids = self
            .grids
            .iter()
            .map(|g| {
                format!(
                    "{}:{}:{}x{}",
                    g.sample_size,
                    g.tiles.len(),
                    g.grid_size.width(),
                    g.grid_size.height()
                )
            })
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "[{grids}]")
    }
}

/// One grid per sample size 1, 2, 4, ... up to the first single-tile grid
pub fn calculate_tile_grid_map(
    image: SizeI,
    preferred: SizeI,
    single_direction_max_tiles: u32,
) -> TileGridMap {
    if image.is_empty() || preferred.is_empty() {
        return TileGridMap::default();
    }
    let max_grid = calculate_max_grid_size(image, single_direction_max_tiles);
    let mut grids = Vec::new();
    let mut sample_size = 1u32;
    loop {
        let grid_size = calculate_grid_size(image, preferred, sample_size, max_grid);
        grids.push(TileGrid {
            sample_size,
            grid_size,
            tiles: calculate_tiles(image, grid_size, sample_size),
        });
        if grid_size.width() * grid_size.height() <= 1 || sample_size >= 1 << 30 {
            break;
        }
        sample_size *= 2;
    }
    grids.reverse();
    TileGridMap { grids }
}

/// Visible part of the content mapped into image pixels, padded by half a
/// preferred tile on every side and clamped to the image.
pub fn calculate_image_load_rect(
    image: SizeI,
    content: SizeI,
    preferred: SizeI,
    content_visible_rect: RectD,
) -> RectI {
    if image.is_empty() || content.is_empty() || preferred.is_empty() {
        return RectI::default();
    }
    if content_visible_rect.is_empty() {
        return RectI::default();
    }
    let scale_x = image.width() as f64 / content.width() as f64;
    let scale_y = image.height() as f64 / content.height() as f64;
    let (x0, y0, x1, y1) = RectD::new(
        content_visible_rect.x0 * scale_x,
        content_visible_rect.y0 * scale_y,
        content_visible_rect.x1 * scale_x,
        content_visible_rect.y1 * scale_y,
    )
    .round();
    let (pad_x, pad_y) = (preferred.width() / 2, preferred.height() / 2);
    RectI::new(
        (x0 - pad_x).max(0),
        (y0 - pad_y).max(0),
        (x1 + pad_x).min(image.width()),
        (y1 + pad_y).min(image.height()),
    )
}

/// Tiles only line up with the thumbnail when both have the same shape
pub fn can_use_subsampling_by_aspect_ratio(
    image: SizeI,
    content: SizeI,
    max_difference: f64,
) -> bool {
    if image.is_empty() || content.is_empty() {
        return false;
    }
    (image.aspect_ratio() - content.aspect_ratio()).abs() <= max_difference
}

pub fn is_support_subsampling_mime(mime_type: &str) -> bool {
    matches!(mime_type, "image/jpeg" | "image/png" | "image/webp")
}
