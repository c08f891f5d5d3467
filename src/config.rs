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

use std::{
    fs::{create_dir_all, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{error::ZoomResult, zoom::ContinuousTransformType};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ZoomConfig {
    pub rubber_band_ratio: f64,
    pub rubber_band_damping: f64,
    pub scales_multiple: f64,
    pub three_step_scale: bool,
    pub rubber_band_scale: bool,
    pub limit_offset_within_base_visible_rect: bool,
    pub read_mode_same_direction_multiple: f64,
    pub read_mode_not_same_direction_multiple: f64,
    pub animation_duration_ms: u64,
    /// Exponential decay of the fling velocity, per second
    pub fling_friction: f64,
    /// Velocities (px/s) below this value do not start a fling
    pub fling_min_velocity: f64,
    pub keep_transform_when_same_aspect_ratio_content_size_changed: bool,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            rubber_band_ratio: 2.0,
            rubber_band_damping: 0.5,
            scales_multiple: 3.0,
            three_step_scale: false,
            rubber_band_scale: true,
            limit_offset_within_base_visible_rect: false,
            read_mode_same_direction_multiple: 2.5,
            read_mode_not_same_direction_multiple: 5.0,
            animation_duration_ms: 300,
            fling_friction: 4.0,
            fling_min_velocity: 50.0,
            keep_transform_when_same_aspect_ratio_content_size_changed: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SubsamplingConfig {
    pub single_direction_max_tiles: u32,
    pub decode_threads: usize,
    pub tile_animation_duration_ms: u64,
    pub disabled_background_tiles: bool,
    /// Bit set of [`ContinuousTransformType`] flags during which tile loading pauses
    pub paused_continuous_transform_types: u32,
    pub disabled_tile_bitmap_cache: bool,
    pub disabled_tile_bitmap_reuse: bool,
    pub tile_bitmap_cache_max_bytes: usize,
    pub aspect_ratio_max_difference: f64,
    pub decoder_backend: String,
}

impl Default for SubsamplingConfig {
    fn default() -> Self {
        Self {
            single_direction_max_tiles: 50,
            decode_threads: 2,
            tile_animation_duration_ms: 200,
            disabled_background_tiles: false,
            paused_continuous_transform_types: ContinuousTransformType::GESTURE
                | ContinuousTransformType::FLING,
            disabled_tile_bitmap_cache: false,
            disabled_tile_bitmap_reuse: false,
            tile_bitmap_cache_max_bytes: 64 * 1024 * 1024,
            aspect_ratio_max_difference: 0.5,
            decoder_backend: "image-rs".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub zoom: ZoomConfig,
    pub subsampling: SubsamplingConfig,
}

impl Config {
    fn config_dir() -> PathBuf {
        let mut dir = dirs::config_dir().unwrap_or_default();
        dir.push("zoomtile");
        dir
    }

    pub fn config_file() -> PathBuf {
        Self::config_dir().join("zoomtile.json")
    }

    pub fn load(path: &Path) -> ZoomResult<Self> {
        let file = File::open(path)?;
        let config: Config = serde_json::from_reader(file)?;
        log::debug!("Read configuration from {path:?}");
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> ZoomResult<()> {
        if let Some(dir) = path.parent() {
            create_dir_all(dir)?;
        }
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}
