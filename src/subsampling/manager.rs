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

use std::{collections::HashMap, sync::Arc, time::Duration};

use crate::{
    config::SubsamplingConfig,
    decode_thread::{
        model::{DecodeCommand, DecodeContext, DecodeReply, DecodeReplyMessage},
        DecodeThreadSender,
    },
    rect::{PointI, RectI, SizeI},
    subsampling::{
        grid::{
            calculate_image_load_rect, calculate_preferred_tile_size, calculate_tile_grid_map,
            check_new_preferred_tile_size, find_sample_size, TileGridMap,
        },
        tile::{Tile, TileSnapshot, TileState},
    },
    zoom::ZoomableState,
};

/// Keeps exactly the tiles needed for the current view decoded.
///
/// Foreground tiles are the grid of the current sample size; those that
/// intersect the image load rect are loaded, the rest freed. Background
/// tiles are loaded tiles of other sample sizes kept to fill the gaps until
/// the foreground has caught up.
pub struct TileManager {
    config: SubsamplingConfig,
    context: Arc<DecodeContext>,
    sender: DecodeThreadSender,
    content_size: SizeI,
    preferred_tile_size: SizeI,
    grid_map: TileGridMap,
    tiles: HashMap<u32, Vec<Tile>>,
    sample_size: u32,
    image_load_rect: RectI,
    background: Vec<(u32, usize)>,
    next_request_id: u64,
}

impl TileManager {
    pub fn new(
        config: SubsamplingConfig,
        context: Arc<DecodeContext>,
        sender: DecodeThreadSender,
        content_size: SizeI,
    ) -> Self {
        Self {
            config,
            context,
            sender,
            content_size,
            preferred_tile_size: SizeI::default(),
            grid_map: TileGridMap::default(),
            tiles: HashMap::new(),
            sample_size: 0,
            image_load_rect: RectI::default(),
            background: Vec::new(),
            next_request_id: 1,
        }
    }

    fn image_size(&self) -> SizeI {
        self.context.image_info.size
    }

    pub fn sample_size(&self) -> u32 {
        self.sample_size
    }

    pub fn image_load_rect(&self) -> RectI {
        self.image_load_rect
    }

    pub fn preferred_tile_size(&self) -> SizeI {
        self.preferred_tile_size
    }

    pub fn grid_map(&self) -> &TileGridMap {
        &self.grid_map
    }

    pub fn foreground_tiles(&self) -> &[Tile] {
        self.tiles
            .get(&self.sample_size)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn background_tiles(&self) -> Vec<&Tile> {
        self.background
            .iter()
            .filter_map(|(sample_size, index)| self.tiles.get(sample_size)?.get(*index))
            .collect()
    }

    pub fn foreground_snapshots(&self) -> Vec<TileSnapshot> {
        self.foreground_tiles().iter().map(Tile::snapshot).collect()
    }

    pub fn background_snapshots(&self) -> Vec<TileSnapshot> {
        self.background_tiles()
            .into_iter()
            .map(Tile::snapshot)
            .collect()
    }

    fn free_all(&mut self) {
        let allocator = self.context.allocator.clone();
        for tile in self.tiles.values_mut().flatten() {
            tile.free(allocator.as_deref());
        }
        self.background.clear();
    }

    fn rebuild_grid(&mut self, preferred_tile_size: SizeI) {
        self.free_all();
        self.preferred_tile_size = preferred_tile_size;
        self.grid_map = calculate_tile_grid_map(
            self.image_size(),
            preferred_tile_size,
            self.config.single_direction_max_tiles,
        );
        self.tiles = self
            .grid_map
            .grids()
            .iter()
            .map(|grid| (grid.sample_size, grid.tiles.iter().map(Tile::new).collect()))
            .collect();
        self.sample_size = 0;
        log::debug!(
            "Tile grid for {} {} preferred tile {:?}: {}",
            self.context.image_key,
            self.context.image_info,
            preferred_tile_size,
            self.grid_map
        );
    }

    /// Brings the tiles in line with `state`. Returns true when anything
    /// visible changed.
    pub fn refresh(&mut self, state: &ZoomableState) -> bool {
        let container = SizeI::new(
            state.container_size.width().round() as i32,
            state.container_size.height().round() as i32,
        );
        let preferred = calculate_preferred_tile_size(container);
        if preferred.is_empty() {
            return false;
        }
        let mut changed = false;
        if check_new_preferred_tile_size(self.preferred_tile_size, preferred) {
            self.rebuild_grid(preferred);
            changed = true;
        }

        if state.continuous_transform_type & self.config.paused_continuous_transform_types != 0 {
            log::trace!("Tile loading paused during continuous transform");
            return changed;
        }

        let sample_size = find_sample_size(
            self.image_size(),
            self.content_size,
            state.transform.scale_x(),
        );
        // Beyond the coarsest grid the thumbnail is good enough
        let sample_size = match self.grid_map.grids().first() {
            Some(coarsest) if sample_size > 0 => sample_size.min(coarsest.sample_size),
            _ => 0,
        };
        let image_load_rect = calculate_image_load_rect(
            self.image_size(),
            self.content_size,
            self.preferred_tile_size,
            state.content_visible_rect,
        );
        if sample_size != self.sample_size || image_load_rect != self.image_load_rect {
            log::trace!(
                "Tiles at sample size {} for load rect {}",
                sample_size,
                image_load_rect
            );
            changed = true;
        }
        self.sample_size = sample_size;
        self.image_load_rect = image_load_rect;

        self.load_foreground();
        self.update_background();
        changed
    }

    fn load_foreground(&mut self) {
        let load_rect = self.image_load_rect;
        let allocator = self.context.allocator.clone();
        let Some(tiles) = self.tiles.get_mut(&self.sample_size) else {
            return;
        };
        for tile in tiles.iter_mut() {
            if !tile.src_rect.overlaps(&load_rect) {
                tile.free(allocator.as_deref());
            } else if tile.state() == TileState::None {
                let request_id = self.next_request_id;
                self.next_request_id += 1;
                let cancel = tile.start_loading(request_id);
                self.sender.send(DecodeCommand {
                    request_id,
                    coordinate: tile.coordinate,
                    sample_size: tile.sample_size,
                    src_rect: tile.src_rect,
                    cache_key: format!(
                        "{}_tile_{}_{}",
                        self.context.image_key,
                        tile.src_rect.to_short_string(),
                        tile.sample_size
                    ),
                    cancel,
                    context: self.context.clone(),
                });
            }
        }
    }

    /// Keeps loaded tiles of other sample sizes that cover foreground tiles
    /// still waiting for pixels, frees everything else.
    fn update_background(&mut self) {
        let load_rect = self.image_load_rect;
        let waiting: Vec<RectI> = self
            .tiles
            .get(&self.sample_size)
            .map(|tiles| {
                tiles
                    .iter()
                    .filter(|t| t.state() != TileState::Loaded && t.src_rect.overlaps(&load_rect))
                    .map(|t| t.src_rect)
                    .collect()
            })
            .unwrap_or_default();

        let allocator = self.context.allocator.clone();
        let keep_background = !self.config.disabled_background_tiles && !waiting.is_empty();
        let mut background = Vec::new();
        for (&sample_size, tiles) in self.tiles.iter_mut() {
            if sample_size == self.sample_size {
                continue;
            }
            for (index, tile) in tiles.iter_mut().enumerate() {
                let needed = keep_background
                    && tile.state() == TileState::Loaded
                    && waiting.iter().any(|rect| rect.overlaps(&tile.src_rect));
                if needed {
                    background.push((sample_size, index));
                } else {
                    tile.free(allocator.as_deref());
                }
            }
        }
        // Coarse tiles are drawn first so finer ones end up on top
        background.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        self.background = background;
    }

    fn tile_mut(&mut self, sample_size: u32, coordinate: PointI) -> Option<&mut Tile> {
        let cols = self.grid_map.get(sample_size)?.grid_size.width();
        let index = (coordinate.y() * cols + coordinate.x()) as usize;
        self.tiles.get_mut(&sample_size)?.get_mut(index)
    }

    /// Applies a decode result. Results for tiles that moved on are
    /// discarded. Returns true when a tile changed.
    pub fn on_reply(&mut self, message: DecodeReplyMessage) -> bool {
        let request_id = message.reply.request_id();
        let animation = Duration::from_millis(self.config.tile_animation_duration_ms);
        let allocator = self.context.allocator.clone();
        let changed = match message.reply {
            DecodeReply::TileDone {
                coordinate,
                sample_size,
                bitmap,
                from_cache,
                ..
            } => match self.tile_mut(sample_size, coordinate) {
                Some(tile) if tile.accepts(request_id) => {
                    tile.set_bitmap(bitmap, !from_cache && !animation.is_zero());
                    true
                }
                _ => {
                    log::debug!(
                        "Result from tile decode not needed anymore. Discarding id {request_id}"
                    );
                    bitmap.recycle(allocator.as_deref());
                    false
                }
            },
            DecodeReply::TileFailed {
                coordinate,
                sample_size,
                error,
                ..
            } => match self.tile_mut(sample_size, coordinate) {
                Some(tile) if tile.accepts(request_id) => {
                    log::warn!("Tile {coordinate:?} at sample size {sample_size} failed: {error}");
                    tile.set_error();
                    true
                }
                _ => false,
            },
        };
        if changed {
            self.update_background();
        }
        changed
    }

    /// Advances tile fade-in animations. Returns true while any is running.
    pub fn advance(&mut self, frame_time: Duration) -> bool {
        let duration = Duration::from_millis(self.config.tile_animation_duration_ms);
        let mut animating = false;
        for tile in self.tiles.values_mut().flatten() {
            animating |= tile.advance(frame_time, duration);
        }
        animating
    }

    /// Frees every tile and forgets the grid
    pub fn clean(&mut self) {
        self.free_all();
        self.tiles.clear();
        self.grid_map = TileGridMap::default();
        self.preferred_tile_size = SizeI::default();
        self.sample_size = 0;
        self.image_load_rect = RectI::default();
    }
}

impl Drop for TileManager {
    fn drop(&mut self) {
        self.free_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use async_channel::Receiver;

    use super::*;
    use crate::{
        config::ZoomConfig,
        decode_thread::model::DecodeCommandMessage,
        observe::drain,
        rect::{PointD, SizeD},
        subsampling::{
            cache::{FreeListAllocator, TileBitmap},
            decoder::{tests::FakeDecoderFactory, DecoderPool},
            source::{ImageInfo, MemoryImageSource},
        },
        zoom::{ContinuousTransformType, ZoomableCore},
    };

    const IMAGE: SizeI = SizeI::new(6799, 4890);
    const CONTENT: SizeI = SizeI::new(849, 611);

    fn manager() -> (TileManager, Receiver<DecodeCommandMessage>) {
        let info = ImageInfo::new(IMAGE, "image/jpeg");
        let context = Arc::new(DecodeContext {
            pool: DecoderPool::new(
                Arc::new(MemoryImageSource::new("fake", Vec::new())),
                Arc::new(FakeDecoderFactory::new(IMAGE, "image/jpeg")),
                info.clone(),
            ),
            cache: None,
            allocator: Some(Arc::new(FreeListAllocator::default())),
            image_key: "fake".into(),
            image_info: info,
            disabled_reuse: false,
        });
        let (command_sender, command_receiver) = async_channel::unbounded();
        let sender = DecodeThreadSender::new(command_sender, Default::default());
        let manager = TileManager::new(SubsamplingConfig::default(), context, sender, CONTENT);
        (manager, command_receiver)
    }

    fn zoomable() -> ZoomableCore {
        let mut zoomable = ZoomableCore::new(ZoomConfig::default());
        zoomable.set_container_size(SizeD::new(1200.0, 700.0));
        zoomable.set_content_size(CONTENT.to_f64_size());
        zoomable.set_content_origin_size(IMAGE.to_f64_size());
        zoomable
    }

    fn loaded(bitmap_size: u32) -> TileBitmap {
        TileBitmap::new("t", image::RgbaImage::new(bitmap_size, bitmap_size))
    }

    /// Answers every queued command with a synthetic bitmap
    fn complete(manager: &mut TileManager, commands: &Receiver<DecodeCommandMessage>) -> usize {
        let messages = drain(commands);
        let count = messages.len();
        for message in messages {
            manager.on_reply(DecodeReplyMessage {
                id: message.id,
                reply: DecodeReply::TileDone {
                    request_id: message.cmd.request_id,
                    coordinate: message.cmd.coordinate,
                    sample_size: message.cmd.sample_size,
                    bitmap: loaded(4),
                    from_cache: true,
                },
            });
        }
        count
    }

    #[test]
    fn test_base_scale_loads_whole_image() {
        let (mut manager, commands) = manager();
        let zoomable = zoomable();
        assert!(manager.refresh(&zoomable.state()));
        assert_eq!(manager.sample_size(), 8);
        assert_eq!(manager.image_load_rect(), RectI::new(0, 0, 6799, 4890));
        assert_eq!(manager.foreground_tiles().len(), 4);
        assert_eq!(commands.len(), 4);
        assert_eq!(complete(&mut manager, &commands), 4);
        assert!(manager
            .foreground_tiles()
            .iter()
            .all(|t| t.state() == TileState::Loaded));
        assert!(!manager.refresh(&zoomable.state()));
        assert_eq!(commands.len(), 0);
    }

    #[test]
    fn test_zoomed_in_fixture() {
        let (mut manager, commands) = manager();
        let mut zoomable = zoomable();
        manager.refresh(&zoomable.state());
        complete(&mut manager, &commands);

        zoomable.scale(8.0, Some(PointD::new(424.5, 305.5)), false);
        manager.refresh(&zoomable.state());
        assert_eq!(manager.sample_size(), 1);
        assert_eq!(manager.foreground_tiles().len(), 168);
        assert_eq!(manager.image_load_rect(), RectI::new(2498, 1919, 4301, 2971));
        assert_eq!(
            manager.grid_map().to_string(),
            "[16:1:1x1,8:4:2x2,4:12:3x4,2:42:6x7,1:168:12x14]"
        );
        let loading: Vec<PointI> = manager
            .foreground_tiles()
            .iter()
            .filter(|t| t.state() == TileState::Loading)
            .map(|t| t.coordinate)
            .collect();
        assert_eq!(loading.len(), 16);
        assert!(loading
            .iter()
            .all(|c| (4..=7).contains(&c.x()) && (5..=8).contains(&c.y())));

        // The sample size 8 tiles under the load rect fill in meanwhile
        let background = manager.background_tiles();
        assert!(!background.is_empty());
        assert!(background.iter().all(|t| t.sample_size == 8));

        complete(&mut manager, &commands);
        let loaded = manager
            .foreground_tiles()
            .iter()
            .filter(|t| t.state() == TileState::Loaded)
            .count();
        assert_eq!(loaded, 16);
        assert!(manager.background_tiles().is_empty());
    }

    #[test]
    fn test_stale_reply_discarded() {
        let (mut manager, commands) = manager();
        let mut zoomable = zoomable();
        manager.refresh(&zoomable.state());
        let stale = drain(&commands);
        assert_eq!(stale.len(), 4);

        zoomable.scale(8.0, Some(PointD::new(424.5, 305.5)), false);
        manager.refresh(&zoomable.state());
        // sample size 8 tiles were never loaded and got cancelled
        assert!(stale.iter().all(|m| m.cmd.cancel.load(Ordering::SeqCst)));

        let message = &stale[0];
        assert!(!manager.on_reply(DecodeReplyMessage {
            id: message.id,
            reply: DecodeReply::TileDone {
                request_id: message.cmd.request_id,
                coordinate: message.cmd.coordinate,
                sample_size: message.cmd.sample_size,
                bitmap: loaded(4),
                from_cache: false,
            },
        }));
        assert!(manager.background_tiles().is_empty());
    }

    #[test]
    fn test_failed_tile_not_retried() {
        let (mut manager, commands) = manager();
        let zoomable = zoomable();
        manager.refresh(&zoomable.state());
        let messages = drain(&commands);
        let message = &messages[0];
        assert!(manager.on_reply(DecodeReplyMessage {
            id: message.id,
            reply: DecodeReply::TileFailed {
                request_id: message.cmd.request_id,
                coordinate: message.cmd.coordinate,
                sample_size: message.cmd.sample_size,
                error: "broken".into(),
            },
        }));
        let errors = manager
            .foreground_tiles()
            .iter()
            .filter(|t| t.state() == TileState::Error)
            .count();
        assert_eq!(errors, 1);
        manager.refresh(&zoomable.state());
        assert_eq!(commands.len(), 0);
    }

    #[test]
    fn test_paused_during_gesture() {
        let (mut manager, commands) = manager();
        let mut state = zoomable().state();
        state.continuous_transform_type = ContinuousTransformType::GESTURE;
        manager.refresh(&state);
        assert_eq!(manager.sample_size(), 0);
        assert_eq!(commands.len(), 0);

        state.continuous_transform_type = ContinuousTransformType::SCALE;
        manager.refresh(&state);
        assert_eq!(commands.len(), 4);
    }

    #[test]
    fn test_small_container_change_keeps_grid() {
        let (mut manager, _commands) = manager();
        let mut zoomable = zoomable();
        manager.refresh(&zoomable.state());
        assert_eq!(manager.preferred_tile_size(), SizeI::new(600, 350));

        zoomable.set_container_size(SizeD::new(1300.0, 760.0));
        manager.refresh(&zoomable.state());
        assert_eq!(manager.preferred_tile_size(), SizeI::new(600, 350));

        zoomable.set_container_size(SizeD::new(700.0, 1200.0));
        manager.refresh(&zoomable.state());
        assert_eq!(manager.preferred_tile_size(), SizeI::new(350, 600));
    }

    #[test]
    fn test_fade_in_and_clean() {
        let (mut manager, commands) = manager();
        let zoomable = zoomable();
        manager.refresh(&zoomable.state());
        for message in drain(&commands) {
            manager.on_reply(DecodeReplyMessage {
                id: message.id,
                reply: DecodeReply::TileDone {
                    request_id: message.cmd.request_id,
                    coordinate: message.cmd.coordinate,
                    sample_size: message.cmd.sample_size,
                    bitmap: loaded(4),
                    from_cache: false,
                },
            });
        }
        let start = Duration::from_secs(100);
        assert!(manager.advance(start));
        assert!(manager.advance(start + Duration::from_millis(100)));
        assert!(!manager.advance(start + Duration::from_millis(200)));
        assert!(manager.foreground_tiles().iter().all(|t| t.alpha() == 255));

        manager.clean();
        assert_eq!(manager.sample_size(), 0);
        assert!(manager.foreground_tiles().is_empty());
        assert!(manager.grid_map().is_empty());
    }
}
