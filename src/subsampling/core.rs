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

use std::{sync::Arc, time::Duration};

use async_channel::Receiver;

use crate::{
    config::SubsamplingConfig,
    decode_thread::{
        model::{DecodeContext, DecodeReply, DecodeReplyMessage},
        DecodeThread, DecodeThreadSender,
    },
    error::ZoomResult,
    observe::{drain, Subscribers},
    rect::{RectI, SizeD, SizeI},
    subsampling::{
        cache::{FreeListAllocator, MemoryTileBitmapCache, TileBitmapCache, TileBufferAllocator},
        decoder::{DecoderBackend, DecoderPool, RegionDecoderFactory},
        grid::{can_use_subsampling_by_aspect_ratio, is_support_subsampling_mime},
        manager::TileManager,
        source::{ImageInfo, ImageSource},
        tile::Tile,
        SubsamplingState,
    },
    zoom::{ZoomableCore, ZoomableState},
};

/// What the subsampling side needs from the zoom side
pub trait ZoomableBridge {
    fn subscribe(&mut self) -> Receiver<ZoomableState>;

    fn state(&self) -> ZoomableState;

    fn set_content_origin_size(&mut self, size: SizeD);
}

impl ZoomableBridge for ZoomableCore {
    fn subscribe(&mut self) -> Receiver<ZoomableState> {
        ZoomableCore::subscribe(self)
    }

    fn state(&self) -> ZoomableState {
        ZoomableCore::state(self)
    }

    fn set_content_origin_size(&mut self, size: SizeD) {
        ZoomableCore::set_content_origin_size(self, size)
    }
}

fn discard(message: DecodeReplyMessage, allocator: &dyn TileBufferAllocator) {
    log::debug!(
        "Result from tile decode not needed anymore. Discarding id {}",
        message.id
    );
    if let DecodeReply::TileDone { bitmap, .. } = message.reply {
        bitmap.recycle(Some(allocator));
    }
}

/// Loads tiles of the original image for whatever part of the content the
/// zoomable currently shows.
///
/// Everything here runs on the owner thread; decoding runs on the decode
/// workers. Call [`SubsamplingCore::process`] whenever the zoomable changed
/// or decode replies may be waiting, typically once per frame.
pub struct SubsamplingCore {
    config: SubsamplingConfig,
    factory: Arc<dyn RegionDecoderFactory>,
    cache: Option<Arc<dyn TileBitmapCache>>,
    allocator: Arc<dyn TileBufferAllocator>,
    _decode_thread: DecodeThread,
    sender: DecodeThreadSender,
    reply_receiver: Receiver<DecodeReplyMessage>,
    source: Option<Arc<dyn ImageSource>>,
    /// Survives detaching, keyed by the source it was read from
    image_info: Option<(String, ImageInfo)>,
    zoomable_receiver: Option<Receiver<ZoomableState>>,
    zoomable_state: Option<ZoomableState>,
    content_size: SizeI,
    context: Option<Arc<DecodeContext>>,
    manager: Option<TileManager>,
    attached: bool,
    stopped: bool,
    refused: bool,
    subscribers: Subscribers<SubsamplingState>,
}

impl SubsamplingCore {
    /// Uses the decoder backend named in `config`
    pub fn new(config: SubsamplingConfig) -> ZoomResult<Self> {
        let backend = DecoderBackend::try_from(config.decoder_backend.as_str())?;
        Ok(Self::with_factory(config, backend.factory()))
    }

    pub fn with_factory(config: SubsamplingConfig, factory: Arc<dyn RegionDecoderFactory>) -> Self {
        let allocator: Arc<dyn TileBufferAllocator> = Arc::new(FreeListAllocator::default());
        let cache: Option<Arc<dyn TileBitmapCache>> = if config.disabled_tile_bitmap_cache {
            None
        } else {
            Some(Arc::new(MemoryTileBitmapCache::new(
                config.tile_bitmap_cache_max_bytes,
                Some(allocator.clone()),
            )))
        };
        let (command_sender, command_receiver) = async_channel::unbounded();
        let (reply_sender, reply_receiver) = async_channel::unbounded();
        let decode_thread = DecodeThread::new(config.decode_threads, reply_sender, command_receiver);
        let sender = decode_thread.create_sender(command_sender);
        Self {
            config,
            factory,
            cache,
            allocator,
            _decode_thread: decode_thread,
            sender,
            reply_receiver,
            source: None,
            image_info: None,
            zoomable_receiver: None,
            zoomable_state: None,
            content_size: SizeI::default(),
            context: None,
            manager: None,
            attached: false,
            stopped: false,
            refused: false,
            subscribers: Subscribers::default(),
        }
    }

    /// Replaces the tile bitmap cache, e.g. with one shared between viewers.
    /// Takes effect for the next image.
    pub fn set_tile_bitmap_cache(&mut self, cache: Option<Arc<dyn TileBitmapCache>>) {
        self.cache = cache;
    }

    pub fn subscribe(&mut self) -> Receiver<SubsamplingState> {
        self.subscribers.subscribe()
    }

    fn publish(&mut self) {
        let state = self.state();
        self.subscribers.publish(&state);
    }

    pub fn ready(&self) -> bool {
        self.manager.is_some()
    }

    pub fn image_info(&self) -> Option<&ImageInfo> {
        self.image_info.as_ref().map(|(_, info)| info)
    }

    pub fn foreground_tiles(&self) -> &[Tile] {
        self.manager
            .as_ref()
            .map(TileManager::foreground_tiles)
            .unwrap_or_default()
    }

    pub fn background_tiles(&self) -> Vec<&Tile> {
        self.manager
            .as_ref()
            .map(TileManager::background_tiles)
            .unwrap_or_default()
    }

    pub fn sample_size(&self) -> u32 {
        self.manager.as_ref().map_or(0, TileManager::sample_size)
    }

    pub fn image_load_rect(&self) -> RectI {
        self.manager
            .as_ref()
            .map_or(RectI::default(), TileManager::image_load_rect)
    }

    pub fn tile_grid_size_map(&self) -> Vec<(u32, SizeI)> {
        self.manager
            .as_ref()
            .map(|manager| manager.grid_map().grid_sizes())
            .unwrap_or_default()
    }

    pub fn state(&self) -> SubsamplingState {
        SubsamplingState {
            ready: self.ready(),
            image_info: self.image_info().cloned(),
            foreground_tiles: self
                .manager
                .as_ref()
                .map(TileManager::foreground_snapshots)
                .unwrap_or_default(),
            background_tiles: self
                .manager
                .as_ref()
                .map(TileManager::background_snapshots)
                .unwrap_or_default(),
            sample_size: self.sample_size(),
            image_load_rect: self.image_load_rect(),
            tile_grid_size_map: self.tile_grid_size_map(),
        }
    }

    /// Cancels all decodes and drops the tiles. The image info is kept.
    fn release(&mut self) {
        self.sender.invalidate();
        if let Some(mut manager) = self.manager.take() {
            manager.clean();
        }
        if let Some(context) = self.context.take() {
            context.pool.destroy();
        }
        for message in drain(&self.reply_receiver) {
            discard(message, self.allocator.as_ref());
        }
    }

    pub fn set_image_source(&mut self, source: Option<Arc<dyn ImageSource>>) {
        let same = match (&self.source, &source) {
            (Some(old), Some(new)) => old.key() == new.key(),
            (None, None) => true,
            _ => false,
        };
        if same {
            return;
        }
        self.release();
        self.refused = false;
        if let Some(source) = &source {
            log::debug!("Subsampling source {}", source.key());
        }
        self.source = source;
        self.publish();
    }

    pub fn on_attached(&mut self, bridge: &mut dyn ZoomableBridge) {
        if self.attached {
            return;
        }
        self.attached = true;
        self.zoomable_receiver = Some(bridge.subscribe());
        self.zoomable_state = Some(bridge.state());
        self.process(bridge);
    }

    pub fn on_detached(&mut self) {
        if !self.attached {
            return;
        }
        self.attached = false;
        self.zoomable_receiver = None;
        self.release();
        self.publish();
    }

    /// Stopped cores keep their image but hold no tiles
    pub fn set_stopped(&mut self, stopped: bool) {
        if self.stopped == stopped {
            return;
        }
        self.stopped = stopped;
        if let Some(manager) = &mut self.manager {
            if stopped {
                self.sender.invalidate();
                manager.clean();
            } else if let Some(state) = &self.zoomable_state {
                manager.refresh(state);
            }
        }
        self.publish();
    }

    fn image_info_for(&mut self, source: &dyn ImageSource) -> ZoomResult<ImageInfo> {
        if let Some((key, info)) = &self.image_info {
            if key == source.key() {
                return Ok(info.clone());
            }
        }
        let info = self.factory.read_image_info(source)?;
        log::debug!("Read {info} from {}", source.key());
        self.image_info = Some((source.key().to_string(), info.clone()));
        Ok(info)
    }

    /// Sets up the tile manager once source, content and container are known.
    fn prepare(&mut self, bridge: &mut dyn ZoomableBridge) -> bool {
        let Some(source) = self.source.clone() else {
            return false;
        };
        let Some(state) = self.zoomable_state.clone() else {
            return false;
        };
        if !state.is_ready() {
            return false;
        }
        let content_size = SizeI::new(
            state.content_size.width().round() as i32,
            state.content_size.height().round() as i32,
        );
        self.content_size = content_size;

        let image_info = match self.image_info_for(source.as_ref()) {
            Ok(info) => info,
            Err(e) => {
                log::warn!("Cannot read image info of {}: {e}", source.key());
                self.refused = true;
                return true;
            }
        };
        bridge.set_content_origin_size(image_info.size.to_f64_size());

        if !is_support_subsampling_mime(&image_info.mime_type) {
            log::info!(
                "Subsampling not supported for {} {image_info}",
                source.key()
            );
            self.refused = true;
            return true;
        }
        if !can_use_subsampling_by_aspect_ratio(
            image_info.size,
            content_size,
            self.config.aspect_ratio_max_difference,
        ) {
            log::info!(
                "Subsampling disabled for {}: content {content_size:?} does not match {image_info}",
                source.key()
            );
            self.refused = true;
            return true;
        }

        let context = Arc::new(DecodeContext {
            pool: DecoderPool::new(source.clone(), self.factory.clone(), image_info.clone()),
            cache: self.cache.clone(),
            allocator: Some(self.allocator.clone()),
            image_key: source.key().to_string(),
            image_info,
            disabled_reuse: self.config.disabled_tile_bitmap_reuse,
        });
        let mut manager = TileManager::new(
            self.config.clone(),
            context.clone(),
            self.sender.clone(),
            content_size,
        );
        if !self.stopped {
            manager.refresh(&state);
        }
        self.context = Some(context);
        self.manager = Some(manager);
        true
    }

    /// Handles zoomable changes and decode replies. Returns true when the
    /// subsampling state changed.
    pub fn process(&mut self, bridge: &mut dyn ZoomableBridge) -> bool {
        if !self.attached {
            return false;
        }
        let mut changed = false;

        let states = self
            .zoomable_receiver
            .as_ref()
            .map(drain)
            .unwrap_or_default();
        let new_state = states.into_iter().last();
        if let Some(state) = &new_state {
            let content_size = SizeI::new(
                state.content_size.width().round() as i32,
                state.content_size.height().round() as i32,
            );
            if content_size != self.content_size && (self.manager.is_some() || self.refused) {
                log::debug!("Content size changed to {content_size:?}, reloading tiles");
                self.release();
                self.refused = false;
                changed = true;
            }
            self.zoomable_state = new_state.clone();
        }

        let epoch = self.sender.epoch();
        for message in drain(&self.reply_receiver) {
            match self.manager.as_mut() {
                Some(manager) if message.id == epoch => changed |= manager.on_reply(message),
                _ => discard(message, self.allocator.as_ref()),
            }
        }

        if self.manager.is_none() && !self.refused {
            changed |= self.prepare(bridge);
        } else if let (Some(manager), Some(state), false) =
            (&mut self.manager, &new_state, self.stopped)
        {
            changed |= manager.refresh(state);
        }

        if changed {
            self.publish();
        }
        changed
    }

    /// Advances tile fade-in animations. Returns true while any is running.
    pub fn advance(&mut self, frame_time: Duration) -> bool {
        let animating = self
            .manager
            .as_mut()
            .is_some_and(|manager| manager.advance(frame_time));
        if animating {
            self.publish();
        }
        animating
    }
}

impl Drop for SubsamplingCore {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::atomic::Ordering, thread};

    use super::*;
    use crate::{
        config::ZoomConfig,
        rect::PointD,
        subsampling::{
            decoder::tests::FakeDecoderFactory, source::MemoryImageSource, tile::TileState,
        },
    };

    const IMAGE: SizeI = SizeI::new(6799, 4890);

    fn zoomable(content: SizeI) -> ZoomableCore {
        let mut zoomable = ZoomableCore::new(ZoomConfig::default());
        zoomable.set_container_size(SizeD::new(1200.0, 700.0));
        zoomable.set_content_size(content.to_f64_size());
        zoomable
    }

    fn core(mime_type: &str) -> (SubsamplingCore, Arc<FakeDecoderFactory>) {
        let factory = Arc::new(FakeDecoderFactory::new(IMAGE, mime_type));
        let mut core = SubsamplingCore::with_factory(SubsamplingConfig::default(), factory.clone());
        core.set_image_source(Some(Arc::new(MemoryImageSource::new(
            "memory://huge.jpg",
            Vec::new(),
        ))));
        (core, factory)
    }

    fn loaded(core: &SubsamplingCore) -> usize {
        core.foreground_tiles()
            .iter()
            .filter(|tile| tile.state() == TileState::Loaded)
            .count()
    }

    /// Processes until `count` foreground tiles are loaded
    fn pump(core: &mut SubsamplingCore, zoomable: &mut ZoomableCore, count: usize) -> bool {
        for _ in 0..500 {
            core.process(zoomable);
            if loaded(core) >= count {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_huge_image_zoomed_in() {
        let (mut core, factory) = core("image/jpeg");
        let mut zoomable = zoomable(SizeI::new(849, 611));
        let states = core.subscribe();

        core.on_attached(&mut zoomable);
        assert!(core.ready());
        assert_eq!(zoomable.content_origin_size(), IMAGE.to_f64_size());
        assert_eq!(core.sample_size(), 8);
        assert!(pump(&mut core, &mut zoomable, 4));

        zoomable.scale(8.0, Some(PointD::new(424.5, 305.5)), false);
        assert!(pump(&mut core, &mut zoomable, 16));
        assert_eq!(core.foreground_tiles().len(), 168);
        assert_eq!(core.sample_size(), 1);
        assert_eq!(core.image_load_rect(), RectI::new(2498, 1919, 4301, 2971));
        assert_eq!(loaded(&core), 16);
        assert_eq!(
            core.tile_grid_size_map(),
            vec![
                (16, SizeI::new(1, 1)),
                (8, SizeI::new(2, 2)),
                (4, SizeI::new(3, 4)),
                (2, SizeI::new(6, 7)),
                (1, SizeI::new(12, 14)),
            ]
        );
        assert_eq!(factory.info_reads.load(Ordering::SeqCst), 1);

        let last = drain(&states).pop().unwrap();
        assert!(last.ready);
        assert_eq!(last.loaded_count(), 16);
        assert_eq!(last.image_info, Some(ImageInfo::new(IMAGE, "image/jpeg")));
    }

    #[test]
    fn test_fade_in_on_shared_frame_clock() {
        let (mut core, _factory) = core("image/jpeg");
        let mut zoomable = zoomable(SizeI::new(849, 611));
        core.on_attached(&mut zoomable);
        assert!(pump(&mut core, &mut zoomable, 4));
        assert!(core.foreground_tiles().iter().all(|tile| tile.alpha() == 0));

        zoomable.scale(2.0, None, true);
        let start = Duration::from_secs(100);
        assert!(zoomable.advance(start));
        assert!(core.advance(start));

        let frame = start + Duration::from_millis(100);
        zoomable.advance(frame);
        assert!(core.advance(frame));
        let alphas: Vec<u8> = core
            .foreground_tiles()
            .iter()
            .filter(|tile| tile.state() == TileState::Loaded)
            .map(|tile| tile.alpha())
            .collect();
        assert_eq!(alphas.len(), 4);
        assert!(alphas.iter().all(|&alpha| alpha > 0 && alpha < 255), "{alphas:?}");

        let frame = start + Duration::from_millis(200);
        zoomable.advance(frame);
        assert!(!core.advance(frame));
    }

    #[test]
    fn test_detach_and_reattach() {
        let (mut core, factory) = core("image/jpeg");
        let mut zoomable = zoomable(SizeI::new(849, 611));
        core.on_attached(&mut zoomable);
        assert!(pump(&mut core, &mut zoomable, 4));
        let grid = core.tile_grid_size_map();

        core.on_detached();
        assert!(!core.ready());
        assert!(core.foreground_tiles().is_empty());
        assert_eq!(core.image_info(), Some(&ImageInfo::new(IMAGE, "image/jpeg")));
        assert!(factory.destroyed.load(Ordering::SeqCst) > 0);
        assert!(!core.process(&mut zoomable));

        core.on_attached(&mut zoomable);
        assert!(core.ready());
        assert_eq!(core.tile_grid_size_map(), grid);
        assert!(pump(&mut core, &mut zoomable, 4));
        assert_eq!(factory.info_reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsupported_mime_type() {
        let (mut core, _factory) = core("image/gif");
        let mut zoomable = zoomable(SizeI::new(849, 611));
        core.on_attached(&mut zoomable);
        assert!(!core.ready());
        assert_eq!(core.image_info().unwrap().mime_type, "image/gif");
        assert!(core.tile_grid_size_map().is_empty());
        // origin size is still handed to the zoomable
        assert_eq!(zoomable.content_origin_size(), IMAGE.to_f64_size());
    }

    #[test]
    fn test_aspect_ratio_mismatch() {
        let (mut core, _factory) = core("image/jpeg");
        let mut zoomable = zoomable(SizeI::new(611, 849));
        core.on_attached(&mut zoomable);
        assert!(!core.ready());

        // content matching the image enables it again
        zoomable.set_content_size(SizeD::new(849.0, 611.0));
        core.process(&mut zoomable);
        core.process(&mut zoomable);
        assert!(core.ready());
    }

    #[test]
    fn test_new_source_resets() {
        let (mut core, factory) = core("image/jpeg");
        let mut zoomable = zoomable(SizeI::new(849, 611));
        core.on_attached(&mut zoomable);
        assert!(core.ready());

        core.set_image_source(None);
        assert!(!core.ready());
        core.process(&mut zoomable);
        assert!(!core.ready());

        core.set_image_source(Some(Arc::new(MemoryImageSource::new(
            "memory://other.jpg",
            Vec::new(),
        ))));
        core.process(&mut zoomable);
        assert!(core.ready());
        assert_eq!(factory.info_reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_stopped() {
        let (mut core, _factory) = core("image/jpeg");
        let mut zoomable = zoomable(SizeI::new(849, 611));
        core.on_attached(&mut zoomable);
        assert!(pump(&mut core, &mut zoomable, 4));

        core.set_stopped(true);
        assert!(core.ready());
        assert_eq!(core.sample_size(), 0);
        assert_eq!(loaded(&core), 0);

        core.set_stopped(false);
        assert_eq!(core.sample_size(), 8);
        assert!(pump(&mut core, &mut zoomable, 4));
    }

    #[test]
    fn test_unknown_backend() {
        let config = SubsamplingConfig {
            decoder_backend: "skia".into(),
            ..Default::default()
        };
        assert!(SubsamplingCore::new(config).is_err());
        assert!(SubsamplingCore::new(SubsamplingConfig::default()).is_ok());
    }
}
