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
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use crate::{
    rect::{PointI, RectI},
    subsampling::{
        cache::{TileBitmap, TileBufferAllocator},
        grid::TileSpec,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TileState {
    #[default]
    None,
    Loading,
    Loaded,
    Error,
}

/// One tile of a grid: its place in the image and the decoded pixels, if any.
#[derive(Debug)]
pub struct Tile {
    pub coordinate: PointI,
    pub src_rect: RectI,
    pub sample_size: u32,
    state: TileState,
    bitmap: Option<TileBitmap>,
    request_id: u64,
    cancel: Option<Arc<AtomicBool>>,
    alpha: u8,
    fading: bool,
    /// Frame time of the first fade-in step
    fade_started: Option<Duration>,
}

impl Tile {
    pub fn new(spec: &TileSpec) -> Self {
        Self {
            coordinate: spec.coordinate,
            src_rect: spec.src_rect,
            sample_size: spec.sample_size,
            state: TileState::None,
            bitmap: None,
            request_id: 0,
            cancel: None,
            alpha: 0,
            fading: false,
            fade_started: None,
        }
    }

    pub fn state(&self) -> TileState {
        self.state
    }

    pub fn bitmap(&self) -> Option<&TileBitmap> {
        self.bitmap.as_ref()
    }

    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Opacity 0..=255 while fading in
    pub fn alpha(&self) -> u8 {
        self.alpha
    }

    pub fn is_animating(&self) -> bool {
        self.fading
    }

    /// Marks the tile as loading under `request_id`. The returned flag is
    /// raised when the tile is freed before the decode completes.
    pub fn start_loading(&mut self, request_id: u64) -> Arc<AtomicBool> {
        let cancel = Arc::new(AtomicBool::new(false));
        self.state = TileState::Loading;
        self.request_id = request_id;
        self.cancel = Some(cancel.clone());
        cancel
    }

    /// Whether a reply for `request_id` is still wanted
    pub fn accepts(&self, request_id: u64) -> bool {
        self.state == TileState::Loading && self.request_id == request_id
    }

    pub fn set_bitmap(&mut self, bitmap: TileBitmap, animated: bool) {
        bitmap.set_displayed(true);
        if let Some(old) = self.bitmap.replace(bitmap) {
            old.set_displayed(false);
        }
        self.state = TileState::Loaded;
        self.cancel = None;
        self.alpha = if animated { 0 } else { 255 };
        self.fading = animated;
        self.fade_started = None;
    }

    pub fn set_error(&mut self) {
        self.state = TileState::Error;
        self.cancel = None;
    }

    /// Cancels a running decode and gives the pixels back. Tiles in the
    /// error state stay there.
    pub fn free(&mut self, allocator: Option<&dyn TileBufferAllocator>) {
        if let Some(cancel) = self.cancel.take() {
            cancel.store(true, Ordering::SeqCst);
        }
        if let Some(bitmap) = self.bitmap.take() {
            bitmap.set_displayed(false);
            bitmap.recycle(allocator);
        }
        if self.state != TileState::Error {
            self.state = TileState::None;
        }
        self.alpha = 0;
        self.fading = false;
        self.fade_started = None;
    }

    /// Advances the fade-in to `frame_time`, a monotonic frame clock. The
    /// first step starts the fade. Returns true while still animating.
    pub fn advance(&mut self, frame_time: Duration, duration: Duration) -> bool {
        if !self.fading {
            return false;
        }
        let started = *self.fade_started.get_or_insert(frame_time);
        let elapsed = frame_time.saturating_sub(started);
        if duration.is_zero() || elapsed >= duration {
            self.alpha = 255;
            self.fading = false;
            self.fade_started = None;
            return false;
        }
        self.alpha = (255.0 * elapsed.as_secs_f64() / duration.as_secs_f64()).round() as u8;
        true
    }

    pub fn snapshot(&self) -> TileSnapshot {
        TileSnapshot {
            coordinate: self.coordinate,
            src_rect: self.src_rect,
            sample_size: self.sample_size,
            state: self.state,
            alpha: self.alpha,
        }
    }
}

/// Tile description published to observers, without the pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileSnapshot {
    pub coordinate: PointI,
    pub src_rect: RectI,
    pub sample_size: u32,
    pub state: TileState,
    pub alpha: u8,
}

#[cfg(test)]
mod tests {
    use image::RgbaImage;

    use super::*;
    use crate::subsampling::cache::FreeListAllocator;

    fn tile() -> Tile {
        Tile::new(&TileSpec {
            coordinate: PointI::new(1, 2),
            src_rect: RectI::new(100, 200, 200, 300),
            sample_size: 2,
        })
    }

    #[test]
    fn test_lifecycle() {
        let allocator = FreeListAllocator::default();
        let mut tile = tile();
        assert_eq!(tile.state(), TileState::None);

        let cancel = tile.start_loading(7);
        assert!(tile.accepts(7));
        assert!(!tile.accepts(6));

        tile.set_bitmap(TileBitmap::new("t", RgbaImage::new(50, 50)), false);
        assert_eq!(tile.state(), TileState::Loaded);
        assert!(!tile.accepts(7));
        assert!(tile.bitmap().unwrap().is_displayed());
        assert_eq!(tile.alpha(), 255);

        tile.free(Some(&allocator));
        assert_eq!(tile.state(), TileState::None);
        assert!(tile.bitmap().is_none());
        assert!(!cancel.load(Ordering::SeqCst));
        assert_eq!(allocator.free_count(), 1);
    }

    #[test]
    fn test_free_cancels_loading() {
        let mut tile = tile();
        let cancel = tile.start_loading(1);
        tile.free(None);
        assert!(cancel.load(Ordering::SeqCst));
        assert!(!tile.accepts(1));
    }

    #[test]
    fn test_error_is_sticky() {
        let mut tile = tile();
        tile.start_loading(1);
        tile.set_error();
        tile.free(None);
        assert_eq!(tile.state(), TileState::Error);
    }

    #[test]
    fn test_shared_bitmap_not_recycled() {
        let allocator = FreeListAllocator::default();
        let bitmap = TileBitmap::new("t", RgbaImage::new(50, 50));
        let mut tile = tile();
        tile.start_loading(1);
        tile.set_bitmap(bitmap.clone(), false);
        tile.free(Some(&allocator));
        assert_eq!(allocator.free_count(), 0);
        assert!(!bitmap.is_displayed());
    }

    #[test]
    fn test_fade_in() {
        let mut tile = tile();
        tile.start_loading(1);
        tile.set_bitmap(TileBitmap::new("t", RgbaImage::new(4, 4)), true);
        assert_eq!(tile.alpha(), 0);
        let duration = Duration::from_millis(200);
        let start = Duration::from_secs(100);
        assert!(tile.advance(start, duration));
        assert_eq!(tile.alpha(), 0);
        assert!(tile.advance(start + Duration::from_millis(100), duration));
        assert_eq!(tile.alpha(), 128);
        assert!(!tile.advance(start + Duration::from_millis(200), duration));
        assert_eq!(tile.alpha(), 255);
        assert!(!tile.is_animating());
        assert_eq!(tile.snapshot().state, TileState::Loaded);
    }
}
