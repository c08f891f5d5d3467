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
    collections::{HashMap, VecDeque},
    fmt::Debug,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, Mutex,
    },
};

use human_bytes::human_bytes;
use image::RgbaImage;

use crate::subsampling::source::ImageInfo;

/// Hands out RGBA buffers for decoded tiles and takes them back once a tile
/// is no longer used, so steady-state panning does not allocate.
pub trait TileBufferAllocator: Send + Sync + Debug {
    /// A buffer of exactly `width` x `height`, if one is available
    fn acquire(&self, width: u32, height: u32) -> Option<RgbaImage>;

    fn release(&self, buffer: RgbaImage);
}

/// Free lists keyed by buffer dimensions. Tiles of a grid mostly share one
/// size, with the last row and column as the exceptions.
#[derive(Debug)]
pub struct FreeListAllocator {
    free: Mutex<HashMap<(u32, u32), Vec<RgbaImage>>>,
    max_per_size: usize,
}

impl FreeListAllocator {
    pub fn new(max_per_size: usize) -> Self {
        Self {
            free: Mutex::new(HashMap::new()),
            max_per_size,
        }
    }

    pub fn free_count(&self) -> usize {
        match self.free.lock() {
            Ok(free) => free.values().map(Vec::len).sum(),
            Err(_) => 0,
        }
    }
}

impl Default for FreeListAllocator {
    fn default() -> Self {
        Self::new(16)
    }
}

impl TileBufferAllocator for FreeListAllocator {
    fn acquire(&self, width: u32, height: u32) -> Option<RgbaImage> {
        self.free.lock().ok()?.get_mut(&(width, height))?.pop()
    }

    fn release(&self, buffer: RgbaImage) {
        if let Ok(mut free) = self.free.lock() {
            let bucket = free.entry(buffer.dimensions()).or_default();
            if bucket.len() < self.max_per_size {
                bucket.push(buffer);
            }
        }
    }
}

#[derive(Debug)]
struct TileBitmapInner {
    key: String,
    image: RgbaImage,
    displayed: AtomicU32,
}

/// Decoded tile pixels, shared between tiles, the cache and renderers.
#[derive(Debug, Clone)]
pub struct TileBitmap {
    inner: Arc<TileBitmapInner>,
}

impl TileBitmap {
    pub fn new(key: &str, image: RgbaImage) -> Self {
        Self {
            inner: Arc::new(TileBitmapInner {
                key: key.to_string(),
                image,
                displayed: AtomicU32::new(0),
            }),
        }
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    pub fn image(&self) -> &RgbaImage {
        &self.inner.image
    }

    pub fn width(&self) -> u32 {
        self.inner.image.width()
    }

    pub fn height(&self) -> u32 {
        self.inner.image.height()
    }

    pub fn byte_count(&self) -> usize {
        self.inner.image.as_raw().len()
    }

    pub fn set_displayed(&self, displayed: bool) {
        if displayed {
            self.inner.displayed.fetch_add(1, Ordering::SeqCst);
        } else {
            // Never below zero
            let _ = self
                .inner
                .displayed
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                    count.checked_sub(1)
                });
        }
    }

    pub fn is_displayed(&self) -> bool {
        self.inner.displayed.load(Ordering::SeqCst) > 0
    }

    /// Gives the pixel buffer back to `allocator` when this is the last
    /// handle and the bitmap is not displayed. Otherwise only this handle is
    /// dropped. Returns true when the buffer was returned.
    pub fn recycle(self, allocator: Option<&dyn TileBufferAllocator>) -> bool {
        if self.is_displayed() {
            return false;
        }
        match (Arc::try_unwrap(self.inner), allocator) {
            (Ok(inner), Some(allocator)) => {
                allocator.release(inner.image);
                true
            }
            _ => false,
        }
    }
}

/// Cache of decoded tiles, shared by the decode workers.
pub trait TileBitmapCache: Send + Sync + Debug {
    fn get(&self, key: &str) -> Option<TileBitmap>;

    fn put(&self, key: &str, bitmap: TileBitmap, image_url: &str, image_info: &ImageInfo);

    fn is_disabled(&self) -> bool {
        false
    }
}

#[derive(Debug, Default)]
struct LruState {
    entries: HashMap<String, TileBitmap>,
    /// Least recently used first
    order: VecDeque<String>,
    size: usize,
}

impl LruState {
    fn touch(&mut self, key: &str) {
        if let Some(position) = self.order.iter().position(|k| k == key) {
            if let Some(key) = self.order.remove(position) {
                self.order.push_back(key);
            }
        }
    }
}

/// In-memory LRU bounded by total bytes. Evicted bitmaps go back to the
/// allocator unless a tile still displays them.
#[derive(Debug)]
pub struct MemoryTileBitmapCache {
    max_size: usize,
    state: Mutex<LruState>,
    allocator: Option<Arc<dyn TileBufferAllocator>>,
}

impl MemoryTileBitmapCache {
    pub fn new(max_size: usize, allocator: Option<Arc<dyn TileBufferAllocator>>) -> Self {
        Self {
            max_size,
            state: Mutex::new(LruState::default()),
            allocator,
        }
    }

    pub fn size(&self) -> usize {
        self.state.lock().map(|state| state.size).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.state.lock().map(|state| state.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let evicted = match self.state.lock() {
            Ok(mut state) => {
                state.order.clear();
                state.size = 0;
                state.entries.drain().map(|(_, bitmap)| bitmap).collect()
            }
            Err(_) => Vec::new(),
        };
        self.recycle_all(evicted);
    }

    fn recycle_all(&self, bitmaps: Vec<TileBitmap>) {
        for bitmap in bitmaps {
            bitmap.recycle(self.allocator.as_deref());
        }
    }
}

impl TileBitmapCache for MemoryTileBitmapCache {
    fn get(&self, key: &str) -> Option<TileBitmap> {
        let mut state = self.state.lock().ok()?;
        let bitmap = state.entries.get(key).cloned()?;
        state.touch(key);
        Some(bitmap)
    }

    fn put(&self, key: &str, bitmap: TileBitmap, image_url: &str, image_info: &ImageInfo) {
        let byte_count = bitmap.byte_count();
        if byte_count > self.max_size {
            log::debug!(
                "Tile {key} of {image_url} {image_info} too large for cache ({})",
                human_bytes(byte_count as f64)
            );
            return;
        }
        let mut evicted = Vec::new();
        if let Ok(mut state) = self.state.lock() {
            if let Some(old) = state.entries.insert(key.to_string(), bitmap) {
                state.size -= old.byte_count();
                state.touch(key);
                evicted.push(old);
            } else {
                state.order.push_back(key.to_string());
            }
            state.size += byte_count;
            while state.size > self.max_size {
                let Some(oldest) = state.order.pop_front() else {
                    break;
                };
                if let Some(old) = state.entries.remove(&oldest) {
                    state.size -= old.byte_count();
                    evicted.push(old);
                }
            }
            if !evicted.is_empty() {
                log::debug!(
                    "Tile cache evicted {} bitmaps, now {} in {}",
                    evicted.len(),
                    state.entries.len(),
                    human_bytes(state.size as f64)
                );
            }
        }
        self.recycle_all(evicted);
    }
}
