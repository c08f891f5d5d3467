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
    fmt::Debug,
    sync::{Arc, Mutex},
};

use image::RgbaImage;

use crate::{
    error::{ZoomError, ZoomResult},
    rect::RectI,
    subsampling::{
        cache::TileBufferAllocator,
        image_rs::ImageRsDecoderFactory,
        source::{ImageInfo, ImageSource},
    },
};

/// Decodes rectangular regions of one image at a power-of-two sample size.
pub trait RegionDecoder: Send {
    fn image_info(&self) -> &ImageInfo;

    /// Decodes `src_rect` (image coordinates) downsampled by `sample_size`.
    /// With an allocator, the output is written into a buffer acquired from
    /// it; a buffer of the wrong size is a [`ZoomError::BitmapReuse`].
    fn decode_region(
        &mut self,
        src_rect: RectI,
        sample_size: u32,
        allocator: Option<&dyn TileBufferAllocator>,
    ) -> ZoomResult<Option<RgbaImage>>;

    /// Another decoder for the same image, sharing whatever can be shared
    fn copy(&self) -> ZoomResult<Box<dyn RegionDecoder>>;

    fn destroy(&mut self) {}
}

/// Creates region decoders for image sources
pub trait RegionDecoderFactory: Send + Sync + Debug {
    fn read_image_info(&self, source: &dyn ImageSource) -> ZoomResult<ImageInfo>;

    fn create_decoder(
        &self,
        source: Arc<dyn ImageSource>,
        image_info: &ImageInfo,
    ) -> ZoomResult<Box<dyn RegionDecoder>>;
}

/// Region decoding backends selectable by configuration
#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy)]
pub enum DecoderBackend {
    ImageRs,
}

impl TryFrom<&str> for DecoderBackend {
    type Error = ZoomError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "image-rs" => Ok(DecoderBackend::ImageRs),
            _ => Err(format!("Unknown decoder backend '{value}'").into()),
        }
    }
}

impl From<DecoderBackend> for &str {
    fn from(value: DecoderBackend) -> Self {
        match value {
            DecoderBackend::ImageRs => "image-rs",
        }
    }
}

impl DecoderBackend {
    pub fn factory(&self) -> Arc<dyn RegionDecoderFactory> {
        match self {
            DecoderBackend::ImageRs => Arc::new(ImageRsDecoderFactory),
        }
    }
}

struct PoolState {
    template: Option<Box<dyn RegionDecoder>>,
    decoders: Vec<Box<dyn RegionDecoder>>,
    destroyed: bool,
}

/// Decoders for one image shared by the decode workers. A decoder is taken
/// out of the pool for the duration of a decode, so workers never share one.
pub struct DecoderPool {
    source: Arc<dyn ImageSource>,
    factory: Arc<dyn RegionDecoderFactory>,
    image_info: ImageInfo,
    state: Mutex<PoolState>,
}

impl Debug for DecoderPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderPool")
            .field("source", &self.source.key())
            .field("image_info", &self.image_info)
            .finish()
    }
}

impl DecoderPool {
    pub fn new(
        source: Arc<dyn ImageSource>,
        factory: Arc<dyn RegionDecoderFactory>,
        image_info: ImageInfo,
    ) -> Self {
        Self {
            source,
            factory,
            image_info,
            state: Mutex::new(PoolState {
                template: None,
                decoders: Vec::new(),
                destroyed: false,
            }),
        }
    }

    pub fn image_info(&self) -> &ImageInfo {
        &self.image_info
    }

    fn acquire(&self) -> ZoomResult<Box<dyn RegionDecoder>> {
        let mut state = self.state.lock().map_err(|_| ZoomError::Destroyed)?;
        if state.destroyed {
            return Err(ZoomError::Destroyed);
        }
        if let Some(decoder) = state.decoders.pop() {
            return Ok(decoder);
        }
        // New decoders are copies of the first so they share its resources
        let template = match state.template.take() {
            Some(template) => template,
            None => self
                .factory
                .create_decoder(self.source.clone(), &self.image_info)?,
        };
        let decoder = template.copy();
        state.template = Some(template);
        decoder
    }

    fn release(&self, mut decoder: Box<dyn RegionDecoder>) {
        match self.state.lock() {
            Ok(mut state) if !state.destroyed => state.decoders.push(decoder),
            _ => decoder.destroy(),
        }
    }

    pub fn decode_region(
        &self,
        src_rect: RectI,
        sample_size: u32,
        allocator: Option<&dyn TileBufferAllocator>,
    ) -> ZoomResult<Option<RgbaImage>> {
        let mut decoder = self.acquire()?;
        let result = decoder.decode_region(src_rect, sample_size, allocator);
        self.release(decoder);
        result
    }

    /// Destroys all idle decoders; decoders in use are destroyed when they
    /// come back. Safe to call more than once.
    pub fn destroy(&self) {
        if let Ok(mut state) = self.state.lock() {
            if !state.destroyed {
                state.destroyed = true;
                let template = state.template.take();
                for mut decoder in state.decoders.drain(..).chain(template) {
                    decoder.destroy();
                }
                log::debug!("Decoder pool for {} destroyed", self.source.key());
            }
        }
    }

    pub fn idle_count(&self) -> usize {
        self.state.lock().map(|state| state.decoders.len()).unwrap_or(0)
    }
}

impl Drop for DecoderPool {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use image::Rgba;

    use super::*;
    use crate::{rect::SizeI, subsampling::source::MemoryImageSource};

    /// Synthesizes tiles without real image data: every pixel carries the
    /// sample size in its red channel.
    #[derive(Debug)]
    pub struct FakeDecoderFactory {
        pub size: SizeI,
        pub mime_type: String,
        pub info_reads: AtomicUsize,
        pub decoders_created: Arc<AtomicUsize>,
        pub destroyed: Arc<AtomicUsize>,
    }

    impl FakeDecoderFactory {
        pub fn new(size: SizeI, mime_type: &str) -> Self {
            Self {
                size,
                mime_type: mime_type.to_string(),
                info_reads: AtomicUsize::new(0),
                decoders_created: Arc::new(AtomicUsize::new(0)),
                destroyed: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    pub struct FakeRegionDecoder {
        image_info: ImageInfo,
        decoders_created: Arc<AtomicUsize>,
        destroyed: Arc<AtomicUsize>,
    }

    impl RegionDecoder for FakeRegionDecoder {
        fn image_info(&self) -> &ImageInfo {
            &self.image_info
        }

        fn decode_region(
            &mut self,
            src_rect: RectI,
            sample_size: u32,
            allocator: Option<&dyn TileBufferAllocator>,
        ) -> ZoomResult<Option<RgbaImage>> {
            let rect = src_rect.intersect(&RectI::new_from_size(self.image_info.size));
            if rect.is_empty() {
                return Ok(None);
            }
            let sample_size = sample_size.max(1);
            let width = (rect.width() as u32).div_ceil(sample_size);
            let height = (rect.height() as u32).div_ceil(sample_size);
            let pixel = Rgba([sample_size as u8, 0, 0, 255]);
            match allocator.and_then(|allocator| allocator.acquire(width, height)) {
                Some(mut buffer) => {
                    buffer.pixels_mut().for_each(|p| *p = pixel);
                    Ok(Some(buffer))
                }
                None => Ok(Some(RgbaImage::from_pixel(width, height, pixel))),
            }
        }

        fn copy(&self) -> ZoomResult<Box<dyn RegionDecoder>> {
            self.decoders_created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeRegionDecoder {
                image_info: self.image_info.clone(),
                decoders_created: self.decoders_created.clone(),
                destroyed: self.destroyed.clone(),
            }))
        }

        fn destroy(&mut self) {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl RegionDecoderFactory for FakeDecoderFactory {
        fn read_image_info(&self, _source: &dyn ImageSource) -> ZoomResult<ImageInfo> {
            self.info_reads.fetch_add(1, Ordering::SeqCst);
            Ok(ImageInfo::new(self.size, &self.mime_type))
        }

        fn create_decoder(
            &self,
            _source: Arc<dyn ImageSource>,
            image_info: &ImageInfo,
        ) -> ZoomResult<Box<dyn RegionDecoder>> {
            self.decoders_created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeRegionDecoder {
                image_info: image_info.clone(),
                decoders_created: self.decoders_created.clone(),
                destroyed: self.destroyed.clone(),
            }))
        }
    }

    fn pool(factory: &Arc<FakeDecoderFactory>) -> DecoderPool {
        DecoderPool::new(
            Arc::new(MemoryImageSource::new("fake", Vec::new())),
            factory.clone(),
            ImageInfo::new(factory.size, &factory.mime_type),
        )
    }

    #[test]
    fn test_backend() {
        assert_eq!(
            DecoderBackend::try_from("image-rs").unwrap(),
            DecoderBackend::ImageRs
        );
        assert!(DecoderBackend::try_from("skia").is_err());
        let name: &str = DecoderBackend::ImageRs.into();
        assert_eq!(name, "image-rs");
    }

    #[test]
    fn test_pool_reuses_decoders() {
        let factory = Arc::new(FakeDecoderFactory::new(SizeI::new(1000, 800), "image/jpeg"));
        let pool = pool(&factory);
        let tile = pool
            .decode_region(RectI::new(0, 0, 500, 400), 2, None)
            .unwrap()
            .unwrap();
        assert_eq!(tile.dimensions(), (250, 200));
        let tile = pool
            .decode_region(RectI::new(900, 700, 1000, 800), 4, None)
            .unwrap()
            .unwrap();
        assert_eq!(tile.dimensions(), (25, 25));
        // the template plus one working copy
        assert_eq!(factory.decoders_created.load(Ordering::SeqCst), 2);
        assert_eq!(pool.idle_count(), 1);
        assert!(pool
            .decode_region(RectI::new(2000, 0, 2100, 10), 1, None)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_pool_destroy() {
        let factory = Arc::new(FakeDecoderFactory::new(SizeI::new(100, 100), "image/png"));
        let pool = pool(&factory);
        pool.decode_region(RectI::new(0, 0, 10, 10), 1, None).unwrap();
        pool.destroy();
        pool.destroy();
        assert_eq!(factory.destroyed.load(Ordering::SeqCst), 2);
        assert!(matches!(
            pool.decode_region(RectI::new(0, 0, 10, 10), 1, None),
            Err(ZoomError::Destroyed)
        ));
    }
}
