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

use std::sync::{Arc, Mutex};

use image::{ImageReader, RgbaImage};

use crate::{
    error::{ZoomError, ZoomResult},
    profile::performance::Performance,
    rect::{RectI, SizeI},
    subsampling::{
        cache::TileBufferAllocator,
        decoder::{RegionDecoder, RegionDecoderFactory},
        exif::{apply_orientation, exif_orientation, orientation_swaps_axes, ExifReader},
        source::{ImageInfo, ImageSource},
    },
};

/// Region decoding on top of the `image` crate. The codecs there cannot
/// decode a region directly, so the first region request decodes the whole
/// image once and all decoders of the image share the result.
///
/// The full RGBA image stays resident until the decoder pool is destroyed,
/// about 133 MB for a 6799x4890 image. Tiles bound what is drawn and cached,
/// not what this backend holds. A backend with true region decoding is needed
/// to also bound decoder memory.
#[derive(Debug, Default)]
pub struct ImageRsDecoderFactory;

impl RegionDecoderFactory for ImageRsDecoderFactory {
    fn read_image_info(&self, source: &dyn ImageSource) -> ZoomResult<ImageInfo> {
        let duration = Performance::start();
        let mut reader = source.open_source()?;
        let orientation = reader.exif().map(|exif| exif_orientation(&exif)).unwrap_or(1);
        let image_reader = ImageReader::new(reader).with_guessed_format()?;
        let Some(format) = image_reader.format() else {
            return Err("Unrecognized image format".into());
        };
        let (width, height) = image_reader.into_dimensions()?;
        let size = SizeI::new(width as i32, height as i32);
        let size = if orientation_swaps_axes(orientation) {
            size.rotate(90)
        } else {
            size
        };
        let info = ImageInfo::new(size, format.to_mime_type());
        duration.elapsed_suffix("image info", source.key());
        Ok(info)
    }

    fn create_decoder(
        &self,
        source: Arc<dyn ImageSource>,
        image_info: &ImageInfo,
    ) -> ZoomResult<Box<dyn RegionDecoder>> {
        Ok(Box::new(ImageRsRegionDecoder {
            source,
            image_info: image_info.clone(),
            full: Arc::new(Mutex::new(None)),
        }))
    }
}

pub struct ImageRsRegionDecoder {
    source: Arc<dyn ImageSource>,
    image_info: ImageInfo,
    full: Arc<Mutex<Option<Arc<RgbaImage>>>>,
}

impl ImageRsRegionDecoder {
    fn decode_full(&self) -> ZoomResult<RgbaImage> {
        let duration = Performance::start();
        let mut reader = self.source.open_source()?;
        let orientation = reader.exif().map(|exif| exif_orientation(&exif)).unwrap_or(1);
        let image = ImageReader::new(reader).with_guessed_format()?.decode()?;
        let image = apply_orientation(image.into_rgba8(), orientation);
        duration.elapsed_suffix("full decode", self.source.key());
        let (width, height) = image.dimensions();
        if SizeI::new(width as i32, height as i32) != self.image_info.size {
            log::warn!(
                "Decoded {} is {width}x{height}, expected {}",
                self.source.key(),
                self.image_info
            );
        }
        Ok(image)
    }

    /// The fully decoded image, decoding it on first use. Holding the lock
    /// while decoding keeps other workers from decoding it again.
    fn full_image(&self) -> ZoomResult<Arc<RgbaImage>> {
        let mut full = self
            .full
            .lock()
            .map_err(|_| ZoomError::from("Region decoder lock poisoned"))?;
        if let Some(image) = full.as_ref() {
            return Ok(image.clone());
        }
        let image = Arc::new(self.decode_full()?);
        *full = Some(image.clone());
        Ok(image)
    }
}

/// Box filter: every output pixel averages a `sample_size` square of `rect`.
fn downsample_into(src: &RgbaImage, rect: RectI, sample_size: u32, dst: &mut RgbaImage) {
    let (x_end, y_end) = (rect.x1 as u32, rect.y1 as u32);
    for (dx, dy, pixel) in dst.enumerate_pixels_mut() {
        let x0 = rect.x0 as u32 + dx * sample_size;
        let y0 = rect.y0 as u32 + dy * sample_size;
        let x1 = (x0 + sample_size).min(x_end);
        let y1 = (y0 + sample_size).min(y_end);
        let mut sum = [0u32; 4];
        for y in y0..y1 {
            for x in x0..x1 {
                let p = src.get_pixel(x, y);
                for (s, c) in sum.iter_mut().zip(p.0) {
                    *s += c as u32;
                }
            }
        }
        let count = ((x1 - x0) * (y1 - y0)).max(1);
        for (c, s) in pixel.0.iter_mut().zip(sum) {
            *c = ((s + count / 2) / count) as u8;
        }
    }
}

impl RegionDecoder for ImageRsRegionDecoder {
    fn image_info(&self) -> &ImageInfo {
        &self.image_info
    }

    fn decode_region(
        &mut self,
        src_rect: RectI,
        sample_size: u32,
        allocator: Option<&dyn TileBufferAllocator>,
    ) -> ZoomResult<Option<RgbaImage>> {
        let full = self.full_image()?;
        let (width, height) = full.dimensions();
        let rect = src_rect.intersect(&RectI::new(0, 0, width as i32, height as i32));
        if rect.is_empty() {
            return Ok(None);
        }
        let sample_size = sample_size.max(1);
        let out_width = (rect.width() as u32).div_ceil(sample_size);
        let out_height = (rect.height() as u32).div_ceil(sample_size);
        let mut tile = match allocator.and_then(|a| a.acquire(out_width, out_height)) {
            Some(buffer) if buffer.dimensions() != (out_width, out_height) => {
                let (w, h) = buffer.dimensions();
                return Err(ZoomError::BitmapReuse(format!(
                    "buffer is {w}x{h}, region needs {out_width}x{out_height}"
                )));
            }
            Some(buffer) => buffer,
            None => RgbaImage::new(out_width, out_height),
        };
        downsample_into(&full, rect, sample_size, &mut tile);
        Ok(Some(tile))
    }

    fn copy(&self) -> ZoomResult<Box<dyn RegionDecoder>> {
        Ok(Box::new(ImageRsRegionDecoder {
            source: self.source.clone(),
            image_info: self.image_info.clone(),
            full: self.full.clone(),
        }))
    }

    fn destroy(&mut self) {
        if let Ok(mut full) = self.full.lock() {
            full.take();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageFormat, Rgba};

    use super::*;
    use crate::subsampling::{cache::FreeListAllocator, source::MemoryImageSource};

    fn png_source(width: u32, height: u32) -> Arc<dyn ImageSource> {
        let image = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 0, 255])
        });
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();
        Arc::new(MemoryImageSource::new("memory://test.png", bytes.into_inner()))
    }

    #[test]
    fn test_read_image_info() {
        let source = png_source(40, 30);
        let info = ImageRsDecoderFactory.read_image_info(source.as_ref()).unwrap();
        assert_eq!(info, ImageInfo::new(SizeI::new(40, 30), "image/png"));
    }

    #[test]
    fn test_unrecognized_format() {
        let source = MemoryImageSource::new("memory://junk", vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(ImageRsDecoderFactory.read_image_info(&source).is_err());
    }

    #[test]
    fn test_decode_region() {
        let source = png_source(40, 30);
        let info = ImageRsDecoderFactory.read_image_info(source.as_ref()).unwrap();
        let mut decoder = ImageRsDecoderFactory.create_decoder(source, &info).unwrap();

        let tile = decoder
            .decode_region(RectI::new(10, 5, 20, 15), 1, None)
            .unwrap()
            .unwrap();
        assert_eq!(tile.dimensions(), (10, 10));
        assert_eq!(tile.get_pixel(0, 0), &Rgba([10, 5, 0, 255]));

        // Box average of x 10..12 and y 4..6
        let tile = decoder
            .decode_region(RectI::new(10, 4, 40, 30), 2, None)
            .unwrap()
            .unwrap();
        assert_eq!(tile.dimensions(), (15, 13));
        assert_eq!(tile.get_pixel(0, 0), &Rgba([11, 5, 0, 255]));

        assert!(decoder
            .decode_region(RectI::new(50, 50, 60, 60), 1, None)
            .unwrap()
            .is_none());
    }

    #[derive(Debug)]
    struct WrongSizeAllocator;

    impl TileBufferAllocator for WrongSizeAllocator {
        fn acquire(&self, _width: u32, _height: u32) -> Option<RgbaImage> {
            Some(RgbaImage::new(1, 1))
        }

        fn release(&self, _buffer: RgbaImage) {}
    }

    #[test]
    fn test_buffer_reuse() {
        let source = png_source(40, 30);
        let info = ImageRsDecoderFactory.read_image_info(source.as_ref()).unwrap();
        let decoder = ImageRsDecoderFactory.create_decoder(source, &info).unwrap();
        let mut copy = decoder.copy().unwrap();

        let allocator = FreeListAllocator::default();
        allocator.release(RgbaImage::new(20, 15));
        let tile = copy
            .decode_region(RectI::new(0, 0, 40, 30), 2, Some(&allocator))
            .unwrap()
            .unwrap();
        assert_eq!(tile.dimensions(), (20, 15));
        assert_eq!(allocator.free_count(), 0);

        assert!(matches!(
            copy.decode_region(RectI::new(0, 0, 40, 30), 2, Some(&WrongSizeAllocator)),
            Err(ZoomError::BitmapReuse(_))
        ));
    }
}
