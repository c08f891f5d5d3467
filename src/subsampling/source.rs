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
    fmt::{Debug, Display},
    fs::File,
    io::{BufRead, BufReader, Cursor, Seek},
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{error::ZoomResult, rect::SizeI};

pub trait ReadSeek: BufRead + Seek + Send {}

impl<T: BufRead + Seek + Send> ReadSeek for T {}

/// Where the original image bytes come from. Each call to `open_source`
/// returns a fresh stream positioned at the start.
pub trait ImageSource: Send + Sync + Debug {
    /// Stable identity, used for cache keys and to detect source changes
    fn key(&self) -> &str;

    fn open_source(&self) -> ZoomResult<Box<dyn ReadSeek>>;
}

#[derive(Debug, Clone)]
pub struct FileImageSource {
    path: PathBuf,
    key: String,
}

impl FileImageSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            key: format!("file://{}", path.to_string_lossy()),
        }
    }
}

impl ImageSource for FileImageSource {
    fn key(&self) -> &str {
        &self.key
    }

    fn open_source(&self) -> ZoomResult<Box<dyn ReadSeek>> {
        Ok(Box::new(BufReader::new(File::open(&self.path)?)))
    }
}

#[derive(Clone)]
pub struct MemoryImageSource {
    key: String,
    data: Arc<[u8]>,
}

impl MemoryImageSource {
    pub fn new(key: &str, data: Vec<u8>) -> Self {
        Self {
            key: key.to_string(),
            data: data.into(),
        }
    }
}

impl Debug for MemoryImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryImageSource")
            .field("key", &self.key)
            .field("len", &self.data.len())
            .finish()
    }
}

impl ImageSource for MemoryImageSource {
    fn key(&self) -> &str {
        &self.key
    }

    fn open_source(&self) -> ZoomResult<Box<dyn ReadSeek>> {
        Ok(Box::new(Cursor::new(self.data.clone())))
    }
}

/// Dimensions (after EXIF orientation) and type of the original image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub size: SizeI,
    pub mime_type: String,
}

impl ImageInfo {
    pub fn new(size: SizeI, mime_type: &str) -> Self {
        Self {
            size,
            mime_type: mime_type.to_string(),
        }
    }

    pub fn width(&self) -> i32 {
        self.size.width()
    }

    pub fn height(&self) -> i32 {
        self.size.height()
    }
}

impl Display for ImageInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ImageInfo({}x{},'{}')",
            self.width(),
            self.height(),
            self.mime_type
        )
    }
}
