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

use std::sync::{atomic::AtomicBool, Arc};

use crate::{
    rect::{PointI, RectI},
    subsampling::{
        cache::{TileBitmap, TileBitmapCache, TileBufferAllocator},
        decoder::DecoderPool,
        source::ImageInfo,
    },
};

/// Everything a worker needs to decode tiles of one image
#[derive(Debug)]
pub struct DecodeContext {
    pub pool: DecoderPool,
    pub cache: Option<Arc<dyn TileBitmapCache>>,
    pub allocator: Option<Arc<dyn TileBufferAllocator>>,
    pub image_key: String,
    pub image_info: ImageInfo,
    pub disabled_reuse: bool,
}

#[derive(Debug, Clone)]
pub struct DecodeCommand {
    pub request_id: u64,
    pub coordinate: PointI,
    pub sample_size: u32,
    pub src_rect: RectI,
    pub cache_key: String,
    pub cancel: Arc<AtomicBool>,
    pub context: Arc<DecodeContext>,
}

#[derive(Debug, Clone)]
pub struct DecodeCommandMessage {
    pub id: u32,
    pub cmd: DecodeCommand,
}

#[derive(Debug, Clone)]
pub enum DecodeReply {
    TileDone {
        request_id: u64,
        coordinate: PointI,
        sample_size: u32,
        bitmap: TileBitmap,
        from_cache: bool,
    },
    TileFailed {
        request_id: u64,
        coordinate: PointI,
        sample_size: u32,
        error: String,
    },
}

impl DecodeReply {
    pub fn request_id(&self) -> u64 {
        match self {
            DecodeReply::TileDone { request_id, .. } | DecodeReply::TileFailed { request_id, .. } => {
                *request_id
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecodeReplyMessage {
    pub id: u32,
    pub reply: DecodeReply,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_send_sync() {
        assert_send_sync::<DecodeCommandMessage>();
        assert_send_sync::<DecodeReplyMessage>();
        assert_send_sync::<TileBitmap>();
    }
}
