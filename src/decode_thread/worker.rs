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

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use async_channel::{Receiver, Sender};

use crate::{
    decode_thread::model::{DecodeCommand, DecodeCommandMessage, DecodeReply, DecodeReplyMessage},
    error::{ZoomError, ZoomResult},
    profile::performance::Performance,
    subsampling::cache::TileBitmap,
};

#[derive(Debug, Clone)]
pub struct DecodeWorker {
    name: String,
    to_dt_receiver: Receiver<DecodeCommandMessage>,
    from_dt_sender: Sender<DecodeReplyMessage>,
    epoch: Arc<AtomicU32>,
}

impl DecodeWorker {
    pub fn new(
        name: String,
        from_dt_sender: Sender<DecodeReplyMessage>,
        to_dt_receiver: Receiver<DecodeCommandMessage>,
        epoch: Arc<AtomicU32>,
    ) -> Self {
        DecodeWorker {
            name,
            to_dt_receiver,
            from_dt_sender,
            epoch,
        }
    }

    /// Runs until the command channel is closed
    pub fn run(&self) {
        while let Ok(command) = self.to_dt_receiver.recv_blocking() {
            if let Some(reply) = self.process_command(command) {
                if let Err(e) = self.from_dt_sender.send_blocking(reply) {
                    log::error!("{}: failed to send reply {e}", self.name);
                    break;
                }
            }
        }
        log::debug!("{}: command channel closed, stopping", self.name);
    }

    fn current_epoch(&self) -> u32 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub fn process_command(&self, command: DecodeCommandMessage) -> Option<DecodeReplyMessage> {
        if command.id != self.current_epoch() {
            log::debug!(
                "There are newer commands in the queue, skipping id {}",
                command.id
            );
            return None;
        }
        let cmd = command.cmd;
        if cmd.cancel.load(Ordering::SeqCst) {
            log::trace!("Tile {} cancelled, skipping", cmd.cache_key);
            return None;
        }

        let reply = match self.decode_tile(&cmd) {
            Ok((bitmap, from_cache)) => DecodeReply::TileDone {
                request_id: cmd.request_id,
                coordinate: cmd.coordinate,
                sample_size: cmd.sample_size,
                bitmap,
                from_cache,
            },
            Err(e) => {
                log::warn!("Tile {} failed to decode: {e}", cmd.cache_key);
                DecodeReply::TileFailed {
                    request_id: cmd.request_id,
                    coordinate: cmd.coordinate,
                    sample_size: cmd.sample_size,
                    error: e.to_string(),
                }
            }
        };

        if command.id != self.current_epoch() {
            log::debug!(
                "Result from tile decode not needed anymore. Discarding id {}",
                command.id
            );
            if let DecodeReply::TileDone { bitmap, .. } = reply {
                bitmap.recycle(cmd.context.allocator.as_deref());
            }
            return None;
        }
        Some(DecodeReplyMessage {
            id: command.id,
            reply,
        })
    }

    fn decode_tile(&self, cmd: &DecodeCommand) -> ZoomResult<(TileBitmap, bool)> {
        let context = &cmd.context;
        let cache = context.cache.as_ref().filter(|cache| !cache.is_disabled());
        if let Some(bitmap) = cache.and_then(|cache| cache.get(&cmd.cache_key)) {
            return Ok((bitmap, true));
        }

        let duration = Performance::start();
        let allocator = if context.disabled_reuse {
            None
        } else {
            context.allocator.as_deref()
        };
        let result = match context
            .pool
            .decode_region(cmd.src_rect, cmd.sample_size, allocator)
        {
            Err(e) if allocator.is_some() && !matches!(e, ZoomError::Destroyed) => {
                log::debug!(
                    "Tile {} failed with buffer reuse ({e}), retrying without",
                    cmd.cache_key
                );
                context
                    .pool
                    .decode_region(cmd.src_rect, cmd.sample_size, None)
            }
            result => result,
        };
        let image = result?.ok_or(ZoomError::EmptyRegion(cmd.src_rect, cmd.sample_size))?;
        duration.elapsed_suffix("tile decode", &cmd.cache_key);

        let bitmap = TileBitmap::new(&cmd.cache_key, image);
        if let Some(cache) = cache {
            cache.put(
                &cmd.cache_key,
                bitmap.clone(),
                &context.image_key,
                &context.image_info,
            );
        }
        Ok((bitmap, false))
    }
}
