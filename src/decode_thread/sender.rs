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

use async_channel::Sender;

use crate::decode_thread::model::{DecodeCommand, DecodeCommandMessage};

/// Queues decode commands under the current epoch
#[derive(Debug, Clone)]
pub struct DecodeThreadSender {
    sender: Sender<DecodeCommandMessage>,
    epoch: Arc<AtomicU32>,
}

impl DecodeThreadSender {
    pub fn new(sender: Sender<DecodeCommandMessage>, epoch: Arc<AtomicU32>) -> Self {
        Self { sender, epoch }
    }

    pub fn send(&self, command: DecodeCommand) {
        let msg = DecodeCommandMessage {
            id: self.epoch(),
            cmd: command,
        };
        if let Err(e) = self.sender.try_send(msg) {
            log::error!("Failed to queue decode command {e}");
        }
    }

    /// Makes every queued and running command stale
    pub fn invalidate(&self) -> u32 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn epoch(&self) -> u32 {
        self.epoch.load(Ordering::SeqCst)
    }
}
