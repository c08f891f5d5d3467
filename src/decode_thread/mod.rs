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

pub mod model;
mod sender;
mod worker;

use std::{
    sync::{atomic::AtomicU32, Arc},
    thread::{self, JoinHandle},
};

use async_channel::{Receiver, Sender};

use crate::decode_thread::{
    model::{DecodeCommandMessage, DecodeReplyMessage},
    worker::DecodeWorker,
};

pub use sender::DecodeThreadSender;

/// Pool of tile decode workers sharing one command queue. Workers stop
/// when every sender of the command channel is dropped.
#[derive(Debug)]
pub struct DecodeThread {
    _handles: Vec<JoinHandle<()>>,
    epoch: Arc<AtomicU32>,
}

impl DecodeThread {
    pub fn new(
        threads: usize,
        from_dt_sender: Sender<DecodeReplyMessage>,
        to_dt_receiver: Receiver<DecodeCommandMessage>,
    ) -> Self {
        let epoch = Arc::new(AtomicU32::new(0));
        let handles = (0..threads.max(1))
            .filter_map(|index| {
                let name = format!("zoomtile-decode-{index}");
                let worker = DecodeWorker::new(
                    name.clone(),
                    from_dt_sender.clone(),
                    to_dt_receiver.clone(),
                    epoch.clone(),
                );
                match thread::Builder::new().name(name).spawn(move || worker.run()) {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        log::error!("Failed to start decode worker {index}: {e}");
                        None
                    }
                }
            })
            .collect();
        DecodeThread {
            _handles: handles,
            epoch,
        }
    }

    pub fn create_sender(&self, to_dt_sender: Sender<DecodeCommandMessage>) -> DecodeThreadSender {
        DecodeThreadSender::new(to_dt_sender, self.epoch.clone())
    }
}
