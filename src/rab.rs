//! The Remote Access Broker (§4.4): the per-process proxy that stands in for
//! every capability hosted on a peer process. Exists only in multi-process
//! mode.

// Copyright 2026 modelcoupler contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::component::CapabilityValue;
use crate::errors::{self, ErrorKind};
use crate::registry::{Owner, Registry};
use crate::transport::{PeerId, Transport};
use crate::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

type Completion = (PeerId, u64, std::result::Result<CapabilityValue, String>);

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(25);

pub struct Rab {
    transport: Transport,
    registry: Arc<Registry>,
    remote_caps: Mutex<HashMap<String, PeerId>>,
    next_tag: AtomicU64,
    terminate: AtomicBool,
    poll_interval: Duration,
}

impl Rab {
    pub fn new(transport: Transport, registry: Arc<Registry>) -> Arc<Self> {
        Arc::new(Rab {
            transport,
            registry,
            remote_caps: Mutex::new(HashMap::new()),
            next_tag: AtomicU64::new(0),
            terminate: AtomicBool::new(false),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Exchange local capability names with every peer (§4.4 bootstrap steps
    /// 2-3) and install a `Remote` registry entry plus a remote-capability
    /// table entry for everything owned elsewhere. Must run before any
    /// component starts.
    pub fn bootstrap(&self) -> Result<()> {
        let local = self.registry.local_capability_names();
        let all = self.transport.gather(&local)?;

        let mut remote_caps = self.remote_caps.lock().unwrap();
        for (rank, caps) in all.iter().enumerate() {
            if rank as u32 == self.transport.peer_id().0 {
                continue;
            }
            for cap in caps {
                if self.registry.contains(cap) {
                    return Err(errors::new(ErrorKind::ConfigError(format!(
                        "duplicate definition of capability '{}' across peers",
                        cap
                    ))));
                }
                self.registry.register(cap, Owner::Remote)?;
                remote_caps.insert(cap.clone(), PeerId(rank as u32));
            }
        }
        Ok(())
    }

    /// Fetch a capability hosted on a peer process, blocking until the
    /// response arrives (§4.4, outbound path).
    pub fn fetch_remote(&self, capability: &str) -> Result<CapabilityValue> {
        let peer = *self
            .remote_caps
            .lock()
            .unwrap()
            .get(capability)
            .ok_or_else(|| errors::new(ErrorKind::CapabilityNotFound(capability.to_string())))?;

        let tag = self.next_tag.fetch_add(1, Ordering::SeqCst);
        debug!("requesting '{}' from peer {} (tag {})", capability, peer.0, tag);
        self.transport.send_request(peer, tag, capability)?;
        self.transport.recv_response(peer, tag)
    }

    /// Launch the listener thread (§4.4, inbound path). Must be started
    /// before any local component, so that remote peers never find this
    /// process unresponsive while it still has capabilities to serve.
    pub fn run(self: &Arc<Self>) -> Result<JoinHandle<()>> {
        let rab = self.clone();
        let listener = self.transport.request_listener()?;
        Ok(thread::Builder::new()
            .name("rab-listener".to_string())
            .spawn(move || rab.listen(listener))
            .expect("failed to spawn RAB listener thread"))
    }

    /// Tell the listener loop to exit once all outstanding work drains
    /// (§4.5 step 8). Does not itself block; caller still joins the thread.
    pub fn shutdown(&self) {
        self.terminate.store(true, Ordering::SeqCst);
    }

    /// Cooperative loop per §4.4: drain inbound requests into worker threads,
    /// drain worker completions back to their requesting peers, check for a
    /// group abort broadcast by another peer, then sleep. `outstanding` tracks
    /// in-flight count so termination can be held off until every worker has
    /// reported - no pending request is ever silently dropped.
    fn listen(self: Arc<Self>, listener: crate::transport::RequestListener) {
        let (done_tx, done_rx): (Sender<Completion>, Receiver<Completion>) = unbounded();
        let mut outstanding: usize = 0;

        loop {
            while let Some((origin, tag, capability)) = listener.try_next().unwrap_or_else(|e| {
                error!("RAB listener: error probing for requests: {}", e);
                None
            }) {
                let registry = self.registry.clone();
                let done_tx = done_tx.clone();
                outstanding += 1;
                thread::spawn(move || {
                    let result = match registry.lookup(&capability) {
                        Some(Owner::Local(owner)) => {
                            owner.fetch_own(&capability).map(|v| (*v).clone())
                        }
                        _ => Err(errors::new(ErrorKind::CapabilityNotFound(capability))),
                    };
                    let _ = done_tx.send((origin, tag, result.map_err(|e| e.to_string())));
                });
            }

            while let Ok((origin, tag, payload)) = done_rx.try_recv() {
                outstanding -= 1;
                if let Err(e) = self.transport.send_response(origin, tag, payload) {
                    error!("RAB listener: failed to send response to peer {}: {}", origin.0, e);
                }
            }

            if self.terminate.load(Ordering::SeqCst) && outstanding == 0 {
                break;
            }

            self.transport.poll_abort();
            thread::sleep(self.poll_interval);
        }
        info!("RAB listener exiting");
    }
}
