//! Concrete binding of the cross-process transport assumption (§4.4) to NATS.
//! NATS has no native collective operations, so `gather` and `barrier` are
//! built out of request/reply plus a per-run namespaced subject tree, with
//! the lowest-ranked peer acting as collector.

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

use crate::errors::{self, ErrorKind};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Identifies one process within a multi-process run. Rank 0 is always the
/// supervisor that parses configuration and distributes assignments (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeerId(pub u32);

pub const SUPERVISOR_PEER: PeerId = PeerId(0);

const GATHER_TIMEOUT: Duration = Duration::from_secs(60);
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Serialize, Deserialize)]
struct GatherEntry {
    peer: u32,
    value: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct RequestEnvelope {
    origin: u32,
    tag: u64,
    capability: String,
}

#[derive(Serialize, Deserialize)]
struct ResponseEnvelope {
    payload: std::result::Result<crate::component::CapabilityValue, String>,
}

#[derive(Serialize, Deserialize)]
struct AssignmentEnvelope {
    sections: Vec<crate::config::SectionSpec>,
    global: crate::component::Params,
}

const ABORT_POLL_SLICE: Duration = Duration::from_millis(200);

/// One NATS connection plus the run's subject namespace. Cheap to clone: the
/// underlying `nats::Connection` is itself reference-counted.
#[derive(Clone)]
pub struct Transport {
    conn: nats::Connection,
    prefix: String,
    peer_id: PeerId,
    n_peers: u32,
    abort_sub: std::sync::Arc<nats::Subscription>,
}

impl Transport {
    pub fn connect(url: &str, run_id: &str, peer_id: PeerId, n_peers: u32) -> Result<Self> {
        let conn = nats::connect(url).map_err(|e| errors::new(ErrorKind::Nats(e)))?;
        let prefix = format!("modelcoupler.{}", run_id);
        let abort_sub = conn
            .subscribe(&format!("{}.abort", prefix))
            .map_err(|e| errors::new(ErrorKind::Nats(e)))?;
        Ok(Transport {
            conn,
            prefix,
            peer_id,
            n_peers,
            abort_sub: std::sync::Arc::new(abort_sub),
        })
    }

    /// Check whether some peer has already broadcast a group abort and, if
    /// so, join it immediately rather than waiting to discover the failure
    /// some other way (§4.4/§7: a listener failure on one peer must not leave
    /// the others stuck waiting). Never returns once a notice is found.
    fn check_abort(&self) {
        if let Ok(msg) = self.abort_sub.next_timeout(Duration::from_millis(0)) {
            let reason = String::from_utf8_lossy(&msg.data).into_owned();
            self.abort(&format!("peer group aborted: {}", reason));
        }
    }

    /// Block on `sub` for up to `total_timeout`, polling in short slices so a
    /// group abort broadcast by another peer is noticed and acted on well
    /// before the timeout would otherwise elapse.
    fn recv_with_timeout(&self, sub: &nats::Subscription, total_timeout: Duration) -> Result<nats::Message> {
        let deadline = std::time::Instant::now() + total_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                return Err(errors::new(ErrorKind::TransportFailure(
                    "timed out waiting for a transport message".to_string(),
                )));
            }
            let slice = remaining.min(ABORT_POLL_SLICE);
            match sub.next_timeout(slice) {
                Ok(msg) => return Ok(msg),
                Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    self.check_abort();
                }
                Err(e) => return Err(errors::new(ErrorKind::Nats(e))),
            }
        }
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    fn subject(&self, suffix: &str) -> String {
        format!("{}.{}", self.prefix, suffix)
    }

    /// Collective gather of one string list per peer (§4.4 step 2: capability
    /// name exchange). Every peer must call this at the same logical point;
    /// the supervisor additionally collects and rebroadcasts.
    pub fn gather(&self, value: &[String]) -> Result<Vec<Vec<String>>> {
        let result_subject = self.subject("gather.result");
        let submit_subject = self.subject("gather.submit");

        let result_sub = self
            .conn
            .subscribe(&result_subject)
            .map_err(|e| errors::new(ErrorKind::Nats(e)))?;

        let entry = GatherEntry {
            peer: self.peer_id.0,
            value: value.to_vec(),
        };
        self.conn
            .publish(&submit_subject, serde_json::to_vec(&entry)?)
            .map_err(|e| errors::new(ErrorKind::Nats(e)))?;

        if self.peer_id == SUPERVISOR_PEER {
            self.collect_and_broadcast(&submit_subject, &result_subject)?;
        }

        let msg = self.recv_with_timeout(&result_sub, GATHER_TIMEOUT)?;
        let _ = result_sub.unsubscribe();
        Ok(serde_json::from_slice(&msg.data)?)
    }

    fn collect_and_broadcast(&self, submit_subject: &str, result_subject: &str) -> Result<()> {
        let submit_sub = self
            .conn
            .subscribe(submit_subject)
            .map_err(|e| errors::new(ErrorKind::Nats(e)))?;
        let mut collected: Vec<Option<Vec<String>>> = vec![None; self.n_peers as usize];

        while collected.iter().any(Option::is_none) {
            let msg = self.recv_with_timeout(&submit_sub, GATHER_TIMEOUT)?;
            let entry: GatherEntry = serde_json::from_slice(&msg.data)?;
            collected[entry.peer as usize] = Some(entry.value);
        }
        let _ = submit_sub.unsubscribe();

        let final_values: Vec<Vec<String>> = collected.into_iter().map(|v| v.unwrap()).collect();
        self.conn
            .publish(result_subject, serde_json::to_vec(&final_values)?)
            .map_err(|e| errors::new(ErrorKind::Nats(e)))?;
        Ok(())
    }

    /// Collective barrier (§4.5 step 7): every peer blocks until every other
    /// peer has also called `barrier`. Implemented as a gather whose payload
    /// carries no information.
    pub fn barrier(&self) -> Result<()> {
        self.gather(&[]).map(|_| ())
    }

    /// Send a REQUEST for `capability` to `dest`, tagged with `tag` (§4.4,
    /// outbound path step 2).
    pub fn send_request(&self, dest: PeerId, tag: u64, capability: &str) -> Result<()> {
        let envelope = RequestEnvelope {
            origin: self.peer_id.0,
            tag,
            capability: capability.to_string(),
        };
        self.conn
            .publish(&self.subject(&format!("req.{}", dest.0)), serde_json::to_vec(&envelope)?)
            .map_err(|e| errors::new(ErrorKind::Nats(e)))
    }

    /// Block until the RESPONSE for `tag` arrives from `source` (§4.4,
    /// outbound path step 3). The per-tag subject means no dispatch table is
    /// needed on the receiving side.
    pub fn recv_response(&self, source: PeerId, tag: u64) -> Result<crate::component::CapabilityValue> {
        let subject = self.subject(&format!("resp.{}.{}", source.0, tag));
        let sub = self
            .conn
            .subscribe(&subject)
            .map_err(|e| errors::new(ErrorKind::Nats(e)))?;
        let msg = self.recv_with_timeout(&sub, RESPONSE_TIMEOUT)?;
        let _ = sub.unsubscribe();
        let envelope: ResponseEnvelope = serde_json::from_slice(&msg.data)?;
        envelope
            .payload
            .map_err(|msg| errors::new(ErrorKind::ProducerFailed(msg)))
    }

    /// Send a RESPONSE back to `dest` for `tag` (§4.4, inbound path step 2).
    pub fn send_response(
        &self,
        dest: PeerId,
        tag: u64,
        payload: std::result::Result<crate::component::CapabilityValue, String>,
    ) -> Result<()> {
        let envelope = ResponseEnvelope { payload };
        self.conn
            .publish(&self.subject(&format!("resp.{}.{}", dest.0, tag)), serde_json::to_vec(&envelope)?)
            .map_err(|e| errors::new(ErrorKind::Nats(e)))
    }

    /// Send this peer's `[Section]` assignment, along with the `[Global]`
    /// section parsed by the supervisor, so `[Global]` is replicated to every
    /// peer exactly as it is to the supervisor itself (§4.5 step 2). Distinct
    /// subject tree from capability REQUEST/RESPONSE so a late-starting RAB
    /// listener can never mistake a bootstrap message for a fetch request.
    pub fn send_assignment(
        &self,
        dest: PeerId,
        sections: &[crate::config::SectionSpec],
        global: &crate::component::Params,
    ) -> Result<()> {
        let envelope = AssignmentEnvelope {
            sections: sections.to_vec(),
            global: global.clone(),
        };
        self.conn
            .publish(&self.subject(&format!("assign.{}", dest.0)), serde_json::to_vec(&envelope)?)
            .map_err(|e| errors::new(ErrorKind::Nats(e)))
    }

    /// Block until this peer's assignment arrives (§4.5 step 3, worker side),
    /// returning both its sections and the replicated `[Global]` parameters.
    pub fn recv_assignment(&self) -> Result<(Vec<crate::config::SectionSpec>, crate::component::Params)> {
        let subject = self.subject(&format!("assign.{}", self.peer_id.0));
        let sub = self
            .conn
            .subscribe(&subject)
            .map_err(|e| errors::new(ErrorKind::Nats(e)))?;
        let msg = self.recv_with_timeout(&sub, GATHER_TIMEOUT)?;
        let _ = sub.unsubscribe();
        let envelope: AssignmentEnvelope = serde_json::from_slice(&msg.data)?;
        Ok((envelope.sections, envelope.global))
    }

    /// Subscribe to this peer's inbound request subject. Returned handle is
    /// polled non-blockingly by the RAB listener loop (§4.4 inbound path step
    /// 1).
    pub fn request_listener(&self) -> Result<RequestListener> {
        let sub = self
            .conn
            .subscribe(&self.subject(&format!("req.{}", self.peer_id.0)))
            .map_err(|e| errors::new(ErrorKind::Nats(e)))?;
        Ok(RequestListener { sub })
    }

    /// Abort the whole process group: broadcast a notice every other peer's
    /// blocking waits and RAB listener loop poll for (`check_abort`,
    /// `recv_with_timeout`), flush, and terminate this process. §4.4/§7: a
    /// RAB listener failure must not leave remote waiters stranded until a
    /// timeout.
    pub fn abort(&self, reason: &str) -> ! {
        error!("aborting process group: {}", reason);
        let _ = self
            .conn
            .publish(&self.subject("abort"), reason.as_bytes());
        let _ = self.conn.flush();
        std::process::exit(1);
    }

    /// Give the RAB listener loop (and anything else polling cooperatively
    /// rather than blocking inside `recv_with_timeout`) a way to notice a
    /// group abort broadcast by another peer. Joins the abort immediately if
    /// one is pending; otherwise returns.
    pub(crate) fn poll_abort(&self) {
        self.check_abort();
    }
}

/// Non-blocking view of a peer's inbound request subject.
pub struct RequestListener {
    sub: nats::Subscription,
}

impl RequestListener {
    /// Drain one pending request, if any, without blocking (§4.4 inbound path
    /// step 1.A).
    pub fn try_next(&self) -> Result<Option<(PeerId, u64, String)>> {
        match self.sub.next_timeout(Duration::from_millis(0)) {
            Ok(msg) => {
                let envelope: RequestEnvelope = serde_json::from_slice(&msg.data)?;
                Ok(Some((PeerId(envelope.origin), envelope.tag, envelope.capability)))
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(errors::new(ErrorKind::Nats(e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_id_orders_by_rank() {
        assert!(PeerId(0) < PeerId(1));
        assert_eq!(SUPERVISOR_PEER, PeerId(0));
    }
}
