//! The Fetch Router (§4.3): a stateless dispatcher that resolves a capability
//! name to either a local component's rendezvous or the RAB's remote path.

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

use crate::component::{CapabilityValue, ComponentRuntime};
use crate::errors::{self, ErrorKind};
use crate::registry::{Owner, Registry};
use crate::Result;
use std::sync::{Arc, RwLock};

#[cfg(feature = "mp")]
use crate::rab::Rab;

pub struct FetchRouter {
    registry: Arc<Registry>,
    #[cfg(feature = "mp")]
    rab: RwLock<Option<Arc<Rab>>>,
}

impl FetchRouter {
    pub fn new(registry: Arc<Registry>) -> Arc<Self> {
        Arc::new(FetchRouter {
            registry,
            #[cfg(feature = "mp")]
            rab: RwLock::new(None),
        })
    }

    #[cfg(feature = "mp")]
    pub fn attach_rab(&self, rab: Arc<Rab>) {
        *self.rab.write().unwrap() = Some(rab);
    }

    /// Resolve `capability` on behalf of `requester`, blocking until it is
    /// available (§4.3 algorithm steps 1-4).
    pub fn fetch(&self, requester: &Arc<ComponentRuntime>, capability: &str) -> Result<Arc<CapabilityValue>> {
        match self.registry.lookup(capability) {
            None => Err(errors::new(ErrorKind::CapabilityNotFound(
                capability.to_string(),
            ))),
            Some(Owner::Local(owner)) => {
                if Arc::ptr_eq(&owner, requester) {
                    return Err(errors::new(ErrorKind::SelfFetch(capability.to_string())));
                }
                owner.fetch_own(capability)
            }
            Some(Owner::Remote) => self.fetch_remote(capability),
        }
    }

    #[cfg(feature = "mp")]
    fn fetch_remote(&self, capability: &str) -> Result<Arc<CapabilityValue>> {
        let rab = self.rab.read().unwrap().clone().expect(
            "capability registered to the RAB but no RAB attached - bootstrap bug",
        );
        rab.fetch_remote(capability).map(Arc::new)
    }

    #[cfg(not(feature = "mp"))]
    fn fetch_remote(&self, capability: &str) -> Result<Arc<CapabilityValue>> {
        Err(errors::new(ErrorKind::TransportFailure(format!(
            "capability '{}' is hosted on a remote peer, but this binary was built without the `mp` feature",
            capability
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Component, Params, RunContext};

    struct NoOp;
    impl Component for NoOp {
        fn run(&mut self, _ctx: &RunContext) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn fetch_of_unregistered_capability_errors() {
        let registry = Registry::new();
        let router = FetchRouter::new(registry.clone());
        let requester = ComponentRuntime::new(
            "requester".into(),
            "NoOp".into(),
            Params::new(),
            Box::new(NoOp),
        );
        let err = router.fetch(&requester, "nope").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::CapabilityNotFound(_)));
    }

    #[test]
    fn self_fetch_is_rejected() {
        let registry = Registry::new();
        let router = FetchRouter::new(registry.clone());
        let requester = ComponentRuntime::new(
            "requester".into(),
            "NoOp".into(),
            Params::new(),
            Box::new(NoOp),
        );
        requester.attach_registry(registry.clone());
        registry
            .register("own_cap", Owner::Local(requester.clone()))
            .unwrap();
        let err = router.fetch(&requester, "own_cap").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::SelfFetch(_)));
    }
}
