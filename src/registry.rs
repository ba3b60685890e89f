//! The Capability Registry: a process-local, injective mapping from capability
//! name to owning handle (§4.1). Mutable only during the single-threaded
//! bootstrap phase; read-only for the remainder of the process's life.

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

use crate::component::ComponentRuntime;
use crate::errors::{self, ErrorKind};
use crate::Result;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Whoever produces a capability: either a local component, or the RAB
/// standing in for a producer hosted on a peer process.
#[derive(Clone)]
pub enum Owner {
    Local(Arc<ComponentRuntime>),
    Remote,
}

#[derive(Default)]
pub struct Registry {
    table: RwLock<HashMap<String, Owner>>,
}

impl Registry {
    pub fn new() -> Arc<Self> {
        Arc::new(Registry::default())
    }

    /// Register `name` as owned by `owner`. Fails if the name was already
    /// claimed by an earlier registration.
    pub fn register(&self, name: &str, owner: Owner) -> Result<()> {
        let mut table = self.table.write().unwrap();
        if table.contains_key(name) {
            return Err(errors::new(ErrorKind::ConfigError(format!(
                "duplicate definition of capability '{}'",
                name
            ))));
        }
        trace!("registered capability '{}'", name);
        table.insert(name.to_string(), owner);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<Owner> {
        self.table.read().unwrap().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.read().unwrap().contains_key(name)
    }

    /// All capability names registered to local components, excluding
    /// `general` (which is replicated rather than exchanged, per §4.4 step 2).
    pub fn local_capability_names(&self) -> Vec<String> {
        self.table
            .read()
            .unwrap()
            .iter()
            .filter(|(name, owner)| matches!(owner, Owner::Local(_)) && name.as_str() != "general")
            .map(|(name, _)| name.clone())
            .collect()
    }
}
