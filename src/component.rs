//! Component lifecycle: parameters, status, result slots, and the completion
//! rendezvous that lets consumers block on a not-yet-ready capability.

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
use crate::registry::Registry;
use crate::Result;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::thread::{self, JoinHandle};

/// A single parameter value parsed out of a configuration section. Sections are
/// flat string maps on disk, but a handful of keys (e.g. `capability_reqs`) are
/// naturally lists, so we keep both shapes around instead of forcing every
/// adapter to split strings on its own.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "mp", derive(serde::Serialize, serde::Deserialize))]
pub enum ParamValue {
    Scalar(String),
    List(Vec<String>),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Scalar(s) => Some(s.as_str()),
            ParamValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Vec<String> {
        match self {
            ParamValue::Scalar(s) => vec![s.clone()],
            ParamValue::List(v) => v.clone(),
        }
    }
}

pub type Params = HashMap<String, ParamValue>;

/// String-to-bool coercion shared by every boolean-valued parameter (§6):
/// `false`, `no`, `n`, `0` (case-insensitively) are false; everything else,
/// including values adapters don't recognize, is true.
pub fn coerce_bool(s: &str) -> bool {
    !matches!(s.to_lowercase().as_str(), "false" | "no" | "n" | "0")
}

/// The closed vocabulary of values a component may publish. Adapters that need
/// something richer than this should serialize it into `Text` themselves; the
/// framework deliberately does not accept arbitrary `Box<dyn Any>` payloads so
/// that remote (RAB-forwarded) fetches can serialize results the same way local
/// ones are stored.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "mp", derive(serde::Serialize, serde::Deserialize))]
pub enum CapabilityValue {
    Text(String),
    List(Vec<String>),
    Number(f64),
    Table(HashMap<String, CapabilityValue>),
}

/// Monotonic lifecycle state of a component. PENDING never reappears once a
/// terminal state has been reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pending,
    Success,
    Failure,
}

/// Work a component instance performs. Implementations are moved onto their own
/// thread by `ComponentRuntime::start`, so `run` takes `&mut self` rather than
/// `&self` - there is never more than one caller.
pub trait Component: Send {
    /// Capabilities this component knows it will provide before parameters are
    /// processed (phase 1 of §3's two-phase capability declaration).
    fn static_capabilities(&self) -> Vec<String> {
        Vec::new()
    }

    /// Fold parsed parameters into internal state and return any additional,
    /// parameter-derived capabilities (phase 2). Called once, synchronously,
    /// before any component starts.
    fn finalize(&mut self, _params: &Params) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    /// Do the component's work. Implementations must call `ctx.publish` for
    /// every capability they declared (static or derived) before returning Ok.
    fn run(&mut self, ctx: &RunContext) -> Result<()>;
}

/// Handed to a component's `run` method; the only way a component may publish
/// its own results or fetch someone else's.
pub struct RunContext {
    pub(crate) owner: Arc<ComponentRuntime>,
    pub(crate) router: Arc<crate::fetch::FetchRouter>,
}

impl RunContext {
    pub fn publish(&self, capability: &str, value: CapabilityValue) -> Result<()> {
        self.owner.publish(capability, value)
    }

    pub fn fetch(&self, capability: &str) -> Result<Arc<CapabilityValue>> {
        self.router.fetch(&self.owner, capability)
    }

    pub fn params(&self) -> Params {
        self.owner.params.clone()
    }

    pub fn component_name(&self) -> &str {
        &self.owner.name
    }

    /// Whether this component instance is configured to overwrite existing
    /// outputs (§6's reserved `clobber` key). Defaults to `true`; what
    /// "existing output" means is entirely up to the component, the same way
    /// it was left to each model wrapper in the source this framework is
    /// based on.
    pub fn clobber(&self) -> bool {
        self.owner.clobber
    }
}

struct RendezvousState {
    status: Status,
}

/// Per-component runtime state: the status/result monitor described in §4.2,
/// plus the metadata needed by the registry and the fetch router.
pub struct ComponentRuntime {
    pub name: String,
    pub type_tag: String,
    pub params: Params,
    clobber: bool,
    declared: RwLock<Vec<String>>,
    component: Mutex<Option<Box<dyn Component>>>,
    state: Mutex<RendezvousState>,
    cv: Condvar,
    results: Mutex<HashMap<String, Arc<CapabilityValue>>>,
    registry: RwLock<Option<Arc<Registry>>>,
}

impl ComponentRuntime {
    pub fn new(
        name: String,
        type_tag: String,
        params: Params,
        component: Box<dyn Component>,
    ) -> Arc<Self> {
        let declared = component.static_capabilities();
        let clobber = params
            .get("clobber")
            .and_then(|v| v.as_str())
            .map(coerce_bool)
            .unwrap_or(true);
        Arc::new(ComponentRuntime {
            name,
            type_tag,
            params,
            clobber,
            declared: RwLock::new(declared),
            component: Mutex::new(Some(component)),
            state: Mutex::new(RendezvousState {
                status: Status::Pending,
            }),
            cv: Condvar::new(),
            results: Mutex::new(HashMap::new()),
            registry: RwLock::new(None),
        })
    }

    /// Construct an already-SUCCESSFUL runtime with no body, used for the
    /// well-known `general` pseudo-component (§4.2).
    pub fn new_prestarted(name: String, type_tag: String, results: HashMap<String, CapabilityValue>) -> Arc<Self> {
        let declared: Vec<String> = results.keys().cloned().collect();
        Arc::new(ComponentRuntime {
            name,
            type_tag,
            params: Params::new(),
            clobber: true,
            declared: RwLock::new(declared),
            component: Mutex::new(None),
            state: Mutex::new(RendezvousState {
                status: Status::Success,
            }),
            cv: Condvar::new(),
            results: Mutex::new(
                results
                    .into_iter()
                    .map(|(k, v)| (k, Arc::new(v)))
                    .collect(),
            ),
            registry: RwLock::new(None),
        })
    }

    /// Recorded once, during bootstrap, so `publish` can tell "not declared by
    /// me" apart from "nobody registered this at all".
    pub(crate) fn attach_registry(&self, registry: Arc<Registry>) {
        *self.registry.write().unwrap() = Some(registry);
    }

    pub fn declared_capabilities(&self) -> Vec<String> {
        self.declared.read().unwrap().clone()
    }

    /// Run phase 2 of capability declaration: fold parameters and collect any
    /// derived capability names into this runtime's declared set. Must be
    /// called, synchronously, before `start`.
    pub fn finalize(&self) -> Result<Vec<String>> {
        let mut guard = self.component.lock().unwrap();
        let component = guard.as_mut().expect("finalize called after start");
        let derived = component.finalize(&self.params)?;
        self.declared.write().unwrap().extend(derived.iter().cloned());
        Ok(derived)
    }

    pub fn status(&self) -> Status {
        self.state.lock().unwrap().status
    }

    /// Store a result. Fails if nobody registered `capability` at all, or if
    /// it was registered to someone else (or never declared by this
    /// component).
    pub(crate) fn publish(self: &Arc<Self>, capability: &str, value: CapabilityValue) -> Result<()> {
        let registry_guard = self.registry.read().unwrap();
        let registry = registry_guard
            .as_ref()
            .expect("publish called before the component was registered");

        match registry.lookup(capability) {
            None => {
                return Err(errors::new(ErrorKind::CapabilityNotFound(
                    capability.to_string(),
                )))
            }
            Some(crate::registry::Owner::Local(owner)) if Arc::ptr_eq(&owner, self) => {}
            _ => {
                return Err(errors::new(ErrorKind::CapabilityOwnership(format!(
                    "component '{}' does not own capability '{}'",
                    self.name, capability
                ))))
            }
        }

        self.results
            .lock()
            .unwrap()
            .insert(capability.to_string(), Arc::new(value));
        Ok(())
    }

    /// Block until this component's status leaves PENDING, then return the
    /// published value for `capability` (or a `ProducerFailed` error).
    pub(crate) fn fetch_own(self: &Arc<Self>, capability: &str) -> Result<Arc<CapabilityValue>> {
        let mut guard = self.state.lock().unwrap();
        while guard.status == Status::Pending {
            debug!("waiting on {}", self.name);
            guard = self.cv.wait(guard).unwrap();
        }
        match guard.status {
            Status::Success => self
                .results
                .lock()
                .unwrap()
                .get(capability)
                .cloned()
                .ok_or_else(|| {
                    errors::new(ErrorKind::CapabilityNotFound(capability.to_string()))
                }),
            Status::Failure => Err(errors::new(ErrorKind::ProducerFailed(capability.to_string()))),
            Status::Pending => unreachable!(),
        }
    }

    /// Launch the component body on its own thread. Must be called at most
    /// once per runtime (§4.2, "idempotent only in the sense that calling it
    /// twice is a programming error").
    pub fn start(self: &Arc<Self>, router: Arc<crate::fetch::FetchRouter>) -> JoinHandle<()> {
        let owner = self.clone();
        thread::Builder::new()
            .name(format!("component-{}", self.name))
            .spawn(move || owner.body_wrapper(router))
            .expect("failed to spawn component thread")
    }

    /// The critical-path wrapper described in §4.2: runs the body, transitions
    /// status exactly once, and broadcasts the rendezvous exactly once on the
    /// way out - whether the body returned normally or panicked.
    fn body_wrapper(self: Arc<Self>, router: Arc<crate::fetch::FetchRouter>) {
        let declared = self.declared_capabilities();

        let mut guard = self.component.lock().unwrap();
        let mut component = guard.take().expect("start called twice on the same component");
        drop(guard);

        let ctx = RunContext {
            owner: self.clone(),
            router,
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| component.run(&ctx)));

        let final_status = match &outcome {
            Ok(Ok(())) => {
                let results = self.results.lock().unwrap();
                let missing: Vec<_> = declared
                    .iter()
                    .filter(|c| !results.contains_key(c.as_str()))
                    .collect();
                if missing.is_empty() {
                    info!("{}: finished successfully", self.name);
                    Status::Success
                } else {
                    error!(
                        "{}: completed without publishing {:?}",
                        self.name, missing
                    );
                    Status::Failure
                }
            }
            Ok(Err(e)) => {
                error!("{}: run_component returned error: {}", self.name, e);
                Status::Failure
            }
            Err(_) => {
                error!("{}: run_component panicked", self.name);
                Status::Failure
            }
        };

        {
            let mut state = self.state.lock().unwrap();
            state.status = final_status;
            self.cv.notify_all();
        }

        if let Err(payload) = outcome {
            panic::resume_unwind(payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoOp;
    impl Component for NoOp {
        fn run(&mut self, _ctx: &RunContext) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn clobber_defaults_to_true() {
        let runtime = ComponentRuntime::new("X".into(), "NoOp".into(), Params::new(), Box::new(NoOp));
        assert!(runtime.clobber);
    }

    #[test]
    fn clobber_honors_false_coercions() {
        for word in ["false", "no", "N", "0"] {
            let mut params = Params::new();
            params.insert("clobber".into(), ParamValue::Scalar(word.into()));
            let runtime = ComponentRuntime::new("X".into(), "NoOp".into(), params, Box::new(NoOp));
            assert!(!runtime.clobber, "{:?} should coerce to false", word);
        }
    }

    #[test]
    fn clobber_anything_else_is_true() {
        let mut params = Params::new();
        params.insert("clobber".into(), ParamValue::Scalar("yes".into()));
        let runtime = ComponentRuntime::new("X".into(), "NoOp".into(), params, Box::new(NoOp));
        assert!(runtime.clobber);
    }
}
