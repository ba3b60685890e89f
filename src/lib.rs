//! # modelcoupler
//!
//! A component-based framework for coupling independently developed
//! scientific models into a single pipelined computation. Each model is
//! wrapped as a [`component::Component`]; components publish named
//! *capabilities* (data products) and consume capabilities produced by other
//! components. Data-dependency ordering is enforced purely by the act of
//! requesting a capability: a consumer that asks for a not-yet-ready result
//! blocks until the producing component finishes.
//!
//! A run can be single-process (every component on one set of threads) or
//! multi-process (components spread across peers, coordinated over NATS via
//! the `mp` feature), but the dependency-resolution contract seen by a
//! component's own code is identical either way.
//!
//! ```no_run
//! use modelcoupler::config;
//! use modelcoupler::orchestrator;
//!
//! fn main() -> modelcoupler::Result<()> {
//!     env_logger::init();
//!     let config = config::load(std::path::Path::new("run.ini"))?;
//!     let report = orchestrator::run_single_process(&config)?;
//!     if !report.success() {
//!         std::process::exit(1);
//!     }
//!     Ok(())
//! }
//! ```

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

#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate log;

pub type Result<T> = std::result::Result<T, errors::Error>;

pub mod adapters;
pub mod component;
#[cfg(feature = "config")]
pub mod config;
pub mod errors;
pub mod factory;
pub mod fetch;
#[cfg(feature = "config")]
pub mod orchestrator;
#[cfg(feature = "mp")]
pub mod rab;
pub mod registry;
#[cfg(feature = "mp")]
pub mod transport;

pub use component::{CapabilityValue, Component, ParamValue, Params, RunContext};
pub use factory::register_component_type;
#[cfg(feature = "config")]
pub use orchestrator::RunReport;
pub use registry::Registry;
