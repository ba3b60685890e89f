//! Bootstraps a run, single-process or multi-process, starts every
//! component, waits for completion, and reports aggregated status (§4.5).

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

use crate::adapters::global_params_table;
use crate::component::ComponentRuntime;
use crate::config::Config;
use crate::factory;
use crate::fetch::FetchRouter;
use crate::registry::{Owner, Registry};
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;

#[cfg(feature = "mp")]
use crate::rab::Rab;
#[cfg(feature = "mp")]
use crate::transport::{PeerId, Transport, SUPERVISOR_PEER};

/// Outcome of a completed run: how many local components failed, and whether
/// the RAB (in multi-process mode) is still considered healthy.
pub struct RunReport {
    pub failed: Vec<String>,
    pub total: usize,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.failed.is_empty()
    }
}

fn general_runtime(global_params: &crate::component::Params) -> Arc<ComponentRuntime> {
    let mut results = HashMap::new();
    results.insert("general".to_string(), global_params_table(global_params));
    ComponentRuntime::new_prestarted("Global".to_string(), "Global".to_string(), results)
}

fn build_and_register(
    spec: &crate::config::SectionSpec,
    registry: &Arc<Registry>,
) -> Result<Arc<ComponentRuntime>> {
    let component = factory::create_component(&spec.type_tag)?;
    let runtime = ComponentRuntime::new(
        spec.name.clone(),
        spec.type_tag.clone(),
        spec.params.clone(),
        component,
    );
    for cap in runtime.declared_capabilities() {
        registry.register(&cap, Owner::Local(runtime.clone()))?;
    }
    let derived = runtime.finalize()?;
    for cap in derived {
        registry.register(&cap, Owner::Local(runtime.clone()))?;
    }
    runtime.attach_registry(registry.clone());
    Ok(runtime)
}

/// Run every component in `config` within this single process (§4.5 single-
/// process bootstrap) and block until they have all finished.
pub fn run_single_process(config: &Config) -> Result<RunReport> {
    let registry = Registry::new();
    let router = FetchRouter::new(registry.clone());

    let general = general_runtime(&config.global);
    registry.register("general", Owner::Local(general))?;

    let mut runtimes = Vec::with_capacity(config.sections.len());
    for spec in &config.sections {
        runtimes.push(build_and_register(spec, &registry)?);
    }

    let mut handles = Vec::with_capacity(runtimes.len());
    for runtime in &runtimes {
        info!("starting {} ({})", runtime.name, runtime.type_tag);
        handles.push(runtime.start(router.clone()));
    }

    for handle in handles {
        let _ = handle.join();
    }

    let failed: Vec<String> = runtimes
        .iter()
        .filter(|r| r.status() != crate::component::Status::Success)
        .map(|r| r.name.clone())
        .collect();

    Ok(RunReport {
        total: runtimes.len(),
        failed,
    })
}

#[cfg(feature = "mp")]
pub struct MpOptions {
    pub nats_url: String,
    pub run_id: String,
    pub peer_id: PeerId,
    pub n_peers: u32,
}

/// Weighted round-robin assignment of sections to peers (§4.5 step 3):
/// descending order of `mp.weight` (default 1.0), ties broken deterministically
/// by section name, then round-robin starting just after the supervisor.
/// Every peer also receives the `Global` section's parameters (carried
/// alongside the assignment itself, not as a section).
#[cfg(feature = "mp")]
fn assign_sections(config: &Config, n_peers: u32) -> Vec<Vec<crate::config::SectionSpec>> {
    let mut sections = config.sections.clone();
    sections.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut assignments: Vec<Vec<crate::config::SectionSpec>> =
        (0..n_peers).map(|_| Vec::new()).collect();
    let mut next_rank = (SUPERVISOR_PEER.0 + 1) % n_peers;
    for section in sections {
        assignments[next_rank as usize].push(section);
        next_rank = (next_rank + 1) % n_peers;
    }
    assignments
}

/// Multi-process bootstrap and run (§4.5 steps 1-9). The caller is
/// responsible for determining `opts.peer_id`/`opts.n_peers` (e.g. from an
/// MPI-like launcher or a pre-agreed peer list) and, on the supervisor, for
/// having parsed `config` already.
#[cfg(feature = "mp")]
pub fn run_multi_process(config: Option<&Config>, opts: MpOptions) -> Result<RunReport> {
    let transport = Transport::connect(&opts.nats_url, &opts.run_id, opts.peer_id, opts.n_peers)?;

    let (my_sections, global_params) = if opts.peer_id == SUPERVISOR_PEER {
        let config = config.expect("supervisor must supply a parsed Config");
        let assignments = assign_sections(config, opts.n_peers);
        for (rank, sections) in assignments.iter().enumerate() {
            if rank as u32 == SUPERVISOR_PEER.0 {
                continue;
            }
            transport.send_assignment(PeerId(rank as u32), sections, &config.global)?;
        }
        (assignments[SUPERVISOR_PEER.0 as usize].clone(), config.global.clone())
    } else {
        transport.recv_assignment()?
    };

    let registry = Registry::new();
    let router = FetchRouter::new(registry.clone());

    let general = general_runtime(&global_params);
    registry.register("general", Owner::Local(general))?;

    let mut runtimes = Vec::with_capacity(my_sections.len());
    for spec in &my_sections {
        runtimes.push(build_and_register(spec, &registry)?);
    }

    let rab = Rab::new(transport.clone(), registry.clone());
    rab.bootstrap()?;
    router.attach_rab(rab.clone());

    let rab_handle = rab.run()?;

    let mut handles = Vec::with_capacity(runtimes.len());
    for runtime in &runtimes {
        info!("starting {} ({})", runtime.name, runtime.type_tag);
        handles.push(runtime.start(router.clone()));
    }
    for handle in handles {
        let _ = handle.join();
    }

    let failed: Vec<String> = runtimes
        .iter()
        .filter(|r| r.status() != crate::component::Status::Success)
        .map(|r| r.name.clone())
        .collect();

    if let Err(e) = transport.barrier() {
        transport.abort(&format!("barrier failed: {}", e));
    }

    rab.shutdown();
    if rab_handle.join().is_err() {
        transport.abort("RAB listener thread panicked");
    }

    if !failed.is_empty() {
        transport.abort(&format!("{} local component(s) failed", failed.len()));
    }

    Ok(RunReport {
        total: runtimes.len(),
        failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ParamValue;
    use crate::config::SectionSpec;
    use crate::errors::ErrorKind;

    fn dummy_section(name: &str, produces: &str, depends_on: &[&str]) -> SectionSpec {
        let mut params = crate::component::Params::new();
        params.insert("produces".into(), ParamValue::Scalar(produces.into()));
        if !depends_on.is_empty() {
            params.insert(
                "depends_on".into(),
                ParamValue::List(depends_on.iter().map(|s| s.to_string()).collect()),
            );
        }
        SectionSpec {
            name: name.to_string(),
            type_tag: "DummyComponent".to_string(),
            params,
            weight: 1.0,
        }
    }

    #[test]
    fn diamond_dependency_completes_successfully() {
        let config = Config {
            global: crate::component::Params::new(),
            sections: vec![
                dummy_section("Top", "top", &[]),
                dummy_section("Left", "left", &["top"]),
                dummy_section("Right", "right", &["top"]),
                dummy_section("Bottom", "bottom", &["left", "right"]),
            ],
        };
        let report = run_single_process(&config).unwrap();
        assert!(report.success());
        assert_eq!(report.total, 4);
    }

    #[test]
    fn a_failed_producer_fails_its_consumer() {
        let mut failing = dummy_section("Top", "top", &[]);
        failing
            .params
            .insert("fail".into(), ParamValue::Scalar("true".into()));
        let config = Config {
            global: crate::component::Params::new(),
            sections: vec![failing, dummy_section("Bottom", "bottom", &["top"])],
        };
        let report = run_single_process(&config).unwrap();
        assert!(!report.success());
        assert_eq!(report.failed.len(), 2);
    }

    #[test]
    fn duplicate_capability_is_a_config_error() {
        let config = Config {
            global: crate::component::Params::new(),
            sections: vec![
                dummy_section("A", "same", &[]),
                dummy_section("B", "same", &[]),
            ],
        };
        let err = run_single_process(&config).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ConfigError(_)));
    }

    #[cfg(feature = "mp")]
    #[test]
    fn assign_sections_breaks_equal_weight_ties_by_name() {
        let config = Config {
            global: crate::component::Params::new(),
            sections: vec![
                dummy_section("Charlie", "c", &[]),
                dummy_section("Alice", "a", &[]),
                dummy_section("Bob", "b", &[]),
            ],
        };
        let assignments = assign_sections(&config, 3);
        // Equal default weight (1.0) everywhere, so the tie-break alone
        // determines order: Alice, Bob, Charlie, round-robined starting at
        // the peer just after the supervisor (peer 1).
        assert_eq!(assignments[1][0].name, "Alice");
        assert_eq!(assignments[2][0].name, "Bob");
        assert_eq!(assignments[0][0].name, "Charlie");
    }
}
