//! Illustrative component adapters. These exist to exercise the contract in
//! §4.2 and in the crate's own tests; real model bindings (GCAM, hydrology,
//! water disaggregation, ...) are out of scope (§1) and are expected to be
//! registered by embedding applications via `factory::register_component_type`.

use crate::component::{coerce_bool, CapabilityValue, Component, Params, RunContext};
use crate::errors::{self, ErrorKind};
use crate::Result;
use std::collections::HashMap;
use std::thread::sleep;
use std::time::Duration;

fn millis(params: &Params, key: &str) -> u64 {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

/// A component whose only job is to wait on zero or more capabilities and then
/// publish one of its own, sleeping for configurable delays on the way. Used
/// throughout the crate's test suite to reproduce the diamond, timing, and
/// chain-blocking scenarios (§8) without needing a real model adapter.
///
/// Recognized parameters:
///   - `produces`          (required) capability name this instance publishes.
///   - `depends_on`         comma-separated capability names to fetch first.
///   - `request_delay_ms`   comma-separated delays (ms), one per `depends_on`
///                          entry, applied before firing that fetch. Defaults
///                          to 0 for any entry not given.
///   - `finish_delay_ms`    delay (ms) before publishing. Default 0.
///   - `fail`               if "true", the body returns a `ComponentFailure`
///                          instead of publishing.
#[derive(Default)]
pub struct DummyComponent {
    produces: String,
    depends_on: Vec<String>,
    request_delays: Vec<u64>,
    finish_delay: u64,
    fail: bool,
}

impl Component for DummyComponent {
    fn finalize(&mut self, params: &Params) -> Result<Vec<String>> {
        self.produces = params
            .get("produces")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                errors::new(ErrorKind::ConfigError(
                    "DummyComponent requires a 'produces' parameter".into(),
                ))
            })?
            .to_string();

        self.depends_on = params
            .get("depends_on")
            .map(|v| v.as_list())
            .unwrap_or_default();

        let delay_list: Vec<u64> = params
            .get("request_delay_ms")
            .map(|v| v.as_list())
            .unwrap_or_default()
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();
        self.request_delays = (0..self.depends_on.len())
            .map(|i| delay_list.get(i).copied().unwrap_or(0))
            .collect();

        self.finish_delay = millis(params, "finish_delay_ms");
        self.fail = params
            .get("fail")
            .and_then(|v| v.as_str())
            .map(coerce_bool)
            .unwrap_or(false);

        Ok(vec![self.produces.clone()])
    }

    fn run(&mut self, ctx: &RunContext) -> Result<()> {
        for (dep, delay) in self.depends_on.iter().zip(self.request_delays.iter()) {
            if *delay > 0 {
                sleep(Duration::from_millis(*delay));
            }
            ctx.fetch(dep)?;
        }

        if self.finish_delay > 0 {
            sleep(Duration::from_millis(self.finish_delay));
        }

        if self.fail {
            return Err(errors::new(ErrorKind::ComponentFailure(format!(
                "{} configured to fail",
                ctx.component_name()
            ))));
        }

        ctx.publish(&self.produces, CapabilityValue::Text(format!("{}-ok", self.produces)))
    }
}

/// Sums two fetched numeric capabilities and publishes the result. A minimal
/// stand-in for the sort of small numeric model a real deployment would wrap.
///
/// Recognized parameters:
///   - `produces` (required) capability name this instance publishes.
///   - `addends`  comma-separated capability names whose numeric results are
///                summed. Each must resolve to `CapabilityValue::Number`.
#[derive(Default)]
pub struct AdderComponent {
    produces: String,
    addends: Vec<String>,
}

impl Component for AdderComponent {
    fn finalize(&mut self, params: &Params) -> Result<Vec<String>> {
        self.produces = params
            .get("produces")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                errors::new(ErrorKind::ConfigError(
                    "AdderComponent requires a 'produces' parameter".into(),
                ))
            })?
            .to_string();
        self.addends = params
            .get("addends")
            .map(|v| v.as_list())
            .unwrap_or_default();
        Ok(vec![self.produces.clone()])
    }

    fn run(&mut self, ctx: &RunContext) -> Result<()> {
        let mut total = 0.0;
        for addend in &self.addends {
            let value = ctx.fetch(addend)?;
            match value.as_ref() {
                CapabilityValue::Number(n) => total += n,
                other => {
                    return Err(errors::new(ErrorKind::ComponentFailure(format!(
                        "AdderComponent expected a Number from '{}', got {:?}",
                        addend, other
                    ))))
                }
            }
        }
        ctx.publish(&self.produces, CapabilityValue::Number(total))
    }
}

/// Publishes a fixed numeric literal with no dependencies. The leaf end of a
/// numeric pipeline built out of `AdderComponent`s in tests, where some
/// capability has to originate a `CapabilityValue::Number` from nothing.
///
/// Recognized parameters:
///   - `produces` (required) capability name this instance publishes.
///   - `value`    (required) the number to publish, parsed as `f64`.
#[derive(Default)]
pub struct NumberComponent {
    produces: String,
    value: f64,
}

impl Component for NumberComponent {
    fn finalize(&mut self, params: &Params) -> Result<Vec<String>> {
        self.produces = params
            .get("produces")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                errors::new(ErrorKind::ConfigError(
                    "NumberComponent requires a 'produces' parameter".into(),
                ))
            })?
            .to_string();
        self.value = params
            .get("value")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| {
                errors::new(ErrorKind::ConfigError(
                    "NumberComponent requires a numeric 'value' parameter".into(),
                ))
            })?;
        Ok(vec![self.produces.clone()])
    }

    fn run(&mut self, ctx: &RunContext) -> Result<()> {
        ctx.publish(&self.produces, CapabilityValue::Number(self.value))
    }
}

/// Flattens a parsed `[Global]` section into the CapabilityValue shape used
/// for the `general` pseudo-capability (§4.2). Not a `Component` - it never
/// runs on its own thread; `orchestrator::general_runtime` wraps the result in
/// a prestarted, already-SUCCESSFUL `ComponentRuntime` directly.
pub fn global_params_table(params: &Params) -> CapabilityValue {
    let mut table = HashMap::new();
    for (k, v) in params {
        table.insert(
            k.clone(),
            match v {
                crate::component::ParamValue::Scalar(s) => CapabilityValue::Text(s.clone()),
                crate::component::ParamValue::List(l) => CapabilityValue::List(l.clone()),
            },
        );
    }
    CapabilityValue::Table(table)
}
