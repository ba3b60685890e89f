//! Configuration file parsing (§6): INI-style sections, one component
//! definition each, via the `ini` crate.

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

use crate::component::{ParamValue, Params};
use crate::errors::{self, ErrorKind};
use crate::Result;
use ini::Ini;
use std::path::Path;

/// One `[Section]` block, already split into the pieces the orchestrator
/// needs: its disambiguated type tag, its raw parameters, and its
/// round-robin assignment weight (§4.5).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "mp", derive(serde::Serialize, serde::Deserialize))]
pub struct SectionSpec {
    pub name: String,
    pub type_tag: String,
    pub params: Params,
    pub weight: f64,
}

/// A fully parsed configuration file: the required `Global` section plus
/// every other component section, in file order.
#[derive(Debug, Clone)]
pub struct Config {
    pub global: Params,
    pub sections: Vec<SectionSpec>,
}

const GLOBAL_SECTION: &str = "Global";
const WEIGHT_KEY: &str = "mp.weight";
const DEFAULT_WEIGHT: f64 = 1.0;

/// List-valued parameters are written as comma-separated strings in the INI
/// file; everything else is a scalar.
const LIST_KEYS: &[&str] = &["depends_on", "request_delay_ms", "capability_reqs", "request_delays"];

fn parse_params(properties: &ini::Properties) -> Params {
    let mut params = Params::new();
    for (key, value) in properties.iter() {
        let parsed = if LIST_KEYS.contains(&key) {
            ParamValue::List(value.split(',').map(|s| s.trim().to_string()).collect())
        } else {
            ParamValue::Scalar(value.to_string())
        };
        params.insert(key.to_string(), parsed);
    }
    params
}

fn section_weight(params: &Params) -> f64 {
    params
        .get(WEIGHT_KEY)
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_WEIGHT)
}

/// Parse `path` into a `Config`. Fails with `ConfigError` if there is no
/// `[Global]` section (§6: "Every valid configuration has exactly one
/// `Global` section").
pub fn load(path: &Path) -> Result<Config> {
    let ini = Ini::load_from_file(path)?;

    let global_props = ini.section(Some(GLOBAL_SECTION)).ok_or_else(|| {
        errors::new(ErrorKind::ConfigError(
            "configuration file must have a '[Global]' section".to_string(),
        ))
    })?;
    let global = parse_params(global_props);

    let mut sections = Vec::new();
    for (name, properties) in ini.iter() {
        let name = match name {
            Some(n) if n != GLOBAL_SECTION => n,
            _ => continue,
        };
        let params = parse_params(properties);
        let weight = section_weight(&params);
        let type_tag = name.split('.').next().unwrap_or(name).trim().to_string();
        sections.push(SectionSpec {
            name: name.to_string(),
            type_tag,
            params,
            weight,
        });
    }

    Ok(Config { global, sections })
}
