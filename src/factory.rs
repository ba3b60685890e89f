//! Component factory (§9, "Dynamic construction from strings"): a closed
//! mapping from type tag to constructor, registered ahead of time rather
//! than evaluating the config section name as a constructor call.

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

use crate::component::Component;
use crate::errors::{self, ErrorKind};
use crate::Result;
use std::collections::HashMap;
use std::sync::RwLock;

pub type Constructor = fn() -> Box<dyn Component>;

lazy_static! {
    static ref CONSTRUCTORS: RwLock<HashMap<String, Constructor>> = {
        let mut m: HashMap<String, Constructor> = HashMap::new();
        m.insert("DummyComponent".to_string(), || {
            Box::new(crate::adapters::DummyComponent::default())
        });
        m.insert("AdderComponent".to_string(), || {
            Box::new(crate::adapters::AdderComponent::default())
        });
        m.insert("NumberComponent".to_string(), || {
            Box::new(crate::adapters::NumberComponent::default())
        });
        RwLock::new(m)
    };
}

/// Register a constructor for a new component type. Embedding applications
/// use this to plug in real model adapters without touching the core.
pub fn register_component_type(type_tag: &str, ctor: Constructor) {
    CONSTRUCTORS.write().unwrap().insert(type_tag.to_string(), ctor);
}

/// Construct a component by type tag. Everything from the first `.` in
/// `section_name` onward is ignored, so `GcamComponent.west` and
/// `GcamComponent.east` can coexist as two instances of `GcamComponent`
/// (§6).
pub fn create_component(section_name: &str) -> Result<Box<dyn Component>> {
    let type_tag = section_name.split('.').next().unwrap_or(section_name).trim();
    let constructors = CONSTRUCTORS.read().unwrap();
    match constructors.get(type_tag) {
        Some(ctor) => Ok(ctor()),
        None => Err(errors::new(ErrorKind::ConfigError(format!(
            "unknown component type '{}'",
            type_tag
        )))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disambiguation_suffix_is_stripped() {
        assert!(create_component("DummyComponent.east").is_ok());
    }

    #[test]
    fn unknown_type_is_a_config_error() {
        let err = create_component("NoSuchComponent").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ConfigError(_)));
    }
}
