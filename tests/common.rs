use modelcoupler::component::{ParamValue, Params};
use modelcoupler::config::{Config, SectionSpec};

pub fn dummy(name: &str, produces: &str, depends_on: &[&str]) -> SectionSpec {
    let mut params = Params::new();
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

pub fn dummy_with_delay(
    name: &str,
    produces: &str,
    depends_on: &[&str],
    request_delays_ms: &[u64],
    finish_delay_ms: u64,
) -> SectionSpec {
    let mut section = dummy(name, produces, depends_on);
    if !request_delays_ms.is_empty() {
        section.params.insert(
            "request_delay_ms".into(),
            ParamValue::List(request_delays_ms.iter().map(|d| d.to_string()).collect()),
        );
    }
    if finish_delay_ms > 0 {
        section.params.insert(
            "finish_delay_ms".into(),
            ParamValue::Scalar(finish_delay_ms.to_string()),
        );
    }
    section
}

pub fn config_of(sections: Vec<SectionSpec>) -> Config {
    Config {
        global: Params::new(),
        sections,
    }
}

pub fn number_source(name: &str, produces: &str, value: f64) -> SectionSpec {
    let mut params = Params::new();
    params.insert("produces".into(), ParamValue::Scalar(produces.into()));
    params.insert("value".into(), ParamValue::Scalar(value.to_string()));
    SectionSpec {
        name: name.to_string(),
        type_tag: "NumberComponent".to_string(),
        params,
        weight: 1.0,
    }
}

pub fn adder(name: &str, produces: &str, addends: &[&str]) -> SectionSpec {
    let mut params = Params::new();
    params.insert("produces".into(), ParamValue::Scalar(produces.into()));
    params.insert(
        "addends".into(),
        ParamValue::List(addends.iter().map(|s| s.to_string()).collect()),
    );
    SectionSpec {
        name: name.to_string(),
        type_tag: "AdderComponent".to_string(),
        params,
        weight: 1.0,
    }
}
