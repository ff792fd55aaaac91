//! Key case conversion between hyphenated text keys and camelCase fields

use serde_yaml::{Mapping, Value};

/// `route-configuration-id` → `routeConfigurationId`
pub fn camelize(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for c in key.chars() {
        if c == '-' {
            upper_next = !out.is_empty();
            continue;
        }
        if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// `routeConfigurationId` → `route-configuration-id`
pub fn kebabize(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            if !out.is_empty() {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Camelize every string map key, recursively.
pub fn camelize_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => {
            let mut out = Mapping::with_capacity(map.len());
            for (k, v) in map {
                let key = match k {
                    Value::String(s) => Value::String(camelize(&s)),
                    other => other,
                };
                out.insert(key, camelize_keys(v));
            }
            Value::Mapping(out)
        }
        Value::Sequence(items) => Value::Sequence(items.into_iter().map(camelize_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("route-configuration-id", "routeConfigurationId")]
    #[case("to-d", "toD")]
    #[case("set-body", "setBody")]
    #[case("uri", "uri")]
    #[case("alreadyCamel", "alreadyCamel")]
    fn given_hyphenated_key_when_camelize_then_camel_case(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(camelize(input), expected);
    }

    #[rstest]
    #[case("routeConfigurationId", "route-configuration-id")]
    #[case("toD", "to-d")]
    #[case("doTry", "do-try")]
    #[case("uri", "uri")]
    fn given_camel_key_when_kebabize_then_hyphenated(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(kebabize(input), expected);
        assert_eq!(camelize(&kebabize(input)), input);
    }

    #[test]
    fn given_nested_value_when_camelize_keys_then_all_levels_converted() {
        let value: Value =
            serde_yaml::from_str("- set-header:\n    name: x\n    log-name: [a-b]\n").expect("yaml");
        let converted = camelize_keys(value);
        let text = serde_yaml::to_string(&converted).expect("emit");
        assert!(text.contains("setHeader:"));
        assert!(text.contains("logName:"));
        assert!(text.contains("a-b"), "values are untouched: {text}");
    }
}
