//! Layering of YAML configuration documents.
//!
//! `config.local.yml` is laid over `config.yml` before parsing:
//! - mappings merge key by key, recursively
//! - sequences (such as a flow's `steps`) are replaced whole
//! - a `null` in the overlay removes the key
//! - anything else in the overlay wins

use serde_yaml::Value;

/// Lay `overlay` over `base` in place.
pub fn merge_into(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                if value.is_null() {
                    base_map.remove(&key);
                    continue;
                }
                match base_map.get_mut(&key) {
                    Some(existing) => merge_into(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Lay `overlay` over a copy of `base`.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    let mut merged = base.clone();
    merge_into(&mut merged, overlay.clone());
    merged
}

/// Merge documents in order; later documents take precedence.
pub fn merge_configs(configs: &[Value]) -> Value {
    let mut merged = Value::Mapping(Default::default());
    for config in configs {
        merge_into(&mut merged, config.clone());
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn settings_merge_key_by_key() {
        let base = yaml("settings:\n  dispatch_timeout: 30\n  max_attempts: 3\n");
        let overlay = yaml("settings:\n  dispatch_timeout: 5\n");
        let merged = deep_merge(&base, &overlay);
        assert_eq!(merged["settings"]["dispatch_timeout"], 5);
        assert_eq!(merged["settings"]["max_attempts"], 3);
    }

    #[test]
    fn step_lists_are_replaced() {
        let base = yaml(
            r#"
flows:
  intake:
    steps:
      - id: a
      - id: b
"#,
        );
        let overlay = yaml(
            r#"
flows:
  intake:
    steps:
      - id: only
"#,
        );
        let merged = deep_merge(&base, &overlay);
        let steps = merged["flows"]["intake"]["steps"].as_sequence().unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0]["id"], "only");
    }

    #[test]
    fn null_removes_a_flow() {
        let base = yaml("flows:\n  intake: {}\n  survey: {}\n");
        let overlay = yaml("flows:\n  intake: null\n");
        let merged = deep_merge(&base, &overlay);
        assert!(merged["flows"].get("intake").is_none());
        assert!(merged["flows"].get("survey").is_some());
    }

    #[test]
    fn backend_can_be_swapped_wholesale() {
        let base = yaml("settings:\n  backend:\n    type: demo\n");
        let overlay = yaml("settings:\n  backend: disabled\n");
        let merged = deep_merge(&base, &overlay);
        assert_eq!(merged["settings"]["backend"], "disabled");
    }

    #[test]
    fn later_documents_win() {
        let merged = merge_configs(&[yaml("a: 1\nb: 2"), yaml("b: 3\nc: 4"), yaml("c: 5")]);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 3);
        assert_eq!(merged["c"], 5);
    }

    #[test]
    fn no_documents_merge_to_empty_mapping() {
        assert!(merge_configs(&[]).as_mapping().unwrap().is_empty());
    }
}
