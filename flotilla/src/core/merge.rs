//! Deep merge of configuration layers.
//!
//! Configuration is resolved by folding an ordered list of partial layers
//! (hard-coded defaults, named presets, project overrides) left to right.
//! Tables merge recursively, arrays extend, all other values overwrite.
//! Hyphenated and underscored key spellings are treated as the same key.

use toml::{Table, Value};

/// Normalize a key so `custom_runners` and `custom-runners` collide.
pub fn normalize_key(key: &str) -> String {
    key.replace('_', "-")
}

/// Merge `layer` into `base`.
///
/// Only keys the layer defines are touched; everything else falls through to
/// the lower layers already folded into `base`. When a layer re-spells an
/// existing key with the other separator, the base spelling is kept.
pub fn deep_merge(base: &mut Table, layer: &Table) {
    for (key, incoming) in layer {
        let existing_key = base
            .keys()
            .find(|k| normalize_key(k) == normalize_key(key))
            .cloned();

        match existing_key {
            Some(existing) => match (base.get_mut(&existing), incoming) {
                (Some(Value::Table(current)), Value::Table(addition)) => {
                    deep_merge(current, addition);
                }
                (Some(Value::Array(current)), Value::Array(addition)) => {
                    current.extend(addition.iter().cloned());
                }
                _ => {
                    base.insert(existing, incoming.clone());
                }
            },
            None => {
                base.insert(key.clone(), incoming.clone());
            }
        }
    }
}

/// Fold an ordered list of layers into one table, lowest precedence first.
pub fn fold_layers<'a>(layers: impl IntoIterator<Item = &'a Table>) -> Table {
    let mut folded = Table::new();
    for layer in layers {
        deep_merge(&mut folded, layer);
    }
    folded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(text: &str) -> Table {
        toml::from_str(text).expect("valid toml")
    }

    #[test]
    fn scalar_values_overwrite() {
        let mut base = table("enabled = false");
        deep_merge(&mut base, &table("enabled = true"));
        assert_eq!(base["enabled"], Value::Boolean(true));
    }

    #[test]
    fn tables_merge_without_losing_sibling_keys() {
        // a preset that sets only option A and an override that sets only
        // option B must yield both, neither lost
        let mut base = table("[ci.custom-runners.lint]\ncheck-args = [\"--check\"]");
        deep_merge(
            &mut base,
            &table("[ci.custom-runners.lint]\nworking-directory = \"repository\""),
        );
        let lint = base["ci"]["custom-runners"]["lint"].as_table().expect("table");
        assert!(lint.contains_key("check-args"));
        assert!(lint.contains_key("working-directory"));
    }

    #[test]
    fn arrays_extend() {
        let mut base = table("presets = [\"a\"]");
        deep_merge(&mut base, &table("presets = [\"b\"]"));
        assert_eq!(
            base["presets"],
            Value::Array(vec![Value::String("a".into()), Value::String("b".into())])
        );
    }

    #[test]
    fn hyphen_and_underscore_spellings_collide() {
        let mut base = table("[custom-runners.lint]\ncheck-args = [\"x\"]");
        deep_merge(&mut base, &table("[custom_runners.lint]\nforce-fix = true"));
        // one table under the original spelling, carrying both keys
        assert_eq!(base.len(), 1);
        let lint = base["custom-runners"]["lint"].as_table().expect("table");
        assert!(lint.contains_key("check-args"));
        assert!(lint.contains_key("force-fix"));
    }

    #[test]
    fn fold_applies_layers_in_order() {
        let folded = fold_layers([
            &table("level = 1\nkeep = \"low\""),
            &table("level = 2"),
            &table("level = 3"),
        ]);
        assert_eq!(folded["level"], Value::Integer(3));
        assert_eq!(folded["keep"], Value::String("low".into()));
    }
}
