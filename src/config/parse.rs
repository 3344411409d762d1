//! Flat `dotted.key = value` override files.
//!
//! Parsing is lenient: lines without `=` or with an empty key are skipped,
//! and only whole-line comments are recognized so templates may contain `#`.
use super::{ConfigTree, ConfigValue};

/// Parse override text into a nested tree.
pub(crate) fn parse_overrides(text: &str) -> ConfigTree {
    let mut tree = ConfigTree::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            tracing::debug!(line, "skipping config line without '='");
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        insert_dotted(&mut tree, key, coerce_value(value.trim()));
    }
    tree
}

/// `true`/`false` become booleans, all-digit strings integers, the rest strings.
pub(crate) fn coerce_value(raw: &str) -> ConfigValue {
    if raw.eq_ignore_ascii_case("true") {
        return ConfigValue::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return ConfigValue::Bool(false);
    }
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(number) = raw.parse::<i64>() {
            return ConfigValue::Int(number);
        }
    }
    ConfigValue::Str(raw.to_string())
}

/// Insert `value` at a dotted path, creating sections on the way down.
///
/// A scalar sitting where a section is needed is replaced by an empty section.
pub(crate) fn insert_dotted(tree: &mut ConfigTree, key: &str, value: ConfigValue) {
    let mut parts: Vec<&str> = key.split('.').map(str::trim).collect();
    let Some(leaf) = parts.pop() else {
        return;
    };
    let mut current = tree;
    for part in parts {
        let slot = current
            .entry(part.to_string())
            .or_insert_with(|| ConfigValue::Section(ConfigTree::new()));
        if !matches!(slot, ConfigValue::Section(_)) {
            *slot = ConfigValue::Section(ConfigTree::new());
        }
        let ConfigValue::Section(section) = slot else {
            return;
        };
        current = section;
    }
    current.insert(leaf.to_string(), value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerces_booleans_integers_and_strings() {
        assert_eq!(coerce_value("true"), ConfigValue::Bool(true));
        assert_eq!(coerce_value("FALSE"), ConfigValue::Bool(false));
        assert_eq!(coerce_value("42"), ConfigValue::Int(42));
        assert_eq!(coerce_value("-5"), ConfigValue::Str("-5".to_string()));
        assert_eq!(coerce_value("4.5"), ConfigValue::Str("4.5".to_string()));
        assert_eq!(coerce_value(""), ConfigValue::Str(String::new()));
    }

    #[test]
    fn dotted_keys_nest_and_integers_stay_integers() {
        let tree = parse_overrides("a.b.c = 5\n");
        let a = match tree.get("a") {
            Some(ConfigValue::Section(a)) => a,
            other => panic!("expected section, got {other:?}"),
        };
        let b = match a.get("b") {
            Some(ConfigValue::Section(b)) => b,
            other => panic!("expected section, got {other:?}"),
        };
        assert_eq!(b.get("c"), Some(&ConfigValue::Int(5)));
    }

    #[test]
    fn skips_comments_blank_and_malformed_lines() {
        let text = "# heading\n\n   \nno equals here\n = orphan\npipeline.epub.output_name = {title} #1\n";
        let tree = parse_overrides(text);
        assert_eq!(tree.len(), 1);
        let mut expected = ConfigTree::new();
        insert_dotted(
            &mut expected,
            "pipeline.epub.output_name",
            ConfigValue::Str("{title} #1".to_string()),
        );
        assert_eq!(tree, expected);
    }

    #[test]
    fn value_may_contain_equals() {
        let tree = parse_overrides("x = a=b");
        assert_eq!(tree.get("x"), Some(&ConfigValue::Str("a=b".to_string())));
    }

    #[test]
    fn scalar_in_the_way_becomes_section() {
        let tree = parse_overrides("a = 1\na.b = 2\n");
        let mut expected = ConfigTree::new();
        insert_dotted(&mut expected, "a.b", ConfigValue::Int(2));
        assert_eq!(tree, expected);
    }

    #[test]
    fn descends_through_scalars_at_every_level() {
        let mut tree = ConfigTree::new();
        tree.insert("a".to_string(), ConfigValue::Bool(true));
        insert_dotted(&mut tree, "a.b.c", ConfigValue::Int(3));
        insert_dotted(&mut tree, "a.b.c.d", ConfigValue::Str("x".to_string()));

        let mut c = ConfigTree::new();
        c.insert("d".to_string(), ConfigValue::Str("x".to_string()));
        let mut b = ConfigTree::new();
        b.insert("c".to_string(), ConfigValue::Section(c));
        let mut a = ConfigTree::new();
        a.insert("b".to_string(), ConfigValue::Section(b));
        let mut expected = ConfigTree::new();
        expected.insert("a".to_string(), ConfigValue::Section(a));
        assert_eq!(tree, expected);
    }
}
