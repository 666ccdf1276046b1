//! Terraform name generation.

use crate::value::{AttrMap, Attributes};
use std::collections::{HashMap, HashSet};

/// Attributes a name is derived from, in order of preference.
const NAME_ATTRIBUTES: &[&str] = &["display_name", "name", "certificate_name"];

/// Make `raw` a valid Terraform identifier.
///
/// Characters outside `[A-Za-z0-9_-]` become `_`; names that do not start
/// with a letter or underscore get the abbreviation as prefix.
#[must_use]
pub fn sanitize_name(raw: &str, abbreviation: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();

    match cleaned.chars().next() {
        None => abbreviation.to_string(),
        Some(c) if c.is_ascii_alphabetic() || c == '_' => cleaned,
        Some(_) => format!("{abbreviation}_{cleaned}"),
    }
}

/// Base name of a resource: its display name, name or certificate name.
#[must_use]
pub fn base_name(attributes: &AttrMap, abbreviation: &str) -> String {
    NAME_ATTRIBUTES
        .iter()
        .find_map(|key| attributes.get_str(key))
        .map_or_else(|| abbreviation.to_string(), |raw| sanitize_name(raw, abbreviation))
}

/// Hands out names unique per resource class, in request order.
#[derive(Debug, Default)]
pub struct NameAllocator {
    used: HashMap<String, HashSet<String>>,
}

impl NameAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `base` if unused for `class`, else `base_1`, `base_2`, ...
    pub fn allocate(&mut self, class: &str, base: &str) -> String {
        let used = self.used.entry(class.to_string()).or_default();
        let mut candidate = base.to_string();
        let mut n = 1;
        while used.contains(&candidate) {
            candidate = format!("{base}_{n}");
            n += 1;
        }
        used.insert(candidate.clone());
        candidate
    }

    /// Mark a name as taken without allocating.
    pub fn reserve(&mut self, class: &str, name: &str) {
        self.used
            .entry(class.to_string())
            .or_default()
            .insert(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::attrs_from_json;
    use test_case::test_case;

    #[test_case("vcn1", "vcn1"; "already valid")]
    #[test_case("my vcn (prod)", "my_vcn__prod_"; "spaces and parens")]
    #[test_case("10.0.0.0/16", "subnet_10_0_0_0_16"; "leading digit")]
    #[test_case("-edge", "subnet_-edge"; "leading dash")]
    #[test_case("", "subnet"; "empty")]
    #[test_case("AD-2", "AD-2"; "dash kept")]
    fn test_sanitize_name(raw: &str, expected: &str) {
        assert_eq!(sanitize_name(raw, "subnet"), expected);
    }

    #[test]
    fn test_base_name_preference() {
        let attrs = attrs_from_json(&serde_json::json!({"name": "n", "display_name": "d"}));
        assert_eq!(base_name(&attrs, "x"), "d");

        let attrs = attrs_from_json(&serde_json::json!({"certificate_name": "cert"}));
        assert_eq!(base_name(&attrs, "x"), "cert");

        assert_eq!(base_name(&AttrMap::new(), "backend"), "backend");
    }

    #[test]
    fn test_allocate_dedupes_per_class() {
        let mut names = NameAllocator::new();
        assert_eq!(names.allocate("oci_core_subnet", "web"), "web");
        assert_eq!(names.allocate("oci_core_subnet", "web"), "web_1");
        assert_eq!(names.allocate("oci_core_subnet", "web"), "web_2");
        assert_eq!(names.allocate("oci_core_instance", "web"), "web");

        names.reserve("oci_core_vcn", "vcn1");
        assert_eq!(names.allocate("oci_core_vcn", "vcn1"), "vcn1_1");
    }
}
