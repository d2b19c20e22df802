//! Case-insensitive access to host property documents
//!
//! Host builds disagree on field casing (`Id`, `ID`, `id`). Lookups try the
//! exact name first and only then scan the object ignoring case; documents
//! are never rewritten, so schema drift stays visible.

use serde_json::Value;
use crate::{Error, Result};

/// Look up `name` in a JSON object, falling back to a case-insensitive scan.
pub fn find_property<'a>(doc: &'a Value, name: &str) -> Option<&'a Value> {
    let object = doc.as_object()?;
    if let Some(value) = object.get(name) {
        return Some(value);
    }
    object
        .iter()
        .find(|(key, _)| eq_ignore_case(key, name))
        .map(|(_, value)| value)
}

/// Compare two strings ignoring case, including non-ASCII letters.
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}

/// Like [`find_property`], but a missing field is an error.
pub fn get_property<'a>(doc: &'a Value, name: &str) -> Result<&'a Value> {
    find_property(doc, name)
        .ok_or_else(|| Error::NotFound(format!("property '{}' not found in document", name)))
}

/// Look up a string-valued property.
pub fn get_str<'a>(doc: &'a Value, name: &str) -> Result<&'a str> {
    get_property(doc, name)?
        .as_str()
        .ok_or_else(|| Error::NotFound(format!("property '{}' is not a string", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_name_lookup_any_casing() {
        for key in ["Name", "NAME", "name"] {
            let doc = json!({ key: "Ethernet", "Type": "Transparent" });
            assert_eq!(get_str(&doc, "Name").unwrap(), "Ethernet");
        }
    }

    #[test]
    fn test_ignore_case_covers_non_ascii() {
        assert!(eq_ignore_case("Сеть", "СЕТЬ"));
        assert!(eq_ignore_case("Örnek Ağ", "örnek ağ"));
        assert!(!eq_ignore_case("Сеть", "Сеть 2"));

        let doc = json!({ "ÄNDERUNG": 1 });
        assert_eq!(find_property(&doc, "änderung"), Some(&json!(1)));
    }

    #[test]
    fn test_exact_match_wins() {
        let doc = json!({ "id": "lower", "Id": "exact" });
        assert_eq!(get_str(&doc, "Id").unwrap(), "exact");
    }

    #[test]
    fn test_missing_property() {
        let doc = json!({ "Name": "Ethernet" });
        assert!(find_property(&doc, "VirtualMachine").is_none());
        assert!(get_property(&doc, "VirtualMachine").unwrap_err().is_not_found());
    }

    #[test]
    fn test_non_object_document() {
        assert!(find_property(&json!(["Name"]), "Name").is_none());
        assert!(find_property(&Value::Null, "Name").is_none());
    }

    #[test]
    fn test_non_string_value() {
        let doc = json!({ "Name": 42 });
        assert!(get_str(&doc, "Name").is_err());
        assert_eq!(get_property(&doc, "name").unwrap(), &json!(42));
    }
}
