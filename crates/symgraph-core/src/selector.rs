//! Selectors: which language/platform view an attribute belongs to.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An (interface language, optional platform) pair.
///
/// A unified symbol keeps one value per selector for every attribute, so the
/// Swift-on-macOS view and the Objective-C-on-iOS view of the same precise
/// identifier can coexist. Equality, ordering and hashing are structural over
/// both fields; an absent platform only equals another absent platform with
/// the same language.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    /// Interface language of the view (e.g. `swift`, `occ`).
    pub interface_language: String,
    /// Platform name of the graph the view came from, if it declared one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl Selector {
    /// Create a selector.
    pub fn new(interface_language: impl Into<String>, platform: Option<String>) -> Self {
        Selector {
            interface_language: interface_language.into(),
            platform,
        }
    }

    /// Create a selector with a platform name.
    pub fn with_platform(interface_language: impl Into<String>, platform: impl Into<String>) -> Self {
        Selector::new(interface_language, Some(platform.into()))
    }

    /// True if this selector belongs to `language`.
    pub fn is_language(&self, language: &str) -> bool {
        self.interface_language == language
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.platform {
            Some(platform) => write!(f, "{} ({})", self.interface_language, platform),
            None => f.write_str(&self.interface_language),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_covers_both_fields() {
        let a = Selector::with_platform("swift", "macOS");
        let b = Selector::with_platform("swift", "iOS");
        let c = Selector::new("swift", None);
        let d = Selector::new("occ", None);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(c, d);
        assert_eq!(c, Selector::new("swift", None));

        let set: HashSet<_> = [a.clone(), b, c, d, a].into_iter().collect();
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn serializes_without_absent_platform() {
        let json = serde_json::to_string(&Selector::new("swift", None)).unwrap();
        assert_eq!(json, r#"{"interfaceLanguage":"swift"}"#);
        let json = serde_json::to_string(&Selector::with_platform("swift", "macOS")).unwrap();
        assert_eq!(json, r#"{"interfaceLanguage":"swift","platform":"macOS"}"#);
    }

    #[test]
    fn display() {
        assert_eq!(Selector::with_platform("swift", "iOS").to_string(), "swift (iOS)");
        assert_eq!(Selector::new("occ", None).to_string(), "occ");
    }
}
