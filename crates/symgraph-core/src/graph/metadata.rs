//! Graph-level metadata: format version, module descriptor, platform.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{DecodeError, SemanticVersionError};

// ============================================================================
// Semantic Version
// ============================================================================

/// A `major.minor.patch[-prerelease][+build]` version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SemanticVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub prerelease: Option<String>,
    pub build_metadata: Option<String>,
}

impl SemanticVersion {
    /// Create a release version without prerelease or build metadata.
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        SemanticVersion {
            major,
            minor,
            patch,
            prerelease: None,
            build_metadata: None,
        }
    }
}

impl FromStr for SemanticVersion {
    type Err = SemanticVersionError;

    /// Missing minor/patch components default to zero (`"5"` is `5.0.0`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SemanticVersionError::Empty);
        }

        let (rest, build_metadata) = match s.split_once('+') {
            Some((rest, build)) => (rest, Some(build.to_string())),
            None => (s, None),
        };
        let (core, prerelease) = match rest.split_once('-') {
            Some((core, pre)) => (core, Some(pre.to_string())),
            None => (rest, None),
        };

        let parts: Vec<&str> = core.split('.').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(SemanticVersionError::WrongComponentCount { found: parts.len() });
        }

        let parse = |component: &'static str, index: usize| -> Result<u32, SemanticVersionError> {
            match parts.get(index) {
                None => Ok(0),
                Some(value) => value
                    .parse()
                    .map_err(|_| SemanticVersionError::InvalidComponent {
                        component,
                        value: value.to_string(),
                    }),
            }
        };

        Ok(SemanticVersion {
            major: parse("major", 0)?,
            minor: parse("minor", 1)?,
            patch: parse("patch", 2)?,
            prerelease,
            build_metadata,
        })
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.prerelease {
            write!(f, "-{}", pre)?;
        }
        if let Some(build) = &self.build_metadata {
            write!(f, "+{}", build)?;
        }
        Ok(())
    }
}

/// Wire shapes accepted for a version: `"1.2.3"` or `{"major": 1, ...}`.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum RawVersion {
    Text(String),
    Components {
        major: u32,
        #[serde(default)]
        minor: u32,
        #[serde(default)]
        patch: u32,
        #[serde(default)]
        prerelease: Option<String>,
        #[serde(default, rename = "buildMetadata")]
        build_metadata: Option<String>,
    },
}

impl RawVersion {
    pub(crate) fn into_version(self) -> Result<SemanticVersion, SemanticVersionError> {
        match self {
            RawVersion::Text(text) => text.parse(),
            RawVersion::Components {
                major,
                minor,
                patch,
                prerelease,
                build_metadata,
            } => Ok(SemanticVersion {
                major,
                minor,
                patch,
                prerelease,
                build_metadata,
            }),
        }
    }
}

impl Serialize for SemanticVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SemanticVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawVersion::deserialize(deserializer)?
            .into_version()
            .map_err(de::Error::custom)
    }
}

// ============================================================================
// Metadata
// ============================================================================

/// Format metadata written by the producing tool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Version of the symbol graph format.
    pub format_version: SemanticVersion,
    /// Name and version of the generator.
    pub generator: String,
}

impl Metadata {
    /// Create metadata for a format version and generator.
    pub fn new(format_version: SemanticVersion, generator: impl Into<String>) -> Self {
        Metadata {
            format_version,
            generator: generator.into(),
        }
    }

    /// Decode metadata, surfacing an unparseable format version as a typed error.
    pub(crate) fn decode(value: serde_json::Value) -> Result<Self, DecodeError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct RawMetadata {
            format_version: RawVersion,
            generator: String,
        }

        let raw: RawMetadata = serde_json::from_value(value)?;
        Ok(Metadata {
            format_version: raw.format_version.into_version()?,
            generator: raw.generator,
        })
    }
}

// ============================================================================
// Module / Platform
// ============================================================================

/// The module a graph describes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    /// Module name as stated by the producer.
    pub name: String,
    /// Modules that must also be imported for this graph to apply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bystanders: Option<Vec<String>>,
    /// Target platform.
    #[serde(default)]
    pub platform: Platform,
    /// Module version, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<SemanticVersion>,
    /// Synthetic module with no backing binary.
    #[serde(default, skip_serializing_if = "super::is_false")]
    pub is_virtual: bool,
}

impl Module {
    /// Create a module descriptor with a platform.
    pub fn new(name: impl Into<String>, platform: Platform) -> Self {
        Module {
            name: name.into(),
            bystanders: None,
            platform,
            version: None,
            is_virtual: false,
        }
    }
}

/// Target platform of a graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Platform {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_system: Option<OperatingSystem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

/// Operating system of a platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatingSystem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_version: Option<SemanticVersion>,
}

impl Platform {
    /// A platform with only an operating system name.
    pub fn with_os(name: impl Into<String>) -> Self {
        Platform {
            operating_system: Some(OperatingSystem {
                name: name.into(),
                minimum_version: None,
            }),
            ..Platform::default()
        }
    }

    /// Display name used in selectors.
    ///
    /// Well-known OS spellings are normalized (`macosx` → `macOS`); anything
    /// else is returned as written. `None` when no OS is declared.
    pub fn name(&self) -> Option<String> {
        let os = self.operating_system.as_ref()?;
        let name = match os.name.as_str() {
            "macosx" | "macos" => "macOS",
            "ios" if self.environment.as_deref() == Some("macabi") => "macCatalyst",
            "ios" => "iOS",
            "watchos" => "watchOS",
            "tvos" => "tvOS",
            "visionos" | "xros" => "visionOS",
            "linux" => "Linux",
            other => other,
        };
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod semantic_version {
        use super::*;

        #[test]
        fn parses_full_version() {
            let v: SemanticVersion = "1.2.3-beta.1+exp.sha".parse().unwrap();
            assert_eq!((v.major, v.minor, v.patch), (1, 2, 3));
            assert_eq!(v.prerelease.as_deref(), Some("beta.1"));
            assert_eq!(v.build_metadata.as_deref(), Some("exp.sha"));
            assert_eq!(v.to_string(), "1.2.3-beta.1+exp.sha");
        }

        #[test]
        fn missing_components_default_to_zero() {
            let v: SemanticVersion = "5".parse().unwrap();
            assert_eq!(v, SemanticVersion::new(5, 0, 0));
        }

        #[test]
        fn rejects_garbage() {
            assert_eq!("".parse::<SemanticVersion>(), Err(SemanticVersionError::Empty));
            assert!(matches!(
                "1.x.0".parse::<SemanticVersion>(),
                Err(SemanticVersionError::InvalidComponent { component: "minor", .. })
            ));
            assert!(matches!(
                "1.2.3.4".parse::<SemanticVersion>(),
                Err(SemanticVersionError::WrongComponentCount { found: 4 })
            ));
        }

        #[test]
        fn deserializes_string_and_object_forms() {
            let a: SemanticVersion = serde_json::from_str(r#""0.6.0""#).unwrap();
            let b: SemanticVersion =
                serde_json::from_str(r#"{"major":0,"minor":6,"patch":0}"#).unwrap();
            assert_eq!(a, b);
            assert_eq!(serde_json::to_string(&a).unwrap(), r#""0.6.0""#);
        }

        #[test]
        fn metadata_decode_reports_typed_version_error() {
            let value = serde_json::json!({"formatVersion": "zero", "generator": "g"});
            let err = Metadata::decode(value).unwrap_err();
            assert!(matches!(err, DecodeError::InvalidVersion(_)));
        }
    }

    mod platform {
        use super::*;

        #[test]
        fn normalizes_known_names() {
            assert_eq!(Platform::with_os("macosx").name().as_deref(), Some("macOS"));
            assert_eq!(Platform::with_os("ios").name().as_deref(), Some("iOS"));
            let mut catalyst = Platform::with_os("ios");
            catalyst.environment = Some("macabi".to_string());
            assert_eq!(catalyst.name().as_deref(), Some("macCatalyst"));
            assert_eq!(Platform::with_os("freebsd").name().as_deref(), Some("freebsd"));
            assert_eq!(Platform::default().name(), None);
        }

        #[test]
        fn module_defaults() {
            let module: Module = serde_json::from_str(r#"{"name":"M","platform":{}}"#).unwrap();
            assert!(!module.is_virtual);
            assert!(module.bystanders.is_none());
            let json = serde_json::to_string(&module).unwrap();
            assert!(!json.contains("isVirtual"));
        }
    }
}
