//! Newtype identifiers for registry artifacts and scan parameters.
//!
//! Each string that flows from a registry notification or a scan request into
//! an external command is wrapped in a distinct newtype. This keeps a
//! [`RepositoryPath`] from being passed where a [`TagLabel`] is expected even
//! though both are plain strings underneath.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Reference components
// ---------------------------------------------------------------------------

string_id! {
    /// Registry host of an artifact reference (e.g. `"us-east1-docker.pkg.dev"`).
    RegistryHost
}

string_id! {
    /// Repository path below the registry host (e.g. `"my-project/my-repo/hello-world"`).
    RepositoryPath
}

string_id! {
    /// Tag label of a `host/path:<label>` reference (e.g. `"v1.2"`, `"sha256-59d78.sig"`).
    TagLabel
}

impl TagLabel {
    /// Returns `true` if the label ends with `suffix`.
    pub fn has_suffix(&self, suffix: &str) -> bool {
        self.0.ends_with(suffix)
    }
}

/// Hex portion of a `sha256` content digest, normalised to lowercase.
///
/// Construction validates that the value is non-empty and contains only
/// ASCII hex digits. Length is not enforced; registries in the wild emit
/// abbreviated digests in notifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct DigestHex(String);

impl DigestHex {
    /// Creates a [`DigestHex`], returning `None` if `value` is empty or contains
    /// a non-hex character. Upper-case input is accepted and lowercased.
    pub fn new(value: impl AsRef<str>) -> Option<Self> {
        let v = value.as_ref();
        if v.is_empty() || !v.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(v.to_ascii_lowercase()))
    }

    /// Returns the lowercase hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DigestHex {
    type Error = &'static str;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value).ok_or("digest hex must be non-empty hexadecimal")
    }
}

impl std::fmt::Display for DigestHex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Scan parameters
// ---------------------------------------------------------------------------

string_id! {
    /// Maximum vulnerability severity tolerated by a scan (e.g. `"critical"`).
    ///
    /// Passed through to the scan command unchanged.
    SeverityThreshold
}

impl SeverityThreshold {
    /// Severity applied when the caller does not supply one.
    pub const DEFAULT: &'static str = "critical";
}

impl Default for SeverityThreshold {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

string_id! {
    /// Image layer scope examined by a scan (e.g. `"squashed"`, `"all-layers"`).
    ScanScope
}

impl ScanScope {
    /// Scope applied when the caller does not supply one.
    pub const DEFAULT: &'static str = "squashed";
}

impl Default for ScanScope {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_hex_is_lowercased() {
        let hex = DigestHex::new("6EC128e26CD5").expect("valid hex");
        assert_eq!(hex.as_str(), "6ec128e26cd5");
    }

    #[test]
    fn digest_hex_rejects_empty_and_non_hex() {
        assert!(DigestHex::new("").is_none());
        assert!(DigestHex::new("6ec1zz").is_none());
        assert!(DigestHex::new("6ec1 28").is_none());
    }

    #[test]
    fn digest_hex_deserialises_through_new() {
        let hex: DigestHex = serde_json::from_str(r#""ABCD""#).unwrap();
        assert_eq!(hex.as_str(), "abcd");
        assert!(serde_json::from_str::<DigestHex>(r#""NOT-HEX""#).is_err());
        assert!(serde_json::from_str::<DigestHex>(r#""""#).is_err());
    }

    #[test]
    fn string_ids_reject_empty_values() {
        assert!(TagLabel::new("").is_none());
        assert!(SeverityThreshold::new("").is_none());
        assert_eq!(ScanScope::new("all-layers").unwrap().as_str(), "all-layers");
    }

    #[test]
    fn scan_parameter_defaults() {
        assert_eq!(SeverityThreshold::default().as_str(), "critical");
        assert_eq!(ScanScope::default().as_str(), "squashed");
    }
}
