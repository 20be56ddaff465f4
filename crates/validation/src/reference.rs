//! Artifact reference parsing.
//!
//! Accepts the two shapes a registry notification uses:
//!
//! - `host/path@sha256:<hex>` — a content digest
//! - `host/path:<label>` — a tag
//!
//! Parsing is pure: no I/O, no registry lookups.

use serde::{Deserialize, Serialize};

use crate::{DigestHex, ReferenceError, RegistryHost, RepositoryPath, TagLabel};

/// Delimiter between the repository name and a `sha256` digest.
pub const DIGEST_DELIMITER: &str = "@sha256:";

/// Delimiter between the repository name and a tag label.
pub const TAG_DELIMITER: char = ':';

/// Tag suffix the registry uses for signature objects.
pub const SIGNATURE_SUFFIX: &str = ".sig";

/// Tag suffix the registry uses for attestation objects.
pub const ATTESTATION_SUFFIX: &str = ".att";

/// How a reference pins its artifact. Exactly one form per reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locator {
    /// `@sha256:<hex>`
    Digest(DigestHex),
    /// `:<label>`
    Tag(TagLabel),
}

/// Parsed form of a digest or tag reference string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactReference {
    registry_host: RegistryHost,
    repository_path: RepositoryPath,
    locator: Locator,
}

impl ArtifactReference {
    /// Parses `reference`.
    ///
    /// # Errors
    ///
    /// [`ReferenceError::InvalidFormat`] when neither `@sha256:` nor a tag `:`
    /// is present, when the digest hex is empty or non-hex, when the tag label
    /// is empty, or when the name lacks a `host/path` split.
    pub fn parse(reference: &str) -> Result<Self, ReferenceError> {
        let invalid = |reason| ReferenceError::InvalidFormat {
            reference: reference.to_string(),
            reason,
        };

        let (name, locator) = if let Some((name, hex)) = reference.split_once(DIGEST_DELIMITER) {
            if hex.is_empty() {
                return Err(invalid("digest hex is empty"));
            }
            let hex = DigestHex::new(hex).ok_or_else(|| invalid("digest hex is not hexadecimal"))?;
            (name, Locator::Digest(hex))
        } else {
            let (name, label) =
                split_tag(reference).ok_or_else(|| invalid("no digest or tag delimiter"))?;
            let label = TagLabel::new(label).ok_or_else(|| invalid("tag label is empty"))?;
            (name, Locator::Tag(label))
        };

        let (host, path) = name
            .split_once('/')
            .ok_or_else(|| invalid("missing registry host"))?;
        let registry_host = RegistryHost::new(host).ok_or_else(|| invalid("registry host is empty"))?;
        let repository_path =
            RepositoryPath::new(path).ok_or_else(|| invalid("repository path is empty"))?;

        Ok(Self {
            registry_host,
            repository_path,
            locator,
        })
    }

    pub fn registry_host(&self) -> &RegistryHost {
        &self.registry_host
    }

    pub fn repository_path(&self) -> &RepositoryPath {
        &self.repository_path
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Digest hex, if this is a digest reference.
    pub fn digest_hex(&self) -> Option<&DigestHex> {
        match &self.locator {
            Locator::Digest(hex) => Some(hex),
            Locator::Tag(_) => None,
        }
    }

    /// Tag label, if this is a tag reference.
    pub fn tag_label(&self) -> Option<&TagLabel> {
        match &self.locator {
            Locator::Tag(label) => Some(label),
            Locator::Digest(_) => None,
        }
    }

    /// `true` if the tag label marks a signature object.
    pub fn is_signature_artifact(&self) -> bool {
        self.tag_label().is_some_and(|l| l.has_suffix(SIGNATURE_SUFFIX))
    }

    /// `true` if the tag label marks an attestation object.
    pub fn is_attestation_artifact(&self) -> bool {
        self.tag_label().is_some_and(|l| l.has_suffix(ATTESTATION_SUFFIX))
    }
}

/// Splits a tag reference into name and label at the tag delimiter.
///
/// The delimiter must follow the last path separator so that a registry port
/// (`host:5000/repo`) is not mistaken for a tag.
fn split_tag(reference: &str) -> Option<(&str, &str)> {
    let path_start = reference.rfind('/').map_or(0, |i| i + 1);
    let colon = path_start + reference[path_start..].rfind(TAG_DELIMITER)?;
    Some((&reference[..colon], &reference[colon + 1..]))
}

/// Tag label of `reference` without validating the name in front of it.
///
/// Accepts references [`ArtifactReference::parse`] rejects, such as
/// `tester:sha256-59d78.sig` with no registry host. Returns `None` for
/// digest references, when there is no tag delimiter, or when the label is
/// empty.
pub fn tag_label_of(reference: &str) -> Option<TagLabel> {
    if reference.contains(DIGEST_DELIMITER) {
        return None;
    }
    split_tag(reference).and_then(|(_, label)| TagLabel::new(label))
}

/// A digest reference as received, together with its parsed hex.
///
/// The raw string is what external commands receive; the hex keys the
/// workspace directory. Serialises as the raw reference string and is
/// re-validated on deserialisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageDigest {
    reference: String,
    hex: DigestHex,
}

impl ImageDigest {
    /// Parses `reference` and requires the digest form.
    ///
    /// # Errors
    ///
    /// [`ReferenceError::InvalidFormat`] if the reference is malformed or is a
    /// tag reference.
    pub fn parse(reference: &str) -> Result<Self, ReferenceError> {
        let parsed = ArtifactReference::parse(reference)?;
        match parsed.locator {
            Locator::Digest(hex) => Ok(Self {
                reference: reference.to_string(),
                hex,
            }),
            Locator::Tag(_) => Err(ReferenceError::InvalidFormat {
                reference: reference.to_string(),
                reason: "reference is a tag, not a digest",
            }),
        }
    }

    /// The reference string as received.
    pub fn as_str(&self) -> &str {
        &self.reference
    }

    pub fn hex(&self) -> &DigestHex {
        &self.hex
    }
}

impl TryFrom<String> for ImageDigest {
    type Error = ReferenceError;

    fn try_from(reference: String) -> Result<Self, Self::Error> {
        Self::parse(&reference)
    }
}

impl From<ImageDigest> for String {
    fn from(digest: ImageDigest) -> Self {
        digest.reference
    }
}

impl std::fmt::Display for ImageDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX_64: &str = "6ec128e26cd5b1f1a7a6d5a0a7b0c95e0a3fcd3a8a8f4f9b1c2d3e4f5a6b7c8d";

    fn reason(err: ReferenceError) -> &'static str {
        match err {
            ReferenceError::InvalidFormat { reason, .. } => reason,
        }
    }

    #[test]
    fn parses_digest_reference() {
        let reference = format!("us-east1-docker.pkg.dev/my-project/my-repo/hello-world@sha256:{HEX_64}");
        let parsed = ArtifactReference::parse(&reference).expect("valid digest reference");
        assert_eq!(parsed.registry_host().as_str(), "us-east1-docker.pkg.dev");
        assert_eq!(parsed.repository_path().as_str(), "my-project/my-repo/hello-world");
        assert_eq!(parsed.digest_hex().map(DigestHex::as_str), Some(HEX_64));
        assert!(parsed.tag_label().is_none());
    }

    #[test]
    fn digest_hex_is_case_normalised() {
        let reference = format!("host/repo@sha256:{}", HEX_64.to_ascii_uppercase());
        let parsed = ArtifactReference::parse(&reference).unwrap();
        assert_eq!(parsed.digest_hex().unwrap().as_str(), HEX_64);
    }

    #[test]
    fn parses_tag_reference_with_suffix_flags() {
        let sig = ArtifactReference::parse(
            "us-west1-docker.pkg.dev/cloudy-demos/artomator/tester:sha256-59d78.sig",
        )
        .unwrap();
        assert_eq!(sig.tag_label().unwrap().as_str(), "sha256-59d78.sig");
        assert!(sig.is_signature_artifact());
        assert!(!sig.is_attestation_artifact());
        assert!(sig.digest_hex().is_none());

        let att = ArtifactReference::parse("host/repo:sha256-59d78.att").unwrap();
        assert!(att.is_attestation_artifact());
        assert!(!att.is_signature_artifact());
    }

    #[test]
    fn registry_port_is_not_a_tag() {
        let parsed = ArtifactReference::parse("localhost:5000/team/app:1.1").unwrap();
        assert_eq!(parsed.registry_host().as_str(), "localhost:5000");
        assert_eq!(parsed.repository_path().as_str(), "team/app");
        assert_eq!(parsed.tag_label().unwrap().as_str(), "1.1");

        let err = ArtifactReference::parse("localhost:5000/team/app").unwrap_err();
        assert_eq!(reason(err), "no digest or tag delimiter");
    }

    #[test]
    fn rejects_references_without_delimiters() {
        for reference in ["", "host/repo", "just-a-name", "host/repo/image"] {
            let err = ArtifactReference::parse(reference).unwrap_err();
            assert!(matches!(err, ReferenceError::InvalidFormat { .. }), "{reference}");
        }
    }

    #[test]
    fn rejects_empty_or_non_hex_digest() {
        assert_eq!(
            reason(ArtifactReference::parse("host/repo@sha256:").unwrap_err()),
            "digest hex is empty"
        );
        assert_eq!(
            reason(ArtifactReference::parse("host/repo@sha256:xyz123").unwrap_err()),
            "digest hex is not hexadecimal"
        );
    }

    #[test]
    fn rejects_empty_components() {
        assert_eq!(
            reason(ArtifactReference::parse("host/repo:").unwrap_err()),
            "tag label is empty"
        );
        assert_eq!(
            reason(ArtifactReference::parse("repo@sha256:abc").unwrap_err()),
            "missing registry host"
        );
        assert_eq!(
            reason(ArtifactReference::parse("host/@sha256:abc").unwrap_err()),
            "repository path is empty"
        );
    }

    #[test]
    fn image_digest_keeps_raw_reference() {
        let raw = "host/repo@sha256:6EC128E26CD5";
        let digest = ImageDigest::parse(raw).unwrap();
        assert_eq!(digest.as_str(), raw);
        assert_eq!(digest.hex().as_str(), "6ec128e26cd5");
    }

    #[test]
    fn image_digest_rejects_tags() {
        let err = ImageDigest::parse("host/repo:latest").unwrap_err();
        assert_eq!(reason(err), "reference is a tag, not a digest");
    }

    #[test]
    fn tag_label_is_found_without_registry_host() {
        let label = |reference| tag_label_of(reference).map(|l| l.as_str().to_string());
        assert_eq!(label("tester:sha256-59d78.sig").as_deref(), Some("sha256-59d78.sig"));
        assert_eq!(label("localhost:5000/app:1.1").as_deref(), Some("1.1"));
        assert_eq!(label("localhost:5000/app"), None);
        assert_eq!(label("host/repo@sha256:abcd"), None);
        assert_eq!(label("tester:"), None);
        assert_eq!(label("not a reference"), None);
    }

    #[test]
    fn image_digest_deserialises_through_parse() {
        let digest: ImageDigest = serde_json::from_str(r#""host/repo@sha256:ABCD""#).unwrap();
        assert_eq!(digest.hex().as_str(), "abcd");
        assert_eq!(serde_json::to_string(&digest).unwrap(), r#""host/repo@sha256:ABCD""#);

        assert!(serde_json::from_str::<ImageDigest>(r#""host/repo:latest""#).is_err());
        assert!(serde_json::from_str::<ImageDigest>(r#""host/repo@sha256:NOT-HEX""#).is_err());
    }
}
