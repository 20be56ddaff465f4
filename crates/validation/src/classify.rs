//! Event classification.
//!
//! Maps one [`NotificationEvent`] to one [`ClassifiedAction`] in a single
//! step. Only `INSERT` is actionable. Signature and attestation objects are
//! pushed as tags that point at a signed digest, so the tag rules in
//! [`TAG_RULES`] are checked before the generic image scan; otherwise every
//! signature push would be scanned as an image.
//!
//! Malformed or incomplete events become [`ClassifiedAction::Ignore`] with an
//! [`IgnoreReason`], never an error.

use serde::{Deserialize, Serialize};

use crate::reference::{ATTESTATION_SUFFIX, SIGNATURE_SUFFIX};
use crate::{tag_label_of, EventAction, ImageDigest, NotificationEvent};

// ---------------------------------------------------------------------------
// Rule table
// ---------------------------------------------------------------------------

/// Kind of verification selected by a tag rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verification {
    Signature,
    Attestation,
}

/// Selects a verification when an event's tag label ends with `suffix`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagRule {
    pub suffix: &'static str,
    pub verification: Verification,
}

/// Tag rules in evaluation order. The first matching suffix wins.
pub const TAG_RULES: &[TagRule] = &[
    TagRule {
        suffix: SIGNATURE_SUFFIX,
        verification: Verification::Signature,
    },
    TagRule {
        suffix: ATTESTATION_SUFFIX,
        verification: Verification::Attestation,
    },
];

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Why an event was not acted on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// The action is not `INSERT`.
    NonInsertAction(EventAction),
    /// Neither digest nor tag is present.
    MissingReference,
    /// A tag is present but the digest needed downstream is not.
    MissingDigest,
    /// The digest does not parse as `host/path@sha256:<hex>`.
    InvalidDigest(String),
}

impl std::fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonInsertAction(action) => write!(f, "action {action} is not actionable"),
            Self::MissingReference => write!(f, "event has neither digest nor tag"),
            Self::MissingDigest => write!(f, "event has no digest"),
            Self::InvalidDigest(reason) => write!(f, "{reason}"),
        }
    }
}

/// Result of classifying a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifiedAction {
    Ignore(IgnoreReason),
    ScanImage(ImageDigest),
    VerifySignature(ImageDigest),
    VerifyAttestation(ImageDigest),
}

impl ClassifiedAction {
    /// Short name for log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ignore(_) => "ignore",
            Self::ScanImage(_) => "scan_image",
            Self::VerifySignature(_) => "verify_signature",
            Self::VerifyAttestation(_) => "verify_attestation",
        }
    }

    /// Digest carried downstream, if the action is not `Ignore`.
    pub fn digest(&self) -> Option<&ImageDigest> {
        match self {
            Self::Ignore(_) => None,
            Self::ScanImage(d) | Self::VerifySignature(d) | Self::VerifyAttestation(d) => Some(d),
        }
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Classifies `event` with the default [`TAG_RULES`].
pub fn classify(event: &NotificationEvent) -> ClassifiedAction {
    classify_with(event, TAG_RULES)
}

/// Classifies `event` against an explicit rule table.
pub fn classify_with(event: &NotificationEvent, rules: &[TagRule]) -> ClassifiedAction {
    if event.action != EventAction::Insert {
        return ClassifiedAction::Ignore(IgnoreReason::NonInsertAction(event.action));
    }

    // Only the label decides; a tag without a delimiter falls through to the digest.
    let verification = event.tag().and_then(tag_label_of).and_then(|label| {
        rules
            .iter()
            .find(|rule| label.has_suffix(rule.suffix))
            .map(|rule| rule.verification)
    });

    let digest = match (event.digest(), event.tag()) {
        (Some(digest), _) => match ImageDigest::parse(digest) {
            Ok(digest) => digest,
            Err(err) => return ClassifiedAction::Ignore(IgnoreReason::InvalidDigest(err.to_string())),
        },
        (None, Some(_)) => return ClassifiedAction::Ignore(IgnoreReason::MissingDigest),
        (None, None) => return ClassifiedAction::Ignore(IgnoreReason::MissingReference),
    };

    match verification {
        Some(Verification::Signature) => ClassifiedAction::VerifySignature(digest),
        Some(Verification::Attestation) => ClassifiedAction::VerifyAttestation(digest),
        None => ClassifiedAction::ScanImage(digest),
    }
}
