//! Argument assembly for the external validation commands.
//!
//! Each command is a fixed prefix (program plus leading arguments, supplied
//! by configuration) followed by request-derived arguments in a fixed order:
//!
//! | Command | Arguments after the prefix |
//! |---------|----------------------------|
//! | scan | `digest`, `severity`, `scope`, `workspace` |
//! | signature | `digest` |
//! | attestation | `digest` |

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ImageDigest, ScanScope, SeverityThreshold, Verification};

/// Program and leading arguments of an external command. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>")]
pub struct CommandPrefix(Vec<String>);

impl CommandPrefix {
    /// Creates a prefix, returning `None` if `parts` is empty or its first
    /// element (the program) is empty.
    pub fn new(parts: Vec<String>) -> Option<Self> {
        match parts.first() {
            Some(program) if !program.is_empty() => Some(Self(parts)),
            _ => None,
        }
    }

    /// Splits a command line on whitespace. No shell quoting is interpreted.
    pub fn parse(command_line: &str) -> Option<Self> {
        Self::new(command_line.split_whitespace().map(str::to_string).collect())
    }

    pub fn program(&self) -> &str {
        &self.0[0]
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    fn with_args<I>(&self, args: I) -> Vec<String>
    where
        I: IntoIterator<Item = String>,
    {
        self.0.iter().cloned().chain(args).collect()
    }
}

impl TryFrom<Vec<String>> for CommandPrefix {
    type Error = &'static str;

    fn try_from(parts: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(parts).ok_or("command must name a program")
    }
}

impl std::fmt::Display for CommandPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(" "))
    }
}

/// The configured external commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSet {
    pub scan: CommandPrefix,
    pub signature: CommandPrefix,
    pub attestation: CommandPrefix,
}

impl CommandSet {
    /// `[...scan, digest, severity, scope, workspace]`
    pub fn scan_args(
        &self,
        digest: &ImageDigest,
        severity: &SeverityThreshold,
        scope: &ScanScope,
        workspace: &Path,
    ) -> Vec<String> {
        self.scan.with_args([
            digest.as_str().to_string(),
            severity.as_str().to_string(),
            scope.as_str().to_string(),
            workspace.to_string_lossy().into_owned(),
        ])
    }

    /// `[...signature|attestation, digest]`
    pub fn verify_args(&self, verification: Verification, digest: &ImageDigest) -> Vec<String> {
        let prefix = match verification {
            Verification::Signature => &self.signature,
            Verification::Attestation => &self.attestation,
        };
        prefix.with_args([digest.as_str().to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commands() -> CommandSet {
        CommandSet {
            scan: CommandPrefix::parse("bin/scan --quiet").unwrap(),
            signature: CommandPrefix::parse("bin/verify sig").unwrap(),
            attestation: CommandPrefix::parse("bin/verify att").unwrap(),
        }
    }

    #[test]
    fn prefix_rejects_empty_command() {
        assert!(CommandPrefix::parse("").is_none());
        assert!(CommandPrefix::parse("   ").is_none());
        assert!(CommandPrefix::new(vec![String::new(), "x".to_string()]).is_none());
        assert_eq!(CommandPrefix::parse(" bin/scan  -v ").unwrap().as_slice(), ["bin/scan", "-v"]);
    }

    #[test]
    fn scan_arguments_follow_fixed_order() {
        let digest = ImageDigest::parse("host/repo@sha256:abc").unwrap();
        let args = commands().scan_args(
            &digest,
            &SeverityThreshold::default(),
            &ScanScope::new("all-layers").unwrap(),
            Path::new("/tmp/abc-1"),
        );
        assert_eq!(
            args,
            [
                "bin/scan",
                "--quiet",
                "host/repo@sha256:abc",
                "critical",
                "all-layers",
                "/tmp/abc-1"
            ]
        );
    }

    #[test]
    fn prefix_deserialisation_requires_a_program() {
        let prefix: CommandPrefix = serde_json::from_str(r#"["bin/scan","--quiet"]"#).unwrap();
        assert_eq!(prefix.program(), "bin/scan");
        assert!(serde_json::from_str::<CommandPrefix>("[]").is_err());
        assert!(serde_json::from_str::<CommandPrefix>(r#"[""]"#).is_err());
    }

    #[test]
    fn verify_arguments_select_prefix() {
        let digest = ImageDigest::parse("host/repo@sha256:abc").unwrap();
        let set = commands();
        assert_eq!(
            set.verify_args(Verification::Signature, &digest),
            ["bin/verify", "sig", "host/repo@sha256:abc"]
        );
        assert_eq!(
            set.verify_args(Verification::Attestation, &digest),
            ["bin/verify", "att", "host/repo@sha256:abc"]
        );
    }
}
