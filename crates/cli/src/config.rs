//! Command-line and environment configuration.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use validation::{CommandPrefix, CommandSet};

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Newline-delimited JSON, for log aggregation.
    Json,
    /// Human-readable lines.
    Pretty,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "regwatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Container registry notification receiver: scans images and verifies signatures and attestations", long_about = None)]
pub struct Config {
    /// Address to bind
    #[arg(long, env = "REGWATCH_ADDRESS", default_value = "0.0.0.0")]
    pub address: IpAddr,

    /// Port to bind
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Directory under which per-request workspaces are created
    /// (default: system temporary directory)
    #[arg(long, env = "REGWATCH_WORKSPACE_ROOT")]
    pub workspace_root: Option<PathBuf>,

    /// Scan command; receives digest, severity, scope, and workspace
    #[arg(long, env = "REGWATCH_SCAN_COMMAND", default_value = "bin/scan")]
    pub scan_command: String,

    /// Signature verification command; receives digest
    #[arg(long, env = "REGWATCH_SIGNATURE_COMMAND", default_value = "bin/verify-signature")]
    pub signature_command: String,

    /// Attestation verification command; receives digest
    #[arg(long, env = "REGWATCH_ATTESTATION_COMMAND", default_value = "bin/verify-attestation")]
    pub attestation_command: String,

    /// Seconds a command may run before it is killed (0 disables the limit)
    #[arg(long, env = "REGWATCH_COMMAND_TIMEOUT_SECS", default_value_t = 300)]
    pub command_timeout_secs: u64,

    /// Log line format
    #[arg(long, env = "REGWATCH_LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,

    /// Default log level when RUST_LOG is not set
    #[arg(long, env = "REGWATCH_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// OTLP gRPC endpoint to export spans to (export is off when unset)
    #[arg(long, env = "REGWATCH_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

impl Config {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        (self.command_timeout_secs > 0).then(|| Duration::from_secs(self.command_timeout_secs))
    }

    /// Parses the three command lines into a [`CommandSet`].
    ///
    /// # Errors
    ///
    /// Fails if any command line is empty.
    pub fn command_set(&self) -> Result<CommandSet> {
        Ok(CommandSet {
            scan: prefix("scan-command", &self.scan_command)?,
            signature: prefix("signature-command", &self.signature_command)?,
            attestation: prefix("attestation-command", &self.attestation_command)?,
        })
    }
}

fn prefix(name: &str, command_line: &str) -> Result<CommandPrefix> {
    CommandPrefix::parse(command_line).ok_or_else(|| anyhow!("--{name} must not be empty"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let config = Config::try_parse_from(["regwatch"]).unwrap();
        assert_eq!(config.socket_addr().port(), 8080);
        assert_eq!(config.command_timeout(), Some(Duration::from_secs(300)));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.otlp_endpoint, None);

        let commands = config.command_set().unwrap();
        assert_eq!(commands.scan.as_slice(), ["bin/scan"]);
        assert_eq!(commands.signature.program(), "bin/verify-signature");
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "regwatch",
            "--port",
            "9090",
            "--scan-command",
            "/usr/bin/scanner --format json",
            "--command-timeout-secs",
            "0",
            "--log-format",
            "pretty",
            "--otlp-endpoint",
            "http://collector:4317",
        ])
        .unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.command_timeout(), None);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.otlp_endpoint.as_deref(), Some("http://collector:4317"));
        assert_eq!(
            config.command_set().unwrap().scan.as_slice(),
            ["/usr/bin/scanner", "--format", "json"]
        );
    }

    #[test]
    fn empty_command_is_rejected() {
        let config =
            Config::try_parse_from(["regwatch", "--attestation-command", "  "]).unwrap();
        let err = config.command_set().unwrap_err();
        assert_eq!(err.to_string(), "--attestation-command must not be empty");
    }
}
