//! CLI configuration types
//!
//! Loaded from `tandem.toml`; every section and field is optional.
//!
//! ```toml
//! [chain]
//! chain_id = 1337
//! max_fee_per_gas = "2000000000"
//!
//! [keys]
//! ecdsa_key = "~/.tandem/keys/ecdsa.key"
//! pq_key_dir = "~/.tandem/keys"
//!
//! [signer]
//! mode = "command"
//! command = "/usr/local/bin/pq-signer"
//! algorithm = "dilithium3"
//! ```

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Complete CLI configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Transaction defaults
    #[serde(default)]
    pub chain: ChainConfig,

    /// Key locations
    #[serde(default)]
    pub keys: KeyConfig,

    /// Post-quantum signer backend
    #[serde(default)]
    pub signer: SignerConfig,
}

impl CliConfig {
    /// Reads `path` if it exists, otherwise returns defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }
}

/// Defaults for fields not given on the command line
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// Decimal or 0x-hex, in wei
    #[serde(default = "default_max_priority_fee")]
    pub max_priority_fee_per_gas: String,

    /// Decimal or 0x-hex, in wei
    #[serde(default = "default_max_fee")]
    pub max_fee_per_gas: String,

    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
}

fn default_chain_id() -> u64 {
    1337
}

fn default_max_priority_fee() -> String {
    "0".to_string()
}

fn default_max_fee() -> String {
    "2000000000".to_string()
}

fn default_gas_limit() -> u64 {
    100_000
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            max_priority_fee_per_gas: default_max_priority_fee(),
            max_fee_per_gas: default_max_fee(),
            gas_limit: default_gas_limit(),
        }
    }
}

/// Key file locations; `~` is expanded
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyConfig {
    #[serde(default = "default_ecdsa_key")]
    pub ecdsa_key: String,

    /// Holds `<alg>-private.key` and `<alg>-public.key`
    #[serde(default = "default_pq_key_dir")]
    pub pq_key_dir: String,
}

fn default_ecdsa_key() -> String {
    "~/.tandem/keys/ecdsa.key".to_string()
}

fn default_pq_key_dir() -> String {
    "~/.tandem/keys".to_string()
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            ecdsa_key: default_ecdsa_key(),
            pq_key_dir: default_pq_key_dir(),
        }
    }
}

/// Where post-quantum signing and verification happen
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignerMode {
    /// Linked Dilithium implementation
    #[default]
    InProcess,

    /// External tool speaking the signer protocol
    Command,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignerConfig {
    #[serde(default)]
    pub mode: SignerMode,

    /// Program for `mode = "command"`
    #[serde(default)]
    pub command: Option<String>,

    /// Arguments placed before each protocol command
    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default = "default_algorithm")]
    pub algorithm: String,
}

fn default_algorithm() -> String {
    "dilithium3".to_string()
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            mode: SignerMode::default(),
            command: None,
            args: Vec::new(),
            algorithm: default_algorithm(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: CliConfig = toml::from_str("").unwrap();
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.chain.chain_id, 1337);
        assert_eq!(config.chain.gas_limit, 100_000);
        assert_eq!(config.signer.mode, SignerMode::InProcess);
        assert_eq!(config.signer.algorithm, "dilithium3");
    }

    #[test]
    fn test_partial_sections() {
        let config: CliConfig = toml::from_str(
            r#"
            [chain]
            chain_id = 1

            [signer]
            mode = "command"
            command = "/opt/pq/signer"
            args = ["-jar", "signer.jar"]
            "#,
        )
        .unwrap();

        assert_eq!(config.chain.chain_id, 1);
        assert_eq!(config.chain.max_fee_per_gas, "2000000000");
        assert_eq!(config.signer.mode, SignerMode::Command);
        assert_eq!(config.signer.command.as_deref(), Some("/opt/pq/signer"));
        assert_eq!(config.signer.args, vec!["-jar", "signer.jar"]);
        assert_eq!(config.keys, KeyConfig::default());
    }

    #[test]
    fn test_load_missing_file() {
        let config = CliConfig::load(Path::new("/nonexistent/tandem.toml")).unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tandem.toml");
        std::fs::write(&path, "[chain\nchain_id = ").unwrap();
        assert!(CliConfig::load(&path).is_err());
    }
}
