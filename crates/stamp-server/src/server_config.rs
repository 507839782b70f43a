//! Runtime server configuration.

use std::path::PathBuf;

use serde::Deserialize;

/// Runtime server configuration, deserialised from `config.toml` and
/// `STAMP_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  pub store_path: PathBuf,
  /// 16 ASCII bytes of AES-128 key material.
  pub token_key:  String,
  /// 16 ASCII bytes of CBC initialisation vector.
  pub token_iv:   String,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }
