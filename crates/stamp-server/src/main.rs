//! stamp server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite identity store, and serves the JSON API over HTTP.
//!
//! # Bootstrapping an administrator
//!
//! Deletion requires an administrator, and registration never creates one:
//!
//! ```
//! cargo run -p stamp-server -- --add-admin root --contact root@example.com
//! ```
//!
//! The secret is read from stdin.

mod server_config;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use stamp_core::{
  IdentityService,
  identity::{NewIdentity, Role},
  token::TokenCodec,
};
use stamp_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::server_config::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "Stamp identity server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Create an administrator with this handle (secret read from stdin) and
  /// exit.
  #[arg(long, value_name = "HANDLE", requires = "contact")]
  add_admin: Option<String>,

  /// Contact for `--add-admin`.
  #[arg(long)]
  contact: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("STAMP"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Bad key material is fatal before anything is served.
  let codec = TokenCodec::new(server_cfg.token_key.as_bytes(), server_cfg.token_iv.as_bytes())
    .context("invalid token key material")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let service = IdentityService::new(store, codec);

  // Helper mode: provision an administrator and exit.
  if let Some(handle) = cli.add_admin {
    let contact = cli.contact.unwrap_or_default();
    let secret = read_secret_from_stdin()?;
    anyhow::ensure!(!secret.is_empty(), "secret must not be empty");
    let admin = service
      .provision(NewIdentity { handle, contact, secret, role: Role::Administrator })
      .await
      .context("failed to create administrator")?;
    println!("{}", admin.subject_id);
    return Ok(());
  }

  let app = stamp_api::api_router(Arc::new(service)).layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a secret from stdin.
fn read_secret_from_stdin() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Secret: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn expand_tilde_leaves_plain_paths() {
    assert_eq!(expand_tilde(Path::new("/var/lib/stamp.db")), PathBuf::from("/var/lib/stamp.db"));
    assert_eq!(expand_tilde(Path::new("stamp.db")), PathBuf::from("stamp.db"));
  }
}
