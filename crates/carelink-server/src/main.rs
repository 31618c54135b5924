//! carelink-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `CARELINK_*` environment variables, opens the registry and peer index
//! databases, and serves the JSON API over HTTP.
//!
//! # Enrolling accounts
//!
//! ```
//! cargo run -p carelink-server -- enroll patient1 patient1@clinic.example patient
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use carelink_core::model::{AccountId, Identity, Role};
use carelink_server::{ServerConfig, Stores, expand_tilde};
use carelink_store_sqlite::SqliteRegistry;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "CareLink caregiver/patient link server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Register an account in the registry, or refresh its email.
  Enroll {
    id:    String,
    email: String,
    #[arg(value_parser = parse_role)]
    role:  Role,
  },
}

fn parse_role(s: &str) -> Result<Role, String> {
  Role::parse(s).ok_or_else(|| format!("unknown role {s:?}, expected `patient` or `caregiver`"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("CARELINK"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let registry_path = expand_tilde(&server_cfg.registry_path);
  let peer_index_path = expand_tilde(&server_cfg.peer_index_path);
  ensure_parent(&registry_path)?;
  ensure_parent(&peer_index_path)?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(&server_cfg, &registry_path, &peer_index_path).await,
    Command::Enroll { id, email, role } => enroll(&registry_path, id, email, role).await,
  }
}

async fn serve(cfg: &ServerConfig, registry_path: &Path, peer_index_path: &Path) -> anyhow::Result<()> {
  let stores = Stores::open(registry_path, peer_index_path)
    .await
    .with_context(|| format!("failed to open stores at {registry_path:?} / {peer_index_path:?}"))?;

  let app = carelink_server::app(&stores);
  let address = cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn enroll(registry_path: &Path, id: String, email: String, role: Role) -> anyhow::Result<()> {
  let registry = SqliteRegistry::open(registry_path)
    .await
    .with_context(|| format!("failed to open registry at {registry_path:?}"))?;

  let id = AccountId::parse(id).context("invalid account id")?;
  let identity = registry
    .enroll(Identity { id, email, role })
    .await
    .context("failed to enroll account")?;

  println!("{} ({}) enrolled as {}", identity.id, identity.email, identity.role);
  Ok(())
}

/// Create the directory a database file lives in, if it is missing.
fn ensure_parent(path: &Path) -> anyhow::Result<()> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  Ok(())
}
