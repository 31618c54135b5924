//! CareLink HTTP server assembly.
//!
//! Configuration, store opening and the top-level [`Router`] live here so the
//! binary stays a thin shell around them.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use carelink_store_sqlite::{SqlitePeerIndex, SqliteRegistry};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `CARELINK_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:            String,
  #[serde(default = "default_port")]
  pub port:            u16,
  /// Authoritative SQLite database (accounts, links, notes).
  #[serde(default = "default_registry_path")]
  pub registry_path:   PathBuf,
  /// Separate SQLite database holding the peer index documents.
  #[serde(default = "default_peer_index_path")]
  pub peer_index_path: PathBuf,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_registry_path() -> PathBuf { PathBuf::from("~/.local/share/carelink/registry.db") }

fn default_peer_index_path() -> PathBuf {
  PathBuf::from("~/.local/share/carelink/peer-index.db")
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Stores ───────────────────────────────────────────────────────────────────

/// Both backing stores, opened on independent connections.
#[derive(Clone)]
pub struct Stores {
  pub registry:   Arc<SqliteRegistry>,
  pub peer_index: Arc<SqlitePeerIndex>,
}

impl Stores {
  pub async fn open(
    registry_path: &Path,
    peer_index_path: &Path,
  ) -> carelink_store_sqlite::Result<Self> {
    Ok(Self {
      registry:   Arc::new(SqliteRegistry::open(registry_path).await?),
      peer_index: Arc::new(SqlitePeerIndex::open(peer_index_path).await?),
    })
  }

  pub async fn open_in_memory() -> carelink_store_sqlite::Result<Self> {
    Ok(Self {
      registry:   Arc::new(SqliteRegistry::open_in_memory().await?),
      peer_index: Arc::new(SqlitePeerIndex::open_in_memory().await?),
    })
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The complete application: the JSON API with request tracing.
pub fn app(stores: &Stores) -> Router {
  carelink_api::api_router(stores.registry.clone(), stores.peer_index.clone())
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use carelink_core::model::{AccountId, Identity, Role};
  use config::{Config, File, FileFormat};
  use tower::ServiceExt as _;

  use super::*;

  fn load(toml: &str) -> ServerConfig {
    Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn config_defaults_fill_missing_keys() {
    let cfg = load("port = 9000");
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.address(), "127.0.0.1:9000");
    assert_eq!(cfg.registry_path, PathBuf::from("~/.local/share/carelink/registry.db"));
  }

  #[test]
  fn config_reads_both_store_paths() {
    let cfg = load(
      r#"
        host            = "0.0.0.0"
        registry_path   = "/var/lib/carelink/registry.db"
        peer_index_path = "/var/lib/carelink/peers.db"
      "#,
    );
    assert_eq!(cfg.host, "0.0.0.0");
    assert_eq!(cfg.peer_index_path, PathBuf::from("/var/lib/carelink/peers.db"));
  }

  #[test]
  fn tilde_expansion() {
    let abs = Path::new("/tmp/registry.db");
    assert_eq!(expand_tilde(abs), abs);

    if let Ok(home) = std::env::var("HOME") {
      assert_eq!(
        expand_tilde(Path::new("~/carelink/registry.db")),
        PathBuf::from(home).join("carelink/registry.db")
      );
    }
  }

  #[tokio::test]
  async fn app_serves_api_routes() {
    let stores = Stores::open_in_memory().await.unwrap();
    let patient = AccountId::parse("patient1").unwrap();
    stores
      .registry
      .enroll(Identity { id: patient.clone(), email: "p1@clinic.example".into(), role: Role::Patient })
      .await
      .unwrap();
    stores.registry.add_note(&patient, "resting well").await.unwrap();

    let req = Request::builder()
      .uri("/patients/patient1/notes")
      .header("x-requester-id", "patient1")
      .header("x-requester-role", "patient")
      .body(Body::empty())
      .unwrap();
    let resp = app(&stores).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let notes: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(notes[0]["content"], "resting well");

    let req = Request::builder().uri("/nowhere").body(Body::empty()).unwrap();
    let resp = app(&stores).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}
