#![allow(dead_code)]

use std::{
    path::PathBuf,
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use axum::{Router, http::StatusCode, routing::get};
use diesel::QueryableByName;
use diesel::prelude::*;
use diesel::sql_types::{Integer, Text};
use leaderboard_sync::{
    db::{connection, migrate},
    models::{LeaderboardEntry, LeaderboardRollup, Tenant},
    store::{EntrySlice, SqliteStore, StoreGateway, StoreResult},
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

#[derive(QueryableByName)]
struct JournalMode {
    #[diesel(sql_type = Text)]
    journal_mode: String,
}
#[derive(QueryableByName)]
struct ForeignKeys {
    #[diesel(sql_type = Integer)]
    foreign_keys: i32,
}
#[derive(QueryableByName)]
struct BusyTimeout {
    #[diesel(sql_type = Integer, column_name = "timeout")]
    busy_timeout: i32,
}

pub struct TestDb {
    _dir: TempDir,    // keep alive for the life of the test
    pub path: String, // <tmpdir>/test.db
}

impl TestDb {
    pub fn store(&self) -> SqliteStore {
        SqliteStore::new(self.path.clone())
    }
}

pub fn setup_db() -> (TestDb, SqliteConnection) {
    let dir = TempDir::new().expect("tempdir");
    let mut p = PathBuf::from(dir.path());
    p.push("test.db");
    let path = p.to_string_lossy().to_string();

    migrate::run_sqlite(&path).expect("migrations");

    let conn = connection::connect_sqlite(&path).expect("connect");
    (TestDb { _dir: dir, path }, conn)
}

pub fn assert_sqlite_pragmas(conn: &mut SqliteConnection) {
    use diesel::sql_query;

    let jm: JournalMode = sql_query("PRAGMA journal_mode;").get_result(conn).unwrap();
    assert_eq!(jm.journal_mode.to_lowercase(), "wal");

    let fk: ForeignKeys = sql_query("PRAGMA foreign_keys;").get_result(conn).unwrap();
    assert_eq!(fk.foreign_keys, 1);

    let bt: BusyTimeout = sql_query("PRAGMA busy_timeout;").get_result(conn).unwrap();
    assert_eq!(bt.busy_timeout, 5000);
}

pub fn tenant(id: &str, feed_url: &str) -> Tenant {
    Tenant {
        id: id.to_string(),
        slug: id.to_lowercase(),
        name: format!("Tenant {id}"),
        casino: "stake".to_string(),
        api_config: json!({ "url": feed_url }),
        settings: json!({}),
    }
}

/// Wraps a store and counts read calls, to prove cache hits skip the store.
pub struct CountingStore<S> {
    pub inner: S,
    pub rollup_reads: AtomicUsize,
    pub entry_reads: AtomicUsize,
}

impl<S> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            rollup_reads: AtomicUsize::new(0),
            entry_reads: AtomicUsize::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.rollup_reads.load(Ordering::SeqCst) + self.entry_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: StoreGateway> StoreGateway for CountingStore<S> {
    async fn upsert_entries(&self, entries: &[LeaderboardEntry]) -> StoreResult<usize> {
        self.inner.upsert_entries(entries).await
    }
    async fn upsert_rollup(
        &self,
        tenant_id: &str,
        casino: &str,
        snapshot: &Value,
        config: Option<&Value>,
    ) -> StoreResult<()> {
        self.inner.upsert_rollup(tenant_id, casino, snapshot, config).await
    }
    async fn get_rollup(
        &self,
        tenant_id: &str,
        casino: &str,
    ) -> StoreResult<Option<LeaderboardRollup>> {
        self.rollup_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get_rollup(tenant_id, casino).await
    }
    async fn list_entries(
        &self,
        tenant_id: &str,
        casino: &str,
        offset: u64,
        limit: u64,
    ) -> StoreResult<EntrySlice> {
        self.entry_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.list_entries(tenant_id, casino, offset, limit).await
    }
    async fn list_tenants(&self) -> StoreResult<Vec<Tenant>> {
        self.inner.list_tenants().await
    }
    async fn get_tenant(&self, tenant_id: &str) -> StoreResult<Option<Tenant>> {
        self.inner.get_tenant(tenant_id).await
    }
    async fn upsert_tenant(&self, tenant: &Tenant) -> StoreResult<()> {
        self.inner.upsert_tenant(tenant).await
    }
}

pub const REFERENCE_CSV: &str = "user_id,wagered_amount,rank,timestamp\n\
                                 u1,1000,1,2023-01-01T00:00:00Z\n\
                                 u2,500,2,2023-01-01T00:00:00Z\n";

/// Builds a CSV feed of `n` players ranked 1..=n.
pub fn ranked_csv(n: usize) -> String {
    let mut csv = String::from("user_id,wagered_amount,rank,timestamp\n");
    for i in 1..=n {
        csv.push_str(&format!("p{i:03},{},{i},2024-05-01T00:00:00Z\n", 10_000 - i));
    }
    csv
}

/// Partner feed stub on an ephemeral port:
/// - `/reference.csv`: the two-row reference feed
/// - `/big.csv`: 45 ranked rows
/// - `/empty.csv`: header only
/// - `/down.csv`: HTTP 503
pub async fn spawn_feed_stub() -> String {
    let big = ranked_csv(45);
    let app = Router::new()
        .route("/reference.csv", get(|| async { REFERENCE_CSV }))
        .route("/big.csv", get(move || async move { big }))
        .route("/empty.csv", get(|| async { "user_id,wagered_amount,rank\n" }))
        .route(
            "/down.csv",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}
