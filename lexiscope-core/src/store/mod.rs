//! Store adapter
//!
//! [`Store`] owns the connection lifecycle and turns plans into reads and
//! record batches into appends. Wire access goes through a [`Transport`], so
//! the adapter runs unchanged over HTTP or over a test double.
//!
//! Connection state only moves forward:
//!
//! ```text
//! Disconnected ──connect()──▶ Connecting ──handshake ok──▶ Ready
//! ```
//!
//! Once `Ready`, store-level failures surface as [`Error::Query`] and never
//! re-enter the retry loop.

mod client;
pub mod schema;

pub use client::{HttpTransport, SESSION_SETTINGS};

use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::plan::{Plan, Table};

/// One request to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreRequest {
    /// Statement text
    pub query: String,
    /// Bound parameters as `(name, text value)`
    pub params: Vec<(String, String)>,
    /// Row payload for inserts
    pub body: Option<String>,
    /// Run against the configured database rather than the server default
    pub use_database: bool,
}

impl StoreRequest {
    fn statement(query: impl Into<String>, use_database: bool) -> Self {
        Self {
            query: query.into(),
            params: Vec::new(),
            body: None,
            use_database,
        }
    }
}

/// Wire access to the store.
///
/// A request either succeeds with the raw response body or fails with
/// [`Error::Connection`] (never reached the store) or [`Error::Query`]
/// (rejected by the store).
pub trait Transport: Send + Sync {
    fn send(&self, request: &StoreRequest) -> impl Future<Output = Result<String>> + Send;
}

/// Connection lifecycle of a [`Store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Ready,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Disconnected,
            1 => ConnectionState::Connecting,
            _ => ConnectionState::Ready,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Ready => 2,
        }
    }
}

/// Column name and store type from a read response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ColumnMeta {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// Execution statistics reported by the store for one read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryStats {
    pub elapsed_ms: f64,
    pub rows_read: u64,
    pub bytes_read: u64,
}

/// Decoded read response.
#[derive(Debug, Clone)]
pub struct QueryOutput<R> {
    pub rows: Vec<R>,
    pub columns: Vec<ColumnMeta>,
    /// Row count as reported by the store
    pub row_count: u64,
    pub stats: QueryStats,
}

/// `FORMAT JSON` response body.
#[derive(Deserialize)]
struct JsonResponse<R> {
    data: Vec<R>,
    #[serde(default)]
    meta: Vec<ColumnMeta>,
    #[serde(default)]
    rows: u64,
    #[serde(default)]
    statistics: Statistics,
}

#[derive(Deserialize, Default)]
struct Statistics {
    /// Seconds
    #[serde(default)]
    elapsed: f64,
    #[serde(default)]
    rows_read: u64,
    #[serde(default)]
    bytes_read: u64,
}

/// Analytics store handle.
///
/// Owned by the composition root and shared by reference; every call is a
/// self-contained request, so concurrent use needs no locking.
pub struct Store<T = HttpTransport> {
    transport: T,
    database: String,
    retry_interval: Duration,
    state: AtomicU8,
}

impl Store<HttpTransport> {
    /// Store over the HTTP interface described by `config`.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        Ok(Self::new(HttpTransport::new(config)?, config))
    }
}

impl<T: Transport> Store<T> {
    pub fn new(transport: T, config: &StoreConfig) -> Self {
        Self {
            transport,
            database: config.database.clone(),
            retry_interval: config.retry_interval(),
            state: AtomicU8::new(ConnectionState::Disconnected.as_u8()),
        }
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Configured database name.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Single handshake, no retry.
    pub async fn ping(&self) -> Result<()> {
        self.transport
            .send(&StoreRequest::statement("SELECT 1", false))
            .await
            .map(|_| ())
    }

    /// Wait for the store, then bootstrap the schema.
    ///
    /// Retries the handshake at the configured interval until it succeeds;
    /// never returns an error. Calling it on a ready store is a no-op.
    pub async fn connect(&self) {
        if self.state() == ConnectionState::Ready {
            return;
        }
        self.state
            .store(ConnectionState::Connecting.as_u8(), Ordering::Release);

        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            tracing::info!(attempt, "Connecting to store");
            match self.ping().await {
                Ok(()) => break,
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Store handshake failed");
                    tokio::time::sleep(self.retry_interval).await;
                }
            }
        }

        self.bootstrap().await;
        self.state
            .store(ConnectionState::Ready.as_u8(), Ordering::Release);
        tracing::info!(attempts = attempt, database = %self.database, "Store ready");
    }

    /// Idempotent schema bootstrap. Failures are logged, not returned.
    async fn bootstrap(&self) {
        let mut statements = vec![StoreRequest::statement(
            schema::create_database(&self.database),
            false,
        )];
        statements.extend(
            schema::table_statements()
                .into_iter()
                .map(|ddl| StoreRequest::statement(ddl, true)),
        );

        for statement in &statements {
            if let Err(e) = self.transport.send(statement).await {
                tracing::error!(error = %e, "Schema statement failed");
            }
        }
    }

    /// Render and run a read. Rows are decoded into `R` by column name.
    pub async fn execute<R: DeserializeOwned>(&self, plan: &Plan) -> Result<QueryOutput<R>> {
        let rendered = plan.render();
        let request = StoreRequest {
            query: format!("{} FORMAT JSON", rendered.sql),
            params: rendered
                .params
                .iter()
                .map(|p| (p.name.clone(), p.value.to_param_text()))
                .collect(),
            body: None,
            use_database: true,
        };

        let body = self.transport.send(&request).await?;
        let response: JsonResponse<R> = serde_json::from_str(&body)
            .map_err(|e| Error::Query(format!("failed to parse response: {}", e)))?;

        let stats = QueryStats {
            elapsed_ms: response.statistics.elapsed * 1000.0,
            rows_read: response.statistics.rows_read,
            bytes_read: response.statistics.bytes_read,
        };
        tracing::debug!(
            rows = response.rows,
            elapsed_ms = stats.elapsed_ms,
            rows_read = stats.rows_read,
            "Query executed"
        );

        Ok(QueryOutput {
            rows: response.data,
            columns: response.meta,
            row_count: response.rows,
            stats,
        })
    }

    /// Append a batch of records to an event table.
    ///
    /// An empty batch sends nothing. The batch is one request, so it is
    /// written entirely or not at all.
    pub async fn insert<S: Serialize>(&self, table: Table, records: &[S]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        if !table.is_user_partitioned() {
            return Err(Error::Query(format!("{} is not writable", table.sql())));
        }

        let mut body = String::new();
        for record in records {
            body.push_str(&serde_json::to_string(record)?);
            body.push('\n');
        }

        let request = StoreRequest {
            query: format!("INSERT INTO {} FORMAT JSONEachRow", table.sql()),
            params: Vec::new(),
            body: Some(body),
            use_database: true,
        };
        self.transport.send(&request).await?;

        tracing::info!(table = %table.sql(), records = records.len(), "Inserted batch");
        Ok(())
    }
}
