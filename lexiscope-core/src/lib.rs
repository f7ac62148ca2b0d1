//! # lexiscope-core
//!
//! Core library for lexiscope - text-usage analytics over typed-word and
//! sent-message event logs.
//!
//! This library provides:
//! - Domain types for word and message events and chart results
//! - An immutable query plan tree rendered to store queries with bound parameters
//! - The store adapter (ClickHouse HTTP interface) with connect/retry and schema bootstrap
//! - The chart catalog and the dual-scope executor
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! A chart request flows through three layers:
//! - **Catalog:** validates parameters and builds a [`plan::Plan`] (pure)
//! - **Executor:** runs the plan server-wide and, when scoped, for one user
//! - **Store:** renders, sends, and decodes each query
//!
//! ## Example
//!
//! ```rust,no_run
//! use lexiscope_core::charts::{load_chart, ChartOutcome, ParamBag};
//! use lexiscope_core::{Config, Store};
//!
//! # async fn run() -> lexiscope_core::Result<()> {
//! let config = Config::load()?;
//! let store = Store::from_config(&config.store)?;
//! store.connect().await;
//!
//! let params = ParamBag::new().with("userId", "u1");
//! if let ChartOutcome::Ok(result) = load_chart(&store, "wordCountByTime", &params).await {
//!     println!("{} buckets", result.server_series.len());
//! }
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use charts::{ChartOutcome, ChartRequest, ParamBag};
pub use config::Config;
pub use error::{Error, Result};
pub use store::Store;
pub use types::*;

// Public modules
pub mod charts;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod plan;
pub mod store;
pub mod text;
pub mod types;
