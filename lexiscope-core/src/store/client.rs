//! HTTP transport for the ClickHouse HTTP interface
//!
//! Every request is a `POST` to the base URL with basic auth. Query text goes
//! in the body, except for inserts where the body carries the rows and the
//! statement moves to the `query` URL parameter. Bound parameters travel as
//! `param_<name>` URL parameters.

use std::time::Duration;

use crate::config::StoreConfig;
use crate::error::{Error, Result};

use super::{StoreRequest, Transport};

/// Session settings sent with every request.
pub const SESSION_SETTINGS: &[(&str, &str)] = &[
    ("joined_subquery_requires_alias", "0"),
    ("allow_experimental_nlp_functions", "1"),
    ("join_use_nulls", "1"),
    ("output_format_json_quote_64bit_integers", "0"),
];

/// reqwest-backed [`Transport`].
pub struct HttpTransport {
    http_client: reqwest::Client,
    base_url: String,
    user: String,
    password: String,
    database: String,
}

impl HttpTransport {
    /// Create a transport from configuration
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: &StoreConfig) -> Result<Self> {
        config.validate()?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.url.trim_end_matches('/').to_string(),
            user: config.user.clone(),
            password: config.password.clone(),
            database: config.database.clone(),
        })
    }

    /// URL parameters for a request, settings first.
    fn url_params(&self, request: &StoreRequest, query_id: &str) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = SESSION_SETTINGS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        params.push(("query_id".to_string(), query_id.to_string()));
        if request.use_database {
            params.push(("database".to_string(), self.database.clone()));
        }
        if request.body.is_some() {
            params.push(("query".to_string(), request.query.clone()));
        }
        for (name, value) in &request.params {
            params.push((format!("param_{}", name), value.clone()));
        }

        params
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: &StoreRequest) -> Result<String> {
        let query_id = uuid::Uuid::new_v4().to_string();
        let body = match &request.body {
            Some(rows) => rows.clone(),
            None => request.query.clone(),
        };

        tracing::trace!(query_id = %query_id, query = %request.query, "Sending store request");

        let response = self
            .http_client
            .post(&self.base_url)
            .basic_auth(&self.user, Some(&self.password))
            .query(&self.url_params(request, &query_id))
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Connection(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Connection(format!("failed to read response: {}", e)))?;

        if status.is_success() {
            Ok(text)
        } else {
            tracing::debug!(query_id = %query_id, %status, "Store rejected request");
            Err(Error::Query(format!("store error ({}): {}", status, text.trim())))
        }
    }
}
