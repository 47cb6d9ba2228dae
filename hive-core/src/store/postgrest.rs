//! Hosted story log over PostgREST (Supabase's REST layer).

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::StoryStore;
use crate::config::DEFAULT_TABLE;
use crate::error::StoreError;
use crate::turn::{parse_timestamp, sort_log, Role, Turn};

/// Story log stored in a PostgREST table. The server assigns `id` and `created_at`.
pub struct PostgrestStore {
    client: reqwest::Client,
    base_url: String,
    key: SecretString,
    table: String,
}

#[derive(Debug, Deserialize)]
struct StoryRow {
    id: i64,
    role: String,
    content: String,
    created_at: String,
}

#[derive(Debug, Serialize)]
struct NewStoryRow<'a> {
    role: &'a str,
    content: &'a str,
}

impl StoryRow {
    fn into_turn(self) -> Result<Turn, StoreError> {
        let role = self
            .role
            .parse::<Role>()
            .map_err(|e| StoreError::Malformed(format!("row {}: {e}", self.id)))?;
        let created_at = parse_timestamp(&self.created_at).ok_or_else(|| {
            StoreError::Malformed(format!("row {}: bad timestamp {:?}", self.id, self.created_at))
        })?;
        Ok(Turn {
            id: self.id,
            role,
            content: self.content,
            created_at,
        })
    }
}

impl PostgrestStore {
    /// `base_url` is the project root, e.g. `https://abc.supabase.co`.
    pub fn new(base_url: impl Into<String>, key: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.into(),
            key,
            table: DEFAULT_TABLE.to_string(),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), self.table)
    }

    fn build_headers(&self) -> Result<HeaderMap, StoreError> {
        let key = self.key.expose_secret();
        let invalid = |e: reqwest::header::InvalidHeaderValue| {
            StoreError::Unavailable(format!("invalid service key: {e}"))
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("apikey", HeaderValue::from_str(key).map_err(invalid)?);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {key}")).map_err(invalid)?,
        );
        Ok(headers)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Unavailable(format!("HTTP {status}: {body}")))
    }
}

fn decode_rows(rows: Vec<StoryRow>) -> Vec<Turn> {
    let mut turns: Vec<Turn> = rows
        .into_iter()
        .filter_map(|row| match row.into_turn() {
            Ok(turn) => Some(turn),
            Err(e) => {
                warn!(error = %e, "skipping story row");
                None
            }
        })
        .collect();
    // Offsets in `timestamptz` output can differ per row; order on the parsed instants.
    sort_log(&mut turns);
    turns
}

#[async_trait]
impl StoryStore for PostgrestStore {
    async fn load(&self) -> Result<Vec<Turn>, StoreError> {
        let url = self.table_url();
        debug!(url = %url, "loading story log");

        let response = self
            .client
            .get(&url)
            .headers(self.build_headers()?)
            .query(&[("select", "*"), ("order", "created_at.asc,id.asc")])
            .send()
            .await?;

        let rows: Vec<StoryRow> = Self::check(response).await?.json().await?;
        Ok(decode_rows(rows))
    }

    async fn append(&self, role: Role, content: &str) -> Result<Turn, StoreError> {
        let url = self.table_url();
        debug!(url = %url, role = %role, "appending story turn");

        let response = self
            .client
            .post(&url)
            .headers(self.build_headers()?)
            .header("Prefer", "return=representation")
            .json(&[NewStoryRow {
                role: role.as_str(),
                content,
            }])
            .send()
            .await?;

        let rows: Vec<StoryRow> = Self::check(response).await?.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Malformed("insert returned no row".to_string()))?
            .into_turn()
    }

    fn name(&self) -> &str {
        "postgrest"
    }
}
