//! Read-through adapter for the remote word-set API.
//!
//! Requests are single-shot: failures surface to the caller unchanged.

use std::env;

use async_trait::async_trait;
use practice_core::model::{WordSet, WordSetId};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;

use crate::repository::{StorageError, WordSetListing, WordSetRepository};

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: Option<String>,
}

impl ApiConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Reads `PRACTICE_API_URL` and optional `PRACTICE_API_TOKEN`.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("PRACTICE_API_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        Some(Self::new(base_url).with_token(env::var("PRACTICE_API_TOKEN").ok()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[derive(Clone)]
pub struct HttpWordSetSource {
    client: Client,
    config: ApiConfig,
}

impl HttpWordSetSource {
    #[must_use]
    pub fn new(config: ApiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn http(e: reqwest::Error) -> StorageError {
    StorageError::Http(e.to_string())
}

fn status_error(status: StatusCode) -> StorageError {
    match status {
        StatusCode::NOT_FOUND => StorageError::NotFound,
        StatusCode::CONFLICT => StorageError::Conflict,
        other => StorageError::Http(format!("unexpected status {other}")),
    }
}

#[derive(Debug, Deserialize)]
struct ListingResponse {
    id: WordSetId,
    name: String,
    #[serde(default)]
    word_count: usize,
}

#[async_trait]
impl WordSetRepository for HttpWordSetSource {
    async fn upsert_word_set(&self, set: &WordSet) -> Result<(), StorageError> {
        let url = self.config.url(&format!("word-sets/{}", set.id()));
        let response = self
            .authorized(self.client.put(url).json(set))
            .send()
            .await
            .map_err(http)?;
        if !response.status().is_success() {
            return Err(status_error(response.status()));
        }
        Ok(())
    }

    async fn get_word_set(&self, id: WordSetId) -> Result<WordSet, StorageError> {
        let url = self.config.url(&format!("word-sets/{id}"));
        log::debug!("GET {url}");
        let response = self
            .authorized(self.client.get(url))
            .send()
            .await
            .map_err(http)?;
        if !response.status().is_success() {
            return Err(status_error(response.status()));
        }
        let body = response.text().await.map_err(http)?;
        serde_json::from_str(&body).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn list_word_sets(&self) -> Result<Vec<WordSetListing>, StorageError> {
        let url = self.config.url("word-sets");
        let response = self
            .authorized(self.client.get(url))
            .send()
            .await
            .map_err(http)?;
        if !response.status().is_success() {
            return Err(status_error(response.status()));
        }
        let rows: Vec<ListingResponse> = response.json().await.map_err(http)?;
        Ok(rows
            .into_iter()
            .map(|row| WordSetListing {
                id: row.id,
                name: row.name,
                word_count: row.word_count,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let config = ApiConfig::new("https://api.example.com/v1/");
        assert_eq!(
            config.url("word-sets/3"),
            "https://api.example.com/v1/word-sets/3"
        );
    }

    #[test]
    fn blank_token_is_dropped() {
        let config = ApiConfig::new("http://localhost").with_token(Some("  ".into()));
        assert!(config.token.is_none());
    }

    #[test]
    fn statuses_map_to_storage_errors() {
        assert!(matches!(status_error(StatusCode::NOT_FOUND), StorageError::NotFound));
        assert!(matches!(status_error(StatusCode::CONFLICT), StorageError::Conflict));
        assert!(matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR),
            StorageError::Http(_)
        ));
    }

    #[test]
    fn listing_tolerates_missing_count() {
        let rows: Vec<ListingResponse> =
            serde_json::from_str(r#"[{"id":1,"name":"Animals"}]"#).unwrap();
        assert_eq!(rows[0].word_count, 0);
        assert_eq!(rows[0].id, WordSetId::new(1));
    }
}
