use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::core::sessions::SessionClassifier;
use crate::error::{JournalError, JournalResult};
use crate::journal::JournalBackend;
use crate::models::{RecordDraft, RecordKind, Settings, TradeRecord};

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(alias = "message")]
    error: String,
}

/// Client for the remote journal API. Requests are independent, carry a
/// timeout, and are never retried.
pub struct HttpJournal {
    client: Client,
    base_url: String,
    sessions: SessionClassifier,
}

impl HttpJournal {
    pub fn new(cfg: &Config) -> JournalResult<Self> {
        Self::with_base_url(
            &cfg.api_base_url,
            cfg.api_timeout(),
            SessionClassifier::new(&cfg.sessions),
        )
    }

    pub fn with_base_url(
        base_url: &str,
        timeout: Duration,
        sessions: SessionClassifier,
    ) -> JournalResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            sessions,
        })
    }

    pub fn records_url(&self, kind: Option<RecordKind>) -> String {
        match kind {
            Some(k) => format!("{}/api/records?kind={}", self.base_url, k),
            None => format!("{}/api/records", self.base_url),
        }
    }

    pub fn record_url(&self, id: u64) -> String {
        format!("{}/api/records/{}", self.base_url, id)
    }

    pub fn settings_url(&self) -> String {
        format!("{}/api/settings", self.base_url)
    }

    async fn send(&self, request: RequestBuilder) -> JournalResult<Response> {
        let resp = request.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&text)
            .map(|b| b.error)
            .unwrap_or(text);
        warn!("Journal API error {}: {}", status, message);
        Err(JournalError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> JournalResult<T> {
        let resp = self.send(request).await?;
        Ok(resp.json::<T>().await?)
    }
}

#[async_trait]
impl JournalBackend for HttpJournal {
    async fn list(&mut self, kind: Option<RecordKind>) -> JournalResult<Vec<TradeRecord>> {
        let url = self.records_url(kind);
        debug!("GET {}", url);
        self.send_json(self.client.get(&url)).await
    }

    async fn get(&mut self, id: u64) -> JournalResult<TradeRecord> {
        let url = self.record_url(id);
        debug!("GET {}", url);
        match self.send_json(self.client.get(&url)).await {
            Err(JournalError::Api { status: 404, .. }) => Err(JournalError::NotFound(id)),
            other => other,
        }
    }

    async fn create(&mut self, draft: RecordDraft) -> JournalResult<TradeRecord> {
        // Reject locally before spending a round trip.
        let valid = draft.validate(&self.sessions)?;
        let url = self.records_url(None);
        debug!("POST {}", url);
        self.send_json(self.client.post(&url).json(&valid)).await
    }

    async fn update(&mut self, id: u64, draft: RecordDraft) -> JournalResult<TradeRecord> {
        let valid = draft.validate(&self.sessions)?;
        let url = self.record_url(id);
        debug!("PUT {}", url);
        match self.send_json(self.client.put(&url).json(&valid)).await {
            Err(JournalError::Api { status: 404, .. }) => Err(JournalError::NotFound(id)),
            other => other,
        }
    }

    async fn delete(&mut self, id: u64) -> JournalResult<()> {
        let url = self.record_url(id);
        debug!("DELETE {}", url);
        match self.send(self.client.delete(&url)).await {
            Ok(_) => Ok(()),
            Err(JournalError::Api { status: 404, .. }) => Err(JournalError::NotFound(id)),
            Err(e) => Err(e),
        }
    }

    async fn settings(&mut self) -> JournalResult<Settings> {
        let url = self.settings_url();
        debug!("GET {}", url);
        self.send_json(self.client.get(&url)).await
    }

    async fn save_settings(&mut self, settings: Settings) -> JournalResult<Settings> {
        let url = self.settings_url();
        debug!("PUT {}", url);
        self.send_json(self.client.put(&url).json(&settings)).await
    }
}
