//! HTTP collaborators for the card generator and the session store.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use shared::{
    domain::ClientId,
    protocol::{cards_from_value, Card, GenerateCardsRequest, SessionReadResponse, SessionSnapshot},
};
use tracing::debug;
use url::Url;

use crate::{error::TransportError, session_sync::SessionStore, supply::CardSource};

/// Joins `path` onto `base`, treating the base as a directory even without a
/// trailing slash.
fn endpoint(base: &str, path: &str) -> Result<Url, TransportError> {
    let trimmed = base.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Url::parse(&with_slash)
        .and_then(|root| root.join(path))
        .map_err(|source| TransportError::InvalidUrl {
            url: base.to_string(),
            source,
        })
}

fn with_client_id(url: &Url, client_id: &ClientId) -> Url {
    let mut url = url.clone();
    url.query_pairs_mut()
        .clear()
        .append_pair("client_id", client_id.as_str());
    url
}

async fn read_json(response: reqwest::Response, endpoint: &Url) -> Result<Value, TransportError> {
    response
        .json::<Value>()
        .await
        .map_err(|source| TransportError::Request {
            endpoint: endpoint.to_string(),
            source,
        })
}

fn status_error(endpoint: &Url, status: StatusCode) -> TransportError {
    TransportError::Status {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
    }
}

fn request_error(endpoint: &Url) -> impl FnOnce(reqwest::Error) -> TransportError + '_ {
    move |source| TransportError::Request {
        endpoint: endpoint.to_string(),
        source,
    }
}

#[derive(Clone)]
pub struct HttpCardSource {
    http: Client,
    cards_url: Url,
}

impl HttpCardSource {
    pub fn new(server_url: &str) -> Result<Self, TransportError> {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(http: Client, server_url: &str) -> Result<Self, TransportError> {
        Ok(Self {
            http,
            cards_url: endpoint(server_url, "cards")?,
        })
    }

    pub fn url(&self) -> &Url {
        &self.cards_url
    }
}

#[async_trait]
impl CardSource for HttpCardSource {
    async fn generate(&self, request: GenerateCardsRequest) -> Result<Vec<Card>> {
        let response = self
            .http
            .post(self.cards_url.clone())
            .json(&request)
            .send()
            .await
            .map_err(request_error(&self.cards_url))?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(&self.cards_url, status).into());
        }

        let body = read_json(response, &self.cards_url).await?;
        if body.get("cards").is_none() {
            return Err(TransportError::Malformed {
                endpoint: self.cards_url.to_string(),
                reason: "missing cards field".into(),
            }
            .into());
        }
        let parsed = cards_from_value(&body);
        debug!(
            endpoint = %self.cards_url,
            received = parsed.len(),
            "transport: cards response parsed"
        );
        Ok(parsed)
    }
}

#[derive(Clone)]
pub struct HttpSessionStore {
    http: Client,
    session_url: Url,
}

impl HttpSessionStore {
    pub fn new(server_url: &str) -> Result<Self, TransportError> {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(http: Client, server_url: &str) -> Result<Self, TransportError> {
        Ok(Self {
            http,
            session_url: endpoint(server_url, "session")?,
        })
    }

    pub fn url(&self) -> &Url {
        &self.session_url
    }
}

#[async_trait]
impl SessionStore for HttpSessionStore {
    async fn read(&self, client_id: &ClientId) -> Result<Option<SessionReadResponse>> {
        let url = with_client_id(&self.session_url, client_id);
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(request_error(&url))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(status_error(&url, status).into());
        }

        let body = read_json(response, &url).await?;
        Ok(Some(SessionReadResponse::from_value_lenient(&body)))
    }

    async fn write(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let response = self
            .http
            .post(self.session_url.clone())
            .json(snapshot)
            .send()
            .await
            .map_err(request_error(&self.session_url))?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(&self.session_url, status).into());
        }
        Ok(())
    }

    async fn delete(&self, client_id: &ClientId) -> Result<()> {
        let url = with_client_id(&self.session_url, client_id);
        let response = self
            .http
            .delete(url.clone())
            .send()
            .await
            .map_err(request_error(&url))?;
        let status = response.status();
        // Nothing stored is as good as deleted.
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(status_error(&url, status).into())
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
