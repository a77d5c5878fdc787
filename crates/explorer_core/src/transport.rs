//! Network boundary of the engine: the partial-content endpoint and form
//! submission targets are both reached through [`Transport`].

use std::fmt;

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use serde::de::DeserializeOwned;
use shared::protocol::PartialPayload;
use tracing::debug;
use url::Url;

use crate::error::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// A request against the application server. `url` is server-relative
/// (path plus optional query); `fields` travel as query parameters for GET
/// and as an urlencoded body for POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub fields: Vec<(String, String)>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            fields: Vec::new(),
        }
    }

    pub fn new(method: Method, url: impl Into<String>, fields: Vec<(String, String)>) -> Self {
        Self {
            method,
            url: url.into(),
            fields,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn html(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: Some("text/html; charset=utf-8".into()),
            body: body.into().into_bytes(),
        }
    }

    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            content_type: Some("application/json".into()),
            body: body.to_string().into_bytes(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_json(&self) -> bool {
        self.content_type.as_deref().is_some_and(|value| {
            let mime = value.split(';').next().unwrap_or_default().trim();
            mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json")
        })
    }

    pub fn text(&self) -> Result<String, FetchError> {
        String::from_utf8(self.body.clone()).map_err(|err| FetchError::Decode(err.to_string()))
    }

    pub fn decode_json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        serde_json::from_slice(&self.body).map_err(|err| FetchError::Decode(err.to_string()))
    }

    /// Converts a non-success status into [`FetchError::Http`].
    pub fn error_for_status(self) -> Result<Self, FetchError> {
        if self.is_success() {
            return Ok(self);
        }
        let body = String::from_utf8_lossy(&self.body).into_owned();
        Err(FetchError::Http {
            status: self.status,
            body,
        })
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: Request) -> Result<RawResponse, FetchError>;
}

pub struct HttpTransport {
    http: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let base_url =
            Url::parse(base_url).map_err(|err| FetchError::Network(format!("{base_url}: {err}")))?;
        Ok(Self {
            http: Client::new(),
            base_url,
        })
    }

    fn resolve(&self, request: &Request) -> Result<Url, FetchError> {
        let mut url = self
            .base_url
            .join(&request.url)
            .map_err(|err| FetchError::Network(format!("{}: {err}", request.url)))?;
        if request.method == Method::Get && !request.fields.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.fields);
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: Request) -> Result<RawResponse, FetchError> {
        let url = self.resolve(&request)?;
        debug!(method = %request.method, %url, "transport: sending request");
        let builder = match request.method {
            Method::Get => self.http.get(url),
            Method::Post => self.http.post(url).form(&request.fields),
        };
        let res = builder.send().await?;
        let status = res.status().as_u16();
        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = res.bytes().await?.to_vec();
        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Decoded partial content: either a rendered fragment or a typed payload.
#[derive(Debug, Clone)]
pub enum PartialContent {
    Html(String),
    Data(PartialPayload),
}

impl PartialContent {
    /// Markup to inject into the sidebar.
    pub fn html(&self) -> &str {
        match self {
            PartialContent::Html(html) => html,
            PartialContent::Data(payload) => payload.html.as_deref().unwrap_or_default(),
        }
    }

    pub fn payload(&self) -> Option<&PartialPayload> {
        match self {
            PartialContent::Html(_) => None,
            PartialContent::Data(payload) => Some(payload),
        }
    }
}

pub fn decode_partial(raw: RawResponse) -> Result<PartialContent, FetchError> {
    let raw = raw.error_for_status()?;
    if raw.is_json() {
        raw.decode_json().map(PartialContent::Data)
    } else {
        raw.text().map(PartialContent::Html)
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
