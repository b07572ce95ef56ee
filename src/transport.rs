//! HTTP round trip to the search backend's multi-search endpoint.

use std::collections::BTreeMap;
use std::io::Read;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_ENCODING, CONTENT_TYPE,
};
use reqwest::Client;
use tracing::{debug, warn};

const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Posts a rendered envelope and returns the decoded response body.
#[allow(async_fn_in_trait)]
pub trait SearchTransport {
    async fn post(&self, body: String) -> Result<String>;
}

pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(
        endpoint: impl Into<String>,
        extra_headers: &BTreeMap<String, String>,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/x-ndjson"));
        for (name, value) in extra_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("invalid header name `{name}`"))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("invalid value for header `{name}`"))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .default_headers(headers)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

impl SearchTransport for HttpTransport {
    async fn post(&self, body: String) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .body(body)
            .send()
            .await
            .with_context(|| format!("failed to send search request to {}", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, endpoint = %self.endpoint, "search backend returned an error status");
        }

        let bytes = response
            .bytes()
            .await
            .context("failed to read search response body")?;
        debug!(bytes = bytes.len(), "received search response");
        Ok(decode_body(&bytes))
    }
}

/// Gunzips the body, or takes it as plain text when it is not gzip.
/// Invalid UTF-8 in either case is replaced rather than rejected.
pub fn decode_body(bytes: &[u8]) -> String {
    let mut decoded = Vec::new();
    match GzDecoder::new(bytes).read_to_end(&mut decoded) {
        Ok(_) => String::from_utf8_lossy(&decoded).into_owned(),
        Err(e) => {
            debug!(error = %e, "response is not gzip encoded, reading as plain text");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}
