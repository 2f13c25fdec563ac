//! Source clients and shared HTTP utilities for the upstream biomedical APIs.

use std::borrow::Cow;
use std::sync::OnceLock;
use std::time::Duration;

use reqwest::header::{HeaderValue, USER_AGENT};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use tracing::warn;

use crate::entities::EntityType;
use crate::error::DgitError;

pub(crate) mod dgidb;
pub(crate) mod gemini;
pub(crate) mod ncbi_gene;
pub(crate) mod rate_limit;
pub(crate) mod uniprot;

const ERROR_BODY_MAX_BYTES: usize = 2048;
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
pub(crate) const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

static HTTP_CLIENT: OnceLock<ClientWithMiddleware> = OnceLock::new();

/// Uniform fetch contract for the primary lookup sources.
///
/// Implementations return the upstream payload untouched so the caller can
/// both flatten it and persist it verbatim.
#[async_trait::async_trait]
pub(crate) trait Upstream: Send + Sync {
    async fn fetch(&self, entity: EntityType, term: &str)
    -> Result<serde_json::Value, DgitError>;
}

/// Routes genes and drugs to DGIdb and proteins to UniProt.
pub(crate) struct LiveUpstream {
    dgidb: dgidb::DgidbClient,
    uniprot: uniprot::UniProtClient,
}

impl LiveUpstream {
    pub(crate) fn new() -> Result<Self, DgitError> {
        Ok(Self {
            dgidb: dgidb::DgidbClient::new()?,
            uniprot: uniprot::UniProtClient::new()?,
        })
    }
}

#[async_trait::async_trait]
impl Upstream for LiveUpstream {
    async fn fetch(
        &self,
        entity: EntityType,
        term: &str,
    ) -> Result<serde_json::Value, DgitError> {
        match entity {
            EntityType::Gene | EntityType::Drug => self.dgidb.interactions(entity, term).await,
            EntityType::Protein => self.uniprot.search(term).await,
        }
    }
}

pub(crate) fn env_base(default: &'static str, env_var: &str) -> Cow<'static, str> {
    std::env::var(env_var)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(Cow::Owned)
        .unwrap_or_else(|| Cow::Borrowed(default))
}

pub(crate) fn ncbi_api_key() -> Option<String> {
    std::env::var("NCBI_API_KEY")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub(crate) fn append_ncbi_api_key(
    req: reqwest_middleware::RequestBuilder,
    api_key: Option<&str>,
) -> reqwest_middleware::RequestBuilder {
    if let Some(key) = api_key {
        return req.query(&[("api_key", key)]);
    }
    req
}

/// Builds a middleware client with the given request timeout and per-upstream
/// request spacing. No retry middleware is installed: a failed upstream call
/// surfaces to the caller as-is.
pub(crate) fn build_client(request_timeout: Duration) -> Result<ClientWithMiddleware, DgitError> {
    let mut default_headers = reqwest::header::HeaderMap::new();
    default_headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("dgit-cli/", env!("CARGO_PKG_VERSION"))),
    );

    let base_client = reqwest::Client::builder()
        .timeout(request_timeout)
        .connect_timeout(CONNECT_TIMEOUT.min(request_timeout))
        .default_headers(default_headers)
        .build()
        .map_err(DgitError::HttpClientInit)?;

    Ok(ClientBuilder::new(base_client)
        .with(rate_limit::RateLimitMiddleware::new())
        .build())
}

/// Returns the process-wide client with the default timeouts.
pub(crate) fn shared_client() -> Result<ClientWithMiddleware, DgitError> {
    if let Some(client) = HTTP_CLIENT.get() {
        return Ok(client.clone());
    }

    let client = build_client(REQUEST_TIMEOUT)?;
    match HTTP_CLIENT.set(client.clone()) {
        Ok(()) => Ok(client),
        Err(_) => HTTP_CLIENT.get().cloned().ok_or_else(|| DgitError::Api {
            api: "http-client".into(),
            message: "Shared HTTP client initialization race".into(),
        }),
    }
}

pub(crate) fn body_excerpt(bytes: &[u8]) -> String {
    let full = String::from_utf8_lossy(bytes);

    let truncated: &str = if full.len() > ERROR_BODY_MAX_BYTES {
        let mut end = ERROR_BODY_MAX_BYTES;
        while end > 0 && !full.is_char_boundary(end) {
            end -= 1;
        }
        &full[..end]
    } else {
        full.as_ref()
    };

    let mut s = truncated.trim().replace(['\n', '\r', '\t'], " ");
    if full.len() > ERROR_BODY_MAX_BYTES {
        s.push_str(" …");
    }
    s
}

pub(crate) fn ensure_json_content_type(
    api: &str,
    content_type: Option<&HeaderValue>,
    body: &[u8],
) -> Result<(), DgitError> {
    let Some(content_type) = content_type else {
        return Ok(());
    };

    let raw = match content_type.to_str() {
        Ok(v) => v.trim(),
        Err(_) => {
            warn!(
                source = api,
                "Response content-type header was not valid UTF-8; attempting JSON parse"
            );
            return Ok(());
        }
    };
    if raw.is_empty() {
        return Ok(());
    }

    let media_type = raw
        .split(';')
        .next()
        .map(str::trim)
        .unwrap_or_default()
        .to_ascii_lowercase();
    let is_html = matches!(media_type.as_str(), "text/html" | "application/xhtml+xml");
    if is_html {
        return Err(DgitError::Api {
            api: api.to_string(),
            message: format!(
                "Unexpected HTML response (content-type: {raw}): {}",
                body_excerpt(body)
            ),
        });
    }

    let is_json = media_type == "application/json"
        || media_type == "text/json"
        || media_type.ends_with("+json");
    if !is_json {
        warn!(
            source = api,
            content_type = raw,
            "Unexpected non-JSON content type; attempting JSON parse for compatibility"
        );
    }

    Ok(())
}

pub(crate) async fn read_limited_body(
    mut resp: reqwest::Response,
    api: &str,
) -> Result<Vec<u8>, DgitError> {
    let mut body: Vec<u8> = Vec::new();

    while let Some(chunk) = resp
        .chunk()
        .await
        .map_err(|err| DgitError::transport(api, err))?
    {
        let next_len = body.len().saturating_add(chunk.len());
        if next_len > DEFAULT_MAX_BODY_BYTES {
            return Err(DgitError::Api {
                api: api.to_string(),
                message: format!("Response body exceeded {DEFAULT_MAX_BODY_BYTES} bytes"),
            });
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}
