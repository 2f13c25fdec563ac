use std::borrow::Cow;
use std::collections::HashMap;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::DgitError;
use crate::sources::rate_limit::Source;

// NCBI E-utilities
// Docs: https://www.ncbi.nlm.nih.gov/books/NBK25500/
const NCBI_EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
const NCBI_EUTILS_API: &str = "ncbi-eutils";
const NCBI_EUTILS_BASE_ENV: &str = "DGIT_NCBI_BASE";

pub(crate) fn base_url() -> String {
    crate::sources::env_base(NCBI_EUTILS_BASE, NCBI_EUTILS_BASE_ENV).into_owned()
}

/// Free-text description of a gene symbol; `None` when nothing is known.
#[async_trait::async_trait]
pub(crate) trait GeneSummary: Send + Sync {
    async fn gene_summary(&self, term: &str) -> Option<String>;
}

/// Two-step gene summary lookup: `esearch` for an id, then `esummary` for the text.
#[derive(Clone)]
pub struct NcbiGeneClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
    api_key: Option<String>,
}

impl NcbiGeneClient {
    pub fn new() -> Result<Self, DgitError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: crate::sources::env_base(NCBI_EUTILS_BASE, NCBI_EUTILS_BASE_ENV),
            api_key: crate::sources::ncbi_api_key(),
        })
    }

    #[cfg(test)]
    fn new_for_test(base: String, api_key: Option<String>) -> Result<Self, DgitError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: Cow::Owned(base),
            api_key: api_key
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_client(mut self, client: reqwest_middleware::ClientWithMiddleware) -> Self {
        self.client = client;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base.as_ref().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        req: reqwest_middleware::RequestBuilder,
    ) -> Result<T, DgitError> {
        let req = crate::sources::append_ncbi_api_key(req, self.api_key.as_deref())
            .with_extension(Source(NCBI_EUTILS_API));
        let resp = req
            .send()
            .await
            .map_err(|err| DgitError::transport(NCBI_EUTILS_API, err))?;
        let status = resp.status();
        let bytes = crate::sources::read_limited_body(resp, NCBI_EUTILS_API).await?;
        if !status.is_success() {
            let excerpt = crate::sources::body_excerpt(&bytes);
            return Err(DgitError::Api {
                api: NCBI_EUTILS_API.to_string(),
                message: format!("HTTP {status}: {excerpt}"),
            });
        }
        serde_json::from_slice(&bytes).map_err(|source| DgitError::ApiJson {
            api: NCBI_EUTILS_API.to_string(),
            source,
        })
    }

    async fn first_gene_id(&self, term: &str) -> Result<Option<String>, DgitError> {
        let url = self.endpoint("esearch.fcgi");
        let resp: ESearchResponse = self
            .get_json(self.client.get(&url).query(&[
                ("db", "gene"),
                ("term", term),
                ("retmode", "json"),
            ]))
            .await?;
        Ok(resp
            .esearchresult
            .idlist
            .into_iter()
            .map(|id| id.trim().to_string())
            .find(|id| !id.is_empty()))
    }

    async fn description(&self, gene_id: &str) -> Result<Option<String>, DgitError> {
        let url = self.endpoint("esummary.fcgi");
        let resp: ESummaryResponse = self
            .get_json(self.client.get(&url).query(&[
                ("db", "gene"),
                ("id", gene_id),
                ("retmode", "json"),
            ]))
            .await?;
        Ok(resp
            .result
            .get(gene_id)
            .and_then(|doc| doc.get("description"))
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string))
    }

    async fn try_summary(&self, term: &str) -> Result<Option<String>, DgitError> {
        let Some(gene_id) = self.first_gene_id(term).await? else {
            return Ok(None);
        };
        self.description(&gene_id).await
    }

    /// Returns the NCBI gene description for `term`, or `None`.
    ///
    /// The first search hit is used without disambiguation. Any failure is
    /// logged and reported as "no summary".
    pub async fn summary(&self, term: &str) -> Option<String> {
        let term = term.trim();
        if term.is_empty() {
            return None;
        }
        match self.try_summary(term).await {
            Ok(summary) => summary,
            Err(err) => {
                debug!(term, error = %err, "NCBI gene summary unavailable");
                None
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ESearchResponse {
    #[serde(default)]
    esearchresult: ESearchResult,
}

#[derive(Debug, Default, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ESummaryResponse {
    #[serde(default)]
    result: HashMap<String, serde_json::Value>,
}

#[async_trait::async_trait]
impl GeneSummary for NcbiGeneClient {
    async fn gene_summary(&self, term: &str) -> Option<String> {
        self.summary(term).await
    }
}
