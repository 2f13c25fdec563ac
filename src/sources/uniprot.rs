use std::borrow::Cow;

use tracing::debug;

use crate::error::DgitError;
use crate::sources::rate_limit::Source;
use crate::utils::text::truncate_chars;

const UNIPROT_BASE: &str = "https://rest.uniprot.org";
const UNIPROT_API: &str = "uniprot";
const UNIPROT_BASE_ENV: &str = "DGIT_UNIPROT_BASE";

const UNIPROT_FIELDS: &str = "accession,protein_name,gene_primary,gene_names,organism_name";
const HUMAN_TAXON: &str = "9606";
const PAGE_SIZE: &str = "5";
const BODY_SNIPPET_CHARS: usize = 300;

/// Configured base, honoring the environment override.
pub(crate) fn base_url() -> String {
    crate::sources::env_base(UNIPROT_BASE, UNIPROT_BASE_ENV).into_owned()
}

/// Client for the UniProtKB keyword search.
pub struct UniProtClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
}

impl UniProtClient {
    pub fn new() -> Result<Self, DgitError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: crate::sources::env_base(UNIPROT_BASE, UNIPROT_BASE_ENV),
        })
    }

    #[cfg(test)]
    pub(crate) fn new_for_test(base: String) -> Result<Self, DgitError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: Cow::Owned(base),
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

    /// Keyword search restricted to human entries; returns the top hits only.
    ///
    /// An exact match is not guaranteed: UniProt ranks by relevance.
    pub async fn search(&self, term: &str) -> Result<serde_json::Value, DgitError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(DgitError::InvalidArgument(
                "UniProt search requires a non-empty protein name".into(),
            ));
        }

        let url = self.endpoint("uniprotkb/search");
        let query = format!("({term}) AND organism_id:{HUMAN_TAXON}");
        let resp = self
            .client
            .get(&url)
            .with_extension(Source(UNIPROT_API))
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[
                ("query", query.as_str()),
                ("fields", UNIPROT_FIELDS),
                ("format", "json"),
                ("size", PAGE_SIZE),
            ])
            .send()
            .await
            .map_err(|err| DgitError::transport(UNIPROT_API, err))?;

        let status = resp.status();
        let resolved_url = resp.url().to_string();
        debug!(url = %resolved_url, "uniprot search");
        let content_type = resp.headers().get(reqwest::header::CONTENT_TYPE).cloned();
        let bytes = crate::sources::read_limited_body(resp, UNIPROT_API).await?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes);
            let snippet = truncate_chars(&body, BODY_SNIPPET_CHARS);
            return Err(DgitError::Api {
                api: UNIPROT_API.to_string(),
                message: format!("HTTP {status} at {resolved_url}. Body: {snippet}"),
            });
        }

        crate::sources::ensure_json_content_type(UNIPROT_API, content_type.as_ref(), &bytes)?;
        serde_json::from_slice(&bytes).map_err(|source| DgitError::ApiJson {
            api: UNIPROT_API.to_string(),
            source,
        })
    }
}
