use std::borrow::Cow;

use serde::Serialize;
use tracing::debug;

use crate::entities::EntityType;
use crate::error::DgitError;
use crate::sources::rate_limit::Source;

const DGIDB_BASE: &str = "https://dgidb.org/api/graphql";
const DGIDB_API: &str = "dgidb";
const DGIDB_BASE_ENV: &str = "DGIT_DGIDB_BASE";

const GENE_INTERACTIONS_QUERY: &str = r#"
query($names: [String!]!) {
  genes(names: $names) {
    nodes {
      name
      conceptId
      interactions {
        drug { name conceptId }
        interactionScore
        interactionTypes { type directionality }
        publications { pmid }
        sources { sourceDbName }
      }
    }
  }
}
"#;

const DRUG_INTERACTIONS_QUERY: &str = r#"
query($names: [String!]!) {
  drugs(names: $names) {
    nodes {
      name
      conceptId
      interactions {
        gene { name conceptId longName }
        interactionScore
        interactionTypes { type directionality }
        publications { pmid }
        sources { sourceDbName }
      }
    }
  }
}
"#;

/// Configured endpoint, honoring the environment override.
pub(crate) fn base_url() -> String {
    crate::sources::env_base(DGIDB_BASE, DGIDB_BASE_ENV).into_owned()
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

/// Client for the DGIdb GraphQL interaction graph.
pub struct DgidbClient {
    client: reqwest_middleware::ClientWithMiddleware,
    endpoint: Cow<'static, str>,
}

impl DgidbClient {
    pub fn new() -> Result<Self, DgitError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            endpoint: crate::sources::env_base(DGIDB_BASE, DGIDB_BASE_ENV),
        })
    }

    #[cfg(test)]
    pub(crate) fn new_for_test(endpoint: String) -> Result<Self, DgitError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            endpoint: Cow::Owned(endpoint),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_client(mut self, client: reqwest_middleware::ClientWithMiddleware) -> Self {
        self.client = client;
        self
    }

    async fn post_json<B: Serialize>(&self, body: &B) -> Result<serde_json::Value, DgitError> {
        let url = self.endpoint.as_ref();
        debug!(url, "dgidb graphql request");
        let resp = self
            .client
            .post(url)
            .with_extension(Source(DGIDB_API))
            .json(body)
            .send()
            .await
            .map_err(|err| DgitError::transport(DGIDB_API, err))?;
        let status = resp.status();
        let content_type = resp.headers().get(reqwest::header::CONTENT_TYPE).cloned();
        let bytes = crate::sources::read_limited_body(resp, DGIDB_API).await?;

        if !status.is_success() {
            let excerpt = crate::sources::body_excerpt(&bytes);
            return Err(DgitError::Api {
                api: DGIDB_API.to_string(),
                message: format!("HTTP {status}: {excerpt}"),
            });
        }

        crate::sources::ensure_json_content_type(DGIDB_API, content_type.as_ref(), &bytes)?;
        serde_json::from_slice(&bytes).map_err(|source| DgitError::ApiJson {
            api: DGIDB_API.to_string(),
            source,
        })
    }

    /// Fetches the interaction partners of a gene or drug.
    ///
    /// The payload is returned unchanged on success. A payload carrying a
    /// GraphQL `errors` array is reported as an upstream error instead.
    pub async fn interactions(
        &self,
        entity: EntityType,
        term: &str,
    ) -> Result<serde_json::Value, DgitError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(DgitError::InvalidArgument(
                "DGIdb lookup requires a non-empty name".into(),
            ));
        }

        let query = match entity {
            EntityType::Gene => GENE_INTERACTIONS_QUERY,
            EntityType::Drug => DRUG_INTERACTIONS_QUERY,
            EntityType::Protein => {
                return Err(DgitError::InvalidArgument(
                    "DGIdb does not serve protein lookups".into(),
                ));
            }
        };

        let body = GraphQlRequest {
            query,
            variables: serde_json::json!({ "names": [term] }),
        };
        let payload = self.post_json(&body).await?;

        if let Some(message) = graphql_error_message(&payload) {
            return Err(DgitError::Upstream {
                api: DGIDB_API.to_string(),
                message,
            });
        }
        Ok(payload)
    }
}

/// Returns the first GraphQL error message when the payload reports failure.
pub(crate) fn graphql_error_message(payload: &serde_json::Value) -> Option<String> {
    let errors = payload.get("errors")?.as_array()?;
    let first = errors.first()?;
    Some(
        first
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or("GraphQL error")
            .to_string(),
    )
}
