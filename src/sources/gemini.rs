use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::error::DgitError;
use crate::sources::rate_limit::Source;

const GEMINI_BASE: &str = "https://generativelanguage.googleapis.com";
const GEMINI_API: &str = "gemini";
const GEMINI_BASE_ENV: &str = "DGIT_GEMINI_BASE";
const GEMINI_MODEL_ENV: &str = "DGIT_GEMINI_MODEL";
const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";
const GEMINI_DEFAULT_MODEL: &str = "gemini-2.0-flash";
const GEMINI_DOCS_URL: &str = "https://ai.google.dev/gemini-api/docs/api-key";

/// Natural-language explanation service.
#[async_trait::async_trait]
pub(crate) trait Explainer: Send + Sync {
    async fn explain(
        &self,
        question: &str,
        context: Option<&serde_json::Value>,
    ) -> Result<String, DgitError>;
}

pub(crate) fn build_prompt(question: &str, context: Option<&serde_json::Value>) -> String {
    let data = match context {
        Some(value) if !value.is_null() => value.to_string(),
        _ => "No data available.".to_string(),
    };
    format!(
        "You are a helpful assistant for gene-drug interactions.\n\
         Question: {}\n\
         Data: {data}\n\
         Answer concisely in plain language.",
        question.trim()
    )
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

pub struct GeminiClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
    model: Cow<'static, str>,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new() -> Result<Self, DgitError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: crate::sources::env_base(GEMINI_BASE, GEMINI_BASE_ENV),
            model: crate::sources::env_base(GEMINI_DEFAULT_MODEL, GEMINI_MODEL_ENV),
            api_key: std::env::var(GEMINI_KEY_ENV)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        })
    }

    #[cfg(test)]
    fn new_for_test(base: String, api_key: Option<&str>) -> Result<Self, DgitError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: Cow::Owned(base),
            model: Cow::Borrowed(GEMINI_DEFAULT_MODEL),
            api_key: api_key.map(str::to_string),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base.as_ref().trim_end_matches('/'),
            self.model.as_ref().trim()
        )
    }

    async fn generate(&self, api_key: &str, prompt: &str) -> Result<String, DgitError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };
        let resp = self
            .client
            .post(self.endpoint())
            .with_extension(Source(GEMINI_API))
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| DgitError::transport(GEMINI_API, err))?;
        let status = resp.status();
        let bytes = crate::sources::read_limited_body(resp, GEMINI_API).await?;
        if !status.is_success() {
            let excerpt = crate::sources::body_excerpt(&bytes);
            return Err(DgitError::Api {
                api: GEMINI_API.to_string(),
                message: format!("HTTP {status}: {excerpt}"),
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_slice(&bytes).map_err(|source| DgitError::ApiJson {
                api: GEMINI_API.to_string(),
                source,
            })?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        let text = text.trim();
        if text.is_empty() {
            return Err(DgitError::Api {
                api: GEMINI_API.to_string(),
                message: "Response contained no text".into(),
            });
        }
        Ok(text.to_string())
    }
}

#[async_trait::async_trait]
impl Explainer for GeminiClient {
    async fn explain(
        &self,
        question: &str,
        context: Option<&serde_json::Value>,
    ) -> Result<String, DgitError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(DgitError::ApiKeyRequired {
                api: GEMINI_API.to_string(),
                env_var: GEMINI_KEY_ENV.to_string(),
                docs_url: GEMINI_DOCS_URL.to_string(),
            });
        };
        self.generate(api_key, &build_prompt(question, context))
            .await
    }
}
