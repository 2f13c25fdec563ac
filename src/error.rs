#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum DgitError {
    #[error("Invalid type: '{0}'. Expected one of: gene, protein, drug")]
    InvalidEntityType(String),

    #[error("HTTP client initialization failed: {0}")]
    HttpClientInit(reqwest::Error),

    #[error("{api} request failed: {message}")]
    Transport { api: String, message: String },

    #[error("API error from {api}: {message}")]
    Api { api: String, message: String },

    #[error("{api} reported an error: {message}")]
    Upstream { api: String, message: String },

    #[error("API JSON error from {api}: {source}")]
    ApiJson {
        api: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(
        "API key required: {api} requires {env_var} environment variable.\n\nTo set:\n  export {env_var}=your-key\n\nMore info: {docs_url}"
    )]
    ApiKeyRequired {
        api: String,
        env_var: String,
        docs_url: String,
    },

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification used by callers that only care about the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidEntityType,
    TransportFailure,
    UpstreamApplicationError,
    MalformedUpstreamPayload,
    Other,
}

impl DgitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidEntityType(_) => ErrorKind::InvalidEntityType,
            Self::Transport { .. } => ErrorKind::TransportFailure,
            Self::Api { .. } | Self::Upstream { .. } => ErrorKind::UpstreamApplicationError,
            Self::ApiJson { .. } => ErrorKind::MalformedUpstreamPayload,
            _ => ErrorKind::Other,
        }
    }

    /// Converts a send-side failure into a `Transport` error tagged with the upstream name.
    pub(crate) fn transport(api: &str, err: impl std::fmt::Display) -> Self {
        Self::Transport {
            api: api.to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DgitError, ErrorKind};

    #[test]
    fn invalid_entity_type_display_lists_choices() {
        let err = DgitError::InvalidEntityType("variant".to_string());
        let msg = err.to_string();
        assert!(msg.contains("Invalid type"));
        assert!(msg.contains("'variant'"));
        assert!(msg.contains("gene, protein, drug"));
        assert_eq!(err.kind(), ErrorKind::InvalidEntityType);
    }

    #[test]
    fn api_key_required_display_includes_env_var_and_docs() {
        let err = DgitError::ApiKeyRequired {
            api: "gemini".to_string(),
            env_var: "GEMINI_API_KEY".to_string(),
            docs_url: "https://ai.google.dev/gemini-api/docs/api-key".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("GEMINI_API_KEY"));
        assert!(msg.contains("https://ai.google.dev/gemini-api/docs/api-key"));
    }

    #[test]
    fn transport_errors_classify_as_transport_failure() {
        let err = DgitError::transport("dgidb", "connection refused");
        assert!(matches!(err, DgitError::Transport { .. }));
        assert_eq!(err.kind(), ErrorKind::TransportFailure);
        assert!(err.to_string().contains("dgidb request failed: connection refused"));
    }

    #[test]
    fn upstream_and_status_errors_classify_as_application_errors() {
        let upstream = DgitError::Upstream {
            api: "dgidb".to_string(),
            message: "Field 'genes' doesn't exist".to_string(),
        };
        assert_eq!(upstream.kind(), ErrorKind::UpstreamApplicationError);
        assert!(upstream.to_string().contains("Field 'genes'"));

        let status = DgitError::Api {
            api: "uniprot".to_string(),
            message: "HTTP 400 Bad Request".to_string(),
        };
        assert_eq!(status.kind(), ErrorKind::UpstreamApplicationError);
        assert!(status.to_string().contains("uniprot"));
    }

    #[test]
    fn undecodable_body_classifies_as_malformed_payload() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = DgitError::ApiJson {
            api: "uniprot".to_string(),
            source,
        };
        assert_eq!(err.kind(), ErrorKind::MalformedUpstreamPayload);
    }
}
