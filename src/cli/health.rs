use std::path::Path;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use futures::future::join_all;

use crate::error::DgitError;

#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthRow {
    pub api: String,
    pub status: String,
    pub latency: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthReport {
    pub healthy: usize,
    pub total: usize,
    pub rows: Vec<HealthRow>,
}

impl HealthReport {
    pub fn all_healthy(&self) -> bool {
        self.healthy == self.total
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# dgit Health Check\n\n");
        out.push_str("| API | Status | Latency |\n");
        out.push_str("|-----|--------|---------|\n");
        for row in &self.rows {
            out.push_str(&format!(
                "| {} | {} | {} |\n",
                row.api, row.status, row.latency
            ));
        }
        out.push_str(&format!(
            "\nStatus: {}/{} checks healthy\n",
            self.healthy, self.total
        ));
        out
    }
}

enum Probe {
    Get(String),
    Post(String, serde_json::Value),
}

fn probes() -> Vec<(&'static str, Probe)> {
    let ncbi = crate::sources::ncbi_gene::base_url();
    let uniprot = crate::sources::uniprot::base_url();
    vec![
        (
            "DGIdb",
            Probe::Post(
                crate::sources::dgidb::base_url(),
                serde_json::json!({"query": "{ __typename }"}),
            ),
        ),
        (
            "UniProt",
            Probe::Get(format!(
                "{}/uniprotkb/search?query=BDNF&size=1&format=json",
                uniprot.trim_end_matches('/')
            )),
        ),
        (
            "NCBI E-utilities",
            Probe::Get(format!(
                "{}/esearch.fcgi?db=gene&term=BDNF&retmode=json&retmax=1",
                ncbi.trim_end_matches('/')
            )),
        ),
    ]
}

async fn check_one(client: reqwest::Client, api: &str, probe: Probe) -> HealthRow {
    let start = Instant::now();
    let req = match probe {
        Probe::Get(url) => client.get(url),
        Probe::Post(url, body) => client.post(url).json(&body),
    };
    let resp = req
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await;

    match resp {
        Ok(resp) => {
            let status = resp.status();
            let elapsed = start.elapsed().as_millis();
            if status.is_success() {
                HealthRow {
                    api: api.to_string(),
                    status: "ok".into(),
                    latency: format!("{elapsed}ms"),
                }
            } else {
                HealthRow {
                    api: api.to_string(),
                    status: "error".into(),
                    latency: format!("{elapsed}ms (HTTP {})", status.as_u16()),
                }
            }
        }
        Err(err) => {
            let reason = if err.is_timeout() {
                "timeout"
            } else if err.is_connect() {
                "connect"
            } else {
                "error"
            };
            HealthRow {
                api: api.to_string(),
                status: "error".into(),
                latency: reason.into(),
            }
        }
    }
}

fn health_http_client() -> Result<reqwest::Client, DgitError> {
    static HEALTH_HTTP_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

    if let Some(client) = HEALTH_HTTP_CLIENT.get() {
        return Ok(client.clone());
    }

    let client = reqwest::Client::builder()
        // Bypasses the rate limiter; a health check is a single request per host.
        .timeout(Duration::from_secs(10))
        .connect_timeout(Duration::from_secs(5))
        .user_agent(concat!("dgit-cli/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(DgitError::HttpClientInit)?;

    match HEALTH_HTTP_CLIENT.set(client.clone()) {
        Ok(()) => Ok(client),
        Err(_) => HEALTH_HTTP_CLIENT
            .get()
            .cloned()
            .ok_or_else(|| DgitError::Api {
                api: "health".into(),
                message: "Health HTTP client initialization race".into(),
            }),
    }
}

async fn check_cache_dir(dir: &Path) -> HealthRow {
    let start = Instant::now();
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let probe = dir.join(format!(".dgit-healthcheck-{suffix}.tmp"));

    let result = async {
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(&probe, b"ok").await?;
        match tokio::fs::remove_file(&probe).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
    .await;

    match result {
        Ok(()) => HealthRow {
            api: format!("Cache dir ({})", dir.display()),
            status: "ok".into(),
            latency: format!("{}ms", start.elapsed().as_millis()),
        },
        Err(err) => HealthRow {
            api: format!("Cache dir ({})", dir.display()),
            status: "error".into(),
            latency: format!("{:?}", err.kind()),
        },
    }
}

/// Runs connectivity checks for the lookup upstreams and, unless
/// `cache_dir` is `None`, a write probe of the cache directory.
///
/// # Errors
///
/// Returns an error when the health HTTP client cannot be created.
pub async fn check(cache_dir: Option<&Path>) -> Result<HealthReport, DgitError> {
    let client = health_http_client()?;

    let mut rows = join_all(
        probes()
            .into_iter()
            .map(|(api, probe)| check_one(client.clone(), api, probe)),
    )
    .await;
    if let Some(dir) = cache_dir {
        rows.push(check_cache_dir(dir).await);
    }
    let healthy = rows.iter().filter(|r| r.status == "ok").count();
    Ok(HealthReport {
        healthy,
        total: rows.len(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn check_one_reports_status_and_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = health_http_client().unwrap();
        let ok = check_one(client.clone(), "Up", Probe::Get(format!("{}/ok", server.uri()))).await;
        assert_eq!(ok.status, "ok");

        let down = check_one(
            client,
            "Down",
            Probe::Post(format!("{}/graphql", server.uri()), serde_json::json!({})),
        )
        .await;
        assert_eq!(down.status, "error");
        assert!(down.latency.contains("HTTP 503"));
    }

    #[tokio::test]
    async fn cache_dir_probe_creates_directory_and_cleans_up() {
        let dir = std::env::temp_dir().join(format!(
            "dgit-health-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let row = check_cache_dir(&dir).await;
        assert_eq!(row.status, "ok");

        let mut entries = tokio::fs::read_dir(&dir).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[test]
    fn markdown_lists_every_row_and_totals() {
        let report = HealthReport {
            healthy: 1,
            total: 2,
            rows: vec![
                HealthRow {
                    api: "DGIdb".into(),
                    status: "ok".into(),
                    latency: "12ms".into(),
                },
                HealthRow {
                    api: "UniProt".into(),
                    status: "error".into(),
                    latency: "timeout".into(),
                },
            ],
        };
        let md = report.to_markdown();
        assert!(md.contains("| DGIdb | ok | 12ms |"));
        assert!(md.contains("| UniProt | error | timeout |"));
        assert!(md.contains("Status: 1/2 checks healthy"));
        assert!(!report.all_healthy());
    }
}
