//! GitHub client
//!
//! Lists releases through the REST API and downloads raw files and release
//! assets. Also provides the tag-list strategy for released versions.

use async_trait::async_trait;
use chart_mirror_core::{DestinationSpec, Settings, parse_tag};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap};
use semver::Version;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::backend::{ManifestFetcher, ReleasedVersions, UpstreamRelease, UpstreamReleases};
use crate::error::{RepoError, Result};

const USER_AGENT: &str = concat!("chart-mirror/", env!("CARGO_PKG_VERSION"));
const PER_PAGE: usize = 100;

/// GitHub REST and download client
pub struct GitHubClient {
    client: reqwest::Client,
    api_url: String,
    settings: Settings,
    token: Option<String>,
}

impl GitHubClient {
    /// Create a client; the token is only sent to the API
    pub fn new(settings: &Settings, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| RepoError::NetworkError {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            settings: settings.clone(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// Whether API requests are authenticated
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// URL of the destination's published `index.yaml`
    pub fn index_url(&self, destination: &DestinationSpec) -> String {
        self.settings.raw_file_url(
            &format!("{}/{}", destination.owner, destination.repo),
            &destination.index_branch,
            "index.yaml",
        )
    }

    /// Download a file
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.get(url, false).await?;
        let bytes = response.bytes().await.map_err(|e| RepoError::NetworkError {
            message: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.get(url, true).await?;
        let bytes = response.bytes().await.map_err(|e| RepoError::NetworkError {
            message: e.to_string(),
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get(&self, url: &str, api: bool) -> Result<reqwest::Response> {
        let mut request = self.client.get(url);
        if api {
            request = request
                .header(ACCEPT, "application/vnd.github+json")
                .header("X-GitHub-Api-Version", "2022-11-28");
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }
        }

        let response = request.send().await?;
        check_status(url, response)
    }

    fn repo_url(&self, owner: &str, repo: &str, rest: &str) -> String {
        format!("{}/repos/{}/{}/{}", self.api_url, owner, repo, rest)
    }
}

fn check_status(url: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let err = match status {
        StatusCode::NOT_FOUND => RepoError::NotFound {
            url: url.to_string(),
        },
        StatusCode::UNAUTHORIZED => RepoError::AuthRequired {
            url: url.to_string(),
        },
        StatusCode::TOO_MANY_REQUESTS => RepoError::RateLimited {
            retry_after: retry_after(response.headers()),
        },
        StatusCode::FORBIDDEN if rate_limit_exhausted(response.headers()) => {
            RepoError::RateLimited {
                retry_after: retry_after(response.headers()),
            }
        }
        StatusCode::FORBIDDEN => RepoError::AuthFailed {
            message: format!("Access denied to {}", url),
        },
        _ => RepoError::HttpError {
            status: status.as_u16(),
            message: format!("Request to {} failed", url),
        },
    };
    Err(err)
}

fn rate_limit_exhausted(headers: &HeaderMap) -> bool {
    headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "0")
}

fn retry_after(headers: &HeaderMap) -> u64 {
    headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(60)
}

#[async_trait]
impl UpstreamReleases for GitHubClient {
    async fn list_releases(
        &self,
        owner: &str,
        repo: &str,
        lookback: Option<usize>,
    ) -> Result<Vec<UpstreamRelease>> {
        let base = self.repo_url(owner, repo, "releases");
        let mut releases = Vec::new();
        let mut page = 1usize;

        loop {
            let url = Url::parse_with_params(
                &base,
                &[
                    ("per_page", PER_PAGE.to_string()),
                    ("page", page.to_string()),
                ],
            )?;
            let batch: Vec<UpstreamRelease> = self.get_json(url.as_str()).await?;
            let fetched = batch.len();
            releases.extend(batch.into_iter().filter(|r| !r.draft));

            if let Some(limit) = lookback {
                if releases.len() >= limit {
                    releases.truncate(limit);
                    break;
                }
            }
            if fetched < PER_PAGE {
                break;
            }
            page += 1;
        }

        debug!(owner, repo, pages = page, count = releases.len(), "listed releases");
        Ok(releases)
    }

    async fn release_by_tag(&self, owner: &str, repo: &str, tag: &str) -> Result<UpstreamRelease> {
        let url = self.repo_url(owner, repo, &format!("releases/tags/{}", tag));
        self.get_json(&url).await.map_err(|e| match e {
            RepoError::NotFound { .. } => RepoError::ReleaseNotFound {
                repo: format!("{}/{}", owner, repo),
                tag: tag.to_string(),
            },
            other => other,
        })
    }

    async fn latest_release(&self, owner: &str, repo: &str) -> Result<UpstreamRelease> {
        let url = self.repo_url(owner, repo, "releases/latest");
        self.get_json(&url).await.map_err(|e| match e {
            RepoError::NotFound { .. } => RepoError::ReleaseNotFound {
                repo: format!("{}/{}", owner, repo),
                tag: "latest".to_string(),
            },
            other => other,
        })
    }
}

#[async_trait]
impl ManifestFetcher for GitHubClient {
    async fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>> {
        match self.get_bytes(url).await {
            Ok(data) => Ok(Some(data)),
            Err(RepoError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Released versions derived from the destination's `<name>-<version>` tags
#[derive(Debug, Clone, Default)]
pub struct TaggedReleases {
    tags: Vec<String>,
}

impl TaggedReleases {
    pub fn new(tags: Vec<String>) -> Self {
        Self { tags }
    }

    /// Snapshot every release tag of the destination repository
    pub async fn load(
        releases: &dyn UpstreamReleases,
        destination: &DestinationSpec,
    ) -> Result<Self> {
        let listed = releases
            .list_releases(&destination.owner, &destination.repo, None)
            .await?;
        Ok(Self::new(listed.into_iter().map(|r| r.tag_name).collect()))
    }
}

impl ReleasedVersions for TaggedReleases {
    fn released(&self, chart: &str) -> Vec<Version> {
        self.tags
            .iter()
            .filter_map(|tag| tag.strip_prefix(chart)?.strip_prefix('-'))
            .filter_map(|version| match parse_tag(version) {
                Ok(v) => Some(v),
                Err(_) => {
                    // `gardener-dashboard-1.0.0` seen while asking for `gardener`
                    debug!(chart, version, "ignoring tag that is not <chart>-<semver>");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, token: Option<&str>) -> GitHubClient {
        let settings = Settings {
            api_url: server.uri(),
            raw_url: server.uri(),
            web_url: server.uri(),
            ..Settings::default()
        };
        GitHubClient::new(&settings, token.map(str::to_string)).unwrap()
    }

    fn releases(range: std::ops::Range<usize>) -> serde_json::Value {
        range
            .map(|i| json!({ "tag_name": format!("v1.{}.0", i), "body": format!("notes {}", i) }))
            .collect()
    }

    #[tokio::test]
    async fn test_list_releases_paginates_until_short_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/gardener/gardener/releases"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(releases(0..100)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/gardener/gardener/releases"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(releases(100..103)))
            .mount(&server)
            .await;

        let listed = client(&server, None)
            .list_releases("gardener", "gardener", None)
            .await
            .unwrap();

        assert_eq!(listed.len(), 103);
        assert_eq!(listed[0].tag_name, "v1.0.0");
        assert_eq!(listed[102].tag_name, "v1.102.0");
        assert_eq!(listed[5].body.as_deref(), Some("notes 5"));
    }

    #[tokio::test]
    async fn test_list_releases_respects_lookback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/gardener/gardener/releases"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(releases(0..100)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/gardener/gardener/releases"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(releases(100..200)))
            .expect(0)
            .mount(&server)
            .await;

        let listed = client(&server, None)
            .list_releases("gardener", "gardener", Some(20))
            .await
            .unwrap();

        assert_eq!(listed.len(), 20);
        assert_eq!(listed[19].tag_name, "v1.19.0");
    }

    #[tokio::test]
    async fn test_list_releases_skips_drafts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/releases"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "tag_name": "v1.1.0", "draft": true },
                { "tag_name": "v1.0.0", "prerelease": true },
            ])))
            .mount(&server)
            .await;

        let listed = client(&server, None).list_releases("o", "r", None).await.unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].tag_name, "v1.0.0");
        assert!(listed[0].prerelease);
    }

    #[tokio::test]
    async fn test_empty_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/releases"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let listed = client(&server, None).list_releases("o", "r", None).await.unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_token_sent_to_api() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/releases/latest"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tag_name": "v2.0.0" })))
            .mount(&server)
            .await;

        let gh = client(&server, Some("secret"));
        assert!(gh.has_token());
        let latest = gh.latest_release("o", "r").await.unwrap();
        assert_eq!(latest.tag_name, "v2.0.0");
    }

    #[tokio::test]
    async fn test_release_by_tag_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/releases/tags/v9.9.9"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server, None)
            .release_by_tag("o", "r", "v9.9.9")
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::ReleaseNotFound { ref tag, .. } if tag == "v9.9.9"));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_rate_limit_detected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/releases"))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("x-ratelimit-remaining", "0")
                    .insert_header("retry-after", "120"),
            )
            .mount(&server)
            .await;

        let err = client(&server, None)
            .list_releases("o", "r", None)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::RateLimited { retry_after: 120 }));
    }

    #[tokio::test]
    async fn test_fetch_missing_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/o/r/v1.0.0/examples/controller-registration.yaml"))
            .respond_with(ResponseTemplate::new(200).set_body_string("kind: ControllerRegistration\n"))
            .mount(&server)
            .await;

        let gh = client(&server, None);
        let found = gh
            .fetch(&gh.settings.raw_file_url("o/r", "v1.0.0", "examples/controller-registration.yaml"))
            .await
            .unwrap();
        assert_eq!(found.unwrap(), b"kind: ControllerRegistration\n");

        let missing = gh
            .fetch(&gh.settings.raw_file_url("o/r", "v1.0.0", "example/controller-registration.yaml"))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_fetch_server_error_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let gh = client(&server, None);
        let err = gh.fetch(&format!("{}/anything", server.uri())).await.unwrap_err();
        assert!(matches!(err, RepoError::HttpError { status: 500, .. }));
    }

    #[test]
    fn test_urls() {
        let gh = GitHubClient::new(&Settings::default(), None).unwrap();

        let destination = DestinationSpec {
            owner: "gardener-community".to_string(),
            repo: "gardener-charts".to_string(),
            index_branch: "gh-pages".to_string(),
        };
        assert_eq!(
            gh.index_url(&destination),
            "https://raw.githubusercontent.com/gardener-community/gardener-charts/gh-pages/index.yaml"
        );
    }

    #[test]
    fn test_tagged_releases() {
        let tagged = TaggedReleases::new(vec![
            "gardener-1.70.0".to_string(),
            "gardener-1.71.0-rc.1".to_string(),
            "gardener-dashboard-1.65.0".to_string(),
            "gardener-latest".to_string(),
            "dashboard-1.65.0".to_string(),
        ]);

        let mut gardener = tagged.released("gardener");
        gardener.sort();
        assert_eq!(
            gardener,
            vec![
                Version::parse("1.70.0").unwrap(),
                Version::parse("1.71.0-rc.1").unwrap()
            ]
        );

        assert_eq!(
            tagged.released("gardener-dashboard"),
            vec![Version::parse("1.65.0").unwrap()]
        );
        assert!(tagged.released("unknown").is_empty());
    }

    #[tokio::test]
    async fn test_tagged_releases_load() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/gardener-community/gardener-charts/releases"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "tag_name": "dashboard-1.65.0" },
                { "tag_name": "dashboard-1.64.0" },
            ])))
            .mount(&server)
            .await;

        let destination = DestinationSpec {
            owner: "gardener-community".to_string(),
            repo: "gardener-charts".to_string(),
            index_branch: "gh-pages".to_string(),
        };
        let gh = client(&server, None);
        let tagged = TaggedReleases::load(&gh, &destination).await.unwrap();
        assert_eq!(tagged.released("dashboard").len(), 2);
    }
}
