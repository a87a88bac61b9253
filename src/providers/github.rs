use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{ProviderError, RepoQuery, RepoSummary, RepositoryLookup};
use crate::config::GithubConfig;

const USER_AGENT: &str = concat!("softverse/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<RepoSummary>,
}

/// Repository search against the GitHub REST API.
#[derive(Clone)]
pub struct GithubClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl RepositoryLookup for GithubClient {
    #[instrument(skip(self), fields(q = %query.query))]
    async fn fetch_repositories(
        &self,
        query: &RepoQuery,
    ) -> Result<Vec<RepoSummary>, ProviderError> {
        let per_page = query.limit.to_string();
        let mut req = self
            .client
            .get(format!("{}/search/repositories", self.base_url))
            .query(&[
                ("q", query.query.as_str()),
                ("sort", query.sort.as_str()),
                ("order", "desc"),
                ("per_page", per_page.as_str()),
            ])
            .header(ACCEPT, "application/vnd.github.v3+json");
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%status, "github search failed");
            return Err(ProviderError::Upstream(status.as_u16()));
        }

        let body: SearchResponse = response.json().await?;
        debug!(count = body.items.len(), "github search ok");
        Ok(body.items)
    }
}
