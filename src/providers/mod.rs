//! External collaborators: repository search and resource metrics.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

pub mod github;
pub mod metrics;
pub mod mock_github;

pub use github::GithubClient;
pub use metrics::{spawn_sampler, RandomMetrics, ResourceSnapshot, UsageLevel};
pub use mock_github::MockRepositoryLookup;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream returned status {0}")]
    Upstream(u16),
    #[error("metrics unavailable: {0}")]
    Metrics(String),
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RepoSort {
    #[default]
    Stars,
    Forks,
    Updated,
}

impl RepoSort {
    pub fn as_str(self) -> &'static str {
        match self {
            RepoSort::Stars => "stars",
            RepoSort::Forks => "forks",
            RepoSort::Updated => "updated",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LibraryCategory {
    Frontend,
    Backend,
    Devtools,
    Testing,
}

pub const DEFAULT_LIMIT: u8 = 10;
pub const MAX_LIMIT: u8 = 100;

/// A repository search in GitHub's search syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoQuery {
    pub query: String,
    pub sort: RepoSort,
    pub limit: u8,
}

impl RepoQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            sort: RepoSort::Stars,
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_sort(mut self, sort: RepoSort) -> Self {
        self.sort = sort;
        self
    }

    /// Clamped to `1..=100`, the page size GitHub accepts.
    pub fn with_limit(mut self, limit: u8) -> Self {
        self.limit = limit.clamp(1, MAX_LIMIT);
        self
    }

    /// Well-starred repositories, optionally narrowed to one language.
    pub fn trending(language: Option<&str>, limit: u8) -> Self {
        let query = match language.map(str::trim).filter(|l| !l.is_empty()) {
            Some(lang) => format!("stars:>1000 language:{lang}"),
            None => "stars:>1000".to_string(),
        };
        Self::new(query).with_limit(limit)
    }

    pub fn popular_libraries(category: Option<LibraryCategory>, limit: u8) -> Self {
        let query = match category {
            Some(LibraryCategory::Frontend) => "topic:frontend stars:>5000",
            Some(LibraryCategory::Backend) => "topic:backend stars:>5000",
            Some(LibraryCategory::Devtools) => "topic:developer-tools stars:>5000",
            Some(LibraryCategory::Testing) => "topic:testing stars:>3000",
            None => "topic:javascript-library OR topic:development-tools stars:>10000",
        };
        Self::new(query).with_limit(limit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepoOwner {
    pub login: String,
    pub avatar_url: String,
}

/// One search hit, in GitHub's own field names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepoSummary {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub html_url: String,
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub language: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub owner: RepoOwner,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[async_trait]
pub trait RepositoryLookup: Send + Sync {
    async fn fetch_repositories(
        &self,
        query: &RepoQuery,
    ) -> Result<Vec<RepoSummary>, ProviderError>;
}

#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn sample(&self) -> Result<ResourceSnapshot, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trending_query_adds_language_qualifier() {
        assert_eq!(RepoQuery::trending(None, 10).query, "stars:>1000");
        assert_eq!(
            RepoQuery::trending(Some("rust"), 5).query,
            "stars:>1000 language:rust"
        );
        assert_eq!(RepoQuery::trending(Some("  "), 5).query, "stars:>1000");
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(RepoQuery::new("x").with_limit(0).limit, 1);
        assert_eq!(RepoQuery::new("x").with_limit(250).limit, MAX_LIMIT);
        assert_eq!(RepoQuery::new("x").limit, DEFAULT_LIMIT);
    }

    #[test]
    fn library_categories_map_to_topic_queries() {
        assert_eq!(
            RepoQuery::popular_libraries(Some(LibraryCategory::Testing), 10).query,
            "topic:testing stars:>3000"
        );
        assert!(RepoQuery::popular_libraries(None, 10)
            .query
            .contains("topic:development-tools"));
    }

    #[test]
    fn repo_summary_parses_github_payload() {
        let raw = r#"{
            "id": 1, "name": "tokio", "full_name": "tokio-rs/tokio",
            "description": null, "html_url": "https://github.com/tokio-rs/tokio",
            "stargazers_count": 25000, "forks_count": 2300, "language": "Rust",
            "owner": {"login": "tokio-rs", "avatar_url": "https://a.example/1"},
            "created_at": "2016-09-09T18:31:04Z", "updated_at": "2025-04-01T00:00:00Z",
            "watchers": 25000
        }"#;
        let repo: RepoSummary = serde_json::from_str(raw).unwrap();
        assert_eq!(repo.full_name, "tokio-rs/tokio");
        assert!(repo.topics.is_empty());
        assert_eq!(repo.description, None);
    }
}
