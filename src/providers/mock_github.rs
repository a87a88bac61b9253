use async_trait::async_trait;
use time::macros::datetime;
use time::OffsetDateTime;

use super::{ProviderError, RepoOwner, RepoQuery, RepoSort, RepoSummary, RepositoryLookup};

/// Offline repository search over a fixed catalogue.
///
/// Understands the subset of GitHub's qualifier syntax that the built-in queries use:
/// `stars:>N`, `language:X` and `topic:X` (topics match if any listed one matches).
/// Remaining words must all appear in the name, description or topics.
#[derive(Debug, Clone)]
pub struct MockRepositoryLookup {
    repos: Vec<RepoSummary>,
}

impl Default for MockRepositoryLookup {
    fn default() -> Self {
        Self::new(catalogue())
    }
}

impl MockRepositoryLookup {
    pub fn new(repos: Vec<RepoSummary>) -> Self {
        Self { repos }
    }
}

#[derive(Debug, Default)]
struct Filter {
    min_stars: Option<u64>,
    language: Option<String>,
    topics: Vec<String>,
    words: Vec<String>,
}

impl Filter {
    fn parse(query: &str) -> Self {
        let mut f = Filter::default();
        for token in query.split_whitespace() {
            let token = token.to_lowercase();
            if token == "or" {
                continue;
            }
            if let Some(n) = token.strip_prefix("stars:>") {
                f.min_stars = n.parse().ok();
            } else if let Some(lang) = token.strip_prefix("language:") {
                f.language = Some(lang.to_string());
            } else if let Some(topic) = token.strip_prefix("topic:") {
                f.topics.push(topic.to_string());
            } else {
                f.words.push(token);
            }
        }
        f
    }

    fn matches(&self, repo: &RepoSummary) -> bool {
        if self.min_stars.is_some_and(|min| repo.stargazers_count <= min) {
            return false;
        }
        if let Some(lang) = &self.language {
            if !repo
                .language
                .as_deref()
                .is_some_and(|l| l.eq_ignore_ascii_case(lang))
            {
                return false;
            }
        }
        if !self.topics.is_empty()
            && !repo
                .topics
                .iter()
                .any(|t| self.topics.iter().any(|want| t.eq_ignore_ascii_case(want)))
        {
            return false;
        }
        self.words.iter().all(|w| {
            repo.name.to_lowercase().contains(w)
                || repo
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(w))
                || repo.topics.iter().any(|t| t.to_lowercase().contains(w))
        })
    }
}

#[async_trait]
impl RepositoryLookup for MockRepositoryLookup {
    async fn fetch_repositories(
        &self,
        query: &RepoQuery,
    ) -> Result<Vec<RepoSummary>, ProviderError> {
        let filter = Filter::parse(&query.query);
        let mut hits: Vec<RepoSummary> = self
            .repos
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        match query.sort {
            RepoSort::Stars => hits.sort_by(|a, b| b.stargazers_count.cmp(&a.stargazers_count)),
            RepoSort::Forks => hits.sort_by(|a, b| b.forks_count.cmp(&a.forks_count)),
            RepoSort::Updated => hits.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
        }
        hits.truncate(usize::from(query.limit));
        Ok(hits)
    }
}

#[allow(clippy::too_many_arguments)]
fn repo(
    id: u64,
    owner: &str,
    name: &str,
    description: &str,
    language: &str,
    stars: u64,
    forks: u64,
    topics: &[&str],
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
) -> RepoSummary {
    RepoSummary {
        id,
        name: name.to_string(),
        full_name: format!("{owner}/{name}"),
        description: Some(description.to_string()),
        html_url: format!("https://github.com/{owner}/{name}"),
        stargazers_count: stars,
        forks_count: forks,
        language: Some(language.to_string()),
        topics: topics.iter().map(|t| t.to_string()).collect(),
        owner: RepoOwner {
            login: owner.to_string(),
            avatar_url: format!("https://github.com/{owner}.png"),
        },
        created_at,
        updated_at,
    }
}

#[rustfmt::skip]
fn catalogue() -> Vec<RepoSummary> {
    vec![
        repo(
            1, "facebook", "react",
            "The library for web and native user interfaces.",
            "JavaScript", 232_000, 47_500,
            &["frontend", "javascript-library", "ui"],
            datetime!(2013-05-24 16:15:54 UTC), datetime!(2025-04-10 08:00:00 UTC),
        ),
        repo(
            2, "vuejs", "core",
            "Progressive, incrementally-adoptable JavaScript framework for building UI on the web.",
            "TypeScript", 49_000, 8_500,
            &["frontend", "framework"],
            datetime!(2018-06-12 13:49:36 UTC), datetime!(2025-04-09 21:10:00 UTC),
        ),
        repo(
            3, "tokio-rs", "tokio",
            "A runtime for writing reliable asynchronous applications with Rust.",
            "Rust", 28_500, 2_600,
            &["backend", "async", "networking"],
            datetime!(2016-09-09 18:31:04 UTC), datetime!(2025-04-08 15:45:00 UTC),
        ),
        repo(
            4, "expressjs", "express",
            "Fast, unopinionated, minimalist web framework for node.",
            "JavaScript", 66_500, 17_000,
            &["backend", "server", "nodejs"],
            datetime!(2009-06-26 18:56:01 UTC), datetime!(2025-03-30 10:00:00 UTC),
        ),
        repo(
            5, "microsoft", "vscode",
            "Visual Studio Code",
            "TypeScript", 172_000, 31_000,
            &["developer-tools", "editor", "development-tools"],
            datetime!(2015-09-03 20:23:38 UTC), datetime!(2025-04-10 12:30:00 UTC),
        ),
        repo(
            6, "jestjs", "jest",
            "Delightful JavaScript Testing.",
            "TypeScript", 44_600, 6_500,
            &["testing", "javascript-library"],
            datetime!(2013-12-10 00:18:04 UTC), datetime!(2025-03-21 09:00:00 UTC),
        ),
        repo(
            7, "BurntSushi", "ripgrep",
            "ripgrep recursively searches directories for a regex pattern.",
            "Rust", 52_000, 2_100,
            &["cli", "search", "developer-tools"],
            datetime!(2016-03-11 02:02:33 UTC), datetime!(2025-04-02 17:20:00 UTC),
        ),
        repo(
            8, "demo_user", "node-api-toolkit",
            "Toolkit for building Node.js APIs quickly",
            "TypeScript", 45, 8,
            &["backend"],
            datetime!(2024-02-05 14:30:00 UTC), datetime!(2025-04-08 11:45:00 UTC),
        ),
    ]
}
