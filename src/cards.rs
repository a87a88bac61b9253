//! Display-ready view models shared by the dashboard's card grids.

use serde::Serialize;
use time::OffsetDateTime;

use crate::accounts::Project;
use crate::providers::{RepoSummary, ResourceSnapshot, UsageLevel};
use crate::snippets::Snippet;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RepositoryCard {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub url: String,
    pub stars: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProjectCard {
    pub title: String,
    pub description: String,
    pub language: String,
    pub stars: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GaugeCard {
    pub title: &'static str,
    pub value: u8,
    pub level: UsageLevel,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Card {
    Repository(RepositoryCard),
    Snippet(Snippet),
    Project(ProjectCard),
    Gauge(GaugeCard),
}

impl From<&RepoSummary> for Card {
    fn from(repo: &RepoSummary) -> Self {
        let language = repo.language.clone().unwrap_or_default();
        let description = match repo.description.as_deref().map(str::trim) {
            Some(d) if !d.is_empty() => d.to_string(),
            _ if language.is_empty() => "A popular repository".to_string(),
            _ => format!("A popular {language} repository"),
        };
        let mut tags: Vec<String> = repo.topics.iter().take(3).cloned().collect();
        if tags.is_empty() {
            tags.push(if language.is_empty() {
                "Repository".to_string()
            } else {
                language
            });
        }
        Card::Repository(RepositoryCard {
            title: repo.name.clone(),
            description,
            tags,
            url: repo.html_url.clone(),
            stars: repo.stargazers_count,
        })
    }
}

impl From<&Snippet> for Card {
    fn from(s: &Snippet) -> Self {
        Card::Snippet(s.clone())
    }
}

impl From<&Project> for Card {
    fn from(p: &Project) -> Self {
        Card::Project(ProjectCard {
            title: p.name.clone(),
            description: p.description.clone(),
            language: p.language.clone(),
            stars: p.stars,
            updated_at: p.updated_at,
        })
    }
}

/// One gauge per reading, in display order.
pub fn gauges(snapshot: &ResourceSnapshot) -> Vec<Card> {
    snapshot
        .readings()
        .into_iter()
        .map(|(title, value)| {
            Card::Gauge(GaugeCard {
                title,
                value,
                level: UsageLevel::from_percent(value),
            })
        })
        .collect()
}
