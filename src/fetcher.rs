use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use feed_rs::model::Entry;
use feed_rs::parser;
use futures::future::join_all;
use reqwest::Client;
use tracing::{debug, error, info};

use crate::article::{
    article_id, format_timestamp, sort_newest_first, truncate_chars, Article, ArticleType,
};
use crate::registry::{Category, CategoryRegistry};

/// Entries taken from each source, in feed order.
pub const MAX_ENTRIES_PER_SOURCE: usize = 8;
pub const MAX_DESCRIPTION_CHARS: usize = 300;

const NO_TITLE: &str = "No title";
const NO_DESCRIPTION: &str = "No description";
const NO_LINK: &str = "#";
const UNKNOWN_SOURCE: &str = "Unknown Source";

pub struct Fetcher {
    client: Client,
    registry: Arc<CategoryRegistry>,
}

impl Fetcher {
    pub fn new(registry: Arc<CategoryRegistry>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("NewsAggregator/1.0 (RSS Aggregator)")
            .build()?;

        Ok(Self { client, registry })
    }

    pub fn registry(&self) -> &CategoryRegistry {
        &self.registry
    }

    /// Fetches every source of `category` (or of the default category when it is
    /// unknown) and returns the merged articles, newest first.
    ///
    /// Never fails: sources that cannot be fetched or parsed are logged and skipped.
    pub async fn fetch(&self, category: &str) -> Vec<Article> {
        let category = self.registry.resolve(category);
        self.fetch_category(category).await
    }

    /// Fetches all registered categories, concatenated in registry order.
    pub async fn fetch_all(&self) -> Vec<Article> {
        let per_category = join_all(self.registry.iter().map(|c| self.fetch_category(c))).await;
        per_category.into_iter().flatten().collect()
    }

    async fn fetch_category(&self, category: &Category) -> Vec<Article> {
        info!(
            "Fetching {} sources for category '{}'",
            category.sources.len(),
            category.name
        );

        let results = join_all(
            category
                .sources
                .iter()
                .map(|url| self.fetch_source(url, &category.name)),
        )
        .await;

        let mut articles = Vec::new();
        for (url, result) in category.sources.iter().zip(results) {
            match result {
                Ok(mut items) => {
                    debug!("Got {} items from {}", items.len(), url);
                    articles.append(&mut items);
                }
                Err(e) => error!("Error fetching {}: {}", url, e),
            }
        }

        sort_newest_first(&mut articles);
        articles
    }

    async fn fetch_source(&self, url: &str, category: &str) -> anyhow::Result<Vec<Article>> {
        info!("Fetching: {}", url);

        let response = self.client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;

        Self::parse_feed(&bytes, url, category, Utc::now())
    }

    /// Parses an RSS/Atom document into at most [`MAX_ENTRIES_PER_SOURCE`] articles.
    ///
    /// `now` stands in for entries without any date.
    pub fn parse_feed(
        bytes: &[u8],
        source_url: &str,
        category: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Article>> {
        let feed = parser::parse(bytes)?;

        let source = feed
            .title
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNKNOWN_SOURCE.to_string());

        Ok(feed
            .entries
            .into_iter()
            .take(MAX_ENTRIES_PER_SOURCE)
            .map(|entry| Self::entry_to_article(entry, &source, source_url, category, now))
            .collect())
    }

    pub fn entry_to_article(
        entry: Entry,
        source: &str,
        source_url: &str,
        category: &str,
        now: DateTime<Utc>,
    ) -> Article {
        let raw_title = entry
            .title
            .map(|t| t.content.trim().to_string())
            .unwrap_or_default();

        let description = entry
            .summary
            .map(|s| s.content)
            .filter(|s| !s.trim().is_empty())
            .or_else(|| entry.content.and_then(|c| c.body))
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| NO_DESCRIPTION.to_string());

        let link = entry
            .links
            .first()
            .map(|l| l.href.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| NO_LINK.to_string());

        let published = entry.published.or(entry.updated).unwrap_or(now);

        Article {
            id: article_id(&format!("{}{}", raw_title, source_url)),
            title: if raw_title.is_empty() {
                NO_TITLE.to_string()
            } else {
                raw_title
            },
            description: truncate_chars(&description, MAX_DESCRIPTION_CHARS),
            link,
            source: source.to_string(),
            published: format_timestamp(published),
            category: category.to_string(),
            kind: ArticleType::Feed,
        }
    }
}
