use std::sync::Arc;

use tracing::info;

use crate::ai::AiSearcher;
use crate::article::{sort_newest_first, Article};
use crate::fetcher::Fetcher;

/// Articles returned when RSS keyword matching finds nothing.
pub const RECENT_FALLBACK_LIMIT: usize = 10;

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub items: Vec<Article>,
    pub ai_used: bool,
}

/// Runs the search fallback chain: AI, then RSS keyword match, then most recent RSS.
pub struct SearchOrchestrator {
    fetcher: Arc<Fetcher>,
    searcher: Arc<AiSearcher>,
}

impl SearchOrchestrator {
    pub fn new(fetcher: Arc<Fetcher>, searcher: Arc<AiSearcher>) -> Self {
        Self { fetcher, searcher }
    }

    pub async fn resolve_search(&self, query: &str) -> SearchOutcome {
        let items = self.searcher.search(query).await;
        if !items.is_empty() {
            return SearchOutcome {
                items,
                ai_used: true,
            };
        }

        info!("AI returned no results, using RSS fallback for: {}", query);
        let all_items = self.fetcher.fetch_all().await;

        let matches = filter_by_keyword(&all_items, query);
        if !matches.is_empty() {
            info!("Found {} RSS matches for: {}", matches.len(), query);
            return SearchOutcome {
                items: matches,
                ai_used: false,
            };
        }

        info!("No RSS matches found, returning recent articles");
        SearchOutcome {
            items: most_recent(all_items, RECENT_FALLBACK_LIMIT),
            ai_used: false,
        }
    }
}

/// Articles whose title or description contains `query`, ignoring case.
pub fn filter_by_keyword(articles: &[Article], query: &str) -> Vec<Article> {
    let needle = query.to_lowercase();
    articles
        .iter()
        .filter(|a| {
            a.title.to_lowercase().contains(&needle)
                || a.description.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

pub fn most_recent(mut articles: Vec<Article>, limit: usize) -> Vec<Article> {
    sort_newest_first(&mut articles);
    articles.truncate(limit);
    articles
}
