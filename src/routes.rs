use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::aggregator::SearchOrchestrator;
use crate::ai::AiSearcher;
use crate::article::{format_timestamp, Article};
use crate::error::ApiError;
use crate::fetcher::Fetcher;

pub struct AppState {
    pub fetcher: Arc<Fetcher>,
    pub searcher: Arc<AiSearcher>,
    pub orchestrator: SearchOrchestrator,
}

impl AppState {
    pub fn new(fetcher: Arc<Fetcher>, searcher: Arc<AiSearcher>) -> Self {
        let orchestrator = SearchOrchestrator::new(fetcher.clone(), searcher.clone());
        Self {
            fetcher,
            searcher,
            orchestrator,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/categories", get(categories))
        .route("/api/aggregates", get(aggregates))
        .route("/api/search", get(search))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub gemini_available: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoriesResponse {
    pub success: bool,
    pub categories: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AggregatesResponse {
    pub success: bool,
    pub data: Vec<Article>,
    pub total: usize,
    pub category: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub success: bool,
    pub data: Vec<Article>,
    pub total: usize,
    pub query: String,
    pub gemini_used: bool,
}

#[derive(Debug, Deserialize)]
pub struct AggregatesQuery {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: Option<String>,
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: format_timestamp(Utc::now()),
        gemini_available: state.searcher.is_available(),
    })
}

pub async fn categories(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(CategoriesResponse {
        success: true,
        categories: state.fetcher.registry().names(),
    })
}

pub async fn aggregates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AggregatesQuery>,
) -> impl IntoResponse {
    let category = query
        .category
        .unwrap_or_else(|| state.fetcher.registry().default_category().name.clone());

    let data = state.fetcher.fetch(&category).await;

    Json(AggregatesResponse {
        success: true,
        total: data.len(),
        data,
        category,
    })
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let q = query
        .q
        .filter(|q| !q.is_empty())
        .ok_or(ApiError::MissingQuery)?;

    info!("Search request: {}", q);
    let outcome = state.orchestrator.resolve_search(&q).await;

    Ok(Json(SearchResponse {
        success: true,
        total: outcome.items.len(),
        data: outcome.items,
        query: q,
        gemini_used: outcome.ai_used,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::test_support::{models, StubBackend};
    use crate::fetcher::test_support::{registry, rss_feed};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const AI_ANSWER: &str = r#"[{"title": "Generated headline", "description": "Summary"}]"#;

    fn create_test_app(sources: Vec<String>, searcher: AiSearcher) -> Router {
        let registry = registry(&[("news", sources), ("tech", vec![])]);
        let fetcher = Fetcher::new(registry, Duration::from_secs(5)).unwrap();
        let state = Arc::new(AppState::new(Arc::new(fetcher), Arc::new(searcher)));
        router(state)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn feed_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(rss_feed(
                "Daily",
                &[
                    ("Markets rally", "Mon, 09 Dec 2024 12:00:00 GMT"),
                    ("Storm warning", "Mon, 09 Dec 2024 08:00:00 GMT"),
                ],
            )))
            .mount(&server)
            .await;
        server
    }

    mod health_tests {
        use super::*;

        #[tokio::test]
        async fn test_health_reports_ai_unavailable() {
            let app = create_test_app(vec![], AiSearcher::disabled());
            let (status, body) = get_json(app, "/api/health").await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["status"], "healthy");
            assert_eq!(body["gemini_available"], false);
            assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
        }

        #[tokio::test]
        async fn test_health_reports_ai_available() {
            let searcher = AiSearcher::new(Arc::new(StubBackend::default()), models(&["m"]), 0.4);
            let app = create_test_app(vec![], searcher);
            let (_, body) = get_json(app, "/api/health").await;

            assert_eq!(body["gemini_available"], true);
        }
    }

    #[tokio::test]
    async fn test_categories_in_registry_order() {
        let app = create_test_app(vec![], AiSearcher::disabled());
        let (status, body) = get_json(app, "/api/categories").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["categories"], serde_json::json!(["news", "tech"]));
    }

    mod aggregates_tests {
        use super::*;

        #[tokio::test]
        async fn test_aggregates_default_category() {
            let server = feed_server().await;
            let app = create_test_app(vec![server.uri()], AiSearcher::disabled());
            let (status, body) = get_json(app, "/api/aggregates").await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["success"], true);
            assert_eq!(body["category"], "news");
            assert_eq!(body["total"], 2);
            assert_eq!(body["data"][0]["title"], "Markets rally");
            assert_eq!(body["data"][0]["type"], "feed");
        }

        #[tokio::test]
        async fn test_aggregates_unknown_category_echoed() {
            let server = feed_server().await;
            let app = create_test_app(vec![server.uri()], AiSearcher::disabled());
            let (status, body) = get_json(app, "/api/aggregates?category=sports").await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["category"], "sports");
            assert_eq!(body["total"], 2);
            assert_eq!(body["data"][0]["category"], "news");
        }

        #[tokio::test]
        async fn test_aggregates_empty_category() {
            let server = feed_server().await;
            let app = create_test_app(vec![server.uri()], AiSearcher::disabled());
            let (_, body) = get_json(app, "/api/aggregates?category=tech").await;

            assert_eq!(body["total"], 0);
            assert_eq!(body["data"], serde_json::json!([]));
        }
    }

    mod search_tests {
        use super::*;

        #[tokio::test]
        async fn test_missing_query_rejected() {
            let app = create_test_app(vec![], AiSearcher::disabled());
            let (status, body) = get_json(app, "/api/search").await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["success"], false);
        }

        #[tokio::test]
        async fn test_empty_query_rejected_without_searching() {
            let backend = Arc::new(StubBackend::default().with_answer("m", AI_ANSWER));
            let searcher = AiSearcher::new(backend.clone(), models(&["m"]), 0.4);
            let app = create_test_app(vec![], searcher);

            let (status, _) = get_json(app, "/api/search?q=").await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(backend.calls.lock().unwrap().is_empty());
        }

        #[tokio::test]
        async fn test_whitespace_query_accepted() {
            let server = feed_server().await;
            let app = create_test_app(vec![server.uri()], AiSearcher::disabled());

            let (status, body) = get_json(app, "/api/search?q=%20").await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["success"], true);
            assert_eq!(body["query"], " ");
            assert_eq!(body["gemini_used"], false);
        }

        #[tokio::test]
        async fn test_search_uses_ai() {
            let backend = Arc::new(StubBackend::default().with_answer("m", AI_ANSWER));
            let searcher = AiSearcher::new(backend, models(&["m"]), 0.4);
            let app = create_test_app(vec![], searcher);

            let (status, body) = get_json(app, "/api/search?q=markets").await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["gemini_used"], true);
            assert_eq!(body["query"], "markets");
            assert_eq!(body["total"], 1);
            assert_eq!(body["data"][0]["type"], "ai_generated");
            assert_eq!(body["data"][0]["source"], "Gemini AI");
        }

        #[tokio::test]
        async fn test_search_falls_back_to_rss() {
            let server = feed_server().await;
            let app = create_test_app(vec![server.uri()], AiSearcher::disabled());

            let (status, body) = get_json(app, "/api/search?q=storm").await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["gemini_used"], false);
            assert_eq!(body["total"], 1);
            assert_eq!(body["data"][0]["title"], "Storm warning");
        }
    }

    mod query_tests {
        use super::*;

        #[test]
        fn test_search_query_absent() {
            let query: SearchQuery = serde_urlencoded::from_str("").unwrap();
            assert!(query.q.is_none());
        }

        #[test]
        fn test_aggregates_query() {
            let query: AggregatesQuery = serde_urlencoded::from_str("category=tech").unwrap();
            assert_eq!(query.category.as_deref(), Some("tech"));
        }
    }
}
