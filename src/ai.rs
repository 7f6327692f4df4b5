//! AI-backed article search.
//!
//! [`AiSearcher`] asks a text-generation backend for article summaries about a
//! query and normalizes whatever JSON array it can find in the answer. The backend
//! sits behind [`TextGenerationBackend`] so the searcher never depends on a
//! particular provider's response shape.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::article::{article_id, format_timestamp, Article, ArticleType};
use crate::config::GeminiConfig;
use crate::error::GenerationError;

/// Number of summaries requested per query.
pub const AI_RESULT_COUNT: usize = 5;

const AI_SOURCE: &str = "Gemini AI";
const UNTITLED: &str = "Untitled";
const GENERATED_DESCRIPTION: &str = "Generated article";
const DEFAULT_AI_CATEGORY: &str = "news";

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    pub model: String,
    pub temperature: f32,
}

#[async_trait]
pub trait TextGenerationBackend: Send + Sync {
    /// Returns the generated text for `prompt`.
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError>;
}

/// Google Gemini `generateContent` REST client.
pub struct GeminiBackend {
    client: Client,
    api_key: String,
    base_url: String,
}

impl fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiBackend {
    pub fn new(
        api_key: String,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: RequestGenerationConfig,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct RequestGenerationConfig {
    temperature: f32,
}

/// The subset of a `generateContent` response needed to recover the text.
///
/// Text may come back at the top level or nested in the first candidate's parts.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    pub fn text(&self) -> Option<String> {
        if let Some(text) = self.text.as_ref().filter(|t| !t.trim().is_empty()) {
            return Some(text.clone());
        }

        let joined: String = self
            .candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();

        (!joined.trim().is_empty()).then_some(joined)
    }
}

#[async_trait]
impl TextGenerationBackend for GeminiBackend {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, options.model
        );
        let request = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: RequestGenerationConfig {
                temperature: options.temperature,
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        let parsed: GenerateContentResponse = serde_json::from_slice(&body)?;
        parsed.text().ok_or(GenerationError::EmptyResponse)
    }
}

pub struct AiSearcher {
    backend: Option<Arc<dyn TextGenerationBackend>>,
    models: Vec<String>,
    temperature: f32,
}

impl AiSearcher {
    pub fn new(
        backend: Arc<dyn TextGenerationBackend>,
        models: Vec<String>,
        temperature: f32,
    ) -> Self {
        Self {
            backend: Some(backend),
            models,
            temperature,
        }
    }

    /// A searcher without a backend. Every search returns nothing.
    pub fn disabled() -> Self {
        Self {
            backend: None,
            models: Vec::new(),
            temperature: 0.0,
        }
    }

    /// Builds a Gemini-backed searcher when `api_key` is present and non-empty.
    pub fn from_config(api_key: Option<String>, config: &GeminiConfig) -> anyhow::Result<Self> {
        match api_key.filter(|k| !k.trim().is_empty()) {
            Some(key) => {
                let backend = GeminiBackend::new(
                    key,
                    config.base_url.clone(),
                    Duration::from_secs(config.timeout_secs),
                )?;
                Ok(Self::new(
                    Arc::new(backend),
                    config.models.clone(),
                    config.temperature,
                ))
            }
            None => Ok(Self::disabled()),
        }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    /// Asks the backend for article summaries about `query`.
    ///
    /// Models are tried in order, moving on only while a model is reported as
    /// unavailable. Any other failure, or the first answer, ends the search.
    /// Never fails: every problem ends in an empty result.
    pub async fn search(&self, query: &str) -> Vec<Article> {
        let Some(backend) = &self.backend else {
            info!("AI backend not configured, skipping AI search for: {}", query);
            return Vec::new();
        };

        let now = Utc::now();
        let prompt = build_prompt(query, now);

        for model in &self.models {
            let options = GenerationOptions {
                model: model.clone(),
                temperature: self.temperature,
            };

            info!("Searching {} for: {}", model, query);
            match backend.generate(&prompt, &options).await {
                Ok(text) => {
                    debug!(
                        "{} raw (first 200 chars): {}...",
                        model,
                        text.trim().chars().take(200).collect::<String>()
                    );
                    let articles = parse_articles(&text, now);
                    info!("Parsed {} articles from {}", articles.len(), model);
                    return articles;
                }
                Err(e) if e.is_model_unavailable() => {
                    warn!("Model {} not available: {}", model, e)
                }
                Err(e) => {
                    error!("AI search with {} failed: {}", model, e);
                    return Vec::new();
                }
            }
        }

        warn!("No AI model available for: {}", query);
        Vec::new()
    }
}

pub fn build_prompt(query: &str, now: DateTime<Utc>) -> String {
    format!(
        r##"You are an expert news summarizer.
Generate {count} concise news article summaries about: "{query}".
Return ONLY a valid JSON array (no markdown, no prose) that matches exactly:
[
  {{
    "title": "Headline",
    "description": "2-3 sentence summary (100-220 chars)",
    "category": "news",
    "source": "{source}",
    "link": "#",
    "published": "{published}"
  }}
]
Ensure titles are unique and relevant; avoid placeholders."##,
        count = AI_RESULT_COUNT,
        query = query,
        source = AI_SOURCE,
        published = format_timestamp(now),
    )
}

/// The text between the first `[` and the last `]`, brackets included.
pub fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

/// Normalizes the JSON array embedded in `text` into articles.
///
/// Non-object elements are skipped; a missing or malformed array yields nothing.
pub fn parse_articles(text: &str, now: DateTime<Utc>) -> Vec<Article> {
    let Some(payload) = extract_json_array(text) else {
        warn!("Could not find JSON array in AI response");
        return Vec::new();
    };

    let values: Vec<Value> = match serde_json::from_str(payload) {
        Ok(values) => values,
        Err(e) => {
            warn!("JSON parse error: {}", e);
            return Vec::new();
        }
    };

    values
        .iter()
        .filter_map(Value::as_object)
        .map(|object| normalize(object, now))
        .collect()
}

fn normalize(object: &Map<String, Value>, now: DateTime<Utc>) -> Article {
    let title = string_field(object, "title").unwrap_or_else(|| UNTITLED.to_string());

    Article {
        id: article_id(&title),
        description: string_field(object, "description")
            .unwrap_or_else(|| GENERATED_DESCRIPTION.to_string()),
        link: string_field(object, "link").unwrap_or_else(|| "#".to_string()),
        source: string_field(object, "source").unwrap_or_else(|| AI_SOURCE.to_string()),
        published: string_field(object, "published").unwrap_or_else(|| format_timestamp(now)),
        category: string_field(object, "category")
            .unwrap_or_else(|| DEFAULT_AI_CATEGORY.to_string()),
        kind: ArticleType::AiGenerated,
        title,
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}
