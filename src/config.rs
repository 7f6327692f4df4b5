use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Category used when a request names an unknown one
    #[serde(default = "default_category")]
    pub default_category: String,
    /// Per-source fetch timeout in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    #[serde(default)]
    pub gemini: GeminiConfig,
    pub categories: Vec<CategoryConfig>,
}

fn default_bind_address() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_category() -> String {
    "news".to_string()
}

fn default_fetch_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeminiConfig {
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    /// Tried in order until one answers
    #[serde(default = "default_gemini_models")]
    pub models: Vec<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Per-call timeout in seconds
    #[serde(default = "default_gemini_timeout")]
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_gemini_base_url(),
            models: default_gemini_models(),
            temperature: default_temperature(),
            timeout_secs: default_gemini_timeout(),
        }
    }
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_gemini_models() -> Vec<String> {
    [
        "gemini-2.5-flash",
        "gemini-2.5-pro",
        "gemini-flash-latest",
        "gemini-pro-latest",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_temperature() -> f32 {
    0.4
}

fn default_gemini_timeout() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct CategoryConfig {
    pub name: String,
    pub sources: Vec<String>,
}

impl Default for Config {
    /// Built-in registry, used when no config file is present.
    fn default() -> Self {
        let category = |name: &str, sources: &[&str]| CategoryConfig {
            name: name.to_string(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
        };

        Self {
            bind_address: default_bind_address(),
            default_category: default_category(),
            fetch_timeout_secs: default_fetch_timeout(),
            gemini: GeminiConfig::default(),
            categories: vec![
                category(
                    "news",
                    &[
                        "https://feeds.bbc.co.uk/news/rss.xml",
                        "https://feeds.reuters.com/news/index.rss",
                    ],
                ),
                category(
                    "tech",
                    &[
                        "https://feeds.arstechnica.com/arstechnica/index",
                        "https://feeds.thehackernews.com/feed.xml",
                    ],
                ),
                category(
                    "business",
                    &["https://feeds.bloomberg.com/markets/news.rss"],
                ),
                category("science", &["https://feeds.nasa.gov/hqnews/feed.xml"]),
            ],
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Like [`Config::load`], but falls back to the built-in registry when the file does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.categories.is_empty() {
            anyhow::bail!("at least one category must be configured");
        }

        for (i, category) in self.categories.iter().enumerate() {
            if self.categories[..i].iter().any(|c| c.name == category.name) {
                anyhow::bail!("duplicate category '{}'", category.name);
            }
        }

        if !self
            .categories
            .iter()
            .any(|c| c.name == self.default_category)
        {
            anyhow::bail!(
                "default category '{}' is not a configured category",
                self.default_category
            );
        }

        Ok(())
    }
}
