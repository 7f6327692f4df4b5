use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Upper bound (exclusive) for article ids: the positive range of a 31-bit signed integer.
const ID_MODULUS: u64 = (1 << 31) - 1;

/// Where an article came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleType {
    Feed,
    AiGenerated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub link: String,
    pub source: String,
    pub published: String,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: ArticleType,
}

impl Article {
    /// Sort key for `published`. Values that are neither RFC 3339 nor RFC 2822
    /// sort as the Unix epoch.
    pub fn published_at(&self) -> DateTime<Utc> {
        parse_published(&self.published)
    }
}

/// Stable fingerprint of `input`, reduced into `[0, 2^31 - 1)`.
///
/// Not unique: two different inputs may share an id. Callers treat it as a
/// dedup hint only.
pub fn article_id(input: &str) -> i64 {
    let digest = Sha256::digest(input.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(prefix) % ID_MODULUS) as i64
}

/// Keeps at most `max_chars` characters. Not word-aware.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_published(value: &str) -> DateTime<Utc> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_rfc2822(value))
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Sorts newest first. Stable, so equal timestamps keep their input order.
pub fn sort_newest_first(articles: &mut [Article]) {
    articles.sort_by_key(|a| std::cmp::Reverse(a.published_at()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn article(title: &str, published: &str) -> Article {
        Article {
            id: article_id(title),
            title: title.to_string(),
            description: String::new(),
            link: "#".to_string(),
            source: "Test".to_string(),
            published: published.to_string(),
            category: "news".to_string(),
            kind: ArticleType::Feed,
        }
    }

    mod article_id_tests {
        use super::*;

        #[test]
        fn test_id_is_deterministic() {
            assert_eq!(article_id("Hello"), article_id("Hello"));
        }

        #[test]
        fn test_id_differs_for_different_input() {
            assert_ne!(article_id("Hello"), article_id("Hello world"));
        }

        #[test]
        fn test_id_in_positive_31_bit_range() {
            for input in ["", "a", "Some headline https://feed.example.com/rss", "日本語"] {
                let id = article_id(input);
                assert!(id >= 0);
                assert!(id < i32::MAX as i64);
            }
        }
    }

    mod truncate_tests {
        use super::*;

        #[test]
        fn test_short_text_untouched() {
            assert_eq!(truncate_chars("short", 300), "short");
        }

        #[test]
        fn test_long_text_cut_to_limit() {
            let text = "x".repeat(450);
            assert_eq!(truncate_chars(&text, 300).chars().count(), 300);
        }

        #[test]
        fn test_multibyte_text_does_not_split_characters() {
            let text = "é".repeat(301);
            let truncated = truncate_chars(&text, 300);
            assert_eq!(truncated.chars().count(), 300);
            assert!(truncated.chars().all(|c| c == 'é'));
        }

        #[test]
        fn test_exact_length_untouched() {
            let text = "y".repeat(300);
            assert_eq!(truncate_chars(&text, 300), text);
        }
    }

    mod published_tests {
        use super::*;

        #[test]
        fn test_parse_rfc3339() {
            let expected = Utc.with_ymd_and_hms(2024, 12, 9, 12, 0, 0).unwrap();
            assert_eq!(parse_published("2024-12-09T12:00:00Z"), expected);
        }

        #[test]
        fn test_parse_rfc2822() {
            let expected = Utc.with_ymd_and_hms(2024, 12, 9, 12, 0, 0).unwrap();
            assert_eq!(parse_published("Mon, 09 Dec 2024 12:00:00 GMT"), expected);
        }

        #[test]
        fn test_unparseable_is_epoch() {
            assert_eq!(parse_published("yesterday-ish"), DateTime::UNIX_EPOCH);
        }

        #[test]
        fn test_format_timestamp_is_utc_seconds() {
            let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
            assert_eq!(format_timestamp(ts), "2024-01-02T03:04:05Z");
        }

        #[test]
        fn test_sort_newest_first() {
            let mut articles = vec![
                article("old", "2024-01-01T00:00:00Z"),
                article("garbage", "not a date"),
                article("new", "2024-06-01T00:00:00Z"),
            ];
            sort_newest_first(&mut articles);
            let titles: Vec<_> = articles.iter().map(|a| a.title.as_str()).collect();
            assert_eq!(titles, vec!["new", "old", "garbage"]);
        }
    }

    #[test]
    fn test_type_serializes_as_snake_case() {
        let mut a = article("t", "2024-01-01T00:00:00Z");
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["type"], "feed");

        a.kind = ArticleType::AiGenerated;
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["type"], "ai_generated");
        assert!(json.get("kind").is_none());
    }
}
