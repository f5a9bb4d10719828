use reqwest::header::HeaderMap;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::warn;

use crate::models::api::{PostPage, UserEnvelope};

const PREVIEW_CHARS: usize = 80;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RateLimit {
    pub limit: Option<String>,
    pub remaining: Option<String>,
    pub reset: Option<String>,
}

impl RateLimit {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };

        Self {
            limit: get("x-rate-limit-limit"),
            remaining: get("x-rate-limit-remaining"),
            reset: get("x-rate-limit-reset"),
        }
    }

    pub fn render(&self) -> String {
        let or_na = |value: &Option<String>| value.clone().unwrap_or_else(|| "N/A".to_string());
        let reset = match self.reset.as_deref().and_then(reset_timestamp) {
            Some(at) => format!("{} ({})", or_na(&self.reset), at),
            None => or_na(&self.reset),
        };

        format!(
            "Rate limit: {}/{} (reset: {})",
            or_na(&self.remaining),
            or_na(&self.limit),
            reset
        )
    }
}

fn reset_timestamp(epoch: &str) -> Option<String> {
    let seconds = epoch.trim().parse::<i64>().ok()?;
    OffsetDateTime::from_unix_timestamp(seconds)
        .ok()?
        .format(&Rfc3339)
        .ok()
}

#[derive(Debug)]
pub enum ApiOutcome<T> {
    Success(T),
    RateLimited(String),
    Failed(String),
    Unreachable(String),
}

#[derive(Debug)]
pub struct ApiReport<T> {
    pub status: Option<StatusCode>,
    pub rate_limit: RateLimit,
    pub outcome: ApiOutcome<T>,
}

impl<T> ApiReport<T> {
    pub fn success(&self) -> Option<&T> {
        match &self.outcome {
            ApiOutcome::Success(value) => Some(value),
            _ => None,
        }
    }
}

impl<T: Preview> ApiReport<T> {
    pub fn render(&self, label: &str) -> String {
        let mut lines = Vec::new();

        match self.status {
            Some(status) => lines.push(format!("   Status: {}", status.as_u16())),
            None => lines.push("   Status: no response".to_string()),
        }
        if self.status.is_some() {
            lines.push(format!("   {}", self.rate_limit.render()));
        }

        match &self.outcome {
            ApiOutcome::Success(value) => lines.extend(value.preview(label)),
            ApiOutcome::RateLimited(body) => {
                lines.push("   ❌ Rate limited (429) - possibly the known issue on pay-per-use plans".to_string());
                lines.push(format!("   Response: {}", body));
            }
            ApiOutcome::Failed(body) => {
                let status = self.status.map(|s| s.as_u16().to_string()).unwrap_or_default();
                lines.push(format!("   ❌ Error ({}): {}", status, body));
            }
            ApiOutcome::Unreachable(message) => {
                lines.push(format!("   ❌ Request failed: {}", message));
            }
        }

        lines.join("\n")
    }
}

pub trait Preview {
    fn preview(&self, label: &str) -> Vec<String>;
}

impl Preview for UserEnvelope {
    fn preview(&self, _label: &str) -> Vec<String> {
        let user = &self.data;
        vec![
            format!("   ✅ Username: @{}", user.username),
            format!("   ✅ Display name: {}", user.name),
            format!("   ✅ User ID: {}", user.id),
        ]
    }
}

impl Preview for PostPage {
    fn preview(&self, label: &str) -> Vec<String> {
        let mut lines = vec![format!("   ✅ {} fetched ({} items)", label, self.data.len())];

        for (i, post) in self.data.iter().enumerate() {
            let mut heading = format!("\n   [{}] ID: {}", i + 1, post.id);
            if let Some(author) = &post.author_id {
                heading.push_str(&format!("  author: {}", author));
            }
            if let Some(created_at) = &post.created_at {
                heading.push_str(&format!("  at: {}", created_at));
            }
            lines.push(heading);
            lines.push(format!("       {}", truncate(&post.text, PREVIEW_CHARS)));
        }

        lines
    }
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Sends a GET and classifies the response. Never fails; every problem becomes part of the report.
pub async fn get_json<T: DeserializeOwned>(request: RequestBuilder) -> ApiReport<T> {
    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "request failed before a response arrived");
            return ApiReport {
                status: None,
                rate_limit: RateLimit::default(),
                outcome: ApiOutcome::Unreachable(e.to_string()),
            };
        }
    };

    let status = response.status();
    let rate_limit = RateLimit::from_headers(response.headers());
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Could not read response body".to_string());

    let outcome = match status {
        StatusCode::OK => match serde_json::from_str::<T>(&body) {
            Ok(value) => ApiOutcome::Success(value),
            Err(e) => {
                warn!(error = %e, "unexpected response shape");
                ApiOutcome::Failed(format!("could not decode response: {}: {}", e, body))
            }
        },
        StatusCode::TOO_MANY_REQUESTS => ApiOutcome::RateLimited(body),
        _ => ApiOutcome::Failed(body),
    };

    ApiReport {
        status: Some(status),
        rate_limit,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::api::Post;
    use reqwest::header::HeaderValue;

    fn post(id: &str, text: &str) -> Post {
        Post {
            id: id.to_string(),
            text: text.to_string(),
            created_at: None,
            author_id: None,
        }
    }

    #[test]
    fn truncates_on_character_boundaries() {
        assert_eq!(truncate("short", 80), "short");
        assert_eq!(truncate(&"a".repeat(80), 80), "a".repeat(80));
        assert_eq!(truncate(&"a".repeat(81), 80), format!("{}...", "a".repeat(80)));
        assert_eq!(truncate("ブックマークいいね", 3), "ブック...");
    }

    #[test]
    fn rate_limit_reads_headers_and_falls_back_to_na() {
        let mut headers = HeaderMap::new();
        headers.insert("x-rate-limit-limit", HeaderValue::from_static("15"));
        headers.insert("x-rate-limit-remaining", HeaderValue::from_static("14"));
        headers.insert("x-rate-limit-reset", HeaderValue::from_static("0"));

        let rendered = RateLimit::from_headers(&headers).render();
        assert_eq!(rendered, "Rate limit: 14/15 (reset: 0 (1970-01-01T00:00:00Z))");

        assert_eq!(
            RateLimit::default().render(),
            "Rate limit: N/A/N/A (reset: N/A)"
        );
    }

    #[test]
    fn rate_limited_renders_apart_from_other_failures() {
        let limited: ApiReport<PostPage> = ApiReport {
            status: Some(StatusCode::TOO_MANY_REQUESTS),
            rate_limit: RateLimit::default(),
            outcome: ApiOutcome::RateLimited("Too Many Requests".to_string()),
        };
        let failed: ApiReport<PostPage> = ApiReport {
            status: Some(StatusCode::FORBIDDEN),
            rate_limit: RateLimit::default(),
            outcome: ApiOutcome::Failed("Forbidden".to_string()),
        };

        let limited = limited.render("Bookmarks");
        let failed = failed.render("Bookmarks");

        assert!(limited.contains("Rate limited (429)"));
        assert!(!failed.contains("Rate limited"));
        assert!(failed.contains("Error (403): Forbidden"));
    }

    #[test]
    fn post_page_preview_numbers_items() {
        let page = PostPage {
            data: vec![post("1", "hello"), post("2", &"x".repeat(100))],
        };
        let report = ApiReport {
            status: Some(StatusCode::OK),
            rate_limit: RateLimit::default(),
            outcome: ApiOutcome::Success(page),
        };

        let rendered = report.render("Likes");
        assert!(rendered.contains("Likes fetched (2 items)"));
        assert!(rendered.contains("[1] ID: 1"));
        assert!(rendered.contains("[2] ID: 2"));
        assert!(rendered.contains(&format!("{}...", "x".repeat(80))));
    }

    #[test]
    fn missing_data_means_empty_page() {
        let page: PostPage = serde_json::from_str(r#"{"meta":{"result_count":0}}"#).unwrap();
        assert!(page.data.is_empty());
    }
}
