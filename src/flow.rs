use oauth2::{AccessToken, AuthorizationCode, CsrfToken, PkceCodeVerifier};
use reqwest::Url;
use tracing::{info, warn};

use crate::error::AppError;
use crate::handlers::api::report::ApiReport;
use crate::handlers::api::{fetch_posts, fetch_profile};
use crate::handlers::oauth::browser::BrowserLauncher;
use crate::handlers::oauth::callback_handler::CallbackReceiver;
use crate::handlers::oauth::login_handler::{authorization_url, new_pkce_pair, new_state};
use crate::handlers::oauth::token_handler::exchange_code;
use crate::models::AppConfig;
use crate::models::api::{PostCollection, PostPage, UserEnvelope};
use crate::models::oauth::{CallbackOutcome, PkcePair};

pub const RULE: &str = "============================================================";

pub struct Authorization {
    pub code: AuthorizationCode,
    pub redirect_url: String,
    pub state_matched: bool,
}

#[derive(Debug)]
pub struct RunSummary {
    pub profile: ApiReport<UserEnvelope>,
    pub bookmarks: Option<ApiReport<PostPage>>,
    pub likes: Option<ApiReport<PostPage>>,
}

impl RunSummary {
    pub fn user_id(&self) -> Option<&str> {
        self.profile.success().map(|envelope| envelope.data.id.as_str())
    }
}

fn print_step(title: &str) {
    println!("\n{RULE}");
    println!("{title}");
    println!("{RULE}");
}

/// Runs every step once, in order. Errors returned here end the process with a failure code.
pub async fn run(config: &AppConfig, browser: &dyn BrowserLauncher) -> Result<RunSummary, AppError> {
    let pkce = new_pkce_pair();
    let state = new_state();

    let authorization = authorize(config, &pkce, &state, browser).await?;

    let client = reqwest::Client::new();
    redeem_and_query(
        &client,
        config,
        &authorization.code,
        &pkce.verifier,
        &authorization.redirect_url,
    )
    .await
}

/// Step 1: open the consent page and wait for the redirect.
pub async fn authorize(
    config: &AppConfig,
    pkce: &PkcePair,
    state: &CsrfToken,
    browser: &dyn BrowserLauncher,
) -> Result<Authorization, AppError> {
    print_step("Step 1: Open the X authorization page in a browser");

    let redirect = config.redirect()?;
    let receiver = CallbackReceiver::bind(config.listen_addr()?, redirect.path()).await?;
    let redirect_url = effective_redirect(redirect, receiver.local_addr()?.port())?;

    let auth_url = authorization_url(config, &redirect_url, &pkce.challenge, state)?;

    println!("\nOpen this URL in your browser:\n");
    println!("{auth_url}");
    println!("\nOpening the browser...");
    if let Err(e) = browser.open(&auth_url) {
        warn!(error = %e, "open the URL above by hand");
    }

    println!("\nWaiting for the callback ({redirect_url}) ...");
    match receiver.wait().await? {
        CallbackOutcome::Authorized {
            code,
            state: returned,
        } => {
            // Mismatch is reported only; the run continues.
            let state_matched = match returned {
                Some(returned) if returned.secret() == state.secret() => true,
                Some(_) => {
                    warn!("callback state does not match the state that was sent");
                    false
                }
                None => {
                    warn!("callback carried no state parameter");
                    false
                }
            };
            println!("✅ Authorization code received");
            Ok(Authorization {
                code,
                redirect_url,
                state_matched,
            })
        }
        CallbackOutcome::Denied { error, description } => {
            Err(AppError::AuthorizationDenied { error, description })
        }
    }
}

/// The bound port replaces the configured one, which only differs when the config asks for port 0.
fn effective_redirect(mut redirect: Url, port: u16) -> Result<String, AppError> {
    if redirect.port_or_known_default() != Some(port) {
        redirect
            .set_port(Some(port))
            .map_err(|_| AppError::InvalidConfig(format!("cannot set port on {redirect}")))?;
    }
    Ok(redirect.to_string())
}

/// Steps 2 to 5: token exchange (fatal on failure), then the three read-only calls.
pub async fn redeem_and_query(
    client: &reqwest::Client,
    config: &AppConfig,
    code: &AuthorizationCode,
    verifier: &PkceCodeVerifier,
    redirect_url: &str,
) -> Result<RunSummary, AppError> {
    print_step("Step 2: Exchange the code for an access token");

    // Failures are printed once, by the caller.
    let token = exchange_code(client, config, code, verifier, redirect_url).await?;

    println!("✅ Access token received");
    println!("   Token type: {}", token.token_type.as_deref().unwrap_or("N/A"));
    println!("   Scope: {}", token.scope.as_deref().unwrap_or("N/A"));
    println!(
        "   Expires in: {} seconds",
        token
            .expires_in
            .map(|secs| secs.to_string())
            .unwrap_or_else(|| "N/A".to_string())
    );
    if token.refresh_token.is_some() {
        println!("   Refresh token: issued");
    }

    query_resources(client, config, &token.access_token).await
}

async fn query_resources(
    client: &reqwest::Client,
    config: &AppConfig,
    token: &AccessToken,
) -> Result<RunSummary, AppError> {
    print_step("Step 3: Fetch the authenticated user (GET /2/users/me)");
    let profile = fetch_profile(client, config, token).await;
    println!("\n{}", profile.render("Profile"));

    let Some(user_id) = profile.success().map(|envelope| envelope.data.id.clone()) else {
        info!("profile lookup failed, skipping bookmarks and likes");
        return Ok(RunSummary {
            profile,
            bookmarks: None,
            likes: None,
        });
    };

    let bookmarks = fetch_collection(client, config, token, &user_id, PostCollection::Bookmarks, 4).await;
    let likes = fetch_collection(client, config, token, &user_id, PostCollection::Likes, 5).await;

    Ok(RunSummary {
        profile,
        bookmarks: Some(bookmarks),
        likes: Some(likes),
    })
}

async fn fetch_collection(
    client: &reqwest::Client,
    config: &AppConfig,
    token: &AccessToken,
    user_id: &str,
    collection: PostCollection,
    step: u8,
) -> ApiReport<PostPage> {
    print_step(&format!(
        "Step {}: Fetch {}\n   GET {}?max_results={}",
        step,
        collection.label().to_lowercase(),
        collection.path(user_id),
        config.max_results
    ));

    let report = fetch_posts(client, config, token, user_id, collection).await;
    println!("\n{}", report.render(collection.label()));
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::api::report::ApiOutcome;
    use mockito::{Matcher, Server, ServerGuard};
    use std::collections::HashMap;

    fn config(base: &str) -> AppConfig {
        let base = base.to_string();
        AppConfig::from_lookup(move |key| match key {
            "X_CLIENT_ID" => Some("cid".to_string()),
            "X_CLIENT_SECRET" => Some("secret".to_string()),
            "X_API_BASE_URL" => Some(base.clone()),
            "X_REDIRECT_URI" => Some("http://127.0.0.1:0/callback".to_string()),
            _ => None,
        })
        .unwrap()
    }

    /// Plays the operator: follows the consent page straight back to the redirect URI.
    struct ScriptedBrowser {
        query: &'static str,
        echo_state: bool,
    }

    impl BrowserLauncher for ScriptedBrowser {
        fn open(&self, url: &Url) -> Result<(), AppError> {
            let pairs: HashMap<String, String> = url.query_pairs().into_owned().collect();
            let mut target = format!("{}?{}", pairs["redirect_uri"], self.query);
            if self.echo_state {
                target.push_str(&format!("&state={}", pairs["state"]));
            }
            tokio::spawn(async move {
                let _ = reqwest::get(target).await;
            });
            Ok(())
        }
    }

    fn posts_query(max_results: &str) -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("max_results".into(), max_results.into()),
            Matcher::UrlEncoded("tweet.fields".into(), "created_at,author_id,text".into()),
        ])
    }

    async fn mock_token(server: &mut ServerGuard) -> mockito::Mock {
        server
            .mock("POST", "/2/oauth2/token")
            .match_body(Matcher::UrlEncoded("code".into(), "abc".into()))
            .with_status(200)
            .with_body(r#"{"access_token":"tok1","expires_in":7200}"#)
            .create_async()
            .await
    }

    async fn mock_profile(server: &mut ServerGuard) -> mockito::Mock {
        server
            .mock("GET", "/2/users/me")
            .match_header("authorization", "Bearer tok1")
            .with_status(200)
            .with_header("x-rate-limit-limit", "75")
            .with_header("x-rate-limit-remaining", "74")
            .with_body(r#"{"data":{"id":"42","username":"u","name":"U"}}"#)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn end_to_end_against_mock_provider() {
        let mut server = Server::new_async().await;
        let token = mock_token(&mut server).await;
        let profile = mock_profile(&mut server).await;
        let long_text = "b".repeat(120);
        let bookmarks = server
            .mock("GET", "/2/users/42/bookmarks")
            .match_header("authorization", "Bearer tok1")
            .match_query(posts_query("5"))
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "data": [
                        {"id": "100", "text": "first bookmark", "author_id": "7"},
                        {"id": "101", "text": long_text}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;
        let likes = server
            .mock("GET", "/2/users/42/liked_tweets")
            .match_query(posts_query("5"))
            .with_status(200)
            .with_body(r#"{"meta":{"result_count":0}}"#)
            .create_async()
            .await;

        let browser = ScriptedBrowser {
            query: "code=abc",
            echo_state: true,
        };
        let summary = run(&config(&server.url()), &browser).await.unwrap();

        token.assert_async().await;
        profile.assert_async().await;
        bookmarks.assert_async().await;
        likes.assert_async().await;

        assert_eq!(summary.user_id(), Some("42"));

        let bookmarks = summary.bookmarks.unwrap();
        assert_eq!(bookmarks.success().unwrap().data.len(), 2);
        let rendered = bookmarks.render("Bookmarks");
        assert!(rendered.contains("Bookmarks fetched (2 items)"));
        assert!(rendered.contains("[1] ID: 100"));
        assert!(rendered.contains("first bookmark"));
        assert!(rendered.contains(&format!("{}...", "b".repeat(80))));
        assert!(!rendered.contains(&"b".repeat(81)));

        assert!(summary.likes.unwrap().success().unwrap().data.is_empty());
    }

    #[tokio::test]
    async fn denied_authorization_stops_before_token_exchange() {
        let mut server = Server::new_async().await;
        let token = server
            .mock("POST", "/2/oauth2/token")
            .expect(0)
            .create_async()
            .await;

        let browser = ScriptedBrowser {
            query: "error=access_denied",
            echo_state: false,
        };
        let err = run(&config(&server.url()), &browser).await.unwrap_err();

        match err {
            AppError::AuthorizationDenied { error, .. } => assert_eq!(error, "access_denied"),
            other => panic!("expected AuthorizationDenied, got {other:?}"),
        }
        token.assert_async().await;
    }

    #[tokio::test]
    async fn mismatched_state_does_not_abort() {
        let server = Server::new_async().await;
        let config = config(&server.url());

        let pkce = new_pkce_pair();
        let browser = ScriptedBrowser {
            query: "code=abc&state=forged",
            echo_state: false,
        };
        let authorization = authorize(&config, &pkce, &new_state(), &browser)
            .await
            .unwrap();

        assert_eq!(authorization.code.secret(), "abc");
        assert!(!authorization.state_matched);
        assert!(authorization.redirect_url.starts_with("http://127.0.0.1:"));
        assert!(!authorization.redirect_url.contains(":0/"));
    }

    #[tokio::test]
    async fn echoed_state_is_recognised() {
        let server = Server::new_async().await;
        let config = config(&server.url());

        let browser = ScriptedBrowser {
            query: "code=abc",
            echo_state: true,
        };
        let authorization = authorize(&config, &new_pkce_pair(), &new_state(), &browser)
            .await
            .unwrap();

        assert!(authorization.state_matched);
    }

    #[tokio::test]
    async fn missing_state_is_not_a_match() {
        let server = Server::new_async().await;
        let config = config(&server.url());

        let browser = ScriptedBrowser {
            query: "code=abc",
            echo_state: false,
        };
        let authorization = authorize(&config, &new_pkce_pair(), &new_state(), &browser)
            .await
            .unwrap();

        assert!(!authorization.state_matched);
    }

    #[tokio::test]
    async fn failed_token_exchange_skips_resource_calls() {
        let mut server = Server::new_async().await;
        let _token = server
            .mock("POST", "/2/oauth2/token")
            .with_status(401)
            .with_body(r#"{"error":"unauthorized_client"}"#)
            .create_async()
            .await;
        let profile = server
            .mock("GET", "/2/users/me")
            .expect(0)
            .create_async()
            .await;

        let err = redeem_and_query(
            &reqwest::Client::new(),
            &config(&server.url()),
            &AuthorizationCode::new("abc".to_string()),
            &PkceCodeVerifier::new("v".repeat(43)),
            "http://localhost:3000/callback",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::TokenExchange { .. }));
        profile.assert_async().await;
    }

    #[tokio::test]
    async fn failed_profile_skips_lists_but_completes() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let _profile = server
            .mock("GET", "/2/users/me")
            .with_status(503)
            .with_body("Service Unavailable")
            .create_async()
            .await;
        let bookmarks = server
            .mock("GET", Matcher::Regex(r"^/2/users/.*/bookmarks".to_string()))
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let summary = redeem_and_query(
            &reqwest::Client::new(),
            &config(&server.url()),
            &AuthorizationCode::new("abc".to_string()),
            &PkceCodeVerifier::new("v".repeat(43)),
            "http://localhost:3000/callback",
        )
        .await
        .unwrap();

        assert!(summary.user_id().is_none());
        assert!(summary.bookmarks.is_none());
        assert!(summary.likes.is_none());
        bookmarks.assert_async().await;
    }

    #[tokio::test]
    async fn rate_limited_list_does_not_stop_the_next_call() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let _profile = mock_profile(&mut server).await;
        let _bookmarks = server
            .mock("GET", "/2/users/42/bookmarks")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_header("x-rate-limit-remaining", "0")
            .with_body(r#"{"title":"Too Many Requests"}"#)
            .create_async()
            .await;
        let likes = server
            .mock("GET", "/2/users/42/liked_tweets")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let summary = redeem_and_query(
            &reqwest::Client::new(),
            &config(&server.url()),
            &AuthorizationCode::new("abc".to_string()),
            &PkceCodeVerifier::new("v".repeat(43)),
            "http://localhost:3000/callback",
        )
        .await
        .unwrap();

        likes.assert_async().await;

        let bookmarks = summary.bookmarks.unwrap();
        assert!(matches!(bookmarks.outcome, ApiOutcome::RateLimited(_)));
        assert!(bookmarks.render("Bookmarks").contains("Rate limited (429)"));

        let likes = summary.likes.unwrap();
        assert!(matches!(likes.outcome, ApiOutcome::Failed(_)));
        let rendered = likes.render("Likes");
        assert!(rendered.contains("Error (500): boom"));
        assert!(!rendered.contains("Rate limited"));
    }
}
