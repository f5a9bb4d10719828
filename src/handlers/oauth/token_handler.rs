use crate::error::AppError;
use crate::models::AppConfig;
use crate::models::oauth::TokenResponse;
use oauth2::{AuthorizationCode, PkceCodeVerifier};
use tracing::{debug, error};

/// Trades the authorization code for an access token. Any non-success status is fatal.
pub async fn exchange_code(
    client: &reqwest::Client,
    config: &AppConfig,
    code: &AuthorizationCode,
    verifier: &PkceCodeVerifier,
    redirect_url: &str,
) -> Result<TokenResponse, AppError> {
    let params = [
        ("grant_type", "authorization_code"),
        ("code", code.secret().as_str()),
        ("redirect_uri", redirect_url),
        ("code_verifier", verifier.secret().as_str()),
    ];

    let token_url = config.api_url("/2/oauth2/token");
    debug!(url = %token_url, "exchanging authorization code");

    let response = client
        .post(&token_url)
        .basic_auth(&config.client_id, Some(&config.client_secret))
        .form(&params)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Could not read error body".to_string());
        error!(%status, "token exchange rejected");
        return Err(AppError::TokenExchange { status, body });
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| AppError::Decode {
            what: "token response",
            message: e.to_string(),
        })
}
