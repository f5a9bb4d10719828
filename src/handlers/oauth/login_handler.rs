use crate::error::AppError;
use crate::models::AppConfig;
use crate::models::oauth::PkcePair;
use oauth2::{CsrfToken, PkceCodeChallenge};
use reqwest::Url;

/// Random bytes behind the verifier; 64 bytes encode to 86 characters, inside RFC 7636's 43..=128.
const VERIFIER_BYTES: u32 = 64;

pub fn new_pkce_pair() -> PkcePair {
    let (challenge, verifier) = PkceCodeChallenge::new_random_sha256_len(VERIFIER_BYTES);
    PkcePair {
        verifier,
        challenge,
    }
}

pub fn new_state() -> CsrfToken {
    CsrfToken::new_random()
}

pub fn authorization_url(
    config: &AppConfig,
    redirect_url: &str,
    challenge: &PkceCodeChallenge,
    state: &CsrfToken,
) -> Result<Url, AppError> {
    let mut url = Url::parse(&config.authorize_url).map_err(|e| {
        AppError::InvalidConfig(format!("authorize URL {}: {}", config.authorize_url, e))
    })?;

    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", redirect_url)
        .append_pair("scope", &config.scopes)
        .append_pair("state", state.secret())
        .append_pair("code_challenge", challenge.as_str())
        .append_pair("code_challenge_method", "S256");

    Ok(url)
}
