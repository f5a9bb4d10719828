use oauth2::{AccessToken, AuthorizationCode, CsrfToken, PkceCodeChallenge, PkceCodeVerifier, RefreshToken};
use serde::Deserialize;

/// Verifier and its S256 challenge, generated once per run.
pub struct PkcePair {
    pub verifier: PkceCodeVerifier,
    pub challenge: PkceCodeChallenge,
}

#[derive(Debug, Default)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Built from raw query pairs: blank values are dropped and the first remaining value of a key wins.
impl FromIterator<(String, String)> for CallbackParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(pairs: I) -> Self {
        let mut params = CallbackParams::default();
        for (key, value) in pairs {
            if value.is_empty() {
                continue;
            }
            let slot = match key.as_str() {
                "code" => &mut params.code,
                "state" => &mut params.state,
                "error" => &mut params.error,
                "error_description" => &mut params.error_description,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }
}

#[derive(Debug)]
pub enum CallbackOutcome {
    Authorized {
        code: AuthorizationCode,
        state: Option<CsrfToken>,
    },
    Denied {
        error: String,
        description: String,
    },
}

impl From<CallbackParams> for CallbackOutcome {
    fn from(params: CallbackParams) -> Self {
        match params.code.filter(|code| !code.is_empty()) {
            Some(code) => CallbackOutcome::Authorized {
                code: AuthorizationCode::new(code),
                state: params.state.map(CsrfToken::new),
            },
            None => CallbackOutcome::Denied {
                error: params.error.unwrap_or_else(|| "unknown".to_string()),
                description: params.error_description.unwrap_or_default(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: AccessToken,
    pub token_type: Option<String>,
    pub expires_in: Option<u64>,
    pub scope: Option<String>,
    pub refresh_token: Option<RefreshToken>,
}
