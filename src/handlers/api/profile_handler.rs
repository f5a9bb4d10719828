use crate::handlers::api::report::{ApiReport, get_json};
use crate::models::AppConfig;
use crate::models::api::UserEnvelope;
use oauth2::AccessToken;

/// `GET /2/users/me`.
pub async fn fetch_profile(
    client: &reqwest::Client,
    config: &AppConfig,
    token: &AccessToken,
) -> ApiReport<UserEnvelope> {
    let request = client
        .get(config.api_url("/2/users/me"))
        .bearer_auth(token.secret());

    get_json(request).await
}
