use crate::handlers::api::report::{ApiReport, get_json};
use crate::models::AppConfig;
use crate::models::api::{PostCollection, PostPage};
use oauth2::AccessToken;

const TWEET_FIELDS: &str = "created_at,author_id,text";

pub async fn fetch_posts(
    client: &reqwest::Client,
    config: &AppConfig,
    token: &AccessToken,
    user_id: &str,
    collection: PostCollection,
) -> ApiReport<PostPage> {
    let max_results = config.max_results.to_string();
    let request = client
        .get(config.api_url(&collection.path(user_id)))
        .query(&[
            ("max_results", max_results.as_str()),
            ("tweet.fields", TWEET_FIELDS),
        ])
        .bearer_auth(token.secret());

    get_json(request).await
}
