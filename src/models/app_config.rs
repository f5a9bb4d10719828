use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

use reqwest::Url;

use crate::error::AppError;

pub const DEFAULT_REDIRECT_URL: &str = "http://localhost:3000/callback";
pub const DEFAULT_SCOPES: &str = "tweet.read users.read bookmark.read like.read offline.access";
pub const DEFAULT_AUTHORIZE_URL: &str = "https://x.com/i/oauth2/authorize";
pub const DEFAULT_API_BASE_URL: &str = "https://api.x.com";
pub const DEFAULT_MAX_RESULTS: u8 = 5;

#[derive(Clone)]
pub struct AppConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub scopes: String,
    pub authorize_url: String,
    pub api_base_url: String,
    pub max_results: u8,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("redirect_url", &self.redirect_url)
            .field("scopes", &self.scopes)
            .field("authorize_url", &self.authorize_url)
            .field("api_base_url", &self.api_base_url)
            .field("max_results", &self.max_results)
            .finish()
    }
}

impl AppConfig {
    /// Loads credentials from the process environment, after merging in a dotenv file.
    ///
    /// With no explicit `env_file` the usual `.env` lookup applies and a missing
    /// file is not an error. An explicit file that cannot be read is.
    pub fn from_env(env_file: Option<&Path>) -> Result<Self, AppError> {
        use std::env;

        match env_file {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| {
                    AppError::InvalidConfig(format!("could not load {}: {}", path.display(), e))
                })?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let client_id = non_empty("X_CLIENT_ID");
        let client_secret = non_empty("X_CLIENT_SECRET");

        let (client_id, client_secret) = match (client_id, client_secret) {
            (Some(id), Some(secret)) => (id, secret),
            (id, secret) => {
                let mut missing = Vec::new();
                if id.is_none() {
                    missing.push("X_CLIENT_ID");
                }
                if secret.is_none() {
                    missing.push("X_CLIENT_SECRET");
                }
                return Err(AppError::MissingConfig(missing));
            }
        };

        let config = Self {
            client_id,
            client_secret,
            redirect_url: non_empty("X_REDIRECT_URI")
                .unwrap_or_else(|| DEFAULT_REDIRECT_URL.to_string()),
            scopes: non_empty("X_SCOPES").unwrap_or_else(|| DEFAULT_SCOPES.to_string()),
            authorize_url: non_empty("X_AUTHORIZE_URL")
                .unwrap_or_else(|| DEFAULT_AUTHORIZE_URL.to_string()),
            api_base_url: non_empty("X_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            max_results: DEFAULT_MAX_RESULTS,
        };

        config.redirect()?;
        Ok(config)
    }

    pub fn redirect(&self) -> Result<Url, AppError> {
        let url = Url::parse(&self.redirect_url)
            .map_err(|e| AppError::InvalidConfig(format!("redirect URL {}: {}", self.redirect_url, e)))?;
        if url.scheme() != "http" {
            return Err(AppError::InvalidConfig(format!(
                "redirect URL {} must use plain http on a loopback address",
                self.redirect_url
            )));
        }
        // The path becomes a literal route on the callback listener.
        let path = url.path();
        let lowered = path.to_ascii_lowercase();
        if path.contains([':', '*', '{', '}']) || lowered.contains("%7b") || lowered.contains("%7d") {
            return Err(AppError::InvalidConfig(format!(
                "redirect path {} may not contain ':', '*' or braces",
                path
            )));
        }
        Ok(url)
    }

    /// Socket the callback listener binds, taken from the redirect URL's host and port.
    pub fn listen_addr(&self) -> Result<SocketAddr, AppError> {
        let url = self.redirect()?;
        let ip = match url.host_str() {
            Some("localhost") | None => IpAddr::V4(Ipv4Addr::LOCALHOST),
            Some(host) => host
                .trim_start_matches('[')
                .trim_end_matches(']')
                .parse::<IpAddr>()
                .map_err(|_| {
                    AppError::InvalidConfig(format!("redirect host {} is not a loopback address", host))
                })?,
        };
        let port = url.port_or_known_default().unwrap_or(80);
        Ok(SocketAddr::new(ip, port))
    }

    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url.trim_end_matches('/'), path)
    }
}
