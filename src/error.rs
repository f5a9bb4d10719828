use std::net::SocketAddr;

use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{} is not set", .0.join(" / "))]
    MissingConfig(Vec<&'static str>),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("could not listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("callback server failed: {0}")]
    Serve(#[source] std::io::Error),

    #[error("could not launch a browser: {0}")]
    Browser(#[source] std::io::Error),

    #[error("authorization failed: {error} - {description}")]
    AuthorizationDenied { error: String, description: String },

    #[error("callback server stopped before a redirect arrived")]
    CallbackAborted,

    #[error("token exchange failed ({status}): {body}")]
    TokenExchange { status: StatusCode, body: String },

    #[error("could not decode {what}: {message}")]
    Decode { what: &'static str, message: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
