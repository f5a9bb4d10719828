use std::net::SocketAddr;
use std::sync::Arc;

use crate::error::AppError;
use crate::models::oauth::{CallbackOutcome, CallbackParams};
use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, info, warn};

#[derive(Clone)]
struct CallbackState {
    sender: Arc<Mutex<Option<oneshot::Sender<CallbackOutcome>>>>,
}

async fn callback_handler(
    Query(pairs): Query<Vec<(String, String)>>,
    State(state): State<CallbackState>,
) -> impl IntoResponse {
    let params: CallbackParams = pairs.into_iter().collect();
    debug!(
        has_code = params.code.is_some(),
        error = params.error.as_deref(),
        "OAuth callback received"
    );

    let outcome = CallbackOutcome::from(params);
    let response = match &outcome {
        CallbackOutcome::Authorized { .. } => (
            StatusCode::OK,
            Html(
                "<h1>Authorized</h1><p>You can close this page and return to the terminal.</p>"
                    .to_string(),
            ),
        ),
        CallbackOutcome::Denied { error, description } => (
            StatusCode::BAD_REQUEST,
            Html(format!(
                "<h1>Error</h1><p>{} - {}</p>",
                escape_html(error),
                escape_html(description)
            )),
        ),
    };

    match state.sender.lock().await.take() {
        Some(sender) => {
            if sender.send(outcome).is_err() {
                warn!("callback listener went away before the outcome was delivered");
            }
        }
        None => warn!("ignoring extra callback request after the first one"),
    }

    response
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Local listener that serves the redirect path until the first callback arrives.
pub struct CallbackReceiver {
    listener: TcpListener,
    path: String,
}

impl CallbackReceiver {
    pub async fn bind(addr: SocketAddr, path: &str) -> Result<Self, AppError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| AppError::Bind { addr, source })?;
        let path = if path.is_empty() { "/" } else { path };

        Ok(Self {
            listener,
            path: path.to_string(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, AppError> {
        self.listener.local_addr().map_err(AppError::Serve)
    }

    /// Blocks until one request hits the callback path, then shuts the server down.
    ///
    /// There is no timeout. Requests to any other path get a 404 and keep the server up.
    pub async fn wait(self) -> Result<CallbackOutcome, AppError> {
        let (sender, receiver) = oneshot::channel();
        let state = CallbackState {
            sender: Arc::new(Mutex::new(Some(sender))),
        };

        let app = Router::new()
            .route(&self.path, get(callback_handler))
            .with_state(state);

        info!(addr = ?self.listener.local_addr().ok(), path = %self.path, "waiting for OAuth callback");

        let (outcome_tx, outcome_rx) = oneshot::channel();
        let shutdown = async move {
            let _ = outcome_tx.send(receiver.await);
        };

        axum::serve(self.listener, app.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(AppError::Serve)?;

        match outcome_rx.await {
            Ok(Ok(outcome)) => Ok(outcome),
            _ => Err(AppError::CallbackAborted),
        }
    }
}
