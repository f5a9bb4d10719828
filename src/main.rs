mod error;
mod flow;
mod handlers;
mod models;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::builder::FalseyValueParser;
use tracing_subscriber::EnvFilter;

use error::AppError;
use flow::RULE;
use handlers::oauth::browser::{BrowserLauncher, PrintOnly, SystemBrowser};
use models::AppConfig;

/// Walks through the X OAuth2 PKCE flow, then reads your profile, bookmarks and likes.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Dotenv file holding X_CLIENT_ID and X_CLIENT_SECRET (defaults to ./.env when present)
    #[arg(long, env = "X_ENV_FILE")]
    env_file: Option<PathBuf>,

    /// Print the authorization URL without launching a browser
    #[arg(long, env = "X_NO_BROWSER", value_parser = FalseyValueParser::new())]
    no_browser: bool,

    /// Page size for the bookmarks and likes requests
    #[arg(long, env = "X_MAX_RESULTS", default_value_t = 5, value_parser = clap::value_parser!(u8).range(5..=100))]
    max_results: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    println!();
    println!("🔍 X API bookmarks & likes smoke test");
    println!("{RULE}");

    let mut app_config = match AppConfig::from_env(cli.env_file.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            print_failure(&e);
            return ExitCode::FAILURE;
        }
    };
    app_config.max_results = cli.max_results;
    tracing::debug!(config = ?app_config, "configuration loaded");

    let browser: &dyn BrowserLauncher = if cli.no_browser {
        &PrintOnly
    } else {
        &SystemBrowser
    };

    match flow::run(&app_config, browser).await {
        Ok(summary) => {
            let count = |report: &Option<handlers::api::report::ApiReport<models::api::PostPage>>| {
                report
                    .as_ref()
                    .and_then(|r| r.success())
                    .map(|page| page.data.len())
            };
            tracing::info!(
                user_id = summary.user_id(),
                bookmarks = count(&summary.bookmarks),
                likes = count(&summary.likes),
                "run finished"
            );
            println!("\n{RULE}");
            println!("Done!");
            println!("{RULE}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("run aborted");
            println!();
            print_failure(&e);
            ExitCode::FAILURE
        }
    }
}

/// The only place a fatal error reaches the console.
fn print_failure(err: &AppError) {
    for line in failure_lines(err) {
        println!("{line}");
    }
}

fn failure_lines(err: &AppError) -> Vec<String> {
    let mut lines = vec![format!("❌ {err}")];
    if matches!(err, AppError::MissingConfig(_)) {
        lines.push(String::new());
        lines.push("   1. cp .env.example .env".to_string());
        lines.push("   2. fill in X_CLIENT_ID and X_CLIENT_SECRET in .env".to_string());
        lines.push("   3. run again".to_string());
    }
    lines
}
