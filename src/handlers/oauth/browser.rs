use std::process::{Command, Stdio};

use reqwest::Url;

use crate::error::AppError;

/// Something that can present the authorization page to the operator.
pub trait BrowserLauncher {
    fn open(&self, url: &Url) -> Result<(), AppError>;
}

pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &Url) -> Result<(), AppError> {
        let (program, args) = opener();
        Command::new(program)
            .args(args)
            .arg(url.as_str())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
            .map_err(AppError::Browser)
    }
}

/// Only prints; used with `--no-browser`.
pub struct PrintOnly;

impl BrowserLauncher for PrintOnly {
    fn open(&self, _url: &Url) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(target_os = "macos")]
fn opener() -> (&'static str, &'static [&'static str]) {
    ("open", &[])
}

#[cfg(target_os = "windows")]
fn opener() -> (&'static str, &'static [&'static str]) {
    ("rundll32", &["url.dll,FileProtocolHandler"])
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn opener() -> (&'static str, &'static [&'static str]) {
    ("xdg-open", &[])
}
