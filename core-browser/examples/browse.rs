//! Terminal drive browser.
//!
//! Signs in (or restores the stored session), loads the listing and then
//! treats every line typed on stdin as a search term.
//!
//! Run with:
//! ```bash
//! DRIVE_CLIENT_ID=... DRIVE_API_KEY=... cargo run -p core-browser --example browse
//! ```
//!
//! After approving access in the browser, paste the full redirect URL back
//! into the terminal. An empty line clears the search, `:q` quits.

use anyhow::{Context, Result};
use async_trait::async_trait;
use bridge_traits::LogLevel;
use core_auth::{AuthState, AuthorizationPrompt, AuthorizationResponse};
use core_browser::{DriveBrowser, SearchView};
use core_runtime::config::{CoreConfig, DriveSettings};
use core_runtime::logging::{init_logging, LoggingConfig};
use std::sync::Arc;
use tracing::info;
use url::Url;

/// Prints the consent URL and reads the redirect URL from stdin.
struct TerminalPrompt;

#[async_trait]
impl AuthorizationPrompt for TerminalPrompt {
    async fn authorize(&self, authorization_url: &str) -> core_auth::Result<AuthorizationResponse> {
        println!("Open this URL and approve access:\n\n  {}\n", authorization_url);
        println!("Paste the URL you were redirected to:");

        let line = match read_line().await {
            Some(line) if !line.is_empty() => line,
            _ => return Ok(AuthorizationResponse::Cancelled),
        };

        let redirect = Url::parse(&line)
            .map_err(|e| core_auth::AuthError::AuthenticationFailed(e.to_string()))?;
        let param = |name: &str| {
            redirect
                .query_pairs()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.into_owned())
        };

        if let Some(error) = param("error") {
            return Ok(AuthorizationResponse::Denied { error });
        }
        match (param("code"), param("state")) {
            (Some(code), Some(state)) => Ok(AuthorizationResponse::Code { code, state }),
            _ => Ok(AuthorizationResponse::Cancelled),
        }
    }
}

async fn read_line() -> Option<String> {
    tokio::task::spawn_blocking(|| {
        let mut buf = String::new();
        match std::io::stdin().read_line(&mut buf) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(buf.trim().to_string()),
        }
    })
    .await
    .ok()
    .flatten()
}

fn print_view(view: &SearchView) {
    println!(
        "-- {} file(s) [{}] for {:?}",
        view.len(),
        view.source.as_str(),
        view.term
    );
    for file in &view.files {
        println!("   {:<40} {}", file.name, file.mime_type);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(LoggingConfig::default().with_level(LogLevel::Info))
        .context("failed to initialize logging")?;

    let config = CoreConfig::builder()
        .drive(DriveSettings::from_env())
        .build()
        .context("invalid drive configuration")?;
    let browser = DriveBrowser::from_config(&config, Arc::new(TerminalPrompt));

    let mut events = browser.events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            info!(event = event.description(), "core event");
        }
    });

    if browser.start().await? != AuthState::SignedIn {
        browser.sign_in().await?;
    }

    let mut views = browser.watch_view();
    print_view(&views.borrow_and_update());
    tokio::spawn(async move {
        while views.changed().await.is_ok() {
            print_view(&views.borrow_and_update());
        }
    });

    while let Some(line) = read_line().await {
        if line == ":q" {
            break;
        }
        browser.search(&line).await;
    }

    Ok(())
}
