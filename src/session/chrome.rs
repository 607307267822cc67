//! Headless Chromium sessions over the DevTools protocol.
//!
//! One [`ChromeBrowser`] process is launched per run; every worker gets its
//! own tab ([`ChromeSession`]). Image loading is disabled to keep page loads
//! short.

use super::{RenderSession, SessionError};
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use serde_json::Value;
use std::error::Error;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// A launched browser process and the task pumping its protocol events.
pub struct ChromeBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl ChromeBrowser {
    /// Launch Chromium.
    ///
    /// # Errors
    ///
    /// Returns an error if the browser config is invalid or the executable
    /// cannot be started.
    #[instrument(level = "info")]
    pub async fn launch(headless: bool) -> Result<Self, Box<dyn Error>> {
        let mut builder = BrowserConfig::builder()
            .window_size(1280, 1024)
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-dev-shm-usage")
            .arg("--blink-settings=imagesEnabled=false")
            .arg("--log-level=3");
        if !headless {
            builder = builder.with_head();
        }
        let config = builder.build()?;

        let (browser, mut handler) = Browser::launch(config).await?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Browser handler event error");
                }
            }
        });
        info!(headless, "Browser launched");
        Ok(Self { browser, handler })
    }

    /// Open `count` blank tabs, one per worker slot.
    #[instrument(level = "info", skip(self))]
    pub async fn open_sessions(&self, count: usize) -> Result<Vec<ChromeSession>, Box<dyn Error>> {
        let mut sessions = Vec::with_capacity(count);
        for slot in 0..count {
            let page = self.browser.new_page("about:blank").await?;
            debug!(slot, "Opened tab");
            sessions.push(ChromeSession { page: Some(page) });
        }
        Ok(sessions)
    }

    /// Close the browser and stop the event task.
    #[instrument(level = "info", skip_all)]
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "Failed to close browser cleanly");
        }
        if let Err(e) = self.browser.wait().await {
            warn!(error = %e, "Failed waiting for browser exit");
        }
        self.handler.abort();
        info!("Browser shut down");
    }
}

/// One browser tab.
#[derive(Debug)]
pub struct ChromeSession {
    page: Option<Page>,
}

impl ChromeSession {
    fn page(&self) -> Result<&Page, SessionError> {
        self.page.as_ref().ok_or(SessionError::Closed)
    }
}

fn browser_err(e: impl std::fmt::Display) -> SessionError {
    SessionError::Browser(e.to_string())
}

impl RenderSession for ChromeSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), SessionError> {
        let page = self.page()?;
        match tokio::time::timeout(timeout, page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(browser_err(e)),
            Err(_) => Err(SessionError::Timeout {
                url: url.to_string(),
                after: timeout,
            }),
        }
    }

    async fn execute_script(&mut self, script: &str) -> Result<Value, SessionError> {
        let page = self.page()?;
        let result = page.evaluate(script).await.map_err(browser_err)?;
        result.into_value::<Value>().map_err(browser_err)
    }

    async fn current_markup(&mut self) -> Result<String, SessionError> {
        let page = self.page()?;
        page.content().await.map_err(browser_err)
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        match self.page.take() {
            Some(page) => page.close().await.map_err(|e| {
                error!(error = %e, "Failed to close tab");
                browser_err(e)
            }),
            None => Ok(()),
        }
    }
}
