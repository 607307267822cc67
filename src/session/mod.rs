//! Rendering sessions and the per-worker session pool.
//!
//! A [`RenderSession`] is one addressable browser tab. The crawl only needs
//! four primitives from it: navigate with a load bound, run a small script,
//! snapshot the current markup, and close. Everything else (scrolling,
//! measuring page height, clicking "load more") is expressed as scripts on
//! top of [`RenderSession::execute_script`].
//!
//! # Ownership
//!
//! A [`SessionPool`] owns one session per worker slot. Workers borrow a slot
//! mutably for the whole parallel phase, so no two workers ever drive the
//! same tab and session state needs no lock.
//!
//! # Submodules
//!
//! - [`chrome`]: chromiumoxide-backed sessions, one tab each in a shared browser

pub mod chrome;
#[cfg(test)]
pub mod fake;

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Returns the current document height.
pub const SCROLL_HEIGHT_SCRIPT: &str = "document.body.scrollHeight";

/// Scrolls to the bottom and returns the height it scrolled to.
pub const SCROLL_TO_BOTTOM_SCRIPT: &str =
    "(() => { window.scrollTo(0, document.body.scrollHeight); return document.body.scrollHeight; })()";

/// Failures reported by a rendering session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("navigation to {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },

    #[error("browser error: {0}")]
    Browser(String),

    #[error("session already closed")]
    Closed,
}

impl SessionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SessionError::Timeout { .. })
    }
}

/// One rendering session (browser tab) exclusively owned by one worker.
pub trait RenderSession {
    /// Load `url`, failing with [`SessionError::Timeout`] past `timeout`.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), SessionError>;

    /// Evaluate a script expression in the page and return its value.
    async fn execute_script(&mut self, script: &str) -> Result<Value, SessionError>;

    /// Serialized markup of the currently rendered document.
    async fn current_markup(&mut self) -> Result<String, SessionError>;

    /// Release the tab.
    async fn close(&mut self) -> Result<(), SessionError>;
}

/// Current document height in pixels.
pub async fn scroll_height<S: RenderSession>(session: &mut S) -> Result<u64, SessionError> {
    let value = session.execute_script(SCROLL_HEIGHT_SCRIPT).await?;
    Ok(as_height(&value))
}

/// Scroll to the bottom of the document.
pub async fn scroll_to_bottom<S: RenderSession>(session: &mut S) -> Result<(), SessionError> {
    session.execute_script(SCROLL_TO_BOTTOM_SCRIPT).await?;
    Ok(())
}

fn as_height(value: &Value) -> u64 {
    value
        .as_u64()
        .or_else(|| value.as_f64().map(|f| f.max(0.0) as u64))
        .unwrap_or(0)
}

/// Script that clicks the first visible element matching `selector` and
/// returns whether it did.
pub fn click_script(selector: &str) -> String {
    let quoted = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        "(() => {{ const el = document.querySelector({quoted}); \
         if (!el) return false; \
         const r = el.getBoundingClientRect(); \
         if (r.width === 0 && r.height === 0) return false; \
         el.click(); return true; }})()"
    )
}

/// Click the first visible element matching `selector`.
///
/// Returns `Ok(false)` when no such element is currently visible.
pub async fn click_first<S: RenderSession>(
    session: &mut S,
    selector: &str,
) -> Result<bool, SessionError> {
    let value = session.execute_script(&click_script(selector)).await?;
    Ok(value.as_bool().unwrap_or(false))
}

/// One session per worker slot.
///
/// Slot 0 runs cold discovery; the last slot is the one reserved for
/// preloading the next source's discovery while the others extract.
#[derive(Debug)]
pub struct SessionPool<S> {
    sessions: Vec<S>,
}

impl<S: RenderSession> SessionPool<S> {
    pub fn new(sessions: Vec<S>) -> Self {
        Self { sessions }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// All slots, for one parallel phase.
    pub fn slots_mut(&mut self) -> &mut [S] {
        &mut self.sessions
    }

    /// Close every session. Failures are logged and do not stop the others.
    #[instrument(level = "info", skip_all, fields(sessions = self.sessions.len()))]
    pub async fn close_all(&mut self) {
        for (slot, session) in self.sessions.iter_mut().enumerate() {
            match session.close().await {
                Ok(()) => debug!(slot, "Closed session"),
                Err(e) => warn!(slot, error = %e, "Failed to close session"),
            }
        }
    }
}
