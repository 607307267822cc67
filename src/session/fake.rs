//! Scripted in-memory sessions for tests.
//!
//! A [`FakeSite`] maps URLs to [`FakePage`]s. Each page has one or more
//! markup stages (advanced by clicking its "load more" control), a number of
//! scroll steps during which the reported height keeps growing, and an
//! optional forced timeout. Scroll scripts can be made to fail from a given
//! stage on. Every navigation is recorded in a shared log.

use super::{RenderSession, SCROLL_HEIGHT_SCRIPT, SCROLL_TO_BOTTOM_SCRIPT, SessionError};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FakePage {
    stages: Vec<String>,
    growth_steps: u64,
    times_out: bool,
    scripts_fail_from: Option<usize>,
}

impl FakePage {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            stages: vec![markup.into()],
            growth_steps: 0,
            times_out: false,
            scripts_fail_from: None,
        }
    }

    /// A page whose markup advances one stage per "load more" click.
    pub fn staged(stages: Vec<String>) -> Self {
        Self {
            stages,
            growth_steps: 0,
            times_out: false,
            scripts_fail_from: None,
        }
    }

    /// Height keeps growing for the first `steps` scrolls after each load.
    pub fn growing(mut self, steps: u64) -> Self {
        self.growth_steps = steps;
        self
    }

    /// Scroll scripts fail once the page has reached `stage`.
    pub fn scripts_failing_from(mut self, stage: usize) -> Self {
        self.scripts_fail_from = Some(stage);
        self
    }

    pub fn timing_out() -> Self {
        Self {
            stages: vec![String::new()],
            growth_steps: 0,
            times_out: true,
            scripts_fail_from: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct FakeSiteBuilder {
    pages: HashMap<String, FakePage>,
}

impl FakeSiteBuilder {
    pub fn page(mut self, url: impl Into<String>, page: FakePage) -> Self {
        self.pages.insert(url.into(), page);
        self
    }

    pub fn build(self) -> FakeSite {
        FakeSite {
            pages: Arc::new(self.pages),
            navigations: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FakeSite {
    pages: Arc<HashMap<String, FakePage>>,
    navigations: Arc<Mutex<Vec<String>>>,
}

impl FakeSite {
    pub fn builder() -> FakeSiteBuilder {
        FakeSiteBuilder::default()
    }

    pub fn session(&self) -> FakeSession {
        FakeSession {
            site: self.clone(),
            current: None,
            stage: 0,
            scrolls: 0,
            clicks: 0,
            closed: false,
        }
    }

    pub fn sessions(&self, n: usize) -> Vec<FakeSession> {
        (0..n).map(|_| self.session()).collect()
    }

    /// Every URL navigated to, across all sessions, in call order.
    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    pub fn navigation_count(&self, url: &str) -> usize {
        self.navigations().iter().filter(|u| *u == url).count()
    }
}

#[derive(Debug)]
pub struct FakeSession {
    site: FakeSite,
    current: Option<String>,
    stage: usize,
    scrolls: u64,
    pub clicks: usize,
    closed: bool,
}

impl FakeSession {
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn page(&self) -> Option<&FakePage> {
        self.current.as_ref().and_then(|u| self.site.pages.get(u))
    }

    fn height(&self) -> u64 {
        let growth = self.page().map(|p| p.growth_steps).unwrap_or(0);
        1000 + 100 * self.scrolls.min(growth) + 10_000 * self.stage as u64
    }
}

impl RenderSession for FakeSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        self.site.navigations.lock().unwrap().push(url.to_string());
        self.current = Some(url.to_string());
        self.stage = 0;
        self.scrolls = 0;
        tokio::task::yield_now().await;
        match self.page() {
            Some(page) if !page.times_out => Ok(()),
            Some(_) => Err(SessionError::Timeout {
                url: url.to_string(),
                after: timeout,
            }),
            None => Err(SessionError::Browser(format!("no such page: {url}"))),
        }
    }

    async fn execute_script(&mut self, script: &str) -> Result<Value, SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        tokio::task::yield_now().await;
        let scroll_script = script == SCROLL_HEIGHT_SCRIPT || script == SCROLL_TO_BOTTOM_SCRIPT;
        let broken = self
            .page()
            .and_then(|p| p.scripts_fail_from)
            .is_some_and(|from| self.stage >= from);
        if scroll_script && broken {
            return Err(SessionError::Browser("script evaluation failed".to_string()));
        }
        if script == SCROLL_HEIGHT_SCRIPT {
            return Ok(json!(self.height()));
        }
        if script == SCROLL_TO_BOTTOM_SCRIPT {
            self.scrolls += 1;
            return Ok(json!(self.height()));
        }
        if script.contains("el.click()") {
            let stages = self.page().map(|p| p.stages.len()).unwrap_or(0);
            if self.stage + 1 < stages {
                self.stage += 1;
                self.scrolls = 0;
                self.clicks += 1;
                return Ok(json!(true));
            }
            return Ok(json!(false));
        }
        Ok(Value::Null)
    }

    async fn current_markup(&mut self) -> Result<String, SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        Ok(self
            .page()
            .and_then(|p| p.stages.get(self.stage))
            .cloned()
            .unwrap_or_default())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.closed = true;
        Ok(())
    }
}
