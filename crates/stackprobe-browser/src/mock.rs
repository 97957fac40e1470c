//! Scripted page for tests
//!
//! [`MockPage`] keeps a tiny model of a page: which locators match how many
//! elements, which clicks navigate where, and which option lists narrow
//! down as text is typed into their filter input. Every load bumps a
//! generation counter; handles from an older generation are stale.

use crate::error::Result;
use crate::page::{ElementHandle, PageDriver};
use async_trait::async_trait;
use stackprobe_core::{Locator, StackError};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Bytes written by a successful mock screenshot
pub const MOCK_PNG: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Interaction recorded by [`MockPage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageAction {
    Open(String),
    Click(String),
    Type { target: String, text: String },
    Screenshot(PathBuf),
    Close,
}

struct OptionList {
    filter: Locator,
    labels: Vec<String>,
    /// Lookups still answered with the unfiltered list
    lag: u32,
}

#[derive(Default)]
struct MockState {
    location: String,
    scripted_urls: VecDeque<String>,
    url_reads: u32,
    title: String,
    elements: HashMap<Locator, usize>,
    options: HashMap<Locator, OptionList>,
    attributes: HashMap<(Locator, String), String>,
    typed: HashMap<Locator, String>,
    navigations: HashMap<Locator, String>,
    transient_failures: HashMap<Locator, u32>,
    generation: u64,
    actions: Vec<PageAction>,
    screenshot_fails: bool,
    closed: bool,
}

impl MockState {
    fn navigate(&mut self, url: &str) {
        self.location = url.to_string();
        self.generation += 1;
        self.typed.clear();
    }
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// In-memory [`PageDriver`]
#[derive(Default)]
pub struct MockPage {
    state: Arc<Mutex<MockState>>,
}

impl MockPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `current_url` from a queue instead of the tracked location;
    /// the last entry repeats
    pub fn with_urls(self, urls: &[&str]) -> Self {
        lock(&self.state).scripted_urls = urls.iter().map(|u| u.to_string()).collect();
        self
    }

    pub fn with_title(self, title: &str) -> Self {
        lock(&self.state).title = title.to_string();
        self
    }

    /// `locator` matches a single element
    pub fn with_element(self, locator: Locator) -> Self {
        self.with_elements(locator, 1)
    }

    pub fn with_elements(self, locator: Locator, count: usize) -> Self {
        lock(&self.state).elements.insert(locator, count);
        self
    }

    pub fn with_attribute(self, locator: Locator, name: &str, value: &str) -> Self {
        lock(&self.state)
            .attributes
            .insert((locator, name.to_string()), value.to_string());
        self
    }

    /// `options` matches one element per label containing the text typed
    /// into `filter` so far
    pub fn with_options(self, options: Locator, filter: Locator, labels: &[&str]) -> Self {
        {
            let mut state = lock(&self.state);
            state.elements.insert(filter.clone(), 1);
            state.options.insert(
                options,
                OptionList {
                    filter,
                    labels: labels.iter().map(|l| l.to_string()).collect(),
                    lag: 0,
                },
            );
        }
        self
    }

    /// The next `lookups` lookups of `options` ignore the filter, like a
    /// table that re-renders late
    pub fn with_filter_lag(self, options: &Locator, lookups: u32) -> Self {
        if let Some(list) = lock(&self.state).options.get_mut(options) {
            list.lag = lookups;
        }
        self
    }

    /// Clicking `locator` loads `url`
    pub fn with_navigation(self, locator: Locator, url: &str) -> Self {
        lock(&self.state).navigations.insert(locator, url.to_string());
        self
    }

    /// The first `count` interactions with `locator` fail as not interactable
    pub fn with_transient_failures(self, locator: Locator, count: u32) -> Self {
        lock(&self.state).transient_failures.insert(locator, count);
        self
    }

    pub fn with_screenshot_failure(self) -> Self {
        lock(&self.state).screenshot_fails = true;
        self
    }

    pub fn actions(&self) -> Vec<PageAction> {
        lock(&self.state).actions.clone()
    }

    /// Descriptions of every clicked element, in order
    pub fn clicks(&self) -> Vec<String> {
        self.actions()
            .into_iter()
            .filter_map(|a| match a {
                PageAction::Click(target) => Some(target),
                _ => None,
            })
            .collect()
    }

    pub fn url_reads(&self) -> u32 {
        lock(&self.state).url_reads
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    fn handle(&self, locator: &Locator, label: Option<String>, generation: u64) -> Box<dyn ElementHandle> {
        Box::new(MockElement {
            state: Arc::clone(&self.state),
            locator: locator.clone(),
            label,
            generation,
        })
    }
}

#[async_trait]
impl PageDriver for MockPage {
    async fn open(&self, url: &str) -> Result<()> {
        let mut state = lock(&self.state);
        if state.closed {
            return Err(StackError::Browser("page is closed".to_string()));
        }
        state.actions.push(PageAction::Open(url.to_string()));
        state.navigate(url);
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let mut state = lock(&self.state);
        state.url_reads += 1;
        let url = if state.scripted_urls.len() > 1 {
            state.scripted_urls.pop_front()
        } else {
            state.scripted_urls.front().cloned()
        };
        Ok(url.unwrap_or_else(|| state.location.clone()))
    }

    async fn title(&self) -> Result<String> {
        Ok(lock(&self.state).title.clone())
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<Box<dyn ElementHandle>>> {
        let (generation, labels, count) = {
            let mut guard = lock(&self.state);
            let state = &mut *guard;
            if state.closed {
                return Err(StackError::Browser("page is closed".to_string()));
            }
            let labels = state.options.get_mut(locator).map(|list| {
                let mut typed = state.typed.get(&list.filter).cloned().unwrap_or_default();
                if list.lag > 0 {
                    list.lag -= 1;
                    typed.clear();
                }
                list.labels
                    .iter()
                    .filter(|label| label.contains(typed.as_str()))
                    .cloned()
                    .collect::<Vec<_>>()
            });
            let count = state.elements.get(locator).copied().unwrap_or(0);
            (state.generation, labels, count)
        };

        Ok(match labels {
            Some(labels) => labels
                .into_iter()
                .map(|label| self.handle(locator, Some(label), generation))
                .collect(),
            None => (0..count)
                .map(|i| {
                    let label = (count > 1).then(|| i.to_string());
                    self.handle(locator, label, generation)
                })
                .collect(),
        })
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        let fails = {
            let mut state = lock(&self.state);
            state.actions.push(PageAction::Screenshot(path.to_path_buf()));
            state.screenshot_fails
        };
        if fails {
            return Err(StackError::ScreenshotFailed("mock screenshot failure".to_string()));
        }
        tokio::fs::write(path, MOCK_PNG).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut state = lock(&self.state);
        state.closed = true;
        state.actions.push(PageAction::Close);
        Ok(())
    }
}

/// Handle produced by [`MockPage::find_elements`]
pub struct MockElement {
    state: Arc<Mutex<MockState>>,
    locator: Locator,
    label: Option<String>,
    generation: u64,
}

impl MockElement {
    /// Fails if the page moved on or the element is not interactable yet
    fn check(&self, state: &mut MockState) -> Result<()> {
        if state.generation != self.generation || state.closed {
            return Err(StackError::StaleElement(self.describe()));
        }
        if let Some(remaining) = state.transient_failures.get_mut(&self.locator) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StackError::ElementNotInteractable(self.describe()));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ElementHandle for MockElement {
    async fn click(&self) -> Result<()> {
        let mut state = lock(&self.state);
        self.check(&mut state)?;
        state.actions.push(PageAction::Click(self.describe()));
        if let Some(url) = state.navigations.get(&self.locator).cloned() {
            state.navigate(&url);
        }
        Ok(())
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        let mut state = lock(&self.state);
        self.check(&mut state)?;
        state.actions.push(PageAction::Type {
            target: self.describe(),
            text: text.to_string(),
        });
        state
            .typed
            .entry(self.locator.clone())
            .or_default()
            .push_str(text);
        Ok(())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        let state = lock(&self.state);
        if state.generation != self.generation {
            return Err(StackError::StaleElement(self.describe()));
        }
        Ok(state
            .attributes
            .get(&(self.locator.clone(), name.to_string()))
            .cloned())
    }

    fn describe(&self) -> String {
        match &self.label {
            Some(label) => format!("{}[{}]", self.locator, label),
            None => self.locator.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handle_goes_stale_after_navigation() {
        let next = Locator::css(".next");
        let page = MockPage::new()
            .with_element(next.clone())
            .with_navigation(next.clone(), "http://h/horizon/project/");

        let element = page.find_elements(&next).await.unwrap().remove(0);
        element.click().await.unwrap();

        let err = element.click().await.unwrap_err();
        assert!(matches!(err, StackError::StaleElement(_)));
        assert_eq!(page.current_url().await.unwrap(), "http://h/horizon/project/");
    }

    #[tokio::test]
    async fn test_options_narrow_as_filter_is_typed() {
        let options = Locator::css("tr .btn");
        let filter = Locator::css("input.search-input");
        let page = MockPage::new().with_options(
            options.clone(),
            filter.clone(),
            &["m1.tiny", "m1.small", "m1.medium"],
        );

        assert_eq!(page.find_elements(&options).await.unwrap().len(), 3);

        let input = page.find_elements(&filter).await.unwrap().remove(0);
        input.send_text("m1.s").await.unwrap();

        let narrowed = page.find_elements(&options).await.unwrap();
        assert_eq!(narrowed.len(), 1);
        assert_eq!(narrowed[0].describe(), "css=tr .btn[m1.small]");
    }

    #[tokio::test]
    async fn test_filter_lag_delays_narrowing() {
        let options = Locator::css("tr .btn");
        let filter = Locator::css("input.search-input");
        let page = MockPage::new()
            .with_options(options.clone(), filter.clone(), &["cirros", "focal"])
            .with_filter_lag(&options, 1);

        let input = page.find_elements(&filter).await.unwrap().remove(0);
        input.send_text("cirros").await.unwrap();

        assert_eq!(page.find_elements(&options).await.unwrap().len(), 2);
        assert_eq!(page.find_elements(&options).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transient_failures_are_consumed() {
        let launch = Locator::css(".finish");
        let page = MockPage::new()
            .with_element(launch.clone())
            .with_transient_failures(launch.clone(), 1);

        let element = page.find_elements(&launch).await.unwrap().remove(0);
        assert!(element.click().await.unwrap_err().is_transient());
        element.click().await.unwrap();
        assert_eq!(page.clicks(), vec!["css=.finish".to_string()]);
    }

    #[tokio::test]
    async fn test_attribute_lookup() {
        let name = Locator::id("name");
        let page = MockPage::new()
            .with_element(name.clone())
            .with_attribute(name.clone(), "placeholder", "Instance Name");

        let element = page.find_elements(&name).await.unwrap().remove(0);
        assert_eq!(
            element.attribute("placeholder").await.unwrap().as_deref(),
            Some("Instance Name")
        );
        assert_eq!(element.attribute("value").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_screenshot_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        let page = MockPage::new();

        page.screenshot(&path).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), MOCK_PNG);
    }
}
