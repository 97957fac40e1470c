//! Browser lifecycle management using Chrome DevTools Protocol

use crate::element::ChromeElement;
use crate::error::Result;
use crate::page::{ElementHandle, PageDriver};
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions, Tab};
use stackprobe_core::{BrowserConfig, Locator, StackError};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Active browser session with Chrome DevTools Protocol
pub struct BrowserSession {
    /// Underlying browser instance; the process exits when this is dropped
    #[allow(dead_code)]
    browser: Browser,
    /// Current active tab
    tab: Arc<Tab>,
}

impl BrowserSession {
    /// Launch a new browser instance
    ///
    /// # Example
    /// ```no_run
    /// use stackprobe_browser::BrowserSession;
    /// use stackprobe_browser::PageDriver;
    /// use stackprobe_core::BrowserConfig;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let session = BrowserSession::launch(&BrowserConfig::default()).await.unwrap();
    ///     session.open("http://10.5.0.20:80/horizon/auth/login/").await.unwrap();
    /// }
    /// ```
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        info!(
            "Launching browser (headless: {}, size: {}x{})",
            config.headless, config.window_width, config.window_height
        );

        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .window_size(Some((config.window_width, config.window_height)))
            .path(config.executable.clone())
            .build()
            .map_err(|e| StackError::Browser(format!("Failed to launch browser: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| StackError::Browser(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| StackError::Browser(format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(Duration::from_secs(config.timeout_seconds));

        info!("Browser launched successfully");

        Ok(Self { browser, tab })
    }

    /// Execute JavaScript in the page context
    async fn evaluate_script(&self, script: &str) -> Result<serde_json::Value> {
        debug!("Evaluating JavaScript: {}", script);

        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| StackError::Browser(format!("JavaScript evaluation failed: {}", e)))?;

        Ok(result.value.unwrap_or(serde_json::Value::Null))
    }
}

/// Script returning how many nodes `locator` matches
///
/// DevTools treats an empty result as an error, so the count is taken
/// first and a real lookup only happens when something matched.
fn count_script(locator: &Locator) -> Result<String> {
    Ok(match locator {
        Locator::XPath(xpath) => format!(
            "document.evaluate({}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null).snapshotLength",
            serde_json::to_string(xpath)?
        ),
        other => {
            let css = other.to_css().unwrap_or_default();
            format!("document.querySelectorAll({}).length", serde_json::to_string(&css)?)
        }
    })
}

#[async_trait]
impl PageDriver for BrowserSession {
    #[instrument(skip(self))]
    async fn open(&self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);

        self.tab
            .navigate_to(url)
            .map_err(|e| StackError::Browser(format!("Failed to navigate to {}: {}", url, e)))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| StackError::Browser(format!("Navigation timeout for {}: {}", url, e)))?;

        info!("Successfully navigated to {}", url);
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let result = self.evaluate_script("window.location.href").await?;
        Ok(result.as_str().unwrap_or("").to_string())
    }

    async fn title(&self) -> Result<String> {
        let result = self.evaluate_script("document.title").await?;
        Ok(result.as_str().unwrap_or("").to_string())
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<Box<dyn ElementHandle>>> {
        let count = self
            .evaluate_script(&count_script(locator)?)
            .await?
            .as_u64()
            .unwrap_or(0);
        if count == 0 {
            return Ok(Vec::new());
        }

        let found = match locator {
            Locator::XPath(xpath) => self.tab.find_elements_by_xpath(xpath),
            other => self.tab.find_elements(&other.to_css().unwrap_or_default()),
        }
        .map_err(|e| StackError::Browser(format!("Failed to look up {}: {}", locator, e)))?;

        debug!("{} matched {} element(s)", locator, found.len());

        Ok(found
            .iter()
            .enumerate()
            .map(|(i, element)| {
                Box::new(ChromeElement::new(
                    Arc::clone(&self.tab),
                    element.node_id,
                    format!("{}#{}", locator, i),
                )) as Box<dyn ElementHandle>
            })
            .collect())
    }

    #[instrument(skip(self, path), fields(path = %path.display()))]
    async fn screenshot(&self, path: &Path) -> Result<()> {
        let png = self
            .tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| StackError::ScreenshotFailed(format!("Screenshot capture failed: {}", e)))?;

        tokio::fs::write(path, &png).await.map_err(|e| {
            StackError::ScreenshotFailed(format!("Failed to write {}: {}", path.display(), e))
        })?;

        info!("Captured screenshot ({} bytes)", png.len());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        info!("Closing browser session");
        self.tab
            .close(false)
            .map_err(|e| StackError::Browser(format!("Failed to close tab: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_script_for_css_locators() {
        let script = count_script(&Locator::id("loginBtn")).unwrap();
        assert_eq!(script, r#"document.querySelectorAll("[id=\"loginBtn\"]").length"#);

        let script = count_script(&Locator::css(".next")).unwrap();
        assert_eq!(script, r#"document.querySelectorAll(".next").length"#);
    }

    #[test]
    fn test_count_script_for_xpath() {
        let script = count_script(&Locator::xpath("//button[@id='x']")).unwrap();
        assert!(script.starts_with(r#"document.evaluate("//button[@id='x']""#));
        assert!(script.ends_with(".snapshotLength"));
    }
}
