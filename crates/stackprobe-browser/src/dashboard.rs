//! Horizon dashboard check
//!
//! Logs in, opens the compute page and walks the launch-instance wizard.
//! Wizard sections are either taken as-is (their first row) or narrowed
//! with a filter when the caller names the option to pick.

use serde::Serialize;
use stackprobe_core::best_effort::best_effort;
use stackprobe_core::{
    DashboardConfig, Locator, Readiness, ReadinessWaiter, Result, SectionConfig, StackConfig,
    StackError,
};
use std::collections::HashMap;
use tracing::{debug, info, info_span, Instrument};

use crate::navigation::{wait_for_element, wait_for_page_change};
use crate::page::{ElementHandle, PageDriver};
use crate::screenshot::capture_diagnostic;
use crate::verification::assert_title;

/// Login form input
#[derive(Clone)]
pub struct DashboardLogin {
    pub username: String,
    pub password: String,
    pub domain: String,
}

impl std::fmt::Debug for DashboardLogin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardLogin")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("domain", &self.domain)
            .finish()
    }
}

/// The instance to launch through the wizard
#[derive(Debug, Clone, Default)]
pub struct LaunchRequest {
    pub instance_name: String,
    selections: HashMap<String, String>,
}

impl LaunchRequest {
    pub fn new(instance_name: impl Into<String>) -> Self {
        Self {
            instance_name: instance_name.into(),
            selections: HashMap::new(),
        }
    }

    /// Pick the option of `section` whose row matches `value`
    pub fn select(mut self, section: impl Into<String>, value: impl Into<String>) -> Self {
        self.selections.insert(section.into(), value.into());
        self
    }

    pub fn selection(&self, section: &str) -> Option<&str> {
        self.selections.get(section).map(String::as_str)
    }

    /// Every selection must name a configured wizard section
    pub fn check_sections(&self, dashboard: &DashboardConfig) -> Result<()> {
        let mut unknown: Vec<&str> = self
            .selections
            .keys()
            .map(String::as_str)
            .filter(|name| dashboard.section(name).is_none())
            .collect();
        if unknown.is_empty() {
            return Ok(());
        }
        unknown.sort_unstable();
        Err(StackError::Config(format!(
            "no wizard section named {} (configured: {})",
            unknown.join(", "),
            dashboard
                .sections
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }
}

/// Option picked for one wizard section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionChoice {
    pub section: String,
    /// Value typed into the filter, if any
    pub filter: Option<String>,
    pub element: String,
}

/// What a successful check did
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub dashboard_url: String,
    pub instance_name: String,
    pub choices: Vec<SectionChoice>,
}

/// Drives one dashboard check against a page
pub struct DashboardCheck<'a> {
    page: &'a dyn PageDriver,
    config: &'a StackConfig,
    base_url: String,
    page_wait: ReadinessWaiter,
}

impl<'a> DashboardCheck<'a> {
    pub fn new(page: &'a dyn PageDriver, config: &'a StackConfig, host: &str) -> Self {
        Self {
            page,
            config,
            base_url: config.dashboard.dashboard_url(host),
            page_wait: ReadinessWaiter::new(config.wait.page.clone()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn login_url(&self) -> String {
        format!("{}/auth/login/", self.base_url)
    }

    pub fn instances_url(&self) -> String {
        format!("{}/project/instances/", self.base_url)
    }

    /// Run the check; on failure save a screenshot, and close the page either way
    ///
    /// A request rejected before the page was touched gets no screenshot.
    pub async fn run_and_release(
        &self,
        login: &DashboardLogin,
        request: &LaunchRequest,
    ) -> Result<DashboardReport> {
        let result = self.run(login, request).await;

        if let Err(e @ StackError::Config(_)) = &result {
            info!("Dashboard check not started: {}", e);
        } else if let Err(e) = &result {
            info!("Dashboard check failed ({}), saving screenshot", e);
            let path = &self.config.dashboard.snapshot_path;
            best_effort("diagnostic screenshot", capture_diagnostic(self.page, path)).await;
        }
        best_effort("browser close", self.page.close()).await;

        result
    }

    /// Run the check
    pub async fn run(&self, login: &DashboardLogin, request: &LaunchRequest) -> Result<DashboardReport> {
        let span = info_span!("dashboard", url = %self.base_url, user = %login.username);
        async {
            request.check_sections(&self.config.dashboard)?;
            self.login(login).await?;
            self.navigate_to_compute().await?;
            let choices = self.launch_instance(request).await?;
            Ok(DashboardReport {
                dashboard_url: self.base_url.clone(),
                instance_name: request.instance_name.clone(),
                choices,
            })
        }
        .instrument(span)
        .await
    }

    /// Submit the login form and check the landing page title
    pub async fn login(&self, login: &DashboardLogin) -> Result<()> {
        let locators = &self.config.dashboard.login;
        info!("Logging in as {}", login.username);

        self.page.open(&self.login_url()).await?;
        self.type_into("username", &locators.username, &login.username).await?;
        self.type_into("password", &locators.password, &login.password).await?;
        self.type_into("domain", &locators.domain, &login.domain).await?;

        let before = self.page.current_url().await?;
        self.click("login", &locators.submit).await?;
        let after = wait_for_page_change(self.page, &before, &self.page_wait).await?;
        debug!("Landed on {}", after);

        assert_title(self.page, &self.config.dashboard.main_page_title).await
    }

    pub async fn navigate_to_compute(&self) -> Result<()> {
        info!("Opening compute page");
        self.page.open(&self.instances_url()).await
    }

    /// Walk the launch wizard and press Launch
    pub async fn launch_instance(&self, request: &LaunchRequest) -> Result<Vec<SectionChoice>> {
        let wizard = &self.config.dashboard.wizard;
        info!("Launching instance {}", request.instance_name);

        self.click("launch instance", &wizard.open).await?;
        self.type_into("instance name", &wizard.instance_name, &request.instance_name)
            .await?;
        self.click("next", &wizard.next).await?;

        let mut choices = Vec::with_capacity(self.config.dashboard.sections.len());
        for section in &self.config.dashboard.sections {
            let choice = self.choose(section, request.selection(&section.name)).await?;
            debug!("{}: picked {}", section.name, choice.element);
            choices.push(choice);

            if section.advance {
                self.click("next", &wizard.next).await?;
            }
        }

        self.click("launch", &wizard.launch).await?;
        info!("Launch submitted for {}", request.instance_name);
        Ok(choices)
    }

    async fn choose(&self, section: &SectionConfig, value: Option<&str>) -> Result<SectionChoice> {
        let option = match value {
            None => {
                info!("Selecting default {}", section.name);
                wait_for_element(self.page, &section.default_choice, &self.page_wait).await?
            }
            Some(value) => {
                info!("Selecting {} {}", section.name, value);
                self.type_into(&format!("{} filter", section.name), &section.filter, value)
                    .await?;
                self.single_option(section, value).await?
            }
        };

        let element = &*option;
        self.config
            .retry
            .run_transient(&format!("select {}", section.name), move || element.click())
            .await?;

        Ok(SectionChoice {
            section: section.name.clone(),
            filter: value.map(str::to_string),
            element: element.describe(),
        })
    }

    /// Wait for the filtered option list to settle on exactly one row
    async fn single_option(&self, section: &SectionConfig, value: &str) -> Result<Box<dyn ElementHandle>> {
        let page = self.page;
        let options = &section.options;
        let what = format!("single {} option matching '{}'", section.name, value);

        let result = self
            .page_wait
            .until(&what, move || async move {
                let mut found = page.find_elements(options).await?;
                let count = found.len();
                Ok(match (count, found.pop()) {
                    (1, Some(only)) => Readiness::Ready(only),
                    _ => Readiness::NotReady(format!("{} options", count)),
                })
            })
            .await;

        match result {
            Err(StackError::Timeout { .. }) => {
                // The list may have settled between the last poll and now
                let mut found = page.find_elements(options).await?;
                match (found.len(), found.pop()) {
                    (1, Some(only)) => Ok(only),
                    (0, _) => Err(StackError::NoMatchingOption {
                        section: section.name.clone(),
                        value: value.to_string(),
                    }),
                    (count, _) => Err(StackError::AmbiguousOption {
                        section: section.name.clone(),
                        value: value.to_string(),
                        count,
                    }),
                }
            }
            other => other,
        }
    }

    async fn click(&self, what: &str, locator: &Locator) -> Result<()> {
        debug!("Clicking {} ({})", what, locator);
        let element = wait_for_element(self.page, locator, &self.page_wait).await?;
        let element = &*element;
        self.config
            .retry
            .run_transient(&format!("click {}", what), move || element.click())
            .await
    }

    async fn type_into(&self, what: &str, locator: &Locator, text: &str) -> Result<()> {
        debug!("Filling {} ({})", what, locator);
        let element = wait_for_element(self.page, locator, &self.page_wait).await?;
        let element = &*element;
        self.config
            .retry
            .run_transient(&format!("type {}", what), move || element.send_text(text))
            .await
    }
}
