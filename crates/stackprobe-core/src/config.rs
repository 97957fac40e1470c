//! Configuration management for stackprobe
//!
//! Every knob has a default matching a stock Horizon/Nova/Neutron
//! deployment, so the file is optional. Credentials are not stored here;
//! they come from the `OS_*` environment.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::RetryPolicy;
use crate::types::Locator;
use crate::wait::WaitPolicy;
use crate::{Result, StackError};

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "stackprobe.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackConfig {
    /// Readiness wait budgets
    #[serde(default)]
    pub wait: WaitConfig,

    /// Retry policy for interactive UI actions
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Browser launch settings
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Horizon dashboard layout
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// Control plane and probe settings
    #[serde(default)]
    pub cloud: CloudConfig,
}

/// Wait budgets per kind of readiness
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitConfig {
    /// Page transitions in the dashboard
    #[serde(default = "default_page_wait")]
    pub page: WaitPolicy,

    /// Server reaching the expected status
    #[serde(default)]
    pub status: WaitPolicy,

    /// Server finishing its boot (console marker)
    #[serde(default)]
    pub boot: WaitPolicy,
}

fn default_page_wait() -> WaitPolicy {
    // 10 seconds at 500 ms per poll
    WaitPolicy::fixed(Duration::from_millis(500), 20)
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            page: default_page_wait(),
            status: WaitPolicy::default(),
            boot: WaitPolicy::default(),
        }
    }
}

/// Configuration for browser launch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Run in headless mode (default: true)
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Browser window width
    #[serde(default = "default_window_width")]
    pub window_width: u32,

    /// Browser window height
    #[serde(default = "default_window_height")]
    pub window_height: u32,

    /// Browser executable; auto-detected when unset
    #[serde(default)]
    pub executable: Option<PathBuf>,

    /// Navigation timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_true() -> bool {
    true
}

fn default_window_width() -> u32 {
    1124
}

fn default_window_height() -> u32 {
    850
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: default_window_width(),
            window_height: default_window_height(),
            executable: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Horizon dashboard layout and expectations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Base URL, `{host}` is replaced by the dashboard address
    #[serde(default = "default_url_template")]
    pub url_template: String,

    /// Title of the page shown after a successful login
    #[serde(default = "default_main_page_title")]
    pub main_page_title: String,

    /// Where the diagnostic screenshot goes when a run fails
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    #[serde(default)]
    pub login: LoginLocators,

    #[serde(default)]
    pub wizard: WizardLocators,

    /// Wizard sections in the order they are visited
    #[serde(default = "default_sections")]
    pub sections: Vec<SectionConfig>,
}

fn default_url_template() -> String {
    "http://{host}:80/horizon".to_string()
}

fn default_main_page_title() -> String {
    "Projects - OpenStack Dashboard".to_string()
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("/tmp/screenshot.png")
}

fn default_sections() -> Vec<SectionConfig> {
    vec![
        SectionConfig {
            name: "image".to_string(),
            default_choice: Locator::css(
                ".ng-scope:nth-child(1) > .actions_column:nth-child(7) .btn:nth-child(1)",
            ),
            filter: Locator::css("[ng-form=\"launchInstanceSourceForm\"] input.search-input"),
            options: Locator::css(
                "[ng-form=\"launchInstanceSourceForm\"] available tr.ng-scope td.actions_column .btn",
            ),
            advance: true,
        },
        SectionConfig {
            name: "flavor".to_string(),
            default_choice: Locator::css(".btn-sm"),
            filter: Locator::css("[ng-form=\"launchInstanceFlavorForm\"] input.search-input"),
            options: Locator::css(
                "[ng-form=\"launchInstanceFlavorForm\"] available tr.ng-scope td.actions_column .btn",
            ),
            advance: true,
        },
        SectionConfig {
            name: "network".to_string(),
            default_choice: Locator::css(
                "td.actions_column > action-list.ng-isolate-scope.btn-group > button.btn.btn-default",
            ),
            filter: Locator::css("[ng-form=\"launchInstanceNetworkForm\"] input.search-input"),
            options: Locator::css(
                "[ng-form=\"launchInstanceNetworkForm\"] available tr.ng-scope td.actions_column .btn",
            ),
            advance: false,
        },
    ]
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            url_template: default_url_template(),
            main_page_title: default_main_page_title(),
            snapshot_path: default_snapshot_path(),
            login: LoginLocators::default(),
            wizard: WizardLocators::default(),
            sections: default_sections(),
        }
    }
}

impl DashboardConfig {
    /// Dashboard base URL for a host, without trailing slash
    pub fn dashboard_url(&self, host: &str) -> String {
        self.url_template
            .replace("{host}", host)
            .trim_end_matches('/')
            .to_string()
    }

    pub fn section(&self, name: &str) -> Option<&SectionConfig> {
        self.sections.iter().find(|s| s.name == name)
    }
}

/// Login form controls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginLocators {
    pub username: Locator,
    pub password: Locator,
    pub domain: Locator,
    pub submit: Locator,
}

impl Default for LoginLocators {
    fn default() -> Self {
        Self {
            username: Locator::name("username"),
            password: Locator::name("password"),
            domain: Locator::name("domain"),
            submit: Locator::id("loginBtn"),
        }
    }
}

/// Launch-instance wizard controls outside the selectable sections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardLocators {
    pub open: Locator,
    pub instance_name: Locator,
    pub next: Locator,
    pub launch: Locator,
}

impl Default for WizardLocators {
    fn default() -> Self {
        Self {
            open: Locator::id("instances__action_launch-ng"),
            instance_name: Locator::id("name"),
            next: Locator::css(".next"),
            launch: Locator::css(".finish"),
        }
    }
}

/// One selectable wizard section (image, flavor, network...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionConfig {
    pub name: String,

    /// Button picked when no selection value is given
    pub default_choice: Locator,

    /// Text box that narrows the available list
    pub filter: Locator,

    /// Selection buttons left in the available list
    pub options: Locator,

    /// Click "Next" once the section is done
    #[serde(default = "default_true")]
    pub advance: bool,
}

/// Control plane and connectivity probe settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    /// Network floating addresses are allocated from
    #[serde(default = "default_external_network")]
    pub external_network: String,

    /// Login user for the SSH probe
    #[serde(default = "default_ssh_user")]
    pub ssh_user: String,

    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,

    /// Command run over SSH; its output must equal the VM name
    #[serde(default = "default_ssh_command")]
    pub ssh_command: String,

    /// Console text that marks a finished boot, `{vm}` is the VM name
    #[serde(default = "default_boot_marker")]
    pub boot_marker: String,

    /// Echo requests sent by the reachability probe
    #[serde(default = "default_ping_count")]
    pub ping_count: u32,

    /// Seconds to wait for each echo reply
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_secs: u32,

    /// Command used to look up the dashboard address
    #[serde(default = "default_juju_path")]
    pub juju_path: PathBuf,

    /// Application name of the dashboard in the model
    #[serde(default = "default_dashboard_application")]
    pub dashboard_application: String,

    /// Deadline for a single control plane HTTP request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_external_network() -> String {
    "ext_net".to_string()
}

fn default_ssh_user() -> String {
    "ubuntu".to_string()
}

fn default_ssh_port() -> u16 {
    22
}

fn default_ssh_command() -> String {
    "uname -n".to_string()
}

fn default_boot_marker() -> String {
    "{vm} console".to_string()
}

fn default_ping_count() -> u32 {
    1
}

fn default_ping_timeout() -> u32 {
    1
}

fn default_juju_path() -> PathBuf {
    PathBuf::from("/snap/bin/juju")
}

fn default_dashboard_application() -> String {
    "openstack-dashboard".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            external_network: default_external_network(),
            ssh_user: default_ssh_user(),
            ssh_port: default_ssh_port(),
            ssh_command: default_ssh_command(),
            boot_marker: default_boot_marker(),
            ping_count: default_ping_count(),
            ping_timeout_secs: default_ping_timeout(),
            juju_path: default_juju_path(),
            dashboard_application: default_dashboard_application(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl CloudConfig {
    /// Boot marker for a specific VM
    pub fn boot_marker_for(&self, vm_name: &str) -> String {
        self.boot_marker.replace("{vm}", vm_name)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl StackConfig {
    /// Load configuration from `path` or use defaults when it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content).map_err(|e| {
                StackError::Config(format!("Failed to parse {}: {}", path.display(), e))
            })?
        } else {
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Write the default configuration to `path`
    pub fn write_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| StackError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings that cannot work before any side effect happens
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(StackError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }

        for (name, policy) in [
            ("page", &self.wait.page),
            ("status", &self.wait.status),
            ("boot", &self.wait.boot),
        ] {
            if policy.max_polls == 0 {
                return Err(StackError::Config(format!(
                    "wait.{}.max_polls must be at least 1",
                    name
                )));
            }
        }

        if !self.dashboard.url_template.contains("{host}") {
            return Err(StackError::Config(
                "dashboard.url_template must contain {host}".to_string(),
            ));
        }

        if self.cloud.request_timeout_secs == 0 {
            return Err(StackError::Config(
                "cloud.request_timeout_secs must be at least 1".to_string(),
            ));
        }

        if self.dashboard.snapshot_path.as_os_str().is_empty() {
            return Err(StackError::Config(
                "dashboard.snapshot_path must not be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for section in &self.dashboard.sections {
            if !seen.insert(section.name.as_str()) {
                return Err(StackError::Config(format!(
                    "duplicate dashboard section '{}'",
                    section.name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = StackConfig::default();
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.wait.page.max_polls, 20);
        assert_eq!(config.browser.window_width, 1124);
        assert_eq!(config.browser.window_height, 850);
        assert_eq!(config.dashboard.snapshot_path, PathBuf::from("/tmp/screenshot.png"));
        assert_eq!(config.cloud.external_network, "ext_net");

        let names: Vec<_> = config.dashboard.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["image", "flavor", "network"]);
        assert!(!config.dashboard.section("network").unwrap().advance);
    }

    #[test]
    fn test_dashboard_url() {
        let config = DashboardConfig::default();
        assert_eq!(config.dashboard_url("10.5.0.20"), "http://10.5.0.20:80/horizon");
    }

    #[test]
    fn test_boot_marker_for() {
        let config = CloudConfig::default();
        assert_eq!(config.boot_marker_for("test-vm"), "test-vm console");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = StackConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.dashboard.main_page_title, "Projects - OpenStack Dashboard");
    }

    #[test]
    fn test_load_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stackprobe.toml");
        std::fs::write(
            &path,
            r#"
[retry]
backoff_ms = 10

[dashboard]
snapshot_path = "/var/tmp/failure.png"

[cloud]
external_network = "public"
"#,
        )
        .unwrap();

        let config = StackConfig::load_or_default(&path).unwrap();
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.backoff_ms, 10);
        assert_eq!(config.dashboard.snapshot_path, PathBuf::from("/var/tmp/failure.png"));
        assert_eq!(config.dashboard.sections.len(), 3);
        assert_eq!(config.cloud.external_network, "public");
        assert_eq!(config.cloud.ssh_user, "ubuntu");
    }

    #[test]
    fn test_write_default_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/stackprobe.toml");
        StackConfig::write_default(&path).unwrap();

        let config = StackConfig::load_or_default(&path).unwrap();
        assert_eq!(config.dashboard.sections, DashboardConfig::default().sections);
    }

    #[test]
    fn test_zero_request_timeout_is_rejected() {
        let mut config = StackConfig::default();
        assert_eq!(config.cloud.request_timeout(), Duration::from_secs(30));

        config.cloud.request_timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, StackError::Config(ref msg) if msg.contains("request_timeout_secs")));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[retry\nmax_attempts = ").unwrap();

        let err = StackConfig::load_or_default(&path).unwrap_err();
        assert!(matches!(err, StackError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = StackConfig::default();
        config.retry.max_attempts = 0;
        assert!(matches!(config.validate(), Err(StackError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_duplicate_sections() {
        let mut config = StackConfig::default();
        let flavor = config.dashboard.section("flavor").unwrap().clone();
        config.dashboard.sections.push(flavor);
        assert!(matches!(config.validate(), Err(StackError::Config(_))));
    }
}
