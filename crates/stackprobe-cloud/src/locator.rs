//! Dashboard host lookup

use async_trait::async_trait;
use stackprobe_core::{Result, StackError};
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Resolves the address the dashboard is served from
#[async_trait]
pub trait DashboardLocator: Send + Sync {
    async fn dashboard_host(&self) -> Result<String>;
}

/// Host given on the command line
#[derive(Debug, Clone)]
pub struct StaticHost(pub String);

#[async_trait]
impl DashboardLocator for StaticHost {
    async fn dashboard_host(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Asks juju where the dashboard application unit lives
#[derive(Debug, Clone)]
pub struct JujuLocator {
    juju: PathBuf,
    application: String,
}

impl JujuLocator {
    pub fn new(juju: impl Into<PathBuf>, application: impl Into<String>) -> Self {
        Self {
            juju: juju.into(),
            application: application.into(),
        }
    }
}

#[async_trait]
impl DashboardLocator for JujuLocator {
    #[instrument(skip(self), fields(application = %self.application))]
    async fn dashboard_host(&self) -> Result<String> {
        let output = Command::new(&self.juju)
            .args(["status", self.application.as_str(), "--format", "oneline"])
            .output()
            .await
            .map_err(|e| {
                StackError::ControlPlane(format!("Failed to run {}: {}", self.juju.display(), e))
            })?;

        if !output.status.success() {
            return Err(StackError::ControlPlane(format!(
                "juju status failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!("juju status: {}", stdout.trim());
        parse_oneline_address(&stdout, &self.application)
    }
}

/// Third field of `juju status --format oneline`
///
/// `- openstack-dashboard/0: 10.5.0.20 (agent:idle, workload:active)`
pub fn parse_oneline_address(output: &str, application: &str) -> Result<String> {
    output
        .split_whitespace()
        .nth(2)
        .map(str::to_string)
        .ok_or_else(|| {
            StackError::ResourceNotFound(format!("address of application '{}'", application))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_oneline_address() {
        let out = "\n- openstack-dashboard/0: 10.5.0.20 (agent:idle, workload:active)\n";
        assert_eq!(
            parse_oneline_address(out, "openstack-dashboard").unwrap(),
            "10.5.0.20"
        );
    }

    #[test]
    fn test_parse_empty_status() {
        let err = parse_oneline_address("\n", "openstack-dashboard").unwrap_err();
        assert!(matches!(err, StackError::ResourceNotFound(_)));
    }

    #[tokio::test]
    async fn test_static_host() {
        let locator = StaticHost("horizon.example".to_string());
        assert_eq!(locator.dashboard_host().await.unwrap(), "horizon.example");
    }

    #[tokio::test]
    async fn test_missing_juju_binary() {
        let locator = JujuLocator::new("/nonexistent/juju", "openstack-dashboard");
        let err = locator.dashboard_host().await.unwrap_err();
        assert!(matches!(err, StackError::ControlPlane(_)));
    }
}
