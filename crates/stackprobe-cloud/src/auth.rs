//! Credentials for the OpenStack identity service
//!
//! Read from the standard `OS_*` environment variables that an openrc file
//! exports.

use stackprobe_core::{Result, StackError};
use std::env;

/// Password credentials scoped to a project
#[derive(Clone)]
pub struct Credentials {
    pub auth_url: String,
    pub username: String,
    pub password: String,
    pub project_name: String,
    pub user_domain_name: String,
    pub project_domain_name: String,
    /// Only endpoints of this region are used, any region when unset
    pub region: Option<String>,
    /// Endpoint interface (public, internal, admin)
    pub interface: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("auth_url", &self.auth_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("project_name", &self.project_name)
            .field("user_domain_name", &self.user_domain_name)
            .field("project_domain_name", &self.project_domain_name)
            .field("region", &self.region)
            .field("interface", &self.interface)
            .finish()
    }
}

fn required(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(StackError::Config(format!(
            "{} is not set; source an openrc file first",
            name
        ))),
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

impl Credentials {
    /// Load credentials from the environment
    ///
    /// Required: `OS_AUTH_URL`, `OS_USERNAME`, `OS_PASSWORD`,
    /// `OS_PROJECT_NAME`. Domains default to `Default` (falling back to
    /// `OS_DOMAIN_NAME` first), interface to `public`.
    pub fn from_env() -> Result<Self> {
        let domain = optional("OS_DOMAIN_NAME");
        let default_domain = || domain.clone().unwrap_or_else(|| "Default".to_string());

        let credentials = Self {
            auth_url: required("OS_AUTH_URL")?,
            username: required("OS_USERNAME")?,
            password: required("OS_PASSWORD")?,
            project_name: optional("OS_PROJECT_NAME")
                .or_else(|| optional("OS_TENANT_NAME"))
                .ok_or_else(|| {
                    StackError::Config(
                        "OS_PROJECT_NAME is not set; source an openrc file first".to_string(),
                    )
                })?,
            user_domain_name: optional("OS_USER_DOMAIN_NAME").unwrap_or_else(default_domain),
            project_domain_name: optional("OS_PROJECT_DOMAIN_NAME").unwrap_or_else(default_domain),
            region: optional("OS_REGION_NAME"),
            interface: optional("OS_INTERFACE")
                .map(|i| i.trim_end_matches("URL").to_lowercase())
                .unwrap_or_else(|| "public".to_string()),
        };

        tracing::info!(
            "Using OpenStack credentials for {}@{} ({})",
            credentials.username,
            credentials.project_name,
            credentials.auth_url
        );
        Ok(credentials)
    }

    /// Identity v3 base URL, whatever form `OS_AUTH_URL` used
    pub fn identity_url(&self) -> String {
        let base = self.auth_url.trim_end_matches('/');
        if base.ends_with("/v3") {
            base.to_string()
        } else {
            format!("{}/v3", base)
        }
    }
}
