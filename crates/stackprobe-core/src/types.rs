//! Core type definitions shared by the checks

use serde::{Deserialize, Serialize};

/// Compute server status as reported by the control plane
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServerStatus {
    Active,
    Build,
    Rebuild,
    Reboot,
    Shutoff,
    Suspended,
    Paused,
    Error,
    Deleted,
    /// Anything this crate has no name for
    Other(String),
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Build => write!(f, "BUILD"),
            Self::Rebuild => write!(f, "REBUILD"),
            Self::Reboot => write!(f, "REBOOT"),
            Self::Shutoff => write!(f, "SHUTOFF"),
            Self::Suspended => write!(f, "SUSPENDED"),
            Self::Paused => write!(f, "PAUSED"),
            Self::Error => write!(f, "ERROR"),
            Self::Deleted => write!(f, "DELETED"),
            Self::Other(s) => write!(f, "{}", s),
        }
    }
}

impl std::str::FromStr for ServerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s.to_uppercase().as_str() {
            "ACTIVE" => Self::Active,
            "BUILD" => Self::Build,
            "REBUILD" => Self::Rebuild,
            "REBOOT" | "HARD_REBOOT" => Self::Reboot,
            "SHUTOFF" => Self::Shutoff,
            "SUSPENDED" => Self::Suspended,
            "PAUSED" => Self::Paused,
            "ERROR" => Self::Error,
            "DELETED" => Self::Deleted,
            "" => return Err("Empty server status".to_string()),
            other => Self::Other(other.to_string()),
        };
        Ok(status)
    }
}

/// A compute server resolved by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub id: String,
    pub name: String,
}

/// How to find an element on the current page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "lowercase")]
pub enum Locator {
    /// `name` attribute
    Name(String),
    /// `id` attribute
    Id(String),
    /// CSS selector
    Css(String),
    /// XPath expression
    XPath(String),
}

impl Locator {
    pub fn name(value: impl Into<String>) -> Self {
        Self::Name(value.into())
    }

    pub fn id(value: impl Into<String>) -> Self {
        Self::Id(value.into())
    }

    pub fn css(value: impl Into<String>) -> Self {
        Self::Css(value.into())
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Self::XPath(value.into())
    }

    /// CSS selector equivalent, `None` for XPath
    pub fn to_css(&self) -> Option<String> {
        match self {
            Self::Name(v) => Some(format!("[name=\"{}\"]", v)),
            Self::Id(v) => Some(format!("[id=\"{}\"]", v)),
            Self::Css(v) => Some(v.clone()),
            Self::XPath(_) => None,
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name(v) => write!(f, "name={}", v),
            Self::Id(v) => write!(f, "id={}", v),
            Self::Css(v) => write!(f, "css={}", v),
            Self::XPath(v) => write!(f, "xpath={}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!("ACTIVE".parse::<ServerStatus>().unwrap(), ServerStatus::Active);
        assert_eq!("build".parse::<ServerStatus>().unwrap(), ServerStatus::Build);
        assert_eq!(
            "VERIFY_RESIZE".parse::<ServerStatus>().unwrap(),
            ServerStatus::Other("VERIFY_RESIZE".to_string())
        );
        assert!("".parse::<ServerStatus>().is_err());
    }

    #[test]
    fn test_status_display_round_trips_known_names() {
        assert_eq!(ServerStatus::Active.to_string(), "ACTIVE");
        assert_eq!(ServerStatus::Shutoff.to_string(), "SHUTOFF");
    }

    #[test]
    fn test_locator_to_css() {
        assert_eq!(Locator::name("username").to_css().unwrap(), "[name=\"username\"]");
        assert_eq!(Locator::id("loginBtn").to_css().unwrap(), "[id=\"loginBtn\"]");
        assert_eq!(Locator::css(".next").to_css().unwrap(), ".next");
        assert!(Locator::xpath("//button").to_css().is_none());
    }

    #[test]
    fn test_locator_deserialize() {
        #[derive(Deserialize)]
        struct Wrapper {
            button: Locator,
        }

        let w: Wrapper = toml::from_str("button = { by = \"css\", value = \".finish\" }").unwrap();
        assert_eq!(w.button, Locator::css(".finish"));
    }
}
