//! stackprobe - OpenStack acceptance checks
//!
//! Usage:
//!   stackprobe connectivity -v <vm> -k <key>            Ping and SSH into a booted VM
//!   stackprobe dashboard -u <user> -p <pw> -d <domain> -v <vm>
//!                                                       Launch a VM through Horizon
//!   stackprobe init                                     Write the default config file

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use stackprobe_browser::{BrowserSession, DashboardCheck, DashboardLogin, LaunchRequest};
use stackprobe_cloud::{
    read_private_key, ConnectivityCheck, Credentials, DashboardLocator, JujuLocator,
    OpenStackClient, StaticHost, SystemProber,
};
use stackprobe_core::config::DEFAULT_CONFIG_FILE;
use stackprobe_core::StackConfig;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "stackprobe")]
#[command(author, version, about = "End-to-end acceptance checks for OpenStack")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file; defaults apply when it does not exist
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check a booted VM gets a floating IP and answers ping and SSH
    Connectivity {
        /// Name of the VM to check
        #[arg(short = 'v', long)]
        vm_name: String,

        /// Private key accepted by the VM
        #[arg(short = 'k', long)]
        key_file: PathBuf,
    },

    /// Log in to Horizon and launch a VM through the wizard
    Dashboard {
        /// Dashboard user
        #[arg(short = 'u', long)]
        username: String,

        /// Dashboard password
        #[arg(short = 'p', long)]
        password: String,

        /// Keystone domain of the user
        #[arg(short = 'd', long)]
        domain: String,

        /// Name of the VM to launch
        #[arg(short = 'v', long)]
        vm_name: String,

        /// Browser executable (auto-detected when omitted)
        #[arg(short = 'j', long)]
        browser_exe: Option<PathBuf>,

        /// Dashboard address; looked up with juju when omitted
        #[arg(long)]
        dashboard_host: Option<String>,

        /// Image to pick (first listed image when omitted)
        #[arg(long)]
        image: Option<String>,

        /// Flavor to pick (first listed flavor when omitted)
        #[arg(long)]
        flavor: Option<String>,

        /// Network to pick (first listed network when omitted)
        #[arg(long)]
        network: Option<String>,
    },

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Commands::Init { force } = cli.command {
        return cmd_init(&cli.config, force);
    }

    let config = StackConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    match cli.command {
        Commands::Connectivity { vm_name, key_file } => {
            cmd_connectivity(&config, &vm_name, &key_file).await
        }
        Commands::Dashboard {
            username,
            password,
            domain,
            vm_name,
            browser_exe,
            dashboard_host,
            image,
            flavor,
            network,
        } => {
            let login = DashboardLogin {
                username,
                password,
                domain,
            };
            let request = launch_request(vm_name, image, flavor, network);
            cmd_dashboard(config, login, request, browser_exe, dashboard_host).await
        }
        Commands::Init { .. } => Ok(()),
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    StackConfig::write_default(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

async fn cmd_connectivity(config: &StackConfig, vm_name: &str, key_file: &Path) -> Result<()> {
    // Key problems should surface before anything touches the cloud
    let private_key = read_private_key(key_file).await?;

    let credentials = Credentials::from_env().context("Missing OpenStack credentials")?;
    let client = OpenStackClient::authenticate(&credentials, config.cloud.request_timeout())
        .await
        .context("Failed to open a control plane session")?;
    let prober = SystemProber::new(&config.cloud);

    let report = ConnectivityCheck::new(&client, &prober, config)
        .run_and_release(vm_name, &private_key)
        .await
        .with_context(|| format!("Connectivity check of {} failed", vm_name))?;

    info!("Connectivity check passed");
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn cmd_dashboard(
    mut config: StackConfig,
    login: DashboardLogin,
    request: LaunchRequest,
    browser_exe: Option<PathBuf>,
    dashboard_host: Option<String>,
) -> Result<()> {
    // A selection the wizard has no section for is a usage error
    request.check_sections(&config.dashboard)?;

    let locator: Box<dyn DashboardLocator> = match dashboard_host {
        Some(host) => Box::new(StaticHost(host)),
        None => Box::new(JujuLocator::new(
            config.cloud.juju_path.clone(),
            config.cloud.dashboard_application.clone(),
        )),
    };
    let host = locator
        .dashboard_host()
        .await
        .context("Failed to find the dashboard")?;
    info!("Dashboard at {}", host);

    if browser_exe.is_some() {
        config.browser.executable = browser_exe;
    }
    let session = BrowserSession::launch(&config.browser)
        .await
        .context("Failed to launch browser")?;

    let report = DashboardCheck::new(&session, &config, &host)
        .run_and_release(&login, &request)
        .await
        .with_context(|| {
            format!(
                "Dashboard check failed (screenshot: {})",
                config.dashboard.snapshot_path.display()
            )
        })?;

    info!("Dashboard check passed");
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn launch_request(
    vm_name: String,
    image: Option<String>,
    flavor: Option<String>,
    network: Option<String>,
) -> LaunchRequest {
    [("image", image), ("flavor", flavor), ("network", network)]
        .into_iter()
        .fold(LaunchRequest::new(vm_name), |request, (section, value)| match value {
            Some(value) => request.select(section, value),
            None => request,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_connectivity_flags() {
        let cli = Cli::try_parse_from([
            "stackprobe",
            "connectivity",
            "-v",
            "test-vm",
            "-k",
            "/root/.ssh/id_rsa",
        ])
        .unwrap();

        match cli.command {
            Commands::Connectivity { vm_name, key_file } => {
                assert_eq!(vm_name, "test-vm");
                assert_eq!(key_file, PathBuf::from("/root/.ssh/id_rsa"));
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_connectivity_requires_key_file() {
        let err = Cli::try_parse_from(["stackprobe", "connectivity", "--vm-name", "test-vm"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_dashboard_requires_domain() {
        let err = Cli::try_parse_from([
            "stackprobe",
            "dashboard",
            "-u",
            "demo",
            "-p",
            "demo",
            "-v",
            "test-vm",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_dashboard_flags() {
        let cli = Cli::try_parse_from([
            "stackprobe",
            "--verbose",
            "dashboard",
            "-u",
            "demo",
            "-p",
            "demo",
            "-d",
            "admin_domain",
            "-v",
            "test-vm",
            "-j",
            "/usr/bin/chromium",
            "--dashboard-host",
            "10.5.0.20",
            "--flavor",
            "m1.small",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Dashboard {
                domain,
                browser_exe,
                dashboard_host,
                image,
                flavor,
                ..
            } => {
                assert_eq!(domain, "admin_domain");
                assert_eq!(browser_exe, Some(PathBuf::from("/usr/bin/chromium")));
                assert_eq!(dashboard_host.as_deref(), Some("10.5.0.20"));
                assert_eq!(image, None);
                assert_eq!(flavor.as_deref(), Some("m1.small"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_launch_request_only_selects_given_sections() {
        let request = launch_request("test-vm".to_string(), None, Some("m1.small".to_string()), None);
        assert_eq!(request.instance_name, "test-vm");
        assert_eq!(request.selection("flavor"), Some("m1.small"));
        assert_eq!(request.selection("image"), None);
        assert_eq!(request.selection("network"), None);
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stackprobe.toml");

        cmd_init(&path, false).unwrap();
        assert!(StackConfig::load_or_default(&path).is_ok());

        assert!(cmd_init(&path, false).is_err());
        cmd_init(&path, true).unwrap();
    }

    #[tokio::test]
    async fn test_unknown_section_fails_before_browser_launch() {
        let mut config = StackConfig::default();
        config.dashboard.sections.retain(|s| s.name != "network");
        // An unreachable browser path proves the launch is never attempted
        config.browser.executable = Some(PathBuf::from("/nonexistent/chromium"));
        let login = DashboardLogin {
            username: "demo".to_string(),
            password: "demo".to_string(),
            domain: "admin_domain".to_string(),
        };
        let request = launch_request("test-vm".to_string(), None, None, Some("private".to_string()));

        let err = cmd_dashboard(config, login, request, None, Some("10.5.0.20".to_string()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no wizard section named network"), "{}", err);
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let config = StackConfig::default();
        let err = cmd_connectivity(&config, "test-vm", Path::new("/nonexistent/id_rsa"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("private key"));
    }
}
