//! Network-level probes against a routable address

use async_trait::async_trait;
use stackprobe_core::{CloudConfig, Result, StackError};
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::ssh::{self, SshTarget};

/// Reachability and remote-login checks
#[async_trait]
pub trait NetworkProber: Send + Sync {
    /// ICMP echo to `host`
    async fn ping(&self, host: &str) -> Result<()>;

    /// Log in to `target` with `private_key` and run `command`, returning stdout
    async fn ssh(&self, target: &SshTarget, private_key: &str, command: &str) -> Result<String>;
}

/// Probes using the system `ping` and an in-process SSH client
#[derive(Debug, Clone)]
pub struct SystemProber {
    ping_count: u32,
    ping_timeout_secs: u32,
    ssh_timeout: Duration,
}

impl SystemProber {
    pub fn new(config: &CloudConfig) -> Self {
        Self {
            ping_count: config.ping_count.max(1),
            ping_timeout_secs: config.ping_timeout_secs.max(1),
            ssh_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_ssh_timeout(mut self, timeout: Duration) -> Self {
        self.ssh_timeout = timeout;
        self
    }
}

#[async_trait]
impl NetworkProber for SystemProber {
    #[instrument(skip(self))]
    async fn ping(&self, host: &str) -> Result<()> {
        let count = self.ping_count.to_string();
        let wait = self.ping_timeout_secs.to_string();

        let status = Command::new("ping")
            .args(["-c", count.as_str(), "-W", wait.as_str(), host])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| StackError::Probe {
                probe: "ping".to_string(),
                target: host.to_string(),
                detail: format!("Failed to run ping: {}", e),
            })?;

        if !status.success() {
            return Err(StackError::Probe {
                probe: "ping".to_string(),
                target: host.to_string(),
                detail: format!("no reply ({})", status),
            });
        }

        debug!("{} answered ping", host);
        Ok(())
    }

    #[instrument(skip(self, private_key))]
    async fn ssh(&self, target: &SshTarget, private_key: &str, command: &str) -> Result<String> {
        ssh::run_command(target, private_key, command, self.ssh_timeout).await
    }
}

/// Recorded probe call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeCall {
    Ping(String),
    Ssh { target: SshTarget, command: String },
}

/// Scripted prober for tests
pub struct MockProber {
    ping_ok: bool,
    ssh_output: std::result::Result<String, String>,
    calls: Mutex<Vec<ProbeCall>>,
}

impl MockProber {
    /// Both probes succeed; SSH prints `hostname`
    pub fn reachable(hostname: &str) -> Self {
        Self {
            ping_ok: true,
            ssh_output: Ok(format!("{}\n", hostname)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_ping_failure(mut self) -> Self {
        self.ping_ok = false;
        self
    }

    pub fn with_ssh_failure(mut self, detail: &str) -> Self {
        self.ssh_output = Err(detail.to_string());
        self
    }

    pub fn calls(&self) -> Vec<ProbeCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl NetworkProber for MockProber {
    async fn ping(&self, host: &str) -> Result<()> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(ProbeCall::Ping(host.to_string()));
        if self.ping_ok {
            Ok(())
        } else {
            Err(StackError::Probe {
                probe: "ping".to_string(),
                target: host.to_string(),
                detail: "no reply".to_string(),
            })
        }
    }

    async fn ssh(&self, target: &SshTarget, _private_key: &str, command: &str) -> Result<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(ProbeCall::Ssh {
            target: target.clone(),
            command: command.to_string(),
        });
        self.ssh_output.clone().map_err(|detail| StackError::Probe {
            probe: "ssh".to_string(),
            target: target.to_string(),
            detail,
        })
    }
}
