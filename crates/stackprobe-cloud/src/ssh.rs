//! Remote command execution over SSH with a private key

use async_trait::async_trait;
use russh::client;
use russh::{ChannelMsg, Disconnect};
use russh_keys::key;
use stackprobe_core::{Result, StackError};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Target of a remote-login probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    pub host: String,
    pub port: u16,
    pub user: String,
}

impl std::fmt::Display for SshTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}:{}", self.user, self.host, self.port)
    }
}

/// Freshly booted test instances have no known host key
struct AcceptAnyHostKey;

#[async_trait]
impl client::Handler for AcceptAnyHostKey {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        Ok(true)
    }
}

fn ssh_error(target: &SshTarget, detail: impl std::fmt::Display) -> StackError {
    StackError::Probe {
        probe: "ssh".to_string(),
        target: target.to_string(),
        detail: detail.to_string(),
    }
}

/// Log in with `private_key` (PEM/OpenSSH text) and run `command`
///
/// Returns stdout. A non-zero exit status is an error.
pub async fn run_command(
    target: &SshTarget,
    private_key: &str,
    command: &str,
    timeout: Duration,
) -> Result<String> {
    let key_pair = russh_keys::decode_secret_key(private_key, None)
        .map_err(|e| ssh_error(target, format!("Failed to decode private key: {}", e)))?;

    let config = Arc::new(client::Config {
        inactivity_timeout: Some(timeout),
        ..Default::default()
    });

    debug!("Connecting to {}", target);
    let mut session = tokio::time::timeout(
        timeout,
        client::connect(config, (target.host.as_str(), target.port), AcceptAnyHostKey),
    )
    .await
    .map_err(|_| ssh_error(target, format!("connection timed out after {:?}", timeout)))?
    .map_err(|e| ssh_error(target, format!("Failed to connect: {}", e)))?;

    let authenticated = session
        .authenticate_publickey(target.user.clone(), Arc::new(key_pair))
        .await
        .map_err(|e| ssh_error(target, format!("Authentication error: {}", e)))?;
    if !authenticated {
        return Err(ssh_error(target, "public key rejected"));
    }

    let mut channel = session
        .channel_open_session()
        .await
        .map_err(|e| ssh_error(target, format!("Failed to open channel: {}", e)))?;
    channel
        .exec(true, command)
        .await
        .map_err(|e| ssh_error(target, format!("Failed to run '{}': {}", command, e)))?;

    let mut stdout = Vec::new();
    let mut exit_status = None;
    while let Some(msg) = channel.wait().await {
        match msg {
            ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
            ChannelMsg::ExitStatus { exit_status: code } => exit_status = Some(code),
            _ => {}
        }
    }

    if let Err(e) = session
        .disconnect(Disconnect::ByApplication, "", "English")
        .await
    {
        debug!("Disconnect from {} failed: {}", target, e);
    }

    match exit_status {
        Some(0) | None => Ok(String::from_utf8_lossy(&stdout).to_string()),
        Some(code) => Err(ssh_error(
            target,
            format!("'{}' exited with status {}", command, code),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> SshTarget {
        SshTarget {
            host: "127.0.0.1".to_string(),
            port: 22,
            user: "ubuntu".to_string(),
        }
    }

    #[test]
    fn test_target_display() {
        assert_eq!(target().to_string(), "ubuntu@127.0.0.1:22");
    }

    #[tokio::test]
    async fn test_garbage_key_fails_before_connecting() {
        let err = run_command(&target(), "not a key", "uname -n", Duration::from_secs(1))
            .await
            .unwrap_err();

        match err {
            StackError::Probe { probe, detail, .. } => {
                assert_eq!(probe, "ssh");
                assert!(detail.contains("private key"));
            }
            other => panic!("expected probe error, got {:?}", other),
        }
    }
}
