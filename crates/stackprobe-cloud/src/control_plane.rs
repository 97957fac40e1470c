//! Control plane abstraction
//!
//! The connectivity check only needs a handful of lookups and one
//! allocation from the cloud; they sit behind [`ControlPlane`] so the check
//! can run against [`MockControlPlane`] in tests.

use async_trait::async_trait;
use stackprobe_core::{Result, Server, ServerStatus, StackError};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

/// Operations consumed from the cloud control plane
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Resolve a compute server by its exact name
    async fn find_server(&self, name: &str) -> Result<Server>;

    /// Current status of a server
    async fn server_status(&self, server_id: &str) -> Result<ServerStatus>;

    /// Console output of a server
    async fn console_log(&self, server_id: &str) -> Result<String>;

    /// ID of the first network port attached to a server
    async fn server_port(&self, server_id: &str) -> Result<String>;

    /// Routable address bound to `port_id`, allocated from
    /// `external_network` unless one is already bound
    async fn assign_floating_ip(&self, port_id: &str, external_network: &str) -> Result<String>;

    /// Give the session back (revoke tokens and the like)
    async fn release(&self) -> Result<()>;
}

/// Scripted control plane for tests
///
/// Status and console reads pop from per-server queues; the last entry
/// repeats once the queue is down to one.
#[derive(Default)]
pub struct MockControlPlane {
    servers: HashMap<String, Server>,
    statuses: Mutex<HashMap<String, VecDeque<ServerStatus>>>,
    consoles: Mutex<HashMap<String, VecDeque<String>>>,
    ports: HashMap<String, String>,
    floating_ips: HashMap<String, String>,
    status_polls: AtomicU32,
    console_polls: AtomicU32,
    released: AtomicBool,
}

impl MockControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_server(mut self, name: &str, id: &str) -> Self {
        self.servers.insert(
            name.to_string(),
            Server {
                id: id.to_string(),
                name: name.to_string(),
            },
        );
        self
    }

    pub fn with_statuses(self, server_id: &str, statuses: &[ServerStatus]) -> Self {
        self.statuses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(server_id.to_string(), statuses.iter().cloned().collect());
        self
    }

    pub fn with_console(self, server_id: &str, outputs: &[&str]) -> Self {
        self.consoles.lock().unwrap_or_else(|e| e.into_inner()).insert(
            server_id.to_string(),
            outputs.iter().map(|o| o.to_string()).collect(),
        );
        self
    }

    pub fn with_port(mut self, server_id: &str, port_id: &str) -> Self {
        self.ports.insert(server_id.to_string(), port_id.to_string());
        self
    }

    pub fn with_floating_ip(mut self, port_id: &str, ip: &str) -> Self {
        self.floating_ips.insert(port_id.to_string(), ip.to_string());
        self
    }

    /// Number of status reads so far
    pub fn status_polls(&self) -> u32 {
        self.status_polls.load(Ordering::SeqCst)
    }

    /// Number of console reads so far
    pub fn console_polls(&self) -> u32 {
        self.console_polls.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    fn next_from<T: Clone>(
        queues: &Mutex<HashMap<String, VecDeque<T>>>,
        server_id: &str,
    ) -> Option<T> {
        let mut queues = queues.lock().unwrap_or_else(|e| e.into_inner());
        let queue = queues.get_mut(server_id)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl ControlPlane for MockControlPlane {
    async fn find_server(&self, name: &str) -> Result<Server> {
        self.servers
            .get(name)
            .cloned()
            .ok_or_else(|| StackError::ResourceNotFound(format!("server '{}'", name)))
    }

    async fn server_status(&self, server_id: &str) -> Result<ServerStatus> {
        self.status_polls.fetch_add(1, Ordering::SeqCst);
        Self::next_from(&self.statuses, server_id)
            .ok_or_else(|| StackError::ResourceNotFound(format!("server {}", server_id)))
    }

    async fn console_log(&self, server_id: &str) -> Result<String> {
        self.console_polls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::next_from(&self.consoles, server_id).unwrap_or_default())
    }

    async fn server_port(&self, server_id: &str) -> Result<String> {
        self.ports
            .get(server_id)
            .cloned()
            .ok_or_else(|| StackError::ResourceNotFound(format!("port of server {}", server_id)))
    }

    async fn assign_floating_ip(&self, port_id: &str, _external_network: &str) -> Result<String> {
        self.floating_ips
            .get(port_id)
            .cloned()
            .ok_or_else(|| StackError::ControlPlane(format!("no floating IP for port {}", port_id)))
    }

    async fn release(&self) -> Result<()> {
        self.released.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_status_queue_repeats_last() {
        let control = MockControlPlane::new()
            .with_server("test-vm", "abc-123")
            .with_statuses("abc-123", &[ServerStatus::Build, ServerStatus::Active]);

        assert_eq!(control.server_status("abc-123").await.unwrap(), ServerStatus::Build);
        assert_eq!(control.server_status("abc-123").await.unwrap(), ServerStatus::Active);
        assert_eq!(control.server_status("abc-123").await.unwrap(), ServerStatus::Active);
        assert_eq!(control.status_polls(), 3);
    }

    #[tokio::test]
    async fn test_mock_unknown_server() {
        let control = MockControlPlane::new();
        let err = control.find_server("missing").await.unwrap_err();
        assert!(matches!(err, StackError::ResourceNotFound(_)));
    }
}
