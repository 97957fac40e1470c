//! # stackprobe-cloud
//!
//! Control plane access and network probes for the connectivity check.
//!
//! - [`OpenStackClient`]: Keystone v3 session plus the Nova/Neutron calls
//!   the check needs, behind the [`ControlPlane`] trait
//! - [`SystemProber`]: `ping` and an in-process SSH client, behind
//!   [`NetworkProber`]
//! - [`ConnectivityCheck`]: resolve, wait, assign an address, probe
//! - [`DashboardLocator`]: where the Horizon dashboard is served from
//!
//! Mock implementations of every trait ship with the crate for tests.

pub mod auth;
pub mod connectivity;
pub mod control_plane;
pub mod locator;
pub mod openstack;
pub mod probe;
pub mod ssh;

pub use auth::Credentials;
pub use connectivity::{read_private_key, ConnectivityCheck, ConnectivityReport};
pub use control_plane::{ControlPlane, MockControlPlane};
pub use locator::{DashboardLocator, JujuLocator, StaticHost};
pub use openstack::OpenStackClient;
pub use probe::{MockProber, NetworkProber, ProbeCall, SystemProber};
pub use ssh::SshTarget;
