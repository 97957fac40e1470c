//! OpenStack REST client
//!
//! Covers the slice of Keystone v3, Nova and Neutron the connectivity
//! check consumes. Authentication happens once in
//! [`OpenStackClient::authenticate`]; the token is revoked by
//! [`ControlPlane::release`].

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use stackprobe_core::{Result, Server, ServerStatus, StackError};
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::auth::Credentials;
use crate::control_plane::ControlPlane;

const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";
const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Token,
}

#[derive(Debug, Deserialize)]
struct Token {
    #[serde(default)]
    catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    #[serde(rename = "type")]
    service_type: String,
    #[serde(default)]
    endpoints: Vec<Endpoint>,
}

#[derive(Debug, Deserialize)]
struct Endpoint {
    interface: String,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    region_id: Option<String>,
    url: String,
}

#[derive(Debug, Deserialize)]
struct ServerList {
    servers: Vec<ServerSummary>,
}

#[derive(Debug, Deserialize)]
struct ServerSummary {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ServerEnvelope {
    server: ServerDetail,
}

#[derive(Debug, Deserialize)]
struct ServerDetail {
    status: String,
}

#[derive(Debug, Deserialize)]
struct ConsoleOutput {
    #[serde(default)]
    output: String,
}

#[derive(Debug, Deserialize)]
struct PortList {
    ports: Vec<IdOnly>,
}

#[derive(Debug, Deserialize)]
struct NetworkList {
    networks: Vec<IdOnly>,
}

#[derive(Debug, Deserialize)]
struct IdOnly {
    id: String,
}

#[derive(Debug, Deserialize)]
struct FloatingIpList {
    floatingips: Vec<FloatingIp>,
}

#[derive(Debug, Deserialize)]
struct FloatingIpEnvelope {
    floatingip: FloatingIp,
}

#[derive(Debug, Deserialize)]
struct FloatingIp {
    floating_ip_address: String,
}

/// Authenticated session against one OpenStack cloud
pub struct OpenStackClient {
    http: reqwest::Client,
    token: String,
    identity_url: String,
    compute_url: String,
    network_url: String,
}

impl std::fmt::Debug for OpenStackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenStackClient")
            .field("identity_url", &self.identity_url)
            .field("compute_url", &self.compute_url)
            .field("network_url", &self.network_url)
            .finish_non_exhaustive()
    }
}

impl OpenStackClient {
    /// Get a project-scoped token and resolve service endpoints
    ///
    /// Every request made through the client, this one included, fails
    /// once `request_timeout` has passed without a complete response.
    pub async fn authenticate(credentials: &Credentials, request_timeout: Duration) -> Result<Self> {
        let identity_url = credentials.identity_url();
        info!("Authenticating against {}", identity_url);

        let body = json!({
            "auth": {
                "identity": {
                    "methods": ["password"],
                    "password": {
                        "user": {
                            "name": credentials.username,
                            "domain": { "name": credentials.user_domain_name },
                            "password": credentials.password,
                        }
                    }
                },
                "scope": {
                    "project": {
                        "name": credentials.project_name,
                        "domain": { "name": credentials.project_domain_name },
                    }
                }
            }
        });

        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| StackError::ControlPlane(format!("Failed to build HTTP client: {}", e)))?;
        let response = http
            .post(format!("{}/auth/tokens", identity_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| StackError::Auth(format!("Failed to reach identity service: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(StackError::Auth(format!(
                "Identity service returned {}: {}",
                status, text
            )));
        }

        let token = response
            .headers()
            .get(SUBJECT_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| StackError::Auth("No X-Subject-Token in response".to_string()))?;

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| StackError::Auth(format!("Failed to parse token response: {}", e)))?;

        let catalog = &parsed.token.catalog;
        let compute_url = select_endpoint(catalog, "compute", credentials)?;
        let network_url = network_v2_url(&select_endpoint(catalog, "network", credentials)?);

        info!(
            "Authenticated (compute: {}, network: {})",
            compute_url, network_url
        );

        Ok(Self {
            http,
            token,
            identity_url,
            compute_url,
            network_url,
        })
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        debug!("{} {}", method, url);
        self.http
            .request(method, url)
            .header(AUTH_TOKEN_HEADER, &self.token)
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| StackError::ControlPlane(format!("Failed to {}: {}", what, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StackError::ResourceNotFound(what.to_string()));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(StackError::ControlPlane(format!(
                "Failed to {}: {} {}",
                what, status, text
            )));
        }
        Ok(response)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T> {
        self.send(request, what)
            .await?
            .json()
            .await
            .map_err(|e| StackError::ControlPlane(format!("Failed to parse {} response: {}", what, e)))
    }
}

fn select_endpoint(catalog: &[CatalogEntry], service_type: &str, credentials: &Credentials) -> Result<String> {
    catalog
        .iter()
        .filter(|entry| entry.service_type == service_type)
        .flat_map(|entry| entry.endpoints.iter())
        .find(|endpoint| {
            endpoint.interface == credentials.interface
                && credentials.region.as_ref().map_or(true, |region| {
                    endpoint.region.as_ref() == Some(region)
                        || endpoint.region_id.as_ref() == Some(region)
                })
        })
        .map(|endpoint| endpoint.url.trim_end_matches('/').to_string())
        .ok_or_else(|| {
            StackError::ControlPlane(format!(
                "No {} endpoint for interface '{}' in the service catalog",
                service_type, credentials.interface
            ))
        })
}

/// Neutron catalog entries usually omit the API version
fn network_v2_url(url: &str) -> String {
    let url = url.trim_end_matches('/');
    if url.ends_with("/v2.0") {
        url.to_string()
    } else {
        format!("{}/v2.0", url)
    }
}

#[async_trait]
impl ControlPlane for OpenStackClient {
    #[instrument(skip(self))]
    async fn find_server(&self, name: &str) -> Result<Server> {
        let request = self
            .request(Method::GET, format!("{}/servers", self.compute_url))
            .query(&[("name", name)]);
        let list: ServerList = self.get_json(request, "list servers").await?;

        // Nova treats `name` as a regex; keep exact matches only
        let mut matches: Vec<Server> = list
            .servers
            .into_iter()
            .filter(|s| s.name == name)
            .map(|s| Server { id: s.id, name: s.name })
            .collect();

        match matches.len() {
            0 => Err(StackError::ResourceNotFound(format!("server '{}'", name))),
            1 => Ok(matches.remove(0)),
            count => Err(StackError::AmbiguousResource {
                kind: "server".to_string(),
                name: name.to_string(),
                count,
            }),
        }
    }

    #[instrument(skip(self))]
    async fn server_status(&self, server_id: &str) -> Result<ServerStatus> {
        let request = self.request(
            Method::GET,
            format!("{}/servers/{}", self.compute_url, server_id),
        );
        let envelope: ServerEnvelope = self.get_json(request, "show server").await?;
        envelope
            .server
            .status
            .parse()
            .map_err(StackError::ControlPlane)
    }

    #[instrument(skip(self))]
    async fn console_log(&self, server_id: &str) -> Result<String> {
        let request = self
            .request(
                Method::POST,
                format!("{}/servers/{}/action", self.compute_url, server_id),
            )
            .json(&json!({ "os-getConsoleOutput": {} }));
        let console: ConsoleOutput = self.get_json(request, "get console output").await?;
        Ok(console.output)
    }

    #[instrument(skip(self))]
    async fn server_port(&self, server_id: &str) -> Result<String> {
        let request = self
            .request(Method::GET, format!("{}/ports", self.network_url))
            .query(&[("device_id", server_id)]);
        let list: PortList = self.get_json(request, "list ports").await?;

        let port = list
            .ports
            .into_iter()
            .next()
            .ok_or_else(|| StackError::ResourceNotFound(format!("port of server {}", server_id)))?;
        debug!("Found port {} for {}", port.id, server_id);
        Ok(port.id)
    }

    #[instrument(skip(self))]
    async fn assign_floating_ip(&self, port_id: &str, external_network: &str) -> Result<String> {
        let request = self
            .request(Method::GET, format!("{}/floatingips", self.network_url))
            .query(&[("port_id", port_id)]);
        let existing: FloatingIpList = self.get_json(request, "list floating IPs").await?;
        if let Some(fip) = existing.floatingips.into_iter().next() {
            info!("Port {} already has {}", port_id, fip.floating_ip_address);
            return Ok(fip.floating_ip_address);
        }

        let request = self
            .request(Method::GET, format!("{}/networks", self.network_url))
            .query(&[("name", external_network)]);
        let networks: NetworkList = self.get_json(request, "list networks").await?;
        let network = networks.networks.into_iter().next().ok_or_else(|| {
            StackError::ResourceNotFound(format!("network '{}'", external_network))
        })?;

        let request = self
            .request(Method::POST, format!("{}/floatingips", self.network_url))
            .json(&json!({
                "floatingip": {
                    "floating_network_id": network.id,
                    "port_id": port_id,
                }
            }));
        let created: FloatingIpEnvelope = self.get_json(request, "create floating IP").await?;

        info!("Assigned {} to port {}", created.floatingip.floating_ip_address, port_id);
        Ok(created.floatingip.floating_ip_address)
    }

    async fn release(&self) -> Result<()> {
        let request = self
            .request(Method::DELETE, format!("{}/auth/tokens", self.identity_url))
            .header(SUBJECT_TOKEN_HEADER, &self.token);
        self.send(request, "revoke token").await?;
        debug!("Token revoked");
        Ok(())
    }
}
