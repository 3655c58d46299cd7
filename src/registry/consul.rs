use crate::errors::RegistryError;
use crate::registry::{go_duration, Registration, Registry, RegistryResult};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;

/// Registry backed by the HTTP API of a Consul agent.
#[derive(Debug, Clone)]
pub struct ConsulRegistry {
    base_url: String,
    client: Client,
}

impl ConsulRegistry {
    /// Agent reachable at `address`, either `host:port` or a full `http://` URL.
    pub fn new<S: AsRef<str>>(address: S) -> Self {
        let address = address.as_ref().trim().trim_end_matches('/');
        let base_url = if address.contains("://") {
            address.to_string()
        } else {
            format!("http://{}", address)
        };
        ConsulRegistry {
            base_url,
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn check(id: &str, response: Response) -> RegistryResult<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(RegistryError::Rejected {
            id: id.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Registry for ConsulRegistry {
    async fn register(&self, registration: &Registration) -> RegistryResult<()> {
        let url = format!("{}/v1/agent/service/register", self.base_url);
        debug!("Registering '{}' at {}", registration.id(), url);
        let response = self
            .client
            .put(&url)
            .json(&ServiceDefinition::from(registration))
            .send()
            .await?;
        Self::check(registration.id(), response).await
    }

    async fn deregister(&self, id: &str) -> RegistryResult<()> {
        let url = format!("{}/v1/agent/service/deregister/{}", self.base_url, id);
        debug!("Deregistering '{}' at {}", id, url);
        let response = self.client.put(&url).send().await?;
        Self::check(id, response).await
    }
}

/// Service definition accepted by `/v1/agent/service/register`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ServiceDefinition<'a> {
    #[serde(rename = "ID")]
    id: &'a str,
    name: &'a str,
    tags: &'a [String],
    address: &'a str,
    port: u16,
    check: CheckDefinition<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CheckDefinition<'a> {
    interval: String,
    #[serde(rename = "GRPC")]
    grpc: &'a str,
    deregister_critical_service_after: String,
}

impl<'a> From<&'a Registration> for ServiceDefinition<'a> {
    fn from(registration: &'a Registration) -> Self {
        let check = registration.check();
        ServiceDefinition {
            id: registration.id(),
            name: registration.name(),
            tags: registration.tags(),
            address: registration.address(),
            port: registration.port(),
            check: CheckDefinition {
                interval: go_duration(check.interval()),
                grpc: check.grpc(),
                deregister_critical_service_after: go_duration(check.deregister_critical_after()),
            },
        }
    }
}
