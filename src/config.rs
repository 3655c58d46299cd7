use crate::errors::ConfigError;
use core::time::Duration;
use std::net::SocketAddr;

pub const DEFAULT_NETWORK: &str = "tcp";
pub const DEFAULT_ADDRESS: &str = ":8080";
pub const DEFAULT_REGISTRY_ADDRESS: &str = "127.0.0.1:8500";
pub const DEFAULT_SERVICE_NAME: &str = "rpc_server";
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_DEREGISTER_CRITICAL_AFTER: Duration = Duration::from_secs(60);

/// Server config.
///
/// Empty `network` and `address` fall back to [`DEFAULT_NETWORK`] and [`DEFAULT_ADDRESS`].
/// An address without host (`":8080"`) binds all interfaces.
#[derive(Debug, Clone, PartialEq, Builder, Getters, CopyGetters)]
#[builder(default)]
pub struct ServerConfig {
    #[builder(setter(into))]
    #[get = "pub"]
    network: String,
    #[builder(setter(into))]
    #[get = "pub"]
    address: String,
    /// Exposes the health service.
    #[get_copy = "pub"]
    health: bool,
    #[get_copy = "pub"]
    frame_buffer_size: usize,
    /// Registers the server in a registry on startup when set.
    #[builder(setter(strip_option))]
    #[get = "pub"]
    registry: Option<RegistryConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            network: DEFAULT_NETWORK.to_string(),
            address: DEFAULT_ADDRESS.to_string(),
            health: true,
            frame_buffer_size: 100,
            registry: None,
        }
    }
}

impl ServerConfig {
    /// Applies defaults over empty fields and checks the network and address syntax.
    ///
    /// Host names are not looked up here; [`ServerConfig::socket_address`] resolves them.
    pub fn validate(mut self) -> Result<ServerConfig, ConfigError> {
        if self.network.trim().is_empty() {
            self.network = DEFAULT_NETWORK.to_string();
        }
        if self.address.trim().is_empty() {
            self.address = DEFAULT_ADDRESS.to_string();
        }
        if self.frame_buffer_size == 0 {
            return Err(ConfigError::Error(
                "Frame buffer size must be positive".to_string(),
            ));
        }
        let network = Network::parse(&self.network)?;
        let target = self.bind_target(network)?;
        if let Ok(addr) = target.parse::<SocketAddr>() {
            if !network.accepts(&addr) {
                return Err(self.invalid_address(format!(
                    "no address usable with network '{}'",
                    self.network
                )));
            }
        }
        if let Some(registry) = self.registry.take() {
            self.registry = Some(registry.validate()?);
        }
        Ok(self)
    }

    /// Resolves the configured address to the socket address the server binds.
    pub async fn socket_address(&self) -> Result<SocketAddr, ConfigError> {
        let network = Network::parse(&self.network)?;
        let target = self.bind_target(network)?;
        let mut candidates = tokio::net::lookup_host(target)
            .await
            .map_err(|err| self.invalid_address(err.to_string()))?;
        candidates.find(|addr| network.accepts(addr)).ok_or_else(|| {
            self.invalid_address(format!("no address usable with network '{}'", self.network))
        })
    }

    /// `host:port` to bind; an address without host gets the network's unspecified host.
    fn bind_target(&self, network: Network) -> Result<String, ConfigError> {
        let address = self.address.trim();
        let address = match address.strip_prefix(':') {
            Some(port) => format!("{}:{}", network.unspecified_host(), port),
            None => address.to_string(),
        };
        let port = address
            .rsplit_once(':')
            .map(|(_, port)| port)
            .ok_or_else(|| self.invalid_address("missing port".to_string()))?;
        port.parse::<u16>()
            .map_err(|err| self.invalid_address(format!("invalid port '{}': {}", port, err)))?;
        Ok(address)
    }

    fn invalid_address(&self, reason: String) -> ConfigError {
        ConfigError::InvalidAddress {
            address: self.address.clone(),
            reason,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Network {
    Tcp,
    Tcp4,
    Tcp6,
}

impl Network {
    fn parse(network: &str) -> Result<Network, ConfigError> {
        match network.trim().to_ascii_lowercase().as_str() {
            "tcp" => Ok(Network::Tcp),
            "tcp4" => Ok(Network::Tcp4),
            "tcp6" => Ok(Network::Tcp6),
            _ => Err(ConfigError::UnsupportedNetwork(network.to_string())),
        }
    }

    fn unspecified_host(&self) -> &'static str {
        match self {
            Network::Tcp6 => "[::]",
            _ => "0.0.0.0",
        }
    }

    fn accepts(&self, addr: &SocketAddr) -> bool {
        match self {
            Network::Tcp => true,
            Network::Tcp4 => addr.is_ipv4(),
            Network::Tcp6 => addr.is_ipv6(),
        }
    }
}

/// Service registry config.
#[derive(Debug, Clone, PartialEq, Builder, Getters, CopyGetters)]
#[builder(default)]
pub struct RegistryConfig {
    /// Registry agent location, `host:port`.
    #[builder(setter(into))]
    #[get = "pub"]
    address: String,
    #[builder(setter(into))]
    #[get = "pub"]
    service_name: String,
    #[get = "pub"]
    tags: Vec<String>,
    /// Host announced to the registry. Defaults to the bound IP.
    #[builder(setter(into, strip_option))]
    #[get = "pub"]
    advertise_host: Option<String>,
    #[get_copy = "pub"]
    check_interval: Duration,
    #[get_copy = "pub"]
    deregister_critical_after: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            address: DEFAULT_REGISTRY_ADDRESS.to_string(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            tags: Vec::new(),
            advertise_host: None,
            check_interval: DEFAULT_CHECK_INTERVAL,
            deregister_critical_after: DEFAULT_DEREGISTER_CRITICAL_AFTER,
        }
    }
}

impl RegistryConfig {
    pub(crate) fn validate(mut self) -> Result<RegistryConfig, ConfigError> {
        if self.address.trim().is_empty() {
            self.address = DEFAULT_REGISTRY_ADDRESS.to_string();
        }
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::Error(
                "Registry service name must not be empty".to_string(),
            ));
        }
        if self.tags.is_empty() {
            self.tags = vec![self.service_name.clone()];
        }
        Ok(self)
    }
}
