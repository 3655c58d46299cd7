use crate::config::RegistryConfig;
use crate::errors::RegistryError;
use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

pub mod consul;
pub mod in_memory;

pub use self::consul::ConsulRegistry;
pub use self::in_memory::InMemoryRegistry;

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Service catalog the server announces itself to.
///
/// A record is sent once on startup. Keeping it alive afterwards is the registry's job, driven
/// by the health check carried in the record.
#[async_trait]
pub trait Registry: Debug + Send + Sync {
    async fn register(&self, registration: &Registration) -> RegistryResult<()>;

    async fn deregister(&self, id: &str) -> RegistryResult<()>;
}

/// Health check the registry runs against a registered instance.
#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters, new)]
pub struct HealthCheck {
    #[get_copy = "pub"]
    interval: Duration,
    /// `host:port/service`
    #[get = "pub"]
    grpc: String,
    #[get_copy = "pub"]
    deregister_critical_after: Duration,
}

/// One service instance as announced to a registry.
#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct Registration {
    #[get = "pub"]
    id: String,
    #[get = "pub"]
    name: String,
    #[get = "pub"]
    tags: Vec<String>,
    #[get = "pub"]
    address: String,
    #[get_copy = "pub"]
    port: u16,
    #[get = "pub"]
    check: HealthCheck,
}

impl Registration {
    pub fn new<S: Into<String>>(config: &RegistryConfig, host: S, port: u16) -> Self {
        let host = host.into();
        let name = config.service_name().clone();
        Registration {
            id: instance_id(&name, &host, port),
            check: HealthCheck::new(
                config.check_interval(),
                format!("{}:{}/{}", host, port, name),
                config.deregister_critical_after(),
            ),
            tags: config.tags().clone(),
            address: host,
            name,
            port,
        }
    }
}

/// Id of the instance of `name` reachable at `host:port`.
pub fn instance_id(name: &str, host: &str, port: u16) -> String {
    format!("{}-{}-{}", name, host, port)
}

/// Formats `duration` the way Go's `time.Duration` prints it (`10s`, `1m0s`, `1.5s`, `250ms`).
pub fn go_duration(duration: Duration) -> String {
    if duration.is_zero() {
        return "0s".to_string();
    }
    if duration < Duration::from_secs(1) {
        let nanos = duration.subsec_nanos();
        return match nanos {
            n if n % 1_000_000 == 0 => format!("{}ms", n / 1_000_000),
            n if n % 1_000 == 0 => format!("{}µs", n / 1_000),
            n => format!("{}ns", n),
        };
    }
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, total / 60 % 60, total % 60);
    let mut seconds = seconds.to_string();
    let nanos = duration.subsec_nanos();
    if nanos > 0 {
        let fraction = format!("{:09}", nanos);
        seconds.push('.');
        seconds.push_str(fraction.trim_end_matches('0'));
    }
    match (hours, minutes) {
        (0, 0) => format!("{}s", seconds),
        (0, minutes) => format!("{}m{}s", minutes, seconds),
        (hours, minutes) => format!("{}h{}m{}s", hours, minutes, seconds),
    }
}
