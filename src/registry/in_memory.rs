use crate::errors::RegistryError;
use crate::registry::{Registration, Registry, RegistryResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// Registry keeping records in process memory.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    registrations: Mutex<HashMap<String, Registration>>,
    rejecting: AtomicBool,
}

impl InMemoryRegistry {
    /// Registry refusing every registration.
    pub fn rejecting() -> Self {
        let registry = InMemoryRegistry::default();
        registry.set_rejecting(true);
        registry
    }

    pub fn set_rejecting(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::Relaxed);
    }

    pub async fn get(&self, id: &str) -> Option<Registration> {
        self.registrations.lock().await.get(id).cloned()
    }

    pub async fn registrations(&self) -> Vec<Registration> {
        self.registrations.lock().await.values().cloned().collect()
    }
}

#[async_trait]
impl Registry for InMemoryRegistry {
    async fn register(&self, registration: &Registration) -> RegistryResult<()> {
        if self.rejecting.load(Ordering::Relaxed) {
            return Err(RegistryError::Rejected {
                id: registration.id().clone(),
                status: 503,
                body: "registry unavailable".to_string(),
            });
        }
        self.registrations
            .lock()
            .await
            .insert(registration.id().clone(), registration.clone());
        Ok(())
    }

    async fn deregister(&self, id: &str) -> RegistryResult<()> {
        match self.registrations.lock().await.remove(id) {
            Some(_) => Ok(()),
            None => Err(RegistryError::Error(format!("Unknown service '{}'", id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;

    #[tokio::test]
    async fn stores_and_removes_registrations() {
        let registry = InMemoryRegistry::default();
        let registration = Registration::new(&RegistryConfig::default(), "127.0.0.1", 9000);

        registry.register(&registration).await.unwrap();
        let stored = registry.get("rpc_server-127.0.0.1-9000").await;
        registry.deregister(registration.id()).await.unwrap();

        assert_eq!(Some(registration), stored);
        assert!(registry.registrations().await.is_empty());
        assert!(registry.deregister("rpc_server-127.0.0.1-9000").await.is_err());
    }

    #[tokio::test]
    async fn rejecting_registry_refuses_registration() {
        let registry = InMemoryRegistry::rejecting();
        let registration = Registration::new(&RegistryConfig::default(), "127.0.0.1", 9000);

        let result = registry.register(&registration).await;

        assert!(matches!(result, Err(RegistryError::Rejected { status: 503, .. })));
    }
}
