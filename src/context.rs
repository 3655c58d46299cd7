use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Per call data: method, caller, metadata, deadline and cancellation.
///
/// Owned by a single invocation and moved through the interceptor chain. Interceptors may
/// attach metadata but must hand the same context on, so cancellation keeps propagating.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct CallContext {
    /// Full method name, e.g. `/testproto.Greeter/SayHello`.
    #[get = "pub"]
    method: String,
    /// Network address of the caller, when known.
    #[get_copy = "pub"]
    peer: Option<SocketAddr>,
    #[get = "pub"]
    metadata: HashMap<String, String>,
    #[get_copy = "pub"]
    deadline: Option<Instant>,
    #[get = "pub"]
    cancellation: CancellationToken,
}

impl CallContext {
    pub fn new<S: Into<String>>(method: S, peer: Option<SocketAddr>) -> Self {
        CallContext {
            method: method.into(),
            peer,
            metadata: HashMap::new(),
            deadline: None,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn insert_metadata<K: Into<String>, V: Into<String>>(
        &mut self,
        key: K,
        value: V,
    ) -> Option<String> {
        self.metadata.insert(key.into(), value.into())
    }

    /// Time left until the deadline; zero once it passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
            || self.remaining().map_or(false, |remaining| remaining.is_zero())
    }
}
