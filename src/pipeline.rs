use crate::context::CallContext;
use crate::errors::ConfigError;
use crate::handler::{CallResult, UnaryHandler};
use crate::interceptor::{Interceptor, Next};
use crate::messages::BoxMessage;
use std::sync::Arc;

/// Largest number of interceptors one pipeline accepts.
pub const MAX_INTERCEPTORS: usize = 16;

/// Ordered interceptors wrapped around every handler of a server.
///
/// Interceptors run in registration order: the first registered is the outermost one. The
/// chain itself is immutable while calls run, each call walks it with its own [`Next`].
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Pipeline::default()
    }

    /// Appends one interceptor.
    pub fn with<I: Interceptor + 'static>(&mut self, interceptor: I) -> Result<&mut Self, ConfigError> {
        self.extend(vec![Arc::new(interceptor)])
    }

    /// Appends all `interceptors` or none of them.
    pub fn extend(&mut self, interceptors: Vec<Arc<dyn Interceptor>>) -> Result<&mut Self, ConfigError> {
        let count = self.interceptors.len() + interceptors.len();
        if count > MAX_INTERCEPTORS {
            return Err(ConfigError::TooManyInterceptors {
                count,
                max: MAX_INTERCEPTORS,
            });
        }
        debug!("Adding {} interceptor(s), {} in total", interceptors.len(), count);
        self.interceptors.extend(interceptors);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Runs `request` through all interceptors and then `handler`.
    pub async fn call(&self, ctx: CallContext, request: BoxMessage, handler: &dyn UnaryHandler) -> CallResult {
        if self.interceptors.is_empty() {
            return handler.call(ctx, request).await;
        }
        Next::new(&self.interceptors, handler).run(ctx, request).await
    }
}
