use crate::context::CallContext;
use crate::handler::{CallResult, UnaryHandler};
use crate::messages::BoxMessage;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

pub mod logging;
pub mod recovery;

pub use self::logging::LoggingInterceptor;
pub use self::recovery::RecoveryInterceptor;

/// Behavior wrapped around every call.
///
/// An interceptor runs code before and after delegating to `next`. It is shared by all
/// concurrent calls, so any state it keeps needs its own synchronization.
#[async_trait]
pub trait Interceptor: Debug + Send + Sync {
    async fn intercept(&self, ctx: CallContext, request: BoxMessage, next: Next<'_>) -> CallResult;
}

/// Rest of the chain as seen from one interceptor.
///
/// Created per call and consumed by [`Next::run`]; the position in the chain lives here and
/// nowhere else.
#[derive(Debug, Clone, Copy)]
pub struct Next<'a> {
    interceptors: &'a [Arc<dyn Interceptor>],
    handler: &'a dyn UnaryHandler,
}

impl<'a> Next<'a> {
    pub(crate) fn new(interceptors: &'a [Arc<dyn Interceptor>], handler: &'a dyn UnaryHandler) -> Self {
        Next {
            interceptors,
            handler,
        }
    }

    /// Invokes the next interceptor, or the handler once the chain is exhausted.
    pub async fn run(self, ctx: CallContext, request: BoxMessage) -> CallResult {
        match self.interceptors.split_first() {
            Some((interceptor, rest)) => {
                interceptor
                    .intercept(ctx, request, Next::new(rest, self.handler))
                    .await
            }
            None => self.handler.call(ctx, request).await,
        }
    }

    /// Interceptors left before the handler.
    pub fn remaining(&self) -> usize {
        self.interceptors.len()
    }
}
