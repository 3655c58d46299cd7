use crate::context::CallContext;
use crate::errors::Status;
use crate::handler::CallResult;
use crate::interceptor::{Interceptor, Next};
use crate::messages::BoxMessage;
use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Once;

/// Cap on the stack trace kept in a panic diagnostic.
pub const MAX_STACK_SIZE: usize = 64 << 10;

/// Message returned to the caller of a call whose handler panicked.
pub const PANIC_STATUS_MESSAGE: &str = "internal error";

thread_local! {
    static PANIC_TRACE: Cell<Option<String>> = Cell::new(None);
}

static TRACE_HOOK: Once = Once::new();

/// Keeps a panic inside the call that raised it.
///
/// The panic is logged together with the request and the stack trace of the panic site, then
/// turned into an [`Internal`](crate::errors::Code::Internal) status. The server keeps serving.
#[derive(Debug)]
pub struct RecoveryInterceptor {
    recovered: AtomicU64,
}

impl Default for RecoveryInterceptor {
    fn default() -> Self {
        RecoveryInterceptor::new()
    }
}

impl RecoveryInterceptor {
    pub fn new() -> Self {
        info!("register recovery interceptor");
        install_trace_hook();
        RecoveryInterceptor {
            recovered: AtomicU64::new(0),
        }
    }

    /// Number of panics contained so far.
    pub fn recovered(&self) -> u64 {
        self.recovered.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Interceptor for RecoveryInterceptor {
    async fn intercept(&self, ctx: CallContext, request: BoxMessage, next: Next<'_>) -> CallResult {
        let request_repr = format!("{:?}", request);
        match AssertUnwindSafe(next.run(ctx, request)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                self.recovered.fetch_add(1, Ordering::Relaxed);
                let trace = truncate(take_trace(), MAX_STACK_SIZE);
                let diagnostic = format!(
                    "rpc server panic: {}\n{}\n{}\n",
                    request_repr,
                    panic_message(panic.as_ref()),
                    trace
                );
                eprintln!("{}", diagnostic);
                error!("{}", diagnostic);
                Err(Status::internal(PANIC_STATUS_MESSAGE))
            }
        }
    }
}

/// Records the stack of the panicking thread before it unwinds, then defers to the previous hook.
fn install_trace_hook() {
    TRACE_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let trace = Backtrace::force_capture().to_string();
            PANIC_TRACE.with(|slot| slot.set(Some(trace)));
            previous(info);
        }));
    });
}

fn take_trace() -> String {
    PANIC_TRACE
        .with(Cell::take)
        .unwrap_or_else(|| Backtrace::force_capture().to_string())
}

/// Cuts `text` to at most `max` bytes without splitting a character.
pub(crate) fn truncate(mut text: String, max: usize) -> String {
    if text.len() > max {
        let mut end = max;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    text
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        return message.to_string();
    }
    if let Some(message) = panic.downcast_ref::<String>() {
        return message.clone();
    }
    "unknown panic".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Code;
    use crate::handler::UnaryHandler;
    use crate::messages::{downcast, RawMessage};
    use std::sync::Arc;

    #[derive(Debug)]
    struct Faulty {}

    #[async_trait]
    impl UnaryHandler for Faulty {
        async fn call(&self, _ctx: CallContext, request: BoxMessage) -> CallResult {
            let request = downcast::<RawMessage>(request)
                .map_err(|_| Status::internal("unexpected request"))?;
            if request.body().as_ref() == b"panic" {
                panic!("intentional fault");
            }
            Ok(Box::new(request))
        }
    }

    fn chain() -> Vec<Arc<dyn Interceptor>> {
        vec![Arc::new(RecoveryInterceptor::new())]
    }

    #[tokio::test]
    async fn converts_panic_into_internal_status() {
        let interceptors = chain();
        let handler = Faulty {};
        let next = Next::new(&interceptors, &handler);

        let status = next
            .run(
                CallContext::new("/svc/Panic", None),
                Box::new(RawMessage::from("panic")),
            )
            .await
            .unwrap_err();

        assert_eq!(Code::Internal, status.code());
        assert_eq!(PANIC_STATUS_MESSAGE, status.message());
    }

    #[tokio::test]
    async fn passes_results_through_and_counts_panics() {
        let recovery = Arc::new(RecoveryInterceptor::new());
        let interceptors: Vec<Arc<dyn Interceptor>> = vec![recovery.clone()];
        let handler = Faulty {};

        let failed = Next::new(&interceptors, &handler)
            .run(
                CallContext::new("/svc/Panic", None),
                Box::new(RawMessage::from("panic")),
            )
            .await;
        let passed = Next::new(&interceptors, &handler)
            .run(
                CallContext::new("/svc/Echo", None),
                Box::new(RawMessage::from("echo")),
            )
            .await;

        assert!(failed.is_err());
        assert_eq!(
            RawMessage::from("echo"),
            downcast::<RawMessage>(passed.unwrap()).unwrap()
        );
        assert_eq!(1, recovery.recovered());
    }

    #[test]
    fn truncates_on_char_boundary() {
        let trace = "ab€".to_string();

        assert_eq!("ab", truncate(trace.clone(), 3));
        assert_eq!("ab€", truncate(trace, MAX_STACK_SIZE));
    }

    #[test]
    fn captures_trace_of_panic_site() {
        install_trace_hook();

        let result = panic::catch_unwind(|| panic!("boom"));
        let trace = take_trace();

        assert!(result.is_err());
        assert!(!trace.is_empty());
    }

    #[test]
    fn extracts_panic_message() {
        let static_str: Box<dyn Any + Send> = Box::new("static");
        let owned: Box<dyn Any + Send> = Box::new("owned".to_string());
        let other: Box<dyn Any + Send> = Box::new(7);

        assert_eq!("static", panic_message(static_str.as_ref()));
        assert_eq!("owned", panic_message(owned.as_ref()));
        assert_eq!("unknown panic", panic_message(other.as_ref()));
    }
}
