use crate::context::CallContext;
use crate::handler::CallResult;
use crate::interceptor::{Interceptor, Next};
use crate::messages::BoxMessage;
use async_trait::async_trait;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Logs one line when a call starts and one when it finishes.
///
/// The second line carries the elapsed time, the caller address (`-` when unknown), the
/// request and the outcome of the call.
#[derive(Debug, Default, new)]
pub struct LoggingInterceptor {}

#[async_trait]
impl Interceptor for LoggingInterceptor {
    async fn intercept(&self, ctx: CallContext, request: BoxMessage, next: Next<'_>) -> CallResult {
        let method = ctx.method().clone();
        let peer = ctx
            .peer()
            .map_or_else(|| "-".to_string(), |peer| peer.to_string());
        let request_repr = format!("{:?}", request);
        let started = Instant::now();
        info!("rpc {} start: {}", method, unix_millis());

        let result = next.run(ctx, request).await;

        let outcome = match &result {
            Ok(_) => "OK".to_string(),
            Err(status) => status.to_string(),
        };
        info!(
            "rpc {} finished: elapsed {:?}, peer {}, request {}, status {}",
            method,
            started.elapsed(),
            peer,
            request_repr,
            outcome
        );
        result
    }
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |since| since.as_millis())
}

#[cfg(test)]
pub(crate) mod capture {
    use log::{Level, Log, Metadata, Record};
    use std::sync::{Mutex, Once};

    static LOGGER: CaptureLogger = CaptureLogger {
        records: Mutex::new(Vec::new()),
    };
    static INSTALL: Once = Once::new();

    /// Keeps every record in memory so tests can assert on log output.
    pub(crate) struct CaptureLogger {
        records: Mutex<Vec<(Level, String)>>,
    }

    impl Log for CaptureLogger {
        fn enabled(&self, _metadata: &Metadata) -> bool {
            true
        }

        fn log(&self, record: &Record) {
            if let Ok(mut records) = self.records.lock() {
                records.push((record.level(), record.args().to_string()));
            }
        }

        fn flush(&self) {}
    }

    pub(crate) fn install() {
        INSTALL.call_once(|| {
            if log::set_logger(&LOGGER).is_ok() {
                log::set_max_level(log::LevelFilter::Trace);
            }
        });
    }

    /// Captured records containing `needle`.
    pub(crate) fn lines_with(needle: &str) -> Vec<(Level, String)> {
        LOGGER
            .records
            .lock()
            .map(|records| {
                records
                    .iter()
                    .filter(|(_, line)| line.contains(needle))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Status;
    use crate::handler::UnaryHandler;
    use crate::messages::RawMessage;
    use log::Level;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Respond {
        fail: bool,
    }

    #[async_trait]
    impl UnaryHandler for Respond {
        async fn call(&self, _ctx: CallContext, request: BoxMessage) -> CallResult {
            if self.fail {
                Err(Status::not_found("no such greeting"))
            } else {
                Ok(request)
            }
        }
    }

    async fn run(method: &str, fail: bool) -> CallResult {
        capture::install();
        let interceptors: Vec<Arc<dyn Interceptor>> = vec![Arc::new(LoggingInterceptor::new())];
        let handler = Respond { fail };
        let result = Next::new(&interceptors, &handler)
            .run(
                CallContext::new(method, Some("127.0.0.1:4040".parse().unwrap())),
                Box::new(RawMessage::from("hello")),
            )
            .await;
        result
    }

    #[tokio::test]
    async fn logs_start_and_finish_lines() {
        let result = run("/logging.Test/Succeeds", false).await;

        let lines = capture::lines_with("/logging.Test/Succeeds");
        assert!(result.is_ok());
        assert_eq!(2, lines.len());
        assert!(lines.iter().all(|(level, _)| *level == Level::Info));
        assert!(lines[0].1.contains("start"));
        assert!(lines[1].1.contains("peer 127.0.0.1:4040"));
        assert!(lines[1].1.contains("hello"));
        assert!(lines[1].1.contains("status OK"));
    }

    #[tokio::test]
    async fn logs_failed_outcome_and_keeps_it() {
        let status = run("/logging.Test/Fails", true).await.unwrap_err();

        let lines = capture::lines_with("/logging.Test/Fails");
        assert_eq!(Status::not_found("no such greeting"), status);
        assert_eq!(2, lines.len());
        assert!(lines[1].1.contains("NOT_FOUND: no such greeting"));
    }
}
