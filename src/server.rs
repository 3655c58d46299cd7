use crate::codec::{Codec, Codecs};
use crate::config::{RegistryConfig, ServerConfig};
use crate::connection::FrameSender;
use crate::context::CallContext;
use crate::errors::{Code, ConfigError, ServerError, Status};
use crate::frames::payloads::{CallRequest, CallResponse, FramePayload};
use crate::frames::{Frame, FrameCodec, FrameId, Type, FRAME_HEADER_LENGTH, FRAME_MAX_LENGTH};
use crate::handler::{Method, RequestHandler, RequestHandlerAsync};
use crate::health;
use crate::interceptor::recovery::truncate;
use crate::interceptor::{Interceptor, LoggingInterceptor, RecoveryInterceptor};
use crate::pipeline::Pipeline;
use crate::registry::{ConsulRegistry, Registration, Registry};
use bytes::Bytes;
use futures::StreamExt;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;

/// Longest status message a response frame carries (`message~2`).
pub const MAX_STATUS_MESSAGE_LENGTH: usize = u16::MAX as usize;
/// Largest response body fitting one frame next to an empty status message.
pub const MAX_RESPONSE_BODY_LENGTH: usize = FRAME_MAX_LENGTH - FRAME_HEADER_LENGTH - 3;

/// RPC server: config, interceptor pipeline, methods and codecs.
///
/// A new server already wraps every method in [`RecoveryInterceptor`] and then
/// [`LoggingInterceptor`]; interceptors added with [`Server::intercept`] run inside those two.
#[derive(Debug)]
pub struct Server {
    config: RwLock<ServerConfig>,
    pipeline: Pipeline,
    methods: HashMap<String, Method>,
    codecs: Codecs,
    registry: Option<Arc<dyn Registry>>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Result<Server, ConfigError> {
        let config = config.validate()?;
        let mut pipeline = Pipeline::new();
        pipeline
            .with(RecoveryInterceptor::new())?
            .with(LoggingInterceptor::new())?;
        Ok(Server {
            config: RwLock::new(config),
            pipeline,
            methods: HashMap::new(),
            codecs: Codecs::default(),
            registry: None,
        })
    }

    /// Replaces the config used by the next [`Server::listen`].
    pub async fn set_config(&self, config: ServerConfig) -> Result<(), ConfigError> {
        let config = config.validate()?;
        *self.config.write().await = config;
        Ok(())
    }

    pub async fn config(&self) -> ServerConfig {
        self.config.read().await.clone()
    }

    /// Appends an interceptor to the pipeline.
    pub fn intercept<I: Interceptor + 'static>(&mut self, interceptor: I) -> Result<&mut Self, ConfigError> {
        self.pipeline.with(interceptor)?;
        Ok(self)
    }

    /// Appends all given interceptors, or none of them when that would exceed the limit.
    pub fn intercept_all(&mut self, interceptors: Vec<Arc<dyn Interceptor>>) -> Result<&mut Self, ConfigError> {
        self.pipeline.extend(interceptors)?;
        Ok(self)
    }

    pub fn interceptors(&self) -> usize {
        self.pipeline.len()
    }

    /// Registers handler under full method name, e.g. `/testproto.Greeter/SayHello`.
    pub fn register<S: AsRef<str>, HANDLER: RequestHandler>(
        &mut self,
        method: S,
        handler: HANDLER,
    ) -> Result<&mut Self, ConfigError> {
        self.register_method(method.as_ref(), Method::from_sync(handler))
    }

    /// Registers async handler under full method name.
    pub fn register_async<S: AsRef<str>, HANDLER: RequestHandlerAsync>(
        &mut self,
        method: S,
        handler: HANDLER,
    ) -> Result<&mut Self, ConfigError> {
        self.register_method(method.as_ref(), Method::from_async(handler))
    }

    fn register_method(&mut self, name: &str, method: Method) -> Result<&mut Self, ConfigError> {
        if !name.starts_with('/') || name.len() < 2 {
            return Err(ConfigError::Error(format!(
                "Method name '{}' must look like '/package.Service/Method'",
                name
            )));
        }
        if self.methods.contains_key(name) {
            return Err(ConfigError::DuplicateMethod(name.to_string()));
        }
        debug!("Registering handler for '{}'", name);
        self.methods.insert(name.to_string(), method);
        Ok(self)
    }

    /// Registers codec under its name, replacing a codec registered before under that name.
    pub fn register_codec<C: Codec + 'static>(&mut self, codec: C) -> &mut Self {
        self.codecs.register(codec);
        self
    }

    /// Registry used instead of the Consul agent named in the config.
    pub fn with_registry(&mut self, registry: Arc<dyn Registry>) -> &mut Self {
        self.registry = Some(registry);
        self
    }

    /// Binds the configured address. Failure to bind is fatal, there is no retry.
    pub async fn listen(self) -> Result<Listener, ServerError> {
        let config = self.config.read().await.clone();
        let address = config.socket_address().await?;
        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| ServerError::BindError {
                address: address.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on {}", local_addr);

        let registry_config = match (config.registry(), &self.registry) {
            (Some(registry_config), _) => Some(registry_config.clone()),
            (None, Some(_)) => Some(RegistryConfig::default().validate()?),
            (None, None) => None,
        };
        let registry = self.registry.clone().or_else(|| {
            registry_config
                .as_ref()
                .map(|registry_config| Arc::new(ConsulRegistry::new(registry_config.address())) as Arc<dyn Registry>)
        });

        let mut methods = self.methods;
        if config.health() {
            for (name, method) in health::methods() {
                methods.entry(name.to_string()).or_insert(method);
            }
        }
        let dispatcher = Dispatcher {
            pipeline: self.pipeline,
            methods,
            codecs: self.codecs,
        };
        Ok(Listener {
            listener,
            local_addr,
            dispatcher: Arc::new(dispatcher),
            registry,
            registry_config,
            registration: None,
            frame_buffer_size: config.frame_buffer_size(),
            shutdown: CancellationToken::new(),
        })
    }

    /// Listens, registers and then serves until the listener fails.
    pub async fn start(self) -> Result<(), ServerError> {
        let mut listener = self.listen().await?;
        listener.register().await?;
        listener.serve().await
    }

    /// Listens and registers, then serves on a background task.
    pub async fn spawn(self) -> Result<ServerHandle, ServerError> {
        let mut listener = self.listen().await?;
        listener.register().await?;
        let local_addr = listener.local_addr();
        let registration = listener.registration().clone();
        let shutdown = listener.shutdown_token();
        let task = tokio::spawn(listener.serve());
        Ok(ServerHandle {
            local_addr,
            registration,
            shutdown,
            task,
        })
    }
}

/// Bound server, ready to register and serve.
#[derive(Debug, Getters, CopyGetters)]
pub struct Listener {
    listener: TcpListener,
    #[get_copy = "pub"]
    local_addr: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    registry: Option<Arc<dyn Registry>>,
    registry_config: Option<RegistryConfig>,
    /// Record sent by [`Listener::register`].
    #[get = "pub"]
    registration: Option<Registration>,
    frame_buffer_size: usize,
    shutdown: CancellationToken,
}

impl Listener {
    /// Announces the bound address to the registry. Does nothing without a registry.
    pub async fn register(&mut self) -> Result<Option<&Registration>, ServerError> {
        let (registry, registry_config) = match (&self.registry, &self.registry_config) {
            (Some(registry), Some(registry_config)) => (registry, registry_config),
            _ => return Ok(None),
        };
        let host = advertise_host(registry_config, self.local_addr);
        let registration = Registration::new(registry_config, host, self.local_addr.port());
        if let Err(err) = registry.register(&registration).await {
            error!("Failed to register '{}': {}", registration.id(), err);
            return Err(err.into());
        }
        info!("Registered '{}'", registration.id());
        self.registration = Some(registration);
        Ok(self.registration.as_ref())
    }

    /// Token that stops [`Listener::serve`] once cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Accepts connections until shutdown or until accepting fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        loop {
            let (stream, peer) = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Server on {} shutting down", self.local_addr);
                    return Ok(());
                }
                accepted = self.listener.accept() => accepted?,
            };
            debug!("Handling incoming connection from {}", peer);
            tokio::spawn(handle_connection(
                self.dispatcher.clone(),
                stream,
                peer,
                self.frame_buffer_size,
                self.shutdown.child_token(),
            ));
        }
    }
}

/// Background server started with [`Server::spawn`].
#[derive(Debug, Getters, CopyGetters)]
pub struct ServerHandle {
    #[get_copy = "pub"]
    local_addr: SocketAddr,
    #[get = "pub"]
    registration: Option<Registration>,
    shutdown: CancellationToken,
    task: JoinHandle<Result<(), ServerError>>,
}

impl ServerHandle {
    /// Stops accepting, cancels in-flight calls and waits for the accept loop to end.
    pub async fn shutdown(self) -> Result<(), ServerError> {
        self.shutdown.cancel();
        self.task
            .await
            .map_err(|err| ServerError::Error(format!("Server task failed: {}", err)))?
    }
}

fn advertise_host(config: &RegistryConfig, local_addr: SocketAddr) -> String {
    if let Some(host) = config.advertise_host() {
        return host.clone();
    }
    match local_addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => Ipv4Addr::LOCALHOST.to_string(),
        IpAddr::V6(ip) if ip.is_unspecified() => Ipv6Addr::LOCALHOST.to_string(),
        ip => ip.to_string(),
    }
}

async fn handle_connection(
    dispatcher: Arc<Dispatcher>,
    stream: TcpStream,
    peer: SocketAddr,
    buffer_size: usize,
    cancellation: CancellationToken,
) {
    let (read, write) = stream.into_split();
    let mut framed_read = FramedRead::new(read, FrameCodec::default());
    let (sender, receiver) = mpsc::channel::<FrameId>(buffer_size);
    FrameSender::spawn(FramedWrite::new(write, FrameCodec::default()), receiver, buffer_size);
    loop {
        let frame = tokio::select! {
            _ = cancellation.cancelled() => break,
            frame = framed_read.next() => frame,
        };
        let frame = match frame {
            Some(Ok(frame)) => frame,
            Some(Err(err)) => {
                warn!("Closing connection from {}: {}", peer, err);
                break;
            }
            None => break,
        };
        let id = frame.id();
        let frame = frame.into_frame();
        if frame.frame_type() != Type::CallRequest {
            warn!("Ignoring {:?} frame (id: {}) from {}", frame.frame_type(), id, peer);
            continue;
        }
        let dispatcher = dispatcher.clone();
        let sender = sender.clone();
        let cancellation = cancellation.clone();
        tokio::spawn(async move {
            let response = dispatcher.dispatch(frame.into_payload(), peer, cancellation).await;
            let Some(frame) = response_frame(id, response) else {
                return;
            };
            if sender.send(frame).await.is_err() {
                debug!("Connection from {} closed before response {}", peer, id);
            }
        });
    }
    cancellation.cancel();
    debug!("Connection from {} closed", peer);
}

/// Encodes `response`, answering `INTERNAL` when it cannot be written as one frame.
fn response_frame(id: u32, response: CallResponse) -> Option<FrameId> {
    let payload = match response.encode_bytes() {
        Ok(payload) if payload.len() + FRAME_HEADER_LENGTH <= FRAME_MAX_LENGTH => Ok(payload),
        Ok(payload) => {
            error!("Response {} of {} bytes exceeds frame limit", id, payload.len());
            CallResponse::new(Code::Internal, "response exceeds frame limit".to_string(), Bytes::new()).encode_bytes()
        }
        Err(err) => {
            error!("Failed to encode response {}: {}", id, err);
            CallResponse::new(Code::Internal, "failed to encode response".to_string(), Bytes::new()).encode_bytes()
        }
    };
    match payload {
        Ok(payload) => Some(FrameId::new(id, Frame::new(Type::CallResponse, payload))),
        Err(err) => {
            error!("Dropping response {}: {}", id, err);
            None
        }
    }
}

/// Routes call requests of all connections through the pipeline to their methods.
#[derive(Debug)]
struct Dispatcher {
    pipeline: Pipeline,
    methods: HashMap<String, Method>,
    codecs: Codecs,
}

impl Dispatcher {
    async fn dispatch(&self, mut payload: Bytes, peer: SocketAddr, cancellation: CancellationToken) -> CallResponse {
        let result = match CallRequest::decode(&mut payload) {
            Ok(request) => self.call(request, peer, cancellation).await,
            Err(err) => Err(Status::invalid_argument(format!("Malformed call request: {}", err))),
        };
        match result {
            Ok(body) => CallResponse::new(Code::Ok, String::new(), body),
            Err(status) => CallResponse::new(
                status.code(),
                truncate(status.message().clone(), MAX_STATUS_MESSAGE_LENGTH),
                Bytes::new(),
            ),
        }
    }

    async fn call(&self, request: CallRequest, peer: SocketAddr, cancellation: CancellationToken) -> Result<Bytes, Status> {
        let ttl = request.ttl();
        let (name, content_subtype, metadata, body) = request.into_parts();
        let method = self
            .methods
            .get(&name)
            .ok_or_else(|| Status::unimplemented(format!("Unknown method {}", name)))?;
        let codec = self.codecs.get(&content_subtype).ok_or_else(|| {
            Status::internal(format!(
                "No codec registered for content subtype '{}'",
                content_subtype
            ))
        })?;
        let request = method
            .decode(codec.as_ref(), &body)
            .map_err(|err| Status::invalid_argument(format!("Failed to decode request: {}", err)))?;

        let timeout = (ttl > 0).then(|| Duration::from_millis(u64::from(ttl)));
        let ctx = CallContext::new(name, Some(peer))
            .with_metadata(metadata)
            .with_deadline(timeout.map(|timeout| Instant::now() + timeout))
            .with_cancellation(cancellation.child_token());
        if ctx.is_cancelled() {
            return Err(Status::cancelled("Call cancelled before start"));
        }
        let call_token = ctx.cancellation().clone();
        let invocation = async {
            tokio::select! {
                result = self.pipeline.call(ctx, request, method.handler()) => result,
                _ = call_token.cancelled() => Err(Status::cancelled("Call cancelled")),
            }
        };
        let result = match timeout {
            Some(timeout) => tokio::time::timeout(timeout, invocation)
                .await
                .unwrap_or_else(|_| {
                    call_token.cancel();
                    Err(Status::deadline_exceeded(format!("Deadline of {:?} exceeded", timeout)))
                }),
            None => invocation.await,
        };
        let body = result?
            .encode_dyn(codec.as_ref())
            .map_err(|err| Status::internal(format!("Failed to encode response: {}", err)))?;
        if body.len() > MAX_RESPONSE_BODY_LENGTH {
            return Err(Status::internal(format!(
                "Response of {} bytes exceeds limit of {} bytes",
                body.len(),
                MAX_RESPONSE_BODY_LENGTH
            )));
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RegistryConfigBuilder, ServerConfigBuilder};
    use crate::errors::Code;
    use crate::handler::HandlerResult;
    use crate::messages::Json;
    use crate::registry::InMemoryRegistry;

    #[derive(Debug)]
    struct Upper {}

    impl RequestHandler for Upper {
        type REQ = Json<String>;
        type RES = Json<String>;
        fn handle(&self, _ctx: &CallContext, request: Self::REQ) -> HandlerResult<Self::RES> {
            Ok(Json(request.to_uppercase()))
        }
    }

    #[derive(Debug)]
    struct Missing {}

    impl RequestHandler for Missing {
        type REQ = Json<String>;
        type RES = Json<String>;
        fn handle(&self, _ctx: &CallContext, request: Self::REQ) -> HandlerResult<Self::RES> {
            Err(Status::not_found(format!("No entry named {}", request.repeat(70_000))))
        }
    }

    #[derive(Debug)]
    struct Huge {}

    impl RequestHandler for Huge {
        type REQ = Json<String>;
        type RES = Json<String>;
        fn handle(&self, _ctx: &CallContext, _request: Self::REQ) -> HandlerResult<Self::RES> {
            Ok(Json("x".repeat(MAX_RESPONSE_BODY_LENGTH)))
        }
    }

    fn local_config() -> ServerConfig {
        ServerConfigBuilder::default()
            .address("127.0.0.1:0")
            .build()
            .unwrap()
    }

    fn call_request(method: &str, subtype: &str, ttl: u32, body: &'static [u8]) -> Bytes {
        CallRequest::new(
            ttl,
            method.to_string(),
            subtype.to_string(),
            HashMap::new(),
            Bytes::from_static(body),
        )
        .encode_bytes()
        .unwrap()
    }

    async fn dispatcher() -> Arc<Dispatcher> {
        let mut server = Server::new(local_config()).unwrap();
        server.register("/test.Text/Upper", Upper {}).unwrap();
        server.register("/test.Text/Missing", Missing {}).unwrap();
        server.register("/test.Text/Huge", Huge {}).unwrap();
        let listener = server.listen().await.unwrap();
        listener.dispatcher.clone()
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:5000".parse().unwrap()
    }

    #[test]
    fn installs_recovery_and_logging_first() {
        let server = Server::new(ServerConfig::default()).unwrap();

        assert_eq!(2, server.interceptors());
    }

    #[test]
    fn stops_accepting_interceptors_at_limit() {
        let mut server = Server::new(ServerConfig::default()).unwrap();
        for _ in 0..14 {
            assert!(server.intercept(LoggingInterceptor::new()).is_ok());
        }

        let result = server.intercept(LoggingInterceptor::new()).map(|server| server.interceptors());

        assert_eq!(Err(ConfigError::TooManyInterceptors { count: 17, max: 16 }), result);
        assert_eq!(16, server.interceptors());
    }

    #[test]
    fn rejects_duplicate_and_malformed_method_names() {
        let mut server = Server::new(ServerConfig::default()).unwrap();
        server.register("/test.Text/Upper", Upper {}).unwrap();

        assert_eq!(
            ConfigError::DuplicateMethod("/test.Text/Upper".to_string()),
            server.register("/test.Text/Upper", Upper {}).unwrap_err()
        );
        assert!(server.register("Upper", Upper {}).is_err());
    }

    #[tokio::test]
    async fn set_config_validates_before_storing() {
        let server = Server::new(ServerConfig::default()).unwrap();

        let result = server
            .set_config(ServerConfigBuilder::default().network("udp").build().unwrap())
            .await;
        server.set_config(local_config()).await.unwrap();

        assert!(result.is_err());
        assert_eq!("127.0.0.1:0", server.config().await.address());
    }

    #[tokio::test]
    async fn dispatches_to_registered_method() {
        let dispatcher = dispatcher().await;

        let response = dispatcher
            .dispatch(
                call_request("/test.Text/Upper", "", 0, br#""abc""#),
                peer(),
                CancellationToken::new(),
            )
            .await;

        assert_eq!(Code::Ok, response.code());
        assert_eq!(&Bytes::from_static(br#""ABC""#), response.body());
    }

    #[tokio::test]
    async fn maps_failures_to_status_codes() {
        let dispatcher = dispatcher().await;

        let unknown_method = dispatcher
            .dispatch(call_request("/test.Text/Lower", "json", 0, b"\"a\""), peer(), CancellationToken::new())
            .await;
        let unknown_codec = dispatcher
            .dispatch(call_request("/test.Text/Upper", "xml", 0, b"\"a\""), peer(), CancellationToken::new())
            .await;
        let malformed = dispatcher
            .dispatch(call_request("/test.Text/Upper", "json", 0, b"{"), peer(), CancellationToken::new())
            .await;
        let truncated = dispatcher
            .dispatch(Bytes::from_static(&[0, 0]), peer(), CancellationToken::new())
            .await;

        assert_eq!(Code::Unimplemented, unknown_method.code());
        assert_eq!(Code::Internal, unknown_codec.code());
        assert_eq!(Code::InvalidArgument, malformed.code());
        assert_eq!(Code::InvalidArgument, truncated.code());
    }

    #[tokio::test]
    async fn truncates_long_status_message() {
        let dispatcher = dispatcher().await;

        let response = dispatcher
            .dispatch(call_request("/test.Text/Missing", "json", 0, b"\"a\""), peer(), CancellationToken::new())
            .await;

        assert_eq!(Code::NotFound, response.code());
        assert_eq!(MAX_STATUS_MESSAGE_LENGTH, response.message().len());
        assert!(response.message().starts_with("No entry named aaa"));
        assert!(response.encode_bytes().is_ok());
    }

    #[tokio::test]
    async fn rejects_response_exceeding_frame() {
        let dispatcher = dispatcher().await;

        let response = dispatcher
            .dispatch(call_request("/test.Text/Huge", "json", 0, b"\"a\""), peer(), CancellationToken::new())
            .await;

        assert_eq!(Code::Internal, response.code());
        assert!(response.body().is_empty());
        assert!(response.message().contains("exceeds limit"));
    }

    #[test]
    fn falls_back_to_internal_for_unencodable_response() {
        let oversized = CallResponse::new(Code::Ok, String::new(), Bytes::from(vec![0u8; FRAME_MAX_LENGTH]));

        let frame = response_frame(7, oversized).unwrap();
        let response = CallResponse::decode(&mut frame.frame().payload().clone()).unwrap();

        assert_eq!(7, frame.id());
        assert_eq!(Code::Internal, response.code());
        assert!(response.body().is_empty());
    }

    #[tokio::test]
    async fn serves_health_check_when_enabled() {
        let dispatcher = dispatcher().await;

        let response = dispatcher
            .dispatch(call_request(health::CHECK_METHOD, "json", 0, b"{}"), peer(), CancellationToken::new())
            .await;

        assert_eq!(&Bytes::from_static(br#"{"status":"SERVING"}"#), response.body());
    }

    #[tokio::test]
    async fn cancelled_connection_cancels_call() {
        let dispatcher = dispatcher().await;
        let cancellation = CancellationToken::new();
        cancellation.cancel();

        let response = dispatcher
            .dispatch(call_request("/test.Text/Upper", "json", 0, b"\"a\""), peer(), cancellation)
            .await;

        assert_eq!(Code::Cancelled, response.code());
    }

    #[test]
    fn advertises_loopback_for_unspecified_address() {
        let config = RegistryConfig::default();
        let explicit = RegistryConfigBuilder::default()
            .advertise_host("10.1.2.3")
            .build()
            .unwrap();

        assert_eq!("127.0.0.1", advertise_host(&config, "0.0.0.0:80".parse().unwrap()));
        assert_eq!("::1", advertise_host(&config, "[::]:80".parse().unwrap()));
        assert_eq!("192.168.0.7", advertise_host(&config, "192.168.0.7:80".parse().unwrap()));
        assert_eq!("10.1.2.3", advertise_host(&explicit, "0.0.0.0:80".parse().unwrap()));
    }

    #[tokio::test]
    async fn registers_bound_address() {
        let registry = Arc::new(InMemoryRegistry::default());
        let mut server = Server::new(
            ServerConfigBuilder::default()
                .address("127.0.0.1:0")
                .registry(
                    RegistryConfigBuilder::default()
                        .service_name("svc")
                        .build()
                        .unwrap(),
                )
                .build()
                .unwrap(),
        )
        .unwrap();
        server.with_registry(registry.clone());

        let mut listener = server.listen().await.unwrap();
        let port = listener.local_addr().port();
        let id = listener.register().await.unwrap().map(|r| r.id().clone());

        assert_eq!(Some(format!("svc-127.0.0.1-{}", port)), id);
        assert_eq!(1, registry.registrations().await.len());
    }

    #[tokio::test]
    async fn rejected_registration_is_fatal() {
        let mut server = Server::new(local_config()).unwrap();
        server.with_registry(Arc::new(InMemoryRegistry::rejecting()));

        let result = server.spawn().await;

        assert!(matches!(result, Err(ServerError::RegistrationError(_))));
    }

    #[tokio::test]
    async fn bind_failure_is_fatal() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = taken.local_addr().unwrap().to_string();
        let server = Server::new(
            ServerConfigBuilder::default()
                .address(address)
                .build()
                .unwrap(),
        )
        .unwrap();

        let result = server.listen().await;

        assert!(matches!(result, Err(ServerError::BindError { .. })));
    }
}
