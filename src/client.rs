use crate::codec::{Codec, Codecs, DEFAULT_CONTENT_SUBTYPE};
use crate::connection::Connection;
use crate::errors::{Code, RpcError, Status};
use crate::frames::payloads::{CallRequest, FramePayload};
use crate::frames::{Frame, Type};
use crate::messages::{Message, RawMessage};
use bytes::Bytes;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpStream, ToSocketAddrs};

pub type RpcResult<T> = Result<T, RpcError>;

/// Per call options.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Getters, CopyGetters)]
#[builder(default)]
pub struct CallOptions {
    /// Name of the codec the server decodes the request with.
    #[builder(setter(into))]
    #[get = "pub"]
    content_subtype: String,
    /// Deadline for the server to answer; sent with the call.
    #[builder(setter(strip_option))]
    #[get_copy = "pub"]
    timeout: Option<Duration>,
    #[get = "pub"]
    metadata: HashMap<String, String>,
}

impl Default for CallOptions {
    fn default() -> Self {
        CallOptions {
            content_subtype: DEFAULT_CONTENT_SUBTYPE.to_string(),
            timeout: None,
            metadata: HashMap::new(),
        }
    }
}

/// Client of a single server connection. Calls may run concurrently.
#[derive(Debug)]
pub struct Client {
    connection: Connection,
    codecs: Codecs,
}

impl Client {
    pub async fn connect<A: ToSocketAddrs>(address: A) -> RpcResult<Client> {
        Client::connect_with_buffer(address, 100).await
    }

    pub async fn connect_with_buffer<A: ToSocketAddrs>(address: A, buffer_size: usize) -> RpcResult<Client> {
        let stream = TcpStream::connect(address).await?;
        let connection = Connection::connect(stream, buffer_size).await?;
        debug!("Connected to {}", connection.peer());
        Ok(Client {
            connection,
            codecs: Codecs::default(),
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.connection.peer()
    }

    /// Registers codec under its name, replacing a codec registered before under that name.
    pub fn register_codec<C: Codec + 'static>(&mut self, codec: C) -> &mut Self {
        self.codecs.register(codec);
        self
    }

    /// Calls `method` with default options.
    pub async fn call<REQ: Message, RES: Message>(&self, method: &str, request: &REQ) -> RpcResult<RES> {
        self.call_with(method, request, &CallOptions::default()).await
    }

    pub async fn call_with<REQ: Message, RES: Message>(
        &self,
        method: &str,
        request: &REQ,
        options: &CallOptions,
    ) -> RpcResult<RES> {
        let codec = self.codecs.get(options.content_subtype()).ok_or_else(|| {
            RpcError::Error(format!(
                "No codec registered for content subtype '{}'",
                options.content_subtype()
            ))
        })?;
        let body = request.encode(codec.as_ref())?;
        let response = self.send(method, body, options).await?;
        Ok(RES::decode(codec.as_ref(), response.as_ref())?)
    }

    /// Sends `body` as is and returns the response body as is.
    pub async fn call_raw(&self, method: &str, body: RawMessage, options: &CallOptions) -> RpcResult<RawMessage> {
        let response = self.send(method, body.into_body(), options).await?;
        Ok(RawMessage::new(response))
    }

    async fn send(&self, method: &str, body: Bytes, options: &CallOptions) -> RpcResult<Bytes> {
        let ttl = match options.timeout() {
            Some(timeout) => u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX).max(1),
            None => 0,
        };
        let request = CallRequest::new(
            ttl,
            method.to_string(),
            options.content_subtype().clone(),
            options.metadata().clone(),
            body,
        );
        trace!("Calling {} on {}", method, self.peer());
        let frame = Frame::new(Type::CallRequest, request.encode_bytes()?);
        let response = self.connection.send_one(frame).await?;
        match response.code() {
            Code::Ok => Ok(response.into_body()),
            code => Err(Status::new(code, response.message().clone()).into()),
        }
    }
}
