//! Core of an RPC server: an ordered interceptor pipeline wrapped around every call, pluggable
//! payload codecs negotiated per call, and a bootstrap that announces the server to a service
//! registry.
//!
//! ## Overview
//!
//! * Calls travel over TCP in length prefixed frames, many calls per connection, answered out
//!   of order.
//! * Every call passes through a [`Pipeline`](crate::pipeline::Pipeline) of up to
//!   [`MAX_INTERCEPTORS`](crate::pipeline::MAX_INTERCEPTORS) interceptors. A new
//!   [`Server`] installs [`RecoveryInterceptor`](crate::interceptor::RecoveryInterceptor)
//!   (a panic becomes an `INTERNAL` status) and then
//!   [`LoggingInterceptor`](crate::interceptor::LoggingInterceptor).
//! * Payloads are serialized by the [`Codec`](crate::codec::Codec) named in the call. The
//!   `json` codec writes `prost` messages in their JSON mapping (through their `prost-reflect`
//!   descriptors), [`Json`](crate::messages::Json) values with serde and passes
//!   [`RawMessage`](crate::messages::RawMessage) bytes through untouched.
//! * On startup the server registers `{name}-{host}-{port}` with a Consul agent (or any other
//!   [`Registry`](crate::registry::Registry)) together with a health check.
//!
//! ## Examples
//!
//! ```
//! use rpc_chain::context::CallContext;
//! use rpc_chain::handler::{HandlerResult, RequestHandler};
//! use prost_reflect::{DescriptorPool, ReflectMessage};
//! use rpc_chain::messages::proto::descriptor_pool;
//! use rpc_chain::{Client, Server, ServerConfigBuilder};
//! use std::sync::LazyLock;
//!
//! static DESCRIPTOR_POOL: LazyLock<DescriptorPool> = LazyLock::new(|| {
//!     descriptor_pool(&[(
//!         "testproto/hello.proto",
//!         r#"
//!             syntax = "proto3";
//!             package testproto;
//!             message HelloRequest { string name = 1; }
//!             message HelloReply { string message = 1; bool success = 2; }
//!         "#,
//!     )])
//!     .unwrap()
//! });
//!
//! #[derive(Clone, PartialEq, prost::Message, ReflectMessage)]
//! #[prost_reflect(descriptor_pool = "DESCRIPTOR_POOL", message_name = "testproto.HelloRequest")]
//! pub struct HelloRequest {
//!     #[prost(string, tag = "1")]
//!     pub name: String,
//! }
//!
//! #[derive(Clone, PartialEq, prost::Message, ReflectMessage)]
//! #[prost_reflect(descriptor_pool = "DESCRIPTOR_POOL", message_name = "testproto.HelloReply")]
//! pub struct HelloReply {
//!     #[prost(string, tag = "1")]
//!     pub message: String,
//!     #[prost(bool, tag = "2")]
//!     pub success: bool,
//! }
//!
//! #[derive(Debug)]
//! struct Greeter {}
//!
//! impl RequestHandler for Greeter {
//!     type REQ = HelloRequest;
//!     type RES = HelloReply;
//!     fn handle(&self, _ctx: &CallContext, request: Self::REQ) -> HandlerResult<Self::RES> {
//!         Ok(HelloReply {
//!             message: format!("hello {}", request.name),
//!             success: true,
//!         })
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Server
//!     let config = ServerConfigBuilder::default().address("127.0.0.1:0").build()?;
//!     let mut server = Server::new(config)?;
//!     server.register("/testproto.Greeter/SayHello", Greeter {})?;
//!     let server = server.spawn().await?;
//!
//!     // Client
//!     let client = Client::connect(server.local_addr()).await?;
//!     let request = HelloRequest { name: "X".to_string() };
//!     let reply: HelloReply = client.call("/testproto.Greeter/SayHello", &request).await?;
//!
//!     // Server shutdown
//!     server.shutdown().await?;
//!
//!     assert_eq!("hello X", reply.message);
//!     assert!(reply.success);
//!     Ok(())
//! }
//! ```

#[macro_use]
extern crate getset;
#[macro_use]
extern crate num_derive;
#[macro_use]
extern crate derive_builder;
#[macro_use]
extern crate derive_new;
#[macro_use]
extern crate log;

pub(crate) mod connection;
pub(crate) mod frames;

/// Client side of the transport.
pub mod client;
/// Payload codecs and the per instance codec table.
pub mod codec;
pub mod config;
/// Per call context handed through the pipeline.
pub mod context;
/// Errors and call status.
pub mod errors;
/// Handlers registered in [`Server`](crate::Server) and called at the end of the pipeline.
pub mod handler;
/// Health service answering `/grpc.health.v1.Health/Check`.
pub mod health;
/// Interceptor contract and the baseline interceptors.
pub mod interceptor;
/// Messages exchanged with handlers: protocol messages, serde values and raw bytes.
pub mod messages;
pub mod pipeline;
/// Service registries the server announces itself to.
pub mod registry;
pub mod server;

pub use self::client::{CallOptions, CallOptionsBuilder, Client};
pub use self::config::{RegistryConfig, RegistryConfigBuilder, ServerConfig, ServerConfigBuilder};
pub use self::server::{Listener, Server, ServerHandle};
