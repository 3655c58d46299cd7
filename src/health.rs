use crate::context::CallContext;
use crate::handler::{HandlerResult, Method, RequestHandler};
use crate::messages::proto::{descriptor_pool, DescriptorPool};
use prost_reflect::ReflectMessage;
use std::sync::LazyLock;
use strum_macros::Display;

pub const SERVICE_NAME: &str = "grpc.health.v1.Health";
pub const CHECK_METHOD: &str = "/grpc.health.v1.Health/Check";
pub const WATCH_METHOD: &str = "/grpc.health.v1.Health/Watch";

const EMPTY_PROTO: &str = r#"
syntax = "proto3";
package google.protobuf;

message Empty {}
"#;

const HEALTH_PROTO: &str = r#"
syntax = "proto3";
package grpc.health.v1;

message HealthCheckRequest {
    string service = 1;
}

message HealthCheckResponse {
    enum ServingStatus {
        UNKNOWN = 0;
        SERVING = 1;
        NOT_SERVING = 2;
        SERVICE_UNKNOWN = 3;
    }
    ServingStatus status = 1;
}
"#;

// Both sources are fixed, so building the pool only fails on a broken build.
static DESCRIPTOR_POOL: LazyLock<DescriptorPool> = LazyLock::new(|| {
    descriptor_pool(&[
        ("google/protobuf/empty.proto", EMPTY_PROTO),
        ("grpc/health/v1/health.proto", HEALTH_PROTO),
    ])
    .expect("health service schema compiles")
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, prost::Enumeration)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(i32)]
pub enum ServingStatus {
    Unknown = 0,
    Serving = 1,
    NotServing = 2,
    ServiceUnknown = 3,
}

#[derive(Clone, PartialEq, prost::Message, ReflectMessage)]
#[prost_reflect(descriptor_pool = "DESCRIPTOR_POOL", message_name = "grpc.health.v1.HealthCheckRequest")]
pub struct HealthCheckRequest {
    #[prost(string, tag = "1")]
    pub service: String,
}

#[derive(Clone, PartialEq, prost::Message, ReflectMessage)]
#[prost_reflect(descriptor_pool = "DESCRIPTOR_POOL", message_name = "grpc.health.v1.HealthCheckResponse")]
pub struct HealthCheckResponse {
    #[prost(enumeration = "ServingStatus", tag = "1")]
    pub status: i32,
}

#[derive(Clone, PartialEq, prost::Message, ReflectMessage)]
#[prost_reflect(descriptor_pool = "DESCRIPTOR_POOL", message_name = "google.protobuf.Empty")]
pub struct Empty {}

/// Answers `SERVING` for as long as the server accepts calls.
#[derive(Debug, Default)]
pub struct HealthCheck {}

impl RequestHandler for HealthCheck {
    type REQ = HealthCheckRequest;
    type RES = HealthCheckResponse;

    fn handle(&self, ctx: &CallContext, request: Self::REQ) -> HandlerResult<Self::RES> {
        let status = ServingStatus::Serving;
        trace!("Health check of '{}' from {:?}: {}", request.service, ctx.peer(), status);
        Ok(HealthCheckResponse {
            status: status.into(),
        })
    }
}

/// Placeholder for status streaming: completes at once with an empty message.
#[derive(Debug, Default)]
pub struct HealthWatch {}

impl RequestHandler for HealthWatch {
    type REQ = HealthCheckRequest;
    type RES = Empty;

    fn handle(&self, _ctx: &CallContext, _request: Self::REQ) -> HandlerResult<Self::RES> {
        Ok(Empty {})
    }
}

pub(crate) fn methods() -> Vec<(&'static str, Method)> {
    vec![
        (CHECK_METHOD, Method::from_sync(HealthCheck::default())),
        (WATCH_METHOD, Method::from_sync(HealthWatch::default())),
    ]
}
