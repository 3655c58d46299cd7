use log::{error, info};

use prost_reflect::{DescriptorPool, ReflectMessage};
use rpc_chain::messages::proto::descriptor_pool;
use rpc_chain::context::CallContext;
use rpc_chain::handler::{HandlerResult, RequestHandler};
use rpc_chain::{Server, ServerConfigBuilder};
use std::sync::LazyLock;

type Error = Box<dyn std::error::Error + Send + Sync>;

static DESCRIPTOR_POOL: LazyLock<DescriptorPool> = LazyLock::new(|| {
    descriptor_pool(&[(
        "testproto/hello.proto",
        r#"
            syntax = "proto3";
            package testproto;

            message HelloRequest { string name = 1; }
            message HelloReply { string message = 1; bool success = 2; }
        "#,
    )])
    .expect("hello schema compiles")
});

#[derive(Clone, PartialEq, prost::Message, ReflectMessage)]
#[prost_reflect(descriptor_pool = "DESCRIPTOR_POOL", message_name = "testproto.HelloRequest")]
pub struct HelloRequest {
    #[prost(string, tag = "1")]
    pub name: String,
}

#[derive(Clone, PartialEq, prost::Message, ReflectMessage)]
#[prost_reflect(descriptor_pool = "DESCRIPTOR_POOL", message_name = "testproto.HelloReply")]
pub struct HelloReply {
    #[prost(string, tag = "1")]
    pub message: String,
    #[prost(bool, tag = "2")]
    pub success: bool,
}

#[derive(Debug)]
struct Greeter {}

impl RequestHandler for Greeter {
    type REQ = HelloRequest;
    type RES = HelloReply;
    fn handle(&self, _ctx: &CallContext, request: Self::REQ) -> HandlerResult<Self::RES> {
        Ok(HelloReply {
            message: format!("hello {}", request.name),
            success: true,
        })
    }
}

#[tokio::main]
pub async fn main() -> Result<(), Error> {
    env_logger::init();
    if let Err(err) = run().await {
        error!("Failure: {:?}", err);
        return Err(err);
    }
    Ok(())
}

async fn run() -> Result<(), Error> {
    let config = ServerConfigBuilder::default().address(":8080").build()?;
    let mut server = Server::new(config)?;
    server.register("/testproto.Greeter/SayHello", Greeter {})?;
    let listener = server.listen().await?;
    info!("Serving on {}", listener.local_addr());
    let shutdown = listener.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });
    listener.serve().await?;
    Ok(())
}
