use log::{debug, error};

use prost_reflect::{DescriptorPool, ReflectMessage};
use rpc_chain::messages::proto::descriptor_pool;
use rpc_chain::{CallOptionsBuilder, Client};
use std::sync::LazyLock;
use std::time::Duration;

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
    let address = std::env::args().nth(1).unwrap_or_else(|| "127.0.0.1:8080".to_string());
    let client = Client::connect(address).await?;
    let options = CallOptionsBuilder::default()
        .timeout(Duration::from_secs(1))
        .build()?;
    let request = HelloRequest {
        name: "X".to_string(),
    };
    debug!("sending");
    let reply: HelloReply = client
        .call_with("/testproto.Greeter/SayHello", &request, &options)
        .await?;
    println!("{} (success: {})", reply.message, reply.success);
    Ok(())
}
