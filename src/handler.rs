use crate::codec::Codec;
use crate::context::CallContext;
use crate::errors::Status;
use crate::messages::{downcast, BoxMessage, CodecResult, Message};
use async_trait::async_trait;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

pub type HandlerResult<RES> = Result<RES, Status>;

/// Outcome of one pass through the pipeline.
pub type CallResult = Result<BoxMessage, Status>;

/// Trait for handling requests.
///
/// Handler can be registered under a method name by calling [`Server::register`](crate::Server::register).
pub trait RequestHandler: Debug + Send + Sync + 'static {
    type REQ: Message;
    type RES: Message;
    fn handle(&self, ctx: &CallContext, request: Self::REQ) -> HandlerResult<Self::RES>;
}

/// Trait for handling requests asynchronously.
///
/// Handler can be registered under a method name by calling [`Server::register_async`](crate::Server::register_async).
#[async_trait]
pub trait RequestHandlerAsync: Debug + Send + Sync + 'static {
    type REQ: Message;
    type RES: Message;
    async fn handle(&self, ctx: CallContext, request: Self::REQ) -> HandlerResult<Self::RES>;
}

/// Terminal stage of the pipeline, with request and response types erased.
#[async_trait]
pub trait UnaryHandler: Debug + Send + Sync {
    async fn call(&self, ctx: CallContext, request: BoxMessage) -> CallResult;
}

#[derive(Debug, new)]
pub(crate) struct RequestHandlerAdapter<HANDLER: RequestHandler>(HANDLER);

#[async_trait]
impl<HANDLER: RequestHandler> UnaryHandler for RequestHandlerAdapter<HANDLER> {
    async fn call(&self, ctx: CallContext, request: BoxMessage) -> CallResult {
        let request = downcast_request::<HANDLER::REQ>(request)?;
        let response = self.0.handle(&ctx, request)?;
        Ok(Box::new(response))
    }
}

#[derive(Debug, new)]
pub(crate) struct RequestHandlerAsyncAdapter<HANDLER: RequestHandlerAsync>(HANDLER);

#[async_trait]
impl<HANDLER: RequestHandlerAsync> UnaryHandler for RequestHandlerAsyncAdapter<HANDLER> {
    async fn call(&self, ctx: CallContext, request: BoxMessage) -> CallResult {
        let request = downcast_request::<HANDLER::REQ>(request)?;
        let response = self.0.handle(ctx, request).await?;
        Ok(Box::new(response))
    }
}

fn downcast_request<REQ: Message>(request: BoxMessage) -> Result<REQ, Status> {
    downcast::<REQ>(request).map_err(|request| {
        Status::internal(format!(
            "Unexpected request type for handler: {:?}",
            request
        ))
    })
}

type RequestDecoder = fn(&dyn Codec, &[u8]) -> CodecResult<BoxMessage>;

fn decode_as<REQ: Message>(codec: &dyn Codec, data: &[u8]) -> CodecResult<BoxMessage> {
    Ok(Box::new(REQ::decode(codec, data)?))
}

/// Registered method: how to decode its request and which handler ends its chain.
#[derive(Clone)]
pub(crate) struct Method {
    decoder: RequestDecoder,
    handler: Arc<dyn UnaryHandler>,
}

impl Debug for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Method")
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}

impl Method {
    pub fn from_sync<HANDLER: RequestHandler>(handler: HANDLER) -> Method {
        Method {
            decoder: decode_as::<HANDLER::REQ>,
            handler: Arc::new(RequestHandlerAdapter::new(handler)),
        }
    }

    pub fn from_async<HANDLER: RequestHandlerAsync>(handler: HANDLER) -> Method {
        Method {
            decoder: decode_as::<HANDLER::REQ>,
            handler: Arc::new(RequestHandlerAsyncAdapter::new(handler)),
        }
    }

    pub fn decode(&self, codec: &dyn Codec, data: &[u8]) -> CodecResult<BoxMessage> {
        (self.decoder)(codec, data)
    }

    pub fn handler(&self) -> &dyn UnaryHandler {
        self.handler.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;
    use crate::errors::Code;
    use crate::messages::{Json, RawMessage};

    #[derive(Debug)]
    struct Echo {}

    impl RequestHandler for Echo {
        type REQ = RawMessage;
        type RES = RawMessage;
        fn handle(&self, _ctx: &CallContext, request: Self::REQ) -> HandlerResult<Self::RES> {
            Ok(request)
        }
    }

    #[derive(Debug)]
    struct Length {}

    #[async_trait]
    impl RequestHandlerAsync for Length {
        type REQ = Json<String>;
        type RES = Json<usize>;
        async fn handle(&self, _ctx: CallContext, request: Self::REQ) -> HandlerResult<Self::RES> {
            Ok(Json(request.len()))
        }
    }

    #[tokio::test]
    async fn decodes_and_calls_sync_handler() {
        let method = Method::from_sync(Echo {});
        let codec = JsonCodec::default();

        let request = method.decode(&codec, b"ping").unwrap();
        let response = method
            .handler()
            .call(CallContext::new("/echo", None), request)
            .await
            .unwrap();

        assert_eq!(
            RawMessage::from("ping"),
            downcast::<RawMessage>(response).unwrap()
        );
    }

    #[tokio::test]
    async fn decodes_and_calls_async_handler() {
        let method = Method::from_async(Length {});
        let codec = JsonCodec::default();

        let request = method.decode(&codec, br#""four""#).unwrap();
        let response = method
            .handler()
            .call(CallContext::new("/length", None), request)
            .await
            .unwrap();

        assert_eq!(Json(4), downcast::<Json<usize>>(response).unwrap());
    }

    #[tokio::test]
    async fn rejects_request_of_wrong_type() {
        let method = Method::from_sync(Echo {});

        let status = method
            .handler()
            .call(CallContext::new("/echo", None), Box::new(Json(1u8)))
            .await
            .unwrap_err();

        assert_eq!(Code::Internal, status.code());
    }
}
