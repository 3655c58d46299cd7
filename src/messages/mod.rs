use crate::codec::Codec;
use crate::errors::CodecError;
use bytes::Bytes;
use std::any::Any;
use std::fmt::Debug;

pub mod json;
pub mod proto;
pub mod raw;

pub use self::json::Json;
pub use self::proto::{DynamicMessage, ReflectMessage};
pub use self::raw::RawMessage;

pub type CodecResult<T> = Result<T, CodecError>;

/// Value handed to [`Codec::marshal`].
#[derive(Debug)]
pub enum Payload<'a> {
    /// Protocol message, viewed through its descriptor.
    Proto(DynamicMessage),
    /// Any other structured value.
    Generic(serde_json::Value),
    /// Undecoded bytes, passed through untouched.
    Raw(&'a [u8]),
}

/// Destination handed to [`Codec::unmarshal`].
#[derive(Debug)]
pub enum Target<'a> {
    Proto(&'a mut DynamicMessage),
    Generic(&'a mut serde_json::Value),
    Raw(&'a mut Bytes),
}

/// Request or response value of a call.
///
/// The implementation decides which [`Payload`] kind the codec sees:
/// `prost` messages implementing [`ReflectMessage`], serde values wrapped in [`Json`], or raw
/// bytes in [`RawMessage`].
pub trait Message: Debug + Send + Sync + Sized + 'static {
    fn encode(&self, codec: &dyn Codec) -> CodecResult<Bytes>;
    fn decode(codec: &dyn Codec, data: &[u8]) -> CodecResult<Self>;
}

/// Type erased [`Message`] travelling through the interceptor pipeline.
pub trait DynMessage: Debug + Send + Sync + 'static {
    fn encode_dyn(&self, codec: &dyn Codec) -> CodecResult<Bytes>;
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<M: Message> DynMessage for M {
    fn encode_dyn(&self, codec: &dyn Codec) -> CodecResult<Bytes> {
        self.encode(codec)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

pub type BoxMessage = Box<dyn DynMessage>;

/// Recovers the concrete message, giving the box back on type mismatch.
pub fn downcast<M: Message>(message: BoxMessage) -> Result<M, BoxMessage> {
    if !message.as_any().is::<M>() {
        return Err(message);
    }
    match message.into_any().downcast::<M>() {
        Ok(message) => Ok(*message),
        Err(_) => unreachable!("type checked above"),
    }
}
