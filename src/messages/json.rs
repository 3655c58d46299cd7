use crate::codec::Codec;
use crate::messages::{CodecResult, Message, Payload, Target};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Debug;
use std::ops::{Deref, DerefMut};

/// Wraps any serde value that is not a protocol message.
///
/// Codecs see it as [`Payload::Generic`] and encode its public shape as plain JSON.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for Json<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T> Message for Json<T>
where
    T: Serialize + DeserializeOwned + Debug + Send + Sync + 'static,
{
    fn encode(&self, codec: &dyn Codec) -> CodecResult<Bytes> {
        codec.marshal(Payload::Generic(serde_json::to_value(&self.0)?))
    }

    fn decode(codec: &dyn Codec, data: &[u8]) -> CodecResult<Self> {
        let mut value = Value::Null;
        codec.unmarshal(data, Target::Generic(&mut value))?;
        Ok(Json(serde_json::from_value(value)?))
    }
}
