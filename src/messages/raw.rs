use crate::codec::Codec;
use crate::messages::{CodecResult, Message, Payload, Target};
use bytes::Bytes;
use std::fmt::{Display, Formatter};

/// `RawMessage` ferries undecoded bytes.
///
/// Codecs pass it through verbatim in both directions, which lets a caller talk to a method
/// without knowing its schema.
#[derive(Default, Debug, Clone, PartialEq, Eq, Getters, new)]
pub struct RawMessage {
    #[get = "pub"]
    body: Bytes,
}

impl RawMessage {
    pub fn into_body(self) -> Bytes {
        self.body
    }
}

impl Display for RawMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Body: '{}'", String::from_utf8_lossy(&self.body))
    }
}

impl From<Bytes> for RawMessage {
    fn from(body: Bytes) -> Self {
        RawMessage::new(body)
    }
}

impl From<&'static str> for RawMessage {
    fn from(body: &'static str) -> Self {
        RawMessage::new(Bytes::from(body))
    }
}

impl Message for RawMessage {
    fn encode(&self, codec: &dyn Codec) -> CodecResult<Bytes> {
        codec.marshal(Payload::Raw(&self.body))
    }

    fn decode(codec: &dyn Codec, data: &[u8]) -> CodecResult<Self> {
        let mut body = Bytes::new();
        codec.unmarshal(data, Target::Raw(&mut body))?;
        Ok(RawMessage::new(body))
    }
}
