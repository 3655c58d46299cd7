//! Protocol messages.
//!
//! A protocol message is a `prost` struct that also implements [`ReflectMessage`], so codecs
//! can reach its descriptor. Descriptors live in a [`DescriptorPool`], usually a static one
//! built with [`descriptor_pool`] from the `.proto` sources:
//!
//! ```
//! use prost_reflect::{DescriptorPool, ReflectMessage};
//! use std::sync::LazyLock;
//!
//! static DESCRIPTOR_POOL: LazyLock<DescriptorPool> = LazyLock::new(|| {
//!     rpc_chain::messages::proto::descriptor_pool(&[(
//!         "testproto/hello.proto",
//!         r#"syntax = "proto3"; package testproto; message HelloRequest { string name = 1; }"#,
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
//! ```

use crate::codec::Codec;
use crate::errors::CodecError;
use crate::messages::{CodecResult, Message, Payload, Target};
use bytes::Bytes;

pub use prost_reflect::{DescriptorPool, DynamicMessage, MessageDescriptor, ReflectMessage};

/// Compiles `(file name, source)` pairs into one pool. Files may import files listed before them.
pub fn descriptor_pool(files: &[(&str, &str)]) -> CodecResult<DescriptorPool> {
    let mut pool = DescriptorPool::new();
    for (name, source) in files {
        let file = protox_parse::parse(name, source).map_err(|err| CodecError::SchemaError {
            file: name.to_string(),
            reason: err.to_string(),
        })?;
        pool.add_file_descriptor_proto(file)?;
    }
    Ok(pool)
}

impl<M> Message for M
where
    M: ReflectMessage + Default + 'static,
{
    fn encode(&self, codec: &dyn Codec) -> CodecResult<Bytes> {
        codec.marshal(Payload::Proto(self.transcode_to_dynamic()))
    }

    fn decode(codec: &dyn Codec, data: &[u8]) -> CodecResult<Self> {
        let mut message = DynamicMessage::new(M::default().descriptor());
        codec.unmarshal(data, Target::Proto(&mut message))?;
        Ok(message.transcode_to::<M>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;
    use serde_json::{json, Value};
    use std::sync::LazyLock;

    const SAMPLE_PROTO: &str = r#"
        syntax = "proto3";
        package test;

        message Sample {
            string user_name = 1;
            int64 balance = 2;
            bytes avatar = 3;
            repeated uint32 scores = 4;
        }
    "#;

    static DESCRIPTOR_POOL: LazyLock<DescriptorPool> =
        LazyLock::new(|| descriptor_pool(&[("test/sample.proto", SAMPLE_PROTO)]).unwrap());

    #[derive(Clone, PartialEq, prost::Message, ReflectMessage)]
    #[prost_reflect(descriptor_pool = "DESCRIPTOR_POOL", message_name = "test.Sample")]
    struct Sample {
        #[prost(string, tag = "1")]
        user_name: String,
        #[prost(int64, tag = "2")]
        balance: i64,
        #[prost(bytes = "bytes", tag = "3")]
        avatar: Bytes,
        #[prost(uint32, repeated, tag = "4")]
        scores: Vec<u32>,
    }

    fn to_value(sample: &Sample) -> Value {
        let bytes = sample.encode(&JsonCodec::default()).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn finds_declared_messages() {
        let descriptor = DESCRIPTOR_POOL.get_message_by_name("test.Sample").unwrap();

        assert_eq!(4, descriptor.fields().len());
        assert_eq!(descriptor, Sample::default().descriptor());
    }

    #[test]
    fn rejects_invalid_source() {
        let result = descriptor_pool(&[("broken.proto", "message {")]);

        assert!(matches!(result, Err(CodecError::SchemaError { ref file, .. }) if file == "broken.proto"));
    }

    #[test]
    fn emits_default_fields_under_original_names() {
        assert_eq!(
            json!({
                "user_name": "",
                "balance": "0",
                "avatar": "",
                "scores": [],
            }),
            to_value(&Sample::default())
        );
    }

    #[test]
    fn encodes_wide_integers_and_bytes() {
        let sample = Sample {
            balance: i64::MAX,
            avatar: Bytes::from_static(b"\x00\x01rust"),
            ..Sample::default()
        };

        let value = to_value(&sample);

        assert_eq!(json!("9223372036854775807"), value["balance"]);
        assert_eq!(json!("AAFydXN0"), value["avatar"]);
    }

    #[test]
    fn decodes_original_and_camel_case_names() {
        let codec = JsonCodec::default();

        let sample = Sample::decode(
            &codec,
            br#"{"userName": "cae", "balance": "12", "scores": [1, 2], "avatar": "AAFydXN0"}"#,
        )
        .unwrap();
        let same = Sample::decode(&codec, br#"{"user_name": "cae"}"#).unwrap();

        assert_eq!("cae", sample.user_name);
        assert_eq!(12, sample.balance);
        assert_eq!(vec![1, 2], sample.scores);
        assert_eq!(Bytes::from_static(b"\x00\x01rust"), sample.avatar);
        assert_eq!("cae", same.user_name);
    }

    #[test]
    fn rejects_unknown_field() {
        let result = Sample::decode(&JsonCodec::default(), br#"{"nickname": "cae"}"#);

        assert!(matches!(result, Err(CodecError::JsonError(_))));
    }

    #[test]
    fn rejects_mistyped_value() {
        let result = Sample::decode(&JsonCodec::default(), br#"{"scores": "many"}"#);

        assert!(result.is_err());
    }
}
