use crate::codec::Codec;
use crate::messages::{CodecResult, DynamicMessage, Payload, Target};
use bytes::Bytes;
use prost_reflect::{DeserializeOptions, ReflectMessage, SerializeOptions};

pub const NAME: &str = "json";

/// Text encoding options for protocol messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder, CopyGetters)]
#[builder(default)]
pub struct JsonOptions {
    /// Writes fields holding default values instead of omitting them.
    #[get_copy = "pub"]
    emit_defaults: bool,
    /// Uses declared field names instead of lowerCamelCase ones.
    #[get_copy = "pub"]
    orig_name: bool,
}

impl Default for JsonOptions {
    fn default() -> Self {
        JsonOptions {
            emit_defaults: true,
            orig_name: true,
        }
    }
}

impl JsonOptions {
    fn serialize_options(&self) -> SerializeOptions {
        SerializeOptions::new()
            .skip_default_fields(!self.emit_defaults)
            .use_proto_field_name(self.orig_name)
    }
}

/// The `json` codec.
///
/// Protocol messages use their canonical JSON mapping (64-bit integers as strings, bytes as
/// base64, enums by name), other values plain JSON and raw messages pass through unchanged.
/// Decoding accepts original and lowerCamelCase names and rejects unknown fields. An empty
/// body decodes to the default protocol message.
#[derive(Debug, Clone, Default, CopyGetters, new)]
pub struct JsonCodec {
    #[get_copy = "pub"]
    options: JsonOptions,
}

impl Codec for JsonCodec {
    fn name(&self) -> &str {
        NAME
    }

    fn marshal(&self, payload: Payload<'_>) -> CodecResult<Bytes> {
        match payload {
            Payload::Proto(message) => {
                let mut serializer = serde_json::Serializer::new(Vec::new());
                message.serialize_with_options(&mut serializer, &self.options.serialize_options())?;
                Ok(Bytes::from(serializer.into_inner()))
            }
            Payload::Generic(value) => Ok(Bytes::from(serde_json::to_vec(&value)?)),
            Payload::Raw(bytes) => Ok(Bytes::copy_from_slice(bytes)),
        }
    }

    fn unmarshal(&self, data: &[u8], target: Target<'_>) -> CodecResult<()> {
        match target {
            Target::Proto(message) => {
                if data.iter().all(u8::is_ascii_whitespace) {
                    return Ok(());
                }
                let mut deserializer = serde_json::Deserializer::from_slice(data);
                *message = DynamicMessage::deserialize_with_options(
                    message.descriptor(),
                    &mut deserializer,
                    &DeserializeOptions::new(),
                )?;
                deserializer.end()?;
                Ok(())
            }
            Target::Generic(slot) => {
                *slot = serde_json::from_slice(data)?;
                Ok(())
            }
            Target::Raw(slot) => {
                *slot = Bytes::copy_from_slice(data);
                Ok(())
            }
        }
    }
}
