use crate::messages::{CodecResult, Payload, Target};
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

pub mod json;

pub use self::json::{JsonCodec, JsonOptions, JsonOptionsBuilder};

/// Content subtype used when a call does not name one.
pub const DEFAULT_CONTENT_SUBTYPE: &str = json::NAME;

/// Payload serialization strategy, selected per call by content subtype.
pub trait Codec: Debug + Send + Sync {
    /// Content subtype this codec answers to.
    fn name(&self) -> &str;

    fn marshal(&self, payload: Payload<'_>) -> CodecResult<Bytes>;

    fn unmarshal(&self, data: &[u8], target: Target<'_>) -> CodecResult<()>;
}

/// Codecs of one server or client, keyed by content subtype.
///
/// Holds exactly one codec per name; registering a name again replaces the previous codec.
#[derive(Debug, Clone)]
pub struct Codecs {
    codecs: HashMap<String, Arc<dyn Codec>>,
}

impl Default for Codecs {
    fn default() -> Self {
        let mut codecs = Codecs::empty();
        codecs.register(JsonCodec::default());
        codecs
    }
}

impl Codecs {
    pub fn empty() -> Self {
        Codecs {
            codecs: HashMap::new(),
        }
    }

    /// Registers `codec` under its name. Returns the codec it replaced.
    pub fn register<C: Codec + 'static>(&mut self, codec: C) -> Option<Arc<dyn Codec>> {
        let name = codec.name().to_ascii_lowercase();
        debug!("Registering codec '{}'", name);
        self.codecs.insert(name, Arc::new(codec))
    }

    /// Codec for `content_subtype`; an empty subtype selects the default codec.
    pub fn get(&self, content_subtype: &str) -> Option<Arc<dyn Codec>> {
        let name = match content_subtype.trim() {
            "" => DEFAULT_CONTENT_SUBTYPE.to_string(),
            name => name.to_ascii_lowercase(),
        };
        self.codecs.get(&name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.codecs.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::RawMessage;
    use crate::messages::Message;

    #[derive(Debug)]
    struct Upper {}

    impl Codec for Upper {
        fn name(&self) -> &str {
            "JSON"
        }

        fn marshal(&self, payload: Payload<'_>) -> CodecResult<Bytes> {
            match payload {
                Payload::Raw(bytes) => Ok(Bytes::from(bytes.to_ascii_uppercase())),
                _ => Ok(Bytes::new()),
            }
        }

        fn unmarshal(&self, _data: &[u8], _target: Target<'_>) -> CodecResult<()> {
            Ok(())
        }
    }

    #[test]
    fn default_table_holds_json() {
        let codecs = Codecs::default();

        assert_eq!(vec!["json"], codecs.names());
        assert_eq!("json", codecs.get("").unwrap().name());
        assert_eq!("json", codecs.get("Json").unwrap().name());
        assert!(codecs.get("proto").is_none());
    }

    #[test]
    fn last_registered_codec_wins() {
        let mut codecs = Codecs::default();

        let replaced = codecs.register(Upper {});
        let codec = codecs.get("json").unwrap();

        assert_eq!("json", replaced.unwrap().name());
        assert_eq!(1, codecs.names().len());
        assert_eq!(
            Bytes::from("BODY"),
            RawMessage::from("body").encode(codec.as_ref()).unwrap()
        );
    }
}
