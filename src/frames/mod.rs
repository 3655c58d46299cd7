pub mod payloads;

use crate::errors::FrameError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use num_traits::FromPrimitive;
use tokio_util::codec::{Decoder, Encoder};

pub type FrameResult<T> = Result<T, FrameError>;

/// size:4 type:1 id:4
pub const FRAME_HEADER_LENGTH: usize = 9;
pub const FRAME_MAX_LENGTH: usize = 4 << 20;

#[derive(Copy, Clone, Debug, FromPrimitive, PartialEq, Eq)]
pub enum Type {
    // RPC method request
    CallRequest = 0x3,

    // RPC method response
    CallResponse = 0x4,
}

#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters, new)]
pub struct Frame {
    #[get_copy = "pub"]
    frame_type: Type,
    #[get = "pub"]
    payload: Bytes,
}

impl Frame {
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}

/// Frame tagged with the id of the call it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters, new)]
pub struct FrameId {
    #[get_copy = "pub"]
    id: u32,
    #[get = "pub"]
    frame: Frame,
}

impl FrameId {
    pub fn into_frame(self) -> Frame {
        self.frame
    }
}

#[derive(Default, Debug)]
pub struct FrameCodec {}

impl Encoder<FrameId> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: FrameId, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let frame = item.frame();
        let len = frame.size() + FRAME_HEADER_LENGTH;
        if len > FRAME_MAX_LENGTH {
            return Err(FrameError::TooLarge {
                size: len,
                max: FRAME_MAX_LENGTH,
            });
        }
        dst.reserve(len);
        dst.put_u32(len as u32);
        dst.put_u8(frame.frame_type() as u8);
        dst.put_u32(item.id());
        dst.put_slice(frame.payload());
        Ok(())
    }
}

impl Decoder for FrameCodec {
    type Item = FrameId;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < FRAME_HEADER_LENGTH {
            return Ok(None);
        }
        let size = (&src[..4]).get_u32() as usize;
        if size < FRAME_HEADER_LENGTH {
            return Err(FrameError::Error(format!("Frame too short: {}", size)));
        }
        if size > FRAME_MAX_LENGTH {
            return Err(FrameError::TooLarge {
                size,
                max: FRAME_MAX_LENGTH,
            });
        }
        if src.len() < size {
            trace!("Waiting for {} more bytes", size - src.len());
            src.reserve(size - src.len());
            return Ok(None);
        }
        let mut frame = src.split_to(size).freeze();
        frame.advance(4);
        let frame_type_byte = frame.get_u8();
        let frame_type =
            Type::from_u8(frame_type_byte).ok_or(FrameError::UnknownType(frame_type_byte))?;
        let id = frame.get_u32();
        Ok(Some(FrameId::new(id, Frame::new(frame_type, frame))))
    }
}
