use crate::errors::{Code, FrameError};
use crate::frames::FrameResult;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use num_traits::FromPrimitive;
use std::collections::HashMap;
use std::convert::TryFrom;

pub trait FramePayload: Sized {
    fn encode(self, dst: &mut BytesMut) -> FrameResult<()>;
    fn decode(src: &mut Bytes) -> FrameResult<Self>;

    fn encode_bytes(self) -> FrameResult<Bytes> {
        let mut bytes = BytesMut::new();
        self.encode(&mut bytes)?;
        Ok(bytes.freeze())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters, new)]
pub struct CallRequest {
    #[get_copy = "pub"]
    /// ttl:4, milliseconds, 0 for none
    ttl: u32,
    #[get = "pub"]
    /// method~2
    method: String,
    #[get = "pub"]
    /// subtype~1
    content_subtype: String,
    #[get = "pub"]
    /// nh:1 (hk~1, hv~1){nh}
    headers: HashMap<String, String>,
    #[get = "pub"]
    /// remaining bytes
    body: Bytes,
}

impl CallRequest {
    pub fn into_parts(self) -> (String, String, HashMap<String, String>, Bytes) {
        (self.method, self.content_subtype, self.headers, self.body)
    }
}

impl FramePayload for CallRequest {
    fn encode(self, dst: &mut BytesMut) -> FrameResult<()> {
        dst.put_u32(self.ttl);
        encode_string(&self.method, dst)?;
        encode_small_string(&self.content_subtype, dst)?;
        encode_small_headers(&self.headers, dst)?;
        dst.put(self.body);
        Ok(())
    }

    fn decode(src: &mut Bytes) -> FrameResult<Self> {
        Ok(CallRequest::new(
            decode_u32(src)?,
            decode_string(src)?,
            decode_small_string(src)?,
            decode_small_headers(src)?,
            src.split_off(0),
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters, new)]
pub struct CallResponse {
    #[get_copy = "pub"]
    /// code:1
    code: Code,
    #[get = "pub"]
    /// message~2
    message: String,
    #[get = "pub"]
    /// remaining bytes
    body: Bytes,
}

impl CallResponse {
    pub fn into_body(self) -> Bytes {
        self.body
    }
}

impl FramePayload for CallResponse {
    fn encode(self, dst: &mut BytesMut) -> FrameResult<()> {
        dst.put_u8(self.code as u8);
        encode_string(&self.message, dst)?;
        dst.put(self.body);
        Ok(())
    }

    fn decode(src: &mut Bytes) -> FrameResult<Self> {
        let code_byte = decode_u8(src)?;
        let code = Code::from_u8(code_byte)
            .ok_or_else(|| FrameError::Error(format!("Unknown status code: {}", code_byte)))?;
        Ok(CallResponse::new(
            code,
            decode_string(src)?,
            src.split_off(0),
        ))
    }
}

fn encode_small_headers(headers: &HashMap<String, String>, dst: &mut BytesMut) -> FrameResult<()> {
    dst.put_u8(encode_len(headers.len())?);
    for (key, value) in headers {
        encode_small_string(key, dst)?;
        encode_small_string(value, dst)?;
    }
    Ok(())
}

fn decode_small_headers(src: &mut Bytes) -> FrameResult<HashMap<String, String>> {
    let len = decode_u8(src)?;
    let mut headers = HashMap::new();
    for _ in 0..len {
        let key = decode_small_string(src)?;
        let value = decode_small_string(src)?;
        headers.insert(key, value);
    }
    Ok(headers)
}

fn encode_string(value: &str, dst: &mut BytesMut) -> FrameResult<()> {
    dst.put_u16(encode_len(value.len())?);
    dst.put_slice(value.as_bytes());
    Ok(())
}

fn encode_small_string(value: &str, dst: &mut BytesMut) -> FrameResult<()> {
    dst.put_u8(encode_len(value.len())?);
    dst.put_slice(value.as_bytes());
    Ok(())
}

fn decode_string(src: &mut Bytes) -> FrameResult<String> {
    let len = decode_u16(src)?;
    decode_string_field(src, len as usize)
}

fn decode_small_string(src: &mut Bytes) -> FrameResult<String> {
    let len = decode_u8(src)?;
    decode_string_field(src, len as usize)
}

fn decode_string_field(src: &mut Bytes, len: usize) -> FrameResult<String> {
    ensure_remaining(src, len)?;
    let bytes = src.split_to(len);
    Ok(String::from_utf8(bytes.to_vec())?)
}

fn encode_len<T: TryFrom<usize>>(value: usize) -> FrameResult<T> {
    T::try_from(value).map_err(|_| FrameError::Error(format!("Field length {} out of range", value)))
}

fn decode_u8(src: &mut Bytes) -> FrameResult<u8> {
    ensure_remaining(src, 1)?;
    Ok(src.get_u8())
}

fn decode_u16(src: &mut Bytes) -> FrameResult<u16> {
    ensure_remaining(src, 2)?;
    Ok(src.get_u16())
}

fn decode_u32(src: &mut Bytes) -> FrameResult<u32> {
    ensure_remaining(src, 4)?;
    Ok(src.get_u32())
}

fn ensure_remaining(src: &Bytes, len: usize) -> FrameResult<()> {
    if src.remaining() < len {
        return Err(FrameError::Error(format!(
            "Truncated frame: need {} bytes, {} left",
            len,
            src.remaining()
        )));
    }
    Ok(())
}
