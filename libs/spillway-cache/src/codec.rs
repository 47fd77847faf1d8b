//! Value ⇄ byte conversion at the heap boundary.
//!
//! A [`ValueCodec`] is the serializer pair a caching dictionary is configured
//! with. Encodings are not self-describing (blocks are sized by the
//! allocator, not by the payload), so a decoder is always handed exactly the
//! bytes its encoder produced.

use core::marker::PhantomData;

use bytes::{BufMut as _, Bytes, BytesMut};
use derive_where::derive_where;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::Result;

/// Pure conversion between typed values and byte buffers.
pub trait ValueCodec<T> {
    /// Serializes a value into a fresh buffer.
    fn encode(&self, value: &T) -> Result<Bytes>;

    /// Deserializes a value from exactly the bytes a previous
    /// [`encode`](Self::encode) produced.
    fn decode(&self, bytes: &[u8]) -> Result<T>;
}

/// Encodes values as compact JSON.
#[derive_where(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct JsonCodec<T> {
    /// We use `PhantomData` with `fn() -> T` instead of just `T` to ensure the
    /// codec doesn't impose any bounds on `T` unnecessarily (making it
    /// covariant rather than invariant)
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T: Serialize + DeserializeOwned> ValueCodec<T> for JsonCodec<T> {
    fn encode(&self, value: &T) -> Result<Bytes> {
        let mut writer = BytesMut::new().writer();
        serde_json::to_writer(&mut writer, value)?;
        Ok(writer.into_inner().freeze())
    }

    fn decode(&self, bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Stores strings as their raw UTF-8 bytes, with no framing at all.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Utf8Codec;

impl ValueCodec<String> for Utf8Codec {
    fn encode(&self, value: &String) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(value.as_bytes()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<String> {
        Ok(String::from_utf8(bytes.to_vec())?)
    }
}
