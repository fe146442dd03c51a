//! # Binary Codec
//!
//! Typed reads and writes over a frame payload.
//!
//! [`PacketReader`] is a cursor over a borrowed byte slice; reading past the
//! end fails with [`ProtocolError::BufferUnderrun`] and leaves the cursor
//! where it was. [`PacketWriter`] appends to a growable buffer and never fails.
//!
//! Field widths that differ between dialects (`Id` and array lengths) are
//! decided by the [`ClientType`] the reader or writer was created for.
//!
//! ## Layout
//! ```text
//! String: [byteLength u16] [UTF-8 bytes]
//! Array:  [count Length]   [count x record]
//! Id:     i64 (Unity) | i32 (Flash, Shockwave)
//! Length: i16 (Unity) | i32 (Flash, Shockwave)
//! ```
//!
//! ## Limits
//! Writes never fail, so values a dialect cannot carry are cut down to fit
//! and logged at `warn`:
//! - strings keep at most `u16::MAX` bytes, cut at a char boundary
//! - arrays keep at most [`ClientType::max_array_length`] elements
//! - ids outside the `i32` range are truncated on 32-bit id dialects

use crate::error::{ProtocolError, Result};
use crate::protocol::client::ClientType;
use crate::protocol::identifier::Identifier;
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Entity identity. Stable across rooms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Id(pub i64);

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Id {
    fn from(value: i64) -> Self {
        Id(value)
    }
}

impl From<i32> for Id {
    fn from(value: i32) -> Self {
        Id(value as i64)
    }
}

/// A structured record that can be read from a payload.
pub trait Parse: Sized {
    fn parse(p: &mut PacketReader<'_>) -> Result<Self>;
}

/// A structured record that can be written to a payload.
pub trait Compose {
    fn compose(&self, p: &mut PacketWriter);
}

/// Cursor over a frame payload.
#[derive(Debug, Clone)]
pub struct PacketReader<'a> {
    client: ClientType,
    identifier: Option<Identifier>,
    data: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    pub fn new(client: ClientType, data: &'a [u8]) -> Self {
        Self {
            client,
            identifier: None,
            data,
            pos: 0,
        }
    }

    /// Tag the reader with the identifier the frame was classified as.
    pub fn with_identifier(mut self, identifier: Identifier) -> Self {
        self.identifier = Some(identifier);
        self
    }

    pub fn client(&self) -> ClientType {
        self.client
    }

    pub fn identifier(&self) -> Option<Identifier> {
        self.identifier
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8]> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(ProtocolError::BufferUnderrun { needed, remaining });
        }
        let slice = &self.data[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take_array::<1>()?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.take_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_be_bytes(self.take_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.take_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.take_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.take_array()?))
    }

    pub fn read_id(&mut self) -> Result<Id> {
        if self.client.has_long_ids() {
            self.read_i64().map(Id)
        } else {
            self.read_i32().map(Id::from)
        }
    }

    /// Read an array length. Negative lengths are rejected.
    pub fn read_length(&mut self) -> Result<usize> {
        let start = self.pos;
        let raw = if self.client.has_short_lengths() {
            self.read_i16()? as i64
        } else {
            self.read_i32()? as i64
        };
        if raw < 0 {
            self.pos = start;
            return Err(ProtocolError::InvalidLength(raw));
        }
        Ok(raw as usize)
    }

    pub fn read_string(&mut self) -> Result<String> {
        let start = self.pos;
        let len = self.read_u16()? as usize;
        let bytes = match self.take(len) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.pos = start;
                return Err(e);
            }
        };
        match std::str::from_utf8(bytes) {
            Ok(s) => Ok(s.to_owned()),
            Err(_) => {
                self.pos = start;
                Err(ProtocolError::InvalidString)
            }
        }
    }

    /// Read a floating point value the protocol carries as text.
    pub fn read_float_string(&mut self) -> Result<f64> {
        let text = self.read_string()?;
        text.trim()
            .parse::<f64>()
            .map_err(|_| ProtocolError::InvalidFrame(format!("not a number: {text:?}")))
    }

    pub fn parse<T: Parse>(&mut self) -> Result<T> {
        T::parse(self)
    }

    /// Read a length-prefixed array of records.
    pub fn parse_array<T: Parse>(&mut self) -> Result<Vec<T>> {
        let len = self.read_length()?;
        // Cap the pre-allocation by what the payload could possibly hold.
        let mut items = Vec::with_capacity(len.min(self.remaining()));
        for _ in 0..len {
            items.push(T::parse(self)?);
        }
        Ok(items)
    }

    /// Remaining unread bytes.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}

/// Growable payload writer.
#[derive(Debug, Clone)]
pub struct PacketWriter {
    client: ClientType,
    buf: BytesMut,
}

impl PacketWriter {
    pub fn new(client: ClientType) -> Self {
        Self {
            client,
            buf: BytesMut::new(),
        }
    }

    pub fn with_capacity(client: ClientType, capacity: usize) -> Self {
        Self {
            client,
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn client(&self) -> ClientType {
        self.client
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buf.put_u8(value);
        self
    }

    pub fn write_bool(&mut self, value: bool) -> &mut Self {
        self.write_u8(value as u8)
    }

    pub fn write_u16(&mut self, value: u16) -> &mut Self {
        self.buf.put_u16(value);
        self
    }

    pub fn write_i16(&mut self, value: i16) -> &mut Self {
        self.buf.put_i16(value);
        self
    }

    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        self.buf.put_u32(value);
        self
    }

    pub fn write_i32(&mut self, value: i32) -> &mut Self {
        self.buf.put_i32(value);
        self
    }

    pub fn write_i64(&mut self, value: i64) -> &mut Self {
        self.buf.put_i64(value);
        self
    }

    /// Write an `Id`. On 32-bit dialects the value is truncated to `i32`.
    pub fn write_id(&mut self, id: Id) -> &mut Self {
        if self.client.has_long_ids() {
            return self.write_i64(id.0);
        }
        if i32::try_from(id.0).is_err() {
            warn!(%id, client = ?self.client, "Id does not fit in 32 bits, truncating");
        }
        self.write_i32(id.0 as i32)
    }

    /// Write an array length, clamped to [`ClientType::max_array_length`].
    pub fn write_length(&mut self, len: usize) -> &mut Self {
        let max = self.client.max_array_length();
        if len > max {
            warn!(len, max, client = ?self.client, "Array length exceeds dialect limit, clamping");
        }
        if self.client.has_short_lengths() {
            self.write_i16(i16::try_from(len).unwrap_or(i16::MAX))
        } else {
            self.write_i32(i32::try_from(len).unwrap_or(i32::MAX))
        }
    }

    /// Write a string. Strings longer than `u16::MAX` bytes are truncated at a char boundary.
    pub fn write_string(&mut self, value: &str) -> &mut Self {
        let mut end = value.len().min(u16::MAX as usize);
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        if end < value.len() {
            warn!(len = value.len(), kept = end, "String exceeds u16 length prefix, truncating");
        }
        self.buf.put_u16(end as u16);
        self.buf.put_slice(&value.as_bytes()[..end]);
        self
    }

    pub fn write_float_string(&mut self, value: f64) -> &mut Self {
        self.write_string(&value.to_string())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.put_slice(bytes);
        self
    }

    pub fn compose<T: Compose + ?Sized>(&mut self, value: &T) -> &mut Self {
        value.compose(self);
        self
    }

    /// Write a length-prefixed array. Elements past the dialect limit are dropped.
    pub fn compose_array<T: Compose>(&mut self, items: &[T]) -> &mut Self {
        let items = &items[..items.len().min(self.client.max_array_length())];
        self.write_length(items.len());
        for item in items {
            item.compose(self);
        }
        self
    }

    pub fn write_value(&mut self, value: &Value) -> &mut Self {
        match value {
            Value::Bool(v) => self.write_bool(*v),
            Value::Byte(v) => self.write_u8(*v),
            Value::Short(v) => self.write_i16(*v),
            Value::Int(v) => self.write_i32(*v),
            Value::Long(v) => self.write_i64(*v),
            Value::Id(v) => self.write_id(*v),
            Value::Length(v) => self.write_length(*v),
            Value::Str(v) => self.write_string(v),
        }
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn into_inner(self) -> BytesMut {
        self.buf
    }
}

/// A loosely typed field for composing a payload by identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Byte(u8),
    Short(i16),
    Int(i32),
    Long(i64),
    Id(Id),
    Length(usize),
    Str(String),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::Byte(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Short(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<Id> for Value {
    fn from(v: Id) -> Self {
        Value::Id(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}
