use bytes::Bytes;
use enumflags2::BitFlags;

use crate::{protocol::variation::AddressMode, uint128::UInt128};

/// Classifies a field within its layer's catalog. Frame fields appear in
/// the on-wire bytes; meta fields only configure generation behavior.
#[derive(Debug, BitFlags, Clone, Copy, PartialEq)]
#[repr(u8)]
pub enum FieldFlag {
  Frame = 0b01,
  Meta = 0b10,
}

pub fn frame_field() -> BitFlags<FieldFlag> {
  FieldFlag::Frame.into()
}

pub fn meta_field() -> BitFlags<FieldFlag> {
  FieldFlag::Meta.into()
}

/// The closed set of attributes a field can be asked for. Every attribute
/// of every field resolves by exhaustive matching; there is no fallthrough
/// dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAttrib {
  /// Constant human-readable label
  Name,
  /// Typed value after override and variation resolution
  Value,
  /// Human-readable rendering of Value
  TextValue,
  /// Exact-width bytes in network order, ready for frame concatenation
  FrameValue,
  /// Bit width, reported only for fields not aligned to whole bytes
  BitSize,
}

/// A typed field value, as resolved or as supplied to a write.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
  UInt(u64),
  Bool(bool),
  Address(UInt128),
  Mode(AddressMode),
  /// Textual form, accepted on writes where the field has a canonical
  /// notation (addresses)
  Text(String),
}

/// Result of one attribute resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldData {
  Name(&'static str),
  Value(FieldValue),
  Text(String),
  Frame(Bytes),
  BitSize(u16),
}

impl FieldData {
  pub fn as_uint(&self) -> Option<u64> {
    match self {
      FieldData::Value(FieldValue::UInt(v)) => Some(*v),
      _ => None,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      FieldData::Value(FieldValue::Bool(b)) => Some(*b),
      _ => None,
    }
  }

  pub fn as_address(&self) -> Option<UInt128> {
    match self {
      FieldData::Value(FieldValue::Address(a)) => Some(*a),
      _ => None,
    }
  }

  pub fn as_text(&self) -> Option<&str> {
    match self {
      FieldData::Text(t) => Some(t),
      _ => None,
    }
  }

  pub fn as_frame(&self) -> Option<&Bytes> {
    match self {
      FieldData::Frame(b) => Some(b),
      _ => None,
    }
  }
}
