//! IPv6 header layer: field catalog, attribute resolver, per-packet
//! address variation, wire serialization, pseudo-header checksum
//! contribution and semantic validation. RFC 8200 Section 3 fixed header.

use std::{convert::TryFrom, fmt, net::Ipv6Addr};

use bytes::Bytes;
use enumflags2::BitFlags;
use log::warn;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert;

use crate::{
  error::{Error, Result},
  protocol::{
    chain::LayerContext,
    checksum,
    field::{frame_field, meta_field, FieldAttrib, FieldData, FieldFlag, FieldValue},
    layer::{ProtocolIdType, ProtocolLayer},
    record::{LayerRecord, LAYER_TYPE_IP6},
    variation::{lcm, AddressMode, AddressVariation, HostRandom, ThreadRandom},
  },
  uint128::UInt128,
};

/// Reserved Next Header code meaning "no next layer" (RFC 8200 4.7)
pub const NO_NEXT_HEADER: u8 = 0x3B;

pub const IP6_HEADER_LEN: usize = 40;
pub const IP6_FIELD_COUNT: usize = 17;

// frame field widths must tile the fixed header exactly
const_assert!(4 + 8 + 20 + 16 + 8 + 8 + 128 + 128 == IP6_HEADER_LEN * 8);

/// Closed field catalog of the IPv6 layer. Discriminants are the field
/// indices of the index-based surface; frame fields come first, in wire
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum Ip6Field {
  Version = 0,
  TrafficClass,
  FlowLabel,
  PayloadLength,
  NextHeader,
  HopLimit,
  SrcAddress,
  DstAddress,
  // meta fields follow
  OverrideVersion,
  OverridePayloadLength,
  OverrideNextHeader,
  SrcAddrMode,
  SrcAddrCount,
  SrcAddrPrefix,
  DstAddrMode,
  DstAddrCount,
  DstAddrPrefix,
}

/// Persisted header state of one IPv6 layer instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ip6Header {
  pub version: u8,
  pub traffic_class: u8,
  pub flow_label: u32,
  pub payload_length: u16,
  pub next_header: u8,
  pub hop_limit: u8,

  pub override_version: bool,
  pub override_payload_length: bool,
  pub override_next_header: bool,

  pub src_addr_hi: u64,
  pub src_addr_lo: u64,
  pub src_addr_mode: AddressMode,
  pub src_addr_count: u32,
  pub src_addr_prefix: u8,

  pub dst_addr_hi: u64,
  pub dst_addr_lo: u64,
  pub dst_addr_mode: AddressMode,
  pub dst_addr_count: u32,
  pub dst_addr_prefix: u8,
}

impl Default for Ip6Header {
  fn default() -> Ip6Header {
    Ip6Header {
      version: 6,
      traffic_class: 0,
      flow_label: 0,
      payload_length: 0,
      next_header: 0,
      hop_limit: 127,
      override_version: false,
      override_payload_length: false,
      override_next_header: false,
      src_addr_hi: 0,
      src_addr_lo: 0,
      src_addr_mode: AddressMode::Fixed,
      src_addr_count: 16,
      src_addr_prefix: 64,
      dst_addr_hi: 0,
      dst_addr_lo: 0,
      dst_addr_mode: AddressMode::Fixed,
      dst_addr_count: 16,
      dst_addr_prefix: 64,
    }
  }
}

/// One configured IPv6 layer. Owns its header state exclusively; the
/// randomness source for RandomHost variation is injected at construction.
pub struct Ip6 {
  data: Ip6Header,
  rng: Box<dyn HostRandom>,
}

impl fmt::Debug for Ip6 {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.debug_struct("Ip6").field("data", &self.data).finish()
  }
}

impl Default for Ip6 {
  fn default() -> Ip6 {
    Ip6::new()
  }
}

impl Ip6 {
  pub fn new() -> Ip6 {
    Ip6::with_random_source(Box::new(ThreadRandom))
  }

  pub fn with_random_source(rng: Box<dyn HostRandom>) -> Ip6 {
    Ip6 {
      data: Ip6Header::default(),
      rng,
    }
  }

  pub fn from_header(data: Ip6Header) -> Ip6 {
    Ip6 {
      data,
      rng: Box::new(ThreadRandom),
    }
  }

  pub fn header(&self) -> &Ip6Header {
    &self.data
  }

  pub fn header_mut(&mut self) -> &mut Ip6Header {
    &mut self.data
  }

  fn field_at(index: usize) -> Ip6Field {
    Ip6Field::from_usize(index)
      .unwrap_or_else(|| panic!("field index {} outside the IPv6 catalog", index))
  }

  pub fn flags(field: Ip6Field) -> BitFlags<FieldFlag> {
    match field {
      Ip6Field::Version
      | Ip6Field::TrafficClass
      | Ip6Field::FlowLabel
      | Ip6Field::PayloadLength
      | Ip6Field::NextHeader
      | Ip6Field::HopLimit
      | Ip6Field::SrcAddress
      | Ip6Field::DstAddress => frame_field(),

      Ip6Field::OverrideVersion
      | Ip6Field::OverridePayloadLength
      | Ip6Field::OverrideNextHeader
      | Ip6Field::SrcAddrMode
      | Ip6Field::SrcAddrCount
      | Ip6Field::SrcAddrPrefix
      | Ip6Field::DstAddrMode
      | Ip6Field::DstAddrCount
      | Ip6Field::DstAddrPrefix => meta_field(),
    }
  }

  fn resolved_version(&self) -> u8 {
    if self.data.override_version {
      self.data.version & 0xF
    } else {
      6
    }
  }

  fn resolved_payload_length(&self, packet_index: u32, ctx: &LayerContext) -> u16 {
    if self.data.override_payload_length {
      self.data.payload_length
    } else {
      ctx.payload_size(packet_index) as u16
    }
  }

  fn resolved_next_header(&self, ctx: &LayerContext) -> u8 {
    if self.data.override_next_header {
      return self.data.next_header;
    }
    match ctx.inner_layer() {
      None => NO_NEXT_HEADER,
      Some(inner) => match inner.protocol_id(ProtocolIdType::Ip) {
        Some(id) => id as u8,
        // a payload-only neighbor means nothing follows this header
        None if inner.protocol_id_type() == ProtocolIdType::None => NO_NEXT_HEADER,
        None => 0,
      },
    }
  }

  fn src_variation(&self) -> AddressVariation {
    AddressVariation {
      mode: self.data.src_addr_mode,
      count: self.data.src_addr_count,
      prefix_len: self.data.src_addr_prefix,
    }
  }

  fn dst_variation(&self) -> AddressVariation {
    AddressVariation {
      mode: self.data.dst_addr_mode,
      count: self.data.dst_addr_count,
      prefix_len: self.data.dst_addr_prefix,
    }
  }

  fn resolved_src(&self, packet_index: u32) -> UInt128 {
    let base = UInt128::new(self.data.src_addr_hi, self.data.src_addr_lo);
    self
      .src_variation()
      .resolve(base, packet_index, self.rng.as_ref())
  }

  fn resolved_dst(&self, packet_index: u32) -> UInt128 {
    let base = UInt128::new(self.data.dst_addr_hi, self.data.dst_addr_lo);
    self
      .dst_variation()
      .resolve(base, packet_index, self.rng.as_ref())
  }

  /// Typed attribute resolution over the closed field catalog.
  pub fn resolve(
    &self,
    field: Ip6Field,
    attrib: FieldAttrib,
    packet_index: u32,
    ctx: &LayerContext,
  ) -> Option<FieldData> {
    match field {
      Ip6Field::Version => {
        let ver = self.resolved_version();
        match attrib {
          FieldAttrib::Name => Some(FieldData::Name("Version")),
          FieldAttrib::Value => Some(FieldData::Value(FieldValue::UInt(u64::from(ver)))),
          FieldAttrib::TextValue => Some(FieldData::Text(format!("{}", ver))),
          FieldAttrib::FrameValue => Some(FieldData::Frame(Bytes::copy_from_slice(&[ver]))),
          FieldAttrib::BitSize => Some(FieldData::BitSize(4)),
        }
      }
      Ip6Field::TrafficClass => {
        let tc = self.data.traffic_class;
        match attrib {
          FieldAttrib::Name => Some(FieldData::Name("Traffic Class")),
          FieldAttrib::Value => Some(FieldData::Value(FieldValue::UInt(u64::from(tc)))),
          FieldAttrib::TextValue => Some(FieldData::Text(format!("{:02x}", tc))),
          FieldAttrib::FrameValue => Some(FieldData::Frame(Bytes::copy_from_slice(&[tc]))),
          FieldAttrib::BitSize => None,
        }
      }
      Ip6Field::FlowLabel => {
        let fl = self.data.flow_label & 0xFFFFF;
        match attrib {
          FieldAttrib::Name => Some(FieldData::Name("Flow Label")),
          FieldAttrib::Value => Some(FieldData::Value(FieldValue::UInt(u64::from(fl)))),
          FieldAttrib::TextValue => Some(FieldData::Text(format!("{:05x}", fl))),
          FieldAttrib::FrameValue => {
            // low 20 bits of a 4-byte word, leading byte dropped
            Some(FieldData::Frame(Bytes::copy_from_slice(
              &fl.to_be_bytes()[1..],
            )))
          }
          FieldAttrib::BitSize => Some(FieldData::BitSize(20)),
        }
      }
      Ip6Field::PayloadLength => {
        let len = self.resolved_payload_length(packet_index, ctx);
        match attrib {
          FieldAttrib::Name => Some(FieldData::Name("Payload Length")),
          FieldAttrib::Value => Some(FieldData::Value(FieldValue::UInt(u64::from(len)))),
          FieldAttrib::TextValue => Some(FieldData::Text(format!("{}", len))),
          FieldAttrib::FrameValue => {
            Some(FieldData::Frame(Bytes::copy_from_slice(&len.to_be_bytes())))
          }
          FieldAttrib::BitSize => None,
        }
      }
      Ip6Field::NextHeader => {
        let next_hdr = self.resolved_next_header(ctx);
        match attrib {
          FieldAttrib::Name => Some(FieldData::Name("Next Header")),
          FieldAttrib::Value => Some(FieldData::Value(FieldValue::UInt(u64::from(next_hdr)))),
          FieldAttrib::TextValue => Some(FieldData::Text(format!("{:02x}", next_hdr))),
          FieldAttrib::FrameValue => Some(FieldData::Frame(Bytes::copy_from_slice(&[next_hdr]))),
          FieldAttrib::BitSize => None,
        }
      }
      Ip6Field::HopLimit => {
        let hl = self.data.hop_limit;
        match attrib {
          FieldAttrib::Name => Some(FieldData::Name("Hop Limit")),
          FieldAttrib::Value => Some(FieldData::Value(FieldValue::UInt(u64::from(hl)))),
          FieldAttrib::TextValue => Some(FieldData::Text(format!("{}", hl))),
          FieldAttrib::FrameValue => Some(FieldData::Frame(Bytes::copy_from_slice(&[hl]))),
          FieldAttrib::BitSize => None,
        }
      }
      Ip6Field::SrcAddress => {
        let src = self.resolved_src(packet_index);
        match attrib {
          FieldAttrib::Name => Some(FieldData::Name("Source")),
          FieldAttrib::Value => Some(FieldData::Value(FieldValue::Address(src))),
          FieldAttrib::TextValue => Some(FieldData::Text(src.to_string())),
          FieldAttrib::FrameValue => {
            Some(FieldData::Frame(Bytes::copy_from_slice(&src.to_be_bytes())))
          }
          FieldAttrib::BitSize => None,
        }
      }
      Ip6Field::DstAddress => {
        let dst = self.resolved_dst(packet_index);
        match attrib {
          FieldAttrib::Name => Some(FieldData::Name("Destination")),
          FieldAttrib::Value => Some(FieldData::Value(FieldValue::Address(dst))),
          FieldAttrib::TextValue => Some(FieldData::Text(dst.to_string())),
          FieldAttrib::FrameValue => {
            Some(FieldData::Frame(Bytes::copy_from_slice(&dst.to_be_bytes())))
          }
          FieldAttrib::BitSize => None,
        }
      }

      // meta fields answer Value only
      Ip6Field::OverrideVersion => match attrib {
        FieldAttrib::Value => Some(FieldData::Value(FieldValue::Bool(self.data.override_version))),
        _ => None,
      },
      Ip6Field::OverridePayloadLength => match attrib {
        FieldAttrib::Value => Some(FieldData::Value(FieldValue::Bool(
          self.data.override_payload_length,
        ))),
        _ => None,
      },
      Ip6Field::OverrideNextHeader => match attrib {
        FieldAttrib::Value => Some(FieldData::Value(FieldValue::Bool(
          self.data.override_next_header,
        ))),
        _ => None,
      },
      Ip6Field::SrcAddrMode => match attrib {
        FieldAttrib::Value => Some(FieldData::Value(FieldValue::Mode(self.data.src_addr_mode))),
        _ => None,
      },
      Ip6Field::SrcAddrCount => match attrib {
        FieldAttrib::Value => Some(FieldData::Value(FieldValue::UInt(u64::from(
          self.data.src_addr_count,
        )))),
        _ => None,
      },
      Ip6Field::SrcAddrPrefix => match attrib {
        FieldAttrib::Value => Some(FieldData::Value(FieldValue::UInt(u64::from(
          self.data.src_addr_prefix,
        )))),
        _ => None,
      },
      Ip6Field::DstAddrMode => match attrib {
        FieldAttrib::Value => Some(FieldData::Value(FieldValue::Mode(self.data.dst_addr_mode))),
        _ => None,
      },
      Ip6Field::DstAddrCount => match attrib {
        FieldAttrib::Value => Some(FieldData::Value(FieldValue::UInt(u64::from(
          self.data.dst_addr_count,
        )))),
        _ => None,
      },
      Ip6Field::DstAddrPrefix => match attrib {
        FieldAttrib::Value => Some(FieldData::Value(FieldValue::UInt(u64::from(
          self.data.dst_addr_prefix,
        )))),
        _ => None,
      },
    }
  }

  /// Typed field write. Numeric values are masked into the field's bit
  /// domain; type mismatches, unknown mode codes and out-of-range counts
  /// or prefixes fail without mutating state.
  pub fn set_value(&mut self, field: Ip6Field, value: &FieldValue) -> Result<()> {
    match field {
      Ip6Field::Version => {
        self.data.version = (Self::uint_of(value)? & 0xF) as u8;
      }
      Ip6Field::TrafficClass => {
        self.data.traffic_class = (Self::uint_of(value)? & 0xFF) as u8;
      }
      Ip6Field::FlowLabel => {
        self.data.flow_label = (Self::uint_of(value)? & 0xFFFFF) as u32;
      }
      Ip6Field::PayloadLength => {
        self.data.payload_length = (Self::uint_of(value)? & 0xFFFF) as u16;
      }
      Ip6Field::NextHeader => {
        self.data.next_header = (Self::uint_of(value)? & 0xFF) as u8;
      }
      Ip6Field::HopLimit => {
        self.data.hop_limit = (Self::uint_of(value)? & 0xFF) as u8;
      }
      Ip6Field::SrcAddress => {
        let addr = Self::address_of(value)?;
        self.data.src_addr_hi = addr.hi64();
        self.data.src_addr_lo = addr.lo64();
      }
      Ip6Field::DstAddress => {
        let addr = Self::address_of(value)?;
        self.data.dst_addr_hi = addr.hi64();
        self.data.dst_addr_lo = addr.lo64();
      }

      Ip6Field::OverrideVersion => {
        self.data.override_version = Self::bool_of(value)?;
      }
      Ip6Field::OverridePayloadLength => {
        self.data.override_payload_length = Self::bool_of(value)?;
      }
      Ip6Field::OverrideNextHeader => {
        self.data.override_next_header = Self::bool_of(value)?;
      }

      Ip6Field::SrcAddrMode => {
        self.data.src_addr_mode = Self::mode_of(value)?;
      }
      Ip6Field::SrcAddrCount => {
        self.data.src_addr_count = Self::count_of(value)?;
      }
      Ip6Field::SrcAddrPrefix => {
        self.data.src_addr_prefix = Self::prefix_of(value)?;
      }
      Ip6Field::DstAddrMode => {
        self.data.dst_addr_mode = Self::mode_of(value)?;
      }
      Ip6Field::DstAddrCount => {
        self.data.dst_addr_count = Self::count_of(value)?;
      }
      Ip6Field::DstAddrPrefix => {
        self.data.dst_addr_prefix = Self::prefix_of(value)?;
      }
    }
    Ok(())
  }

  fn uint_of(value: &FieldValue) -> Result<u64> {
    match value {
      FieldValue::UInt(v) => Ok(*v),
      _ => Err(Error::WrongValueType),
    }
  }

  fn bool_of(value: &FieldValue) -> Result<bool> {
    match value {
      FieldValue::Bool(b) => Ok(*b),
      _ => Err(Error::WrongValueType),
    }
  }

  // addresses are written either as a 128-bit value or as canonical text
  fn address_of(value: &FieldValue) -> Result<UInt128> {
    match value {
      FieldValue::Address(a) => Ok(*a),
      FieldValue::Text(s) => {
        let addr: Ipv6Addr = s.parse().map_err(|_| Error::WrongValueType)?;
        Ok(UInt128::from(addr))
      }
      _ => Err(Error::WrongValueType),
    }
  }

  fn mode_of(value: &FieldValue) -> Result<AddressMode> {
    match value {
      FieldValue::Mode(m) => Ok(*m),
      FieldValue::UInt(code) => {
        let byte = u8::try_from(*code).map_err(|_| Error::UnknownEnumCode(*code))?;
        AddressMode::try_from(byte).map_err(|_| Error::UnknownEnumCode(*code))
      }
      _ => Err(Error::WrongValueType),
    }
  }

  fn count_of(value: &FieldValue) -> Result<u32> {
    let v = Self::uint_of(value)?;
    // 0 would make the per-packet cycle index undefined
    if v == 0 || v > u64::from(u32::max_value()) {
      return Err(Error::OutOfRange);
    }
    Ok(v as u32)
  }

  fn prefix_of(value: &FieldValue) -> Result<u8> {
    let v = Self::uint_of(value)?;
    if v > 128 {
      return Err(Error::OutOfRange);
    }
    Ok(v as u8)
  }
}

impl ProtocolLayer for Ip6 {
  fn layer_type(&self) -> u32 {
    LAYER_TYPE_IP6
  }

  fn name(&self) -> &'static str {
    "Internet Protocol ver 6"
  }

  fn short_name(&self) -> &'static str {
    "IPv6"
  }

  fn protocol_id_type(&self) -> ProtocolIdType {
    ProtocolIdType::Ip
  }

  fn protocol_id(&self, id_type: ProtocolIdType) -> Option<u32> {
    match id_type {
      ProtocolIdType::Eth => Some(0x86DD),
      ProtocolIdType::Ip => Some(0x29), // IPv6-in-IP encapsulation
      ProtocolIdType::None => None,
    }
  }

  fn field_count(&self) -> usize {
    IP6_FIELD_COUNT
  }

  fn field_flags(&self, index: usize) -> BitFlags<FieldFlag> {
    Ip6::flags(Self::field_at(index))
  }

  fn field_data(
    &self,
    index: usize,
    attrib: FieldAttrib,
    packet_index: u32,
    ctx: &LayerContext,
  ) -> Option<FieldData> {
    self.resolve(Self::field_at(index), attrib, packet_index, ctx)
  }

  fn set_field_data(
    &mut self,
    index: usize,
    value: &FieldValue,
    attrib: FieldAttrib,
  ) -> Result<()> {
    if attrib != FieldAttrib::Value {
      return Err(Error::UnsupportedAttribute);
    }
    self.set_value(Self::field_at(index), value)
  }

  fn variable_packet_count(&self) -> u32 {
    lcm(
      self.src_variation().cycle_len(),
      self.dst_variation().cycle_len(),
    )
  }

  // Only the addresses are summed here. Payload length and next header
  // belong to the pseudo header too, but reaching them requires walking
  // any extension headers between this layer and the transport layer
  // (RFC 8200 Section 8.1); the cross-layer aggregator adds them.
  fn pseudo_header_cksum(&self, packet_index: u32, _ctx: &LayerContext) -> Option<u16> {
    let mut addrs = [0u8; 32];
    addrs[..16].copy_from_slice(&self.resolved_src(packet_index).to_be_bytes());
    addrs[16..].copy_from_slice(&self.resolved_dst(packet_index).to_be_bytes());
    Some(checksum::cksum_partial(&addrs))
  }

  fn has_errors(&self, diagnostics: &mut Vec<String>) -> bool {
    let mut result = false;

    // an all-zero base is only suspect when it is transmitted as-is; in
    // variation modes it is merely a seed
    if self.data.dst_addr_hi == 0
      && self.data.dst_addr_lo == 0
      && self.data.dst_addr_mode == AddressMode::Fixed
    {
      diagnostics
        .push("Frames with Destination IP :: (all zeroes) are likely to be dropped".to_string());
      result = true;
    }

    if self.data.src_addr_hi == 0
      && self.data.src_addr_lo == 0
      && self.data.src_addr_mode == AddressMode::Fixed
    {
      diagnostics
        .push("Frames with Source IP :: (all zeroes) are likely to be dropped".to_string());
      result = true;
    }

    result
  }

  fn to_record(&self) -> LayerRecord {
    LayerRecord::ip6(self.data.clone())
  }

  fn merge_record(&mut self, record: &LayerRecord) {
    if record.layer_type != LAYER_TYPE_IP6 {
      return;
    }
    match &record.ip6 {
      Some(header) => self.data = header.clone(),
      None => warn!("IPv6-tagged record without a header body, ignoring"),
    }
  }
}
