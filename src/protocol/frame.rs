use byteorder::{BigEndian, ByteOrder};
use bytes::{BufMut, Bytes, BytesMut};

use crate::protocol::{
  chain::LayerContext,
  field::{FieldAttrib, FieldData, FieldFlag},
  layer::ProtocolLayer,
};

/// Accumulates field encodings into a contiguous wire image.
///
/// Sub-byte fields are packed bit by bit, most significant bit first; whole
/// bytes can only be appended while the builder is byte-aligned. Field order
/// and bit placement are a compatibility contract with real receivers.
pub struct FrameBuilder {
  out: BytesMut,
  acc: u8,
  pending_bits: u32,
}

impl FrameBuilder {
  pub fn new() -> FrameBuilder {
    FrameBuilder {
      out: BytesMut::new(),
      acc: 0,
      pending_bits: 0,
    }
  }

  pub fn is_aligned(&self) -> bool {
    self.pending_bits == 0
  }

  /// Appends the low `width` bits of `value`, high bit first.
  pub fn push_bits(&mut self, value: u64, width: u32) {
    debug_assert!(width <= 64);
    for shift in (0..width).rev() {
      let bit = ((value >> shift) & 1) as u8;
      self.acc = (self.acc << 1) | bit;
      self.pending_bits += 1;
      if self.pending_bits == 8 {
        self.out.put_u8(self.acc);
        self.acc = 0;
        self.pending_bits = 0;
      }
    }
  }

  pub fn push_bytes(&mut self, bytes: &[u8]) {
    debug_assert!(self.is_aligned(), "byte push while bit-packing in progress");
    self.out.put_slice(bytes);
  }

  pub fn finish(mut self) -> Bytes {
    // a partial trailing byte means a malformed field catalog; pad with
    // zero bits rather than drop them
    if self.pending_bits > 0 {
      debug_assert!(false, "frame ends off a byte boundary");
      let acc = self.acc << (8 - self.pending_bits);
      self.out.put_u8(acc);
    }
    self.out.freeze()
  }
}

impl Default for FrameBuilder {
  fn default() -> FrameBuilder {
    FrameBuilder::new()
  }
}

/// Concatenates a layer's frame fields, in catalog order, into its exact
/// wire bytes for packet `packet_index`.
///
/// Each field contributes its FrameValue; its BitSize (when reported)
/// narrows the contribution to the field's true width so that neighboring
/// sub-byte fields share bytes.
pub fn build_frame<L>(layer: &L, packet_index: u32, ctx: &LayerContext) -> Bytes
where
  L: ProtocolLayer + ?Sized,
{
  let mut fb = FrameBuilder::new();
  for index in 0..layer.field_count() {
    if !layer.field_flags(index).contains(FieldFlag::Frame) {
      continue;
    }
    let bytes = match layer.field_data(index, FieldAttrib::FrameValue, packet_index, ctx) {
      Some(FieldData::Frame(b)) => b,
      _ => continue,
    };
    let bits = match layer.field_data(index, FieldAttrib::BitSize, packet_index, ctx) {
      Some(FieldData::BitSize(b)) => u32::from(b),
      _ => (bytes.len() * 8) as u32,
    };
    if bits % 8 == 0 && fb.is_aligned() {
      fb.push_bytes(&bytes);
    } else {
      fb.push_bits(be_uint(&bytes), bits);
    }
  }
  fb.finish()
}

// Low 64 bits of the big-endian integer held in `bytes`.
fn be_uint(bytes: &[u8]) -> u64 {
  debug_assert!(bytes.len() <= 8, "sub-byte packing of a >64-bit field");
  BigEndian::read_uint(bytes, bytes.len())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn packs_nibble_then_bytes() {
    let mut fb = FrameBuilder::new();
    fb.push_bits(0x6, 4);
    fb.push_bits(0x00, 8);
    fb.push_bits(0x00000, 20);
    assert!(fb.is_aligned());
    fb.push_bytes(&[0xAB, 0xCD]);
    assert_eq!(&fb.finish()[..], &[0x60, 0x00, 0x00, 0x00, 0xAB, 0xCD]);
  }

  #[test]
  fn packed_word_re_parses() {
    let mut fb = FrameBuilder::new();
    fb.push_bits(0x6, 4);
    fb.push_bits(0x2A, 8);
    fb.push_bits(0xABCDE, 20);
    let frame = fb.finish();
    let word = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]);
    assert_eq!(word >> 28, 0x6);
    assert_eq!((word >> 20) & 0xFF, 0x2A);
    assert_eq!(word & 0xFFFFF, 0xABCDE);
  }

  #[test]
  fn extra_high_bits_are_ignored() {
    let mut fb = FrameBuilder::new();
    // only the low 4 bits of the value may land in the frame
    fb.push_bits(0xF6, 4);
    fb.push_bits(0, 4);
    assert_eq!(&fb.finish()[..], &[0x60]);
  }
}
