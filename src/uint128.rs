use std::{
  fmt,
  net::Ipv6Addr,
  ops::{BitAnd, BitOr, Not, Shl},
};

use byteorder::{BigEndian, ByteOrder};
use speedy::{Context, Readable, Reader, Writable, Writer};

/// Fixed-width 128-bit unsigned integer for IPv6-sized header fields.
///
/// All arithmetic is modulo 2^128; add/sub wrap instead of overflowing and
/// shifts of 128 bits or more yield zero. The value is logically the
/// concatenation of two 64-bit halves, high-order half first, matching the
/// persisted address layout.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct UInt128(u128);

impl UInt128 {
  pub const ZERO: UInt128 = UInt128(0);
  pub const MAX: UInt128 = UInt128(u128::max_value());

  pub fn new(hi: u64, lo: u64) -> UInt128 {
    UInt128((u128::from(hi) << 64) | u128::from(lo))
  }

  pub fn hi64(self) -> u64 {
    (self.0 >> 64) as u64
  }

  pub fn lo64(self) -> u64 {
    self.0 as u64
  }

  pub fn is_zero(self) -> bool {
    self.0 == 0
  }

  pub fn wrapping_add(self, rhs: UInt128) -> UInt128 {
    UInt128(self.0.wrapping_add(rhs.0))
  }

  pub fn wrapping_sub(self, rhs: UInt128) -> UInt128 {
    UInt128(self.0.wrapping_sub(rhs.0))
  }

  /// Network mask selecting the top `prefix_len` bits, 0..=128.
  pub fn prefix_mask(prefix_len: u8) -> UInt128 {
    debug_assert!(prefix_len <= 128);
    !UInt128::ZERO << (128 - u32::from(prefix_len))
  }

  pub fn to_be_bytes(self) -> [u8; 16] {
    let mut buf = [0u8; 16];
    BigEndian::write_u128(&mut buf, self.0);
    buf
  }

  pub fn from_be_bytes(buf: [u8; 16]) -> UInt128 {
    UInt128(BigEndian::read_u128(&buf))
  }
}

impl BitAnd for UInt128 {
  type Output = UInt128;
  fn bitand(self, rhs: UInt128) -> UInt128 {
    UInt128(self.0 & rhs.0)
  }
}

impl BitOr for UInt128 {
  type Output = UInt128;
  fn bitor(self, rhs: UInt128) -> UInt128 {
    UInt128(self.0 | rhs.0)
  }
}

impl Not for UInt128 {
  type Output = UInt128;
  fn not(self) -> UInt128 {
    UInt128(!self.0)
  }
}

impl Shl<u32> for UInt128 {
  type Output = UInt128;
  // Shifting the full width or more gives zero instead of the
  // machine-dependent behavior of native shifts.
  fn shl(self, rhs: u32) -> UInt128 {
    if rhs >= 128 {
      UInt128::ZERO
    } else {
      UInt128(self.0 << rhs)
    }
  }
}

impl From<Ipv6Addr> for UInt128 {
  fn from(addr: Ipv6Addr) -> UInt128 {
    UInt128::from_be_bytes(addr.octets())
  }
}

impl From<UInt128> for Ipv6Addr {
  fn from(value: UInt128) -> Ipv6Addr {
    Ipv6Addr::from(value.to_be_bytes())
  }
}

// Canonical IPv6 textual notation
impl fmt::Display for UInt128 {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    Ipv6Addr::from(*self).fmt(f)
  }
}

// On the wire an address is 16 raw octets in network order, independent of
// the encoding endianness.
impl<'a, C: Context> Readable<'a, C> for UInt128 {
  #[inline]
  fn read_from<R: Reader<'a, C>>(reader: &mut R) -> Result<Self, C::Error> {
    let mut buf = [0u8; 16];
    for b in buf.iter_mut() {
      *b = reader.read_u8()?;
    }
    Ok(UInt128::from_be_bytes(buf))
  }

  #[inline]
  fn minimum_bytes_needed() -> usize {
    16
  }
}

impl<C: Context> Writable<C> for UInt128 {
  #[inline]
  fn write_to<T: ?Sized + Writer<C>>(&self, writer: &mut T) -> Result<(), C::Error> {
    for b in self.to_be_bytes().iter() {
      writer.write_u8(*b)?;
    }
    Ok(())
  }
}
