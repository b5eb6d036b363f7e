use byteorder::{BigEndian, ByteOrder};

/// 16-bit ones'-complement sum of `data` taken as big-endian 16-bit words.
/// Overflow is folded back into the low 16 bits (end-around carry) until
/// none remains. An odd trailing byte is padded with zero on the right.
pub fn ones_complement_sum(data: &[u8]) -> u16 {
  let mut sum: u32 = 0;
  let mut words = data.chunks_exact(2);
  for w in &mut words {
    sum += u32::from(BigEndian::read_u16(w));
  }
  if let &[last] = words.remainder() {
    sum += u32::from(last) << 8;
  }
  while sum >> 16 != 0 {
    sum = (sum & 0xFFFF) + (sum >> 16);
  }
  sum as u16
}

/// A partial checksum contribution: the complement of the ones'-complement
/// sum, in host numeric order. A cross-layer aggregator folds further
/// pseudo-header fields into this before the encapsulated layer stores it.
pub fn cksum_partial(data: &[u8]) -> u16 {
  !ones_complement_sum(data)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sums_big_endian_words() {
    assert_eq!(ones_complement_sum(&[0x00, 0x01, 0x00, 0x02]), 0x0003);
    assert_eq!(ones_complement_sum(&[0x12, 0x34]), 0x1234);
  }

  #[test]
  fn folds_end_around_carry() {
    // 0xFFFF + 0x0001 overflows; carry folds back in: 0x0000 + 1 = 0x0001
    assert_eq!(ones_complement_sum(&[0xFF, 0xFF, 0x00, 0x01]), 0x0001);
    // repeated folding
    assert_eq!(ones_complement_sum(&[0xFF, 0xFF, 0xFF, 0xFF]), 0xFFFF);
  }

  #[test]
  fn odd_trailing_byte_pads_right() {
    assert_eq!(ones_complement_sum(&[0x12, 0x34, 0x56]), 0x1234 + 0x5600);
  }

  #[test]
  fn partial_is_complemented() {
    assert_eq!(cksum_partial(&[0x12, 0x34]), !0x1234u16);
    assert_eq!(cksum_partial(&[]), 0xFFFF);
  }
}
