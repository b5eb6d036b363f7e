use log::warn;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::uint128::UInt128;

/// How an address field varies across the packets of a stream.
///
/// The non-Fixed modes hold the top `prefix_len` bits of the base address
/// constant and vary only the host part below them.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoPrimitive, TryFromPrimitive,
)]
#[repr(u8)]
pub enum AddressMode {
  Fixed = 0,
  IncrementHost = 1,
  DecrementHost = 2,
  RandomHost = 3,
}

impl Default for AddressMode {
  fn default() -> AddressMode {
    AddressMode::Fixed
  }
}

/// Source of random host bits for RandomHost mode.
///
/// Injected into a layer so callers control the generator; the default
/// [`ThreadRandom`] is thread-local and therefore safe to use from
/// concurrently resolving layer instances without extra synchronization.
pub trait HostRandom {
  fn host_bits(&self) -> UInt128;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl HostRandom for ThreadRandom {
  fn host_bits(&self) -> UInt128 {
    let mut rng = rand::thread_rng();
    UInt128::new(rng.gen::<u64>(), rng.gen::<u64>())
  }
}

/// Variation parameters of one address field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressVariation {
  pub mode: AddressMode,
  pub count: u32,
  pub prefix_len: u8,
}

impl AddressVariation {
  /// The address to embed in packet `packet_index`.
  ///
  /// Fixed, IncrementHost and DecrementHost are pure in
  /// `(base, packet_index)`; RandomHost draws fresh bits on every call.
  pub fn resolve(&self, base: UInt128, packet_index: u32, rng: &dyn HostRandom) -> UInt128 {
    if self.mode == AddressMode::Fixed {
      return base;
    }

    // count 0 is rejected at write time; tolerate it here anyway in case
    // the state arrived through a legacy record
    let count = if self.count == 0 {
      warn!("address variation with host count 0, treating as 1");
      1
    } else {
      self.count
    };
    let u = packet_index % count;

    let mask = UInt128::prefix_mask(self.prefix_len);
    let prefix = base & mask;
    let host = match self.mode {
      AddressMode::IncrementHost => (base & !mask).wrapping_add(UInt128::new(0, u64::from(u))) & !mask,
      AddressMode::DecrementHost => (base & !mask).wrapping_sub(UInt128::new(0, u64::from(u))) & !mask,
      AddressMode::RandomHost => rng.host_bits() & !mask,
      AddressMode::Fixed => unreachable!(),
    };
    prefix | host
  }

  /// Cycle length of this field: after how many packets its values repeat.
  pub fn cycle_len(&self) -> u32 {
    match self.mode {
      AddressMode::Fixed => 1,
      _ => self.count.max(1),
    }
  }
}

/// Least common multiple of two cycle lengths, for the stream-wide
/// repeat-period query.
pub fn lcm(a: u32, b: u32) -> u32 {
  if a == 0 || b == 0 {
    return 0;
  }
  a / gcd(a, b) * b
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
  while b != 0 {
    let t = a % b;
    a = b;
    b = t;
  }
  a
}

#[cfg(test)]
mod tests {
  use std::convert::TryFrom;

  use super::*;

  // deterministic stand-in for RandomHost draws
  struct FixedBits(UInt128);

  impl HostRandom for FixedBits {
    fn host_bits(&self) -> UInt128 {
      self.0
    }
  }

  fn base() -> UInt128 {
    // 2001:db8::1
    UInt128::new(0x2001_0db8_0000_0000, 1)
  }

  #[test]
  fn fixed_mode_ignores_packet_index() {
    let v = AddressVariation {
      mode: AddressMode::Fixed,
      count: 7,
      prefix_len: 64,
    };
    for i in &[0, 1, 6, 7, 1000] {
      assert_eq!(v.resolve(base(), *i, &ThreadRandom), base());
    }
  }

  #[test]
  fn increment_cycles_through_count() {
    let v = AddressVariation {
      mode: AddressMode::IncrementHost,
      count: 4,
      prefix_len: 120,
    };
    let hosts: Vec<u64> = (0..6)
      .map(|i| v.resolve(base(), i, &ThreadRandom).lo64() & 0xFF)
      .collect();
    assert_eq!(hosts, vec![0x01, 0x02, 0x03, 0x04, 0x01, 0x02]);
  }

  #[test]
  fn decrement_wraps_within_host_part() {
    let v = AddressVariation {
      mode: AddressMode::DecrementHost,
      count: 4,
      prefix_len: 120,
    };
    let hosts: Vec<u64> = (0..4)
      .map(|i| v.resolve(base(), i, &ThreadRandom).lo64() & 0xFF)
      .collect();
    assert_eq!(hosts, vec![0x01, 0x00, 0xFF, 0xFE]);
    // the prefix octets stay untouched by the wraparound
    assert_eq!(
      v.resolve(base(), 2, &ThreadRandom).hi64(),
      base().hi64()
    );
  }

  #[test]
  fn increment_overflows_at_host_boundary() {
    let b = UInt128::new(0x2001_0db8_0000_0000, 0xFE);
    let v = AddressVariation {
      mode: AddressMode::IncrementHost,
      count: 4,
      prefix_len: 120,
    };
    let hosts: Vec<u64> = (0..4)
      .map(|i| v.resolve(b, i, &ThreadRandom).lo64() & 0xFF)
      .collect();
    assert_eq!(hosts, vec![0xFE, 0xFF, 0x00, 0x01]);
  }

  #[test]
  fn random_host_is_masked_to_host_part() {
    let v = AddressVariation {
      mode: AddressMode::RandomHost,
      count: 4,
      prefix_len: 64,
    };
    let drawn = FixedBits(UInt128::MAX);
    let got = v.resolve(base(), 0, &drawn);
    assert_eq!(got.hi64(), base().hi64());
    assert_eq!(got.lo64(), u64::max_value());
  }

  #[test]
  fn full_prefix_collapses_variation() {
    for mode in &[
      AddressMode::IncrementHost,
      AddressMode::DecrementHost,
      AddressMode::RandomHost,
    ] {
      let v = AddressVariation {
        mode: *mode,
        count: 4,
        prefix_len: 128,
      };
      assert_eq!(v.resolve(base(), 3, &FixedBits(UInt128::MAX)), base());
    }
  }

  #[test]
  fn zero_prefix_varies_whole_address() {
    let v = AddressVariation {
      mode: AddressMode::RandomHost,
      count: 1,
      prefix_len: 0,
    };
    let drawn = FixedBits(UInt128::new(5, 6));
    assert_eq!(v.resolve(base(), 0, &drawn), UInt128::new(5, 6));
  }

  #[test]
  fn unknown_mode_code_is_rejected() {
    assert!(AddressMode::try_from(4u8).is_err());
    assert_eq!(AddressMode::try_from(2u8), Ok(AddressMode::DecrementHost));
  }

  #[test]
  fn lcm_of_cycle_lengths() {
    assert_eq!(lcm(3, 4), 12);
    assert_eq!(lcm(4, 6), 12);
    assert_eq!(lcm(1, 1), 1);
  }
}
