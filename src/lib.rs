//! Per-layer protocol header model and multi-packet variation engine for
//! traffic generation. Each header layer resolves its logical fields into
//! names, typed values, text and exact wire bytes per packet index,
//! supports overrides of computed fields, varies addresses across a packet
//! stream and validates its configuration.

pub mod error;
pub mod ip6;
pub mod protocol;
pub mod uint128;

pub use crate::{
  error::{Error, Result},
  protocol::{
    chain::{LayerChain, LayerContext},
    field::{FieldAttrib, FieldData, FieldFlag, FieldValue},
    layer::{ProtocolIdType, ProtocolLayer},
    record::LayerRecord,
    variation::{AddressMode, AddressVariation, HostRandom, ThreadRandom},
  },
  uint128::UInt128,
};
