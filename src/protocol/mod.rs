//! Layer-generic protocol header framework: field catalog abstractions,
//! layer chain context, frame assembly, checksum math and the address
//! variation engine. Concrete layers (e.g. [`crate::ip6`]) implement
//! [`layer::ProtocolLayer`] on top of these.

pub mod chain;
pub mod checksum;
pub mod field;
pub mod frame;
pub mod layer;
pub mod record;
pub mod variation;
