use serde::{Deserialize, Serialize};

use crate::ip6::Ip6Header;

// Layer-type registry. Each header layer implementation claims one tag;
// persisted records carry it so imports can route records to the right
// layer instance.
pub const LAYER_TYPE_NONE: u32 = 0;
pub const LAYER_TYPE_ETH2: u32 = 200;
pub const LAYER_TYPE_IP4: u32 = 301;
pub const LAYER_TYPE_IP6: u32 = 302;

/// Externalized state of one configured layer.
///
/// One optional body per known layer type; only the body matching
/// `layer_type` is meaningful. The concrete on-disk encoding is the
/// embedding application's choice, this type only guarantees serde
/// Serialize/Deserialize.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayerRecord {
  pub layer_type: u32,
  pub ip6: Option<Ip6Header>,
}

impl LayerRecord {
  pub fn ip6(header: Ip6Header) -> LayerRecord {
    LayerRecord {
      layer_type: LAYER_TYPE_IP6,
      ip6: Some(header),
    }
  }
}
