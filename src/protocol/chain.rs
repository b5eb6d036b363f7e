use bytes::{BufMut, Bytes, BytesMut};

use crate::protocol::{
  layer::{ProtocolIdType, ProtocolLayer},
  variation::lcm,
};

/// Read-only view of a packet template's layer stack, outermost first.
///
/// Layers are borrowed, never owned, so a chain can be rebuilt for every
/// resolution pass without touching the layers themselves. This replaces
/// mutable neighbor links between layers.
pub struct LayerChain<'a> {
  layers: Vec<&'a dyn ProtocolLayer>,
}

impl<'a> LayerChain<'a> {
  pub fn new(layers: Vec<&'a dyn ProtocolLayer>) -> LayerChain<'a> {
    LayerChain { layers }
  }

  pub fn empty() -> LayerChain<'a> {
    LayerChain { layers: Vec::new() }
  }

  pub fn len(&self) -> usize {
    self.layers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.layers.is_empty()
  }

  /// Resolution context for the layer at `position`.
  pub fn context_at(&self, position: usize) -> LayerContext {
    LayerContext {
      chain: self,
      position,
    }
  }

  /// Wire bytes of the whole packet for `packet_index`: every layer's
  /// frame, outermost first.
  pub fn frame_value(&self, packet_index: u32) -> Bytes {
    let mut out = BytesMut::new();
    for (position, layer) in self.layers.iter().enumerate() {
      out.put_slice(&layer.frame_value(packet_index, &self.context_at(position)));
    }
    out.freeze()
  }

  /// Overall repeat period of the packet stream: the least common multiple
  /// of every layer's own variable packet count.
  pub fn variable_packet_count(&self) -> u32 {
    self
      .layers
      .iter()
      .fold(1, |count, layer| lcm(count, layer.variable_packet_count()))
  }

  /// Collects the diagnostics of every layer in the chain.
  pub fn has_errors(&self, diagnostics: &mut Vec<String>) -> bool {
    let mut result = false;
    for layer in &self.layers {
      result |= layer.has_errors(diagnostics);
    }
    result
  }
}

/// One layer's view into its chain during resolution: its own position
/// plus queries against the layers encapsulated after it.
#[derive(Clone, Copy)]
pub struct LayerContext<'a> {
  chain: &'a LayerChain<'a>,
  position: usize,
}

impl<'a> LayerContext<'a> {
  pub fn position(&self) -> usize {
    self.position
  }

  /// The immediately encapsulated layer, if any.
  pub fn inner_layer(&self) -> Option<&'a dyn ProtocolLayer> {
    self.chain.layers.get(self.position + 1).copied()
  }

  /// Protocol identifier of the immediately encapsulated layer in the
  /// given namespace.
  pub fn inner_protocol_id(&self, id_type: ProtocolIdType) -> Option<u32> {
    self.inner_layer().and_then(|l| l.protocol_id(id_type))
  }

  /// Serialized byte length of everything encapsulated after this layer's
  /// header, for packet `packet_index`.
  pub fn payload_size(&self, packet_index: u32) -> usize {
    let mut total = 0;
    for position in self.position + 1..self.chain.layers.len() {
      total += self.chain.layers[position]
        .frame_value(packet_index, &self.chain.context_at(position))
        .len();
    }
    total
  }
}
