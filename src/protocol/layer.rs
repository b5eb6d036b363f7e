use bytes::Bytes;
use enumflags2::BitFlags;

use crate::{
  error::Result,
  protocol::{
    chain::LayerContext,
    field::{FieldAttrib, FieldData, FieldFlag, FieldValue},
    frame,
    record::LayerRecord,
  },
};

/// Namespace in which a layer expresses its protocol identifier to the
/// layer enclosing it. A payload-only layer is of type `None`; an IPv6
/// header asked for its id under `Eth` answers the ethertype, under `Ip`
/// the IP protocol code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolIdType {
  None,
  Eth,
  Ip,
}

/// Capability interface of one configured header layer.
///
/// Field access comes in two surfaces: implementations expose a typed
/// inherent API over their closed field enumeration, and this trait carries
/// the index-based surface for generic callers (editor, stream compiler).
/// An index outside `0..field_count()` is a precondition violation and
/// panics; it cannot occur through the typed surface.
pub trait ProtocolLayer {
  /// Tag identifying this layer type in persisted records.
  fn layer_type(&self) -> u32;
  fn name(&self) -> &'static str;
  fn short_name(&self) -> &'static str;

  /// What kind of identifier this layer itself reports to its encloser.
  fn protocol_id_type(&self) -> ProtocolIdType {
    ProtocolIdType::None
  }

  /// This layer's identifier in the given namespace, when it has one.
  fn protocol_id(&self, _id_type: ProtocolIdType) -> Option<u32> {
    None
  }

  fn field_count(&self) -> usize;
  fn field_flags(&self, index: usize) -> BitFlags<FieldFlag>;

  /// Resolves one attribute of one field for packet `packet_index`.
  /// `None` means the attribute is not defined for that field, e.g. the
  /// FrameValue of a meta field.
  fn field_data(
    &self,
    index: usize,
    attrib: FieldAttrib,
    packet_index: u32,
    ctx: &LayerContext,
  ) -> Option<FieldData>;

  /// Writes a field value. Only `FieldAttrib::Value` is writable; all
  /// failures leave the stored state untouched.
  fn set_field_data(&mut self, index: usize, value: &FieldValue, attrib: FieldAttrib)
    -> Result<()>;

  /// The layer's exact wire bytes for packet `packet_index`.
  fn frame_value(&self, packet_index: u32, ctx: &LayerContext) -> Bytes {
    frame::build_frame(self, packet_index, ctx)
  }

  /// After how many packets this layer's frame bytes repeat.
  fn variable_packet_count(&self) -> u32 {
    1
  }

  /// This layer's pseudo-header checksum contribution for an encapsulated
  /// layer's checksum field; `None` when the layer contributes nothing.
  fn pseudo_header_cksum(&self, _packet_index: u32, _ctx: &LayerContext) -> Option<u16> {
    None
  }

  /// Appends one diagnostic per suspicious configuration to `diagnostics`
  /// and reports whether any was found. Never fail-fast; advisory only.
  fn has_errors(&self, _diagnostics: &mut Vec<String>) -> bool {
    false
  }

  /// Fresh externalized record of this layer's state, stamped with its
  /// layer-type tag.
  fn to_record(&self) -> LayerRecord;

  /// Merges a record into this layer's state. Records carrying another
  /// layer's tag are ignored; that is a no-op, not an error.
  fn merge_record(&mut self, record: &LayerRecord);
}
