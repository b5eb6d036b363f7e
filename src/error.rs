use std::result;

// Specialized Result for field-write operations, similar to std::io::Result
pub type Result<T> = result::Result<T, Error>;

/// Recoverable failures of field-write operations. The prior field value
/// is always retained on failure.
///
/// Out-of-catalog field indices are not represented here: they are a
/// programming error against a closed field enumeration and panic on the
/// index-based surface (the typed surface makes them unrepresentable).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
  // Writes are accepted for the Value attribute only.
  UnsupportedAttribute,
  // The supplied value's type cannot be coerced into the field's domain,
  // e.g. a boolean written to a numeric field.
  WrongValueType,
  // Numeric code does not map to any variant of the target enumeration.
  UnknownEnumCode(u64),
  // Value outside the field's allowed range (prefix length, host count).
  OutOfRange,
}
