//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. Two amounts of
/// `20.00` are the same amount; two stored events with identical fields are still
/// distinct records (they carry an `event_id`).
///
/// The trait requires:
/// - **Clone**: values are cheap to copy
/// - **PartialEq**: compared by attribute values
/// - **Debug**: visible in logs and test failures
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
