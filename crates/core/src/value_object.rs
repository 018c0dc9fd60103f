//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects carry no [`Identity`](crate::Identity): two amounts of the
/// same number of cents are the same amount. They are stored inline in the
/// payload of the entity that owns them rather than as objects of their own.
///
/// Example:
/// - `Amount` (cents) is a value object
/// - `Account { identity, title, .. }` is an entity
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
