//! Identity vs value semantics for domain types.

/// A record with a stable identity: two records with the same id are the same
/// record even when their attributes differ (e.g. a `Product` after a price
/// change).
pub trait Entity {
    type Id: Copy + Eq + Ord + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> Self::Id;
}

/// Whether `items` already holds an entity with identifier `id`.
pub fn contains_id<E: Entity>(items: &[E], id: E::Id) -> bool {
    items.iter().any(|item| item.id() == id)
}

/// Marker for validated values compared by their contents.
///
/// Constructors validate, so holding an instance means the value already
/// satisfies its rules (a `Quantity` is never zero).
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
