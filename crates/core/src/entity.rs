//! Records addressed by a typed id.

/// Users and organizations are keyed by their id alone; two records with the
/// same id are versions of the same row.
pub trait Entity {
    type Id: Copy + Ord + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> Self::Id;
}
