//! Splitting lists of union members into one list per member type.

/// A union member that belongs in one bucket of `Self::Buckets`.
pub trait Explode: Sized {
    type Buckets: Default;

    /// Push `self` into its bucket. Returns false when no bucket takes it.
    fn explode_into(self, buckets: &mut Self::Buckets) -> bool;
}

impl<T: Explode> Explode for Option<T> {
    type Buckets = T::Buckets;

    fn explode_into(self, buckets: &mut Self::Buckets) -> bool {
        match self {
            Some(item) => item.explode_into(buckets),
            None => false,
        }
    }
}

/// Explode `items` into buckets, keeping their relative order inside each bucket.
///
/// Members no bucket takes are dropped. The same input always yields the same buckets.
pub fn explode<T: Explode>(items: impl IntoIterator<Item = T>) -> T::Buckets {
    let mut buckets = T::Buckets::default();
    let mut dropped = 0usize;
    for item in items {
        if !item.explode_into(&mut buckets) {
            dropped += 1;
        }
    }
    if dropped > 0 {
        tracing::debug!(dropped, "dropped members without a bucket");
    }
    buckets
}
