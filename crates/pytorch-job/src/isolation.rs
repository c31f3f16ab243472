//! Independent copies of jobs.
//!
//! Every model type owns all of its data, so a copy never shares storage
//! with its source: optional fields, the role map and every replica spec
//! are allocated afresh. A job that has been handed to a cache, a
//! controller or a status writer is only ever changed through such a copy.

use crate::common::{JobList, JobStatus, ReplicaSpec};

/// Types that can be handed across ownership boundaries as a full copy.
pub trait DeepCopy: Clone {
    /// Returns a value equal to `self` that shares no storage with it.
    fn deep_copy(&self) -> Self {
        self.clone()
    }

    /// Overwrites `out` with a copy of `self`, reusing `out`'s allocations
    /// where possible.
    fn deep_copy_into(&self, out: &mut Self) {
        out.clone_from(self);
    }
}

/// Copies an optional root. Nothing in, nothing out.
pub fn deep_copy_opt<T: DeepCopy>(value: Option<&T>) -> Option<T> {
    value.map(DeepCopy::deep_copy)
}

impl DeepCopy for ReplicaSpec {}

impl DeepCopy for JobStatus {}

impl<K: DeepCopy> DeepCopy for JobList<K> {
    fn deep_copy(&self) -> Self {
        JobList {
            metadata: self.metadata.clone(),
            items: self.items.iter().map(DeepCopy::deep_copy).collect(),
        }
    }

    fn deep_copy_into(&self, out: &mut Self) {
        out.metadata.clone_from(&self.metadata);
        out.items.truncate(self.items.len());
        for (dst, src) in out.items.iter_mut().zip(&self.items) {
            src.deep_copy_into(dst);
        }
        let copied = out.items.len();
        out.items
            .extend(self.items[copied..].iter().map(DeepCopy::deep_copy));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Item(Vec<u8>);

    impl DeepCopy for Item {}

    #[test]
    fn absent_root_copies_to_absent() {
        assert_eq!(deep_copy_opt::<ReplicaSpec>(None), None);
    }

    #[test]
    fn list_copy_into_shrinks_and_grows() {
        let short = JobList::new(vec![Item(vec![1])]);
        let long = JobList::new(vec![Item(vec![2]), Item(vec![3]), Item(vec![4])]);

        let mut out = long.deep_copy();
        short.deep_copy_into(&mut out);
        assert_eq!(out, short);

        long.deep_copy_into(&mut out);
        assert_eq!(out, long);
        assert_ne!(out.items[0].0.as_ptr(), long.items[0].0.as_ptr());
    }
}
