//! Batch planning.
//!
//! A model with `count` records and batch size `limit` is split into
//! `count / limit` full boxes plus one trailing box holding the remainder.
//! The trailing box is always planned, so an exact multiple of the limit
//! ends with an empty batch that fetches and writes nothing.

use serde::Serialize;
use tracing::warn;

use crate::error::ReindexError;

/// A single batch to fetch and write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchDescriptor {
    /// Zero-based batch number
    pub index: usize,
    /// Maximum records in the batch
    pub limit: usize,
    /// Field the records are ordered by
    pub sort_key: String,
}

impl BatchDescriptor {
    pub fn offset(&self) -> u64 {
        self.index as u64 * self.limit as u64
    }
}

/// The batches covering one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchPlan {
    pub count: u64,
    pub limit: usize,
    /// Number of full batches
    pub boxes: u64,
    /// Records left for the trailing batch
    pub remainder: u64,
    pub descriptors: Vec<BatchDescriptor>,
}

impl BatchPlan {
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// How many records the given batch should return.
    pub fn expected_len(&self, descriptor: &BatchDescriptor) -> u64 {
        if (descriptor.index as u64) < self.boxes {
            self.limit as u64
        } else {
            self.remainder
        }
    }

    /// Log when a fetch returned a different number of records than planned.
    ///
    /// The store may have changed since counting; this is reported, not fatal.
    pub fn check_fetched(&self, model: &str, descriptor: &BatchDescriptor, fetched: usize) {
        let expected = self.expected_len(descriptor);
        if fetched as u64 != expected {
            warn!(
                model,
                batch = descriptor.index + 1,
                expected,
                fetched,
                "Fetched record count differs from plan"
            );
        }
    }
}

/// Split `count` records into batches of at most `limit`.
///
/// A `count` of zero yields an empty plan.
pub fn plan(count: u64, limit: usize, sort_key: &str) -> Result<BatchPlan, ReindexError> {
    if limit == 0 {
        return Err(ReindexError::InvalidBoxSize(limit));
    }

    let boxes = count / limit as u64;
    let remainder = count % limit as u64;

    let descriptors = if count == 0 {
        Vec::new()
    } else {
        (0..=boxes as usize)
            .map(|index| BatchDescriptor {
                index,
                limit,
                sort_key: sort_key.to_string(),
            })
            .collect()
    };

    Ok(BatchPlan {
        count,
        limit,
        boxes,
        remainder,
        descriptors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn offsets(plan: &BatchPlan) -> Vec<u64> {
        plan.descriptors.iter().map(BatchDescriptor::offset).collect()
    }

    #[test]
    fn test_plan_with_remainder() {
        let plan = plan(12000, 5000, "id").unwrap();
        assert_eq!(plan.boxes, 2);
        assert_eq!(plan.remainder, 2000);
        assert_eq!(offsets(&plan), vec![0, 5000, 10000]);
        assert_eq!(plan.expected_len(&plan.descriptors[2]), 2000);
        assert!(plan.descriptors.iter().all(|d| d.sort_key == "id"));
    }

    #[test]
    fn test_exact_multiple_ends_with_empty_batch() {
        let plan = plan(5000, 5000, "id").unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(offsets(&plan), vec![0, 5000]);
        assert_eq!(plan.expected_len(&plan.descriptors[0]), 5000);
        assert_eq!(plan.expected_len(&plan.descriptors[1]), 0);
    }

    #[test]
    fn test_smaller_than_one_box() {
        let plan = plan(1, 5000, "id").unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.expected_len(&plan.descriptors[0]), 1);
    }

    #[test]
    fn test_empty_model_plans_nothing() {
        let plan = plan(0, 5000, "id").unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_zero_limit_rejected() {
        assert!(matches!(plan(10, 0, "id"), Err(ReindexError::InvalidBoxSize(0))));
    }

    #[test]
    fn test_plans_cover_every_record_exactly_once() {
        let mut rng = rand::rng();
        for _ in 0..200 {
            let count: u64 = rng.random_range(1..20_000);
            let limit: usize = rng.random_range(1..3_000);
            let plan = plan(count, limit, "id").unwrap();

            assert_eq!(plan.len() as u64, count / limit as u64 + 1);
            let mut next = 0u64;
            let mut covered = 0u64;
            for descriptor in &plan.descriptors {
                assert_eq!(descriptor.offset(), next);
                let len = plan.expected_len(descriptor);
                covered += len;
                next += limit as u64;
            }
            assert_eq!(covered, count, "count={count} limit={limit}");
        }
    }
}
