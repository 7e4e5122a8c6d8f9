//! Splits the source id list into request-sized batches.

use std::ops::Range;

/// One contiguous run of source ids, sent together in a single fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch<'a> {
    /// Offset of the first id in the full list.
    pub offset: usize,
    pub ids: &'a [String],
}

impl Batch<'_> {
    /// Position of this batch within the full source id list.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.ids.len()
    }
}

/// Lazy, order-preserving partition of `ids` into slices of at most `size`.
///
/// Every id lands in exactly one batch. A fresh `Batches` always starts again
/// from the first id, which is how each pass re-derives the same partition.
#[derive(Debug, Clone)]
pub struct Batches<'a> {
    ids: &'a [String],
    size: usize,
    cursor: usize,
}

impl<'a> Batches<'a> {
    /// # Panics
    ///
    /// If `size` is zero. Validated configurations never carry a zero batch size.
    pub fn new(ids: &'a [String], size: usize) -> Self {
        assert!(size > 0, "batch size must be positive");
        Self { ids, size, cursor: 0 }
    }

    /// Offset of the next batch to be yielded; equals `ids.len()` once exhausted.
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl<'a> Iterator for Batches<'a> {
    type Item = Batch<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.ids.len() {
            return None;
        }
        let end = self.ids.len().min(self.cursor + self.size);
        let batch = Batch {
            offset: self.cursor,
            ids: &self.ids[self.cursor..end],
        };
        self.cursor = end;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.ids.len() - self.cursor).div_ceil(self.size);
        (left, Some(left))
    }
}

impl ExactSizeIterator for Batches<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn ids(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("s{i}")).collect()
    }

    #[test]
    fn test_five_ids_in_pairs() {
        let ids = ids(5);
        let batches: Vec<Vec<&str>> = Batches::new(&ids, 2)
            .map(|b| b.ids.iter().map(String::as_str).collect())
            .collect();
        assert_eq!(batches, vec![vec!["s1", "s2"], vec!["s3", "s4"], vec!["s5"]]);
    }

    #[test]
    fn test_ranges_and_cursor() {
        let ids = ids(5);
        let mut batches = Batches::new(&ids, 2);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches.next().map(|b| b.range()), Some(0..2));
        assert_eq!(batches.cursor(), 2);
        assert_eq!(batches.next().map(|b| b.range()), Some(2..4));
        assert_eq!(batches.next().map(|b| b.range()), Some(4..5));
        assert_eq!(batches.cursor(), 5);
        assert!(batches.next().is_none());
        assert_eq!(batches.cursor(), 5);
    }

    #[test]
    fn test_exact_multiple_has_full_last_batch() {
        let ids = ids(40);
        let sizes: Vec<usize> = Batches::new(&ids, 20).map(|b| b.ids.len()).collect();
        assert_eq!(sizes, vec![20, 20]);
    }

    #[test]
    fn test_batch_larger_than_list() {
        let ids = ids(3);
        let batches: Vec<_> = Batches::new(&ids, 20).collect();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].range(), 0..3);
    }

    #[test]
    fn test_restart_yields_same_partition() {
        let ids = ids(7);
        let first: Vec<_> = Batches::new(&ids, 3).map(|b| b.range()).collect();
        let second: Vec<_> = Batches::new(&ids, 3).map(|b| b.range()).collect();
        assert_eq!(first, second);
    }

    #[test]
    #[should_panic(expected = "batch size must be positive")]
    fn test_zero_size_panics() {
        let ids = ids(1);
        let _ = Batches::new(&ids, 0);
    }

    proptest! {
        #[test]
        fn prop_partition_is_contiguous_and_complete(len in 1usize..200, size in 1usize..=20) {
            let ids = ids(len);
            let batches: Vec<_> = Batches::new(&ids, size).collect();

            prop_assert_eq!(batches.len(), len.div_ceil(size));

            let mut expected_offset = 0;
            for batch in &batches[..batches.len() - 1] {
                prop_assert_eq!(batch.offset, expected_offset);
                prop_assert_eq!(batch.ids.len(), size);
                expected_offset += size;
            }
            let last = batches.last().unwrap();
            prop_assert_eq!(last.offset, expected_offset);
            prop_assert_eq!(last.ids.len(), len - size * ((len - 1) / size));

            let flattened: Vec<&String> = batches.iter().flat_map(|b| b.ids.iter()).collect();
            let original: Vec<&String> = ids.iter().collect();
            prop_assert_eq!(flattened, original);
        }
    }
}
