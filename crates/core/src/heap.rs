//! Array-backed binary min-heap.
//!
//! Used by the tree builder to repeatedly pull the two lightest subtrees.
//! Children of index `i` live at `2i + 1` and `2i + 2`.
//!
//! # Invariants
//! - `elements[parent(i)] <= elements[i]` for every `i > 0`
//! - `len()` equals the number of live entries

/// A min-heap ordered by `T: Ord`.
///
/// Ties are resolved by `T`'s own ordering, so a total order on `T` gives a
/// fully deterministic extraction sequence.
#[derive(Debug, Clone)]
pub struct MinHeap<T> {
    elements: Vec<T>,
}

impl<T: Ord> MinHeap<T> {
    /// Create an empty heap.
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
        }
    }

    /// Build a heap from arbitrary elements in linear time.
    ///
    /// Sifts down every parent, from the last one back to the root.
    pub fn build(elements: Vec<T>) -> Self {
        let mut heap = Self { elements };
        let n = heap.len();
        if n > 1 {
            for i in (0..=(n - 2) / 2).rev() {
                heap.sift_down(i);
            }
        }
        heap
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True if the heap has no entries.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Smallest entry, without removing it.
    pub fn peek(&self) -> Option<&T> {
        self.elements.first()
    }

    /// Remove and return the smallest entry.
    ///
    /// The last element moves to the root and sifts down.
    pub fn extract_min(&mut self) -> Option<T> {
        if self.elements.is_empty() {
            return None;
        }
        let last = self.elements.len() - 1;
        self.elements.swap(0, last);
        let min = self.elements.pop();
        self.sift_down(0);
        min
    }

    /// Add an entry and sift it up to its place.
    pub fn insert(&mut self, value: T) {
        self.elements.push(value);
        self.sift_up(self.elements.len() - 1);
    }

    /// Check the heap property at every position.
    pub fn is_valid(&self) -> bool {
        (1..self.elements.len()).all(|i| self.elements[(i - 1) / 2] <= self.elements[i])
    }

    fn sift_down(&mut self, mut i: usize) {
        let n = self.elements.len();
        loop {
            let left = 2 * i + 1;
            let right = left + 1;
            let mut smallest = i;

            if left < n && self.elements[left] < self.elements[smallest] {
                smallest = left;
            }
            if right < n && self.elements[right] < self.elements[smallest] {
                smallest = right;
            }
            if smallest == i {
                return;
            }

            self.elements.swap(i, smallest);
            i = smallest;
        }
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.elements[i] >= self.elements[parent] {
                return;
            }
            self.elements.swap(i, parent);
            i = parent;
        }
    }
}

impl<T: Ord> Default for MinHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_and_drain_sorted() {
        let mut heap = MinHeap::build(vec![9, 4, 7, 1, 8, 2, 2, 6]);
        assert!(heap.is_valid());

        let mut drained = Vec::new();
        while let Some(v) = heap.extract_min() {
            assert!(heap.is_valid());
            drained.push(v);
        }
        assert_eq!(drained, vec![1, 2, 2, 4, 6, 7, 8, 9]);
    }

    #[test]
    fn test_insert_keeps_invariant() {
        let mut heap = MinHeap::new();
        for v in [5, 3, 8, 1, 9, 0, 4] {
            heap.insert(v);
            assert!(heap.is_valid());
        }
        assert_eq!(heap.len(), 7);
        assert_eq!(heap.peek(), Some(&0));
    }

    #[test]
    fn test_empty_and_single() {
        let mut heap: MinHeap<u32> = MinHeap::build(Vec::new());
        assert!(heap.is_empty());
        assert_eq!(heap.extract_min(), None);

        let mut heap = MinHeap::build(vec![42]);
        assert_eq!(heap.len(), 1);
        assert_eq!(heap.extract_min(), Some(42));
        assert!(heap.is_empty());
    }

    #[test]
    fn test_mixed_operations() {
        let mut heap = MinHeap::build(vec![10, 20, 30]);
        assert_eq!(heap.extract_min(), Some(10));
        heap.insert(5);
        heap.insert(25);
        assert!(heap.is_valid());
        assert_eq!(heap.extract_min(), Some(5));
        assert_eq!(heap.extract_min(), Some(20));
        assert_eq!(heap.len(), 2);
    }
}
