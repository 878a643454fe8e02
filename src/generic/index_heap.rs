/*!
A max-heap over a subset of elements with fixed indices.

In other words, a heap backed by a vector of values, together with a companion vector tracking
where (if anywhere) each value index currently sits inside the heap.
The backing vector stays constant, so the structure doubles as a store of values which may move
on and off the heap.

The searcher uses an [IndexHeap] keyed by variable activity: any variable without a value is
*active* on the heap, and the variable of most activity is taken when a decision is required.
The reducer uses one keyed by clause activity and glue.

To help maintain values, the callbacks [apply_to_index](IndexHeap::apply_to_index) and
[apply_to_all](IndexHeap::apply_to_all) are provided --- e.g. bumping the activity of one
variable, and rescaling the activity of every variable.
*/

/// The index heap struct.
pub struct IndexHeap<V: PartialOrd + Default> {
    values: Vec<V>,
    position_in_heap: Vec<Option<usize>>,
    heap: Vec<usize>,
}

impl<V: PartialOrd + Default> Default for IndexHeap<V> {
    fn default() -> Self {
        IndexHeap {
            values: Vec::default(),
            position_in_heap: Vec::default(),
            heap: Vec::default(),
        }
    }
}

impl<V: PartialOrd + Default> IndexHeap<V> {
    /// Associates `value` with `index`, growing the structure as needed.
    ///
    /// The index is *not* placed on the heap; for that, call [activate](IndexHeap::activate).
    pub fn add(&mut self, index: usize, value: V) {
        while self.values.len() <= index {
            self.values.push(V::default());
            self.position_in_heap.push(None);
        }
        self.values[index] = value;
    }

    /// A count of values indexed by the structure.
    pub fn count(&self) -> usize {
        self.values.len()
    }

    /// A count of indices currently active on the heap.
    pub fn active_count(&self) -> usize {
        self.heap.len()
    }

    /// Whether `index` is currently on the heap.
    pub fn is_active(&self, index: usize) -> bool {
        matches!(self.position_in_heap.get(index), Some(Some(_)))
    }

    /// Places `index` on the heap, or restores heap order around it if already present.
    pub fn activate(&mut self, index: usize) {
        debug_assert!(index < self.values.len());
        match self.position_in_heap[index] {
            None => {
                let position = self.heap.len();
                self.heap.push(index);
                self.position_in_heap[index] = Some(position);
                self.sift_up(position);
            }
            Some(position) => {
                self.sift_up(position);
                self.sift_down(self.position_in_heap[index].unwrap_or(position));
            }
        }
    }

    /// Removes `index` from the heap, if present. Returns true on removal.
    pub fn remove(&mut self, index: usize) -> bool {
        let Some(Some(position)) = self.position_in_heap.get(index).copied() else {
            return false;
        };

        let last = self.heap.len() - 1;
        self.heap.swap(position, last);
        self.position_in_heap[self.heap[position]] = Some(position);
        self.heap.pop();
        self.position_in_heap[index] = None;

        if position < self.heap.len() {
            self.sift_down(position);
            self.sift_up(position);
        }
        true
    }

    /// Peek at the index of greatest value on the heap.
    pub fn peek_max(&self) -> Option<usize> {
        self.heap.first().copied()
    }

    /// Pop the index of greatest value off the heap.
    pub fn pop_max(&mut self) -> Option<usize> {
        let max = self.peek_max()?;
        self.remove(max);
        Some(max)
    }

    /// The value at `index`.
    pub fn value_at(&self, index: usize) -> &V {
        &self.values[index]
    }

    /// Apply `f` to the value at `index` and restore heap order if the index is active.
    pub fn apply_to_index(&mut self, index: usize, f: impl FnOnce(&V) -> V) {
        self.values[index] = f(&self.values[index]);
        if let Some(Some(position)) = self.position_in_heap.get(index).copied() {
            self.sift_up(position);
            self.sift_down(self.position_in_heap[index].unwrap_or(position));
        }
    }

    /// Apply `f` to all values, then rebuild the heap.
    pub fn apply_to_all(&mut self, f: impl Fn(&V) -> V) {
        for value in self.values.iter_mut() {
            *value = f(value);
        }
        self.heapify();
    }

    /// Restore the heap invariant over every active index.
    pub fn heapify(&mut self) {
        for position in (0..self.heap.len() / 2).rev() {
            self.sift_down(position);
        }
    }

    /// Drop all values and indices above `bound`.
    ///
    /// Used by the renumberer in memory-save mode, after the interesting variables have been
    /// moved below the bound.
    pub fn truncate(&mut self, bound: usize) {
        self.heap.retain(|&index| index < bound);
        self.values.truncate(bound);
        self.position_in_heap.truncate(bound);
        for position in self.position_in_heap.iter_mut() {
            *position = None;
        }
        for (position, &index) in self.heap.iter().enumerate() {
            self.position_in_heap[index] = Some(position);
        }
        self.heapify();
    }

    fn greater(&self, a: usize, b: usize) -> bool {
        self.values[self.heap[a]] > self.values[self.heap[b]]
    }

    fn swap_positions(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.position_in_heap[self.heap[a]] = Some(a);
        self.position_in_heap[self.heap[b]] = Some(b);
    }

    fn sift_up(&mut self, mut position: usize) {
        while position > 0 {
            let parent = (position - 1) / 2;
            if self.greater(position, parent) {
                self.swap_positions(position, parent);
                position = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut position: usize) {
        loop {
            let left = 2 * position + 1;
            let right = left + 1;
            let mut largest = position;

            if left < self.heap.len() && self.greater(left, largest) {
                largest = left;
            }
            if right < self.heap.len() && self.greater(right, largest) {
                largest = right;
            }
            if largest == position {
                break;
            }
            self.swap_positions(position, largest);
            position = largest;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_order() {
        let mut heap = IndexHeap::default();
        heap.add(0, 70);
        heap.add(600, 10);
        heap.add(3, 40);

        heap.activate(600);
        heap.activate(0);
        heap.activate(3);

        assert_eq!(heap.pop_max(), Some(0));
        assert_eq!(heap.pop_max(), Some(3));
        assert_eq!(heap.pop_max(), Some(600));
        assert_eq!(heap.pop_max(), None);
    }

    #[test]
    fn revalue_while_active() {
        let mut heap = IndexHeap::default();
        for index in 0..8 {
            heap.add(index, index as i32);
            heap.activate(index);
        }

        heap.apply_to_index(2, |_| 100);
        assert_eq!(heap.pop_max(), Some(2));
        assert_eq!(heap.pop_max(), Some(7));
    }

    #[test]
    fn truncate_drops_high_indices() {
        let mut heap = IndexHeap::default();
        for index in 0..10 {
            heap.add(index, index as i32);
            heap.activate(index);
        }

        heap.truncate(4);
        assert_eq!(heap.active_count(), 4);
        assert_eq!(heap.pop_max(), Some(3));
    }
}
