use std::collections::VecDeque;

/// Items that share one logical timestamp and are dispatched together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice<T> {
    time: u64,
    items: Vec<T>,
}

impl<T> Slice<T> {
    /// The shared timestamp
    pub const fn time(&self) -> u64 {
        self.time
    }

    /// The items, in insertion order
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Take the items
    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

#[doc = r#"
A time-ordered sequence of [`Slice`]s.

Timestamps strictly increase from front to back and no slice is empty.
Insertion scans backward from the latest slice, which is where MIDI data
usually lands.

```rust
# use imuse_midi::prelude::*;
let mut queue = ScheduleQueue::new();
for (time, item) in [(100, 'a'), (50, 'b'), (100, 'c'), (75, 'd')] {
    queue.insert(time, item);
}
assert_eq!(queue.pop().unwrap().into_items(), vec!['b']);
assert_eq!(queue.pop().unwrap().into_items(), vec!['d']);
assert_eq!(queue.pop().unwrap().into_items(), vec!['a', 'c']);
assert!(queue.pop().is_none());
```
"#]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleQueue<T> {
    slices: VecDeque<Slice<T>>,
}

impl<T> Default for ScheduleQueue<T> {
    fn default() -> Self {
        Self {
            slices: VecDeque::new(),
        }
    }
}

impl<T> ScheduleQueue<T> {
    /// An empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `item` at `time`, joining an existing slice with that time.
    pub fn insert(&mut self, time: u64, item: T) {
        let mut at = self.slices.len();
        while at > 0 {
            let slice = &mut self.slices[at - 1];
            if slice.time == time {
                slice.items.push(item);
                return;
            }
            if slice.time < time {
                break;
            }
            at -= 1;
        }
        self.slices.insert(
            at,
            Slice {
                time,
                items: vec![item],
            },
        );
    }

    /// Timestamp of the earliest slice
    pub fn peek_time(&self) -> Option<u64> {
        self.slices.front().map(|s| s.time)
    }

    /// Remove the earliest slice.
    pub fn pop(&mut self) -> Option<Slice<T>> {
        self.slices.pop_front()
    }

    /// Number of slices
    pub fn len(&self) -> usize {
        self.slices.len()
    }

    /// True if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Number of items over all slices
    pub fn item_count(&self) -> usize {
        self.slices.iter().map(|s| s.items.len()).sum()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.slices.clear();
    }

    /// The slices, earliest first
    pub fn iter(&self) -> impl Iterator<Item = &Slice<T>> {
        self.slices.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn times<T>(queue: &ScheduleQueue<T>) -> Vec<u64> {
        queue.iter().map(Slice::time).collect()
    }

    #[test]
    fn equal_times_share_a_slice() {
        let mut queue = ScheduleQueue::new();
        for (i, time) in [100, 50, 100, 75].into_iter().enumerate() {
            queue.insert(time, i);
        }
        assert_eq!(times(&queue), vec![50, 75, 100]);
        assert_eq!(queue.item_count(), 4);

        let popped: Vec<Vec<usize>> = std::iter::from_fn(|| queue.pop())
            .map(Slice::into_items)
            .collect();
        assert_eq!(popped, vec![vec![1], vec![3], vec![0, 2]]);
    }

    #[test]
    fn inserts_at_front_middle_and_back() {
        let mut queue = ScheduleQueue::new();
        queue.insert(10, ());
        queue.insert(30, ());
        queue.insert(0, ());
        queue.insert(20, ());
        queue.insert(40, ());
        queue.insert(0, ());
        assert_eq!(times(&queue), vec![0, 10, 20, 30, 40]);
        assert_eq!(queue.peek_time(), Some(0));
        assert_eq!(queue.len(), 5);
    }

    #[test]
    fn clear_empties() {
        let mut queue = ScheduleQueue::new();
        queue.insert(1, 'x');
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.peek_time(), None);
    }
}
