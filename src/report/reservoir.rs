use rand::Rng;

/// Fixed-capacity uniform sample of a stream (Algorithm R).
///
/// Each worker fills its own reservoir; `merge` combines two of them into a
/// uniform sample of the union by drawing each slot from a side with
/// probability proportional to how many items that side has still seen.
#[derive(Debug, Clone, PartialEq)]
pub struct Reservoir {
    capacity: usize,
    seen: u64,
    items: Vec<f64>,
}

impl Reservoir {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            seen: 0,
            items: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn offer<R: Rng + ?Sized>(&mut self, value: f64, rng: &mut R) {
        self.seen += 1;
        if self.capacity == 0 {
            return;
        }
        if self.items.len() < self.capacity {
            self.items.push(value);
            return;
        }
        let slot = rng.random_range(0..self.seen);
        if slot < self.capacity as u64 {
            self.items[slot as usize] = value;
        }
    }

    /// Combine two reservoirs of equal capacity.
    pub fn merge<R: Rng + ?Sized>(self, other: Reservoir, rng: &mut R) -> Reservoir {
        let capacity = self.capacity.max(other.capacity);
        let seen = self.seen + other.seen;

        // Everything fits: nothing has been dropped on either side yet
        if self.items.len() + other.items.len() <= capacity
            && self.seen == self.items.len() as u64
            && other.seen == other.items.len() as u64
        {
            let mut items = self.items;
            items.extend(other.items);
            return Reservoir { capacity, seen, items };
        }

        let (mut left, mut left_seen) = (self.items, self.seen);
        let (mut right, mut right_seen) = (other.items, other.seen);
        let mut items = Vec::with_capacity(capacity);

        while items.len() < capacity && (!left.is_empty() || !right.is_empty()) {
            let take_left = if left.is_empty() {
                false
            } else if right.is_empty() {
                true
            } else {
                rng.random_range(0..left_seen + right_seen) < left_seen
            };

            if take_left {
                let i = rng.random_range(0..left.len());
                items.push(left.swap_remove(i));
                left_seen -= 1;
            } else {
                let i = rng.random_range(0..right.len());
                items.push(right.swap_remove(i));
                right_seen -= 1;
            }
        }

        Reservoir { capacity, seen, items }
    }

    #[inline]
    pub fn seen(&self) -> u64 {
        self.seen
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn into_items(self) -> Vec<f64> {
        self.items
    }
}
