/// A simple slab of reusable slots.
///
/// A `Slab` stores values of type `T` in a contiguous array and returns
/// indices that stay valid until the value is removed. Freed indices are
/// reused by later insertions.
///
/// Used to keep fiber listeners addressable so a single listener can be
/// detached without disturbing the others.
pub(crate) struct Slab<T> {
    /// Storage for items; `None` marks a free slot.
    items: Vec<Option<T>>,
    /// Stack of free indices that can be reused.
    free: Vec<usize>,
}

impl<T> Slab<T> {
    pub(crate) fn new() -> Self {
        Self {
            items: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Inserts a value and returns its index.
    pub(crate) fn insert(&mut self, item: T) -> usize {
        let index = match self.free.pop() {
            Some(i) => {
                self.items[i] = Some(item);
                i
            }
            None => {
                self.items.push(Some(item));
                self.items.len() - 1
            }
        };

        index
    }

    /// Removes and returns the value stored at `index`, if any.
    pub(crate) fn remove(&mut self, index: usize) -> Option<T> {
        let item = self.items.get_mut(index)?.take()?;

        self.free.push(index);
        Some(item)
    }

    /// Removes every value, yielding them in index order.
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.free.clear();
        self.items.drain(..).flatten()
    }
}
