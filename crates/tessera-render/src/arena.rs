//! Generation-counted slot storage with an intrusive insertion order.
//!
//! Slots are reused after removal (like a `Vec<Option<T>>` texture table),
//! but every reuse bumps the slot generation so stale keys stop resolving.
//! Live entries are threaded on a doubly linked list, newest first, giving
//! O(1) insert-at-head and O(1) unlink.

/// Key of an arena entry: slot index plus the generation it was issued at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    index: u32,
    generation: u32,
}

impl Key {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

struct Entry<T> {
    value: T,
    prev: Option<u32>,
    next: Option<u32>,
}

struct Slot<T> {
    generation: u32,
    entry: Option<Entry<T>>,
}

pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    head: Option<u32>,
    len: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert at the head of the order.
    pub fn insert(&mut self, value: T) -> Key {
        let entry = Entry {
            value,
            prev: None,
            next: self.head,
        };
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index as usize].entry = Some(entry);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                (self.slots.len() - 1) as u32
            }
        };
        if let Some(old_head) = self.head
            && let Some(e) = self.slots[old_head as usize].entry.as_mut()
        {
            e.prev = Some(index);
        }
        self.head = Some(index);
        self.len += 1;
        Key {
            index,
            generation: self.slots[index as usize].generation,
        }
    }

    fn slot(&self, key: Key) -> Option<&Slot<T>> {
        self.slots
            .get(key.index as usize)
            .filter(|s| s.generation == key.generation && s.entry.is_some())
    }

    pub fn contains(&self, key: Key) -> bool {
        self.slot(key).is_some()
    }

    pub fn get(&self, key: Key) -> Option<&T> {
        self.slot(key)?.entry.as_ref().map(|e| &e.value)
    }

    pub fn get_mut(&mut self, key: Key) -> Option<&mut T> {
        let slot = self.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.entry.as_mut().map(|e| &mut e.value)
    }

    /// Unlink and return the entry. The slot's generation is bumped so `key`
    /// (and every copy of it) no longer resolves.
    pub fn remove(&mut self, key: Key) -> Option<T> {
        self.slot(key)?;
        let slot = &mut self.slots[key.index as usize];
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);

        match entry.prev {
            Some(prev) => {
                if let Some(e) = self.slots[prev as usize].entry.as_mut() {
                    e.next = entry.next;
                }
            }
            None => self.head = entry.next,
        }
        if let Some(next) = entry.next
            && let Some(e) = self.slots[next as usize].entry.as_mut()
        {
            e.prev = entry.prev;
        }
        self.free.push(key.index);
        self.len -= 1;
        Some(entry.value)
    }

    /// Key of the newest entry.
    pub fn head(&self) -> Option<Key> {
        self.head.map(|index| Key {
            index,
            generation: self.slots[index as usize].generation,
        })
    }

    /// Entries newest first.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            arena: self,
            cursor: self.head,
        }
    }

    /// Keys newest first.
    pub fn keys(&self) -> Vec<Key> {
        self.iter().map(|(k, _)| k).collect()
    }
}

pub struct Iter<'a, T> {
    arena: &'a Arena<T>,
    cursor: Option<u32>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (Key, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        let slot = &self.arena.slots[index as usize];
        let entry = slot.entry.as_ref()?;
        self.cursor = entry.next;
        Some((
            Key {
                index,
                generation: slot.generation,
            },
            &entry.value,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_orders_newest_first() {
        let mut a = Arena::new();
        let k1 = a.insert(1);
        let k2 = a.insert(2);
        let k3 = a.insert(3);
        assert_eq!(a.keys(), vec![k3, k2, k1]);
        assert_eq!(a.head(), Some(k3));
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn remove_middle_relinks() {
        let mut a = Arena::new();
        let k1 = a.insert("a");
        let k2 = a.insert("b");
        let k3 = a.insert("c");
        assert_eq!(a.remove(k2), Some("b"));
        assert_eq!(a.keys(), vec![k3, k1]);
        assert_eq!(a.remove(k3), Some("c"));
        assert_eq!(a.head(), Some(k1));
        assert_eq!(a.remove(k1), Some("a"));
        assert!(a.is_empty());
        assert_eq!(a.head(), None);
    }

    #[test]
    fn stale_key_does_not_resolve_after_reuse() {
        let mut a = Arena::new();
        let old = a.insert(10);
        a.remove(old);
        let new = a.insert(20);
        assert_eq!(old.index(), new.index());
        assert_ne!(old.generation(), new.generation());
        assert_eq!(a.get(old), None);
        assert_eq!(a.get_mut(old), None);
        assert_eq!(a.remove(old), None);
        assert_eq!(a.get(new), Some(&20));
    }

    #[test]
    fn double_remove_is_none() {
        let mut a = Arena::new();
        let k = a.insert(());
        assert!(a.remove(k).is_some());
        assert!(a.remove(k).is_none());
        assert!(!a.contains(k));
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn survivors_stay_in_insertion_order(
                n in 1usize..40,
                kill in proptest::collection::vec(any::<bool>(), 40),
            ) {
                let mut a = Arena::new();
                let keys: Vec<Key> = (0..n).map(|i| a.insert(i)).collect();
                let mut expected = Vec::new();
                for (i, k) in keys.iter().enumerate() {
                    if kill[i] {
                        prop_assert_eq!(a.remove(*k), Some(i));
                    } else {
                        expected.push(i);
                    }
                }
                expected.reverse();
                let order: Vec<usize> = a.iter().map(|(_, v)| *v).collect();
                prop_assert_eq!(order, expected);
                prop_assert_eq!(a.len(), a.iter().count());
            }
        }
    }
}
