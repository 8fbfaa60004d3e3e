//! LRU Order Module
//!
//! Intrusive doubly linked LRU orders over a shared slot arena.
//!
//! Entries live in one [`Arena`] and are addressed by stable [`SlotId`]s.
//! Several [`LruOrder`]s can thread through the same arena; moving an entry
//! between orders only relinks indices.
//!
//! Each order keeps:
//! - Front = Most recently used
//! - Back = Least recently used

/// Stable index of an arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(usize);

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

// == Arena ==
/// Slot storage with a free list; removed slots are reused.
#[derive(Debug)]
pub struct Arena<T> {
    slots: Vec<Option<Node<T>>>,
    free_list: Vec<usize>,
    len: usize,
}

impl<T> Arena<T> {
    /// Empty arena; slots are allocated as entries arrive.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Stores `value` in a free slot. The slot is not linked into any order.
    pub fn insert(&mut self, value: T) -> SlotId {
        let node = Node {
            value,
            prev: None,
            next: None,
        };
        let idx = if let Some(idx) = self.free_list.pop() {
            self.slots[idx] = Some(node);
            idx
        } else {
            self.slots.push(Some(node));
            self.slots.len() - 1
        };
        self.len += 1;
        SlotId(idx)
    }

    /// Frees a slot. Callers unlink it from its order first.
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        let node = self.slots.get_mut(id.0)?.take()?;
        self.free_list.push(id.0);
        self.len -= 1;
        Some(node.value)
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.node(id).map(|node| &node.value)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.node_mut(id).map(|node| &mut node.value)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn node(&self, id: SlotId) -> Option<&Node<T>> {
        self.slots.get(id.0).and_then(|slot| slot.as_ref())
    }

    fn node_mut(&mut self, id: SlotId) -> Option<&mut Node<T>> {
        self.slots.get_mut(id.0).and_then(|slot| slot.as_mut())
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

// == LRU Order ==
/// One recency order threaded through an [`Arena`].
#[derive(Debug, Default)]
pub struct LruOrder {
    head: Option<SlotId>,
    tail: Option<SlotId>,
    len: usize,
}

impl LruOrder {
    // == Constructor ==
    /// Creates a new empty order.
    pub fn new() -> Self {
        Self::default()
    }

    // == Push Front ==
    /// Links an unlinked slot at the most recently used end.
    pub fn push_front<T>(&mut self, arena: &mut Arena<T>, id: SlotId) {
        let old_head = self.head;
        if let Some(node) = arena.node_mut(id) {
            node.prev = None;
            node.next = old_head;
        } else {
            return;
        }
        match old_head {
            Some(head) => {
                if let Some(node) = arena.node_mut(head) {
                    node.prev = Some(id);
                }
            }
            None => self.tail = Some(id),
        }
        self.head = Some(id);
        self.len += 1;
    }

    // == Unlink ==
    /// Detaches a slot from this order, leaving it stored in the arena.
    pub fn unlink<T>(&mut self, arena: &mut Arena<T>, id: SlotId) {
        let (prev, next) = match arena.node_mut(id) {
            Some(node) => {
                let links = (node.prev, node.next);
                node.prev = None;
                node.next = None;
                links
            }
            None => return,
        };

        match prev {
            Some(prev) => {
                if let Some(node) = arena.node_mut(prev) {
                    node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(next) => {
                if let Some(node) = arena.node_mut(next) {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }
        self.len -= 1;
    }

    // == Touch ==
    /// Marks a linked slot as recently used (moves to front).
    pub fn move_to_front<T>(&mut self, arena: &mut Arena<T>, id: SlotId) {
        if self.head == Some(id) {
            return;
        }
        self.unlink(arena, id);
        self.push_front(arena, id);
    }

    // == Peek Oldest ==
    /// Returns the least recently used slot without unlinking it.
    pub fn back(&self) -> Option<SlotId> {
        self.tail
    }

    // == Evict Oldest ==
    /// Unlinks and returns the least recently used slot.
    pub fn pop_back<T>(&mut self, arena: &mut Arena<T>) -> Option<SlotId> {
        let id = self.tail?;
        self.unlink(arena, id);
        Some(id)
    }

    /// Returns the number of linked slots.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates from most to least recently used.
    pub fn iter<'a, T>(&self, arena: &'a Arena<T>) -> impl Iterator<Item = SlotId> + 'a {
        let mut current = self.head;
        std::iter::from_fn(move || {
            let id = current?;
            current = arena.node(id).and_then(|node| node.next);
            Some(id)
        })
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn filled(values: &[&'static str]) -> (Arena<&'static str>, LruOrder, Vec<SlotId>) {
        let mut arena = Arena::new();
        let mut order = LruOrder::new();
        let ids = values
            .iter()
            .map(|v| {
                let id = arena.insert(*v);
                order.push_front(&mut arena, id);
                id
            })
            .collect();
        (arena, order, ids)
    }

    fn values(order: &LruOrder, arena: &Arena<&'static str>) -> Vec<&'static str> {
        order.iter(arena).map(|id| *arena.get(id).unwrap()).collect()
    }

    #[test]
    fn test_order_new() {
        let order = LruOrder::new();
        assert!(order.is_empty());
        assert_eq!(order.back(), None);
    }

    #[test]
    fn test_push_front_keeps_oldest_at_back() {
        let (arena, order, ids) = filled(&["a", "b", "c"]);

        assert_eq!(order.len(), 3);
        assert_eq!(order.back(), Some(ids[0]));
        assert_eq!(values(&order, &arena), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_move_to_front() {
        let (mut arena, mut order, ids) = filled(&["a", "b", "c"]);

        order.move_to_front(&mut arena, ids[0]);

        assert_eq!(order.len(), 3);
        assert_eq!(order.back(), Some(ids[1]));
        assert_eq!(values(&order, &arena), vec!["a", "c", "b"]);
    }

    #[test]
    fn test_pop_back_in_lru_order() {
        let (mut arena, mut order, ids) = filled(&["a", "b", "c"]);

        assert_eq!(order.pop_back(&mut arena), Some(ids[0]));
        assert_eq!(order.pop_back(&mut arena), Some(ids[1]));
        assert_eq!(order.pop_back(&mut arena), Some(ids[2]));
        assert_eq!(order.pop_back(&mut arena), None);
        // Popped slots stay in the arena until removed
        assert_eq!(arena.len(), 3);
    }

    #[test]
    fn test_unlink_middle() {
        let (mut arena, mut order, ids) = filled(&["a", "b", "c"]);

        order.unlink(&mut arena, ids[1]);

        assert_eq!(order.len(), 2);
        assert_eq!(values(&order, &arena), vec!["c", "a"]);
    }

    #[test]
    fn test_move_between_orders() {
        let (mut arena, mut window, ids) = filled(&["a", "b"]);
        let mut main = LruOrder::new();

        let id = window.pop_back(&mut arena).unwrap();
        main.push_front(&mut arena, id);

        assert_eq!(id, ids[0]);
        assert_eq!(values(&window, &arena), vec!["b"]);
        assert_eq!(values(&main, &arena), vec!["a"]);
    }

    #[test]
    fn test_arena_reuses_freed_slots() {
        let (mut arena, mut order, ids) = filled(&["a", "b"]);

        order.unlink(&mut arena, ids[0]);
        assert_eq!(arena.remove(ids[0]), Some("a"));
        assert_eq!(arena.remove(ids[0]), None);

        let id = arena.insert("c");
        assert_eq!(id, ids[0]);
        assert_eq!(arena.len(), 2);
    }
}
