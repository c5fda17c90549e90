//! Generational slot storage for in-memory entity nodes.
//!
//! Slots are allocated from a free list when available. Removing a node bumps
//! its slot's generation, so handles to removed nodes are detected as stale.

// Allow u64 to usize casts - we target 64-bit systems
#![allow(clippy::cast_possible_truncation)]

use modelbase_foundation::{Error, NodeId, Result};

/// Arena of values addressed by [`NodeId`] handles.
#[derive(Debug, Clone)]
pub struct NodeArena<T> {
    /// Generation counter per slot. Even generations are free, odd are alive.
    generations: Vec<u32>,
    slots: Vec<Option<T>>,
    free_list: Vec<u64>,
    live_count: usize,
}

impl<T> Default for NodeArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> NodeArena<T> {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self {
            generations: Vec::new(),
            slots: Vec::new(),
            free_list: Vec::new(),
            live_count: 0,
        }
    }

    /// Inserts a value and returns its handle.
    pub fn insert(&mut self, value: T) -> NodeId {
        self.live_count += 1;

        if let Some(index) = self.free_list.pop() {
            let idx = index as usize;
            self.generations[idx] += 1;
            self.slots[idx] = Some(value);
            NodeId::new(index, self.generations[idx])
        } else {
            let index = self.generations.len() as u64;
            self.generations.push(1);
            self.slots.push(Some(value));
            NodeId::new(index, 1)
        }
    }

    /// Removes a value, returning it.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation if the handle is stale or unknown.
    pub fn remove(&mut self, id: NodeId) -> Result<T> {
        self.validate(id)?;
        let idx = id.index as usize;
        self.generations[idx] += 1;
        self.free_list.push(id.index);
        self.live_count -= 1;
        self.slots[idx]
            .take()
            .ok_or_else(|| Error::precondition(format!("{id:?} has no value")))
    }

    /// Returns true if the handle refers to a live node.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.generations
            .get(id.index as usize)
            .is_some_and(|&current| current == id.generation && current % 2 == 1)
    }

    /// Validates that a handle refers to a live node.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation if the handle is stale or unknown.
    pub fn validate(&self, id: NodeId) -> Result<()> {
        match self.generations.get(id.index as usize) {
            None => Err(Error::precondition(format!("{id:?} was never allocated"))),
            Some(&current) if current != id.generation => Err(Error::precondition(format!(
                "{id:?} is stale (slot is at generation {current})"
            ))),
            Some(&current) if current % 2 == 0 => {
                Err(Error::precondition(format!("{id:?} was removed")))
            }
            Some(_) => Ok(()),
        }
    }

    /// Returns the value behind a handle.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation if the handle is stale or unknown.
    pub fn get(&self, id: NodeId) -> Result<&T> {
        self.validate(id)?;
        self.slots[id.index as usize]
            .as_ref()
            .ok_or_else(|| Error::precondition(format!("{id:?} has no value")))
    }

    /// Returns the value behind a handle, mutably.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation if the handle is stale or unknown.
    pub fn get_mut(&mut self, id: NodeId) -> Result<&mut T> {
        self.validate(id)?;
        self.slots[id.index as usize]
            .as_mut()
            .ok_or_else(|| Error::precondition(format!("{id:?} has no value")))
    }

    /// Number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live_count
    }

    /// Returns true if there are no live nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    /// Iterates live handles and values in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            slot.as_ref()
                .map(|value| (NodeId::new(idx as u64, self.generations[idx]), value))
        })
    }
}
