use crate::{BeatlaneError, Note, Result};

/// Stable reference to an occupied pool slot.
///
/// The generation counter changes on every release, so a handle kept past a
/// release no longer resolves instead of aliasing the slot's next tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoteHandle {
    index: u32,
    generation: u32,
}

impl NoteHandle {
    pub fn index(self) -> usize {
        self.index as usize
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    note: Option<Note>,
}

/// Fixed-capacity arena of note slots.
///
/// All storage is reserved at construction: acquire and release are O(1)
/// pushes and pops on a free list, and the pool never grows.
#[derive(Debug)]
pub struct NotePool {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl NotePool {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let slots = (0..capacity)
            .map(|_| Slot {
                generation: 0,
                note: None,
            })
            .collect();
        // Popped from the back, so the lowest index is handed out first.
        let free = (0..capacity as u32).rev().collect();
        Self { slots, free }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_full(&self) -> bool {
        self.free.is_empty()
    }

    /// Places `note` into a free slot. Fails with
    /// [`BeatlaneError::PoolExhausted`] when every slot is occupied; the
    /// caller is expected to drop the request.
    pub fn acquire(&mut self, note: Note) -> Result<NoteHandle> {
        let index = self.free.pop().ok_or(BeatlaneError::PoolExhausted {
            capacity: self.slots.len(),
        })?;
        let slot = &mut self.slots[index as usize];
        slot.note = Some(note);
        Ok(NoteHandle {
            index,
            generation: slot.generation,
        })
    }

    /// Frees the slot behind `handle` and returns its note. Releasing a free
    /// or stale handle is a no-op.
    pub fn release(&mut self, handle: NoteHandle) -> Option<Note> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        let note = slot.note.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        Some(note)
    }

    pub fn get(&self, handle: NoteHandle) -> Option<&Note> {
        self.slots
            .get(handle.index())
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.note.as_ref())
    }

    pub fn get_mut(&mut self, handle: NoteHandle) -> Option<&mut Note> {
        self.slots
            .get_mut(handle.index())
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.note.as_mut())
    }

    /// Iterates occupied slots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (NoteHandle, &Note)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.note.as_ref().map(|note| {
                (
                    NoteHandle {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    note,
                )
            })
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (NoteHandle, &mut Note)> + '_ {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let generation = slot.generation;
            slot.note.as_mut().map(|note| {
                (
                    NoteHandle {
                        index: index as u32,
                        generation,
                    },
                    note,
                )
            })
        })
    }

    pub fn for_each_active(&mut self, mut f: impl FnMut(NoteHandle, &mut Note)) {
        for (handle, note) in self.iter_mut() {
            f(handle, note);
        }
    }

    /// Releases every occupied slot in slot order, handing each note to `f`.
    pub fn drain(&mut self, mut f: impl FnMut(NoteHandle, Note)) {
        for index in 0..self.slots.len() {
            let slot = &self.slots[index];
            let handle = NoteHandle {
                index: index as u32,
                generation: slot.generation,
            };
            if let Some(note) = self.release(handle) {
                f(handle, note);
            }
        }
    }
}
