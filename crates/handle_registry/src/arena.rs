//! Generation-checked slot arena.
//!
//! A `HandleId` packs a slot index (low 32 bits) and the slot generation
//! (high 32 bits). Freeing a slot bumps its generation, so an id that
//! outlived its value no longer matches and resolves to `None`. Generation 0
//! is never issued, which keeps the raw id 0 permanently invalid.

use crate::types::HandleId;

const INDEX_BITS: u32 = 32;
const INDEX_MASK: u64 = (1u64 << INDEX_BITS) - 1;

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

#[derive(Debug)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

fn encode(index: u32, generation: u32) -> HandleId {
    HandleId::from_raw(((generation as u64) << INDEX_BITS) | index as u64)
}

fn decode(id: HandleId) -> Option<(u32, u32)> {
    let raw = id.raw();
    let index = (raw & INDEX_MASK) as u32;
    let generation = (raw >> INDEX_BITS) as u32;
    if generation == 0 {
        return None;
    }
    Some((index, generation))
}

fn next_generation(generation: u32) -> u32 {
    let next = generation.wrapping_add(1);
    if next == 0 { 1 } else { next }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Stores `value`; `None` once the 32-bit index space is exhausted.
    pub fn insert(&mut self, value: T) -> Option<HandleId> {
        let id = if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.value.is_none());
            slot.value = Some(value);
            encode(index, slot.generation)
        } else {
            let index = u32::try_from(self.slots.len()).ok()?;
            self.slots.push(Slot {
                generation: 1,
                value: Some(value),
            });
            encode(index, 1)
        };
        self.live += 1;
        Some(id)
    }

    pub fn get(&self, id: HandleId) -> Option<&T> {
        let (index, generation) = decode(id)?;
        let slot = self.slots.get(index as usize)?;
        if slot.generation != generation {
            return None;
        }
        slot.value.as_ref()
    }

    #[cfg(test)]
    fn contains(&self, id: HandleId) -> bool {
        self.get(id).is_some()
    }

    pub fn get_mut(&mut self, id: HandleId) -> Option<&mut T> {
        let (index, generation) = decode(id)?;
        let slot = self.slots.get_mut(index as usize)?;
        if slot.generation != generation {
            return None;
        }
        slot.value.as_mut()
    }

    pub fn remove(&mut self, id: HandleId) -> Option<T> {
        let (index, generation) = decode(id)?;
        let slot = self.slots.get_mut(index as usize)?;
        if slot.generation != generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = next_generation(slot.generation);
        self.free.push(index);
        self.live -= 1;
        Some(value)
    }

    /// Removes every value, invalidating all outstanding ids.
    pub fn clear(&mut self) -> usize {
        let released = self.live;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.value.take().is_some() {
                slot.generation = next_generation(slot.generation);
                self.free.push(index as u32);
            }
        }
        self.live = 0;
        released
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}
