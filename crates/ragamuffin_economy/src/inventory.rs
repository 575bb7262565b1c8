//! # Inventory System
//!
//! Fixed slot inventory. The first [`HOTBAR_SIZE`] slots double as the hotbar
//! and one of them is always selected.
//!
//! All slots are allocated at creation; adding and removing never grows it.

use crate::error::{EconomyError, EconomyResult};
use crate::material::Material;

/// Slots in the hotbar.
pub const HOTBAR_SIZE: usize = 9;

/// Default slot count.
pub const DEFAULT_INVENTORY_SLOTS: usize = 36;

/// Largest supported slot count.
pub const MAX_INVENTORY_SLOTS: usize = 64;

/// A stack of one material in a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ItemStack {
    /// What is in the slot.
    pub material: Material,
    /// How many.
    pub count: u32,
}

impl ItemStack {
    /// Creates a new item stack.
    #[inline]
    #[must_use]
    pub const fn new(material: Material, count: u32) -> Self {
        Self { material, count }
    }
}

/// A slot inventory with a hotbar.
#[derive(Clone, Debug)]
pub struct Inventory {
    slots: Vec<Option<ItemStack>>,
    /// Number of slots currently in use.
    used_slots: u32,
    selected: usize,
}

impl Inventory {
    /// Creates an empty inventory with the default slot count.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_INVENTORY_SLOTS)
    }

    /// Creates an empty inventory. The slot count is clamped to
    /// `HOTBAR_SIZE..=MAX_INVENTORY_SLOTS`.
    #[must_use]
    pub fn with_capacity(slots: usize) -> Self {
        Self {
            slots: vec![None; slots.clamp(HOTBAR_SIZE, MAX_INVENTORY_SLOTS)],
            used_slots: 0,
            selected: 0,
        }
    }

    /// Returns the number of used slots.
    #[inline]
    #[must_use]
    pub const fn used_slots(&self) -> u32 {
        self.used_slots
    }

    /// Returns the total capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Checks if every slot is in use.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.used_slots as usize >= self.slots.len()
    }

    /// Gets the stack at a specific slot.
    #[inline]
    #[must_use]
    pub fn get(&self, slot: usize) -> Option<&ItemStack> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// All occupied slots with their indices.
    pub fn stacks(&self) -> impl Iterator<Item = (usize, &ItemStack)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (i, s)))
    }

    /// Counts a material across all slots.
    #[must_use]
    pub fn count(&self, material: Material) -> u32 {
        self.stacks()
            .filter(|(_, s)| s.material == material)
            .map(|(_, s)| s.count)
            .sum()
    }

    /// Whether at least `count` of `material` are held.
    #[must_use]
    pub fn contains(&self, material: Material, count: u32) -> bool {
        self.count(material) >= count
    }

    /// Finds the first slot holding a material.
    #[must_use]
    pub fn find(&self, material: Material) -> Option<usize> {
        self.stacks().find(|(_, s)| s.material == material).map(|(i, _)| i)
    }

    /// How many more of `material` fit.
    #[must_use]
    pub fn space_for(&self, material: Material) -> u32 {
        let max = material.max_stack();
        self.slots
            .iter()
            .map(|slot| match slot {
                None => max,
                Some(s) if s.material == material => max.saturating_sub(s.count),
                Some(_) => 0,
            })
            .sum()
    }

    /// Adds items, topping up existing stacks before using empty slots.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InventoryFull` if they do not all fit, in
    /// which case nothing is added.
    pub fn add(&mut self, material: Material, count: u32) -> EconomyResult<()> {
        if self.space_for(material) < count {
            return Err(EconomyError::InventoryFull {
                capacity: self.slots.len() as u32,
                amount: count,
            });
        }

        let max_stack = material.max_stack();
        let mut remaining = count;

        // First, top up existing stacks
        for stack in self.slots.iter_mut().flatten() {
            if remaining == 0 {
                break;
            }
            if stack.material == material && stack.count < max_stack {
                let can_add = (max_stack - stack.count).min(remaining);
                stack.count += can_add;
                remaining -= can_add;
            }
        }

        // Then, use empty slots
        for slot in &mut self.slots {
            if remaining == 0 {
                break;
            }
            if slot.is_none() {
                let add_count = remaining.min(max_stack);
                *slot = Some(ItemStack::new(material, add_count));
                self.used_slots += 1;
                remaining -= add_count;
            }
        }

        Ok(())
    }

    /// Removes items, taking from the last slots first so the hotbar keeps
    /// its stacks as long as possible.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InsufficientMaterials` if not enough items.
    pub fn remove(&mut self, material: Material, count: u32) -> EconomyResult<()> {
        let available = self.count(material);
        if available < count {
            return Err(EconomyError::InsufficientMaterials {
                material,
                required: count,
                available,
            });
        }

        let mut remaining = count;
        for slot in self.slots.iter_mut().rev() {
            if remaining == 0 {
                break;
            }
            if let Some(stack) = slot {
                if stack.material == material {
                    let remove_count = stack.count.min(remaining);
                    stack.count -= remove_count;
                    remaining -= remove_count;
                    if stack.count == 0 {
                        *slot = None;
                        self.used_slots = self.used_slots.saturating_sub(1);
                    }
                }
            }
        }

        Ok(())
    }

    /// Removes every stack matching `pred` and returns what was taken.
    pub fn remove_where(&mut self, pred: impl Fn(Material) -> bool) -> Vec<ItemStack> {
        let mut taken = Vec::new();
        for slot in &mut self.slots {
            if let Some(stack) = slot.take_if(|s| pred(s.material)) {
                taken.push(stack);
                self.used_slots = self.used_slots.saturating_sub(1);
            }
        }
        taken
    }

    /// Selects a hotbar slot. Out-of-range indices wrap.
    pub fn select_hotbar(&mut self, index: usize) {
        self.selected = index % HOTBAR_SIZE;
    }

    /// Index of the selected hotbar slot.
    #[inline]
    #[must_use]
    pub const fn selected_slot(&self) -> usize {
        self.selected
    }

    /// The stack in the selected hotbar slot.
    #[must_use]
    pub fn selected(&self) -> Option<ItemStack> {
        self.get(self.selected).copied()
    }

    /// Takes one item out of the selected hotbar slot.
    pub fn take_selected(&mut self) -> Option<Material> {
        let slot = &mut self.slots[self.selected];
        let stack = slot.as_mut()?;
        let material = stack.material;
        stack.count -= 1;
        if stack.count == 0 {
            *slot = None;
            self.used_slots = self.used_slots.saturating_sub(1);
        }
        Some(material)
    }

    /// Creates a snapshot of the inventory for rollback.
    #[must_use]
    pub fn snapshot(&self) -> InventorySnapshot {
        InventorySnapshot {
            slots: self.slots.clone(),
            used_slots: self.used_slots,
        }
    }

    /// Restores inventory from a snapshot (rollback).
    pub fn restore(&mut self, snapshot: &InventorySnapshot) {
        self.slots.clone_from(&snapshot.slots);
        self.used_slots = snapshot.used_slots;
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of inventory state for transactional rollback.
#[derive(Clone, Debug)]
pub struct InventorySnapshot {
    slots: Vec<Option<ItemStack>>,
    used_slots: u32,
}
