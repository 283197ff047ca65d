//! Inventory module
//!
//! This module handles inventory storage and operations:
//! - Named inventory lists ("main", "craft", ...)
//! - Add and remove operations with stacking by `stack_max`
//! - Slot management (swap, take, clear)
//! - Inventory locations used to address an inventory

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::InventoryError;
use crate::game::item::{ItemDefManager, ItemStack};
use crate::game::math::V3s16;

/// Size of the player's main list (8 x 4)
pub const PLAYER_INVENTORY_SIZE: usize = 32;

/// Width of the player's main list
pub const PLAYER_INVENTORY_WIDTH: usize = 8;

/// Size of the crafting grid (3 x 3)
pub const CRAFT_GRID_SIZE: usize = 9;

/// A named list of item stacks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryList {
    name: String,
    width: usize,
    items: Vec<ItemStack>,
}

impl InventoryList {
    /// Create a new empty list
    pub fn new(name: &str, size: usize) -> Self {
        Self {
            name: name.to_string(),
            width: 0,
            items: vec![ItemStack::empty(); size],
        }
    }

    /// Set the display width
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of slots
    pub fn size(&self) -> usize {
        self.items.len()
    }

    /// Number of occupied slots
    pub fn used_slots(&self) -> usize {
        self.items.iter().filter(|s| !s.is_empty()).count()
    }

    /// Number of free slots
    pub fn free_slots(&self) -> usize {
        self.size() - self.used_slots()
    }

    pub fn is_empty(&self) -> bool {
        self.used_slots() == 0
    }

    /// Get the stack at a slot
    pub fn get(&self, slot: usize) -> Option<&ItemStack> {
        self.items.get(slot)
    }

    /// Replace the stack at a slot, returning the previous one
    pub fn set(&mut self, slot: usize, stack: ItemStack) -> Result<ItemStack, InventoryError> {
        let item = self
            .items
            .get_mut(slot)
            .ok_or(InventoryError::InvalidSlot(slot))?;
        Ok(std::mem::replace(item, stack))
    }

    /// Total count of an item across all slots
    pub fn count_item(&self, name: &str) -> u32 {
        self.items
            .iter()
            .filter(|s| s.name == name)
            .map(|s| s.count as u32)
            .sum()
    }

    /// Check if the list holds at least `count` of an item
    pub fn contains(&self, name: &str, count: u32) -> bool {
        self.count_item(name) >= count
    }

    /// Add a stack, first merging into existing stacks then filling empty slots
    ///
    /// Returns the leftover that did not fit (empty when everything fit).
    pub fn add_item(&mut self, stack: ItemStack, defs: &ItemDefManager) -> ItemStack {
        if stack.is_empty() {
            return ItemStack::empty();
        }
        let stack_max = defs.stack_max(&stack.name);
        let mut leftover = stack;

        for item in self.items.iter_mut().filter(|s| !s.is_empty()) {
            leftover = item.add_item(leftover, stack_max);
            if leftover.is_empty() {
                return leftover;
            }
        }

        for item in self.items.iter_mut().filter(|s| s.is_empty()) {
            leftover = item.add_item(leftover, stack_max);
            if leftover.is_empty() {
                return leftover;
            }
        }

        leftover
    }

    /// Check whether a whole stack fits
    pub fn room_for_item(&self, stack: &ItemStack, defs: &ItemDefManager) -> bool {
        let mut copy = self.clone();
        copy.add_item(stack.clone(), defs).is_empty()
    }

    /// Take up to `count` items from a slot
    pub fn take_item(&mut self, slot: usize, count: u16) -> Result<ItemStack, InventoryError> {
        let item = self
            .items
            .get_mut(slot)
            .ok_or(InventoryError::InvalidSlot(slot))?;
        Ok(item.take_item(count))
    }

    /// Remove up to `count` of an item by name from any slots; returns the amount removed
    pub fn remove_item(&mut self, name: &str, mut count: u32) -> u32 {
        let mut removed = 0u32;
        for item in self.items.iter_mut() {
            if count == 0 {
                break;
            }
            if item.name != name {
                continue;
            }
            let taken = item.take_item(count.min(u16::MAX as u32) as u16).count as u32;
            count -= taken;
            removed += taken;
        }
        removed
    }

    /// Swap two slots
    pub fn swap(&mut self, slot1: usize, slot2: usize) -> Result<(), InventoryError> {
        let size = self.size();
        if slot1 >= size {
            return Err(InventoryError::InvalidSlot(slot1));
        }
        if slot2 >= size {
            return Err(InventoryError::InvalidSlot(slot2));
        }
        self.items.swap(slot1, slot2);
        Ok(())
    }

    /// Clear every slot
    pub fn clear(&mut self) {
        for item in self.items.iter_mut() {
            item.clear();
        }
    }

    /// Stacks as a slice
    pub fn items(&self) -> &[ItemStack] {
        &self.items
    }
}

/// A set of named inventory lists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    lists: Vec<InventoryList>,
}

impl Inventory {
    /// Create an inventory with no lists
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the standard player inventory
    pub fn player() -> Self {
        let mut inv = Self::new();
        inv.add_list(InventoryList::new("main", PLAYER_INVENTORY_SIZE).with_width(PLAYER_INVENTORY_WIDTH));
        inv.add_list(InventoryList::new("craft", CRAFT_GRID_SIZE).with_width(3));
        inv.add_list(InventoryList::new("craftpreview", 1));
        inv.add_list(InventoryList::new("craftresult", 1));
        inv
    }

    /// Add (or replace) a list
    pub fn add_list(&mut self, list: InventoryList) {
        match self.lists.iter_mut().find(|l| l.name == list.name) {
            Some(existing) => *existing = list,
            None => self.lists.push(list),
        }
    }

    /// Get a list by name
    pub fn list(&self, name: &str) -> Option<&InventoryList> {
        self.lists.iter().find(|l| l.name == name)
    }

    /// Get a mutable list by name
    pub fn list_mut(&mut self, name: &str) -> Option<&mut InventoryList> {
        self.lists.iter_mut().find(|l| l.name == name)
    }

    /// Get a mutable list by name, or an error naming the missing list
    pub fn require_list_mut(&mut self, name: &str) -> Result<&mut InventoryList, InventoryError> {
        self.list_mut(name)
            .ok_or_else(|| InventoryError::ListNotFound(name.to_string()))
    }

    /// Names of all lists
    pub fn list_names(&self) -> Vec<&str> {
        self.lists.iter().map(|l| l.name.as_str()).collect()
    }

    /// Add a stack to a named list; returns the leftover
    pub fn add_item(
        &mut self,
        list: &str,
        stack: ItemStack,
        defs: &ItemDefManager,
    ) -> Result<ItemStack, InventoryError> {
        Ok(self.require_list_mut(list)?.add_item(stack, defs))
    }
}

/// Address of an inventory
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InventoryLocation {
    #[default]
    Undefined,
    CurrentPlayer,
    Player(String),
    NodeMeta(V3s16),
    Detached(String),
}

impl fmt::Display for InventoryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InventoryLocation::Undefined => write!(f, "undefined"),
            InventoryLocation::CurrentPlayer => write!(f, "current_player"),
            InventoryLocation::Player(name) => write!(f, "player:{}", name),
            InventoryLocation::NodeMeta(p) => write!(f, "nodemeta:{},{},{}", p.x, p.y, p.z),
            InventoryLocation::Detached(name) => write!(f, "detached:{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defs() -> ItemDefManager {
        ItemDefManager::with_basic_items()
    }

    #[test]
    fn test_list_creation() {
        let list = InventoryList::new("main", 32);
        assert_eq!(list.size(), 32);
        assert_eq!(list.free_slots(), 32);
        assert!(list.is_empty());
    }

    #[test]
    fn test_add_stacks_before_filling_empty_slots() {
        let defs = defs();
        let mut list = InventoryList::new("main", 4);
        list.set(2, ItemStack::new("default:dirt", 50)).unwrap();

        let leftover = list.add_item(ItemStack::new("default:dirt", 60), &defs);
        assert!(leftover.is_empty());
        assert_eq!(list.get(2).unwrap().count, 99);
        assert_eq!(list.get(0).unwrap().count, 11);
        assert_eq!(list.count_item("default:dirt"), 110);
    }

    #[test]
    fn test_add_non_stacking_tools() {
        let defs = defs();
        let mut list = InventoryList::new("main", 2);
        let leftover = list.add_item(ItemStack::new("default:sword_steel", 3), &defs);
        assert_eq!(leftover.count, 1);
        assert_eq!(list.used_slots(), 2);
        assert!(!list.room_for_item(&ItemStack::new("default:sword_steel", 1), &defs));
    }

    #[test]
    fn test_remove_item() {
        let defs = defs();
        let mut list = InventoryList::new("main", 4);
        list.add_item(ItemStack::new("default:apple", 150), &defs);
        assert_eq!(list.remove_item("default:apple", 120), 120);
        assert_eq!(list.count_item("default:apple"), 30);
        assert_eq!(list.remove_item("default:apple", 100), 30);
        assert!(list.is_empty());
    }

    #[test]
    fn test_invalid_slot() {
        let mut list = InventoryList::new("main", 2);
        assert_eq!(
            list.set(5, ItemStack::new("default:dirt", 1)),
            Err(InventoryError::InvalidSlot(5))
        );
        assert_eq!(list.swap(0, 3), Err(InventoryError::InvalidSlot(3)));
    }

    #[test]
    fn test_player_inventory() {
        let defs = defs();
        let mut inv = Inventory::player();
        assert_eq!(inv.list_names(), vec!["main", "craft", "craftpreview", "craftresult"]);
        assert_eq!(inv.list("main").unwrap().width(), PLAYER_INVENTORY_WIDTH);

        let leftover = inv
            .add_item("main", ItemStack::new("default:stone", 5), &defs)
            .unwrap();
        assert!(leftover.is_empty());
        assert!(matches!(
            inv.add_item("bag", ItemStack::new("default:stone", 5), &defs),
            Err(InventoryError::ListNotFound(_))
        ));
    }

    #[test]
    fn test_inventory_location_display() {
        assert_eq!(
            InventoryLocation::Player("celeron".to_string()).to_string(),
            "player:celeron"
        );
        assert_eq!(
            InventoryLocation::NodeMeta(V3s16::new(1, -2, 3)).to_string(),
            "nodemeta:1,-2,3"
        );
    }
}
