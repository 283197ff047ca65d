//! Item definitions module
//!
//! This module contains item stacks and item definitions used for:
//! - Parsing and formatting item strings (`name count wear metadata`)
//! - Stack limits when adding to inventories
//! - Tool capabilities of wielded items
//! - Creative inventory listing

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::InventoryError;
use crate::game::tool::{itemgroup_get, ItemGroupList, ToolCapabilities};

/// Default maximum stack size
pub const DEFAULT_STACK_MAX: u16 = 99;

/// Largest wear value; a tool at this wear breaks
pub const MAX_WEAR: u16 = 65535;

static ITEM_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^:?[a-zA-Z0-9_]+:[a-zA-Z0-9_]+$|^[a-zA-Z0-9_]+$").expect("valid item name regex")
});

/// Check that a name is `modname:itemname` (or a bare builtin name)
pub fn is_valid_item_name(name: &str) -> bool {
    ITEM_NAME.is_match(name)
}

/// Kind of item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    #[default]
    None,
    Node,
    Craft,
    Tool,
}

/// Item definition containing the properties of an item type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDefinition {
    /// Item name (`modname:itemname`)
    pub name: String,
    /// Item type
    #[serde(default)]
    pub item_type: ItemType,
    /// Human readable description
    #[serde(default)]
    pub description: String,
    /// Inventory image texture
    #[serde(default)]
    pub inventory_image: String,
    /// Maximum stack size
    #[serde(default = "default_stack_max")]
    pub stack_max: u16,
    /// Item groups
    #[serde(default)]
    pub groups: ItemGroupList,
    /// Tool capabilities when wielded
    #[serde(default)]
    pub tool_capabilities: Option<ToolCapabilities>,
}

fn default_stack_max() -> u16 {
    DEFAULT_STACK_MAX
}

impl ItemDefinition {
    /// Create a new item definition
    pub fn new(name: &str, item_type: ItemType) -> Self {
        let stack_max = if item_type == ItemType::Tool {
            1
        } else {
            DEFAULT_STACK_MAX
        };
        Self {
            name: name.to_string(),
            item_type,
            description: String::new(),
            inventory_image: String::new(),
            stack_max,
            groups: ItemGroupList::new(),
            tool_capabilities: None,
        }
    }

    /// Set the description
    pub fn description(mut self, desc: &str) -> Self {
        self.description = desc.to_string();
        self
    }

    /// Set the inventory image
    pub fn inventory_image(mut self, image: &str) -> Self {
        self.inventory_image = image.to_string();
        self
    }

    /// Set the stack limit
    pub fn stack_max(mut self, stack_max: u16) -> Self {
        self.stack_max = stack_max.max(1);
        self
    }

    /// Add a group rating
    pub fn group(mut self, name: &str, rating: i32) -> Self {
        self.groups.insert(name.to_string(), rating);
        self
    }

    /// Set the tool capabilities
    pub fn tool_capabilities(mut self, caps: ToolCapabilities) -> Self {
        self.tool_capabilities = Some(caps);
        self
    }

    /// Whether this item shows up in the creative inventory
    pub fn in_creative_inventory(&self) -> bool {
        itemgroup_get(&self.groups, "not_in_creative_inventory") == 0
    }
}

/// Item definition registry
#[derive(Debug, Clone)]
pub struct ItemDefManager {
    items: BTreeMap<String, ItemDefinition>,
    hand: ToolCapabilities,
}

impl ItemDefManager {
    /// Create an empty registry with bare-hand tool capabilities
    pub fn new() -> Self {
        Self {
            items: BTreeMap::new(),
            hand: ToolCapabilities::hand(),
        }
    }

    /// Create a registry with a handful of basic items
    pub fn with_basic_items() -> Self {
        let mut defs = Self::new();
        defs.register(
            ItemDefinition::new("default:dirt", ItemType::Node)
                .description("Dirt")
                .inventory_image("default_dirt.png")
                .group("crumbly", 3),
        );
        defs.register(
            ItemDefinition::new("default:stone", ItemType::Node)
                .description("Stone")
                .inventory_image("default_stone.png")
                .group("cracky", 3),
        );
        defs.register(
            ItemDefinition::new("default:apple", ItemType::Craft)
                .description("Apple")
                .inventory_image("default_apple.png")
                .group("food", 2),
        );
        defs.register(
            ItemDefinition::new("default:sword_steel", ItemType::Tool)
                .description("Steel Sword")
                .inventory_image("default_tool_steelsword.png")
                .tool_capabilities(
                    ToolCapabilities {
                        full_punch_interval: 1.0,
                        max_drop_level: 1,
                        ..Default::default()
                    }
                    .with_groupcap(
                        "fleshy",
                        crate::game::tool::ToolGroupCap::new([(2, 0.8), (3, 0.4)], 40, 1),
                    ),
                ),
        );
        defs.register(
            ItemDefinition::new("default:water_source", ItemType::Node)
                .description("Water")
                .group("liquid", 3)
                .group("not_in_creative_inventory", 1),
        );
        defs
    }

    /// Register (or replace) an item definition
    pub fn register(&mut self, def: ItemDefinition) {
        self.items.insert(def.name.clone(), def);
    }

    /// Get a definition by name
    pub fn get(&self, name: &str) -> Option<&ItemDefinition> {
        self.items.get(name)
    }

    /// Check if an item is registered
    pub fn exists(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    /// Stack limit for an item (unknown items use the default)
    pub fn stack_max(&self, name: &str) -> u16 {
        self.get(name).map(|d| d.stack_max).unwrap_or(DEFAULT_STACK_MAX)
    }

    /// Tool capabilities of a stack, falling back to the bare hand
    pub fn tool_capabilities(&self, stack: &ItemStack) -> &ToolCapabilities {
        if stack.is_empty() {
            return &self.hand;
        }
        self.get(&stack.name)
            .and_then(|d| d.tool_capabilities.as_ref())
            .unwrap_or(&self.hand)
    }

    /// Inventory image of an item, or the unknown-item texture
    pub fn inventory_image(&self, name: &str) -> &str {
        self.get(name)
            .map(|d| d.inventory_image.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("unknown_item.png")
    }

    /// All definitions, ordered by name
    pub fn iter(&self) -> impl Iterator<Item = &ItemDefinition> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for ItemDefManager {
    fn default() -> Self {
        Self::new()
    }
}

/// A stack of items
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    /// Item name (empty for an empty stack)
    pub name: String,
    /// Number of items
    pub count: u16,
    /// Tool wear (0-65535)
    pub wear: u16,
    /// Free-form metadata
    pub metadata: String,
}

impl ItemStack {
    /// Create a new stack
    pub fn new(name: &str, count: u16) -> Self {
        if name.is_empty() || count == 0 {
            return Self::empty();
        }
        Self {
            name: name.to_string(),
            count,
            wear: 0,
            metadata: String::new(),
        }
    }

    /// Create an empty stack
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse an item string: `name [count [wear [metadata]]]`
    pub fn parse(itemstring: &str) -> std::result::Result<Self, InventoryError> {
        let trimmed = itemstring.trim();
        if trimmed.is_empty() {
            return Ok(Self::empty());
        }

        let mut parts = trimmed.splitn(4, ' ');
        let name = parts.next().unwrap_or_default();
        if !is_valid_item_name(name) {
            return Err(InventoryError::InvalidItemString(itemstring.to_string()));
        }
        let name = name.trim_start_matches(':');

        let count = match parts.next() {
            Some(s) => s
                .parse::<u16>()
                .map_err(|_| InventoryError::InvalidItemString(itemstring.to_string()))?,
            None => 1,
        };
        let wear = match parts.next() {
            Some(s) => s
                .parse::<u16>()
                .map_err(|_| InventoryError::InvalidItemString(itemstring.to_string()))?,
            None => 0,
        };
        let metadata = parts.next().unwrap_or_default().to_string();

        let mut stack = Self::new(name, count);
        if !stack.is_empty() {
            stack.wear = wear;
            stack.metadata = metadata;
        }
        Ok(stack)
    }

    /// Check if this stack is empty
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() || self.count == 0
    }

    /// Clear the stack
    pub fn clear(&mut self) {
        *self = Self::empty();
    }

    /// Whether another stack can merge into this one
    pub fn can_merge(&self, other: &ItemStack) -> bool {
        self.is_empty()
            || (self.name == other.name && self.wear == other.wear && self.metadata == other.metadata)
    }

    /// Merge as much of `other` as fits under `stack_max`; returns the leftover
    pub fn add_item(&mut self, other: ItemStack, stack_max: u16) -> ItemStack {
        if other.is_empty() {
            return ItemStack::empty();
        }
        if !self.can_merge(&other) {
            return other;
        }
        if self.is_empty() {
            let fit = other.count.min(stack_max.max(1));
            let mut leftover = other.clone();
            *self = other;
            self.count = fit;
            leftover.count -= fit;
            return if leftover.count == 0 {
                ItemStack::empty()
            } else {
                leftover
            };
        }

        let room = stack_max.saturating_sub(self.count);
        let fit = other.count.min(room);
        self.count += fit;
        let mut leftover = other;
        leftover.count -= fit;
        if leftover.count == 0 {
            ItemStack::empty()
        } else {
            leftover
        }
    }

    /// Take up to `count` items off the stack
    pub fn take_item(&mut self, count: u16) -> ItemStack {
        if self.is_empty() || count == 0 {
            return ItemStack::empty();
        }
        let taken = count.min(self.count);
        let mut result = self.clone();
        result.count = taken;
        self.count -= taken;
        if self.count == 0 {
            self.clear();
        }
        result
    }

    /// Add tool wear; a worn-out tool disappears. Returns false when that happens.
    pub fn add_wear(&mut self, amount: u16) -> bool {
        if self.is_empty() {
            return false;
        }
        if u32::from(self.wear) + u32::from(amount) >= u32::from(MAX_WEAR) {
            self.clear();
            return false;
        }
        self.wear += amount;
        true
    }
}

impl fmt::Display for ItemStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        write!(f, "{}", self.name)?;
        if self.count != 1 || self.wear != 0 || !self.metadata.is_empty() {
            write!(f, " {}", self.count)?;
        }
        if self.wear != 0 || !self.metadata.is_empty() {
            write!(f, " {}", self.wear)?;
        }
        if !self.metadata.is_empty() {
            write!(f, " {}", self.metadata)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_name_validation() {
        assert!(is_valid_item_name("default:dirt"));
        assert!(is_valid_item_name(":default:dirt"));
        assert!(is_valid_item_name("unknown"));
        assert!(!is_valid_item_name("default:"));
        assert!(!is_valid_item_name("a b"));
    }

    #[test]
    fn test_add_wear() {
        let mut sword = ItemStack::new("default:sword_steel", 1);
        assert!(sword.add_wear(60000));
        assert_eq!(sword.wear, 60000);
        assert!(!sword.add_wear(5535));
        assert!(sword.is_empty());
    }

    #[test]
    fn test_parse_item_string() {
        let stack = ItemStack::parse("default:dirt 5").unwrap();
        assert_eq!(stack.name, "default:dirt");
        assert_eq!(stack.count, 5);
        assert_eq!(stack.wear, 0);

        let stack = ItemStack::parse("default:sword_steel 1 1200 engraved").unwrap();
        assert_eq!(stack.wear, 1200);
        assert_eq!(stack.metadata, "engraved");

        assert!(ItemStack::parse("").unwrap().is_empty());
        assert!(ItemStack::parse("default:dirt lots").is_err());
    }

    #[test]
    fn test_item_string_format() {
        assert_eq!(ItemStack::new("default:dirt", 1).to_string(), "default:dirt");
        assert_eq!(ItemStack::new("default:dirt", 7).to_string(), "default:dirt 7");
        let mut tool = ItemStack::new("default:sword_steel", 1);
        tool.wear = 300;
        assert_eq!(tool.to_string(), "default:sword_steel 1 300");
        assert_eq!(ItemStack::empty().to_string(), "");
    }

    #[test]
    fn test_add_item_respects_stack_max() {
        let mut stack = ItemStack::new("default:dirt", 90);
        let leftover = stack.add_item(ItemStack::new("default:dirt", 20), 99);
        assert_eq!(stack.count, 99);
        assert_eq!(leftover.count, 11);

        let leftover = stack.add_item(ItemStack::new("default:stone", 1), 99);
        assert_eq!(leftover, ItemStack::new("default:stone", 1));
    }

    #[test]
    fn test_take_item() {
        let mut stack = ItemStack::new("default:apple", 3);
        let taken = stack.take_item(2);
        assert_eq!(taken.count, 2);
        assert_eq!(stack.count, 1);
        let taken = stack.take_item(5);
        assert_eq!(taken.count, 1);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_item_def_manager() {
        let defs = ItemDefManager::with_basic_items();
        assert!(defs.exists("default:dirt"));
        assert_eq!(defs.stack_max("default:sword_steel"), 1);
        assert_eq!(defs.stack_max("nothing:here"), DEFAULT_STACK_MAX);
        assert_eq!(defs.inventory_image("nothing:here"), "unknown_item.png");

        let hand = defs.tool_capabilities(&ItemStack::empty());
        assert!(hand.groupcaps.contains_key("fleshy"));
        let sword = defs.tool_capabilities(&ItemStack::new("default:sword_steel", 1));
        assert_eq!(sword.full_punch_interval, 1.0);

        let creative: Vec<_> = defs.iter().filter(|d| d.in_creative_inventory()).collect();
        assert_eq!(creative.len(), 4);
    }
}
