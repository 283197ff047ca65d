//! Item groups and tool capabilities
//!
//! Armor groups and item groups are name -> rating maps. Tool capabilities
//! describe how fast a tool digs (or hits) things of a given group rating,
//! and punch damage is derived from the same numbers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Group name -> rating
pub type ItemGroupList = BTreeMap<String, i32>;

/// Rating of a group, zero when absent
pub fn itemgroup_get(groups: &ItemGroupList, name: &str) -> i32 {
    groups.get(name).copied().unwrap_or(0)
}

/// Capabilities of a tool against one group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolGroupCap {
    /// Rating -> time in seconds
    pub times: BTreeMap<i32, f32>,
    /// Uses until the tool wears out (0 = never)
    pub uses: i32,
    /// Highest "level" group rating this cap can handle
    pub maxlevel: i32,
}

impl ToolGroupCap {
    pub fn new(times: impl IntoIterator<Item = (i32, f32)>, uses: i32, maxlevel: i32) -> Self {
        Self {
            times: times.into_iter().collect(),
            uses,
            maxlevel,
        }
    }

    /// Time for a rating, if the rating is covered
    pub fn time(&self, rating: i32) -> Option<f32> {
        self.times.get(&rating).copied()
    }
}

/// Tool capabilities of a wielded item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCapabilities {
    pub full_punch_interval: f32,
    pub max_drop_level: i32,
    pub groupcaps: BTreeMap<String, ToolGroupCap>,
}

impl Default for ToolCapabilities {
    fn default() -> Self {
        Self {
            full_punch_interval: 1.4,
            max_drop_level: 1,
            groupcaps: BTreeMap::new(),
        }
    }
}

impl ToolCapabilities {
    /// Bare hand: slow hits against flesh and crumbly material
    pub fn hand() -> Self {
        let mut caps = Self {
            full_punch_interval: 0.9,
            max_drop_level: 0,
            groupcaps: BTreeMap::new(),
        };
        caps.groupcaps.insert(
            "fleshy".to_string(),
            ToolGroupCap::new([(2, 2.0), (3, 1.0)], 0, 1),
        );
        caps.groupcaps.insert(
            "crumbly".to_string(),
            ToolGroupCap::new([(2, 3.0), (3, 0.7)], 0, 1),
        );
        caps
    }

    pub fn with_groupcap(mut self, name: impl Into<String>, cap: ToolGroupCap) -> Self {
        self.groupcaps.insert(name.into(), cap);
        self
    }
}

/// Result of matching tool capabilities against groups
#[derive(Debug, Clone, PartialEq)]
pub struct DigParams {
    pub diggable: bool,
    pub time: f32,
    pub wear: u16,
    pub main_group: String,
}

/// Pick the fastest matching group cap
pub fn dig_params(groups: &ItemGroupList, tp: &ToolCapabilities) -> DigParams {
    let mut diggable = false;
    let mut result_time = 0.0f32;
    let mut result_wear = 0.0f64;
    let mut main_group = String::new();

    let level = itemgroup_get(groups, "level");
    for (name, cap) in &tp.groupcaps {
        let rating = itemgroup_get(groups, name);
        let Some(time) = cap.time(rating) else {
            continue;
        };
        if diggable && time >= result_time {
            continue;
        }
        if cap.maxlevel < level {
            continue;
        }
        let leveldiff = cap.maxlevel - level;
        diggable = true;
        result_time = time / leveldiff.max(1) as f32;
        result_wear = if cap.uses != 0 {
            1.0 / cap.uses as f64 / 3f64.powi(leveldiff)
        } else {
            0.0
        };
        main_group = name.clone();
    }

    DigParams {
        diggable,
        time: result_time,
        wear: (65535.0 * result_wear) as u16,
        main_group,
    }
}

/// Damage and wear of one hit
#[derive(Debug, Clone, PartialEq)]
pub struct HitParams {
    pub hp: i16,
    pub wear: u16,
    pub main_group: String,
}

/// Damage is the number of "digs" that would fit into the time since the last punch
pub fn hit_params(
    groups: &ItemGroupList,
    tp: &ToolCapabilities,
    time_from_last_punch: f32,
) -> HitParams {
    let dig = dig_params(groups, tp);
    let elapsed = time_from_last_punch.min(tp.full_punch_interval);

    let hp = if dig.diggable && dig.time > 0.0 {
        (elapsed / dig.time).clamp(0.0, i16::MAX as f32) as i16
    } else if dig.diggable {
        i16::MAX
    } else {
        0
    };

    HitParams {
        hp,
        wear: dig.wear,
        main_group: dig.main_group,
    }
}

/// Outcome of a punch against armor groups
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PunchDamageResult {
    pub did_punch: bool,
    pub damage: i16,
    pub wear: u16,
    pub main_group: String,
}

/// Damage against armor groups; the `immortal` armor group blocks hits
pub fn punch_damage(
    armor_groups: &ItemGroupList,
    toolcap: Option<&ToolCapabilities>,
    time_from_last_punch: f32,
) -> PunchDamageResult {
    let Some(toolcap) = toolcap else {
        return PunchDamageResult::default();
    };
    if itemgroup_get(armor_groups, "immortal") != 0 {
        return PunchDamageResult::default();
    }

    let hit = hit_params(armor_groups, toolcap, time_from_last_punch);
    PunchDamageResult {
        did_punch: true,
        damage: hit.hp,
        wear: hit.wear,
        main_group: hit.main_group,
    }
}
