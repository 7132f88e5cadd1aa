//! Tile-code constants for Keen 1 (Invasion of the Vorticons) maps.
//!
//! Tile codes are opaque 16-bit values; the numeric sub-ranges below carve
//! them into the categories the randomiser cares about. The boundaries are
//! exact values from the game's tileset and must not be approximated.

use std::ops::RangeInclusive;

/// Plain background tile. Doubles as the item-pool filler and as the free
/// space required below an exit sign before an item can go there.
pub const T_GREY_SKY: u16 = 143;

pub const T_EXIT_SIGN_1: u16 = 167;
pub const T_EXIT_SIGN_2: u16 = 168;

pub const T_POGO_STICK: u16 = 176;
pub const T_JOYSTICK: u16 = 221;
pub const T_BATTERY: u16 = 237;
pub const T_VACUUM: u16 = 241;
pub const T_EVERCLEAR: u16 = 245;

pub const EXIT_SIGNS: RangeInclusive<u16> = T_EXIT_SIGN_1..=T_EXIT_SIGN_2;

/// The joystick pickup exists at four mounting heights.
pub const JOYSTICK_VARIANTS: RangeInclusive<u16> = T_JOYSTICK..=T_JOYSTICK + 3;

/// Battery, vacuum and everclear pickups plus their height variants sit in
/// one contiguous block.
pub const BATTERY_TO_EVERCLEAR: RangeInclusive<u16> = T_BATTERY..=T_EVERCLEAR + 3;

/// The five lolly (consumable) tiles, one per flavour.
pub const LOLLIES: RangeInclusive<u16> = T_LOLLY_BASE..=T_LOLLY_BASE + LOLLY_KINDS as u16 - 1;
pub const T_LOLLY_BASE: u16 = 201;
pub const LOLLY_KINDS: usize = 5;

/// Keys come in four colours at consecutive codes.
pub const KEYS: RangeInclusive<u16> = T_KEY_BASE..=T_KEY_BASE + 3;
pub const T_KEY_BASE: u16 = 190;

/// Doors are split across two ranges: the colour-0 door occupies its own
/// two-tile (top/bottom) range, colours 1..=3 share a six-tile range.
pub const DOORS_PLAIN: RangeInclusive<u16> = T_DOOR_PLAIN_TOP..=T_DOOR_PLAIN_TOP + 1;
pub const DOORS_COLOURED: RangeInclusive<u16> = T_DOOR_COLOURED_TOP..=T_DOOR_COLOURED_TOP + 5;
pub const T_DOOR_PLAIN_TOP: u16 = 173;
pub const T_DOOR_COLOURED_TOP: u16 = 195;

pub const SOLID_BLOCKS: RangeInclusive<u16> = T_SOLID_BLOCK_BASE..=T_SOLID_BLOCK_BASE + 3;
pub const T_SOLID_BLOCK_BASE: u16 = 331;

pub const JUMP_THRU_BLOCKS: RangeInclusive<u16> = T_JUMP_THRU_BASE..=T_JUMP_THRU_BASE + 3;
pub const T_JUMP_THRU_BASE: u16 = 178;

/// Enemy spawn codes on the sprite plane.
pub const ENEMY_SPRITES: RangeInclusive<u16> = 1..=ENEMY_KINDS as u16;
pub const ENEMY_KINDS: usize = 5;

/// Height in tiles of each enemy type, indexed by sprite code minus one.
/// A replacement taller than the original must be lifted by the difference
/// so it does not spawn embedded in the floor.
pub const ENEMY_TILE_HEIGHTS: [usize; ENEMY_KINDS] = [2, 2, 3, 1, 2];

/// World-map level-entry markers keep their target level number in the low
/// seven bits; everything above is engine flags and must survive a shuffle.
pub const LEVEL_NUMBER_MASK: u16 = 0x7F;
pub const LEVEL_COUNT: usize = 16;

/// The jump-through block art is not stored in the solid-block colour order.
/// `JUMP_THRU_ORDER` maps a colour index to the stored tile offset and
/// `JUMP_THRU_ORDER_INVERSE` maps back; they are fixed lookup tables, not a
/// rotation that could be computed.
pub(crate) const JUMP_THRU_ORDER: [u16; 4] = [1, 3, 0, 2];
pub(crate) const JUMP_THRU_ORDER_INVERSE: [u16; 4] = [2, 0, 3, 1];

/// Special-item slots each level declares, in level order 1..=16. Level 16
/// declares fewer slots than it has qualifying positions so the pogo stick
/// the game needs to finish that level stays put.
pub(crate) const SLOTS_PER_LEVEL: [usize; LEVEL_COUNT] =
    [1, 1, 2, 2, 2, 1, 1, 2, 1, 1, 1, 1, 1, 1, 1, 1];

/// The five one-of-a-kind pickups distributed across the slot pool.
pub(crate) const SPECIAL_ITEMS: [u16; 5] =
    [T_POGO_STICK, T_JOYSTICK, T_BATTERY, T_EVERCLEAR, T_VACUUM];

/// Canonical level names, indexed by level number minus one.
pub const LEVEL_NAMES: [&str; LEVEL_COUNT] = [
    "Border Town",
    "1st Red Rock Shrine",
    "Treasury",
    "Capital City",
    "Pogo Shrine",
    "2nd Red Rock Shrine",
    "Emerald City",
    "Ice City",
    "3rd Red Rock Shrine",
    "1st Ice Shrine",
    "4th Red Rock Shrine",
    "5th Red Rock Shrine",
    "Red Maze City",
    "Secret City",
    "2nd Ice Shrine",
    "Commander's Castle",
];

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TileCategory {
    GreySky,
    ExitSign,
    PogoStick,
    JumpThroughBlock,
    Key,
    Door,
    Lolly,
    JoystickItem,
    ShipItem,
    SolidBlock,
}

/// Every terrain-plane range the randomiser touches, as one closed table so
/// the boundaries can be checked against each other up front instead of
/// being scattered through the passes.
pub(crate) const TERRAIN_CATEGORIES: &[(TileCategory, RangeInclusive<u16>)] = &[
    (TileCategory::GreySky, T_GREY_SKY..=T_GREY_SKY),
    (TileCategory::ExitSign, EXIT_SIGNS),
    (TileCategory::Door, DOORS_PLAIN),
    (TileCategory::PogoStick, T_POGO_STICK..=T_POGO_STICK),
    (TileCategory::JumpThroughBlock, JUMP_THRU_BLOCKS),
    (TileCategory::Key, KEYS),
    (TileCategory::Door, DOORS_COLOURED),
    (TileCategory::Lolly, LOLLIES),
    (TileCategory::JoystickItem, JOYSTICK_VARIANTS),
    (TileCategory::ShipItem, BATTERY_TO_EVERCLEAR),
    (TileCategory::SolidBlock, SOLID_BLOCKS),
];

pub fn category(tile: u16) -> Option<TileCategory> {
    TERRAIN_CATEGORIES
        .iter()
        .find(|(_, range)| range.contains(&tile))
        .map(|(cat, _)| *cat)
}

/// Checks the category table is well formed: every range ordered and no two
/// ranges overlapping. Run once per randomiser run, before any map is read.
pub(crate) fn validate_categories() -> Result<(), String> {
    for (cat, range) in TERRAIN_CATEGORIES {
        if range.start() > range.end() {
            return Err(format!("empty tile range for {:?}", cat));
        }
    }
    for (i, (cat_a, a)) in TERRAIN_CATEGORIES.iter().enumerate() {
        for (cat_b, b) in &TERRAIN_CATEGORIES[i + 1..] {
            if a.start() <= b.end() && b.start() <= a.end() {
                return Err(format!(
                    "tile ranges for {:?} and {:?} overlap",
                    cat_a, cat_b
                ));
            }
        }
    }
    Ok(())
}

/// A tile that can host (or, for exit signs, sit above) a special item.
pub(crate) fn is_special_slot_tile(tile: u16) -> bool {
    matches!(
        category(tile),
        Some(
            TileCategory::PogoStick
                | TileCategory::JoystickItem
                | TileCategory::ShipItem
                | TileCategory::ExitSign
        )
    )
}
