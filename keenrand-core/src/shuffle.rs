//! The randomisation passes: level-entry shuffling, enemy and lolly
//! redistribution, block/key recolouring and special-item placement.
//!
//! Every pass draws from the single run-scoped rng stream it is handed; the
//! order the orchestrator calls them in is part of the seed contract.

use log::debug;
use rand::{rngs::StdRng, Rng};

use crate::map::{Plane, TileMap};
use crate::tiles::{
    self, DOORS_COLOURED, DOORS_PLAIN, ENEMY_SPRITES, ENEMY_TILE_HEIGHTS, EXIT_SIGNS,
    JUMP_THRU_BLOCKS, JUMP_THRU_ORDER, JUMP_THRU_ORDER_INVERSE, KEYS, LEVEL_COUNT,
    LEVEL_NUMBER_MASK, LOLLIES, SOLID_BLOCKS, T_DOOR_COLOURED_TOP, T_DOOR_PLAIN_TOP, T_GREY_SKY,
    T_JUMP_THRU_BASE, T_KEY_BASE, T_LOLLY_BASE, T_SOLID_BLOCK_BASE,
};
use crate::{RandomiserError, Result};

/// In-place Fisher–Yates shuffle on the run's rng stream.
pub(crate) fn permute<T>(items: &mut [T], rng: &mut StdRng) {
    let mut i = items.len();
    while i > 1 {
        i -= 1;
        let j = rng.gen_range(0..=i);
        if i != j {
            items.swap(i, j);
        }
    }
}

/// Draws an index with probability proportional to `counts`, for sampling
/// without replacement. `total` must equal the sum of `counts` and be
/// nonzero; the caller decrements both after each draw.
fn weighted_draw(counts: &[usize], total: usize, rng: &mut StdRng) -> usize {
    let mut idx = rng.gen_range(0..total);
    let mut kind = 0usize;
    while idx >= counts[kind] {
        idx -= counts[kind];
        kind += 1;
    }
    kind
}

/// Permutes the sixteen level numbers and rewrites every entry marker on the
/// world map's sprite plane accordingly, preserving the flag bits above the
/// level number. Returns the permutation, indexed by original level minus
/// one.
pub(crate) fn shuffle_level_entries(world: &mut TileMap, rng: &mut StdRng) -> Result<[u8; 16]> {
    let mut table = [0u8; LEVEL_COUNT];
    for (i, slot) in table.iter_mut().enumerate() {
        *slot = i as u8 + 1;
    }
    permute(&mut table, rng);

    for y in 0..world.height() as usize {
        for x in 0..world.width() as usize {
            let entry = world.get(x, y, Plane::Sprites)?;
            if entry == 0 {
                continue;
            }
            let level = entry & LEVEL_NUMBER_MASK;
            if level == 0 || level > LEVEL_COUNT as u16 {
                continue;
            }
            let new_level = table[level as usize - 1] as u16;
            let new_entry = (entry & !LEVEL_NUMBER_MASK) | new_level;
            debug!(
                "level entry at ({}, {}): {} -> {} (marker {:#06x} -> {:#06x})",
                x, y, level, new_level, entry, new_entry
            );
            world.set(x, y, Plane::Sprites, new_entry)?;
        }
    }
    Ok(table)
}

/// Row the replacement enemy spawns on: lifted by the height difference when
/// it is taller than the one it replaces, unchanged otherwise. None when the
/// lift would leave the map.
fn lifted_row(y: usize, old_kind: usize, new_kind: usize) -> Option<usize> {
    let old_h = ENEMY_TILE_HEIGHTS[old_kind];
    let new_h = ENEMY_TILE_HEIGHTS[new_kind];
    if new_h > old_h {
        y.checked_sub(new_h - old_h)
    } else {
        Some(y)
    }
}

/// Redistributes the five enemy types across their spawn positions by
/// sampling without replacement, so each level keeps exactly the enemy
/// population it started with.
pub(crate) fn shuffle_enemies(map: &mut TileMap, rng: &mut StdRng) -> Result<()> {
    let mut counts = [0usize; tiles::ENEMY_KINDS];
    let mut total = 0usize;
    for &sprite in map.plane(Plane::Sprites) {
        if ENEMY_SPRITES.contains(&sprite) {
            counts[sprite as usize - 1] += 1;
            total += 1;
        }
    }
    if total == 0 {
        return Ok(());
    }

    for y in 0..map.height() as usize {
        for x in 0..map.width() as usize {
            let sprite = map.get(x, y, Plane::Sprites)?;
            if !ENEMY_SPRITES.contains(&sprite) {
                continue;
            }
            let old_kind = sprite as usize - 1;
            let new_kind = weighted_draw(&counts, total, rng);

            // A lift only ever moves the spawn to an already-scanned row,
            // so no enemy is processed twice.
            map.set(x, y, Plane::Sprites, 0)?;
            let ny = lifted_row(y, old_kind, new_kind).ok_or_else(|| {
                let lift = ENEMY_TILE_HEIGHTS[new_kind] - ENEMY_TILE_HEIGHTS[old_kind];
                RandomiserError::TileOutOfRange {
                    x: x as i64,
                    y: y as i64 - lift as i64,
                    width: map.width(),
                    height: map.height(),
                }
            })?;
            if ny != y {
                debug!(
                    "enemy {} at ({}, {}) became {} and was lifted to row {}",
                    old_kind + 1,
                    x,
                    y,
                    new_kind + 1,
                    ny
                );
            }
            map.set(x, ny, Plane::Sprites, new_kind as u16 + 1)?;
            counts[new_kind] -= 1;
            total -= 1;
        }
    }
    Ok(())
}

/// Same without-replacement redistribution for the five lolly flavours on
/// the terrain plane. Lollies are all one tile tall, so nothing moves.
pub(crate) fn shuffle_lollies(map: &mut TileMap, rng: &mut StdRng) -> Result<()> {
    let mut counts = [0usize; tiles::LOLLY_KINDS];
    let mut total = 0usize;
    for &tile in map.plane(Plane::Tiles) {
        if LOLLIES.contains(&tile) {
            counts[(tile - T_LOLLY_BASE) as usize] += 1;
            total += 1;
        }
    }
    if total == 0 {
        return Ok(());
    }

    for y in 0..map.height() as usize {
        for x in 0..map.width() as usize {
            let tile = map.get(x, y, Plane::Tiles)?;
            if !LOLLIES.contains(&tile) {
                continue;
            }
            let kind = weighted_draw(&counts, total, rng);
            map.set(x, y, Plane::Tiles, T_LOLLY_BASE + kind as u16)?;
            counts[kind] -= 1;
            total -= 1;
        }
    }
    Ok(())
}

fn munge_solid_block(tile: u16, mask: u16) -> u16 {
    ((tile - T_SOLID_BLOCK_BASE) ^ mask) + T_SOLID_BLOCK_BASE
}

fn munge_jump_thru(tile: u16, mask: u16) -> u16 {
    let colour = JUMP_THRU_ORDER_INVERSE[(tile - T_JUMP_THRU_BASE) as usize] ^ mask;
    T_JUMP_THRU_BASE + JUMP_THRU_ORDER[colour as usize]
}

/// Recolours solid and jump-through blocks with one 2-bit mask per level.
pub(crate) fn munge_block_colours(map: &mut TileMap, rng: &mut StdRng) -> Result<()> {
    let mask = rng.gen_range(0..4u16);
    debug!("block colour mask: {}", mask);

    for y in 0..map.height() as usize {
        for x in 0..map.width() as usize {
            let tile = map.get(x, y, Plane::Tiles)?;
            if SOLID_BLOCKS.contains(&tile) {
                map.set(x, y, Plane::Tiles, munge_solid_block(tile, mask))?;
            } else if JUMP_THRU_BLOCKS.contains(&tile) {
                map.set(x, y, Plane::Tiles, munge_jump_thru(tile, mask))?;
            }
        }
    }
    Ok(())
}

fn munge_key(tile: u16, mask: u16) -> u16 {
    ((tile - T_KEY_BASE) ^ mask) + T_KEY_BASE
}

/// Doors keep their colour in an irregular encoding: colour 0 lives in its
/// own two-tile range, colours 1..=3 in pairs in a second range, each pair
/// split into top and bottom halves.
fn munge_door(tile: u16, mask: u16) -> u16 {
    let half = 1 - (tile & 1);
    let colour = if DOORS_PLAIN.contains(&tile) {
        0
    } else {
        // 195..=200 decode to colours 1..=3 in pairs; 193 aligns the pair
        // boundary for the halving.
        (tile - (T_DOOR_COLOURED_TOP - 2)) >> 1
    };
    let colour = colour ^ mask;
    if colour == 0 {
        T_DOOR_PLAIN_TOP + half
    } else {
        T_DOOR_COLOURED_TOP + (colour - 1) * 2 + half
    }
}

/// Recolours keys and doors together with one 2-bit mask, so every key still
/// opens a door of its colour.
pub(crate) fn munge_keys(map: &mut TileMap, rng: &mut StdRng) -> Result<()> {
    let mask = rng.gen_range(0..4u16);
    debug!("key colour mask: {}", mask);

    for y in 0..map.height() as usize {
        for x in 0..map.width() as usize {
            let tile = map.get(x, y, Plane::Tiles)?;
            if KEYS.contains(&tile) {
                map.set(x, y, Plane::Tiles, munge_key(tile, mask))?;
            } else if DOORS_PLAIN.contains(&tile) || DOORS_COLOURED.contains(&tile) {
                map.set(x, y, Plane::Tiles, munge_door(tile, mask))?;
            }
        }
    }
    Ok(())
}

/// Writes `item` into the `slot`-th qualifying special-item position,
/// counting qualifying tiles in row-major scan order. An exit sign hosts
/// its item in the tile directly below it, which must currently be grey
/// sky; a blocked sign is passed over without consuming the countdown.
/// Returns the written coordinate, or None when the level has fewer
/// qualifying positions than `slot`.
pub(crate) fn set_special_item(
    map: &mut TileMap,
    item: u16,
    slot: usize,
) -> Result<Option<(usize, usize)>> {
    let mut remaining = slot;
    for y in 0..map.height() as usize {
        for x in 0..map.width() as usize {
            let tile = map.get(x, y, Plane::Tiles)?;
            if !tiles::is_special_slot_tile(tile) {
                continue;
            }
            if remaining > 0 {
                remaining -= 1;
                continue;
            }
            if EXIT_SIGNS.contains(&tile) {
                let below = map.get(x, y + 1, Plane::Tiles)?;
                if below != T_GREY_SKY {
                    // Blocked sign: pass over it without consuming the
                    // countdown and let the next qualifying tile host the
                    // item.
                    continue;
                }
                map.set(x, y + 1, Plane::Tiles, item)?;
                debug!("item {} placed below the exit sign at ({}, {})", item, x, y);
                return Ok(Some((x, y + 1)));
            }
            map.set(x, y, Plane::Tiles, item)?;
            debug!("item {} placed at ({}, {})", item, x, y);
            return Ok(Some((x, y)));
        }
    }
    Ok(None)
}
