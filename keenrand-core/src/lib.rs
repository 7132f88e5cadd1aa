//! Seeded randomiser for Commander Keen 1 (Invasion of the Vorticons)
//! levels. Decodes the RLE-compressed map files, scrambles level entries,
//! enemies, lollies, block and key colours and the special-item slots, and
//! re-encodes everything in the original on-disk format, together with a
//! CKPatch file carrying the matching executable tweaks and hints.

use log::{debug, info};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

pub mod map;
mod patch;
mod shuffle;
pub mod tiles;

pub use map::{Plane, TileMap};
pub use patch::build_patch_text;

/// The world map the game calls level 80.
const WORLD_MAP_LEVEL: u8 = 80;

#[derive(Debug, Error)]
pub enum RandomiserError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("{file}: {detail}")]
    Map { file: String, detail: String },
    #[error("tile access out of range at ({x}, {y}) on a {width}x{height} map")]
    TileOutOfRange {
        x: i64,
        y: i64,
        width: u16,
        height: u16,
    },
}

pub type Result<T> = std::result::Result<T, RandomiserError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomiserSettings {
    /// The run seed; together with the fixed pass order it determines every
    /// draw the randomiser makes.
    pub seed: u16,
    pub shuffle_enemies: bool,
    /// Hints refer to levels by name rather than number.
    pub use_level_names: bool,
    /// Patch the game to start with the pogo stick.
    pub start_pogo: bool,
    /// Patch the game to start with this much ammo.
    pub start_ammo: u16,
    /// Convert this many filler pool entries into extra hidden pogo sticks.
    pub extra_pogo: usize,
    pub debug: bool,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

/// One special-item (or filler) placement, in level-processing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotPlacement {
    pub level: u8,
    /// Slot countdown value this placement was made with; slots fill from
    /// the highest index down so earlier scan positions stay stable.
    pub slot: usize,
    /// Tile code written; grey sky marks a filler placement.
    pub item: u16,
    /// Coordinate the item landed on, or None when the level ran out of
    /// qualifying positions.
    pub position: Option<(usize, usize)>,
}

/// What a run did, for hint generation and spoiler output: the placements in
/// processing order and the world-map level permutation.
#[derive(Debug, Clone, Serialize)]
pub struct RandomiserReport {
    pub seed: u16,
    /// New level number for each original level, indexed by original level
    /// minus one.
    pub level_permutation: [u8; 16],
    pub placements: Vec<SlotPlacement>,
}

fn level_file_name(prefix: &str, level: u8) -> String {
    format!("{}{:02}.CK1", prefix, level)
}

/// The pool of items handed out across all slots of all levels: the five
/// unique pickups plus grey-sky filler, with optional extra pogo sticks
/// taking over leading filler entries.
fn build_item_pool(settings: &RandomiserSettings) -> Result<Vec<u16>> {
    let total_slots: usize = tiles::SLOTS_PER_LEVEL.iter().sum();
    let free_slots = total_slots - tiles::SPECIAL_ITEMS.len();
    if settings.extra_pogo > free_slots {
        return Err(RandomiserError::Config(format!(
            "cannot hide {} extra pogo sticks, only {} free slots exist",
            settings.extra_pogo, free_slots
        )));
    }

    let mut pool = tiles::SPECIAL_ITEMS.to_vec();
    pool.resize(total_slots, tiles::T_GREY_SKY);
    for slot in pool.iter_mut().skip(tiles::SPECIAL_ITEMS.len()).take(settings.extra_pogo) {
        *slot = tiles::T_POGO_STICK;
    }
    Ok(pool)
}

/// Runs the whole pipeline: world map, the sixteen levels, the patch file
/// and the optional spoiler output. Randomised files go to the output
/// directory as `RNDLV??.CK1`; the inputs are never modified.
pub fn run(settings: &RandomiserSettings) -> Result<RandomiserReport> {
    tiles::validate_categories().map_err(RandomiserError::Config)?;

    if !settings.input_path.exists() {
        return Err(RandomiserError::Config(format!(
            "input path does not exist: {}",
            settings.input_path.display()
        )));
    }
    if !settings.output_path.exists() {
        fs::create_dir_all(&settings.output_path)?;
    }

    // One rng stream for the whole run; the pass order below is the seed
    // contract.
    let mut rng = StdRng::seed_from_u64(settings.seed as u64);

    let mut pool = build_item_pool(settings)?;
    shuffle::permute(&mut pool, &mut rng);

    let world_src = settings
        .input_path
        .join(level_file_name("LEVEL", WORLD_MAP_LEVEL));
    let mut world = TileMap::load(&world_src)?;
    let level_permutation = shuffle::shuffle_level_entries(&mut world, &mut rng)?;
    world.save(
        &settings
            .output_path
            .join(level_file_name("RNDLV", WORLD_MAP_LEVEL)),
    )?;

    let mut placements = Vec::with_capacity(pool.len());
    let mut pool_cursor = 0usize;

    for level in 1..=tiles::LEVEL_COUNT as u8 {
        let src = settings.input_path.join(level_file_name("LEVEL", level));
        debug!("processing level {} ({})", level, src.display());
        let mut map = TileMap::load(&src)?;

        shuffle::munge_keys(&mut map, &mut rng)?;
        shuffle::munge_block_colours(&mut map, &mut rng)?;
        shuffle::shuffle_lollies(&mut map, &mut rng)?;
        if settings.shuffle_enemies {
            shuffle::shuffle_enemies(&mut map, &mut rng)?;
        }

        // Fill slots from the highest countdown down: placements never
        // disturb the scan positions of the slots still to fill.
        let slots = tiles::SLOTS_PER_LEVEL[level as usize - 1];
        for slot in (0..slots).rev() {
            let item = pool[pool_cursor];
            pool_cursor += 1;
            let position = shuffle::set_special_item(&mut map, item, slot)?;
            placements.push(SlotPlacement {
                level,
                slot,
                item,
                position,
            });
        }

        map.save(&settings.output_path.join(level_file_name("RNDLV", level)))?;
    }

    let report = RandomiserReport {
        seed: settings.seed,
        level_permutation,
        placements,
    };

    let patch_text = patch::build_patch_text(&report, settings);
    fs::write(settings.output_path.join("RNDKEEN1.PAT"), patch_text)?;

    if settings.debug {
        let mut spoiler = format!("Keen 1 randomiser seed: {}\n", report.seed);
        spoiler.push_str("level permutation:\n");
        for (i, &new) in report.level_permutation.iter().enumerate() {
            spoiler.push_str(&format!("  level {:2} -> level {:2}\n", i + 1, new));
        }
        spoiler.push_str("placements:\n");
        for p in &report.placements {
            spoiler.push_str(&format!(
                "  level {:2} slot {}: item {} at {:?}\n",
                p.level, p.slot, p.item, p.position
            ));
        }
        fs::write(settings.output_path.join("spoiler_log.txt"), spoiler)?;

        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| RandomiserError::Config(format!("cannot serialize report: {}", e)))?;
        fs::write(settings.output_path.join("report.json"), json)?;
    }

    info!(
        "randomised {} levels and the world map with seed {}",
        tiles::LEVEL_COUNT,
        settings.seed
    );
    Ok(report)
}
