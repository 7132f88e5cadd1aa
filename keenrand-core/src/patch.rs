//! CKPatch text generation.
//!
//! The randomiser ships its executable tweaks and in-game hint messages as a
//! CKPatch file (`RNDKEEN1.PAT`) alongside the randomised levels: redirect
//! level loading to the `RNDLV` prefix, show the seed on the status screen,
//! and rewrite a handful of sign messages into hints derived from the run
//! report.

use crate::tiles::{
    LEVEL_NAMES, T_BATTERY, T_EVERCLEAR, T_GREY_SKY, T_JOYSTICK, T_POGO_STICK, T_VACUUM,
};
use crate::{RandomiserReport, RandomiserSettings};

/// Levels whose sign message gets replaced with a hint, in the order the
/// hints are consumed. Six messages is all the existing text space fits.
const HINT_LEVELS: [u8; 6] = [2, 6, 9, 10, 12, 15];

const HINT_ITEMS: [(u16, &str); 5] = [
    (T_POGO_STICK, "Pogo Stick"),
    (T_JOYSTICK, "Joystick"),
    (T_BATTERY, "Battery"),
    (T_VACUUM, "Vacuum"),
    (T_EVERCLEAR, "Everclear"),
];

fn hint_item_name(tile: u16) -> Option<&'static str> {
    HINT_ITEMS
        .iter()
        .find(|(item, _)| *item == tile)
        .map(|(_, name)| *name)
}

/// Emits one hint message, consuming the next hint level. Hints past the
/// last available level are dropped, as the original messages they replace
/// run out.
fn push_hint(out: &mut String, cursor: &mut usize, body: &str) {
    if *cursor >= HINT_LEVELS.len() {
        return;
    }
    out.push_str(&format!(
        "%level.hint {}\nA Yorpy Mind\nThought Bellows:\n",
        HINT_LEVELS[*cursor]
    ));
    *cursor += 1;
    out.push_str(body);
}

/// Builds the complete CKPatch file for one run.
pub fn build_patch_text(report: &RandomiserReport, settings: &RandomiserSettings) -> String {
    let mut out = String::new();
    out.push_str("%ext ck1\n");
    out.push_str("%version 1.31\n\n");

    // Load levels from RNDLV??.CK1 instead of LEVEL??.CK1.
    out.push_str("%patch $14D9C \"RNDLV\"\n");
    out.push_str("%patch $14DA3 \"RNDLV\"\n\n");

    // Show the seed on the status screen.
    let seed = report.seed as u32;
    out.push_str("%patch $14E60 \" RANDOM SEED \"\n");
    out.push_str(&format!("%patch $0FA7\t$B8 ${:04X}W\n", (seed >> 16) & 0xFFFF));
    out.push_str(&format!("\t\t$BA ${:04X}W\n", seed & 0xFFFF));
    out.push_str("\t\t$90 $90 $90 $90 $90 $90\n\n");

    if settings.start_pogo {
        out.push_str("%patch $900E $01\n\n");
    }
    if settings.start_ammo > 0 {
        out.push_str(&format!("%patch $9008 ${:04X}W\n\n", settings.start_ammo));
    }

    let mut cursor = 0usize;
    for placement in &report.placements {
        // Pogo locations are no secret when the run starts with one or
        // hides extras.
        let suppress_pogo = (settings.start_pogo || settings.extra_pogo > 0)
            && placement.item == T_POGO_STICK;
        if suppress_pogo {
            continue;
        }

        if let Some(item_name) = hint_item_name(placement.item) {
            let body = if settings.use_level_names {
                format!(
                    "The {} is\nfound in the\n{}\n\n",
                    item_name,
                    LEVEL_NAMES[placement.level as usize - 1]
                )
            } else {
                format!("The {} is\nfound in level {}\n\n", item_name, placement.level)
            };
            push_hint(&mut out, &mut cursor, &body);
        }

        if placement.item != T_GREY_SKY {
            let old = placement.level;
            let new = report.level_permutation[placement.level as usize - 1];
            if old != new {
                let body = if settings.use_level_names {
                    format!(
                        "{}\nrests where the\n{}\nonce was...\n\n",
                        LEVEL_NAMES[new as usize - 1],
                        LEVEL_NAMES[old as usize - 1]
                    )
                } else {
                    format!("Level {}\nrests where\nlevel {} once\nwas...\n\n", new, old)
                };
                push_hint(&mut out, &mut cursor, &body);
            }
        }
    }

    out.push_str("%end\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SlotPlacement;
    use std::path::PathBuf;

    fn settings() -> RandomiserSettings {
        RandomiserSettings {
            seed: 1234,
            shuffle_enemies: true,
            use_level_names: true,
            start_pogo: false,
            start_ammo: 0,
            extra_pogo: 0,
            debug: false,
            input_path: PathBuf::from("."),
            output_path: PathBuf::from("."),
        }
    }

    fn report() -> RandomiserReport {
        let mut level_permutation = [0u8; 16];
        for (i, slot) in level_permutation.iter_mut().enumerate() {
            *slot = i as u8 + 1;
        }
        // Swap levels 1 and 3 so a map hint fires.
        level_permutation.swap(0, 2);
        RandomiserReport {
            seed: 1234,
            level_permutation,
            placements: vec![
                SlotPlacement {
                    level: 1,
                    slot: 0,
                    item: T_POGO_STICK,
                    position: Some((4, 4)),
                },
                SlotPlacement {
                    level: 2,
                    slot: 0,
                    item: T_GREY_SKY,
                    position: Some((1, 1)),
                },
                SlotPlacement {
                    level: 3,
                    slot: 0,
                    item: T_BATTERY,
                    position: None,
                },
            ],
        }
    }

    #[test]
    fn patch_has_header_and_footer() {
        let text = build_patch_text(&report(), &settings());
        assert!(text.starts_with("%ext ck1\n%version 1.31\n"));
        assert!(text.ends_with("%end\n"));
        assert!(text.contains("%patch $14D9C \"RNDLV\""));
        assert!(text.contains("%patch $14E60 \" RANDOM SEED \""));
    }

    #[test]
    fn item_hints_use_level_names() {
        let text = build_patch_text(&report(), &settings());
        assert!(text.contains("The Pogo Stick is\nfound in the\nBorder Town"));
        assert!(text.contains("The Battery is\nfound in the\nTreasury"));
        // Filler never produces an item hint.
        assert!(!text.contains("found in the\n1st Red Rock Shrine"));
    }

    #[test]
    fn item_hints_can_use_level_numbers() {
        let mut s = settings();
        s.use_level_names = false;
        let text = build_patch_text(&report(), &s);
        assert!(text.contains("The Pogo Stick is\nfound in level 1\n"));
        assert!(text.contains("Level 1\nrests where\nlevel 3 once\nwas..."));
    }

    #[test]
    fn swap_hints_skip_unmoved_levels() {
        let text = build_patch_text(&report(), &settings());
        // Level 1 moved (1 <-> 3), level 2's placement is filler only.
        assert!(text.contains("Treasury\nrests where the\nBorder Town\nonce was..."));
        assert_eq!(text.matches("%level.hint").count(), 4);
    }

    #[test]
    fn start_pogo_suppresses_pogo_hints_and_patches_the_exe() {
        let mut s = settings();
        s.start_pogo = true;
        let text = build_patch_text(&report(), &s);
        assert!(text.contains("%patch $900E $01"));
        assert!(!text.contains("Pogo Stick"));
    }

    #[test]
    fn hint_count_never_exceeds_the_message_space() {
        let mut rep = report();
        // Far more placements than hint slots.
        for level in 4..=16u8 {
            rep.placements.push(SlotPlacement {
                level,
                slot: 0,
                item: T_JOYSTICK,
                position: None,
            });
        }
        let text = build_patch_text(&rep, &settings());
        assert!(text.matches("%level.hint").count() <= HINT_LEVELS.len());
    }

    #[test]
    fn start_ammo_patch_is_emitted() {
        let mut s = settings();
        s.start_ammo = 99;
        let text = build_patch_text(&report(), &s);
        assert!(text.contains("%patch $9008 $0063W"));
    }
}
