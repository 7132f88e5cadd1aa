use clap::Parser;
use rand::Rng;
use std::path::PathBuf;

use keenrand_core::{run, RandomiserSettings};

#[derive(Debug, Parser)]
#[command(name = "keenrand", version, about = "Commander Keen 1 level randomiser")]
struct Args {
    /// Directory containing the original LEVEL??.CK1 files.
    #[arg(long, default_value = ".")]
    input: PathBuf,

    /// Directory the RNDLV??.CK1 files and RNDKEEN1.PAT are written to.
    #[arg(long, default_value = ".")]
    output: PathBuf,

    /// Random seed; a fresh one is drawn when omitted.
    #[arg(long)]
    seed: Option<u16>,

    /// Refer to levels by number instead of name in hints.
    #[arg(long, default_value_t = false)]
    no_level_names: bool,

    /// Leave enemy positions alone.
    #[arg(long, default_value_t = false)]
    no_enemy_shuffle: bool,

    /// Start with the pogo stick.
    #[arg(long, default_value_t = false)]
    start_pogo: bool,

    /// Start with this much ammo.
    #[arg(long, default_value_t = 0)]
    start_ammo: u16,

    /// Hide this many extra pogo sticks around the game.
    #[arg(long, default_value_t = 0)]
    extra_pogo: usize,

    /// Write spoiler output next to the randomised levels.
    #[arg(long, default_value_t = false)]
    debug: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    println!(
        "Keen 1 Randomiser v{}",
        env!("CARGO_PKG_VERSION")
    );

    let seed = args.seed.unwrap_or_else(|| rand::thread_rng().gen());
    println!("Random seed: {}", seed);

    let settings = RandomiserSettings {
        seed,
        shuffle_enemies: !args.no_enemy_shuffle,
        use_level_names: !args.no_level_names,
        start_pogo: args.start_pogo,
        start_ammo: args.start_ammo,
        extra_pogo: args.extra_pogo,
        debug: args.debug,
        input_path: args.input,
        output_path: args.output,
    };

    match run(&settings) {
        Ok(report) => {
            println!(
                "Wrote {} randomised levels, the world map and RNDKEEN1.PAT to {}",
                report.level_permutation.len(),
                settings.output_path.display()
            );
        }
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}
