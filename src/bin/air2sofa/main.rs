//! Converter entrypoint: turns AIR intermediate .mat files into SOFA
//! files, one at a time or a directory per run.

use air2sofa::args::{AirArgs, CommandTask};
use air2sofa::batch::{convert_one, run_batch, BatchOptions, Outcome};
use clap::Parser;
use log::error;

// Example:
// cargo run --bin air2sofa --
//                          batch
//                          --in_dir   out_intermediate
//                          --out_dir  out_sofa
//                          --pattern  "*.mat"
//                          --overwrite

fn main() {
    let args = AirArgs::parse();

    // --quiet only lowers the default; RUST_LOG still wins.
    let default_filter = if args.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match args.command {
        CommandTask::Single(cmd) => {
            match convert_one(&cmd.input, &cmd.out_dir, cmd.overwrite) {
                Ok(Outcome::Written(path)) => println!("Wrote: {}", path.display()),
                Ok(Outcome::AlreadyExists(path)) => {
                    println!("Already exists: {}", path.display())
                }
                Err(e) => {
                    error!("{} | {}", cmd.input.display(), e);
                    std::process::exit(1);
                }
            }
        }
        CommandTask::Batch(cmd) => {
            let options = BatchOptions {
                in_dir: cmd.in_dir,
                out_dir: cmd.out_dir,
                pattern: cmd.pattern,
                overwrite: cmd.overwrite,
            };
            match run_batch(&options) {
                Ok(summary) => {
                    println!(
                        "Done. {}/{} files converted.",
                        summary.converted, summary.attempted
                    )
                }
                Err(e) => {
                    error!("batch failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}
