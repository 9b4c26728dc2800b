//! Inspection entrypoint: reads a converted SOFA file back, prints its
//! statistics, optionally exports a normalized WAV, and charts the onset
//! of both channels in the terminal.

mod gui;

use air2sofa::inspect::{analyze, channel_points, export_wav, normalization_gain};
use air2sofa::sofa::read_ir;
use clap::Parser;
use gui::engage_gui;
use std::path::PathBuf;

/// Verify a converted SOFA file: statistics, waveform chart, WAV export
#[derive(Debug, Parser)]
#[clap(version, about)]
struct InspectArgs {
    /// The .sofa file to inspect
    input: PathBuf,

    /// Also export the response as a 16-bit stereo WAV for listening
    #[arg(short = 'w', long = "wav")]
    wav: Option<PathBuf>,

    /// Width of the waveform chart window, in milliseconds
    #[arg(long = "window", default_value_t = 50.0)]
    window_ms: f64,

    /// Print statistics only, without the terminal chart
    #[arg(long = "no-gui")]
    no_gui: bool,
}

fn main() {
    env_logger::init();
    let args = InspectArgs::parse();

    let sofa = match read_ir(&args.input) {
        Ok(sofa) => sofa,
        Err(e) => {
            eprintln!("cannot read {}: {}", args.input.display(), e);
            std::process::exit(1);
        }
    };

    let (m, r, n) = sofa.ir.dim();
    let stats = analyze(&sofa.ir, sofa.sampling_rate_hz);
    if let Some(title) = &sofa.title {
        println!("Title            : {}", title);
    }
    println!(
        "Data.IR shape    : (M,R,N) = ({},{},{})  fs = {} Hz",
        m, r, n, sofa.sampling_rate_hz
    );
    println!("Peak (per ch)    : [{:.6}, {:.6}]", stats.peak[0], stats.peak[1]);
    println!("RMS  (per ch)    : [{:.6}, {:.6}]", stats.rms[0], stats.rms[1]);
    println!("Any nonzero?     : {}", stats.any_nonzero);
    println!(
        "Length [samples] : {}  ({:.3} s)",
        stats.samples, stats.duration_secs
    );

    if let Some(wav_path) = &args.wav {
        let gain = normalization_gain(&sofa.ir);
        match export_wav(wav_path, &sofa.ir, sofa.sampling_rate_hz) {
            Ok(()) => println!("Wrote WAV: {} (gain={:.3})", wav_path.display(), gain),
            Err(e) => {
                eprintln!("cannot write {}: {}", wav_path.display(), e);
                std::process::exit(1);
            }
        }
    }

    if !args.no_gui {
        let [left, right] = channel_points(&sofa.ir, sofa.sampling_rate_hz, args.window_ms);
        if let Err(e) = engage_gui(&left, &right, args.window_ms) {
            eprintln!("chart failed: {}", e);
            std::process::exit(1);
        }
    }
}
