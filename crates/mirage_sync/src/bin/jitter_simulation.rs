//! # Jitter Simulation
//!
//! Runs the orbit-and-rest scenario over every network preset and prints
//! reconstruction error per preset.
//!
//! Usage: `jitter_simulation [sync.toml]`

use mirage_sync::simulation::{self, NetworkConditions, SimulationConfig, SimulationReport};
use mirage_sync::SyncConfig;

const PRESETS: [(&str, NetworkConditions); 4] = [
    ("PERFECT", NetworkConditions::PERFECT),
    ("GOOD", NetworkConditions::GOOD),
    ("AVERAGE", NetworkConditions::AVERAGE),
    ("POOR", NetworkConditions::POOR),
];

fn main() {
    let sync = match std::env::args().nth(1) {
        Some(path) => match SyncConfig::from_toml_file(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {path}: {e}");
                std::process::exit(1);
            }
        },
        None => SyncConfig::default(),
    };

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║           MIRAGE JITTER SIMULATION                               ║");
    println!("╠══════════════════════════════════════════════════════════════════╣");
    println!("║  Orbiting object, 2s rest mid-run, skewed local clock.           ║");
    println!("║  Error measured against truth at the render timestamp.           ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();
    println!("Configuration:");
    println!("  Delay:         {}ms", sync.interpolation_delay_ms);
    println!("  Buffer:        {} target / {} max", sync.buffer_target_len, sync.max_buffer_len);
    println!("  Extrapolation: {}ms", sync.max_extrapolation_ms);
    println!("  Jitter gap:    {}ms", sync.jitter_threshold_ms * sync.jitter_safety_factor);
    println!();

    for (name, conditions) in PRESETS {
        let config = SimulationConfig {
            conditions,
            ..SimulationConfig::default()
        };
        match simulation::run(sync.clone(), &config) {
            Ok(report) => print_report(name, &conditions, &report),
            Err(e) => {
                eprintln!("Simulation failed: {e}");
                std::process::exit(1);
            }
        }
    }
}

fn print_report(name: &str, conditions: &NetworkConditions, report: &SimulationReport) {
    println!("── {name} ─────────────────────────────────────────────");
    println!(
        "  Network:       {}ms ±{}ms, {}% loss, {}% dup",
        conditions.base_latency_ms,
        conditions.jitter_ms,
        conditions.packet_loss_percent,
        conditions.duplicate_percent
    );
    println!(
        "  Snapshots:     {} sent, {} lost, {} duplicated",
        report.snapshots_sent, report.snapshots_lost, report.snapshots_duplicated
    );
    println!(
        "  Frames:        {} ({} measured)",
        report.frames, report.measured_frames
    );
    println!(
        "  Modes:         cubic {} / linear {} / extrap {} / frozen {} / held {}",
        report.modes.cubic,
        report.modes.linear,
        report.modes.extrapolated,
        report.modes.frozen,
        report.modes.held
    );
    println!(
        "  Error:         mean {:.4} / max {:.4} units, rotation {:.5} rad",
        report.mean_error, report.max_error, report.mean_rotation_error
    );
    println!(
        "  Frame step:    {:.4} rendered vs {:.4} truth",
        report.max_frame_step, report.max_truth_step
    );
    println!(
        "  Sampler:       {} stale, {} bridges, {} resyncs, {} trimmed",
        report.sampler.stale, report.sampler.bridges, report.sampler.resyncs, report.sampler.trimmed
    );
    println!();
}
