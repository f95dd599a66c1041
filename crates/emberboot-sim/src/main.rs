use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use emberboot_core::Supervisor;
use emberboot_sim::{scenarios, SimConfig, SimPlatform};

#[derive(Parser)]
#[command(name = "emberboot-sim", about = "emberboot DFU bootloader simulation")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Which scenario to run
    #[arg(short, long, value_enum, default_value_t = Scenario::All)]
    scenario: Scenario,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    All,
    Basic,
    Transfer,
    Emergency,
    Interleaved,
}

fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match SimConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("failed to load config from {}: {e}", path.display());
                std::process::exit(1);
            }
        },
        None => SimConfig::default(),
    };

    emberboot_sim::logging::init(&config.logging.level, config.logging.json);

    let platform = SimPlatform::new(config.flash.write_latency_us);
    let mut sup = Supervisor::new(platform, config.supervisor.to_supervisor_config());

    let selected = |s: Scenario| cli.scenario == Scenario::All || cli.scenario == s;
    let mut failures = 0u32;
    let mut run = |name: &str, result: Result<(), emberboot_sim::SimError>| match result {
        Ok(()) => tracing::info!(scenario = name, "scenario passed"),
        Err(e) => {
            tracing::error!(scenario = name, error = %e, "scenario failed");
            failures += 1;
        }
    };

    if selected(Scenario::Basic) {
        run("basic", scenarios::basic_commands(&mut sup));
        sup.reset();
    }
    if selected(Scenario::Transfer) {
        run(
            "transfer",
            scenarios::complete_transfer(&mut sup, config.flash.write_latency_us),
        );
        sup.reset();
    }
    if selected(Scenario::Emergency) {
        run(
            "emergency",
            scenarios::emergency_recovery(&mut sup, config.supervisor.recovery_heal_ms),
        );
        sup.reset();
    }
    if selected(Scenario::Interleaved) {
        run(
            "interleaved",
            scenarios::interleaved_traffic(&mut sup, config.flash.write_latency_us),
        );
    }

    sup.log_stats();
    if failures > 0 {
        std::process::exit(1);
    }
}
