//! Logsim - Logic Circuit Simulator
//!
//! Compiles a circuit definition and simulates it.
//!
//! # Usage
//!
//! ```bash
//! logsim circuit.def                   # run 10 cycles and print the traces
//! logsim -c 32 -s sw1=1 circuit.def    # 32 cycles with sw1 high
//! logsim -i circuit.def                # interactive commands on stdin
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::info;
use logsim_core::{
    circuit::NetworkConfig, dsl, error::Result, interface::UserInterface, LogsimError, Simulator,
    DEFAULT_CYCLES,
};

/// Logic circuit simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the circuit definition file
    #[arg(value_name = "CIRCUIT_FILE")]
    circuit_file: PathBuf,

    /// Number of cycles to simulate
    #[arg(short, long, default_value_t = DEFAULT_CYCLES)]
    cycles: usize,

    /// Set a switch before running, as NAME=LEVEL (repeatable)
    #[arg(short, long = "set", value_name = "NAME=LEVEL", value_parser = parse_switch)]
    set: Vec<(String, bool)>,

    /// Settling passes allowed per cycle before declaring oscillation
    #[arg(long)]
    max_passes: Option<usize>,

    /// Read commands from stdin instead of running once
    #[arg(short, long)]
    interactive: bool,

    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_switch(text: &str) -> std::result::Result<(String, bool), String> {
    let (name, level) = text
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=LEVEL, found '{}'", text))?;
    match level {
        "0" => Ok((name.to_string(), false)),
        "1" => Ok((name.to_string(), true)),
        _ => Err(format!("switch level must be 0 or 1, found '{}'", level)),
    }
}

fn init_logging(verbose: u8) -> std::result::Result<(), log::SetLoggerError> {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {}] {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
}

fn run(args: Args) -> Result<()> {
    let source = dsl::read_source(&args.circuit_file)?;

    let mut config = NetworkConfig::new();
    if let Some(max_passes) = args.max_passes {
        config = config.with_max_passes(max_passes);
    }

    let compilation = dsl::compile_with_config(&source, config);
    for diagnostic in &compilation.diagnostics {
        eprintln!("{}\n", diagnostic.context);
    }
    let circuit = compilation.into_result()?;
    info!("compiled {}", args.circuit_file.display());

    let mut simulator = Simulator::new(circuit);
    for (name, level) in &args.set {
        simulator.set_switch(name, *level)?;
    }

    if args.interactive {
        let stdin = std::io::stdin();
        let mut ui = UserInterface::new(simulator, stdin.lock(), std::io::stdout());
        return ui.command_loop();
    }

    let outcome = simulator.run(args.cycles);
    print!("{}", simulator.display_signals());
    outcome
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = init_logging(args.verbose) {
        eprintln!("Failed to initialise logging: {}", e);
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(LogsimError::CompileFailed { count }) => {
            eprintln!("{} error(s) found, nothing simulated", count);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
