//! # Logsim Core
//!
//! A compiler and cycle-based simulator for textual logic circuit definitions.
//!
//! This library provides:
//! - A small block-structured language for declaring devices, their
//!   initial settings, their connections and the signals to monitor
//! - A parser that reports every syntax and semantic error it finds, each
//!   with the offending line and a caret marker
//! - Gates, D-type flip-flops, switches and clocks evaluated in discrete cycles
//! - Per-cycle signal traces for monitored outputs
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`names`] - Interned identifiers shared by every other module
//! - [`dsl`] - Scanner and parser for the definition language
//! - [`circuit`] - Devices, the network that executes them, and monitors
//! - [`simulator`] - Run, continue and switch control over a compiled circuit
//! - [`interface`] - Line-command front end over any reader and writer
//!
//! ## Usage
//!
//! ```bash
//! logsim -c 20 -s sw1=1 circuit.def
//! ```
//!
//! ```no_run
//! use logsim_core::{dsl, Simulator};
//!
//! let compilation = dsl::compile("devices() initialise() connections() monitors()");
//! for diagnostic in &compilation.diagnostics {
//!     eprintln!("{}", diagnostic.context);
//! }
//! let mut simulator = Simulator::new(compilation.into_result()?);
//! simulator.run(10)?;
//! print!("{}", simulator.display_signals());
//! # Ok::<(), logsim_core::LogsimError>(())
//! ```
//!
//! ## Simulation Method
//!
//! Each cycle:
//!
//! 1. Clocks whose counter reached their half period toggle
//! 2. Devices are evaluated in declaration order until no output changes
//! 3. D-types whose clock input rose latch their data input
//! 4. The network settles again
//!
//! A network that does not settle within its pass limit is oscillating and
//! the cycle fails.

pub mod circuit;
pub mod dsl;
pub mod error;
pub mod interface;
pub mod names;
pub mod simulator;

// Re-export main types for convenience
pub use circuit::Circuit;
pub use error::{LogsimError, Result};
pub use names::{NameId, Names};
pub use simulator::Simulator;

/// Cycles simulated by the CLI when none are requested
pub const DEFAULT_CYCLES: usize = 10;
