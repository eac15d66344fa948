//! Circuit definition language.
//!
//! A definition is four blocks in a fixed order. Each block is a keyword
//! followed by a bracketed list of `;`-terminated statements.
//!
//! # Grammar Overview
//!
//! ```text
//! circuit      = devices initialise connections monitors EOF
//! devices      = "devices" "(" { device_decl } ")"
//! device_decl  = name { "," name } ("is" | "are") device_type ";"
//! initialise   = "initialise" "(" { init_stmt } ")"
//! init_stmt    = name { "," name } ("has" | "have") NUMBER ["inputs"] ";"
//! connections  = "connections" "(" { connection } ")"
//! connection   = signal "to" name "." port ";"
//! monitors     = "monitors" "(" { monitor_stmt } ")"
//! monitor_stmt = signal { "," signal } ";"
//! signal       = name ["." port]
//!
//! device_type  = "AND" | "OR" | "NAND" | "NOR" | "XOR" | "NOT"
//!              | "DTYPE" | "SWITCH" | "CLOCK"
//! name         = lowercase letter { lowercase letter | digit }
//! comment      = '#' { any_char }   (ends at a newline or before ';')
//! ```
//!
//! # Devices
//!
//! | Type | Qualifier (`has N`) | Inputs | Outputs |
//! |------|---------------------|--------|---------|
//! | AND, OR, NAND, NOR | 1 to 16 inputs, default 2 | `I1`..`In` | single |
//! | XOR | 2 | `I1`, `I2` | single |
//! | NOT | 1 | `I1` | single |
//! | DTYPE | none | `DATA`, `CLK`, `SET`, `CLEAR` | `Q`, `QBAR` |
//! | SWITCH | initial level, 0 or 1 | none | single |
//! | CLOCK | half period in cycles | none | single |
//!
//! Switches must be named `sw[0-9]*` and clocks `clk[0-9]*`.
//!
//! # Example
//!
//! ```text
//! # Two switches into an AND gate
//! devices(
//!     sw1, sw2 are SWITCH;
//!     gate is AND;
//! )
//! initialise(
//!     sw1 has 1;
//!     sw2 has 0;
//! )
//! connections(
//!     sw1 to gate.I1;
//!     sw2 to gate.I2;
//! )
//! monitors(
//!     gate;
//! )
//! ```

mod diagnostics;
mod parser;
mod scanner;

pub use diagnostics::{Diagnostic, ErrorKind, SemanticError, SyntaxError};
pub use parser::{is_clock_legal, is_switch_legal, Parser};
pub use scanner::{Keyword, Scanner, Symbol, SymbolType};

use std::path::Path;

use crate::circuit::{Circuit, NetworkConfig};
use crate::error::{LogsimError, Result};

/// Result of compiling one definition.
///
/// The circuit is always returned so a host can inspect what was built,
/// but it should only be simulated when `diagnostics` is empty.
#[derive(Debug)]
pub struct Compilation {
    pub circuit: Circuit,
    pub diagnostics: Vec<Diagnostic>,
}

impl Compilation {
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// The circuit, or [`LogsimError::CompileFailed`] if any error was found.
    pub fn into_result(self) -> Result<Circuit> {
        if self.is_ok() {
            Ok(self.circuit)
        } else {
            Err(LogsimError::CompileFailed {
                count: self.diagnostics.len(),
            })
        }
    }
}

/// Compile a definition into a fresh circuit.
pub fn compile(source: &str) -> Compilation {
    compile_with_config(source, NetworkConfig::default())
}

/// Compile a definition with explicit network configuration.
pub fn compile_with_config(source: &str, config: NetworkConfig) -> Compilation {
    let mut circuit = Circuit::with_config(config);
    let scanner = Scanner::new(source, &mut circuit.names);
    let mut parser = Parser::new(scanner, circuit);
    parser.parse_network();
    let (circuit, diagnostics) = parser.into_parts();
    Compilation {
        circuit,
        diagnostics,
    }
}

/// Read a definition file.
pub fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| LogsimError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_fresh_state_each_time() {
        let first = compile(
            "devices(sw1 is SWITCH; a is AND;) initialise(sw1 has 0;) connections() monitors(a;)",
        );
        assert!(!first.is_ok());

        let second = compile("devices(sw1 is SWITCH;) initialise(sw1 has 1;) connections() monitors(sw1;)");
        assert!(second.is_ok(), "{:?}", second.diagnostics);
        assert!(second.circuit.names.query("a").is_none());
        assert_eq!(second.circuit.devices().len(), 1);
        assert!(second.into_result().is_ok());
    }

    #[test]
    fn test_failed_compilation_result() {
        let compilation = compile("devices(");
        let count = compilation.diagnostics.len();
        assert!(count > 0);
        assert!(matches!(
            compilation.into_result(),
            Err(LogsimError::CompileFailed { count: c }) if c == count
        ));
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_source(Path::new("/definitely/not/here.def")).unwrap_err();
        assert!(matches!(err, LogsimError::FileReadError { .. }));
    }
}
