//! Line-oriented command interface for driving a [`Simulator`].
//!
//! Commands:
//!
//! | Command | Action |
//! |---------|--------|
//! | `r N` | cold start and run N cycles |
//! | `c N` | continue for N more cycles |
//! | `s NAME L` | set switch NAME to level L (0 or 1) |
//! | `m SIGNAL` | monitor SIGNAL (`dev` or `dev.PORT`) |
//! | `z SIGNAL` | stop monitoring SIGNAL |
//! | `h` | list commands |
//! | `q` | quit |

use std::io::{BufRead, Write};

use log::debug;

use crate::error::{LogsimError, Result};
use crate::simulator::Simulator;

const HELP: &str = "\
User commands:
r N       - run the simulation for N cycles
c N       - continue the simulation for N cycles
s X N     - set switch X to N (0 or 1)
m X       - set a monitor on signal X
z X       - zap the monitor on signal X
h         - help (this command)
q         - quit the program";

const PROMPT: &str = "# ";

/// Command loop reading from `input` and replying on `output`.
pub struct UserInterface<R, W> {
    simulator: Simulator,
    input: R,
    output: W,
}

/// A parsed command line.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Run(usize),
    Continue(usize),
    Switch(String, bool),
    Monitor(String),
    Zap(String),
    Help,
    Quit,
}

fn parse_command(line: &str) -> std::result::Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Err("Empty command".to_string());
    };
    let mut argument = |what: &str| {
        words
            .next()
            .map(str::to_string)
            .ok_or_else(|| format!("Expected {}", what))
    };
    let cycles = |text: String| match text.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("Invalid number of cycles '{}'", text)),
    };

    let parsed = match command {
        "r" => Command::Run(cycles(argument("a number of cycles")?)?),
        "c" => Command::Continue(cycles(argument("a number of cycles")?)?),
        "s" => {
            let name = argument("a switch name")?;
            let level = match argument("a switch level")?.as_str() {
                "0" => false,
                "1" => true,
                other => return Err(format!("Invalid switch level '{}'", other)),
            };
            Command::Switch(name, level)
        }
        "m" => Command::Monitor(argument("a signal name")?),
        "z" => Command::Zap(argument("a signal name")?),
        "h" => Command::Help,
        "q" => Command::Quit,
        other => return Err(format!("Unknown command '{}', type 'h' for help", other)),
    };
    Ok(parsed)
}

impl<R: BufRead, W: Write> UserInterface<R, W> {
    pub fn new(simulator: Simulator, input: R, output: W) -> Self {
        Self {
            simulator,
            input,
            output,
        }
    }

    pub fn simulator(&self) -> &Simulator {
        &self.simulator
    }

    /// Read and execute commands until `q` or end of input.
    pub fn command_loop(&mut self) -> Result<()> {
        self.reply(HELP)?;
        loop {
            write!(self.output, "{}", PROMPT).map_err(io_error)?;
            self.output.flush().map_err(io_error)?;

            let mut line = String::new();
            if self.input.read_line(&mut line).map_err(io_error)? == 0 {
                return Ok(());
            }
            if line.trim().is_empty() {
                continue;
            }
            debug!("command: {}", line.trim());

            match parse_command(&line) {
                Ok(Command::Quit) => return Ok(()),
                Ok(command) => self.execute(command)?,
                Err(message) => self.reply(&format!("Error! {}", message))?,
            }
        }
    }

    fn execute(&mut self, command: Command) -> Result<()> {
        let shows_trace = matches!(command, Command::Run(_) | Command::Continue(_));
        let outcome = match command {
            Command::Run(cycles) => self.simulator.run(cycles),
            Command::Continue(cycles) => self.simulator.continue_run(cycles),
            Command::Switch(name, level) => self.simulator.set_switch(&name, level),
            Command::Monitor(signal) => self.simulator.add_monitor(&signal),
            Command::Zap(signal) => self.simulator.remove_monitor(&signal),
            Command::Help => return self.reply(HELP),
            Command::Quit => return Ok(()),
        };

        match outcome {
            Ok(()) if shows_trace => {
                let trace = self.simulator.display_signals();
                self.reply(trace.trim_end())
            }
            Ok(()) => Ok(()),
            Err(error) => self.reply(&format!("Error! {}", error)),
        }
    }

    fn reply(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{}", text).map_err(io_error)
    }
}

fn io_error(e: std::io::Error) -> LogsimError {
    LogsimError::InterfaceError {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl;

    fn session(commands: &str, expected_cycles: usize) -> String {
        let compilation = dsl::compile(
            "devices(sw1 is SWITCH; n is NOT;)
             initialise(sw1 has 0;)
             connections(sw1 to n.I1;)
             monitors(n;)",
        );
        assert!(compilation.is_ok());
        let simulator = Simulator::new(compilation.circuit);
        let mut output = Vec::new();
        let mut ui = UserInterface::new(simulator, commands.as_bytes(), &mut output);
        ui.command_loop().unwrap();
        assert_eq!(ui.simulator().cycles_completed(), expected_cycles);
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("r 5"), Ok(Command::Run(5)));
        assert_eq!(parse_command("  c 2  "), Ok(Command::Continue(2)));
        assert_eq!(
            parse_command("s sw1 1"),
            Ok(Command::Switch("sw1".to_string(), true))
        );
        assert_eq!(
            parse_command("m d.QBAR"),
            Ok(Command::Monitor("d.QBAR".to_string()))
        );
        assert!(parse_command("r 0").is_err());
        assert!(parse_command("r").is_err());
        assert!(parse_command("s sw1 2").is_err());
        assert!(parse_command("x").is_err());
    }

    #[test]
    fn test_session_runs_and_reports_errors() {
        let output = session("c 1\nr 2\ns sw1 1\nc 2\nm sw1\nm nope\nq\nr 9\n", 4);
        assert!(output.contains("Error! Nothing to continue"));
        assert!(output.contains("n : --\n"));
        assert!(output.contains("n : --__\n"));
        assert!(output.contains("Error! 'nope' is not a signal name"));
        // Commands after 'q' are never executed.
        assert!(!output.contains("---------"));
    }

    #[test]
    fn test_session_ends_at_eof() {
        let output = session("h\n\nr 1", 1);
        assert!(output.starts_with("User commands:"));
        assert!(output.ends_with("n : -\n# "));
    }
}
