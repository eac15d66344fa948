//! Run control over a compiled circuit.

use log::{info, warn};

use crate::circuit::{Circuit, DeviceKind, OutputRef};
use crate::error::{LogsimError, Result};

/// Owns a compiled [`Circuit`] and steps it cycle by cycle.
pub struct Simulator {
    circuit: Circuit,
    cycles_completed: usize,
    /// Whether `run` has been called, so `continue_run` has a state to resume
    started: bool,
}

impl Simulator {
    pub fn new(circuit: Circuit) -> Self {
        Self {
            circuit,
            cycles_completed: 0,
            started: false,
        }
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    pub fn into_circuit(self) -> Circuit {
        self.circuit
    }

    /// Cycles simulated since the last cold start.
    pub fn cycles_completed(&self) -> usize {
        self.cycles_completed
    }

    /// Cold-start the network, clear the traces and simulate `cycles` cycles.
    pub fn run(&mut self, cycles: usize) -> Result<()> {
        let unconnected = self.circuit.network.check_network().len();
        if unconnected > 0 {
            return Err(LogsimError::UnconnectedInputs { count: unconnected });
        }

        self.circuit.network.devices_mut().cold_startup();
        self.circuit.monitors.reset_monitors();
        self.cycles_completed = 0;
        self.started = true;

        info!("running for {} cycle(s)", cycles);
        self.step_cycles(cycles)
    }

    /// Simulate `cycles` more cycles from where the last run stopped.
    pub fn continue_run(&mut self, cycles: usize) -> Result<()> {
        if !self.started {
            return Err(LogsimError::NothingToContinue);
        }
        info!(
            "continuing for {} cycle(s), {} so far",
            cycles, self.cycles_completed
        );
        self.step_cycles(cycles)
    }

    fn step_cycles(&mut self, cycles: usize) -> Result<()> {
        for _ in 0..cycles {
            if !self.circuit.network.execute_network() {
                let cycle = self.cycles_completed + 1;
                warn!("network failed to settle in cycle {}", cycle);
                return Err(LogsimError::Oscillation { cycle });
            }
            self.circuit.record_signals();
            self.cycles_completed += 1;
        }
        Ok(())
    }

    /// Set a switch by name. Takes effect from the next cycle.
    pub fn set_switch(&mut self, name: &str, high: bool) -> Result<()> {
        let id = self
            .circuit
            .names
            .query(name)
            .ok_or_else(|| LogsimError::device_absent(name))?;
        let device = self
            .circuit
            .devices()
            .get_device(id)
            .ok_or_else(|| LogsimError::device_absent(name))?;
        if device.kind != DeviceKind::Switch {
            return Err(LogsimError::NotASwitch {
                name: name.to_string(),
            });
        }
        self.circuit.network.devices_mut().set_switch(id, high);
        info!("switch {} set to {}", name, u8::from(high));
        Ok(())
    }

    /// Start monitoring a signal given as `device` or `device.PORT`.
    ///
    /// Added mid-run, the trace starts at the current cycle.
    pub fn add_monitor(&mut self, signal: &str) -> Result<()> {
        let output = self.resolve(signal)?;
        let Circuit {
            names,
            network,
            monitors,
        } = &mut self.circuit;
        monitors.make_monitor(
            names,
            network.devices(),
            output.device,
            output.port,
            self.cycles_completed,
        )
    }

    /// Stop monitoring a signal given as `device` or `device.PORT`.
    pub fn remove_monitor(&mut self, signal: &str) -> Result<()> {
        let output = self.resolve(signal)?;
        if self.circuit.monitors.remove_monitor(output.device, output.port) {
            Ok(())
        } else {
            Err(LogsimError::MonitorAbsent {
                signal: signal.to_string(),
            })
        }
    }

    /// Monitored and unmonitored signal names.
    pub fn signal_names(&self) -> (Vec<String>, Vec<String>) {
        self.circuit
            .monitors
            .get_signal_names(&self.circuit.names, self.circuit.devices())
    }

    pub fn display_signals(&self) -> String {
        self.circuit.display_signals()
    }

    fn resolve(&self, signal: &str) -> Result<OutputRef> {
        self.circuit
            .devices()
            .get_signal_ids(&self.circuit.names, signal)
            .ok_or_else(|| LogsimError::unknown_signal(signal))
    }
}
