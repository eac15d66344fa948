//! Connection graph and cycle execution.
//!
//! One call to [`Network::execute_network`] simulates one logical cycle:
//!
//! 1. Clocks settle last cycle's edge and toggle when their counter reaches
//!    the half period.
//! 2. Every device is re-evaluated in registration order, in full passes,
//!    until a pass changes nothing.
//! 3. DTYPEs that saw a rising CLK latch DATA from the settled state.
//! 4. The network settles again so latched values propagate. If that
//!    raises more CLK inputs, steps 3 and 4 repeat for the newly clocked
//!    DTYPEs.
//!
//! A settle that needs more than [`Network::pass_limit`] passes means the
//! network oscillates. The cycle fails and the network is marked unsteady.

use log::{debug, warn};

use super::devices::{gate_output, name_of, Device, DeviceState, Devices};
use super::types::{DeviceKind, OutputRef, Signal};
use crate::error::{LogsimError, Result};
use crate::names::{NameId, Names};

/// Passes allowed per device when no explicit limit is configured.
pub const PASSES_PER_DEVICE: usize = 2;

/// Configuration for the execution engine.
#[derive(Debug, Clone, Default)]
pub struct NetworkConfig {
    /// Maximum evaluation passes per settle. `None` scales with device count.
    pub max_passes: Option<usize>,
}

impl NetworkConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a fixed pass limit.
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = Some(max_passes);
        self
    }
}

/// The device network and its execution engine.
#[derive(Debug, Clone)]
pub struct Network {
    devices: Devices,
    config: NetworkConfig,
    steady_state: bool,
}

impl Network {
    /// Create a network over `devices` with default configuration.
    pub fn new(devices: Devices) -> Self {
        Self::with_config(devices, NetworkConfig::default())
    }

    pub fn with_config(devices: Devices, config: NetworkConfig) -> Self {
        Self {
            devices,
            config,
            steady_state: true,
        }
    }

    pub fn devices(&self) -> &Devices {
        &self.devices
    }

    pub fn devices_mut(&mut self) -> &mut Devices {
        &mut self.devices
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// False after a cycle failed to reach a fixed point.
    pub fn steady_state(&self) -> bool {
        self.steady_state
    }

    /// Passes allowed for each settle.
    pub fn pass_limit(&self) -> usize {
        self.config
            .max_passes
            .unwrap_or(PASSES_PER_DEVICE * self.devices.len() + 1)
    }

    /// Connect an output pin to an input pin.
    ///
    /// `out_port` must be `None` for plain devices and `Q`/`QBAR` for DTYPEs.
    /// Fails if either device or port is undefined, or if the input is
    /// already driven.
    pub fn make_connection(
        &mut self,
        names: &Names,
        out_device: NameId,
        out_port: Option<NameId>,
        in_device: NameId,
        in_port: NameId,
    ) -> Result<()> {
        let source = self
            .devices
            .get_device(out_device)
            .ok_or_else(|| LogsimError::device_absent(name_of(names, out_device)))?;
        if source.output(out_port).is_none() {
            return Err(LogsimError::OutputPortAbsent {
                device: name_of(names, out_device),
                port: out_port.map(|p| name_of(names, p)).unwrap_or_default(),
            });
        }
        self.devices.connect_input(
            names,
            in_device,
            in_port,
            OutputRef::new(out_device, out_port),
        )?;
        debug!(
            "connected {} to {}.{}",
            name_of(names, out_device),
            name_of(names, in_device),
            name_of(names, in_port)
        );
        Ok(())
    }

    /// Every input with no driving output, as `(device, port)` pairs.
    pub fn check_network(&self) -> Vec<(NameId, NameId)> {
        self.devices
            .iter()
            .flat_map(|device| device.unconnected_inputs().map(move |port| (device.id, port)))
            .collect()
    }

    /// Signal arriving at an input, if it is connected.
    pub fn get_input_signal(&self, device: NameId, port: NameId) -> Option<Signal> {
        let source = self.devices.get_device(device)?.input(port)?.source?;
        self.devices.output_signal(source)
    }

    /// Signal on an output pin.
    pub fn get_output_signal(&self, device: NameId, port: Option<NameId>) -> Option<Signal> {
        self.devices.output_signal(OutputRef::new(device, port))
    }

    /// Simulate one cycle. Returns false if the network oscillates or has
    /// unconnected inputs.
    pub fn execute_network(&mut self) -> bool {
        let unconnected = self.check_network().len();
        if unconnected > 0 {
            warn!("refusing to execute: {} unconnected input(s)", unconnected);
            self.steady_state = false;
            return false;
        }

        for index in 0..self.devices.len() {
            self.devices.by_index_mut(index).clock_phase();
        }

        let limit = self.pass_limit();
        let settled = self.settle(limit).and_then(|mut passes| {
            // Latching can raise further CLK inputs, as in a ripple counter.
            // Each DTYPE latches at most once per cycle.
            while self.latch_dtypes() {
                passes += self.settle(limit)?;
            }
            Some(passes)
        });

        match settled {
            Some(passes) => {
                self.finish_cycle();
                debug!("network settled after {} passes", passes);
                self.steady_state = true;
                true
            }
            None => {
                warn!("network oscillating: no fixed point within {} passes", limit);
                self.steady_state = false;
                false
            }
        }
    }

    /// Run full passes until nothing changes. Returns the pass count, or
    /// `None` if `limit` passes were not enough.
    fn settle(&mut self, limit: usize) -> Option<usize> {
        for pass in 1..=limit {
            let mut changed = false;
            for index in 0..self.devices.len() {
                changed |= self.evaluate(index);
            }
            if !changed {
                return Some(pass);
            }
        }
        None
    }

    fn input_level(&self, device: &Device, port: NameId) -> bool {
        device
            .input(port)
            .and_then(|pin| pin.source)
            .and_then(|source| self.devices.output_signal(source))
            .is_some_and(|signal| signal.is_high())
    }

    /// Re-evaluate one device. Returns true if any output changed.
    fn evaluate(&mut self, index: usize) -> bool {
        let device = self.devices.by_index(index);
        let kind = device.kind;
        match kind {
            DeviceKind::Switch | DeviceKind::Clock => false,
            DeviceKind::Dtype => {
                let ports = self.devices.ports();
                let (q, qbar) = (ports.q, ports.qbar);
                let set = self.input_level(device, ports.set);
                let clear = self.input_level(device, ports.clear);

                let device = self.devices.by_index_mut(index);
                let DeviceState::Dtype { ref mut memory, .. } = device.state else {
                    return false;
                };
                if set {
                    *memory = Signal::High;
                } else if clear {
                    *memory = Signal::Low;
                }
                let stored = *memory;
                store_dtype_outputs(device, q, qbar, stored)
            }
            kind => {
                let levels: Vec<bool> = device
                    .inputs
                    .iter()
                    .map(|pin| self.input_level(device, pin.id))
                    .collect();
                let output = Signal::from_level(gate_output(kind, &levels));
                self.devices.by_index_mut(index).set_output(None, output)
            }
        }
    }

    /// Latch DATA into every DTYPE whose CLK rose and has not latched yet
    /// this cycle. DATA is sampled for all of them before any Q changes.
    /// Returns true if anything latched.
    fn latch_dtypes(&mut self) -> bool {
        let ports = self.devices.ports();
        let (q, qbar, data, clk, set, clear) = (
            ports.q,
            ports.qbar,
            ports.data,
            ports.clk,
            ports.set,
            ports.clear,
        );

        let mut latches = Vec::new();
        for index in 0..self.devices.len() {
            let device = self.devices.by_index(index);
            let DeviceState::Dtype { last_clock, .. } = device.state else {
                continue;
            };
            if last_clock || !self.input_level(device, clk) {
                continue;
            }
            let overridden = self.input_level(device, set) || self.input_level(device, clear);
            let latched = Signal::from_level(self.input_level(device, data));
            latches.push((index, (!overridden).then_some(latched)));
        }

        for &(index, latched) in &latches {
            let device = self.devices.by_index_mut(index);
            if let DeviceState::Dtype {
                ref mut memory,
                ref mut last_clock,
            } = device.state
            {
                // The edge is consumed even when SET or CLEAR blocks it.
                *last_clock = true;
                if let Some(latched) = latched {
                    *memory = latched;
                }
            }
            if let Some(latched) = latched {
                store_dtype_outputs(device, q, qbar, latched);
            }
        }
        !latches.is_empty()
    }

    /// Advance clock counters and remember each DTYPE's CLK level.
    fn finish_cycle(&mut self) {
        let clk = self.devices.ports().clk;
        for index in 0..self.devices.len() {
            let device = self.devices.by_index(index);
            let level = self.input_level(device, clk);
            let device = self.devices.by_index_mut(index);
            if let DeviceState::Dtype {
                ref mut last_clock, ..
            } = device.state
            {
                *last_clock = level;
            }
            device.advance_clock();
        }
    }
}

fn store_dtype_outputs(device: &mut Device, q: NameId, qbar: NameId, stored: Signal) -> bool {
    let inverse = Signal::from_level(!stored.is_high());
    let q_changed = device.set_output(Some(q), stored);
    let qbar_changed = device.set_output(Some(qbar), inverse);
    q_changed || qbar_changed
}
