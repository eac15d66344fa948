//! Compiled circuit representation and execution.
//!
//! A [`Circuit`] bundles the name table, the device [`Network`] and the
//! [`Monitors`]. Compilation always produces a fresh bundle. A host replaces
//! its old circuit with the new one rather than editing it in place.

mod devices;
mod monitors;
mod network;
mod types;

pub use devices::{gate_output, Device, DeviceState, Devices, InputPin, OutputPin, PortIds};
pub use monitors::{MonitorEntry, Monitors};
pub use network::{Network, NetworkConfig, PASSES_PER_DEVICE};
pub use types::*;

use crate::names::Names;

/// Names, devices, connections and monitors of one compiled definition.
#[derive(Debug, Clone)]
pub struct Circuit {
    pub names: Names,
    pub network: Network,
    pub monitors: Monitors,
}

impl Circuit {
    /// Create an empty circuit with default network configuration.
    pub fn new() -> Self {
        Self::with_config(NetworkConfig::default())
    }

    pub fn with_config(config: NetworkConfig) -> Self {
        let mut names = Names::new();
        let devices = Devices::new(&mut names);
        Self {
            names,
            network: Network::with_config(devices, config),
            monitors: Monitors::new(),
        }
    }

    pub fn devices(&self) -> &Devices {
        self.network.devices()
    }

    /// Record the current outputs of every monitored signal.
    pub fn record_signals(&mut self) {
        self.monitors.record_signals(self.network.devices());
    }

    /// Render the monitor traces as text.
    pub fn display_signals(&self) -> String {
        self.monitors.display_signals(&self.names, self.network.devices())
    }
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new()
    }
}
