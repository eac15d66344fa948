//! Per-cycle signal recording for monitored outputs.

use super::devices::{name_of, Devices};
use super::types::{OutputRef, Signal};
use crate::error::{LogsimError, Result};
use crate::names::{NameId, Names};

/// One monitored output and its recorded history.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorEntry {
    pub output: OutputRef,
    /// Cycle number of the first recorded signal.
    pub first_cycle: usize,
    pub signals: Vec<Signal>,
}

/// The set of monitored outputs, in the order they were added.
#[derive(Debug, Clone, Default)]
pub struct Monitors {
    entries: Vec<MonitorEntry>,
}

impl Monitors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start monitoring an output.
    ///
    /// `cycles_completed` is the number of cycles already simulated. The
    /// trace of a monitor added mid-run starts blank up to that point.
    pub fn make_monitor(
        &mut self,
        names: &Names,
        devices: &Devices,
        device: NameId,
        port: Option<NameId>,
        cycles_completed: usize,
    ) -> Result<()> {
        let target = devices
            .get_device(device)
            .ok_or_else(|| LogsimError::device_absent(name_of(names, device)))?;
        if target.output(port).is_none() {
            return Err(LogsimError::OutputPortAbsent {
                device: name_of(names, device),
                port: port.map(|p| name_of(names, p)).unwrap_or_default(),
            });
        }
        let output = OutputRef::new(device, port);
        if self.entry(output).is_some() {
            return Err(LogsimError::MonitorPresent {
                signal: devices
                    .get_signal_name(names, device, port)
                    .unwrap_or_else(|| name_of(names, device)),
            });
        }
        self.entries.push(MonitorEntry {
            output,
            first_cycle: cycles_completed,
            signals: Vec::new(),
        });
        Ok(())
    }

    /// Stop monitoring an output. Returns false if it was not monitored.
    pub fn remove_monitor(&mut self, device: NameId, port: Option<NameId>) -> bool {
        let output = OutputRef::new(device, port);
        let before = self.entries.len();
        self.entries.retain(|entry| entry.output != output);
        self.entries.len() != before
    }

    /// Append the current signal of every monitored output.
    pub fn record_signals(&mut self, devices: &Devices) {
        for entry in &mut self.entries {
            let signal = devices.output_signal(entry.output).unwrap_or_default();
            entry.signals.push(signal);
        }
    }

    /// Clear every recorded history, keeping the monitor set.
    pub fn reset_monitors(&mut self) {
        for entry in &mut self.entries {
            entry.first_cycle = 0;
            entry.signals.clear();
        }
    }

    /// Monitored outputs, in the order they were added.
    pub fn entries(&self) -> &[MonitorEntry] {
        &self.entries
    }

    pub fn entry(&self, output: OutputRef) -> Option<&MonitorEntry> {
        self.entries.iter().find(|entry| entry.output == output)
    }

    /// Recorded history of an output, if it is monitored.
    pub fn get_monitor_signals(&self, device: NameId, port: Option<NameId>) -> Option<&[Signal]> {
        self.entry(OutputRef::new(device, port))
            .map(|entry| entry.signals.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Length of the longest monitored signal name.
    pub fn get_margin(&self, names: &Names, devices: &Devices) -> usize {
        self.entries
            .iter()
            .filter_map(|entry| {
                devices.get_signal_name(names, entry.output.device, entry.output.port)
            })
            .map(|name| name.len())
            .max()
            .unwrap_or(0)
    }

    /// Names of monitored and unmonitored outputs, in device order.
    pub fn get_signal_names(&self, names: &Names, devices: &Devices) -> (Vec<String>, Vec<String>) {
        let monitored = self
            .entries
            .iter()
            .filter_map(|entry| {
                devices.get_signal_name(names, entry.output.device, entry.output.port)
            })
            .collect();

        let mut unmonitored = Vec::new();
        for device in devices.iter() {
            for pin in &device.outputs {
                if self.entry(OutputRef::new(device.id, pin.id)).is_some() {
                    continue;
                }
                if let Some(name) = devices.get_signal_name(names, device.id, pin.id) {
                    unmonitored.push(name);
                }
            }
        }
        (monitored, unmonitored)
    }

    /// Render every trace as text, one row per monitor.
    pub fn display_signals(&self, names: &Names, devices: &Devices) -> String {
        let margin = self.get_margin(names, devices);
        let mut out = String::new();
        for entry in &self.entries {
            let name = devices
                .get_signal_name(names, entry.output.device, entry.output.port)
                .unwrap_or_default();
            out.push_str(&format!("{:<width$} : ", name, width = margin));
            out.extend(std::iter::repeat(' ').take(entry.first_cycle));
            out.extend(entry.signals.iter().map(Signal::trace_char));
            out.push('\n');
        }
        out
    }
}
