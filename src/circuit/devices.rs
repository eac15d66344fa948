//! Device instances and their per-cycle state transitions.
//!
//! A [`Device`] holds its input pins (each remembering which output drives
//! it), its output pins with their current [`Signal`], and kind-specific
//! state. [`Devices`] owns every device in registration order.

use std::collections::HashMap;

use log::debug;

use super::types::{DeviceKind, OutputRef, Signal, MAX_GATE_INPUTS};
use crate::error::{LogsimError, Result};
use crate::names::{NameId, Names};

/// An input pin and the output driving it, if connected.
#[derive(Debug, Clone, PartialEq)]
pub struct InputPin {
    pub id: NameId,
    pub source: Option<OutputRef>,
}

/// An output pin. Plain devices have a single unnamed output.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPin {
    pub id: Option<NameId>,
    pub signal: Signal,
}

/// Kind-specific device state.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceState {
    /// Combinational gate, no memory
    Gate,
    /// Toggle switch with its configured level
    Switch { level: Signal },
    /// Clock toggling every `half_period` cycles
    Clock { half_period: u32, counter: u32 },
    /// D-type flip-flop memory and the CLK level seen at the end of the last cycle
    Dtype { memory: Signal, last_clock: bool },
}

/// A compiled device.
#[derive(Debug, Clone)]
pub struct Device {
    pub id: NameId,
    pub kind: DeviceKind,
    pub inputs: Vec<InputPin>,
    pub outputs: Vec<OutputPin>,
    pub state: DeviceState,
}

impl Device {
    /// Look up an input pin.
    pub fn input(&self, port: NameId) -> Option<&InputPin> {
        self.inputs.iter().find(|pin| pin.id == port)
    }

    fn input_mut(&mut self, port: NameId) -> Option<&mut InputPin> {
        self.inputs.iter_mut().find(|pin| pin.id == port)
    }

    /// Look up an output pin. `None` names the single output of a plain device.
    pub fn output(&self, port: Option<NameId>) -> Option<&OutputPin> {
        self.outputs.iter().find(|pin| pin.id == port)
    }

    /// Current signal on an output pin.
    pub fn output_signal(&self, port: Option<NameId>) -> Option<Signal> {
        self.output(port).map(|pin| pin.signal)
    }

    /// Set an output pin. Returns true if the signal changed.
    pub fn set_output(&mut self, port: Option<NameId>, signal: Signal) -> bool {
        match self.outputs.iter_mut().find(|pin| pin.id == port) {
            Some(pin) if pin.signal != signal => {
                pin.signal = signal;
                true
            }
            _ => false,
        }
    }

    /// Inputs with no driving output.
    pub fn unconnected_inputs(&self) -> impl Iterator<Item = NameId> + '_ {
        self.inputs
            .iter()
            .filter(|pin| pin.source.is_none())
            .map(|pin| pin.id)
    }

    /// Settle a clock edge from the previous cycle and toggle if the
    /// counter has reached the half period.
    pub fn clock_phase(&mut self) {
        let DeviceState::Clock {
            half_period,
            ref mut counter,
        } = self.state
        else {
            return;
        };
        let mut signal = self.outputs[0].signal.settled();
        if *counter >= half_period {
            *counter = 0;
            signal = signal.toggled();
        }
        self.outputs[0].signal = signal;
    }

    /// Advance a clock's tick counter after a completed cycle.
    pub fn advance_clock(&mut self) {
        if let DeviceState::Clock { ref mut counter, .. } = self.state {
            *counter += 1;
        }
    }
}

/// Output of a combinational gate for the given input levels.
pub fn gate_output(kind: DeviceKind, levels: &[bool]) -> bool {
    match kind {
        DeviceKind::And => levels.iter().all(|&l| l),
        DeviceKind::Or => levels.iter().any(|&l| l),
        DeviceKind::Nand => !levels.iter().all(|&l| l),
        DeviceKind::Nor => !levels.iter().any(|&l| l),
        DeviceKind::Xor => levels.iter().filter(|&&l| l).count() % 2 == 1,
        DeviceKind::Not => !levels.first().copied().unwrap_or(false),
        DeviceKind::Dtype | DeviceKind::Switch | DeviceKind::Clock => false,
    }
}

/// Interned IDs of every port name.
#[derive(Debug, Clone)]
pub struct PortIds {
    pub q: NameId,
    pub qbar: NameId,
    pub data: NameId,
    pub clk: NameId,
    pub set: NameId,
    pub clear: NameId,
    /// `I1`..`I16`
    pub gate_inputs: Vec<NameId>,
}

impl PortIds {
    fn new(names: &mut Names) -> Self {
        let ids = names.lookup(&["Q", "QBAR", "DATA", "CLK", "SET", "CLEAR"]);
        let gate_inputs = (1..=MAX_GATE_INPUTS)
            .map(|i| names.lookup_one(&format!("I{}", i)))
            .collect();
        Self {
            q: ids[0],
            qbar: ids[1],
            data: ids[2],
            clk: ids[3],
            set: ids[4],
            clear: ids[5],
            gate_inputs,
        }
    }

    /// DTYPE input ports.
    pub fn dtype_inputs(&self) -> [NameId; 4] {
        [self.data, self.clk, self.set, self.clear]
    }

    /// DTYPE output ports.
    pub fn dtype_outputs(&self) -> [NameId; 2] {
        [self.q, self.qbar]
    }
}

/// All devices of a circuit, in registration order.
#[derive(Debug, Clone)]
pub struct Devices {
    devices: Vec<Device>,
    index: HashMap<NameId, usize>,
    ports: PortIds,
}

pub(crate) fn name_of(names: &Names, id: NameId) -> String {
    names
        .get_name_string(id)
        .map(str::to_string)
        .unwrap_or_else(|| id.to_string())
}

impl Devices {
    /// Create an empty device set, interning the port names.
    pub fn new(names: &mut Names) -> Self {
        Self {
            devices: Vec::new(),
            index: HashMap::new(),
            ports: PortIds::new(names),
        }
    }

    /// Port name IDs.
    pub fn ports(&self) -> &PortIds {
        &self.ports
    }

    /// Create a device.
    ///
    /// `qualifier` is the initial level of a SWITCH, the half period of a
    /// CLOCK and the input count of a gate. DTYPEs take none.
    pub fn make_device(
        &mut self,
        names: &Names,
        id: NameId,
        kind: DeviceKind,
        qualifier: Option<u32>,
    ) -> Result<()> {
        if self.index.contains_key(&id) {
            return Err(LogsimError::DevicePresent {
                name: name_of(names, id),
            });
        }

        let invalid = |value: u32| LogsimError::InvalidQualifier {
            name: name_of(names, id),
            kind: kind.to_string(),
            value,
        };

        let device = match kind {
            DeviceKind::Switch => {
                let value = qualifier.ok_or_else(|| LogsimError::NoQualifier {
                    name: name_of(names, id),
                    kind: kind.to_string(),
                })?;
                if !kind.accepts_qualifier(value) {
                    return Err(invalid(value));
                }
                let level = Signal::from_level(value == 1);
                Device {
                    id,
                    kind,
                    inputs: Vec::new(),
                    outputs: vec![OutputPin { id: None, signal: level }],
                    state: DeviceState::Switch { level },
                }
            }
            DeviceKind::Clock => {
                let half_period = qualifier.ok_or_else(|| LogsimError::NoQualifier {
                    name: name_of(names, id),
                    kind: kind.to_string(),
                })?;
                if !kind.accepts_qualifier(half_period) {
                    return Err(invalid(half_period));
                }
                Device {
                    id,
                    kind,
                    inputs: Vec::new(),
                    outputs: vec![OutputPin {
                        id: None,
                        signal: Signal::Low,
                    }],
                    state: DeviceState::Clock {
                        half_period,
                        counter: 0,
                    },
                }
            }
            DeviceKind::Dtype => {
                if qualifier.is_some() {
                    return Err(LogsimError::QualifierPresent {
                        name: name_of(names, id),
                        kind: kind.to_string(),
                    });
                }
                Device {
                    id,
                    kind,
                    inputs: self
                        .ports
                        .dtype_inputs()
                        .into_iter()
                        .map(|port| InputPin {
                            id: port,
                            source: None,
                        })
                        .collect(),
                    outputs: vec![
                        OutputPin {
                            id: Some(self.ports.q),
                            signal: Signal::Low,
                        },
                        OutputPin {
                            id: Some(self.ports.qbar),
                            signal: Signal::High,
                        },
                    ],
                    state: DeviceState::Dtype {
                        memory: Signal::Low,
                        last_clock: true,
                    },
                }
            }
            _ => {
                let count = match qualifier.or(kind.default_qualifier()) {
                    Some(count) if kind.accepts_qualifier(count) => count,
                    Some(count) => return Err(invalid(count)),
                    None => 0,
                };
                Device {
                    id,
                    kind,
                    inputs: self.ports.gate_inputs[..count as usize]
                        .iter()
                        .map(|&port| InputPin {
                            id: port,
                            source: None,
                        })
                        .collect(),
                    outputs: vec![OutputPin {
                        id: None,
                        signal: Signal::Low,
                    }],
                    state: DeviceState::Gate,
                }
            }
        };

        debug!(
            "made {} device '{}' with {} input(s)",
            kind,
            name_of(names, id),
            device.inputs.len()
        );
        self.index.insert(id, self.devices.len());
        self.devices.push(device);
        Ok(())
    }

    /// Set a switch level. Returns false if `id` is not a switch.
    pub fn set_switch(&mut self, id: NameId, high: bool) -> bool {
        let Some(device) = self.get_device_mut(id) else {
            return false;
        };
        let DeviceState::Switch { ref mut level } = device.state else {
            return false;
        };
        *level = Signal::from_level(high);
        device.outputs[0].signal = *level;
        true
    }

    /// Reset every device to its power-on state.
    ///
    /// Clocks restart at phase zero with a low output, DTYPEs store LOW,
    /// gates read LOW until evaluated and switches keep their level. A CLK
    /// input that is already high at power on does not count as an edge.
    pub fn cold_startup(&mut self) {
        let ports = &self.ports;
        for device in &mut self.devices {
            match device.state {
                DeviceState::Gate => {
                    device.outputs[0].signal = Signal::Low;
                }
                DeviceState::Switch { level } => {
                    device.outputs[0].signal = level;
                }
                DeviceState::Clock {
                    ref mut counter, ..
                } => {
                    *counter = 0;
                    device.outputs[0].signal = Signal::Low;
                }
                DeviceState::Dtype {
                    ref mut memory,
                    ref mut last_clock,
                } => {
                    *memory = Signal::Low;
                    *last_clock = true;
                    device.set_output(Some(ports.q), Signal::Low);
                    device.set_output(Some(ports.qbar), Signal::High);
                }
            }
        }
    }

    /// IDs of every device of a kind, in registration order.
    pub fn find_devices(&self, kind: DeviceKind) -> Vec<NameId> {
        self.devices
            .iter()
            .filter(|device| device.kind == kind)
            .map(|device| device.id)
            .collect()
    }

    /// Look up a device.
    pub fn get_device(&self, id: NameId) -> Option<&Device> {
        self.index.get(&id).map(|&i| &self.devices[i])
    }

    pub fn get_device_mut(&mut self, id: NameId) -> Option<&mut Device> {
        self.index.get(&id).map(|&i| &mut self.devices[i])
    }

    /// Every device, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter()
    }

    pub(crate) fn by_index(&self, index: usize) -> &Device {
        &self.devices[index]
    }

    pub(crate) fn by_index_mut(&mut self, index: usize) -> &mut Device {
        &mut self.devices[index]
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Current signal on an output pin.
    pub fn output_signal(&self, output: OutputRef) -> Option<Signal> {
        self.get_device(output.device)?.output_signal(output.port)
    }

    /// Attach `source` to an input pin.
    pub(crate) fn connect_input(
        &mut self,
        names: &Names,
        device: NameId,
        port: NameId,
        source: OutputRef,
    ) -> Result<()> {
        let target = self
            .get_device_mut(device)
            .ok_or_else(|| LogsimError::device_absent(name_of(names, device)))?;
        let pin = target
            .input_mut(port)
            .ok_or_else(|| LogsimError::InputPortAbsent {
                device: name_of(names, device),
                port: name_of(names, port),
            })?;
        if pin.source.is_some() {
            return Err(LogsimError::InputConnected {
                device: name_of(names, device),
                port: name_of(names, port),
            });
        }
        pin.source = Some(source);
        Ok(())
    }

    /// Text name of an output: `"dev"` or `"dev.PORT"`.
    pub fn get_signal_name(
        &self,
        names: &Names,
        device: NameId,
        port: Option<NameId>,
    ) -> Option<String> {
        self.get_device(device)?.output(port)?;
        let device_name = names.get_name_string(device)?;
        match port {
            None => Some(device_name.to_string()),
            Some(port) => Some(format!("{}.{}", device_name, names.get_name_string(port)?)),
        }
    }

    /// Parse `"dev"` or `"dev.PORT"` back into an existing output.
    pub fn get_signal_ids(&self, names: &Names, signal: &str) -> Option<OutputRef> {
        let (device, port) = match signal.split_once('.') {
            Some((device, port)) => (device, Some(port)),
            None => (signal, None),
        };
        let device = names.query(device)?;
        let port = match port {
            Some(port) => Some(names.query(port)?),
            None => None,
        };
        self.get_device(device)?.output(port)?;
        Some(OutputRef::new(device, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Names, Devices) {
        let mut names = Names::new();
        let devices = Devices::new(&mut names);
        (names, devices)
    }

    #[test]
    fn test_make_gate_default_and_explicit_inputs() {
        let (mut names, mut devices) = setup();
        let [a, b] = [names.lookup_one("a"), names.lookup_one("b")];

        devices.make_device(&names, a, DeviceKind::And, None).unwrap();
        devices.make_device(&names, b, DeviceKind::Nor, Some(5)).unwrap();

        assert_eq!(devices.get_device(a).unwrap().inputs.len(), 2);
        let b_dev = devices.get_device(b).unwrap();
        assert_eq!(b_dev.inputs.len(), 5);
        assert_eq!(b_dev.inputs[4].id, names.query("I5").unwrap());
    }

    #[test]
    fn test_make_device_errors() {
        let (mut names, mut devices) = setup();
        let [sw, clk, d, x] = [
            names.lookup_one("sw1"),
            names.lookup_one("clk1"),
            names.lookup_one("d1"),
            names.lookup_one("x"),
        ];

        assert!(matches!(
            devices.make_device(&names, sw, DeviceKind::Switch, None),
            Err(LogsimError::NoQualifier { .. })
        ));
        assert!(matches!(
            devices.make_device(&names, sw, DeviceKind::Switch, Some(2)),
            Err(LogsimError::InvalidQualifier { value: 2, .. })
        ));
        assert!(matches!(
            devices.make_device(&names, clk, DeviceKind::Clock, Some(0)),
            Err(LogsimError::InvalidQualifier { .. })
        ));
        assert!(matches!(
            devices.make_device(&names, d, DeviceKind::Dtype, Some(1)),
            Err(LogsimError::QualifierPresent { .. })
        ));
        assert!(matches!(
            devices.make_device(&names, x, DeviceKind::Xor, Some(3)),
            Err(LogsimError::InvalidQualifier { .. })
        ));

        devices.make_device(&names, x, DeviceKind::Xor, None).unwrap();
        assert!(matches!(
            devices.make_device(&names, x, DeviceKind::Or, None),
            Err(LogsimError::DevicePresent { .. })
        ));
        assert_eq!(devices.len(), 1);
    }

    #[test]
    fn test_set_switch() {
        let (mut names, mut devices) = setup();
        let [sw, g] = [names.lookup_one("sw1"), names.lookup_one("g")];
        devices.make_device(&names, sw, DeviceKind::Switch, Some(0)).unwrap();
        devices.make_device(&names, g, DeviceKind::Not, None).unwrap();

        assert!(devices.set_switch(sw, true));
        assert_eq!(devices.output_signal(OutputRef::new(sw, None)), Some(Signal::High));
        assert!(!devices.set_switch(g, true));
        assert!(!devices.set_switch(names.lookup_one("nothing"), true));

        devices.cold_startup();
        assert_eq!(devices.output_signal(OutputRef::new(sw, None)), Some(Signal::High));
    }

    #[test]
    fn test_clock_phase_toggles_on_half_period() {
        let (mut names, mut devices) = setup();
        let clk = names.lookup_one("clk1");
        devices.make_device(&names, clk, DeviceKind::Clock, Some(2)).unwrap();
        devices.cold_startup();

        let mut trace = Vec::new();
        for _ in 0..7 {
            let device = devices.get_device_mut(clk).unwrap();
            device.clock_phase();
            trace.push(device.output_signal(None).unwrap());
            device.advance_clock();
        }
        use Signal::*;
        assert_eq!(trace, vec![Low, Low, Rising, High, Falling, Low, Rising]);
    }

    #[test]
    fn test_gate_truth_tables() {
        let cases = [[false, false], [false, true], [true, false], [true, true]];
        let expect = |kind| cases.map(|c| gate_output(kind, &c));
        assert_eq!(expect(DeviceKind::And), [false, false, false, true]);
        assert_eq!(expect(DeviceKind::Or), [false, true, true, true]);
        assert_eq!(expect(DeviceKind::Nand), [true, true, true, false]);
        assert_eq!(expect(DeviceKind::Nor), [true, false, false, false]);
        assert_eq!(expect(DeviceKind::Xor), [false, true, true, false]);
        assert!(gate_output(DeviceKind::Not, &[false]));
        assert!(!gate_output(DeviceKind::Not, &[true]));
    }

    #[test]
    fn test_find_devices_and_signal_names() {
        let (mut names, mut devices) = setup();
        let [d, a, b] = [
            names.lookup_one("d1"),
            names.lookup_one("a"),
            names.lookup_one("b"),
        ];
        devices.make_device(&names, a, DeviceKind::And, None).unwrap();
        devices.make_device(&names, d, DeviceKind::Dtype, None).unwrap();
        devices.make_device(&names, b, DeviceKind::And, Some(3)).unwrap();

        assert_eq!(devices.find_devices(DeviceKind::And), vec![a, b]);
        assert!(devices.find_devices(DeviceKind::Clock).is_empty());

        let q = devices.ports().q;
        assert_eq!(devices.get_signal_name(&names, a, None).as_deref(), Some("a"));
        assert_eq!(devices.get_signal_name(&names, d, Some(q)).as_deref(), Some("d1.Q"));
        assert_eq!(devices.get_signal_name(&names, d, None), None);
        assert_eq!(devices.get_signal_name(&names, a, Some(q)), None);

        assert_eq!(
            devices.get_signal_ids(&names, "d1.QBAR"),
            Some(OutputRef::new(d, Some(devices.ports().qbar)))
        );
        assert_eq!(devices.get_signal_ids(&names, "a"), Some(OutputRef::new(a, None)));
        assert_eq!(devices.get_signal_ids(&names, "d1"), None);
        assert_eq!(devices.get_signal_ids(&names, "zz"), None);
    }
}
