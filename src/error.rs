//! Error types for the logic simulator.
//!
//! [`LogsimError`] covers failures of the construction operations on
//! devices, connections and monitors, source loading, and simulation.
//! Parse problems are not raised through this type: the parser collects
//! them as [`Diagnostic`](crate::dsl::Diagnostic)s and keeps going.

use thiserror::Error;

/// Result type alias using [`LogsimError`].
pub type Result<T> = std::result::Result<T, LogsimError>;

/// Unified error type for all logsim operations.
#[derive(Error, Debug)]
pub enum LogsimError {
    // ============ Source Errors ============
    /// Error reading a definition file
    #[error("Failed to read definition file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Definition did not compile
    #[error("Definition has {count} error(s)")]
    CompileFailed { count: usize },

    // ============ Device Errors ============
    /// A device with this name already exists
    #[error("Device '{name}' is already defined")]
    DevicePresent { name: String },

    /// Qualifier out of range for the device kind
    #[error("Invalid qualifier {value} for {kind} device '{name}'")]
    InvalidQualifier {
        name: String,
        kind: String,
        value: u32,
    },

    /// Device kind requires a qualifier that was not given
    #[error("{kind} device '{name}' needs a qualifier")]
    NoQualifier { name: String, kind: String },

    /// Device kind takes no qualifier but one was given
    #[error("{kind} device '{name}' takes no qualifier")]
    QualifierPresent { name: String, kind: String },

    /// Referenced device does not exist
    #[error("Device '{name}' does not exist")]
    DeviceAbsent { name: String },

    /// Device is not a switch
    #[error("Device '{name}' is not a switch")]
    NotASwitch { name: String },

    // ============ Connection Errors ============
    /// Input port does not exist on the device
    #[error("Device '{device}' has no input '{port}'")]
    InputPortAbsent { device: String, port: String },

    /// Output port does not exist on the device
    #[error("Device '{device}' has no output '{port}'")]
    OutputPortAbsent { device: String, port: String },

    /// Input already driven by another output
    #[error("Input '{device}.{port}' is already connected")]
    InputConnected { device: String, port: String },

    // ============ Monitor Errors ============
    /// Signal is already monitored
    #[error("Signal '{signal}' is already monitored")]
    MonitorPresent { signal: String },

    /// Signal is not monitored
    #[error("Signal '{signal}' is not monitored")]
    MonitorAbsent { signal: String },

    /// Text does not name an output signal
    #[error("'{signal}' is not a signal name")]
    UnknownSignal { signal: String },

    // ============ Simulation Errors ============
    /// The network failed to settle
    #[error("Network oscillating during cycle {cycle}")]
    Oscillation { cycle: usize },

    /// The network has unconnected inputs
    #[error("Network has {count} unconnected input(s)")]
    UnconnectedInputs { count: usize },

    /// Continue requested before any run
    #[error("Nothing to continue, run the network first")]
    NothingToContinue,

    // ============ Interface Errors ============
    /// Reading a command or writing a reply failed
    #[error("Interface I/O error: {message}")]
    InterfaceError { message: String },
}

impl LogsimError {
    /// Create a device-absent error
    pub fn device_absent(name: impl Into<String>) -> Self {
        Self::DeviceAbsent { name: name.into() }
    }

    /// Create an unknown-signal error
    pub fn unknown_signal(signal: impl Into<String>) -> Self {
        Self::UnknownSignal {
            signal: signal.into(),
        }
    }
}
