//! Core types for circuit representation.

use std::fmt;

use crate::names::NameId;

/// Maximum number of inputs on an AND/OR/NAND/NOR gate.
pub const MAX_GATE_INPUTS: u32 = 16;

/// The kinds of device a circuit can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    And,
    Or,
    Nand,
    Nor,
    Xor,
    Not,
    Dtype,
    Switch,
    Clock,
}

impl DeviceKind {
    /// All kinds, in keyword order.
    pub const ALL: [DeviceKind; 9] = [
        Self::And,
        Self::Or,
        Self::Nand,
        Self::Nor,
        Self::Xor,
        Self::Not,
        Self::Dtype,
        Self::Switch,
        Self::Clock,
    ];

    /// Parse a kind from its definition-file keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "AND" => Some(Self::And),
            "OR" => Some(Self::Or),
            "NAND" => Some(Self::Nand),
            "NOR" => Some(Self::Nor),
            "XOR" => Some(Self::Xor),
            "NOT" => Some(Self::Not),
            "DTYPE" => Some(Self::Dtype),
            "SWITCH" => Some(Self::Switch),
            "CLOCK" => Some(Self::Clock),
            _ => None,
        }
    }

    /// The definition-file keyword for this kind.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Nand => "NAND",
            Self::Nor => "NOR",
            Self::Xor => "XOR",
            Self::Not => "NOT",
            Self::Dtype => "DTYPE",
            Self::Switch => "SWITCH",
            Self::Clock => "CLOCK",
        }
    }

    /// Combinational gates: output is a pure function of the inputs.
    pub fn is_gate(&self) -> bool {
        matches!(
            self,
            Self::And | Self::Or | Self::Nand | Self::Nor | Self::Xor | Self::Not
        )
    }

    /// Qualifier used when the definition gives none, if the kind has one.
    pub fn default_qualifier(&self) -> Option<u32> {
        match self {
            Self::And | Self::Or | Self::Nand | Self::Nor | Self::Xor => Some(2),
            Self::Not => Some(1),
            Self::Dtype | Self::Switch | Self::Clock => None,
        }
    }

    /// Whether `value` is an acceptable qualifier for this kind.
    pub fn accepts_qualifier(&self, value: u32) -> bool {
        match self {
            Self::And | Self::Or | Self::Nand | Self::Nor => (1..=MAX_GATE_INPUTS).contains(&value),
            Self::Xor => value == 2,
            Self::Not => value == 1,
            Self::Switch => value <= 1,
            Self::Clock => value >= 1,
            Self::Dtype => false,
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A signal level, with edges kept for trace rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Signal {
    #[default]
    Low,
    High,
    Rising,
    Falling,
}

impl Signal {
    /// Logic level seen by a consumer of this signal.
    pub fn is_high(&self) -> bool {
        matches!(self, Self::High | Self::Rising)
    }

    /// Steady level for a logic value.
    pub fn from_level(high: bool) -> Self {
        if high {
            Self::High
        } else {
            Self::Low
        }
    }

    /// The steady level an edge settles to.
    pub fn settled(&self) -> Self {
        Self::from_level(self.is_high())
    }

    /// The edge produced by toggling this signal.
    pub fn toggled(&self) -> Self {
        if self.is_high() {
            Self::Falling
        } else {
            Self::Rising
        }
    }

    /// Character used in text traces.
    pub fn trace_char(&self) -> char {
        match self {
            Self::Low => '_',
            Self::High => '-',
            Self::Rising => '/',
            Self::Falling => '\\',
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::High => write!(f, "HIGH"),
            Self::Rising => write!(f, "RISING"),
            Self::Falling => write!(f, "FALLING"),
        }
    }
}

/// An output pin: a device and, for DTYPEs, the named port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputRef {
    pub device: NameId,
    pub port: Option<NameId>,
}

impl OutputRef {
    pub fn new(device: NameId, port: Option<NameId>) -> Self {
        Self { device, port }
    }
}
