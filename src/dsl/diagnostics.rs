//! Error records accumulated while parsing a definition.

use std::fmt;

use thiserror::Error;

use super::scanner::Keyword;

/// Malformed token sequences.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("expected the '{0}' block")]
    ExpectedBlock(Keyword),

    #[error("expected '(' to open the block")]
    ExpectedOpenBracket,

    #[error("missing ')' to close the '{0}' block")]
    MissingCloseBracket(Keyword),

    #[error("expected a device name, found {found}")]
    ExpectedName { found: String },

    #[error("device names must be lowercase letters and digits, found '{name}'")]
    InvalidDeviceName { name: String },

    #[error("expected 'is' or 'are', found {found}")]
    ExpectedIsOrAre { found: String },

    #[error("expected a device type, found {found}")]
    ExpectedDeviceType { found: String },

    #[error("expected 'has' or 'have', found {found}")]
    ExpectedHasOrHave { found: String },

    #[error("expected a number, found {found}")]
    ExpectedNumber { found: String },

    #[error("expected 'to', found {found}")]
    ExpectedTo { found: String },

    #[error("missing '.' before port '{port}'")]
    MissingDot { port: String },

    #[error("'{device}' has a single output and takes no port")]
    UnexpectedDot { device: String },

    #[error("expected a port name, found {found}")]
    ExpectedPort { found: String },

    #[error("expected ';', found {found}")]
    ExpectedSemicolon { found: String },

    #[error("unrecognised character {found}")]
    UnrecognisedCharacter { found: String },

    #[error("unexpected {found} after the 'monitors' block")]
    ExpectedEof { found: String },
}

/// Well-formed statements with an invalid meaning.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SemanticError {
    #[error("'{name}' is already defined")]
    Redefinition { name: String },

    #[error("'{name}' is not a defined device")]
    UndefinedDevice { name: String },

    #[error("'{name}' is reserved for {reserved_for} devices and cannot be a {kind}")]
    ReservedName {
        name: String,
        reserved_for: String,
        kind: String,
    },

    #[error("{kind} names must look like '{pattern}', found '{name}'")]
    IllegalName {
        name: String,
        kind: String,
        pattern: &'static str,
    },

    #[error("{value} is not a valid qualifier for {kind} device '{name}'")]
    InvalidQualifier {
        name: String,
        kind: String,
        value: u32,
    },

    #[error("{kind} device '{name}' takes no qualifier")]
    QualifierPresent { name: String, kind: String },

    #[error("{kind} device '{name}' is never initialised")]
    NotInitialised { name: String, kind: String },

    #[error("'{name}' is already initialised")]
    AlreadyInitialised { name: String },

    #[error("DTYPE output '{device}' needs a port, '.Q' or '.QBAR'")]
    MissingOutputPort { device: String },

    #[error("'{device}' has no input '{port}'")]
    InputPortAbsent { device: String, port: String },

    #[error("'{device}' has no output '{port}'")]
    OutputPortAbsent { device: String, port: String },

    #[error("input '{device}.{port}' is already connected")]
    InputConnected { device: String, port: String },

    #[error("input '{device}.{port}' is not connected")]
    InputNotConnected { device: String, port: String },

    #[error("'{signal}' is already monitored")]
    MonitorPresent { signal: String },

    #[error("{message}")]
    Rejected { message: String },
}

/// Syntax or semantic error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax(SyntaxError),
    Semantic(SemanticError),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax(error) => write!(f, "Syntax error: {}", error),
            Self::Semantic(error) => write!(f, "Semantic error: {}", error),
        }
    }
}

impl From<SyntaxError> for ErrorKind {
    fn from(error: SyntaxError) -> Self {
        Self::Syntax(error)
    }
}

impl From<SemanticError> for ErrorKind {
    fn from(error: SemanticError) -> Self {
        Self::Semantic(error)
    }
}

/// One recorded error with its source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub line: usize,
    pub position: usize,
    /// Offending source line with a caret marker and the message
    pub context: String,
}

impl Diagnostic {
    pub fn is_syntax(&self) -> bool {
        matches!(self.kind, ErrorKind::Syntax(_))
    }

    pub fn is_semantic(&self) -> bool {
        matches!(self.kind, ErrorKind::Semantic(_))
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line {}, column {}: {}", self.line, self.position, self.kind)
    }
}
