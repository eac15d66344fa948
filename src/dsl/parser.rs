//! Recursive-descent parser with error recovery.
//!
//! The parser drives the [`Scanner`] and builds devices, connections and
//! monitors straight into a [`Circuit`]. Errors never stop the parse. Each
//! one is recorded as a [`Diagnostic`], then the parser resynchronises
//! with [`Parser::skip_statement`] (next `;`) or [`Parser::skip_block`]
//! (next block keyword) and carries on.

use std::collections::HashMap;

use log::{debug, info};

use super::diagnostics::{Diagnostic, ErrorKind, SemanticError, SyntaxError};
use super::scanner::{Keyword, Scanner, Symbol, SymbolType};
use crate::circuit::{Circuit, DeviceKind};
use crate::error::LogsimError;
use crate::names::NameId;

/// Whether `name` may be used for a SWITCH: `sw` followed by digits only.
pub fn is_switch_legal(name: &str) -> bool {
    reserved_suffix(name, "sw")
}

/// Whether `name` may be used for a CLOCK: `clk` followed by digits only.
pub fn is_clock_legal(name: &str) -> bool {
    reserved_suffix(name, "clk")
}

fn reserved_suffix(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .is_some_and(|rest| rest.chars().all(|c| c.is_ascii_digit()))
}

/// A device declared in the `devices` block.
#[derive(Debug, Clone)]
struct Declaration {
    kind: DeviceKind,
    symbol: Symbol,
    qualifier: Option<u32>,
}

/// A `name[.port]` reference.
#[derive(Debug, Clone)]
struct SignalRef {
    device: NameId,
    symbol: Symbol,
    port: Option<(NameId, Symbol)>,
}

impl SignalRef {
    fn port_id(&self) -> Option<NameId> {
        self.port.as_ref().map(|(id, _)| *id)
    }
}

/// Parser for circuit definitions.
pub struct Parser<'a> {
    scanner: Scanner<'a>,
    circuit: Circuit,
    symbol: Symbol,
    errors: Vec<Diagnostic>,
    /// Every device name declared so far, across the whole file
    names_parsed: HashMap<NameId, Declaration>,
    /// Declaration order, which becomes device registration order
    declared: Vec<NameId>,
    in_block: bool,
    devices_built: bool,
}

impl<'a> Parser<'a> {
    /// Create a parser that builds into `circuit`.
    ///
    /// The scanner must have been created over `circuit.names`.
    pub fn new(mut scanner: Scanner<'a>, mut circuit: Circuit) -> Self {
        let symbol = scanner.get_symbol(&mut circuit.names);
        Self {
            scanner,
            circuit,
            symbol,
            errors: Vec::new(),
            names_parsed: HashMap::new(),
            declared: Vec::new(),
            in_block: false,
            devices_built: false,
        }
    }

    /// Parse the whole definition.
    ///
    /// Returns true if no syntax or semantic errors were found. The errors
    /// are available from [`Parser::errors`] either way.
    pub fn parse_network(&mut self) -> bool {
        self.parse_block(Keyword::Devices, Self::device_statement);
        self.parse_block(Keyword::Initialise, Self::init_statement);
        self.build_devices();
        self.parse_block(Keyword::Connections, Self::connection_statement);
        self.check_connections();
        self.parse_block(Keyword::Monitors, Self::monitor_statement);

        if self.symbol.kind != SymbolType::Eof {
            let found = self.describe(&self.symbol);
            self.syntax_error(SyntaxError::ExpectedEof { found });
        }

        info!(
            "parsed {} device(s), {} monitor(s), {} error(s)",
            self.circuit.devices().len(),
            self.circuit.monitors.len(),
            self.errors.len()
        );
        self.errors.is_empty()
    }

    /// Errors recorded so far, in source order of discovery.
    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// Give up the built circuit and the recorded errors.
    pub fn into_parts(self) -> (Circuit, Vec<Diagnostic>) {
        (self.circuit, self.errors)
    }

    // ============ Token handling ============

    fn advance(&mut self) {
        self.symbol = self.scanner.get_symbol(&mut self.circuit.names);
    }

    fn name_text(&self, id: NameId) -> String {
        self.circuit
            .names
            .get_name_string(id)
            .unwrap_or_default()
            .to_string()
    }

    fn describe(&self, symbol: &Symbol) -> String {
        match (&symbol.kind, symbol.id, symbol.number) {
            (SymbolType::Name, Some(id), _) => format!("name '{}'", self.name_text(id)),
            (SymbolType::Number, _, Some(value)) => format!("number {}", value),
            (kind, _, _) => kind.to_string(),
        }
    }

    // ============ Error recording and recovery ============

    fn error_at(&mut self, symbol: &Symbol, kind: ErrorKind) {
        let context =
            self.scanner
                .print_error_line(symbol.line_number, symbol.line_position, &kind.to_string());
        debug!("{}:{}: {}", symbol.line_number, symbol.line_position, kind);
        self.errors.push(Diagnostic {
            kind,
            line: symbol.line_number,
            position: symbol.line_position,
            context,
        });
    }

    fn syntax_error(&mut self, error: SyntaxError) {
        let symbol = self.symbol.clone();
        self.error_at(&symbol, error.into());
    }

    fn semantic_error_at(&mut self, symbol: &Symbol, error: SemanticError) {
        self.error_at(symbol, error.into());
    }

    /// Record that the current symbol is not what the grammar expects.
    /// Unrecognised characters are reported as such.
    fn unexpected(&mut self, make: impl FnOnce(String) -> SyntaxError) {
        let error = match &self.symbol.kind {
            SymbolType::Unknown(text) => SyntaxError::UnrecognisedCharacter {
                found: format!("'{}'", text),
            },
            _ => make(self.describe(&self.symbol)),
        };
        self.syntax_error(error);
    }

    /// Skip to the end of the current statement.
    ///
    /// Consumes up to and including the next `;`, but stops in front of a
    /// `)`, a block keyword or end of file.
    pub fn skip_statement(&mut self) {
        if !self.in_block {
            self.skip_block();
            return;
        }
        loop {
            match self.symbol.kind {
                SymbolType::Semicolon => {
                    self.advance();
                    return;
                }
                SymbolType::CloseBracket => return,
                _ if self.symbol.is_block_boundary() => return,
                _ => self.advance(),
            }
        }
    }

    /// Skip to the next block keyword or end of file.
    pub fn skip_block(&mut self) {
        while !self.symbol.is_block_boundary() {
            self.advance();
        }
    }

    fn expect_semicolon(&mut self) -> bool {
        if self.symbol.kind == SymbolType::Semicolon {
            self.advance();
            true
        } else {
            self.unexpected(|found| SyntaxError::ExpectedSemicolon { found });
            self.skip_statement();
            false
        }
    }

    // ============ Blocks ============

    fn parse_block(&mut self, keyword: Keyword, statement: fn(&mut Self)) {
        if !self.symbol.is_keyword(keyword) {
            self.syntax_error(SyntaxError::ExpectedBlock(keyword));
            if !self.symbol.is_block_boundary() {
                self.skip_block();
            }
            if !self.symbol.is_keyword(keyword) {
                return;
            }
        }
        self.advance();

        if self.symbol.kind != SymbolType::OpenBracket {
            self.syntax_error(SyntaxError::ExpectedOpenBracket);
            self.skip_block();
            return;
        }
        self.advance();

        debug!("parsing '{}' block", keyword);
        self.in_block = true;
        loop {
            if self.symbol.kind == SymbolType::CloseBracket {
                self.advance();
                break;
            }
            if self.symbol.is_block_boundary() {
                self.syntax_error(SyntaxError::MissingCloseBracket(keyword));
                break;
            }
            statement(self);
        }
        self.in_block = false;
    }

    /// Parse a device name: a NAME of lowercase letters and digits.
    fn device_name(&mut self) -> Option<(NameId, Symbol)> {
        let symbol = self.symbol.clone();
        let id = match (&symbol.kind, symbol.id) {
            (SymbolType::Name, Some(id)) => id,
            _ => {
                self.unexpected(|found| SyntaxError::ExpectedName { found });
                return None;
            }
        };
        let name = self.name_text(id);
        if name.chars().any(|c| c.is_ascii_uppercase()) {
            self.syntax_error(SyntaxError::InvalidDeviceName { name });
            return None;
        }
        self.advance();
        Some((id, symbol))
    }

    /// Parse `name[.port]`.
    fn signal(&mut self) -> Option<SignalRef> {
        let (device, symbol) = self.device_name()?;
        let port = match self.symbol.kind {
            SymbolType::Dot => {
                self.advance();
                let port_symbol = self.symbol.clone();
                match (&port_symbol.kind, port_symbol.id) {
                    (SymbolType::Name, Some(id)) => {
                        self.advance();
                        Some((id, port_symbol))
                    }
                    _ => {
                        self.unexpected(|found| SyntaxError::ExpectedPort { found });
                        return None;
                    }
                }
            }
            SymbolType::Name => {
                let port = self.symbol.id.map(|id| self.name_text(id)).unwrap_or_default();
                self.syntax_error(SyntaxError::MissingDot { port });
                return None;
            }
            _ => None,
        };
        Some(SignalRef {
            device,
            symbol,
            port,
        })
    }

    /// Check a signal used as an output. `Err` means a syntax error was
    /// recorded, `Ok(false)` a semantic one.
    fn check_output(&mut self, signal: &SignalRef) -> Result<bool, ()> {
        let device = self.name_text(signal.device);
        match self.names_parsed.get(&signal.device).map(|d| d.kind) {
            None => {
                self.semantic_error_at(&signal.symbol, SemanticError::UndefinedDevice { name: device });
                Ok(false)
            }
            Some(DeviceKind::Dtype) if signal.port.is_none() => {
                self.semantic_error_at(&signal.symbol, SemanticError::MissingOutputPort { device });
                Ok(false)
            }
            Some(DeviceKind::Dtype) => Ok(true),
            Some(_) => match &signal.port {
                Some((_, port_symbol)) => {
                    let port_symbol = port_symbol.clone();
                    self.error_at(&port_symbol, SyntaxError::UnexpectedDot { device }.into());
                    Err(())
                }
                None => Ok(true),
            },
        }
    }

    fn report_rejection(&mut self, symbol: &Symbol, error: LogsimError) {
        let semantic = match error {
            LogsimError::DevicePresent { name } => SemanticError::Redefinition { name },
            LogsimError::DeviceAbsent { name } => SemanticError::UndefinedDevice { name },
            LogsimError::InvalidQualifier { name, kind, value } => {
                SemanticError::InvalidQualifier { name, kind, value }
            }
            LogsimError::QualifierPresent { name, kind } => {
                SemanticError::QualifierPresent { name, kind }
            }
            LogsimError::NoQualifier { name, kind } => SemanticError::NotInitialised { name, kind },
            LogsimError::InputPortAbsent { device, port } => {
                SemanticError::InputPortAbsent { device, port }
            }
            LogsimError::OutputPortAbsent { device, port } => {
                SemanticError::OutputPortAbsent { device, port }
            }
            LogsimError::InputConnected { device, port } => {
                SemanticError::InputConnected { device, port }
            }
            LogsimError::MonitorPresent { signal } => SemanticError::MonitorPresent { signal },
            other => SemanticError::Rejected {
                message: other.to_string(),
            },
        };
        self.semantic_error_at(symbol, semantic);
    }

    // ============ devices ============

    /// `name {, name} (is|are) TYPE ;`
    fn device_statement(&mut self) {
        let mut names = Vec::new();
        loop {
            let Some(name) = self.device_name() else {
                self.skip_statement();
                return;
            };
            names.push(name);
            if self.symbol.kind != SymbolType::Comma {
                break;
            }
            self.advance();
        }

        if !(self.symbol.is_keyword(Keyword::Is) || self.symbol.is_keyword(Keyword::Are)) {
            self.unexpected(|found| SyntaxError::ExpectedIsOrAre { found });
            self.skip_statement();
            return;
        }
        self.advance();

        let Some(Keyword::Device(kind)) = self.symbol.keyword() else {
            self.unexpected(|found| SyntaxError::ExpectedDeviceType { found });
            self.skip_statement();
            return;
        };
        self.advance();

        for (id, symbol) in names {
            self.declare(id, symbol, kind);
        }
        self.expect_semicolon();
    }

    fn declare(&mut self, id: NameId, symbol: Symbol, kind: DeviceKind) {
        let name = self.name_text(id);
        if self.names_parsed.contains_key(&id) {
            self.semantic_error_at(&symbol, SemanticError::Redefinition { name });
            return;
        }

        let reserved = [
            (DeviceKind::Switch, is_switch_legal(&name), "sw[0-9]*"),
            (DeviceKind::Clock, is_clock_legal(&name), "clk[0-9]*"),
        ];
        for (reserved_kind, matches, pattern) in reserved {
            if kind == reserved_kind && !matches {
                self.semantic_error_at(
                    &symbol,
                    SemanticError::IllegalName {
                        name: name.clone(),
                        kind: kind.to_string(),
                        pattern,
                    },
                );
            } else if kind != reserved_kind && matches {
                self.semantic_error_at(
                    &symbol,
                    SemanticError::ReservedName {
                        name: name.clone(),
                        reserved_for: reserved_kind.to_string(),
                        kind: kind.to_string(),
                    },
                );
            }
        }

        self.names_parsed.insert(
            id,
            Declaration {
                kind,
                symbol,
                qualifier: None,
            },
        );
        self.declared.push(id);
    }

    // ============ initialise ============

    /// `name {, name} (has|have) NUMBER [inputs] ;`
    fn init_statement(&mut self) {
        let mut targets = Vec::new();
        loop {
            let Some((id, symbol)) = self.device_name() else {
                self.skip_statement();
                return;
            };
            if self.names_parsed.contains_key(&id) {
                targets.push((id, symbol));
            } else {
                let name = self.name_text(id);
                self.semantic_error_at(&symbol, SemanticError::UndefinedDevice { name });
            }
            if self.symbol.kind != SymbolType::Comma {
                break;
            }
            self.advance();
        }

        if !(self.symbol.is_keyword(Keyword::Has) || self.symbol.is_keyword(Keyword::Have)) {
            self.unexpected(|found| SyntaxError::ExpectedHasOrHave { found });
            self.skip_statement();
            return;
        }
        self.advance();

        let value_symbol = self.symbol.clone();
        let Some(value) = value_symbol.number.filter(|_| value_symbol.kind == SymbolType::Number)
        else {
            self.unexpected(|found| SyntaxError::ExpectedNumber { found });
            self.skip_statement();
            return;
        };
        self.advance();

        let counts_inputs = self.symbol.is_keyword(Keyword::Inputs);
        if counts_inputs {
            self.advance();
        }
        if !self.expect_semicolon() {
            return;
        }

        for (id, symbol) in targets {
            self.initialise(id, &symbol, value, counts_inputs);
        }
    }

    fn initialise(&mut self, id: NameId, symbol: &Symbol, value: u32, counts_inputs: bool) {
        let name = self.name_text(id);
        let Some(declaration) = self.names_parsed.get(&id) else {
            return;
        };
        let kind = declaration.kind;

        let error = if declaration.qualifier.is_some() {
            Some(SemanticError::AlreadyInitialised { name })
        } else if kind == DeviceKind::Dtype {
            Some(SemanticError::QualifierPresent {
                name,
                kind: kind.to_string(),
            })
        } else if (counts_inputs && !kind.is_gate()) || !kind.accepts_qualifier(value) {
            Some(SemanticError::InvalidQualifier {
                name,
                kind: kind.to_string(),
                value,
            })
        } else {
            None
        };

        match error {
            Some(error) => self.semantic_error_at(symbol, error),
            None => {
                if let Some(declaration) = self.names_parsed.get_mut(&id) {
                    declaration.qualifier = Some(value);
                }
            }
        }
    }

    /// Create every declared device, in declaration order.
    fn build_devices(&mut self) {
        if self.devices_built {
            return;
        }
        self.devices_built = true;

        for id in self.declared.clone() {
            let Some(declaration) = self.names_parsed.get(&id).cloned() else {
                continue;
            };
            let qualifier = match (declaration.kind, declaration.qualifier) {
                (DeviceKind::Switch | DeviceKind::Clock, None) => {
                    let name = self.name_text(id);
                    self.semantic_error_at(
                        &declaration.symbol,
                        SemanticError::NotInitialised {
                            name,
                            kind: declaration.kind.to_string(),
                        },
                    );
                    Some(if declaration.kind == DeviceKind::Clock { 1 } else { 0 })
                }
                (_, qualifier) => qualifier,
            };

            let Circuit { names, network, .. } = &mut self.circuit;
            if let Err(error) =
                network
                    .devices_mut()
                    .make_device(names, id, declaration.kind, qualifier)
            {
                self.report_rejection(&declaration.symbol, error);
            }
        }
    }

    // ============ connections ============

    /// `source[.port] to dest.port ;`
    fn connection_statement(&mut self) {
        let Some(source) = self.signal() else {
            self.skip_statement();
            return;
        };
        let Ok(mut valid) = self.check_output(&source) else {
            self.skip_statement();
            return;
        };

        if !self.symbol.is_keyword(Keyword::To) {
            self.unexpected(|found| SyntaxError::ExpectedTo { found });
            self.skip_statement();
            return;
        }
        self.advance();

        let Some(dest) = self.signal() else {
            self.skip_statement();
            return;
        };
        let Some((in_port, port_symbol)) = dest.port.clone() else {
            self.unexpected(|found| SyntaxError::ExpectedPort { found });
            self.skip_statement();
            return;
        };
        if !self.names_parsed.contains_key(&dest.device) {
            let name = self.name_text(dest.device);
            self.semantic_error_at(&dest.symbol, SemanticError::UndefinedDevice { name });
            valid = false;
        }

        if !self.expect_semicolon() || !valid {
            return;
        }

        let Circuit { names, network, .. } = &mut self.circuit;
        let result =
            network.make_connection(names, source.device, source.port_id(), dest.device, in_port);
        if let Err(error) = result {
            let at = match error {
                LogsimError::OutputPortAbsent { .. } => source
                    .port
                    .as_ref()
                    .map(|(_, symbol)| symbol.clone())
                    .unwrap_or(source.symbol),
                _ => port_symbol,
            };
            self.report_rejection(&at, error);
        }
    }

    /// Report every input left without a driver.
    fn check_connections(&mut self) {
        for (device, port) in self.circuit.network.check_network() {
            let Some(declaration) = self.names_parsed.get(&device) else {
                continue;
            };
            let symbol = declaration.symbol.clone();
            let error = SemanticError::InputNotConnected {
                device: self.name_text(device),
                port: self.name_text(port),
            };
            self.semantic_error_at(&symbol, error);
        }
    }

    // ============ monitors ============

    /// `signal {, signal} ;`
    fn monitor_statement(&mut self) {
        let mut signals = Vec::new();
        loop {
            let Some(signal) = self.signal() else {
                self.skip_statement();
                return;
            };
            match self.check_output(&signal) {
                Ok(true) => signals.push(signal),
                Ok(false) => {}
                Err(()) => {
                    self.skip_statement();
                    return;
                }
            }
            if self.symbol.kind != SymbolType::Comma {
                break;
            }
            self.advance();
        }
        if !self.expect_semicolon() {
            return;
        }

        for signal in signals {
            let Circuit {
                names,
                network,
                monitors,
            } = &mut self.circuit;
            let result =
                monitors.make_monitor(names, network.devices(), signal.device, signal.port_id(), 0);
            if let Err(error) = result {
                let at = signal
                    .port
                    .as_ref()
                    .map(|(_, symbol)| symbol.clone())
                    .unwrap_or_else(|| signal.symbol.clone());
                self.report_rejection(&at, error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{OutputRef, Signal};

    fn parse(source: &str) -> (bool, Circuit, Vec<Diagnostic>) {
        let mut circuit = Circuit::new();
        let scanner = Scanner::new(source, &mut circuit.names);
        let mut parser = Parser::new(scanner, circuit);
        let ok = parser.parse_network();
        let (circuit, errors) = parser.into_parts();
        (ok, circuit, errors)
    }

    fn semantic(errors: &[Diagnostic]) -> Vec<&SemanticError> {
        errors
            .iter()
            .filter_map(|e| match &e.kind {
                ErrorKind::Semantic(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    fn syntax(errors: &[Diagnostic]) -> Vec<&SyntaxError> {
        errors
            .iter()
            .filter_map(|e| match &e.kind {
                ErrorKind::Syntax(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    const AND_OF_SWITCHES: &str = "
        devices(
            sw1, sw2 are SWITCH;
            a is AND;   # two inputs by default
        )
        initialise(
            sw1, sw2 have 1;
        )
        connections(
            sw1 to a.I1;
            sw2 to a.I2;
        )
        monitors(
            a;
        )";

    #[test]
    fn test_valid_definition() {
        let (ok, circuit, errors) = parse(AND_OF_SWITCHES);
        assert!(ok, "{:?}", errors);
        assert_eq!(circuit.devices().len(), 3);
        assert_eq!(circuit.monitors.len(), 1);
        assert!(circuit.network.check_network().is_empty());
    }

    #[test]
    fn test_unconnected_inputs_reported() {
        let (ok, _, errors) =
            parse("devices(sw1 is SWITCH; a is AND;) initialise(sw1 has 0;) connections() monitors(a;)");
        assert!(!ok);
        let unconnected: Vec<_> = semantic(&errors)
            .into_iter()
            .filter(|e| matches!(e, SemanticError::InputNotConnected { device, .. } if device == "a"))
            .collect();
        assert_eq!(unconnected.len(), 2);
    }

    #[test]
    fn test_redefinition_across_blocks() {
        let (ok, circuit, errors) = parse(
            "devices(a is AND; b is OR; a is NAND;) initialise() connections() monitors()",
        );
        assert!(!ok);
        assert!(semantic(&errors)
            .iter()
            .any(|e| matches!(e, SemanticError::Redefinition { name } if name == "a")));
        let a = circuit.names.query("a").unwrap();
        assert_eq!(circuit.devices().get_device(a).unwrap().kind, DeviceKind::And);
    }

    #[test]
    fn test_reserved_and_illegal_names() {
        let (_, _, errors) = parse(
            "devices(sw1 is AND; toggle is SWITCH; clk2 is OR; tick is CLOCK; swap is NOT;) \
             initialise(toggle has 1; tick has 3;) connections() monitors()",
        );
        let errors = semantic(&errors);
        assert!(errors.iter().any(
            |e| matches!(e, SemanticError::ReservedName { name, .. } if name == "sw1")
        ));
        assert!(errors.iter().any(
            |e| matches!(e, SemanticError::IllegalName { name, .. } if name == "toggle")
        ));
        assert!(errors.iter().any(
            |e| matches!(e, SemanticError::ReservedName { name, .. } if name == "clk2")
        ));
        assert!(errors.iter().any(
            |e| matches!(e, SemanticError::IllegalName { name, .. } if name == "tick")
        ));
        assert!(!errors.iter().any(|e| matches!(
            e,
            SemanticError::ReservedName { name, .. } | SemanticError::IllegalName { name, .. }
                if name == "swap"
        )));
    }

    #[test]
    fn test_switch_and_clock_name_predicates() {
        for name in ["sw", "sw0", "sw1", "sw42", "sw007"] {
            assert!(is_switch_legal(name), "{}", name);
        }
        for name in ["swa", "sw1a", "swx2", "s", "w1", "clk1", "xsw1"] {
            assert!(!is_switch_legal(name), "{}", name);
        }
        for name in ["clk", "clk0", "clk15"] {
            assert!(is_clock_legal(name), "{}", name);
        }
        for name in ["clka", "clk1b", "cl1", "sw1"] {
            assert!(!is_clock_legal(name), "{}", name);
        }
    }

    #[test]
    fn test_uppercase_device_name_is_syntax_error() {
        let (ok, _, errors) =
            parse("devices(Gate is AND; g is OR;) initialise() connections() monitors()");
        assert!(!ok);
        assert!(matches!(
            syntax(&errors)[0],
            SyntaxError::InvalidDeviceName { name } if name == "Gate"
        ));
    }

    #[test]
    fn test_initialise_qualifiers() {
        let (ok, circuit, errors) = parse(
            "devices(a is AND; n is NOT; d is DTYPE; sw1 is SWITCH; clk1 is CLOCK; x is XOR;)
             initialise(a has 4 inputs; n has 2; d has 1; sw1 has 5; clk1 has 0; x has 3 inputs;
                        sw1 has 1; ghost has 1;)
             connections() monitors()",
        );
        assert!(!ok);
        let a = circuit.names.query("a").unwrap();
        assert_eq!(circuit.devices().get_device(a).unwrap().inputs.len(), 4);

        let errors = semantic(&errors);
        let invalid: Vec<_> = errors
            .iter()
            .filter_map(|e| match e {
                SemanticError::InvalidQualifier { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(invalid, vec!["n", "sw1", "clk1", "x"]);
        assert!(errors.iter().any(
            |e| matches!(e, SemanticError::QualifierPresent { name, .. } if name == "d")
        ));
        assert!(errors.iter().any(
            |e| matches!(e, SemanticError::UndefinedDevice { name } if name == "ghost")
        ));
        // sw1 was accepted by its second statement, so only clk1 is uninitialised.
        let uninitialised: Vec<_> = errors
            .iter()
            .filter_map(|e| match e {
                SemanticError::NotInitialised { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(uninitialised, vec!["clk1"]);
    }

    #[test]
    fn test_inputs_keyword_rejected_for_switch() {
        let (_, _, errors) =
            parse("devices(sw1 is SWITCH;) initialise(sw1 has 1 inputs;) connections() monitors()");
        assert!(semantic(&errors).iter().any(
            |e| matches!(e, SemanticError::InvalidQualifier { name, .. } if name == "sw1")
        ));
    }

    #[test]
    fn test_dtype_port_rules() {
        let (ok, _, errors) = parse(
            "devices(d is DTYPE; sw1 is SWITCH; g is NOT;)
             initialise(sw1 has 0;)
             connections(
                d Q to g.I1;
                sw1.Q to d.DATA;
                d to d.CLK;
                d.QBAR to d.SET;
                sw1 to d.CLEAR;
             )
             monitors(d.Q;)",
        );
        assert!(!ok);
        let syntax = syntax(&errors);
        assert!(syntax
            .iter()
            .any(|e| matches!(e, SyntaxError::MissingDot { port } if port == "Q")));
        assert!(syntax
            .iter()
            .any(|e| matches!(e, SyntaxError::UnexpectedDot { device } if device == "sw1")));
        assert!(semantic(&errors)
            .iter()
            .any(|e| matches!(e, SemanticError::MissingOutputPort { device } if device == "d")));
    }

    #[test]
    fn test_connection_rejections() {
        let (ok, _, errors) = parse(
            "devices(sw1, sw2 are SWITCH; a is AND; d is DTYPE;)
             initialise(sw1, sw2 have 0;)
             connections(
                sw1 to a.I1;
                sw2 to a.I1;
                sw2 to a.I7;
                d.NQ to a.I2;
                sw1 to ghost.I1;
             )
             monitors()",
        );
        assert!(!ok);
        let errors = semantic(&errors);
        assert!(errors
            .iter()
            .any(|e| matches!(e, SemanticError::InputConnected { port, .. } if port == "I1")));
        assert!(errors
            .iter()
            .any(|e| matches!(e, SemanticError::InputPortAbsent { port, .. } if port == "I7")));
        assert!(errors
            .iter()
            .any(|e| matches!(e, SemanticError::OutputPortAbsent { port, .. } if port == "NQ")));
        assert!(errors
            .iter()
            .any(|e| matches!(e, SemanticError::UndefinedDevice { name } if name == "ghost")));
    }

    #[test]
    fn test_recovery_reports_many_errors() {
        let (ok, circuit, errors) = parse(
            "devices(
                a is FOO;
                b OR;
                c is NAND
                d is NOT;
                e $ is AND;
                f is XOR;
             )
             initialise() connections() monitors()",
        );
        assert!(!ok);
        let syntax = syntax(&errors);
        assert!(matches!(syntax[0], SyntaxError::ExpectedDeviceType { .. }));
        assert!(matches!(syntax[1], SyntaxError::ExpectedIsOrAre { .. }));
        assert!(matches!(syntax[2], SyntaxError::ExpectedSemicolon { .. }));
        assert!(matches!(syntax[3], SyntaxError::UnrecognisedCharacter { .. }));
        // Statements after each error are still parsed.
        let f = circuit.names.query("f").unwrap();
        assert_eq!(circuit.devices().get_device(f).unwrap().kind, DeviceKind::Xor);
        let c = circuit.names.query("c").unwrap();
        assert!(circuit.devices().get_device(c).is_some());
    }

    #[test]
    fn test_missing_close_bracket_resumes_at_next_block() {
        let (ok, circuit, errors) = parse(
            "devices(sw1 is SWITCH; n is NOT;
             initialise(sw1 has 1;)
             connections(sw1 to n.I1;)
             monitors(n;)",
        );
        assert!(!ok);
        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert_eq!(
            errors[0].kind,
            ErrorKind::Syntax(SyntaxError::MissingCloseBracket(Keyword::Devices))
        );
        assert_eq!(circuit.monitors.len(), 1);
    }

    #[test]
    fn test_missing_block_and_open_bracket() {
        let (ok, _, errors) = parse("initialise() connections sw1 to a.I1; monitors()");
        assert!(!ok);
        let syntax = syntax(&errors);
        assert_eq!(syntax[0], &SyntaxError::ExpectedBlock(Keyword::Devices));
        assert_eq!(syntax[1], &SyntaxError::ExpectedOpenBracket);
        assert_eq!(syntax.len(), 2);
    }

    #[test]
    fn test_trailing_tokens() {
        let (ok, _, errors) = parse("devices() initialise() connections() monitors() extra");
        assert!(!ok);
        assert!(matches!(
            errors.last().map(|e| &e.kind),
            Some(ErrorKind::Syntax(SyntaxError::ExpectedEof { .. }))
        ));
    }

    #[test]
    fn test_diagnostic_context_points_at_symbol() {
        let (_, _, errors) = parse("devices(\n  a is FOO;\n) initialise() connections() monitors()");
        let error = &errors[0];
        assert_eq!((error.line, error.position), (2, 8));
        assert!(error.context.starts_with("  a is FOO;\n       ^\n"));
        assert!(error.to_string().starts_with("Line 2, column 8: Syntax error"));
    }

    #[test]
    fn test_monitor_list_and_duplicates() {
        let (ok, circuit, errors) = parse(
            "devices(sw1 is SWITCH; d is DTYPE;)
             initialise(sw1 has 1;)
             connections(sw1 to d.DATA; sw1 to d.CLK; sw1 to d.SET; sw1 to d.CLEAR;)
             monitors(d.Q, d.QBAR; sw1; d.Q;)",
        );
        assert!(!ok);
        assert_eq!(circuit.monitors.len(), 3);
        let semantic = semantic(&errors);
        assert!(matches!(
            semantic.as_slice(),
            [SemanticError::MonitorPresent { .. }]
        ));
        let d = circuit.names.query("d").unwrap();
        let q = circuit.devices().ports().q;
        assert!(circuit.monitors.entry(OutputRef::new(d, Some(q))).is_some());
    }

    #[test]
    fn test_parsed_circuit_simulates() {
        let (ok, mut circuit, _) = parse(AND_OF_SWITCHES);
        assert!(ok);
        circuit.network.devices_mut().cold_startup();
        assert!(circuit.network.execute_network());
        circuit.record_signals();
        let a = circuit.names.query("a").unwrap();
        assert_eq!(
            circuit.monitors.get_monitor_signals(a, None),
            Some(&[Signal::High][..])
        );
    }
}
