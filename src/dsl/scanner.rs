//! Scanner (tokenizer) for circuit definition files.

use std::collections::HashMap;
use std::fmt;

use log::trace;

use crate::circuit::DeviceKind;
use crate::names::{NameId, Names};

/// Reserved words of the definition language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Devices,
    Initialise,
    Connections,
    Monitors,
    Is,
    Are,
    Has,
    Have,
    To,
    Inputs,
    /// One of the device-type keywords (`AND`, `DTYPE`, ...)
    Device(DeviceKind),
}

impl Keyword {
    /// Every keyword with its spelling.
    pub fn all() -> Vec<(&'static str, Keyword)> {
        let mut words = vec![
            ("devices", Self::Devices),
            ("initialise", Self::Initialise),
            ("connections", Self::Connections),
            ("monitors", Self::Monitors),
            ("is", Self::Is),
            ("are", Self::Are),
            ("has", Self::Has),
            ("have", Self::Have),
            ("to", Self::To),
            ("inputs", Self::Inputs),
        ];
        words.extend(DeviceKind::ALL.map(|kind| (kind.keyword(), Self::Device(kind))));
        words
    }

    /// Whether this keyword opens one of the four top-level blocks.
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            Self::Devices | Self::Initialise | Self::Connections | Self::Monitors
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Devices => "devices",
            Self::Initialise => "initialise",
            Self::Connections => "connections",
            Self::Monitors => "monitors",
            Self::Is => "is",
            Self::Are => "are",
            Self::Has => "has",
            Self::Have => "have",
            Self::To => "to",
            Self::Inputs => "inputs",
            Self::Device(kind) => kind.keyword(),
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Symbol types produced by the scanner.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolType {
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `;`
    Semicolon,
    /// `=`
    Equals,
    /// `(`
    OpenBracket,
    /// `)`
    CloseBracket,
    Keyword(Keyword),
    Number,
    Name,
    Eof,
    /// Text the scanner could not classify
    Unknown(String),
}

impl fmt::Display for SymbolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comma => write!(f, "','"),
            Self::Dot => write!(f, "'.'"),
            Self::Semicolon => write!(f, "';'"),
            Self::Equals => write!(f, "'='"),
            Self::OpenBracket => write!(f, "'('"),
            Self::CloseBracket => write!(f, "')'"),
            Self::Keyword(keyword) => write!(f, "keyword '{}'", keyword),
            Self::Number => write!(f, "number"),
            Self::Name => write!(f, "name"),
            Self::Eof => write!(f, "end of file"),
            Self::Unknown(text) => write!(f, "'{}'", text),
        }
    }
}

/// A token produced by the scanner.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub kind: SymbolType,
    /// Name ID for names and keywords
    pub id: Option<NameId>,
    /// Value of a number
    pub number: Option<u32>,
    /// Line number (1-indexed)
    pub line_number: usize,
    /// Column of the first character (1-indexed)
    pub line_position: usize,
}

impl Symbol {
    fn new(kind: SymbolType, line_number: usize, line_position: usize) -> Self {
        Self {
            kind,
            id: None,
            number: None,
            line_number,
            line_position,
        }
    }

    /// The keyword carried by this symbol, if any.
    pub fn keyword(&self) -> Option<Keyword> {
        match self.kind {
            SymbolType::Keyword(keyword) => Some(keyword),
            _ => None,
        }
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.keyword() == Some(keyword)
    }

    /// True for a block keyword or end of file.
    pub fn is_block_boundary(&self) -> bool {
        self.kind == SymbolType::Eof || self.keyword().is_some_and(|k| k.is_block())
    }
}

/// Scanner over the text of a definition file.
pub struct Scanner<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    lines: Vec<&'a str>,
    line: usize,
    column: usize,
    keywords: HashMap<NameId, Keyword>,
    eof: Option<Symbol>,
}

impl<'a> Scanner<'a> {
    /// Create a scanner for `input`, interning every keyword in `names`.
    pub fn new(input: &'a str, names: &mut Names) -> Self {
        let keywords = Keyword::all()
            .into_iter()
            .map(|(text, keyword)| (names.lookup_one(text), keyword))
            .collect();
        Self {
            chars: input.char_indices().peekable(),
            lines: input.lines().collect(),
            line: 1,
            column: 1,
            keywords,
            eof: None,
        }
    }

    /// Keyword for a name ID, if the name is reserved.
    pub fn keyword(&self, id: NameId) -> Option<Keyword> {
        self.keywords.get(&id).copied()
    }

    /// Get the next symbol. After end of input every call returns EOF.
    pub fn get_symbol(&mut self, names: &mut Names) -> Symbol {
        if let Some(eof) = &self.eof {
            return eof.clone();
        }

        self.skip_whitespace_and_comments();

        let (line, column) = (self.line, self.column);
        let Some(&(_, ch)) = self.chars.peek() else {
            let eof = Symbol::new(SymbolType::Eof, line, column);
            self.eof = Some(eof.clone());
            return eof;
        };

        let symbol = match ch {
            ',' | '.' | ';' | '=' | '(' | ')' => {
                self.advance();
                let kind = match ch {
                    ',' => SymbolType::Comma,
                    '.' => SymbolType::Dot,
                    ';' => SymbolType::Semicolon,
                    '=' => SymbolType::Equals,
                    '(' => SymbolType::OpenBracket,
                    _ => SymbolType::CloseBracket,
                };
                Symbol::new(kind, line, column)
            }
            '0'..='9' => {
                let text = self.read_while(|c| c.is_ascii_digit());
                match text.parse::<u32>() {
                    Ok(value) => Symbol {
                        number: Some(value),
                        ..Symbol::new(SymbolType::Number, line, column)
                    },
                    Err(_) => Symbol::new(SymbolType::Unknown(text), line, column),
                }
            }
            _ if ch.is_ascii_alphabetic() => {
                let text = self.read_while(|c| c.is_ascii_alphanumeric());
                let id = names.lookup_one(&text);
                let kind = match self.keyword(id) {
                    Some(keyword) => SymbolType::Keyword(keyword),
                    None => SymbolType::Name,
                };
                Symbol {
                    id: Some(id),
                    ..Symbol::new(kind, line, column)
                }
            }
            _ => {
                self.advance();
                Symbol::new(SymbolType::Unknown(ch.to_string()), line, column)
            }
        };

        trace!("symbol {:?} at {}:{}", symbol.kind, line, column);
        symbol
    }

    /// Render a source line with a caret under `column` and a message.
    pub fn print_error_line(&self, line: usize, column: usize, message: &str) -> String {
        match line.checked_sub(1).and_then(|i| self.lines.get(i)) {
            Some(text) => {
                // Tabs are kept so the caret lines up however they render.
                let width = column.saturating_sub(1);
                let mut padding: String = text
                    .chars()
                    .take(width)
                    .map(|ch| if ch == '\t' { '\t' } else { ' ' })
                    .collect();
                let short = width.saturating_sub(padding.chars().count());
                padding.push_str(&" ".repeat(short));
                format!("{}\n{}^\n{}", text, padding, message)
            }
            None => message.to_string(),
        }
    }

    fn advance(&mut self) -> Option<char> {
        let (_, ch) = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '#' {
                // A comment ends at the newline or before the next ';'
                while let Some(&(_, c)) = self.chars.peek() {
                    if c == '\n' || c == ';' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn read_while(&mut self, accept: impl Fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(&(_, ch)) = self.chars.peek() {
            if !accept(ch) {
                break;
            }
            text.push(ch);
            self.advance();
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_all(input: &str) -> (Names, Vec<Symbol>) {
        let mut names = Names::new();
        let mut scanner = Scanner::new(input, &mut names);
        let mut symbols = Vec::new();
        loop {
            let symbol = scanner.get_symbol(&mut names);
            let done = symbol.kind == SymbolType::Eof;
            symbols.push(symbol);
            if done {
                break;
            }
        }
        (names, symbols)
    }

    fn kinds(symbols: &[Symbol]) -> Vec<SymbolType> {
        symbols.iter().map(|s| s.kind.clone()).collect()
    }

    #[test]
    fn test_punctuation_sequence() {
        use SymbolType::*;
        let (_, symbols) = scan_all("a,b.c;d=e(f)g");
        assert_eq!(
            kinds(&symbols),
            vec![
                Name, Comma, Name, Dot, Name, Semicolon, Name, Equals, Name, OpenBracket, Name,
                CloseBracket, Name, Eof
            ]
        );
    }

    #[test]
    fn test_eof_is_idempotent() {
        let mut names = Names::new();
        let mut scanner = Scanner::new("x", &mut names);
        assert_eq!(scanner.get_symbol(&mut names).kind, SymbolType::Name);
        let first = scanner.get_symbol(&mut names);
        assert_eq!(first.kind, SymbolType::Eof);
        for _ in 0..3 {
            assert_eq!(scanner.get_symbol(&mut names), first);
        }
    }

    #[test]
    fn test_keywords_names_and_numbers() {
        let (names, symbols) = scan_all("devices sw1 is SWITCH 42 Q");
        assert_eq!(symbols[0].kind, SymbolType::Keyword(Keyword::Devices));
        assert_eq!(symbols[1].kind, SymbolType::Name);
        assert_eq!(symbols[1].id, names.query("sw1"));
        assert_eq!(symbols[2].kind, SymbolType::Keyword(Keyword::Is));
        assert_eq!(
            symbols[3].kind,
            SymbolType::Keyword(Keyword::Device(DeviceKind::Switch))
        );
        assert_eq!(symbols[4].kind, SymbolType::Number);
        assert_eq!(symbols[4].number, Some(42));
        assert_eq!(symbols[5].kind, SymbolType::Name);
    }

    #[test]
    fn test_digits_then_letters_split() {
        let (_, symbols) = scan_all("12ab");
        assert_eq!(
            kinds(&symbols),
            vec![SymbolType::Number, SymbolType::Name, SymbolType::Eof]
        );
    }

    #[test]
    fn test_comments() {
        let (_, symbols) = scan_all("a # trailing words\nb #note; c");
        assert_eq!(
            kinds(&symbols),
            vec![
                SymbolType::Name,
                SymbolType::Name,
                SymbolType::Semicolon,
                SymbolType::Name,
                SymbolType::Eof
            ]
        );

        let (_, symbols) = scan_all("a#glued\nb");
        assert_eq!(kinds(&symbols).len(), 3);
    }

    #[test]
    fn test_positions() {
        let (_, symbols) = scan_all("ab cd\n  ef;");
        let positions: Vec<_> = symbols
            .iter()
            .map(|s| (s.line_number, s.line_position))
            .collect();
        assert_eq!(positions, vec![(1, 1), (1, 4), (2, 3), (2, 5), (2, 6)]);
    }

    #[test]
    fn test_unknown_character_is_skipped() {
        let (_, symbols) = scan_all("a $ b");
        assert_eq!(
            kinds(&symbols),
            vec![
                SymbolType::Name,
                SymbolType::Unknown("$".to_string()),
                SymbolType::Name,
                SymbolType::Eof
            ]
        );
    }

    #[test]
    fn test_number_overflow_is_unknown() {
        let (_, symbols) = scan_all("99999999999");
        assert_eq!(
            symbols[0].kind,
            SymbolType::Unknown("99999999999".to_string())
        );
    }

    #[test]
    fn test_print_error_line() {
        let mut names = Names::new();
        let scanner = Scanner::new("devices(\n  a is FOO;\n)", &mut names);
        assert_eq!(
            scanner.print_error_line(2, 8, "expected a device type"),
            "  a is FOO;\n       ^\nexpected a device type"
        );
        assert_eq!(scanner.print_error_line(9, 1, "late"), "late");
    }

    #[test]
    fn test_print_error_line_keeps_tabs() {
        let source = "devices(\n\t\ta is FOO;\n)";
        let (_, symbols) = scan_all(source);
        assert_eq!((symbols[4].line_number, symbols[4].line_position), (2, 8));

        let mut names = Names::new();
        let scanner = Scanner::new(source, &mut names);
        assert_eq!(
            scanner.print_error_line(2, 8, "expected a device type"),
            "\t\ta is FOO;\n\t\t     ^\nexpected a device type"
        );
        // A caret past the end of the line still lands in the right column.
        assert_eq!(scanner.print_error_line(1, 10, "eof"), "devices(\n         ^\neof");
    }
}
