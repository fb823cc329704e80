use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use colored::*;

use crate::opcodes::{self, OpEntry, Shape};

pub type StringIndex = usize;

/// Interns label names so units can refer to them by index, and records the
/// effective address each label ends up at during the resolver's first pass.
#[derive(Debug)]
pub struct LabelTable {
    names: Vec<String>,
    addresses: Vec<Option<u16>>,
}

impl LabelTable {
    pub fn new() -> LabelTable {
        LabelTable {
            names: Vec::new(),
            addresses: Vec::new(),
        }
    }

    pub fn intern(&mut self, name: &str) -> StringIndex {
        match self.names.iter().position(|n| n == name) {
            Some(index) => index,
            None => {
                self.names.push(name.to_string());
                self.addresses.push(None);
                self.names.len() - 1
            }
        }
    }

    pub fn define(&mut self, index: StringIndex, address: u16) -> Result<(), String> {
        if self.addresses[index].is_some() {
            return Err(format!("Duplicate label \"{}\"", self.names[index]));
        }
        self.addresses[index] = Some(address);
        Ok(())
    }

    pub fn address_of(&self, index: StringIndex) -> Option<u16> {
        self.addresses[index]
    }

    pub fn name(&self, index: StringIndex) -> &str {
        &self.names[index]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Value(u16),
    Label(StringIndex),
}

/// One logical unit of the source: a directive, a data literal, a label
/// definition, or an instruction.
#[derive(Debug)]
pub enum Unit {
    /// `!HHHH` - relocation base for subsequent output.
    SetBase(u16),
    /// `@HHHH` - move the effective address.
    SetOrigin(u16),
    /// `#HH` - a single data byte.
    Byte(u8),
    /// `"…"` - the bytes of the enclosed text.
    Text(String),
    /// `NAME:` - pin NAME to the current effective address.
    LabelDef(StringIndex),
    /// A catalogue mnemonic with its operand, if the shape takes one.
    Op {
        entry: &'static OpEntry,
        operand: Option<Operand>,
    },
}

#[derive(Debug)]
pub struct SourceUnit {
    pub unit: Unit,
    pub row: u64,
}

/// A lexing or resolving failure, pinned to a source location. The plain
/// message travels in `Display`; `nice_message` renders the surrounding
/// source rows with a caret for terminal output.
#[derive(Debug)]
pub struct SourceError {
    pub message: String,
    pub row: u64,
    pub column: u64,
    nice_message: String,
}

impl SourceError {
    pub fn new(message: String, text: &str, row: u64, column: u64) -> SourceError {
        let error_row_index = row.saturating_sub(1) as i64;
        let range = 3;
        let min = (error_row_index - range).max(0) as usize;
        let max = (error_row_index + range) as usize;

        let mut nice_message = String::from("\n\n");
        for (row_index, row_text) in text.lines().enumerate() {
            if row_index > max {
                break;
            }
            if row_index < min {
                continue;
            }

            let col_string = format!("{:>4}: ", row_index + 1);
            nice_message.push_str(&format!("{}", col_string.cyan()));
            nice_message.push_str(&format!("{}", row_text.bright_white()));
            nice_message.push('\n');

            if row_index as i64 == error_row_index {
                let indent = " ".repeat(column as usize + 5);
                let location = format!("^ error on row {} column {}", row, column);
                nice_message.push_str(&indent);
                nice_message.push_str(&format!("{}", location.bright_red()));
                nice_message.push('\n');
                nice_message.push_str(&indent);
                nice_message.push_str(&format!("{}", message.bright_red()));
                nice_message.push('\n');
            }
        }
        nice_message.push('\n');

        SourceError {
            message,
            row,
            column,
            nice_message,
        }
    }

    pub fn nice_message(&self) -> &str {
        &self.nice_message
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Location: {}:{}", self.message, self.row, self.column)
    }
}

/// Tokenize friendly source into a stream of units plus the label table the
/// resolver will fill in.
pub fn tokenize(text: &str) -> Result<(Vec<SourceUnit>, LabelTable), SourceError> {
    let mut lexer = Lexer::new(text);
    lexer.run()?;
    Ok((lexer.units, lexer.labels))
}

pub struct Lexer<'a> {
    text: &'a str,
    characters: Peekable<Chars<'a>>,
    row: u64,
    column: u64,
    units: Vec<SourceUnit>,
    labels: LabelTable,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Lexer<'a> {
        Lexer {
            text,
            characters: text.chars().peekable(),
            row: 1,
            column: 0,
            units: Vec::new(),
            labels: LabelTable::new(),
        }
    }

    fn next_character(&mut self) -> Option<char> {
        let character = self.characters.next();
        match character {
            Some('\n') => {
                self.row += 1;
                self.column = 0;
            }
            Some(_) => self.column += 1,
            None => {}
        }
        character
    }

    fn peek(&mut self) -> Option<char> {
        self.characters.peek().copied()
    }

    fn error(&self, message: String) -> SourceError {
        SourceError::new(message, self.text, self.row, self.column)
    }

    fn push(&mut self, unit: Unit, row: u64) {
        self.units.push(SourceUnit { unit, row });
    }

    fn run(&mut self) -> Result<(), SourceError> {
        loop {
            match self.peek() {
                None => return Ok(()),
                Some(character) => match character {
                    c if c.is_whitespace() => {
                        self.next_character();
                    }
                    ';' => self.skip_comment(),
                    '!' => {
                        let row = self.row;
                        self.next_character();
                        let value = self.hex_literal(0xFFFF)?;
                        self.push(Unit::SetBase(value), row);
                    }
                    '@' => {
                        let row = self.row;
                        self.next_character();
                        let value = self.hex_literal(0xFFFF)?;
                        self.push(Unit::SetOrigin(value), row);
                    }
                    '#' => {
                        let row = self.row;
                        self.next_character();
                        let value = self.hex_literal(0xFF)?;
                        self.push(Unit::Byte(value as u8), row);
                    }
                    '"' => {
                        let row = self.row;
                        let text = self.string_literal()?;
                        self.push(Unit::Text(text), row);
                    }
                    c if c.is_ascii_alphabetic() => self.word_unit()?,
                    other => {
                        return Err(self.error(format!("Unknown token {:?}", other)));
                    }
                },
            }
        }
    }

    fn skip_comment(&mut self) {
        loop {
            match self.next_character() {
                Some('\n') | None => return,
                Some(_) => {}
            }
        }
    }

    /// A word is a run of alphanumeric characters.
    fn word(&mut self) -> String {
        let mut word = String::new();
        while let Some(character) = self.peek() {
            if !character.is_ascii_alphanumeric() {
                break;
            }
            word.push(character);
            self.next_character();
        }
        word
    }

    /// A hex literal with an optional `$` or `0x` prefix, case-insensitive,
    /// checked against the given maximum.
    fn hex_literal(&mut self, max: u16) -> Result<u16, SourceError> {
        if self.peek() == Some('$') {
            self.next_character();
        }
        let mut word = self.word();
        if word.len() > 2 && (word.starts_with("0x") || word.starts_with("0X")) {
            word = word.split_off(2);
        }
        if word.is_empty() {
            return Err(self.error("Expected a hex literal".to_string()));
        }
        let value = u32::from_str_radix(&word, 16)
            .map_err(|_| self.error(format!("Malformed hex literal \"{}\"", word)))?;
        if value > max as u32 {
            return Err(self.error(format!(
                "Hex literal \"{}\" does not fit in {} hex digits",
                word,
                if max > 0xFF { 4 } else { 2 }
            )));
        }
        Ok(value as u16)
    }

    fn string_literal(&mut self) -> Result<String, SourceError> {
        // Consume the opening quote.
        self.next_character();
        let mut text = String::new();
        loop {
            match self.next_character() {
                Some('"') => return Ok(text),
                Some(character) => text.push(character),
                None => return Err(self.error("Unterminated string literal".to_string())),
            }
        }
    }

    /// A word at the start of a unit is either a label definition or a
    /// mnemonic. Mnemonics are exactly four bytes; a shorter word is padded
    /// with trailing spaces and a trailing `#` folds into the mnemonic.
    fn word_unit(&mut self) -> Result<(), SourceError> {
        let row = self.row;
        let word = self.word();

        if self.peek() == Some(':') {
            self.next_character();
            let index = self.labels.intern(&word);
            self.push(Unit::LabelDef(index), row);
            return Ok(());
        }

        let mut mnemonic = [b' '; 4];
        if self.peek() == Some('#') {
            if word.len() != 3 {
                return Err(self.error(format!("Malformed mnemonic \"{}#\"", word)));
            }
            self.next_character();
            mnemonic[..3].copy_from_slice(word.as_bytes());
            mnemonic[3] = b'#';
        } else {
            if word.len() > 4 {
                return Err(self.error(format!("Malformed mnemonic \"{}\"", word)));
            }
            mnemonic[..word.len()].copy_from_slice(word.as_bytes());
        }

        let entry = opcodes::lookup(&mnemonic)
            .ok_or_else(|| self.error(format!("Unrecognized mnemonic \"{}\"", word)))?;

        let operand = match entry.shape {
            Shape::Implied => None,
            shape => Some(self.operand(shape)?),
        };
        self.push(Unit::Op { entry, operand }, row);
        Ok(())
    }

    fn operand(&mut self, shape: Shape) -> Result<Operand, SourceError> {
        while let Some(character) = self.peek() {
            if !character.is_whitespace() {
                break;
            }
            self.next_character();
        }

        if self.peek() == Some(':') {
            if shape == Shape::Byte {
                return Err(self.error(
                    "A label can not be the operand of a one-byte instruction".to_string(),
                ));
            }
            self.next_character();
            let name = self.word();
            if name.is_empty() {
                return Err(self.error("Expected a label name after \":\"".to_string()));
            }
            return Ok(Operand::Label(self.labels.intern(&name)));
        }

        let max = match shape {
            Shape::Word => 0xFFFF,
            _ => 0xFF,
        };
        match self.peek() {
            Some(c) if c == '$' || c.is_ascii_alphanumeric() => {
                Ok(Operand::Value(self.hex_literal(max)?))
            }
            _ => Err(self.error("Expected an operand".to_string())),
        }
    }
}
