// This file contains the parser for CheckM's extended bin statistics file (bin_stats_ext.tsv).
// Each line is a bin ID, a tab, and a Python-style dictionary literal such as:
//   bin.001	{'marker lineage': 'k__Bacteria (UID203)', '# genomes': 5449, 'Completeness': 98.7}

// Copyright 2026 the checkm-runner authors

// This file is part of checkm-runner. checkm-runner is free software: you can redistribute it
// and/or modify it under the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option) any later version.
// checkm-runner is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See
// the GNU General Public License for more details. You should have received a copy of the GNU
// General Public License along with checkm-runner. If not, see <http://www.gnu.org/licenses/>.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::error::{CheckmError, Result};
use crate::log::log_message;
use crate::misc::load_file_lines;


#[derive(Debug, Clone, PartialEq)]
pub enum StatValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
    List(Vec<StatValue>),
    Map(BTreeMap<String, StatValue>),
}

impl StatValue {
    fn repr(&self) -> String {
        match self {
            StatValue::Str(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            other             => other.to_string(),
        }
    }
}

impl fmt::Display for StatValue {
    // Matches how Python's str() shows the same literal, so report cells look like CheckM's own
    // output (e.g. 5 -> "5", 98.0 -> "98.0", 'abc' -> "abc").
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StatValue::Int(i)   => write!(f, "{}", i),
            StatValue::Float(v) => write!(f, "{}", float_repr(*v)),
            StatValue::Str(s)   => write!(f, "{}", s),
            StatValue::Bool(b)  => write!(f, "{}", if *b { "True" } else { "False" }),
            StatValue::None     => write!(f, "None"),
            StatValue::List(items) => {
                let items: Vec<String> = items.iter().map(|v| v.repr()).collect();
                write!(f, "[{}]", items.join(", "))
            }
            StatValue::Map(map) => {
                let entries: Vec<String> = map.iter()
                    .map(|(k, v)| format!("'{}': {}", k, v.repr())).collect();
                write!(f, "{{{}}}", entries.join(", "))
            }
        }
    }
}


/// Shortest round-trip form, with Python's spelling of exponents and non-finite values
/// (1e-05, 1.5e+16, nan).
fn float_repr(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    let text = format!("{:?}", v);
    match text.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None         => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => text,
    }
}


#[derive(Debug, Clone, PartialEq)]
pub struct BinStatsRecord {
    pub bin_id: String,
    pub metrics: BTreeMap<String, StatValue>,
}


/// Returns Ok(None) if the file does not exist, which is not an error: CheckM does not write it
/// in every configuration.
pub fn load_bin_stats(stats_file: &Path) -> Result<Option<Vec<BinStatsRecord>>> {
    if !stats_file.is_file() {
        log_message(&format!("Warning! no stats file found (looking at: {})",
                             stats_file.display()));
        return Ok(None);
    }
    let lines = load_file_lines(stats_file)?;
    parse_bin_stats_lines(&lines).map(Some)
}


pub fn parse_bin_stats_lines(lines: &[String]) -> Result<Vec<BinStatsRecord>> {
    let mut records = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let (bin_id, literal) = line.split_once('\t').ok_or_else(|| CheckmError::Parse {
            line: i + 1, message: "expected a bin ID and a statistics mapping separated by a tab"
                                  .to_string() })?;
        let metrics = parse_stats_mapping(literal)
            .map_err(|e| CheckmError::Parse { line: i + 1, message: e.to_string() })?;
        records.push(BinStatsRecord { bin_id: bin_id.to_string(), metrics });
    }
    Ok(records)
}


#[derive(Debug, Clone, PartialEq)]
pub struct LiteralError {
    pub position: usize,
    pub message: String,
}

impl fmt::Display for LiteralError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} at character {}", self.message, self.position)
    }
}


/// Parses a mapping literal with quoted string keys. The grammar is the subset of Python
/// literals that CheckM writes:
///
///   mapping := '{' [ string ':' value ( ',' string ':' value )* [','] ] '}'
///   value   := mapping | list | string | number | 'True' | 'False' | 'None'
///   list    := ( '[' | '(' ) [ value ( ',' value )* [','] ] ( ']' | ')' )
///   string  := single- or double-quoted, with backslash escapes
///   number  := optional sign, digits, optional fraction, optional exponent
///
/// Anything else, or trailing text after the closing brace, is an error that reports the
/// character position where parsing stopped.
pub fn parse_stats_mapping(text: &str) -> std::result::Result<BTreeMap<String, StatValue>,
                                                                LiteralError> {
    let mut parser = LiteralParser { chars: text.chars().collect(), pos: 0 };
    parser.skip_whitespace();
    let map = parser.mapping()?;
    parser.skip_whitespace();
    if parser.pos < parser.chars.len() {
        return Err(parser.error("unexpected text after mapping"));
    }
    Ok(map)
}


struct LiteralParser {
    chars: Vec<char>,
    pos: usize,
}

impl LiteralParser {
    fn error(&self, message: &str) -> LiteralError {
        LiteralError { position: self.pos, message: message.to_string() }
    }

    fn peek(&self) -> Option<char> { self.chars.get(self.pos).copied() }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) { self.pos += 1; }
    }

    fn expect(&mut self, expected: char) -> std::result::Result<(), LiteralError> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", expected)))
        }
    }

    fn mapping(&mut self) -> std::result::Result<BTreeMap<String, StatValue>, LiteralError> {
        self.expect('{')?;
        let mut map = BTreeMap::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some('}') { self.pos += 1; return Ok(map); }
            let key = match self.peek() {
                Some('\'') | Some('"') => self.string()?,
                _ => return Err(self.error("expected a quoted key")),
            };
            self.skip_whitespace();
            self.expect(':')?;
            self.skip_whitespace();
            let value = self.value()?;
            map.insert(key, value);
            self.skip_whitespace();
            match self.peek() {
                Some(',') => { self.pos += 1; }
                Some('}') => { self.pos += 1; return Ok(map); }
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
    }

    fn list(&mut self, close: char) -> std::result::Result<Vec<StatValue>, LiteralError> {
        self.pos += 1;  // opening bracket
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some(close) { self.pos += 1; return Ok(items); }
            items.push(self.value()?);
            self.skip_whitespace();
            match self.peek() {
                Some(',') => { self.pos += 1; }
                Some(c) if c == close => { self.pos += 1; return Ok(items); }
                _ => return Err(self.error(&format!("expected ',' or '{}'", close))),
            }
        }
    }

    fn value(&mut self) -> std::result::Result<StatValue, LiteralError> {
        match self.peek() {
            Some('{')              => Ok(StatValue::Map(self.mapping()?)),
            Some('[')              => Ok(StatValue::List(self.list(']')?)),
            Some('(')              => Ok(StatValue::List(self.list(')')?)),
            Some('\'') | Some('"') => Ok(StatValue::Str(self.string()?)),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.number(),
            Some(c) if c.is_ascii_alphabetic() => self.keyword(),
            Some(_) => Err(self.error("unexpected character")),
            None    => Err(self.error("unexpected end of input")),
        }
    }

    fn string(&mut self) -> std::result::Result<String, LiteralError> {
        let quote = self.peek().ok_or_else(|| self.error("expected a string"))?;
        self.pos += 1;
        let mut s = String::new();
        loop {
            let c = self.peek().ok_or_else(|| self.error("unterminated string"))?;
            self.pos += 1;
            if c == quote { return Ok(s); }
            if c == '\\' {
                let escaped = self.peek().ok_or_else(|| self.error("unterminated string"))?;
                self.pos += 1;
                s.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => other,
                });
            } else {
                s.push(c);
            }
        }
    }

    fn number(&mut self) -> std::result::Result<StatValue, LiteralError> {
        let start = self.pos;
        if matches!(self.peek(), Some('-') | Some('+')) { self.pos += 1; }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.pos += 1;
            } else if c == '.' || c == 'e' || c == 'E' {
                is_float = true;
                self.pos += 1;
                if (c == 'e' || c == 'E') && matches!(self.peek(), Some('-') | Some('+')) {
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if !is_float {
            if let Ok(i) = text.parse::<i64>() { return Ok(StatValue::Int(i)); }
        }
        text.parse::<f64>().map(StatValue::Float).map_err(|_| LiteralError {
            position: start, message: format!("invalid number '{}'", text) })
    }

    fn keyword(&mut self) -> std::result::Result<StatValue, LiteralError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') { self.pos += 1; }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "True"  => Ok(StatValue::Bool(true)),
            "False" => Ok(StatValue::Bool(false)),
            "None"  => Ok(StatValue::None),
            "nan"   => Ok(StatValue::Float(f64::NAN)),
            "inf"   => Ok(StatValue::Float(f64::INFINITY)),
            _ => Err(LiteralError { position: start,
                                    message: format!("unknown keyword '{}'", word) }),
        }
    }
}


/// Rounds half away from zero, e.g. 1.2345 -> 1.235 at three places.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}
