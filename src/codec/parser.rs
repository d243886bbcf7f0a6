//! Grammar-driven parser.
//!
//! ```text
//! PREFIX(type) PREFIX(subtype)? { OBJECTS | KEY VALUE | FLAG }* FREETEXT? EOL* END
//! VALUE := LIST | TOGGLE | NUMBER
//! ```
//!
//! A line either yields a complete [`Message`] or a [`ParseError`]; there are
//! no partial results.

use std::collections::{BTreeSet, VecDeque};

use super::token::{tokenize, Tag, Token};
use super::join_natural;
use crate::error::ParseError;
use crate::protocol::{Message, Value};

/// Most members a single `a-b` object range may expand to.
pub const MAX_RANGE_SPAN: u32 = 65_536;

/// Parser for one line at a time.
#[derive(Debug, Default)]
pub struct MessageParser {
    line: String,
    tokens: VecDeque<Token>,
}

impl MessageParser {
    /// Create a parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one line into a message.
    pub fn parse(&mut self, line: &str) -> Result<Message, ParseError> {
        self.line = line.to_string();
        self.tokens = tokenize(line)?.into();

        let msg_type = self.expect(&[Tag::Prefix])?;
        let mut message = Message::new(&msg_type.text)
            .map_err(|_| self.unexpected("PREFIX", "empty type"))?;
        if let Some(subtype) = self.accept(&[Tag::Prefix]) {
            message.set_subtype(&subtype.text);
        }

        loop {
            if let Some(objects) = self.accept(&[Tag::Objects]) {
                let objects = self.parse_ranges(&objects.text)?;
                message.add_objects(objects);
                continue;
            }

            if let Some(key) = self.accept(&[Tag::Key]) {
                let value = self.parse_value()?;
                message.set_value(&key.text, value);
                continue;
            }

            if let Some(flag) = self.accept(&[Tag::Flag]) {
                message.add_flag(&flag.text);
                continue;
            }

            break;
        }

        if let Some(text) = self.accept(&[Tag::Freetext]) {
            message.store_freetext(&text.text);
        }

        while self.accept(&[Tag::Eol]).is_some() {}

        if let Some(extra) = self.tokens.front() {
            let found = extra.tag.name();
            return Err(self.unexpected("end of line", found));
        }

        Ok(message)
    }

    fn parse_value(&mut self) -> Result<Value, ParseError> {
        let token = self.expect(&[Tag::List, Tag::Toggle, Tag::Number])?;
        let value = match token.tag {
            Tag::List => Value::List(
                token
                    .text
                    .split(',')
                    .map(|n| self.number(n))
                    .collect::<Result<_, _>>()?,
            ),
            Tag::Toggle => Value::Bool(token.text == "on"),
            _ => Value::Int(self.number(&token.text)?),
        };
        Ok(value)
    }

    fn parse_ranges(&self, text: &str) -> Result<BTreeSet<u32>, ParseError> {
        let mut objects = BTreeSet::new();
        for member in text.split(',') {
            match member.split_once('-') {
                Some((start, end)) => {
                    let start: u32 = self.number(start)?;
                    let end: u32 = self.number(end)?;
                    if start > end {
                        return Err(ParseError::DescendingRange {
                            range: member.to_string(),
                            line: self.line.clone(),
                        });
                    }
                    if end - start >= MAX_RANGE_SPAN {
                        return Err(ParseError::RangeTooLarge {
                            range: member.to_string(),
                            limit: MAX_RANGE_SPAN,
                            line: self.line.clone(),
                        });
                    }
                    objects.extend(start..=end);
                },
                None => {
                    objects.insert(self.number(member)?);
                },
            }
        }
        Ok(objects)
    }

    fn number<T: std::str::FromStr>(&self, digits: &str) -> Result<T, ParseError> {
        digits.parse().map_err(|_| ParseError::NumberOutOfRange {
            digits: digits.to_string(),
            line: self.line.clone(),
        })
    }

    /// Take the next token if its tag is one of `tags`.
    fn accept(&mut self, tags: &[Tag]) -> Option<Token> {
        match self.tokens.front() {
            Some(token) if tags.contains(&token.tag) => self.tokens.pop_front(),
            _ => None,
        }
    }

    /// Like [`Self::accept`], but a mismatch is an error.
    fn expect(&mut self, tags: &[Tag]) -> Result<Token, ParseError> {
        if let Some(token) = self.accept(tags) {
            return Ok(token);
        }
        let expected: Vec<&str> = tags.iter().map(Tag::name).collect();
        let found = self.tokens.front().map_or("end of line", |t| t.tag.name());
        Err(self.unexpected(&join_natural(&expected, "or"), found))
    }

    fn unexpected(&self, expected: &str, found: &str) -> ParseError {
        ParseError::Unexpected {
            expected: expected.to_string(),
            found: found.to_string(),
            line: self.line.clone(),
        }
    }
}

/// Parse one framed line.
///
/// The line is trimmed first; blank input yields `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Message>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    MessageParser::new().parse(line).map(Some)
}
