//! Wire codec for the LED control protocol.
//!
//! Turns text lines into [`Message`]s and back.
//!
//! # Pipeline
//!
//! ```text
//! ":led #0-2 r=255 &blink //hi"
//!        │ tokenize()
//!        ▼
//! PREFIX(led) OBJECTS(0-2) KEY(r) NUMBER(255) FLAG(&blink) FREETEXT(hi)
//!        │ MessageParser::parse()
//!        ▼
//! Message { type: led, objects: {0,1,2}, values: [r=255], flags: [blink], .. }
//!        │ Display / to_wire()
//!        ▼
//! ":led #0-2 r=255 &blink //hi\n"
//! ```
//!
//! # Token Priority
//!
//! | Priority | Tag      | Example      |
//! |----------|----------|--------------|
//! | 1        | PREFIX   | `:led`       |
//! | 2        | OBJECTS  | ` #1-3,5`    |
//! | 3        | KEY      | ` r=`        |
//! | 4        | LIST     | `1,2,3`      |
//! | 5        | TOGGLE   | `on`         |
//! | 6        | NUMBER   | `255`        |
//! | 7        | FLAG     | ` &blink`    |
//! | 8        | FREETEXT | ` //note`    |
//! | 9        | EOL      | `\r\n`       |
//!
//! Objects serialize as ascending runs, so `{1,2,3,5,7,8,9}` is always
//! `#1-3,5,7-9` whatever the insertion order. Values and flags keep their
//! insertion order; a parse/format round trip preserves them as sets.
//!
//! [`Message`]: crate::protocol::Message

mod format;
mod parser;
mod token;

pub use format::{format_flag, format_ranges, format_value, join_natural, normalize_name};
pub use parser::{parse_line, MessageParser, MAX_RANGE_SPAN};
pub use token::{tokenize, Tag, Token, TOKEN_PATTERNS};
