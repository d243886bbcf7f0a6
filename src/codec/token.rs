//! Tokenizer for protocol lines.
//!
//! A greedy lexer with priority rules: at the cursor every matcher is tried
//! in [`TOKEN_PATTERNS`] order, the first hit wins, and the scan restarts from
//! the top after each token. Later rules depend on context (a bare `12,13`
//! after a key is a LIST, not a NUMBER), so a lower-priority matcher must
//! never be tried before a higher one at the same position.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ParseError;

/// Token categories, listed in matching priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// `:name`, a type or subtype.
    Prefix,
    /// ` #1-3,5`, object ranges.
    Objects,
    /// ` key=`, start of a key/value pair.
    Key,
    /// `1,2,3`, an integer list value.
    List,
    /// `on` / `off`.
    Toggle,
    /// A bare integer value.
    Number,
    /// ` &name` / ` !name`.
    Flag,
    /// ` //text`, trailing comment.
    Freetext,
    /// Line terminators.
    Eol,
}

impl Tag {
    /// Upper-case name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Tag::Prefix => "PREFIX",
            Tag::Objects => "OBJECTS",
            Tag::Key => "KEY",
            Tag::List => "LIST",
            Tag::Toggle => "TOGGLE",
            Tag::Number => "NUMBER",
            Tag::Flag => "FLAG",
            Tag::Freetext => "FREETEXT",
            Tag::Eol => "EOL",
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Wire patterns in matching priority.
///
/// Each pattern is anchored at the cursor and captures the token text in
/// group 1.
pub static TOKEN_PATTERNS: &[(Tag, &str)] = &[
    (Tag::Prefix, r"^:([a-z-]+)"),
    (Tag::Objects, r"^ +#([0-9]+(?:-[0-9]+)?(?:,[0-9]+(?:-[0-9]+)?)*)"),
    (Tag::Key, r"^ +([a-z-]+)="),
    (Tag::List, r"^([0-9]+,[0-9]+(?:,[0-9]+)*)"),
    (Tag::Toggle, r"^(on|off)"),
    (Tag::Number, r"^([0-9]+)"),
    (Tag::Flag, r"^ +([&!][a-z-]+)"),
    (Tag::Freetext, r"^ +//([^\r\n]+)"),
    (Tag::Eol, r"^([\r\n]+)"),
];

lazy_static! {
    /// Compiled matchers, in [`TOKEN_PATTERNS`] order
    static ref MATCHERS: Vec<(Tag, Regex)> = TOKEN_PATTERNS
        .iter()
        .filter_map(|(tag, p)| Regex::new(p).ok().map(|r| (*tag, r)))
        .collect();
}

/// One lexed token: its tag and the text captured by its matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token category
    pub tag: Tag,
    /// Captured text (without introducers such as `:`, ` #` or ` //`)
    pub text: String,
}

impl Token {
    /// Create a token
    pub fn new(tag: Tag, text: impl Into<String>) -> Self {
        Self {
            tag,
            text: text.into(),
        }
    }
}

/// Lex one line into tokens.
///
/// Fails with [`ParseError::Unrecognized`] if any input is left that no
/// matcher accepts.
pub fn tokenize(line: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut rest = line;

    'scan: while !rest.is_empty() {
        for (tag, matcher) in MATCHERS.iter() {
            if let Some(caps) = matcher.captures(rest) {
                let whole = caps.get(0).map_or(0, |m| m.end());
                let text = caps.get(1).map_or("", |m| m.as_str());
                tokens.push(Token::new(*tag, text));
                rest = &rest[whole..];
                continue 'scan;
            }
        }
        break;
    }

    if rest.is_empty() {
        Ok(tokens)
    } else {
        Err(ParseError::Unrecognized {
            fragment: rest.to_string(),
            line: line.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(line: &str) -> Vec<Tag> {
        tokenize(line).unwrap().into_iter().map(|t| t.tag).collect()
    }

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(MATCHERS.len(), TOKEN_PATTERNS.len());
    }

    #[test]
    fn test_tokenize_full_line() {
        let tokens = tokenize(":led #0-2 r=255 g=0 b=0 &blink //test").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::new(Tag::Prefix, "led"),
                Token::new(Tag::Objects, "0-2"),
                Token::new(Tag::Key, "r"),
                Token::new(Tag::Number, "255"),
                Token::new(Tag::Key, "g"),
                Token::new(Tag::Number, "0"),
                Token::new(Tag::Key, "b"),
                Token::new(Tag::Number, "0"),
                Token::new(Tag::Flag, "&blink"),
                Token::new(Tag::Freetext, "test"),
            ]
        );
    }

    #[test]
    fn test_list_wins_over_number() {
        assert_eq!(tags(":x rgb=1,2,3"), vec![Tag::Prefix, Tag::Key, Tag::List]);
        assert_eq!(tags(":x n=12"), vec![Tag::Prefix, Tag::Key, Tag::Number]);
    }

    #[test]
    fn test_toggle_and_subtype() {
        assert_eq!(
            tags(":config:set greenhack=off"),
            vec![Tag::Prefix, Tag::Prefix, Tag::Key, Tag::Toggle]
        );
    }

    #[test]
    fn test_eol_is_tokenized() {
        assert_eq!(tags(":hi:welcome\r\n"), vec![Tag::Prefix, Tag::Prefix, Tag::Eol]);
    }

    #[test]
    fn test_freetext_keeps_everything() {
        let tokens = tokenize(":log // a=1 &b #3").unwrap();
        assert_eq!(tokens[1], Token::new(Tag::Freetext, " a=1 &b #3"));
    }

    #[test]
    fn test_residue_is_reported() {
        match tokenize(":led $bad") {
            Err(ParseError::Unrecognized { fragment, line }) => {
                assert_eq!(fragment, " $bad");
                assert_eq!(line, ":led $bad");
            },
            other => panic!("expected unrecognized input, got {other:?}"),
        }
    }

    #[test]
    fn test_uppercase_is_rejected() {
        assert!(tokenize(":LED").is_err());
    }
}
