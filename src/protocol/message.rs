//! Protocol messages for LED control.
//!
//! A [`Message`] is a plain value: type, optional subtype, a set of object
//! (pixel) indices, ordered key/value pairs, ordered flags and an optional
//! freetext comment. Its `Display` impl is the wire serializer.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Value, HANDSHAKE_SUBTYPE, HANDSHAKE_TYPE};
use crate::codec::{self, format_flag, format_ranges, format_value, normalize_name};
use crate::error::{LedError, ParseError, Result};

/// Result of a sigil-aware [`Message::lookup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// Answer to a `&name` or `!name` query
    Flag(bool),
    /// Stored value for a bare key
    Value(&'a Value),
}

/// Protocol message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMessage")]
pub struct Message {
    /// Message type
    #[serde(rename = "type")]
    msg_type: String,
    /// Optional subtype
    #[serde(skip_serializing_if = "Option::is_none")]
    subtype: Option<String>,
    /// Addressed objects
    #[serde(skip_serializing_if = "BTreeSet::is_empty", default)]
    objects: BTreeSet<u32>,
    /// Key/value pairs in first-insertion order
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    values: Vec<(String, Value)>,
    /// Flags in first-insertion order
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    flags: Vec<(String, bool)>,
    /// Trailing comment
    #[serde(skip_serializing_if = "Option::is_none")]
    freetext: Option<String>,
}

/// Deserialized shape of a [`Message`] before normalization
#[derive(Deserialize)]
struct RawMessage {
    #[serde(rename = "type")]
    msg_type: String,
    subtype: Option<String>,
    #[serde(default)]
    objects: Vec<u32>,
    #[serde(default)]
    values: Vec<(String, Value)>,
    #[serde(default)]
    flags: Vec<(String, bool)>,
    freetext: Option<String>,
}

impl TryFrom<RawMessage> for Message {
    type Error = LedError;

    fn try_from(raw: RawMessage) -> Result<Self> {
        let mut message = Message::new(&raw.msg_type)?;
        if let Some(subtype) = raw.subtype {
            message.set_subtype(&subtype);
        }
        message.add_objects(raw.objects);
        for (key, value) in raw.values {
            message.set_value(&key, value);
        }
        for (flag, polarity) in raw.flags {
            message.add_flag_with(&flag, polarity);
        }
        if let Some(text) = raw.freetext {
            message.store_freetext(&text);
        }
        Ok(message)
    }
}

impl Message {
    /// Create a message of the given type.
    ///
    /// A leading `:` is stripped and the name normalized; a type that
    /// normalizes to nothing is rejected.
    pub fn new(msg_type: &str) -> Result<Self> {
        let mut message = Self {
            msg_type: String::new(),
            subtype: None,
            objects: BTreeSet::new(),
            values: Vec::new(),
            flags: Vec::new(),
            freetext: None,
        };
        message.set_type(msg_type)?;
        Ok(message)
    }

    /// Parse one wire line.
    ///
    /// Unlike [`codec::parse_line`], a blank line is an error here.
    pub fn parse(line: &str) -> std::result::Result<Self, ParseError> {
        codec::MessageParser::new().parse(line)
    }

    /// Builder: set subtype
    pub fn with_subtype(mut self, subtype: &str) -> Self {
        self.set_subtype(subtype);
        self
    }

    /// Builder: add objects
    pub fn with_objects(mut self, objects: impl IntoIterator<Item = u32>) -> Self {
        self.add_objects(objects);
        self
    }

    /// Builder: set one value
    pub fn with_value(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set_value(key, value);
        self
    }

    /// Builder: add one flag (`name`, `&name` or `!name`)
    pub fn with_flag(mut self, flag: &str) -> Self {
        self.add_flag(flag);
        self
    }

    /// Builder: set freetext
    pub fn with_freetext(mut self, text: &str) -> Self {
        self.set_freetext(text);
        self
    }

    /// Replace the type.
    pub fn set_type(&mut self, msg_type: &str) -> Result<&mut Self> {
        let name = normalize_name(strip_prefix(msg_type, ":"));
        if name.is_empty() {
            return Err(LedError::InvalidMessage(format!(
                "message type '{msg_type}' is empty after normalization"
            )));
        }
        self.msg_type = name;
        Ok(self)
    }

    /// Replace the subtype. An empty subtype clears it.
    pub fn set_subtype(&mut self, subtype: &str) -> &mut Self {
        let name = normalize_name(strip_prefix(subtype, ":"));
        self.subtype = (!name.is_empty()).then_some(name);
        self
    }

    /// Replace the freetext. A leading `//` is stripped; line breaks become
    /// spaces so the message stays on one line.
    pub fn set_freetext(&mut self, text: &str) -> &mut Self {
        self.store_freetext(strip_prefix(text, "//"))
    }

    /// Store freetext that has already lost its `//` introducer.
    pub(crate) fn store_freetext(&mut self, text: &str) -> &mut Self {
        let text: String = text
            .chars()
            .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
            .collect();
        let text = text.trim_end();
        self.freetext = (!text.is_empty()).then(|| text.to_string());
        self
    }

    /// Remove the freetext
    pub fn clear_freetext(&mut self) -> &mut Self {
        self.freetext = None;
        self
    }

    /// Union objects into the set
    pub fn add_objects(&mut self, objects: impl IntoIterator<Item = u32>) -> &mut Self {
        self.objects.extend(objects);
        self
    }

    /// Set one value, overwriting an existing key in place.
    pub fn set_value(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        let key = normalize_name(key);
        if key.is_empty() {
            tracing::warn!("Ignoring value for key that normalizes to nothing");
            return self;
        }
        let value = value.into();
        if matches!(&value, Value::List(items) if items.is_empty()) {
            tracing::warn!("Ignoring empty list for key '{}'", key);
            return self;
        }
        match self.values.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.values.push((key, value)),
        }
        self
    }

    /// Merge several key/value pairs
    pub fn set_values<K, V>(&mut self, pairs: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (k, v) in pairs {
            self.set_value(k.as_ref(), v);
        }
        self
    }

    /// Add a flag. `&name` sets it, `!name` clears it, a bare name sets it.
    pub fn add_flag(&mut self, flag: &str) -> &mut Self {
        let polarity = !flag.starts_with('!');
        self.add_flag_with(flag, polarity)
    }

    /// Add a flag with an explicit polarity, ignoring any sigil on `flag`.
    pub fn add_flag_with(&mut self, flag: &str, polarity: bool) -> &mut Self {
        let name = normalize_name(strip_sigil(flag));
        if name.is_empty() {
            tracing::warn!("Ignoring flag '{}' that normalizes to nothing", flag);
            return self;
        }
        match self.flags.iter_mut().find(|(f, _)| *f == name) {
            Some((_, slot)) => *slot = polarity,
            None => self.flags.push((name, polarity)),
        }
        self
    }

    /// Add several flags
    pub fn add_flags<S: AsRef<str>>(&mut self, flags: impl IntoIterator<Item = S>) -> &mut Self {
        for flag in flags {
            self.add_flag(flag.as_ref());
        }
        self
    }

    /// Message type, without the `:`
    pub fn msg_type(&self) -> &str {
        &self.msg_type
    }

    /// Subtype, without the `:`
    pub fn subtype(&self) -> Option<&str> {
        self.subtype.as_deref()
    }

    /// Freetext, without the `//`
    pub fn freetext(&self) -> Option<&str> {
        self.freetext.as_deref()
    }

    /// Objects in ascending order
    pub fn objects(&self) -> &BTreeSet<u32> {
        &self.objects
    }

    /// Key/value pairs in insertion order
    pub fn values(&self) -> &[(String, Value)] {
        &self.values
    }

    /// Flags in insertion order
    pub fn flags(&self) -> &[(String, bool)] {
        &self.flags
    }

    /// Get a value by key
    pub fn value(&self, key: &str) -> Option<&Value> {
        let key = normalize_name(key);
        self.values.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Get a flag's stored polarity
    pub fn flag(&self, name: &str) -> Option<bool> {
        let name = normalize_name(strip_sigil(name));
        self.flags.iter().find(|(f, _)| *f == name).map(|(_, p)| *p)
    }

    /// Sigil-aware lookup.
    ///
    /// - `&name`: the flag's polarity, `false` when absent
    /// - `!name`: `true` when the flag is absent or explicitly cleared
    /// - `name`: the stored value, or [`LedError::MissingKey`]
    pub fn lookup(&self, item: &str) -> Result<Lookup<'_>> {
        if let Some(name) = item.strip_prefix('&') {
            return Ok(Lookup::Flag(self.flag(name).unwrap_or(false)));
        }
        if let Some(name) = item.strip_prefix('!') {
            return Ok(Lookup::Flag(!self.flag(name).unwrap_or(false)));
        }
        self.value(item)
            .map(Lookup::Value)
            .ok_or_else(|| LedError::MissingKey(item.to_string()))
    }

    /// Presence test: sigil-prefixed items test flags, bare items values.
    pub fn contains(&self, item: &str) -> bool {
        if item.starts_with(['&', '!']) {
            self.flag(item).is_some()
        } else {
            self.value(item).is_some()
        }
    }

    /// Whether this is the `:hi:welcome` handshake
    pub fn is_handshake(&self) -> bool {
        self.msg_type == HANDSHAKE_TYPE && self.subtype.as_deref() == Some(HANDSHAKE_SUBTYPE)
    }

    /// `:type[:subtype]`
    pub fn prefixes(&self) -> String {
        match &self.subtype {
            Some(sub) => format!(":{}:{sub}", self.msg_type),
            None => format!(":{}", self.msg_type),
        }
    }

    /// The object, value and flag segment of the wire line
    pub fn args(&self) -> String {
        let mut out = String::new();
        self.write_args(&mut out);
        out
    }

    /// Values and flags as one ordered mapping with `_` in place of `-`.
    ///
    /// Flags appear as [`Value::Bool`]. Built fresh on every call.
    pub fn kwargs(&self) -> Vec<(String, Value)> {
        let mut pairs: Vec<(String, Value)> = Vec::with_capacity(self.values.len() + self.flags.len());
        let values = self.values.iter().map(|(k, v)| (k.replace('-', "_"), v.clone()));
        let flags = self
            .flags
            .iter()
            .map(|(f, p)| (f.replace('-', "_"), Value::Bool(*p)));
        for (key, value) in values.chain(flags) {
            match pairs.iter_mut().find(|(k, _)| *k == key) {
                Some((_, slot)) => *slot = value,
                None => pairs.push((key, value)),
            }
        }
        pairs
    }

    /// Wire form, including the trailing line break
    pub fn to_wire(&self) -> String {
        self.to_string()
    }

    /// Multi-line human readable description
    pub fn report(&self) -> String {
        let title = format!("{} message", self.prefixes());
        let mut lines = vec![format!("[ {title} ]")];
        if !self.objects.is_empty() {
            lines.push(format!("  Objects: #{}", format_ranges(&self.objects)));
        }
        if !self.values.is_empty() {
            lines.push("  Values:".to_string());
            for (k, v) in &self.values {
                lines.push(format!("    {k}={}", format_value(v)));
            }
        }
        if !self.flags.is_empty() {
            let flags: Vec<String> = self.flags.iter().map(|(f, p)| format_flag(f, *p)).collect();
            lines.push(format!("  Flags: {}", flags.join(" ")));
        }
        if let Some(text) = &self.freetext {
            lines.push(format!("  //{text}"));
        }
        lines.push(format!("--{}--", "-".repeat(title.len())));
        lines.join("\n")
    }

    /// One-line summary: prefixes, objects and freetext
    pub fn brief(&self) -> String {
        let mut out = format!("[ {}", self.prefixes());
        if !self.objects.is_empty() {
            let _ = write!(out, " #{}", format_ranges(&self.objects));
        }
        out.push_str(" ]");
        if let Some(text) = &self.freetext {
            let _ = write!(out, " //{text}");
        }
        out
    }

    fn write_args(&self, out: &mut String) {
        if !self.objects.is_empty() {
            let _ = write!(out, " #{}", format_ranges(&self.objects));
        }
        for (k, v) in &self.values {
            let _ = write!(out, " {k}={}", format_value(v));
        }
        for (f, p) in &self.flags {
            let _ = write!(out, " {}", format_flag(f, *p));
        }
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut line = self.prefixes();
        self.write_args(&mut line);
        if let Some(text) = &self.freetext {
            let _ = write!(line, " //{text}");
        }
        writeln!(f, "{line}")
    }
}

impl FromStr for Message {
    type Err = ParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Message::parse(s)
    }
}

fn strip_prefix<'a>(text: &'a str, prefix: &str) -> &'a str {
    text.strip_prefix(prefix).unwrap_or(text)
}

fn strip_sigil(flag: &str) -> &str {
    flag.strip_prefix(['&', '!']).unwrap_or(flag)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn led() -> Message {
        Message::new("led").unwrap()
    }

    #[test]
    fn test_serialize_full_message() {
        let msg = led()
            .with_objects([2, 0, 1])
            .with_value("r", 255u8)
            .with_value("g", 0u8)
            .with_value("b", 0u8)
            .with_flag("&blink")
            .with_freetext("//test");
        assert_eq!(msg.to_wire(), ":led #0-2 r=255 g=0 b=0 &blink //test\n");
    }

    #[test]
    fn test_serialize_minimal_message() {
        let msg = Message::new(":hi").unwrap().with_subtype(":welcome");
        assert_eq!(msg.to_string(), ":hi:welcome\n");
        assert!(msg.is_handshake());
    }

    #[test]
    fn test_empty_type_rejected() {
        assert!(Message::new(":").is_err());
        assert!(Message::new("42").is_err());
    }

    #[test]
    fn test_fresh_containers_per_instance() {
        let mut a = led();
        a.add_objects([1, 2]);
        let b = led();
        assert!(b.objects().is_empty());
    }

    #[test]
    fn test_set_values_overwrites_in_place() {
        let mut msg = led();
        msg.set_values([("r", 1u8), ("g", 2u8)]);
        msg.set_value("r", 9u8);
        assert_eq!(msg.to_wire(), ":led r=9 g=2\n");
    }

    #[test]
    fn test_keys_are_normalized() {
        let msg = led().with_value("Keep_Alive", 5u8).with_flag("!Fade_Out");
        assert_eq!(msg.to_wire(), ":led keep-alive=5 !fade-out\n");
        assert_eq!(msg.value("keep_alive"), Some(&Value::Int(5)));
    }

    #[test]
    fn test_empty_names_ignored() {
        let msg = led().with_value("123", 5u8).with_flag("&");
        assert!(msg.values().is_empty());
        assert!(msg.flags().is_empty());
    }

    #[test]
    fn test_flag_polarity_and_overwrite() {
        let mut msg = led();
        msg.add_flags(["blink", "!stack", "&plan"]);
        assert_eq!(msg.flag("blink"), Some(true));
        assert_eq!(msg.flag("stack"), Some(false));
        msg.add_flag("&stack");
        assert_eq!(msg.flags()[1], ("stack".to_string(), true));
        msg.add_flag_with("&plan", false);
        assert_eq!(msg.flag("plan"), Some(false));
    }

    #[test]
    fn test_lookup_sigils() {
        let msg = led().with_flag("&on").with_flag("!off").with_value("r", 3u8);

        assert_eq!(msg.lookup("&on").unwrap(), Lookup::Flag(true));
        assert_eq!(msg.lookup("&off").unwrap(), Lookup::Flag(false));
        assert_eq!(msg.lookup("&absent").unwrap(), Lookup::Flag(false));

        assert_eq!(msg.lookup("!on").unwrap(), Lookup::Flag(false));
        assert_eq!(msg.lookup("!off").unwrap(), Lookup::Flag(true));
        assert_eq!(msg.lookup("!absent").unwrap(), Lookup::Flag(true));

        assert_eq!(msg.lookup("r").unwrap(), Lookup::Value(&Value::Int(3)));
        assert!(matches!(msg.lookup("g"), Err(LedError::MissingKey(k)) if k == "g"));
    }

    #[test]
    fn test_contains() {
        let msg = led().with_flag("!off").with_value("r", 3u8);
        assert!(msg.contains("&off"));
        assert!(msg.contains("!off"));
        assert!(!msg.contains("&blink"));
        assert!(msg.contains("r"));
        assert!(!msg.contains("g"));
    }

    #[test]
    fn test_freetext_stays_on_one_line() {
        let msg = led().with_freetext("two\nlines  ");
        assert_eq!(msg.freetext(), Some("two lines"));
        let msg = led().with_freetext("//");
        assert_eq!(msg.freetext(), None);
    }

    #[test]
    fn test_kwargs() {
        let msg = led()
            .with_value("keep-alive", 10u8)
            .with_flag("!fade-in")
            .with_flag("blink");
        assert_eq!(
            msg.kwargs(),
            vec![
                ("keep_alive".to_string(), Value::Int(10)),
                ("fade_in".to_string(), Value::Bool(false)),
                ("blink".to_string(), Value::Bool(true)),
            ]
        );
    }

    #[test]
    fn test_prefixes_args_brief() {
        let msg = Message::new("led")
            .unwrap()
            .with_subtype("set")
            .with_objects([0, 1, 2, 7])
            .with_value("rgb", vec![1u8, 2, 3])
            .with_flag("!stack")
            .with_freetext("hello");
        assert_eq!(msg.prefixes(), ":led:set");
        assert_eq!(msg.args(), " #0-2,7 rgb=1,2,3 !stack");
        assert_eq!(msg.brief(), "[ :led:set #0-2,7 ] //hello");
    }

    #[test]
    fn test_report() {
        let msg = led().with_objects([3]).with_value("r", 1u8).with_flag("blink");
        let report = msg.report();
        assert!(report.starts_with("[ :led message ]"));
        assert!(report.contains("  Objects: #3"));
        assert!(report.contains("    r=1"));
        assert!(report.contains("  Flags: &blink"));
        assert!(report.ends_with(&format!("--{}--", "-".repeat(":led message".len()))));
    }

    #[test]
    fn test_json_serialization() {
        let msg = led().with_objects([1]).with_value("r", 2u8);
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"led","objects":[1],"values":[["r",2]]}"#);
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_json_is_normalized() {
        let json = r#"{"type":"LED","subtype":":Set","objects":[3,1,3],"values":[["R_G",1],["r-g",[4,5]],["b",[]]],"flags":[["&Blink",true],["blink",false]],"freetext":"//x\ny"}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.to_wire(), ":led:set #1,3 r-g=4,5 !blink ////x y\n");

        assert!(serde_json::from_str::<Message>(r#"{"type":""}"#).is_err());
        assert!(serde_json::from_str::<Message>(r#"{"type":"1:2","values":[["r",1]]}"#).is_err());
    }

    #[test]
    fn test_empty_list_is_ignored() {
        let msg = led().with_value("rgb", Vec::<u8>::new());
        assert!(msg.values().is_empty());
        assert_eq!(msg.to_wire(), ":led\n");

        let msg = led().with_value("rgb", vec![1u8, 2]).with_value("rgb", Vec::<u8>::new());
        assert_eq!(msg.value("rgb"), Some(&Value::List(vec![1, 2])));
    }

    #[test]
    fn test_single_item_list_reads_back_as_int() {
        let msg = led().with_value("k", vec![7u8]);
        assert_eq!(msg.value("k"), Some(&Value::List(vec![7])));
        assert_eq!(msg.to_wire(), ":led k=7\n");

        let back = Message::parse(&msg.to_wire()).unwrap();
        assert_eq!(back.value("k"), Some(&Value::Int(7)));
    }
}
