//! # ledlink - LED Host Line Protocol Client
//!
//! Client library for controlling addressable LED pixel strips over a
//! line-oriented text protocol on TCP.
//!
//! ## Features
//!
//! - **Wire codec**: priority-ordered tokenizer and grammar parser for
//!   `:type:subtype #ranges key=value &flag //freetext` lines
//! - **Message model**: typed values, object sets, ordered flags, contracts
//!   that report every violation at once
//! - **Dispatch**: explicit `(type, subtype)` / `type` / catch-all registry
//! - **Transport**: single-threaded non-blocking socket with line framing,
//!   ordered outbound queueing and once-only lifecycle reporting
//!
//! ## Protocol Overview
//!
//! ```text
//! Client                            LED host
//!    |                                |
//!    |------- TCP connect ---------->|
//!    |<------- :hi:welcome ----------|  Session ready
//!    |                                |
//!    |--- :led #0-2 r=255 &blink --->|
//!    |<-- :led:ok #0-2 --------------|
//!    |                                |
//!    |<========== EOF ===============|  Disconnected (reported once)
//! ```
//!
//! ### Session States
//!
//! ```text
//!     [Connecting] ── first writable ──> [Connected] ── EOF / error ──> [Closed]
//!          │                                                              ^
//!          └──────────────────── connect failed ─────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ### Parsing and Building Messages
//!
//! ```rust,ignore
//! use ledlink::Message;
//!
//! let msg = Message::parse(":led #0-2 r=255 g=0 b=0 &blink //test")?;
//! assert_eq!(msg.msg_type(), "led");
//! assert_eq!(msg.objects().len(), 3);
//!
//! let reply = Message::new("led")?.with_subtype("ok").with_objects([0, 1, 2]);
//! assert_eq!(reply.to_wire(), ":led:ok #0-2\n");
//! ```
//!
//! ### Talking to a Host
//!
//! ```rust,ignore
//! use ledlink::{Client, Config, LogLifecycle, Message};
//!
//! let config = Config::from_env();
//! let mut client = Client::connect(&config.connection, LogLifecycle)?;
//! client.run_until(|c| c.is_ready(), None)?;
//! client.send(&Message::new("led")?.with_objects(0..10).with_value("r", 255u8))?;
//! client.flush()?;
//! ```
//!
//! ## Modules
//!
//! - [`codec`]: Tokenizer, parser and wire formatting
//! - [`protocol`]: Message model, validation, dispatch and session state
//! - [`transport`]: Non-blocking connection and client event loop
//! - [`config`]: Configuration management
//! - [`error`]: Error types and result aliases

pub mod codec;
pub mod config;
pub mod error;
pub mod protocol;
pub mod transport;

// Re-exports for convenience
pub use codec::parse_line;
pub use config::{Config, ConnectionConfig, DEFAULT_PORT};
pub use error::{LedError, ParseError, Result, ValidationError};
pub use protocol::{Contract, Dispatcher, Message, Route, Session, SessionState, Value};
pub use transport::{Client, Connection, Lifecycle, LogLifecycle};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
