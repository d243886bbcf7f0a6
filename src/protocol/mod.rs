//! LED control message model, validation, dispatch and session state.
//!
//! # Wire Format
//!
//! ```text
//! :type[:subtype][ #ranges][ key=value]*[ &flag | !flag]*[ //freetext]
//! ```
//!
//! | Part       | Example        | Meaning                                |
//! |------------|----------------|----------------------------------------|
//! | type       | `:led`         | What the message is about (required)   |
//! | subtype    | `:set`         | Refinement of the type                 |
//! | objects    | `#0-2,5`       | Addressed pixels, ranges inclusive     |
//! | key=value  | `r=255`        | `on`/`off`, an integer or `1,2,3`      |
//! | flag       | `&blink`       | `&` sets, `!` clears                   |
//! | freetext   | `//note`       | Human readable rest of the line        |
//!
//! ## Message Flow
//!
//! ```text
//! Client                            LED host
//!    |                                |
//!    |<------- :hi:welcome ----------|  Session becomes ready
//!    |                                |
//!    |------- :led #0-2 r=255 ------>|  Commands
//!    |<------ :led:ok ---------------|  Replies, routed by type/subtype
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use ledlink::protocol::{Contract, Message};
//!
//! let msg = Message::new("led")?
//!     .with_objects([0, 1, 2])
//!     .with_value("r", 255u8)
//!     .with_flag("&blink");
//! assert_eq!(msg.to_wire(), ":led #0-2 r=255 &blink\n");
//!
//! msg.validate(&Contract::new().require_objects().require_values(["r"]).accept_flags(["blink"]))?;
//! ```

mod dispatch;
mod message;
mod session;
mod validate;
mod value;

pub use dispatch::{Dispatcher, Handler, Route};
pub use message::{Lookup, Message};
pub use session::{Session, SessionState, SessionStats};
pub use validate::Contract;
pub use value::Value;

/// Type of the greeting that marks a session ready
pub const HANDSHAKE_TYPE: &str = "hi";

/// Subtype of the greeting that marks a session ready
pub const HANDSHAKE_SUBTYPE: &str = "welcome";
