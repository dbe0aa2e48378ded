//! Protocol module - status lines, command text, and response framing.
//!
//! This module implements the text protocol pieces of the engine:
//! - Status line parsing and the status codes the client relies on
//! - Command builders and wire encoding
//! - Response buffer for assembling lines and blocks from partial reads

pub mod command;
mod response_buffer;
mod status;

pub use command::{
    authinfo_pass, authinfo_user, body, bracket_message_id, encode_command, group, head, quit,
    stat_id, stat_number, CRLF,
};
pub(crate) use response_buffer::find;
pub use response_buffer::{
    ResponseBuffer, BLOCK_TERMINATOR, DEFAULT_INITIAL_CAPACITY, DEFAULT_MAX_BUFFER_SIZE,
    LINE_TERMINATOR,
};
pub use status::{codes, StatusLine};
