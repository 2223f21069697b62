//! Wire codec: outbound framing and inbound command-line parsing.

mod command_line;
mod frame;

pub use command_line::CommandLine;
pub use frame::{read_command_line, write_message};
