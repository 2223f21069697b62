//! Static command dispatch table.
//!
//! Handlers live on [`crate::session::Session`]; this module only owns
//! the name → metadata mapping and the lookup helpers the session loop
//! and the feature registry's fallback both need.

use crate::error_code::ErrorCode;

bitflags::bitflags! {
    /// Flags attached to a command-table entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CommandFlags: u8 {
        /// Permitted even while `status = stopping` (post-mortem commands).
        const POST_MORTEM = 0b0000_0001;
    }
}

/// One row of the static dispatch table.
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    pub flags: CommandFlags,
    /// Whether a successful dispatch of this command hands control back
    /// to the runtime (`status` becomes `running` once the reply is sent).
    pub continues: bool,
}

macro_rules! spec {
    ($name:expr) => {
        CommandSpec {
            name: $name,
            flags: CommandFlags::empty(),
            continues: false,
        }
    };
    ($name:expr, continues) => {
        CommandSpec {
            name: $name,
            flags: CommandFlags::empty(),
            continues: true,
        }
    };
    ($name:expr, post_mortem) => {
        CommandSpec {
            name: $name,
            flags: CommandFlags::POST_MORTEM,
            continues: false,
        }
    };
}

/// The full set of recognized commands.
pub static COMMANDS: &[CommandSpec] = &[
    // Breakpoints
    spec!("breakpoint_set"),
    spec!("breakpoint_get"),
    spec!("breakpoint_update"),
    spec!("breakpoint_remove"),
    spec!("breakpoint_list", post_mortem),
    // Execution
    spec!("run", continues),
    spec!("step_into", continues),
    spec!("step_over", continues),
    spec!("step_out", continues),
    spec!("stop", post_mortem),
    spec!("detach"),
    // Inspection
    spec!("stack_depth"),
    spec!("stack_get"),
    spec!("context_names", post_mortem),
    spec!("context_get"),
    spec!("property_get"),
    spec!("property_value"),
    spec!("property_set"),
    spec!("typemap_get", post_mortem),
    spec!("source"),
    // Session
    spec!("status", post_mortem),
    spec!("feature_get", post_mortem),
    spec!("feature_set"),
    spec!("eval"),
    // Streams
    spec!("stdout"),
    spec!("stderr"),
    // Extensions
    spec!("xcmd_profiler_name_get", post_mortem),
    spec!("xcmd_get_executable_lines"),
];

pub fn lookup(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|c| c.name == name)
}

pub fn is_known_command(name: &str) -> bool {
    lookup(name).is_some()
}

/// Validate that `name` is dispatchable given the current session
/// status.
pub fn check_available(name: &str, stopping: bool) -> Result<&'static CommandSpec, ErrorCode> {
    let spec = lookup(name).ok_or(ErrorCode::UnimplementedCommand)?;
    if stopping && !spec.flags.contains(CommandFlags::POST_MORTEM) {
        return Err(ErrorCode::CommandNotAvailable);
    }
    Ok(spec)
}
