//! The seam between the protocol core and the host language runtime.
//!
//! Everything in this module is a trait the embedding runtime implements;
//! the core only ever borrows values through them for the duration of a
//! single command.

use crate::session_state::ExportOptions;
use crate::stream::StreamKind;
use crate::symbol::Value;
use std::io::Read;

/// One activation record on the debuggee's call stack.
pub struct Frame<'a> {
    pub filename: String,
    pub lineno: u32,
    pub function_name: String,
    pub class_name: Option<String>,
    pub this: Option<&'a dyn Value>,
    pub locals: &'a dyn crate::symbol::Scope,
}

/// Failure from compiling or running an `evaluate()`'d snippet.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct EvalError(pub String);

/// The minimal set of operations the core needs from the host runtime to
/// drive a debugging session.
pub trait RuntimeIntrospector {
    /// The innermost active frame, if execution is currently suspended.
    fn current_frame(&self) -> Option<Frame<'_>>;

    /// The frame `depth` levels up from the innermost (`0` is current).
    fn frame(&self, depth: u32) -> Option<Frame<'_>>;

    /// The superglobals scope (`context_get -c 1`), if the embedding
    /// runtime distinguishes one from ordinary locals.
    fn globals(&self) -> Option<&dyn crate::symbol::Scope> {
        None
    }

    fn executed_file(&self) -> String;
    fn executed_line(&self) -> u32;
    fn stack_depth(&self) -> u32;

    /// Compile and execute `source` in the context of the active frame.
    fn evaluate(&mut self, source: &str) -> Result<Box<dyn Value>, EvalError>;

    /// Open a source URL (including the runtime's own virtual FS scheme)
    /// for streamed reading.
    fn open_source(&mut self, url: &str) -> std::io::Result<Box<dyn Read>>;

    fn install_stdout_hooks(&mut self);
    fn uninstall_stdout_hooks(&mut self);

    /// Drain whatever debuggee output has been captured since the last
    /// call, tagged by channel. The session controller polls this once
    /// per [`crate::session::Session::process_one`] call and turns each
    /// chunk into a `<stream>` event. Runtimes that install their hooks
    /// through [`crate::stream`] typically back this with a
    /// [`crate::stream::StreamGuard`]-fed buffer; the default is empty
    /// for runtimes that never enable redirection.
    fn take_stream_output(&mut self) -> Vec<(StreamKind, Vec<u8>)> {
        Vec::new()
    }
}

/// Renders a resolved value into the `<property>` subtree the wire
/// protocol expects, respecting the session's export options.
pub trait ValueRenderer {
    fn render(&self, name: &str, value: &dyn Value, options: &ExportOptions) -> String;
}
