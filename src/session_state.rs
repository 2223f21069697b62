//! The session lifecycle state machine: `Status`/`Reason`, stepping mode,
//! stream redirection flags, and the export options a Value Renderer
//! consumes.

use crate::feature::FeatureTable;

/// Lifecycle state of the debugger session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Starting,
    Running,
    Break,
    Stopping,
    Stopped,
    Detached,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Starting => "starting",
            Status::Running => "running",
            Status::Break => "break",
            Status::Stopping => "stopping",
            Status::Stopped => "stopped",
            Status::Detached => "detached",
        }
    }
}

/// Why the last status transition happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    Ok,
    Error,
    Aborted,
    Exception,
}

impl Reason {
    pub fn as_str(self) -> &'static str {
        match self {
            Reason::Ok => "ok",
            Reason::Error => "error",
            Reason::Aborted => "aborted",
            Reason::Exception => "exception",
        }
    }
}

/// How a stream channel (`stdout`/`stderr`) is currently handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamRedirect {
    Off,
    Copy,
    Redirect,
}

impl StreamRedirect {
    pub fn parse(c: u8) -> Option<Self> {
        match c {
            0 => Some(StreamRedirect::Off),
            1 => Some(StreamRedirect::Copy),
            2 => Some(StreamRedirect::Redirect),
            _ => None,
        }
    }
}

/// The execution mode the runtime consults at each statement boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    Run,
    StepInto,
    StepOver { level: u32 },
    StepOut { level: u32 },
}

/// One entry of the runtime's per-depth paging cursor, consumed by
/// `property_get`/`context_get` continuations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimePage {
    pub page: u32,
    pub current_element_nr: u32,
}

/// The export options a Value Renderer is given alongside a value.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub max_children: u32,
    pub max_data: u32,
    pub max_depth: u32,
    pub show_hidden: bool,
    pub runtime_pages: Vec<RuntimePage>,
}

impl ExportOptions {
    pub fn new(max_children: u32, max_data: u32, max_depth: u32) -> Self {
        ExportOptions {
            max_children,
            max_data,
            max_depth,
            show_hidden: false,
            runtime_pages: vec![RuntimePage::default(); max_depth as usize + 1],
        }
    }

    /// Resize `runtime_pages` to `max_depth + 1`, preserving existing
    /// entries, when `max_depth` changes via `feature_set`.
    pub fn set_max_depth(&mut self, max_depth: u32) {
        self.max_depth = max_depth;
        self.runtime_pages.resize(max_depth as usize + 1, RuntimePage::default());
    }
}

/// The complete mutable state of one debugger session.
pub struct SessionState {
    pub status: Status,
    pub reason: Reason,
    pub stdout_redirect: StreamRedirect,
    pub stderr_redirect: StreamRedirect,
    pub last_command: Option<String>,
    pub last_transaction_id: Option<String>,
    pub features: FeatureTable,
    pub options: ExportOptions,
    pub exec_mode: ExecMode,
    breakpoints_allowed: bool,
}

impl SessionState {
    pub fn new(features: FeatureTable) -> Self {
        let options = ExportOptions::new(
            features.max_children(),
            features.max_data(),
            features.max_depth(),
        );
        SessionState {
            status: Status::Starting,
            reason: Reason::Ok,
            stdout_redirect: StreamRedirect::Off,
            stderr_redirect: StreamRedirect::Off,
            last_command: None,
            last_transaction_id: None,
            features,
            options,
            exec_mode: ExecMode::Run,
            breakpoints_allowed: true,
        }
    }

    pub fn enter_break(&mut self, reason: Reason) {
        self.status = Status::Break;
        self.reason = reason;
    }

    pub fn enter_running(&mut self) {
        self.status = Status::Running;
        self.reason = Reason::Ok;
    }

    pub fn breakpoints_allowed(&self) -> bool {
        self.breakpoints_allowed
    }

    /// Clear the `breakpoints_allowed` guard for the duration of `f`,
    /// restoring it on every exit path (used by `eval` and `source`).
    pub fn with_breakpoints_suppressed<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let previous = self.breakpoints_allowed;
        self.breakpoints_allowed = false;
        let result = f(self);
        self.breakpoints_allowed = previous;
        result
    }
}
