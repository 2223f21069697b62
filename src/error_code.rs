use std::fmt;

/// The numeric error codes defined by the DBGp wire protocol.
///
/// Every command response that fails carries one of these as
/// `<error code="N"><message>...</message></error>`. The set and the
/// canonical messages below must match the protocol verbatim; do not
/// reword them even when a message reads awkwardly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCode {
    NoError,
    ParseError,
    DuplicateArguments,
    InvalidOrMissingOptions,
    UnimplementedCommand,
    CommandNotAvailable,
    CannotOpenFile,
    StreamRedirectFailed,
    BreakpointCouldNotBeSet,
    BreakpointTypeNotSupported,
    InvalidLine,
    NoCodeOnLine,
    InvalidState,
    NoSuchBreakpoint,
    ErrorEvaluatingCode,
    InvalidExpression,
    CannotGetProperty,
    StackDepthInvalid,
    ContextInvalid,
    ProfilerNotStarted,
    EncodingNotSupported,
    InternalException,
    UnknownError,
}

impl ErrorCode {
    /// The numeric code as it appears on the wire.
    pub const fn code(self) -> u32 {
        use ErrorCode::*;
        match self {
            NoError => 0,
            ParseError => 1,
            DuplicateArguments => 2,
            InvalidOrMissingOptions => 3,
            UnimplementedCommand => 4,
            CommandNotAvailable => 5,
            CannotOpenFile => 100,
            StreamRedirectFailed => 101,
            BreakpointCouldNotBeSet => 200,
            BreakpointTypeNotSupported => 201,
            InvalidLine => 202,
            NoCodeOnLine => 203,
            InvalidState => 204,
            NoSuchBreakpoint => 205,
            ErrorEvaluatingCode => 206,
            InvalidExpression => 207,
            CannotGetProperty => 300,
            StackDepthInvalid => 301,
            ContextInvalid => 302,
            ProfilerNotStarted => 800,
            EncodingNotSupported => 900,
            InternalException => 998,
            UnknownError => 999,
        }
    }

    /// The canonical, protocol-mandated message text.
    pub const fn message(self) -> &'static str {
        use ErrorCode::*;
        match self {
            NoError => "no error",
            ParseError => "parse error in command",
            DuplicateArguments => "duplicate arguments in command",
            InvalidOrMissingOptions => "invalid or missing options",
            UnimplementedCommand => "unimplemented command",
            CommandNotAvailable => "command is not available",
            CannotOpenFile => "cannot open file",
            StreamRedirectFailed => "stream redirect failed",
            BreakpointCouldNotBeSet => "breakpoint could not be set",
            BreakpointTypeNotSupported => "breakpoint type is not supported",
            InvalidLine => "invalid line",
            NoCodeOnLine => "no code on line",
            InvalidState => "invalid state",
            NoSuchBreakpoint => "no such breakpoint",
            ErrorEvaluatingCode => "error evaluating code",
            InvalidExpression => "invalid expression",
            CannotGetProperty => "can not get property",
            StackDepthInvalid => "stack depth invalid",
            ContextInvalid => "context invalid",
            ProfilerNotStarted => "profiler not started",
            EncodingNotSupported => "encoding not supported",
            InternalException => "internal exception in the debugger",
            UnknownError => "unknown error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn codes_match_the_protocol_table() {
        assert_eq!(ErrorCode::NoError.code(), 0);
        assert_eq!(ErrorCode::ParseError.code(), 1);
        assert_eq!(ErrorCode::DuplicateArguments.code(), 2);
        assert_eq!(ErrorCode::InvalidOrMissingOptions.code(), 3);
        assert_eq!(ErrorCode::UnimplementedCommand.code(), 4);
        assert_eq!(ErrorCode::CommandNotAvailable.code(), 5);
        assert_eq!(ErrorCode::CannotOpenFile.code(), 100);
        assert_eq!(ErrorCode::StreamRedirectFailed.code(), 101);
        assert_eq!(ErrorCode::BreakpointCouldNotBeSet.code(), 200);
        assert_eq!(ErrorCode::BreakpointTypeNotSupported.code(), 201);
        assert_eq!(ErrorCode::InvalidLine.code(), 202);
        assert_eq!(ErrorCode::NoCodeOnLine.code(), 203);
        assert_eq!(ErrorCode::InvalidState.code(), 204);
        assert_eq!(ErrorCode::NoSuchBreakpoint.code(), 205);
        assert_eq!(ErrorCode::ErrorEvaluatingCode.code(), 206);
        assert_eq!(ErrorCode::InvalidExpression.code(), 207);
        assert_eq!(ErrorCode::CannotGetProperty.code(), 300);
        assert_eq!(ErrorCode::StackDepthInvalid.code(), 301);
        assert_eq!(ErrorCode::ContextInvalid.code(), 302);
        assert_eq!(ErrorCode::ProfilerNotStarted.code(), 800);
        assert_eq!(ErrorCode::EncodingNotSupported.code(), 900);
        assert_eq!(ErrorCode::InternalException.code(), 998);
        assert_eq!(ErrorCode::UnknownError.code(), 999);
    }

    #[test]
    fn message_is_canonical() {
        assert_eq!(ErrorCode::ParseError.message(), "parse error in command");
        assert_eq!(
            ErrorCode::BreakpointCouldNotBeSet.message(),
            "breakpoint could not be set"
        );
    }
}
