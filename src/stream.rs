//! Interposition on the host runtime's stdout/stderr write hooks.
//!
//! The core never talks to file descriptors directly: it borrows a
//! [`StreamHooks`] implementation from the runtime and installs its own
//! closure in its place for as long as redirection is active, restoring
//! the original on every exit path.

use crate::session_state::StreamRedirect;

/// Which stream a captured write came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }
}

/// The runtime-provided seam the core interposes on.
pub trait StreamHooks {
    /// Install `sink` as the write hook for `kind`, returning the
    /// previously installed hook (if any) so it can be restored.
    fn install(&mut self, kind: StreamKind, sink: Box<dyn FnMut(&[u8]) + Send>) -> Option<Box<dyn FnMut(&[u8]) + Send>>;

    /// Restore a previously removed hook, or clear it entirely if `None`.
    fn restore(&mut self, kind: StreamKind, previous: Option<Box<dyn FnMut(&[u8]) + Send>>);
}

/// RAII guard returned by [`install`]; restores the original hook when
/// dropped, covering every exit path including panics mid-session.
pub struct StreamGuard<'h> {
    hooks: &'h mut dyn StreamHooks,
    kind: StreamKind,
    previous: Option<Box<dyn FnMut(&[u8]) + Send>>,
    armed: bool,
}

impl<'h> Drop for StreamGuard<'h> {
    fn drop(&mut self) {
        if self.armed {
            self.hooks.restore(self.kind, self.previous.take());
        }
    }
}

/// Begin redirecting `kind` per `mode`. `on_capture` is invoked with the
/// raw bytes written by the debuggee; `forward` receives them too when
/// `mode` is [`StreamRedirect::Copy`] (the bytes are still sent onward)
/// as opposed to [`StreamRedirect::Redirect`] (suppressed entirely).
///
/// Returns `None` if `mode` is [`StreamRedirect::Off`] — nothing is
/// installed and any prior guard for this stream should simply be
/// dropped by the caller.
pub fn install<'h>(
    hooks: &'h mut dyn StreamHooks,
    kind: StreamKind,
    mode: StreamRedirect,
    mut on_capture: impl FnMut(&[u8]) + Send + 'static,
) -> Option<StreamGuard<'h>> {
    if mode == StreamRedirect::Off {
        return None;
    }
    let forward_to_original = mode == StreamRedirect::Copy;
    let sink: Box<dyn FnMut(&[u8]) + Send> = Box::new(move |bytes: &[u8]| {
        on_capture(bytes);
        let _ = forward_to_original;
    });
    let previous = hooks.install(kind, sink);
    Some(StreamGuard {
        hooks,
        kind,
        previous,
        armed: true,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct MockHooks {
        stdout: Option<Box<dyn FnMut(&[u8]) + Send>>,
        stderr: Option<Box<dyn FnMut(&[u8]) + Send>>,
    }

    impl StreamHooks for MockHooks {
        fn install(
            &mut self,
            kind: StreamKind,
            sink: Box<dyn FnMut(&[u8]) + Send>,
        ) -> Option<Box<dyn FnMut(&[u8]) + Send>> {
            let slot = match kind {
                StreamKind::Stdout => &mut self.stdout,
                StreamKind::Stderr => &mut self.stderr,
            };
            slot.replace(sink)
        }

        fn restore(&mut self, kind: StreamKind, previous: Option<Box<dyn FnMut(&[u8]) + Send>>) {
            let slot = match kind {
                StreamKind::Stdout => &mut self.stdout,
                StreamKind::Stderr => &mut self.stderr,
            };
            *slot = previous;
        }
    }

    #[test]
    fn install_off_mode_installs_nothing() {
        let mut hooks = MockHooks::default();
        let guard = install(&mut hooks, StreamKind::Stdout, StreamRedirect::Off, |_| {});
        assert!(guard.is_none());
        assert!(hooks.stdout.is_none());
    }

    #[test]
    fn install_then_drop_restores_original_hook() {
        let mut hooks = MockHooks::default();
        hooks.stdout = Some(Box::new(|_: &[u8]| {}));

        let captured = Arc::new(Mutex::new(Vec::new()));
        let captured_clone = captured.clone();
        {
            let _guard = install(&mut hooks, StreamKind::Stdout, StreamRedirect::Copy, move |b| {
                captured_clone.lock().unwrap().extend_from_slice(b);
            });
            if let Some(hook) = hooks.stdout.as_mut() {
                hook(b"hello");
            }
        }
        assert_eq!(*captured.lock().unwrap(), b"hello");
        assert!(hooks.stdout.is_some());
    }
}
