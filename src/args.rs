//! Typed view over a parsed DBGp command line.
//!
//! The wire protocol hands every command a fixed set of 26 single-letter
//! options (`a..z`) plus one "data" option (`-`). [`CommandArgs`] keeps that
//! contract explicit rather than hiding it behind a generic map: the slot
//! layout is part of the protocol, not an implementation detail.

use base64::Engine;

/// Number of addressable option slots: `a..=z` plus the `-` (data) slot.
const SLOT_COUNT: usize = 27;

/// Index of the `-` (data) slot in the option table.
const DATA_SLOT: usize = 26;

fn slot_of(letter: u8) -> Option<usize> {
    match letter {
        b'a'..=b'z' => Some((letter - b'a') as usize),
        b'-' => Some(DATA_SLOT),
        _ => None,
    }
}

/// The fixed 27-slot option table of a single DBGp command line.
#[derive(Debug, Clone, Default)]
pub struct CommandArgs {
    slots: [Option<String>; SLOT_COUNT],
}

impl CommandArgs {
    pub fn new() -> Self {
        Self {
            slots: Default::default(),
        }
    }

    /// Deposit `value` into the slot for `letter`.
    ///
    /// Returns `false` if `letter` is not `a..=z` or `-`, or if the slot was
    /// already set (the caller turns that into the `duplicate arguments in
    /// command` protocol error).
    #[must_use]
    pub fn set(&mut self, letter: u8, value: String) -> bool {
        match slot_of(letter) {
            Some(slot) if self.slots[slot].is_none() => {
                self.slots[slot] = Some(value);
                true
            }
            _ => false,
        }
    }

    fn get(&self, letter: u8) -> Option<&str> {
        slot_of(letter).and_then(|slot| self.slots[slot].as_deref())
    }

    /// `-i`, the transaction id every command must carry.
    pub fn transaction_id(&self) -> Option<&str> {
        self.get(b'i')
    }

    /// `-t`, breakpoint type.
    pub fn bp_type(&self) -> Option<&str> {
        self.get(b't')
    }

    /// `-f`, a file URI.
    pub fn file(&self) -> Option<&str> {
        self.get(b'f')
    }

    /// `-n`, a line number (or, for `breakpoint_set -t call`, unused).
    pub fn line(&self) -> Option<u32> {
        self.get(b'n').and_then(|v| v.parse().ok())
    }

    /// `-m`, a function/method name.
    pub fn method(&self) -> Option<&str> {
        self.get(b'm')
    }

    /// `-a`, a class name.
    pub fn class(&self) -> Option<&str> {
        self.get(b'a')
    }

    /// `-x`, an exception name.
    pub fn exception_name(&self) -> Option<&str> {
        self.get(b'x')
    }

    /// `-s`, enabled/disabled state.
    pub fn state(&self) -> Option<&str> {
        self.get(b's')
    }

    /// `-r`, temporary flag (`0`/`1`).
    pub fn temporary(&self) -> Option<bool> {
        self.get(b'r').map(|v| v == "1")
    }

    /// `-h`, hit value.
    pub fn hit_value(&self) -> Option<u32> {
        self.get(b'h').and_then(|v| v.parse().ok())
    }

    /// `-o`, hit condition symbol.
    pub fn hit_condition(&self) -> Option<&str> {
        self.get(b'o')
    }

    /// `-d`, a breakpoint id.
    pub fn breakpoint_id(&self) -> Option<u64> {
        self.get(b'd').and_then(|v| v.parse().ok())
    }

    /// `-b`, begin line for `source`.
    pub fn begin_line(&self) -> Option<u32> {
        self.get(b'b').and_then(|v| v.parse().ok())
    }

    /// `-e`, end line for `source`.
    pub fn end_line(&self) -> Option<u32> {
        self.get(b'e').and_then(|v| v.parse().ok())
    }

    /// `-n`, a feature or symbolic-name value, depending on the command.
    pub fn name(&self) -> Option<&str> {
        self.get(b'n')
    }

    /// `-v`, a feature value.
    pub fn value(&self) -> Option<&str> {
        self.get(b'v')
    }

    /// `-c`, a stdout/stderr redirect mode (`0`, `1`, `2`).
    pub fn redirect_mode(&self) -> Option<u8> {
        self.get(b'c').and_then(|v| v.parse().ok())
    }

    /// `-d`, the stack depth requested by `stack_get` / `context_get`.
    pub fn depth(&self) -> Option<u32> {
        self.get(b'd').and_then(|v| v.parse().ok())
    }

    /// `-c`, the context id requested by `context_get` / `property_get`.
    pub fn context_id(&self) -> Option<u32> {
        self.get(b'c').and_then(|v| v.parse().ok())
    }

    /// The `-` (data) slot, base64-decoded.
    ///
    /// Returns `None` if the slot is empty; `Some(Err(_))` if present but not
    /// valid base64.
    pub fn data(&self) -> Option<Result<Vec<u8>, base64::DecodeError>> {
        self.get(b'-')
            .map(|raw| base64::engine::general_purpose::STANDARD.decode(raw))
    }

    /// The `-` (data) slot, decoded and interpreted as UTF-8 text.
    pub fn data_text(&self) -> Option<String> {
        let bytes = self.data()?.ok()?;
        String::from_utf8(bytes).ok()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn set_and_get_roundtrip() {
        let mut args = CommandArgs::new();
        assert!(args.set(b'i', "1".to_string()));
        assert_eq!(args.transaction_id(), Some("1"));
    }

    #[test]
    fn set_rejects_duplicate() {
        let mut args = CommandArgs::new();
        assert!(args.set(b'n', "10".to_string()));
        assert!(!args.set(b'n', "20".to_string()));
        assert_eq!(args.line(), Some(10));
    }

    #[test]
    fn set_rejects_out_of_range_letter() {
        let mut args = CommandArgs::new();
        assert!(!args.set(b'9', "x".to_string()));
    }

    #[test]
    fn data_slot_decodes_base64() {
        let mut args = CommandArgs::new();
        args.set(b'-', base64::engine::general_purpose::STANDARD.encode("hi"));
        assert_eq!(args.data_text(), Some("hi".to_string()));
    }
}
