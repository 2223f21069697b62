//! The breakpoint registry: three indexed collections plus a unifying
//! administrative ID map.

use std::collections::HashMap;

use crate::error_code::ErrorCode;

/// The kind of a breakpoint, as carried by the `-t` option of
/// `breakpoint_set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakpointKind {
    Line,
    Call,
    Return,
    Exception,
    Conditional,
}

impl BreakpointKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "line" => Some(Self::Line),
            "call" => Some(Self::Call),
            "return" => Some(Self::Return),
            "exception" => Some(Self::Exception),
            "conditional" => Some(Self::Conditional),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Call => "call",
            Self::Return => "return",
            Self::Exception => "exception",
            Self::Conditional => "conditional",
        }
    }
}

/// The predicate gating whether a candidate hit actually fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitCondition {
    Disabled,
    GreaterOrEqual,
    Equal,
    Multiple,
}

impl HitCondition {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            ">=" => Some(Self::GreaterOrEqual),
            "==" => Some(Self::Equal),
            "%" => Some(Self::Multiple),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "",
            Self::GreaterOrEqual => ">=",
            Self::Equal => "==",
            Self::Multiple => "%",
        }
    }

    /// Whether `hit_count` fires given `hit_value`, independent of the
    /// `disabled` flag and condition expression (those are checked by the
    /// caller).
    pub fn fires(self, hit_count: u32, hit_value: u32) -> bool {
        match self {
            Self::Disabled => true,
            Self::GreaterOrEqual => hit_count >= hit_value,
            Self::Equal => hit_count == hit_value,
            Self::Multiple => hit_value != 0 && hit_count % hit_value == 0,
        }
    }
}

/// One breakpoint. The invariants from the data model (e.g. `kind=line
/// implies file+lineno`) are enforced by [`BreakpointRegistry::insert`],
/// not by this type itself, since construction always goes through the
/// registry's kind-specific insertion paths.
#[derive(Debug, Clone)]
pub struct Breakpoint {
    pub kind: BreakpointKind,
    pub file: Option<String>,
    pub lineno: Option<u32>,
    pub function: Option<String>,
    pub class: Option<String>,
    pub exception_name: Option<String>,
    pub condition: Option<String>,
    pub disabled: bool,
    pub temporary: bool,
    pub hit_count: u32,
    pub hit_value: u32,
    pub hit_condition: HitCondition,
}

impl Breakpoint {
    /// Does this candidate hit actually fire, given the debuggee-evaluated
    /// truthiness of `condition` (always `true` when there is no
    /// condition)?
    pub fn fires(&self, condition_truthy: bool) -> bool {
        !self.disabled && condition_truthy && self.hit_condition.fires(self.hit_count, self.hit_value)
    }
}

/// The administrative record binding a breakpoint ID to the collection it
/// lives in.
#[derive(Debug, Clone)]
pub struct BreakpointAdmin {
    pub id: u64,
    pub kind: BreakpointKind,
    pub key: String,
}

fn line_key(file: &str, lineno: u32) -> String {
    format!("{}${}", file, lineno)
}

fn function_key(class: Option<&str>, function: &str) -> String {
    match class {
        Some(class) => format!("{}::{}", class, function),
        None => function.to_string(),
    }
}

/// The unified breakpoint registry owned by the session controller.
pub struct BreakpointRegistry {
    pid: u64,
    counter: u64,
    by_id: HashMap<u64, BreakpointAdmin>,
    line_bps: Vec<(u64, Breakpoint)>,
    function_bps: HashMap<String, (u64, Breakpoint)>,
    exception_bps: HashMap<String, (u64, Breakpoint)>,
}

impl BreakpointRegistry {
    pub fn new(pid: u64) -> Self {
        Self {
            pid,
            counter: 0,
            by_id: HashMap::new(),
            line_bps: Vec::new(),
            function_bps: HashMap::new(),
            exception_bps: HashMap::new(),
        }
    }

    fn next_id(&mut self) -> u64 {
        self.counter += 1;
        self.pid * 10_000 + self.counter
    }

    /// Insert a new breakpoint, returning its allocated ID.
    ///
    /// `key` must already be computed by the caller per the kind-specific
    /// rule in the data model (`"<file>$<lineno>"`, `"<class>::<method>"`
    /// or the exception name).
    pub fn insert_line(&mut self, file: String, lineno: u32, bp: Breakpoint) -> u64 {
        let id = self.next_id();
        let key = line_key(&file, lineno);
        self.by_id.insert(
            id,
            BreakpointAdmin {
                id,
                kind: bp.kind,
                key,
            },
        );
        self.line_bps.push((id, bp));
        id
    }

    pub fn insert_function(
        &mut self,
        class: Option<&str>,
        function: &str,
        bp: Breakpoint,
    ) -> Result<u64, ErrorCode> {
        let key = function_key(class, function);
        if self.function_bps.contains_key(&key) {
            return Err(ErrorCode::BreakpointCouldNotBeSet);
        }
        let id = self.next_id();
        self.by_id.insert(
            id,
            BreakpointAdmin {
                id,
                kind: bp.kind,
                key: key.clone(),
            },
        );
        self.function_bps.insert(key, (id, bp));
        Ok(id)
    }

    pub fn insert_exception(&mut self, name: &str, bp: Breakpoint) -> Result<u64, ErrorCode> {
        if self.exception_bps.contains_key(name) {
            return Err(ErrorCode::BreakpointCouldNotBeSet);
        }
        let id = self.next_id();
        self.by_id.insert(
            id,
            BreakpointAdmin {
                id,
                kind: bp.kind,
                key: name.to_string(),
            },
        );
        self.exception_bps.insert(name.to_string(), (id, bp));
        Ok(id)
    }

    pub fn admin(&self, id: u64) -> Option<&BreakpointAdmin> {
        self.by_id.get(&id)
    }

    pub fn get(&self, id: u64) -> Option<&Breakpoint> {
        let admin = self.by_id.get(&id)?;
        self.lookup(admin)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut Breakpoint> {
        let admin = self.by_id.get(&id)?.clone();
        match admin.kind {
            BreakpointKind::Line | BreakpointKind::Conditional => self
                .line_bps
                .iter_mut()
                .find(|(bp_id, _)| *bp_id == id)
                .map(|(_, bp)| bp),
            BreakpointKind::Call | BreakpointKind::Return => self
                .function_bps
                .get_mut(&admin.key)
                .map(|(_, bp)| bp),
            BreakpointKind::Exception => self
                .exception_bps
                .get_mut(&admin.key)
                .map(|(_, bp)| bp),
        }
    }

    fn lookup(&self, admin: &BreakpointAdmin) -> Option<&Breakpoint> {
        match admin.kind {
            BreakpointKind::Line | BreakpointKind::Conditional => self
                .line_bps
                .iter()
                .find(|(id, _)| *id == admin.id)
                .map(|(_, bp)| bp),
            BreakpointKind::Call | BreakpointKind::Return => {
                self.function_bps.get(&admin.key).map(|(_, bp)| bp)
            }
            BreakpointKind::Exception => self.exception_bps.get(&admin.key).map(|(_, bp)| bp),
        }
    }

    /// Remove a breakpoint from both its collection and the admin map.
    pub fn remove(&mut self, id: u64) -> Result<(), ErrorCode> {
        let admin = self.by_id.remove(&id).ok_or(ErrorCode::NoSuchBreakpoint)?;
        match admin.kind {
            BreakpointKind::Line | BreakpointKind::Conditional => {
                self.line_bps.retain(|(bp_id, _)| *bp_id != id);
            }
            BreakpointKind::Call | BreakpointKind::Return => {
                self.function_bps.remove(&admin.key);
            }
            BreakpointKind::Exception => {
                self.exception_bps.remove(&admin.key);
            }
        }
        Ok(())
    }

    /// Iterate all admin entries in the order they should be listed by
    /// `breakpoint_list` (insertion order of `by_id` is not guaranteed by
    /// `HashMap`, so callers needing a stable order should sort by id).
    pub fn iter_admin(&self) -> impl Iterator<Item = &BreakpointAdmin> {
        self.by_id.values()
    }

    /// All line/conditional breakpoints registered for `file`, in the order
    /// they were inserted — used by the session controller's candidate-hit
    /// evaluation pass.
    pub fn line_breakpoints_for(
        &self,
        file: &str,
        lineno: u32,
    ) -> impl Iterator<Item = (u64, &Breakpoint)> {
        self.line_bps.iter().filter_map(move |(id, bp)| {
            if bp.file.as_deref() == Some(file) && bp.lineno == Some(lineno) {
                Some((*id, bp))
            } else {
                None
            }
        })
    }

    pub fn function_breakpoint(&self, class: Option<&str>, function: &str) -> Option<(u64, &Breakpoint)> {
        let key = function_key(class, function);
        self.function_bps.get(&key).map(|(id, bp)| (*id, bp))
    }

    pub fn exception_breakpoint(&self, name: &str) -> Option<(u64, &Breakpoint)> {
        self.exception_bps.get(name).map(|(id, bp)| (*id, bp))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn line_bp(file: &str, lineno: u32) -> Breakpoint {
        Breakpoint {
            kind: BreakpointKind::Line,
            file: Some(file.to_string()),
            lineno: Some(lineno),
            function: None,
            class: None,
            exception_name: None,
            condition: None,
            disabled: false,
            temporary: false,
            hit_count: 0,
            hit_value: 0,
            hit_condition: HitCondition::Disabled,
        }
    }

    #[test]
    fn ids_are_unique_and_strictly_increasing() {
        let mut reg = BreakpointRegistry::new(42);
        let a = reg.insert_line("x.src".into(), 1, line_bp("x.src", 1));
        let b = reg.insert_line("x.src".into(), 2, line_bp("x.src", 2));
        assert!(b > a);
        assert_ne!(a, b);
        assert_eq!(a, 42 * 10_000 + 1);
        assert_eq!(b, 42 * 10_000 + 2);
    }

    #[test]
    fn round_trip_set_then_get() {
        let mut reg = BreakpointRegistry::new(1);
        let id = reg.insert_line("file:///x.src".into(), 10, line_bp("file:///x.src", 10));
        let bp = reg.get(id).unwrap();
        assert_eq!(bp.file.as_deref(), Some("file:///x.src"));
        assert_eq!(bp.lineno, Some(10));
        assert_eq!(bp.hit_count, 0);
        assert_eq!(bp.hit_value, 0);
        assert!(!bp.disabled);
    }

    #[test]
    fn duplicate_function_breakpoint_fails() {
        let mut reg = BreakpointRegistry::new(1);
        let bp = Breakpoint {
            kind: BreakpointKind::Call,
            file: None,
            lineno: None,
            function: Some("foo".into()),
            class: None,
            exception_name: None,
            condition: None,
            disabled: false,
            temporary: false,
            hit_count: 0,
            hit_value: 0,
            hit_condition: HitCondition::Disabled,
        };
        assert!(reg.insert_function(None, "foo", bp.clone()).is_ok());
        assert_eq!(
            reg.insert_function(None, "foo", bp).unwrap_err(),
            ErrorCode::BreakpointCouldNotBeSet
        );
    }

    #[test]
    fn remove_clears_both_collection_and_admin_map() {
        let mut reg = BreakpointRegistry::new(1);
        let id = reg.insert_line("x.src".into(), 1, line_bp("x.src", 1));
        reg.remove(id).unwrap();
        assert!(reg.get(id).is_none());
        assert!(reg.admin(id).is_none());
        assert_eq!(reg.remove(id).unwrap_err(), ErrorCode::NoSuchBreakpoint);
    }

    #[test]
    fn hit_condition_multiple_fires_on_multiples() {
        let cond = HitCondition::Multiple;
        let fires: Vec<u32> = (1..=9).filter(|&n| cond.fires(n, 3)).collect();
        assert_eq!(fires, vec![3, 6, 9]);
    }

    #[test]
    fn hit_condition_equal_fires_once() {
        let cond = HitCondition::Equal;
        let fires: Vec<u32> = (1..=9).filter(|&n| cond.fires(n, 5)).collect();
        assert_eq!(fires, vec![5]);
    }

    #[test]
    fn hit_condition_greater_or_equal_fires_from_threshold_onward() {
        let cond = HitCondition::GreaterOrEqual;
        let fires: Vec<u32> = (1..=9).filter(|&n| cond.fires(n, 5)).collect();
        assert_eq!(fires, vec![5, 6, 7, 8, 9]);
    }
}
