//! Registry of `eval()`'d source fragments, addressable both by the
//! synthetic filename the debuggee sees and by a short id used on the
//! `-f`/`source` path.

use std::collections::HashMap;

/// One `eval()`'d fragment: the text that was compiled and the id it was
/// assigned.
#[derive(Debug, Clone)]
pub struct EvalInfo {
    pub id: u32,
    pub source_text: String,
}

fn synthetic_filename(enclosing_file: &str, lineno: u32) -> String {
    format!("{}({}) : eval()'d code", enclosing_file, lineno)
}

fn id_key(id: u32) -> String {
    format!("{:04x}", id)
}

/// Dual-keyed store: every record is reachable either by its synthetic
/// filename or by its 4-hex-digit id, and removing one removes both.
#[derive(Debug, Default)]
pub struct EvalSourceRegistry {
    next_id: u32,
    by_filename: HashMap<String, u32>,
    by_id: HashMap<u32, EvalInfo>,
}

impl EvalSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new eval'd fragment compiled at `enclosing_file:lineno`
    /// and return the synthetic filename it is now addressable by.
    pub fn insert(&mut self, enclosing_file: &str, lineno: u32, source_text: String) -> String {
        let id = self.next_id;
        self.next_id += 1;
        let filename = synthetic_filename(enclosing_file, lineno);
        self.by_filename.insert(filename.clone(), id);
        self.by_id.insert(id, EvalInfo { id, source_text });
        filename
    }

    pub fn get_by_filename(&self, filename: &str) -> Option<&EvalInfo> {
        let id = self.by_filename.get(filename)?;
        self.by_id.get(id)
    }

    pub fn get_by_id(&self, id: u32) -> Option<&EvalInfo> {
        self.by_id.get(&id)
    }

    /// Parse a 4-hex-digit id string as rendered in a source path.
    pub fn parse_id(text: &str) -> Option<u32> {
        u32::from_str_radix(text, 16).ok()
    }

    pub fn id_string(id: u32) -> String {
        id_key(id)
    }

    pub fn remove_by_id(&mut self, id: u32) -> Option<EvalInfo> {
        let info = self.by_id.remove(&id)?;
        self.by_filename.retain(|_, v| *v != id);
        Some(info)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn insert_then_lookup_by_both_keys() {
        let mut registry = EvalSourceRegistry::new();
        let filename = registry.insert("file:///a.php", 12, "echo 1;".to_string());
        assert_eq!(filename, "file:///a.php(12) : eval()'d code");

        let by_name = registry.get_by_filename(&filename).unwrap();
        assert_eq!(by_name.source_text, "echo 1;");
        assert_eq!(by_name.id, 0);

        let by_id = registry.get_by_id(0).unwrap();
        assert_eq!(by_id.source_text, "echo 1;");
    }

    #[test]
    fn ids_are_monotonic_and_formatted_as_four_hex_digits() {
        let mut registry = EvalSourceRegistry::new();
        registry.insert("file:///a.php", 1, "a".to_string());
        registry.insert("file:///a.php", 2, "b".to_string());
        assert_eq!(EvalSourceRegistry::id_string(0), "0000");
        assert_eq!(EvalSourceRegistry::id_string(1), "0001");
    }

    #[test]
    fn parse_id_round_trips_with_id_string() {
        assert_eq!(EvalSourceRegistry::parse_id("001a"), Some(0x1a));
        assert_eq!(EvalSourceRegistry::id_string(0x1a), "001a");
    }

    #[test]
    fn remove_clears_both_keys() {
        let mut registry = EvalSourceRegistry::new();
        let filename = registry.insert("file:///a.php", 1, "a".to_string());
        registry.remove_by_id(0);
        assert!(registry.get_by_id(0).is_none());
        assert!(registry.get_by_filename(&filename).is_none());
    }
}
