//! Declarative get/set of negotiable protocol capabilities.

use crate::error_code::ErrorCode;

const DEFAULT_MAX_CHILDREN: u32 = 32;
const DEFAULT_MAX_DATA: u32 = 1024;
const DEFAULT_MAX_DEPTH: u32 = 1;
const ENCODING: &str = "iso-8859-1";
const LANGUAGE_VERSION: &str = "8.0.0";
const PROTOCOL_VERSION: &str = "1.0";

/// The mutable numeric options plus the fixed capability answers a
/// session reports through `feature_get`/`feature_set`.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    max_children: u32,
    max_data: u32,
    max_depth: u32,
    show_hidden: bool,
}

impl Default for FeatureTable {
    fn default() -> Self {
        FeatureTable {
            max_children: DEFAULT_MAX_CHILDREN,
            max_data: DEFAULT_MAX_DATA,
            max_depth: DEFAULT_MAX_DEPTH,
            show_hidden: false,
        }
    }
}

/// The outcome of a `feature_get` lookup.
pub struct FeatureValue {
    pub supported: bool,
    pub value: Option<String>,
}

impl FeatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_children(&self) -> u32 {
        self.max_children
    }
    pub fn max_data(&self) -> u32 {
        self.max_data
    }
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }
    pub fn show_hidden(&self) -> bool {
        self.show_hidden
    }

    pub fn set_max_depth(&mut self, value: u32) {
        self.max_depth = value;
    }

    /// `feature_get -n <name>`. `is_known_command` answers whether `name`
    /// matches a registered dispatch entry, used as the fallback for
    /// names this table doesn't recognize itself.
    pub fn get(&self, name: &str, is_known_command: impl FnOnce(&str) -> bool) -> FeatureValue {
        let value = match name {
            "breakpoint_types" => Some("line conditional call return exception".to_string()),
            "encoding" | "supported_encodings" => Some(ENCODING.to_string()),
            "language_name" => Some("PHP".to_string()),
            "language_version" => Some(LANGUAGE_VERSION.to_string()),
            "language_supports_threads" => Some("0".to_string()),
            "max_children" => Some(self.max_children.to_string()),
            "max_data" => Some(self.max_data.to_string()),
            "max_depth" => Some(self.max_depth.to_string()),
            "show_hidden" => Some(if self.show_hidden { "1" } else { "0" }.to_string()),
            "protocol_version" => Some(PROTOCOL_VERSION.to_string()),
            "supports_async" => Some("0".to_string()),
            "supports_postmortem" => Some("1".to_string()),
            "breakpoint_languages" => Some("0".to_string()),
            "data_encoding" => Some("0".to_string()),
            _ => {
                return if is_known_command(name) {
                    FeatureValue {
                        supported: true,
                        value: Some(name.to_string()),
                    }
                } else {
                    FeatureValue {
                        supported: false,
                        value: None,
                    }
                };
            }
        };
        FeatureValue {
            supported: true,
            value,
        }
    }

    /// `feature_set -n <name> -v <value>`.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), ErrorCode> {
        match name {
            "max_children" => {
                self.max_children = parse_u32(value)?;
            }
            "max_data" => {
                self.max_data = parse_u32(value)?;
            }
            "max_depth" => {
                self.max_depth = parse_u32(value)?;
            }
            "show_hidden" => {
                self.show_hidden = parse_u32(value)? != 0;
            }
            "encoding" => {
                if value != ENCODING {
                    return Err(ErrorCode::EncodingNotSupported);
                }
            }
            "multiple_sessions" => {
                log::debug!("multiple_sessions set to {value}, accepted and ignored");
            }
            _ => return Err(ErrorCode::InvalidOrMissingOptions),
        }
        Ok(())
    }
}

fn parse_u32(value: &str) -> Result<u32, ErrorCode> {
    value.parse().map_err(|_| ErrorCode::InvalidOrMissingOptions)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn get_returns_fixed_literal_features() {
        let table = FeatureTable::new();
        let v = table.get("breakpoint_types", |_| false);
        assert!(v.supported);
        assert_eq!(v.value.unwrap(), "line conditional call return exception");
    }

    #[test]
    fn get_falls_back_to_command_table_for_unknown_names() {
        let table = FeatureTable::new();
        let v = table.get("run", |name| name == "run");
        assert!(v.supported);
        assert_eq!(v.value.unwrap(), "run");

        let v = table.get("nonsense", |name| name == "run");
        assert!(!v.supported);
        assert!(v.value.is_none());
    }

    #[test]
    fn set_max_depth_updates_current_value() {
        let mut table = FeatureTable::new();
        table.set("max_depth", "4").unwrap();
        assert_eq!(table.max_depth(), 4);
    }

    #[test]
    fn set_unrecognized_name_is_error_three() {
        let mut table = FeatureTable::new();
        let err = table.set("bogus_feature", "1").unwrap_err();
        assert_eq!(err, ErrorCode::InvalidOrMissingOptions);
    }

    #[test]
    fn set_wrong_encoding_is_error_900() {
        let mut table = FeatureTable::new();
        let err = table.set("encoding", "utf-8").unwrap_err();
        assert_eq!(err, ErrorCode::EncodingNotSupported);
    }

    #[test]
    fn set_multiple_sessions_is_accepted() {
        let mut table = FeatureTable::new();
        assert!(table.set("multiple_sessions", "1").is_ok());
    }
}
