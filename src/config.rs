//! Static session configuration: the handful of values that come from
//! outside the wire protocol (environment, IDE key) rather than being
//! negotiated over it.

/// Configuration supplied by the embedding host when a session starts.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Sent as the `idekey` attribute of the `init` event, if set.
    pub idekey: Option<String>,
    /// The engine identity reported in `init`.
    pub engine_name: String,
    pub engine_version: String,
    pub author: String,
    pub url: String,
    pub copyright: String,
}

impl Config {
    pub fn new(engine_name: impl Into<String>, engine_version: impl Into<String>) -> Self {
        Config {
            idekey: None,
            engine_name: engine_name.into(),
            engine_version: engine_version.into(),
            author: String::new(),
            url: String::new(),
            copyright: String::new(),
        }
    }

    /// The `session` attribute of the `init` event comes from the
    /// `DBGP_COOKIE` environment variable.
    pub fn session_cookie() -> Option<String> {
        std::env::var("DBGP_COOKIE").ok()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn new_config_has_no_idekey_by_default() {
        let config = Config::new("adapter", "1.0");
        assert!(config.idekey.is_none());
        assert_eq!(config.engine_name, "adapter");
    }
}
