//! Run configuration, parsed once and passed down explicitly.

use tracing::{info, warn};

/// Largest ring length enumerated when nothing else is asked for.
pub const DEFAULT_MAX_RING: usize = 7;

/// What the run prints to stdout. Classification and registry updates
/// happen in every mode; only the report differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Silent,
    Json,
    Yaplot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub mode: OutputMode,
    /// Registry location. `None` keeps everything in memory for the run.
    pub database: Option<String>,
    pub max_ring: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            mode: OutputMode::Silent,
            database: None,
            max_ring: DEFAULT_MAX_RING,
        }
    }
}

impl Config {
    /// Parses a colon-separated option string. `json` and `yaplot` pick
    /// the output mode; any other bare token names the registry location,
    /// the last one winning. Tokens carrying `=` belong to no supported
    /// option, so they are logged and dropped without touching anything.
    pub fn parse(options: &str) -> Config {
        let mut config = Config::default();
        for token in options.split(':') {
            if token.is_empty() {
                continue;
            }
            if let Some((key, value)) = token.split_once('=') {
                warn!("Unsupported option with argument: {} := {}", key, value);
                continue;
            }
            match token {
                "json" => config.set_mode(OutputMode::Json),
                "yaplot" => config.set_mode(OutputMode::Yaplot),
                _ => {
                    info!("Registry location: {}", token);
                    config.database = Some(token.to_string());
                }
            }
        }
        config
    }

    fn set_mode(&mut self, mode: OutputMode) {
        if self.mode != OutputMode::Silent && self.mode != mode {
            warn!("Output mode {:?} replaces {:?}", mode, self.mode);
        }
        self.mode = mode;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_keeps_defaults() {
        let config = Config::parse("");
        assert_eq!(config, Config::default());
        assert_eq!(config.mode, OutputMode::Silent);
        assert_eq!(config.max_ring, DEFAULT_MAX_RING);
    }

    #[test]
    fn json_flag_selects_json_mode() {
        let config = Config::parse("json");
        assert_eq!(config.mode, OutputMode::Json);
        assert_eq!(config.database, None);
    }

    #[test]
    fn bare_token_names_the_registry() {
        let config = Config::parse("yaplot:petals.csv");
        assert_eq!(config.mode, OutputMode::Yaplot);
        assert_eq!(config.database.as_deref(), Some("petals.csv"));
    }

    #[test]
    fn last_registry_location_wins() {
        let config = Config::parse("old.csv:new.csv");
        assert_eq!(config.database.as_deref(), Some("new.csv"));
    }

    #[test]
    fn assignment_tokens_are_dropped() {
        let config = Config::parse("Ih=1h.twhist:json");
        assert_eq!(config.mode, OutputMode::Json);
        assert_eq!(config.database, None);
    }

    #[test]
    fn later_mode_flag_wins() {
        let config = Config::parse("json:yaplot");
        assert_eq!(config.mode, OutputMode::Yaplot);
    }

    #[test]
    fn stray_separators_are_harmless() {
        let config = Config::parse("::json::petals.csv:");
        assert_eq!(config.mode, OutputMode::Json);
        assert_eq!(config.database.as_deref(), Some("petals.csv"));
    }
}
