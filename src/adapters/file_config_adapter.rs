//! INI file configuration adapter.

use crate::domain::error::NinetraderError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    /// Parse an INI file; unreadable or malformed input surfaces as a
    /// configuration error naming the file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, NinetraderError> {
        let mut config = Ini::new();
        config
            .load(&path)
            .map_err(|reason| NinetraderError::ConfigParse {
                file: path.as_ref().display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, NinetraderError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| NinetraderError::ConfigParse {
                file: "<inline>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::domain::config::StrategyConfig;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_sections() {
        let content = r#"
[strategy]
lookback = 4
threshold = 9

[capital]
mode = shared
total_capital = 100000

[data]
assets = ACME,BETA
path = /tmp/prices
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(adapter.get_int("strategy", "lookback", 0), 4);
        assert_eq!(
            adapter.get_string("capital", "mode"),
            Some("shared".to_string())
        );
        assert_eq!(
            adapter.get_string("data", "assets"),
            Some("ACME,BETA".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[strategy]\nlookback = 4\n").unwrap();
        assert_eq!(adapter.get_string("strategy", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_default_for_missing_or_non_numeric() {
        let adapter = FileConfigAdapter::from_string("[strategy]\nthreshold = abc\n").unwrap();
        assert_eq!(adapter.get_int("strategy", "threshold", 9), 9);
        assert_eq!(adapter.get_int("strategy", "missing", 42), 42);
    }

    #[test]
    fn get_double_returns_value() {
        let adapter =
            FileConfigAdapter::from_string("[risk]\nstop_multiplier = 2.5\n").unwrap();
        assert_eq!(adapter.get_double("risk", "stop_multiplier", 0.0), 2.5);
    }

    #[test]
    fn get_bool_accepts_common_spellings() {
        let adapter =
            FileConfigAdapter::from_string("[risk]\na = true\nb = yes\nc = 1\nd = no\n").unwrap();
        assert!(adapter.get_bool("risk", "a", false));
        assert!(adapter.get_bool("risk", "b", false));
        assert!(adapter.get_bool("risk", "c", false));
        assert!(!adapter.get_bool("risk", "d", true));
        assert!(adapter.get_bool("risk", "missing", true));
    }

    #[test]
    fn from_file_reads_config() {
        let content = "[data]\npath = /srv/prices\n";
        let file = create_temp_config(content);
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("data", "path"),
            Some("/srv/prices".to_string())
        );
    }

    #[test]
    fn from_file_missing_file_is_a_config_parse_error() {
        let err = FileConfigAdapter::from_file("/nonexistent/path/config.ini").unwrap_err();
        match err {
            NinetraderError::ConfigParse { file, .. } => {
                assert!(file.contains("config.ini"));
            }
            other => panic!("expected a config parse error, got {other:?}"),
        }
    }

    #[test]
    fn full_strategy_config_loads_through_adapter() {
        let content = r#"
[strategy]
lookback = 3
threshold = 7
polarity = momentum

[risk]
volatility_period = 10
stop_multiplier = 2.0
max_loss_fraction = 0.05
trailing_enabled = no

[capital]
mode = independent
total_capital = 250000
deployment_fraction = 0.9
weights = ACME:0.6,BETA:0.4

[data]
assets = ACME,BETA
path = /srv/prices
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        let config = StrategyConfig::from_port(&adapter).unwrap();

        assert_eq!(config.lookback, 3);
        assert_eq!(config.threshold, 7);
        assert_eq!(config.risk.volatility_period, 10);
        assert!(!config.risk.trailing_enabled);
        assert_abs_diff_eq!(config.total_capital, 250_000.0, epsilon = f64::EPSILON);
        assert_abs_diff_eq!(config.weights["ACME"], 0.6, epsilon = f64::EPSILON);
        assert_eq!(config.assets, vec!["ACME", "BETA"]);
    }
}
