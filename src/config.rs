//! Trigger configuration.
//!
//! The host hands over one flat TOML table: rule-name → rule options, plus
//! the scalar `keepassDb` key pointing at the credential database. The key
//! spelling is the host's, kept verbatim. Rule precedence follows table
//! order, so files load the way they read.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use toml::Value;
use trigwatch_rules::RuleSet;

pub const KEEPASS_DB_KEY: &str = "keepassDb";

/// Parsed add-on configuration, loaded once at start-up. No live reload.
#[derive(Debug, Clone, Default)]
pub struct TriggersConfig {
    /// Path to the encrypted credential database, when configured.
    pub keepass_db: Option<PathBuf>,
    /// The trigger rules, in file order.
    pub rules: RuleSet,
}

impl TriggersConfig {
    /// Build from the host-supplied table. The rule loader skips the
    /// `keepassDb` scalar on its own (it is not a table), so the whole
    /// table is passed through unfiltered.
    pub fn from_table(table: &toml::Table) -> Self {
        let keepass_db = table
            .get(KEEPASS_DB_KEY)
            .and_then(Value::as_str)
            .map(PathBuf::from);
        Self {
            keepass_db,
            rules: RuleSet::load(table),
        }
    }

    /// Load from a TOML file for hosts that hand over a path instead of a
    /// parsed table.
    pub fn load_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let table: toml::Table = raw
            .parse()
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(Self::from_table(&table))
    }

    /// Default config path (~/.config/trigwatch/triggers.toml).
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("", "", "trigwatch")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .unwrap_or_else(|| {
                std::env::var("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("."))
                    .join(".config")
                    .join("trigwatch")
            })
            .join("triggers.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_db_path_and_rules_from_one_table() {
        let table: toml::Table = r#"
            keepassDb = "/home/user/secrets.kdbx"

            [ssh-password]
            expect = "password:"
            action = "keepass deploy"
            new_line = true
        "#
        .parse()
        .unwrap();
        let config = TriggersConfig::from_table(&table);
        assert_eq!(
            config.keepass_db.as_deref(),
            Some(Path::new("/home/user/secrets.kdbx"))
        );
        assert_eq!(config.rules.len(), 1);
    }

    #[test]
    fn missing_db_key_leaves_picker_unconfigured() {
        let table: toml::Table = r#"
            [r1]
            expect = "^ping$"
            action = "input pong"
        "#
        .parse()
        .unwrap();
        let config = TriggersConfig::from_table(&table);
        assert_eq!(config.keepass_db, None);
        assert_eq!(config.rules.len(), 1);
    }

    #[test]
    fn load_path_round_trips_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            [r1]
            expect = "^yes/no"
            action = "input yes"
            new_line = true
            "#
        )
        .unwrap();
        let config = TriggersConfig::load_path(file.path()).unwrap();
        assert_eq!(config.rules.len(), 1);
        assert!(config.rules.get("^yes/no").unwrap().emit_newline);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not [valid toml").unwrap();
        assert!(TriggersConfig::load_path(file.path()).is_err());
    }
}
