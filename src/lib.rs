pub mod config;
pub mod host;
pub mod plugin;
pub mod watch;

pub use config::TriggersConfig;
pub use host::{TerminalHost, TerminalId, TerminalPane, WatchHandle};
pub use plugin::{AddonManifest, TriggersPlugin, CAPABILITY_INPUT_WATCH};
pub use watch::WatchManager;

pub use trigwatch_dispatch::{Dispatcher, SecretSource, Verb};
pub use trigwatch_rules::{RuleSet, TriggerRule};
pub use trigwatch_vault::{filter_entries, CredentialEntry, PromptUi, SecretStore, VaultPicker};

#[cfg(feature = "vault")]
pub use trigwatch_vault::KdbxStore;
