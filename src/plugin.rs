//! Registration surface and plugin assembly.
//!
//! Hosts discover add-ons through a serialized manifest; this module
//! provides ours, plus [`TriggersPlugin`], the object a host constructs at
//! start-up to wire the watch loop to its terminals.

use serde::{Deserialize, Serialize};

use crate::config::TriggersConfig;
use crate::host::{TerminalHost, TerminalId};
use crate::watch::WatchManager;
use trigwatch_dispatch::Dispatcher;

#[cfg(feature = "vault")]
use trigwatch_vault::{KdbxStore, PromptUi, VaultPicker};

pub const PLUGIN_ID: &str = "trigwatch.triggers";
pub const PLUGIN_NAME: &str = "Triggers";

/// Capability string hosts use to gate input-injecting add-ons.
pub const CAPABILITY_INPUT_WATCH: &str = "input_watch";

/// Manifest describing this add-on to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonManifest {
    pub id: String,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default = "default_activation_events")]
    pub activation_events: Vec<String>,
}

impl AddonManifest {
    /// The manifest for this build of the add-on.
    pub fn current() -> Self {
        Self {
            id: PLUGIN_ID.to_string(),
            name: PLUGIN_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            capabilities: vec![CAPABILITY_INPUT_WATCH.to_string()],
            activation_events: default_activation_events(),
        }
    }
}

fn default_activation_events() -> Vec<String> {
    vec!["onStartupFinished".to_string()]
}

pub fn validate_manifest(manifest: &AddonManifest) -> Result<(), String> {
    if manifest.id.trim().is_empty() {
        return Err("invalid manifest: id must not be empty".to_string());
    }
    if manifest.name.trim().is_empty() {
        return Err("invalid manifest: name must not be empty".to_string());
    }
    if manifest.version.trim().is_empty() {
        return Err("invalid manifest: version must not be empty".to_string());
    }
    Ok(())
}

/// The assembled add-on: rules, dispatcher and watch manager, built once
/// per host process.
pub struct TriggersPlugin<H: TerminalHost> {
    manager: WatchManager<H>,
}

impl<H: TerminalHost> TriggersPlugin<H> {
    /// Assemble with a caller-built dispatcher and subscribe to every pane
    /// already live.
    pub fn new(config: &TriggersConfig, host: H, dispatcher: Dispatcher) -> Self {
        let manager = WatchManager::new(host, config.rules.clone(), dispatcher);
        manager.update_watches();
        Self { manager }
    }

    /// Assemble with the credential picker wired in: `keepass` actions open
    /// the configured database through the host's modal prompts.
    #[cfg(feature = "vault")]
    pub fn with_vault<P: PromptUi + 'static>(config: &TriggersConfig, host: H, prompt: P) -> Self {
        let picker = VaultPicker::new(config.keepass_db.clone(), KdbxStore, prompt);
        let dispatcher = Dispatcher::with_secret_source(Box::new(picker));
        Self::new(config, host, dispatcher)
    }

    /// Entry point for the host's content-change signal. Always asks the
    /// host to keep the subscription alive.
    pub fn notify_contents_changed(&self, id: TerminalId) -> bool {
        self.manager.on_contents_changed(id)
    }

    pub fn manager(&self) -> &WatchManager<H> {
        &self.manager
    }

    pub fn capabilities() -> &'static [&'static str] {
        &[CAPABILITY_INPUT_WATCH]
    }
}
