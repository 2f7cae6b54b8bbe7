//! Session configuration.

use std::collections::HashSet;

use stagehand_core::protocol::{methods, DEFAULT_REASSIGN_ID};
use stagehand_core::{AdapterOptions, ResourceKind};
use stagehand_sync::{Settings, SyncConfig};

use crate::error::{Result, StagehandError};

/// Configuration for a [`Session`](crate::Session).
#[derive(Debug, Clone)]
pub struct StagehandConfig {
    /// Scene that participants of a deleted scene are moved to.
    pub reassign_scene_id: String,
    /// Group that participants of a deleted group are moved to.
    pub reassign_group_id: String,
    /// Settings sent with every bootstrap.
    pub settings: Settings,
    /// Method the consumer invokes to announce readiness.
    pub ready_method: String,
    /// Other consumer-invokable methods, surfaced as consumer events.
    pub exposed_methods: Vec<String>,
    /// Whether a bootstrap ends with `onReady`.
    pub send_ready_call: bool,
    /// Resource types mirrored into the consumer, in bootstrap order.
    pub kinds: Vec<ResourceKind>,
}

impl Default for StagehandConfig {
    fn default() -> Self {
        Self {
            reassign_scene_id: DEFAULT_REASSIGN_ID.to_string(),
            reassign_group_id: DEFAULT_REASSIGN_ID.to_string(),
            settings: Settings::default(),
            ready_method: methods::CONTROLS_READY.to_string(),
            exposed_methods: vec![methods::MOVE_VIDEO.to_string(), methods::GIVE_INPUT.to_string()],
            send_ready_call: true,
            kinds: ResourceKind::ALL.to_vec(),
        }
    }
}

impl StagehandConfig {
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_reassign_scene_id(mut self, id: impl Into<String>) -> Self {
        self.reassign_scene_id = id.into();
        self
    }

    pub fn with_reassign_group_id(mut self, id: impl Into<String>) -> Self {
        self.reassign_group_id = id.into();
        self
    }

    pub fn with_ready_method(mut self, method: impl Into<String>) -> Self {
        self.ready_method = method.into();
        self
    }

    /// Expose one more consumer-invokable method.
    pub fn with_exposed_method(mut self, method: impl Into<String>) -> Self {
        self.exposed_methods.push(method.into());
        self
    }

    pub fn with_ready_call(mut self, send: bool) -> Self {
        self.send_ready_call = send;
        self
    }

    /// Mirror only `kinds`, bootstrapped in the given order.
    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = ResourceKind>) -> Self {
        self.kinds = kinds.into_iter().collect();
        self
    }

    /// Check the configuration for contradictions.
    pub fn validate(&self) -> Result<()> {
        if self.ready_method.is_empty() {
            return Err(StagehandError::InvalidConfig("ready method is empty".into()));
        }
        if self.exposed_methods.contains(&self.ready_method) {
            return Err(StagehandError::InvalidConfig(format!(
                "{} is both the ready method and an exposed method",
                self.ready_method
            )));
        }
        if self.kinds.is_empty() {
            return Err(StagehandError::InvalidConfig("no resource types".into()));
        }
        let unique: HashSet<_> = self.kinds.iter().collect();
        if unique.len() != self.kinds.len() {
            return Err(StagehandError::InvalidConfig(
                "resource type listed twice".into(),
            ));
        }
        Ok(())
    }

    /// The coordinator's share of this configuration.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            settings: self.settings.clone(),
            send_ready_call: self.send_ready_call,
            adapters: AdapterOptions {
                reassign_scene_id: self.reassign_scene_id.clone(),
                reassign_group_id: self.reassign_group_id.clone(),
            },
            kinds: self.kinds.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = StagehandConfig::default();
        config.validate().unwrap();
        assert_eq!(config.ready_method, "controlsReady");
        assert_eq!(config.exposed_methods, vec!["moveVideo", "giveInput"]);
    }

    #[test]
    fn test_sync_config_carries_reassignment() {
        let sync = StagehandConfig::default()
            .with_reassign_scene_id("lobby")
            .with_reassign_group_id("spectators")
            .with_ready_call(false)
            .sync_config();
        assert_eq!(sync.adapters.reassign_scene_id, "lobby");
        assert_eq!(sync.adapters.reassign_group_id, "spectators");
        assert!(!sync.send_ready_call);
    }

    #[test]
    fn test_rejects_ready_method_exposed_twice() {
        let config = StagehandConfig::default().with_exposed_method("controlsReady");
        assert!(matches!(
            config.validate(),
            Err(StagehandError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_duplicate_kinds() {
        let config =
            StagehandConfig::default().with_kinds([ResourceKind::Groups, ResourceKind::Groups]);
        assert!(config.validate().is_err());
        assert!(StagehandConfig::default().with_kinds([]).validate().is_err());
    }
}
