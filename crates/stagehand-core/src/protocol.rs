//! Protocol surface exposed to the consumer: method and field names.

/// Outbound method names.
pub mod methods {
    pub const SCENE_CREATE: &str = "onSceneCreate";
    pub const SCENE_UPDATE: &str = "onSceneUpdate";
    pub const SCENE_DELETE: &str = "onSceneDelete";

    pub const CONTROL_CREATE: &str = "onControlCreate";
    pub const CONTROL_UPDATE: &str = "onControlUpdate";
    pub const CONTROL_DELETE: &str = "onControlDelete";

    pub const GROUP_CREATE: &str = "onGroupCreate";
    pub const GROUP_UPDATE: &str = "onGroupUpdate";
    pub const GROUP_DELETE: &str = "onGroupDelete";

    pub const PARTICIPANT_JOIN: &str = "onParticipantJoin";
    pub const PARTICIPANT_UPDATE: &str = "onParticipantUpdate";
    pub const PARTICIPANT_LEAVE: &str = "onParticipantLeave";

    /// Non-collection top-level world fields.
    pub const WORLD_UPDATE: &str = "onWorldUpdate";
    /// Connection-level settings, sent after the create packets.
    pub const SETTINGS_UPDATE: &str = "onSettingsUpdate";
    /// Capability call closing a bootstrap.
    pub const READY: &str = "onReady";

    /// Inbound ready-signal exposed to the consumer.
    pub const CONTROLS_READY: &str = "controlsReady";
    /// Inbound video placement request.
    pub const MOVE_VIDEO: &str = "moveVideo";
    /// Inbound participant input.
    pub const GIVE_INPUT: &str = "giveInput";
}

/// Record and parameter field names.
pub mod fields {
    pub const SCENE_ID: &str = "sceneID";
    pub const CONTROL_ID: &str = "controlID";
    pub const GROUP_ID: &str = "groupID";
    pub const SESSION_ID: &str = "sessionID";

    pub const SCENES: &str = "scenes";
    pub const CONTROLS: &str = "controls";
    pub const GROUPS: &str = "groups";
    pub const PARTICIPANTS: &str = "participants";

    pub const REASSIGN_SCENE_ID: &str = "reassignSceneID";
    pub const REASSIGN_GROUP_ID: &str = "reassignGroupID";
    pub const IS_READY: &str = "isReady";
}

/// Identifier used when nothing more specific is configured for reassignment.
pub const DEFAULT_REASSIGN_ID: &str = "default";
