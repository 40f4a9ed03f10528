use crate::model::{IceServerConfig, RoomId, UserId};
use serde::{Deserialize, Serialize};

/// Session start configuration, assembled by the external room-provisioning
/// collaborator and handed to the session controller as-is. The self user id
/// is always explicit here, never inferred from ambient state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub user_name: String,
    pub peer_display_name: Option<String>,
    pub ice_servers: Vec<IceServerConfig>,
}

impl SessionConfig {
    pub fn new(room_id: RoomId, user_id: UserId, user_name: impl Into<String>) -> Self {
        Self {
            room_id,
            user_id,
            user_name: user_name.into(),
            peer_display_name: None,
            ice_servers: Vec::new(),
        }
    }

    pub fn with_ice_servers(mut self, servers: Vec<IceServerConfig>) -> Self {
        self.ice_servers = servers;
        self
    }
}
