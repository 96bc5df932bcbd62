use super::{AESKey, DevAddr, NetId, EUI64};

/// OTAA credentials of the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Application EUI (JoinEUI)
    pub app_eui: EUI64,
    /// Device EUI (unique device identifier)
    pub dev_eui: EUI64,
    /// Application key
    pub app_key: AESKey,
}

impl Identity {
    /// Create a new OTAA identity
    pub fn new(app_eui: EUI64, dev_eui: EUI64, app_key: AESKey) -> Self {
        Self {
            app_eui,
            dev_eui,
            app_key,
        }
    }
}

/// Keys negotiated with the network during the join
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionKeys {
    /// Network identifier
    pub net_id: NetId,
    /// Device address assigned by the network
    pub dev_addr: DevAddr,
    /// Network session key
    pub nwk_skey: AESKey,
    /// Application session key
    pub app_skey: AESKey,
}

/// Join state as seen by the runtime
///
/// Joining is tracked by the MAC engine, the runtime only knows whether a session exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JoinState {
    /// No session
    Unjoined,
    /// Session established
    Joined,
}

/// Session state of the endnode
///
/// Empty at construction, populated on a successful join, cleared whenever the join is
/// lost. Nothing here survives a power cycle.
#[derive(Debug, Clone)]
pub struct Session {
    state: JoinState,
    keys: Option<SessionKeys>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Create an empty session
    pub const fn new() -> Self {
        Self {
            state: JoinState::Unjoined,
            keys: None,
        }
    }

    /// Record a successful join
    pub fn establish(&mut self, keys: SessionKeys) {
        self.state = JoinState::Joined;
        self.keys = Some(keys);
    }

    /// Forget the session
    pub fn clear(&mut self) {
        self.state = JoinState::Unjoined;
        self.keys = None;
    }

    /// Current join state
    pub fn state(&self) -> JoinState {
        self.state
    }

    /// Whether a session is established
    pub fn is_joined(&self) -> bool {
        self.state == JoinState::Joined
    }

    /// Negotiated session keys, if joined
    pub fn keys(&self) -> Option<&SessionKeys> {
        self.keys.as_ref()
    }
}
