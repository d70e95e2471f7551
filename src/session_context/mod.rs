//! Secure sessions as far as fabric provisioning is concerned: which fabric
//! a session is bound to, and expiring the sessions of a fabric.

use tracing::{debug, info};

use crate::{constants::ATTESTATION_CHALLENGE_LEN_BYTES, crypto, fabric::FabricIndex};

pub type SessionId = u16;

/// How the session was established (4.13)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Passcode-authenticated, before or during commissioning.
    Pase,
    /// Certificate-authenticated, always bound to a fabric.
    Case,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: SessionId,
    pub mode: SessionMode,
    /// `None` for a PASE session that has not adopted a fabric yet.
    pub fabric_index: Option<FabricIndex>,
    pub peer_node_id: u64,
    /// Derived with the session keys, binds attestation signatures to the
    /// session.
    pub attestation_challenge: [u8; ATTESTATION_CHALLENGE_LEN_BYTES],
}

pub trait SessionManager {
    fn expire_all_sessions_for_fabric(&mut self, fabric: FabricIndex);
    /// Expire all sessions of `fabric` but `keep`.
    fn expire_all_sessions_for_fabric_except(&mut self, fabric: FabricIndex, keep: SessionId);
    fn expire_all_pase_sessions(&mut self);
}

#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: Vec<SessionInfo>,
    next_id: SessionId,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(
        &mut self,
        mode: SessionMode,
        fabric_index: Option<FabricIndex>,
        peer_node_id: u64,
    ) -> SessionId {
        self.next_id = self.next_id.wrapping_add(1).max(1);
        let mut attestation_challenge = [0u8; ATTESTATION_CHALLENGE_LEN_BYTES];
        crypto::fill_random(&mut attestation_challenge);
        let session = SessionInfo {
            id: self.next_id,
            mode,
            fabric_index,
            peer_node_id,
            attestation_challenge,
        };
        debug!(mode = ?session.mode, id = session.id, "Session established");
        self.sessions.push(session);
        session.id
    }

    pub fn add_pase(&mut self) -> SessionId {
        self.insert(SessionMode::Pase, None, 0)
    }

    pub fn add_case(&mut self, fabric: FabricIndex, peer_node_id: u64) -> SessionId {
        self.insert(SessionMode::Case, Some(fabric), peer_node_id)
    }

    pub fn get(&self, id: SessionId) -> Option<&SessionInfo> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut SessionInfo> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    pub fn is_active(&self, id: SessionId) -> bool {
        self.get(id).is_some()
    }

    pub fn count_for_fabric(&self, fabric: FabricIndex) -> usize {
        self.sessions
            .iter()
            .filter(|s| s.fabric_index == Some(fabric))
            .count()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionManager for SessionTable {
    fn expire_all_sessions_for_fabric(&mut self, fabric: FabricIndex) {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.fabric_index != Some(fabric));
        info!(%fabric, expired = before - self.sessions.len(), "Expired sessions");
    }

    fn expire_all_sessions_for_fabric_except(&mut self, fabric: FabricIndex, keep: SessionId) {
        let before = self.sessions.len();
        self.sessions
            .retain(|s| s.id == keep || s.fabric_index != Some(fabric));
        info!(%fabric, keep, expired = before - self.sessions.len(), "Expired other sessions");
    }

    fn expire_all_pase_sessions(&mut self) {
        self.sessions.retain(|s| s.mode != SessionMode::Pase);
    }
}
