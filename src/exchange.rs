use core::cell::RefCell;

use tracing::{debug, warn};

use crate::{
    fabric::FabricIndex,
    session_context::{SessionId, SessionInfo, SessionManager, SessionMode, SessionTable},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeError {
    #[error("session no longer exists")]
    SessionNotFound,
    #[error("only a PASE session without a fabric can adopt one")]
    CannotAdoptFabric,
}

/// The exchange a command arrived on, and through it the session.
pub trait Exchange {
    fn session(&self) -> SessionInfo;

    fn accessing_fabric(&self) -> Option<FabricIndex> {
        self.session().fabric_index
    }

    /// Bind a PASE session to a fabric created during it.
    fn adopt_fabric(&mut self, fabric: FabricIndex) -> Result<(), ExchangeError>;

    /// Undo [`Exchange::adopt_fabric`], leaving the PASE session without a
    /// fabric again.
    fn release_fabric(&mut self);

    /// Acknowledge the request now, ahead of slow work, so the peer does not
    /// retransmit it.
    fn flush_acks(&mut self);

    /// Tear down every session on this exchange's fabric except this one,
    /// which lives until the response is sent.
    fn abort_all_other_communication_on_fabric(&mut self);
}

/// An exchange over one session of a [`SessionTable`].
pub struct SessionExchange<'a> {
    session: SessionInfo,
    sessions: &'a RefCell<SessionTable>,
    acks_flushed: usize,
}

impl<'a> SessionExchange<'a> {
    pub fn new(sessions: &'a RefCell<SessionTable>, id: SessionId) -> Result<Self, ExchangeError> {
        let session = *sessions
            .borrow()
            .get(id)
            .ok_or(ExchangeError::SessionNotFound)?;
        Ok(Self {
            session,
            sessions,
            acks_flushed: 0,
        })
    }

    /// Number of standalone acks sent so far.
    pub fn acks_flushed(&self) -> usize {
        self.acks_flushed
    }
}

impl<'a> Exchange for SessionExchange<'a> {
    fn session(&self) -> SessionInfo {
        self.session
    }

    fn adopt_fabric(&mut self, fabric: FabricIndex) -> Result<(), ExchangeError> {
        if self.session.mode != SessionMode::Pase || self.session.fabric_index.is_some() {
            return Err(ExchangeError::CannotAdoptFabric);
        }
        let mut sessions = self.sessions.borrow_mut();
        let session = sessions
            .get_mut(self.session.id)
            .ok_or(ExchangeError::SessionNotFound)?;
        session.fabric_index = Some(fabric);
        self.session = *session;
        debug!(id = self.session.id, %fabric, "PASE session adopted fabric");
        Ok(())
    }

    fn release_fabric(&mut self) {
        if self.session.mode != SessionMode::Pase {
            return;
        }
        let mut sessions = self.sessions.borrow_mut();
        match sessions.get_mut(self.session.id) {
            Some(session) => {
                session.fabric_index = None;
                self.session = *session;
            }
            None => self.session.fabric_index = None,
        }
        debug!(id = self.session.id, "PASE session released its fabric");
    }

    fn flush_acks(&mut self) {
        self.acks_flushed += 1;
    }

    fn abort_all_other_communication_on_fabric(&mut self) {
        match self.session.fabric_index {
            Some(fabric) => self
                .sessions
                .borrow_mut()
                .expire_all_sessions_for_fabric_except(fabric, self.session.id),
            None => warn!(id = self.session.id, "Session has no fabric to abort"),
        }
    }
}
