//! Single-slot guards for asynchronous Form-Storage calls.
//!
//! Each logical action owns one [`InFlight`] slot. Acquiring the slot yields an
//! [`InFlightTicket`]; the slot is released when the ticket is dropped, including when the
//! future holding it is cancelled.

use crate::error::{AuthError, FormError, FormResult};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Logical actions that talk to a collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    SaveForm,
    SubmitForm,
    Login,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::SaveForm => "saving the form",
            Action::SubmitForm => "submitting the form",
            Action::Login => "signing in",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct InFlight {
    action: Action,
    busy: Arc<AtomicBool>,
}

impl InFlight {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Claims the slot for a login attempt.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InFlight`] while another attempt is outstanding.
    pub fn try_begin_login(&self) -> Result<InFlightTicket, AuthError> {
        self.try_begin().map_err(|_| AuthError::InFlight(self.action))
    }

    /// Claims the slot.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::InFlight`] if a ticket for this slot is still alive.
    pub fn try_begin(&self) -> FormResult<InFlightTicket> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| FormError::InFlight(self.action))?;

        Ok(InFlightTicket {
            action: self.action,
            busy: Arc::clone(&self.busy),
        })
    }

    /// Whether a call is outstanding; presentation layers disable the trigger while true.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct InFlightTicket {
    action: Action,
    busy: Arc<AtomicBool>,
}

impl InFlightTicket {
    pub fn action(&self) -> Action {
        self.action
    }
}

impl Drop for InFlightTicket {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_begin_fails_while_ticket_alive() {
        let slot = InFlight::new(Action::SaveForm);
        let ticket = slot.try_begin().unwrap();
        assert!(slot.is_busy());

        let err = slot.try_begin().unwrap_err();
        assert!(matches!(err, FormError::InFlight(Action::SaveForm)));

        drop(ticket);
        assert!(!slot.is_busy());
        assert!(slot.try_begin().is_ok());
    }

    #[test]
    fn test_slots_are_independent() {
        let save = InFlight::new(Action::SaveForm);
        let submit = InFlight::new(Action::SubmitForm);
        let _save_ticket = save.try_begin().unwrap();
        assert!(submit.try_begin().is_ok());
    }

    #[test]
    fn test_login_slot_reports_auth_error() {
        let slot = InFlight::new(Action::Login);
        let _ticket = slot.try_begin_login().unwrap();
        assert_eq!(
            slot.try_begin_login().unwrap_err(),
            AuthError::InFlight(Action::Login)
        );
    }
}
