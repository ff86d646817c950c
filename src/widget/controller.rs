//! Toggle controller: optimistic flip, request dispatch, rollback on failure.
//!
//! DESIGN
//! ======
//! A toggle flips the local flag and repaints before anything goes over the
//! wire. The request is then sent and its outcome settled against the page:
//! success leaves the optimistic state in place, failure restores the
//! previous state and is reported to the caller.
//!
//! TRADE-OFFS
//! ==========
//! Toggles are not coalesced. Each one bumps a generation counter; a failed
//! request only rolls the page back when no newer toggle has been issued
//! since, because the newer request already carries the state the user
//! last asked for. Rollback restores the last state the server confirmed,
//! not the state before the failed click.

use crate::config::Labels;

use super::page::{Page, apply_visual_state};
use super::transport::{Transport, TransportError};
use super::{Appearance, InitArgs};

#[derive(Debug, thiserror::Error)]
pub enum ToggleError {
    /// The request failed and the page was restored to the previous state.
    #[error("state change failed and was rolled back: {0}")]
    RolledBack(#[source] TransportError),
    /// The request failed, but a newer toggle already replaced it.
    #[error("superseded state change failed: {0}")]
    Superseded(#[source] TransportError),
}

/// A flip that has been applied locally and still has to reach the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingToggle {
    pub course_id: i64,
    pub active: bool,
    generation: u64,
}

pub struct Controller<T> {
    args: InitArgs,
    labels: Labels,
    transport: T,
    active: bool,
    /// Last state the server acknowledged (or the rendered initial state).
    confirmed: bool,
    confirmed_generation: u64,
    generation: u64,
}

impl<T: Transport> Controller<T> {
    #[must_use]
    pub fn new(args: InitArgs, labels: Labels, transport: T) -> Self {
        let active = args.active;
        Self { args, labels, transport, active, confirmed: active, confirmed_generation: 0, generation: 0 }
    }

    #[must_use]
    pub fn active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn course_id(&self) -> i64 {
        self.args.course_id
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Paint the current state into `page`.
    pub fn render(&self, page: &mut dyn Page) {
        apply_visual_state(page, &Appearance::new(&self.args, self.active, &self.labels));
    }

    /// Flip the flag and repaint immediately.
    pub fn begin_toggle(&mut self, page: &mut dyn Page) -> PendingToggle {
        self.active = !self.active;
        self.generation += 1;
        self.render(page);
        PendingToggle { course_id: self.args.course_id, active: self.active, generation: self.generation }
    }

    /// Send a pending flip to the server.
    ///
    /// # Errors
    ///
    /// Returns the transport failure unchanged; pass it to [`Controller::settle`].
    pub async fn dispatch(&self, pending: PendingToggle) -> Result<(), TransportError> {
        self.transport.set_state(pending.course_id, pending.active).await
    }

    /// Reconcile the page with the outcome of a dispatched flip.
    ///
    /// # Errors
    ///
    /// Returns [`ToggleError::RolledBack`] if the flip was undone, or
    /// [`ToggleError::Superseded`] if it failed after a newer toggle.
    pub fn settle(
        &mut self,
        page: &mut dyn Page,
        pending: PendingToggle,
        outcome: Result<(), TransportError>,
    ) -> Result<(), ToggleError> {
        let Err(err) = outcome else {
            if pending.generation > self.confirmed_generation {
                self.confirmed = pending.active;
                self.confirmed_generation = pending.generation;
            }
            return Ok(());
        };

        if pending.generation != self.generation {
            tracing::debug!(course_id = pending.course_id, error = %err, "stale toggle failed; keeping newer state");
            return Err(ToggleError::Superseded(err));
        }

        self.active = self.confirmed;
        self.render(page);
        tracing::warn!(course_id = pending.course_id, error = %err, "toggle rejected; rolled back");
        Err(ToggleError::RolledBack(err))
    }

    /// Flip, send and settle in one step. Returns the resulting local state.
    ///
    /// # Errors
    ///
    /// See [`Controller::settle`].
    pub async fn toggle(&mut self, page: &mut dyn Page) -> Result<bool, ToggleError> {
        let pending = self.begin_toggle(page);
        let outcome = self.dispatch(pending).await;
        self.settle(page, pending, outcome)?;
        Ok(self.active)
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
