//! Provisional sequence-number reservations.
//!
//! A reservation transitions to exactly one of consumed or released, never
//! both. Release goes through the [`NonceManager`] interface only — the
//! pool itself belongs to the collaborator.

use sigil_types::{ConfirmError, RequestId};

use crate::traits::NonceManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReservationState {
    Reserved,
    Consumed,
    Released,
}

/// Ordered sequence numbers reserved for one request.
#[derive(Debug)]
pub struct NonceReservation {
    request_id: RequestId,
    nonces: Vec<String>,
    state: ReservationState,
}

impl NonceReservation {
    #[must_use]
    pub fn new(request_id: RequestId, nonces: Vec<String>) -> Self {
        Self {
            request_id,
            nonces,
            state: ReservationState::Reserved,
        }
    }

    /// Whether the reservation still holds unconsumed, unreleased numbers.
    #[must_use]
    pub fn is_outstanding(&self) -> bool {
        self.state == ReservationState::Reserved && !self.nonces.is_empty()
    }

    /// Hand the reserved numbers to the signing context.
    ///
    /// Consuming is terminal: a consumed reservation can no longer be
    /// released.
    #[must_use]
    pub fn consume(mut self) -> Vec<String> {
        self.state = ReservationState::Consumed;
        std::mem::take(&mut self.nonces)
    }

    /// Return every reserved number to the pool.
    ///
    /// Idempotent at this level (already-released and consumed reservations
    /// are no-ops) and tolerant of individual release failures: the
    /// collaborator's `release` is itself idempotent, so the loop keeps
    /// going and reports the first error after trying every nonce.
    pub async fn release_all(&mut self, manager: &dyn NonceManager) -> Result<(), ConfirmError> {
        if self.state != ReservationState::Reserved {
            return Ok(());
        }
        self.state = ReservationState::Released;

        let mut first_error = None;
        for nonce in &self.nonces {
            if let Err(e) = manager.release(nonce).await {
                tracing::warn!(
                    request_id = %self.request_id,
                    nonce = %nonce,
                    "failed to release reserved nonce: {e}"
                );
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for NonceReservation {
    fn drop(&mut self) {
        if self.is_outstanding() {
            tracing::warn!(
                request_id = %self.request_id,
                count = self.nonces.len(),
                "nonce reservation dropped while outstanding"
            );
        }
    }
}
