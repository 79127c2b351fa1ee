use std::fmt::Debug;

use serde::Serialize;

use crate::common::errors::{DomainError, ErrorKind};

/// Estado de una operación de varios pasos sobre la papelera
pub trait OperationState: Copy + Debug + PartialEq + Send + Sync + 'static {
    /// Whether the machine may move from `self` to `next`
    fn can_advance_to(self, next: Self) -> bool;

    fn is_terminal(self) -> bool;
}

/// Steps of moving a photo into the trash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MoveToTrashState {
    Started,
    /// Bytes copied into the trash directory
    Copied,
    /// Ledger row written
    LedgerWritten,
    /// Waiting on the media index to drop the original entry
    IndexDeletePending,
    Completed,
}

impl OperationState for MoveToTrashState {
    fn can_advance_to(self, next: Self) -> bool {
        use MoveToTrashState::*;
        matches!(
            (self, next),
            (Started, Copied)
                | (Copied, LedgerWritten)
                | (LedgerWritten, IndexDeletePending)
                | (IndexDeletePending, Completed)
        )
    }

    fn is_terminal(self) -> bool {
        self == MoveToTrashState::Completed
    }
}

/// Steps of restoring a trashed photo into the media index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RestoreState {
    /// Trash file confirmed present
    Verified,
    /// Pending index entry created
    IndexEntryCreated,
    /// Bytes copied into the index entry
    Copied,
    /// Pending flag cleared
    Finalized,
    TrashFileRemoved,
    Completed,
}

impl OperationState for RestoreState {
    fn can_advance_to(self, next: Self) -> bool {
        use RestoreState::*;
        matches!(
            (self, next),
            (Verified, IndexEntryCreated)
                | (IndexEntryCreated, Copied)
                | (Copied, Finalized)
                | (Finalized, TrashFileRemoved)
                // trash file removal is best-effort
                | (Finalized, Completed)
                | (TrashFileRemoved, Completed)
        )
    }

    fn is_terminal(self) -> bool {
        self == RestoreState::Completed
    }
}

/// Journal of a multi-step trash operation.
///
/// There is no rollback: a failure leaves the operation at a named state so the
/// partial side effects (an orphan file, a pending index entry) can be inspected
/// and reconciled later.
#[derive(Debug, Clone)]
pub struct TrashTransaction<S: OperationState> {
    name: &'static str,
    subject: String,
    state: S,
    journal: Vec<S>,
}

impl<S: OperationState> TrashTransaction<S> {
    pub fn begin(name: &'static str, subject: impl Into<String>, initial: S) -> Self {
        let subject = subject.into();
        tracing::debug!("Iniciando operación {} sobre {} en estado {:?}", name, subject, initial);
        Self {
            name,
            subject,
            state: initial,
            journal: vec![initial],
        }
    }

    pub fn advance(&mut self, next: S) -> Result<(), DomainError> {
        if !self.state.can_advance_to(next) {
            return Err(DomainError::new(
                ErrorKind::InternalError,
                "Transaction",
                format!("{}: invalid transition {:?} -> {:?} for {}", self.name, self.state, next, self.subject),
            ));
        }

        tracing::trace!("{} {}: {:?} -> {:?}", self.name, self.subject, self.state, next);
        self.state = next;
        self.journal.push(next);
        Ok(())
    }

    pub fn state(&self) -> S {
        self.state
    }

    pub fn journal(&self) -> &[S] {
        &self.journal
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_terminal()
    }

    /// Logs where the operation stopped and tags the error with it
    pub fn fail(&self, err: DomainError) -> DomainError {
        tracing::error!("{} {} stopped at {:?}: {}", self.name, self.subject, self.state, err);
        let message = format!("{} (stopped at {:?})", err.message, self.state);
        DomainError { message, ..err }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_to_trash_happy_path() {
        let mut tx = TrashTransaction::begin("move_to_trash", "photo 1", MoveToTrashState::Started);
        tx.advance(MoveToTrashState::Copied).unwrap();
        tx.advance(MoveToTrashState::LedgerWritten).unwrap();
        tx.advance(MoveToTrashState::IndexDeletePending).unwrap();
        tx.advance(MoveToTrashState::Completed).unwrap();

        assert!(tx.is_complete());
        assert_eq!(tx.journal().len(), 5);
    }

    #[test]
    fn test_skipping_a_step_is_rejected() {
        let mut tx = TrashTransaction::begin("move_to_trash", "photo 1", MoveToTrashState::Started);
        let err = tx.advance(MoveToTrashState::LedgerWritten).unwrap_err();

        assert_eq!(err.kind, ErrorKind::InternalError);
        assert_eq!(tx.state(), MoveToTrashState::Started);
    }

    #[test]
    fn test_restore_may_complete_without_removing_trash_file() {
        let mut tx = TrashTransaction::begin("restore_photo", "row 3", RestoreState::Verified);
        tx.advance(RestoreState::IndexEntryCreated).unwrap();
        tx.advance(RestoreState::Copied).unwrap();
        tx.advance(RestoreState::Finalized).unwrap();
        tx.advance(RestoreState::Completed).unwrap();

        assert!(tx.is_complete());
    }

    #[test]
    fn test_fail_tags_error_with_state() {
        let mut tx = TrashTransaction::begin("restore_photo", "row 3", RestoreState::Verified);
        tx.advance(RestoreState::IndexEntryCreated).unwrap();

        let err = tx.fail(DomainError::io_error("TrashFile", "disk full"));
        assert_eq!(err.kind, ErrorKind::Io);
        assert_eq!(err.message, "disk full (stopped at IndexEntryCreated)");
    }
}
