use serde::Serialize;

use super::classifier::ConflictReport;
use crate::kernel::{GrantAccessError, LookupError, MemberFetchError};

/// How a registration attempt ended
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowOutcome {
    /// Fresh registration: access granted, welcomed, record persisted
    Proceeded,
    /// Returning user (or a race lost to an identical record): access granted, nothing inserted
    WelcomedBack,
    /// Member already held the verified role; nothing was done
    AlreadyVerified,
    /// Overlapping records found and reported to moderators.
    ///
    /// `access_granted` is only true when the overlap became visible after
    /// the grant, i.e. a concurrent submission won the insert.
    ReportedConflicts {
        conflicts: Vec<ConflictReport>,
        access_granted: bool,
    },
    MemberFetchFailed {
        discord_id: String,
        error: MemberFetchError,
    },
    PermissionFailed {
        member_id: String,
        error: GrantAccessError,
        dm_delivered: bool,
    },
    /// Access was granted but the record was not saved
    PersistenceFailed { discord_id: String, reason: String },
    /// The candidate query failed before any side effect
    LookupFailed { error: LookupError },
}

/// Terminal state of the registration machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalState {
    Succeeded,
    ConflictReported,
    Failed,
}

impl WorkflowOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Proceeded => "proceeded",
            Self::WelcomedBack => "welcomed_back",
            Self::AlreadyVerified => "already_verified",
            Self::ReportedConflicts { .. } => "reported_conflicts",
            Self::MemberFetchFailed { .. } => "member_fetch_failed",
            Self::PermissionFailed { .. } => "permission_failed",
            Self::PersistenceFailed { .. } => "persistence_failed",
            Self::LookupFailed { .. } => "lookup_failed",
        }
    }

    pub fn terminal_state(&self) -> TerminalState {
        match self {
            Self::Proceeded | Self::WelcomedBack | Self::AlreadyVerified => {
                TerminalState::Succeeded
            }
            Self::ReportedConflicts { .. } => TerminalState::ConflictReported,
            Self::MemberFetchFailed { .. }
            | Self::PermissionFailed { .. }
            | Self::PersistenceFailed { .. }
            | Self::LookupFailed { .. } => TerminalState::Failed,
        }
    }

    /// Member is verified but the store does not agree with that; a moderator must reconcile
    pub fn requires_reconciliation(&self) -> bool {
        match self {
            Self::PersistenceFailed { .. } => true,
            Self::ReportedConflicts { access_granted, .. } => *access_granted,
            _ => false,
        }
    }
}
