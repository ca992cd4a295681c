use crate::common::GuildMember;
use crate::domains::registration::models::RegistrationRecord;
use crate::kernel::{GrantAccessError, InsertError, LookupError, MemberFetchError};

/// Registration domain events - FACTS about what happened
///
/// The machine observes these and decides the next command. Collaborator
/// failures are facts too: each carries the typed error so the machine can
/// branch on it without inspecting error strings.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationEvent {
    /// A validated record arrived from intake
    Submitted { record: RegistrationRecord },

    MemberFetched {
        member: GuildMember,
        /// Whether the member already held the verified role
        has_access: bool,
    },
    MemberFetchFailed { error: MemberFetchError },

    CandidatesFound { candidates: Vec<RegistrationRecord> },
    CandidateLookupFailed { error: LookupError },

    AccessGranted,
    AccessGrantFailed { error: GrantAccessError },

    /// Welcome post attempted; delivery is best-effort
    WelcomeAttempted { delivered: bool },

    /// Apology DM after a failed grant attempted; delivery is best-effort
    UserNotified { delivered: bool },

    RecordPersisted { record: RegistrationRecord },
    RecordPersistFailed { error: InsertError },
}
