//! Conflict classification - pure decision table over identifying fields
//!
//! Each candidate returned by the store is compared against the submitted
//! record on gmail, discord id and student code. The three equality flags
//! select exactly one classification; the whole candidate list then reduces
//! to an aggregate decision for the workflow.

use serde::{Deserialize, Serialize};

use super::models::RegistrationRecord;

/// Which identifying fields a candidate shares with the submitted record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldMatches {
    pub gmail: bool,
    pub discord_id: bool,
    pub student_code: bool,
}

impl FieldMatches {
    pub fn between(submitted: &RegistrationRecord, candidate: &RegistrationRecord) -> Self {
        Self {
            gmail: submitted.gmail == candidate.gmail,
            discord_id: submitted.discord_id == candidate.discord_id,
            student_code: submitted.student_code == candidate.student_code,
        }
    }
}

/// Relationship between a submitted record and one existing record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictClassification {
    NoMatch,
    SameIdentity,
    MultiAccount,
    MultiAccountImpersonation,
    AlreadyRegisteredImpersonation,
    CodeImpersonation,
}

impl ConflictClassification {
    /// Decision table, exhaustive over (gmail, discord_id, student_code).
    ///
    /// The moderation rules only name the rows with a gmail match and the
    /// lone student code row. The candidate query does return the others:
    /// (F, T, T) resolves to `SameIdentity` (discord id and student code
    /// agree), (F, T, F) to `AlreadyRegisteredImpersonation` (same account,
    /// different code). (F, F, F) never matches the query and is `NoMatch`.
    pub fn from_matches(matches: FieldMatches) -> Self {
        use ConflictClassification::*;

        match (matches.gmail, matches.discord_id, matches.student_code) {
            (true, true, true) => SameIdentity,
            (true, false, true) => MultiAccount,
            (true, false, false) => MultiAccountImpersonation,
            (true, true, false) => AlreadyRegisteredImpersonation,
            (false, false, true) => CodeImpersonation,
            (false, true, true) => SameIdentity,
            (false, true, false) => AlreadyRegisteredImpersonation,
            (false, false, false) => NoMatch,
        }
    }

    /// Moderator-facing explanation shown on the report embed
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Self::NoMatch | Self::SameIdentity => None,
            Self::MultiAccount => Some("👥 Possible multi-account of this user 👥"),
            Self::MultiAccountImpersonation => {
                Some("⚠️ Email already registered, possible impersonation with multiple accounts ⚠️")
            }
            Self::AlreadyRegisteredImpersonation => {
                Some("⚠️ Account already registered trying to change its student code ⚠️")
            }
            Self::CodeImpersonation => {
                Some("⚠️ Student code already registered, possible impersonation ⚠️")
            }
        }
    }
}

/// Classify one candidate against the submitted record
pub fn classify(
    submitted: &RegistrationRecord,
    candidate: &RegistrationRecord,
) -> ConflictClassification {
    ConflictClassification::from_matches(FieldMatches::between(submitted, candidate))
}

/// One existing record that overlaps the submission, ready for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub existing: RegistrationRecord,
    pub matches: FieldMatches,
    pub classification: ConflictClassification,
}

impl ConflictReport {
    pub fn new(submitted: &RegistrationRecord, existing: RegistrationRecord) -> Self {
        let matches = FieldMatches::between(submitted, &existing);
        Self {
            classification: ConflictClassification::from_matches(matches),
            matches,
            existing,
        }
    }

    pub fn reason(&self) -> Option<&'static str> {
        self.classification.reason()
    }
}

/// What the whole candidate list means for the submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateDecision {
    /// Nobody shares any identifying field: fresh registration
    NoMatch,
    /// Exactly one candidate and it is this same identity: returning user
    SameIdentity(RegistrationRecord),
    /// Anything else; one report per candidate in store order
    ReportedConflicts(Vec<ConflictReport>),
}

/// Reduce the candidate list to a single decision
pub fn aggregate(
    submitted: &RegistrationRecord,
    candidates: Vec<RegistrationRecord>,
) -> AggregateDecision {
    if candidates.is_empty() {
        return AggregateDecision::NoMatch;
    }

    if let [only] = candidates.as_slice() {
        if classify(submitted, only) == ConflictClassification::SameIdentity {
            return AggregateDecision::SameIdentity(only.clone());
        }
    }

    AggregateDecision::ReportedConflicts(
        candidates
            .into_iter()
            .map(|existing| ConflictReport::new(submitted, existing))
            .collect(),
    )
}
