//! Registration state machine - pure decision logic
//!
//! The machine observes facts (events) and answers each with at most one
//! command. It never performs IO; `RegistrationEffect` runs the commands and
//! reports back with the next event.
//!
//! ```text
//! FetchingMember ─► Classifying ─┬─► Verifying ─► Welcoming ─┬─► Persisting ─► Done
//!                                │        │                  │        │
//!                                │        └─► NotifyingUser  └─► Done └─► Reclassifying ─► Done
//!                                └─► Done (conflicts / lookup failure)
//! ```

use tracing::warn;

use crate::common::GuildMember;
use crate::config::RegistrationConfig;
use crate::domains::registration::classifier::{aggregate, AggregateDecision};
use crate::domains::registration::commands::RegistrationCommand;
use crate::domains::registration::events::RegistrationEvent;
use crate::domains::registration::feedback::{welcome_embed, ACCESS_FAILURE_DM};
use crate::domains::registration::models::RegistrationRecord;
use crate::domains::registration::outcome::WorkflowOutcome;
use crate::kernel::{GrantAccessError, InsertError};

/// Whether the submission is a first registration or a returning member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationPath {
    Fresh,
    Returning,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationState {
    Idle,
    FetchingMember {
        record: RegistrationRecord,
    },
    Classifying {
        record: RegistrationRecord,
        member: GuildMember,
        has_access: bool,
    },
    Verifying {
        record: RegistrationRecord,
        member: GuildMember,
        path: RegistrationPath,
    },
    NotifyingUser {
        member: GuildMember,
        error: GrantAccessError,
    },
    Welcoming {
        record: RegistrationRecord,
        path: RegistrationPath,
    },
    Persisting {
        record: RegistrationRecord,
    },
    /// Insert hit the unique index; re-reading to see who won the race
    Reclassifying {
        record: RegistrationRecord,
    },
    Done(WorkflowOutcome),
}

impl RegistrationState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::FetchingMember { .. } => "fetching_member",
            Self::Classifying { .. } => "classifying",
            Self::Verifying { .. } => "verifying",
            Self::NotifyingUser { .. } => "notifying_user",
            Self::Welcoming { .. } => "welcoming",
            Self::Persisting { .. } => "persisting",
            Self::Reclassifying { .. } => "reclassifying",
            Self::Done(_) => "done",
        }
    }
}

type Transition = (RegistrationState, Option<RegistrationCommand>);

fn done(outcome: WorkflowOutcome) -> Transition {
    (RegistrationState::Done(outcome), None)
}

fn find_candidates(record: &RegistrationRecord) -> RegistrationCommand {
    RegistrationCommand::FindCandidates {
        gmail: record.gmail.clone(),
        discord_id: record.discord_id.clone(),
        student_code: record.student_code.clone(),
    }
}

/// One machine per submission
pub struct RegistrationMachine {
    config: RegistrationConfig,
    state: RegistrationState,
}

impl RegistrationMachine {
    pub fn new(config: RegistrationConfig) -> Self {
        Self {
            config,
            state: RegistrationState::Idle,
        }
    }

    pub fn state(&self) -> &RegistrationState {
        &self.state
    }

    /// Terminal outcome, once reached
    pub fn outcome(&self) -> Option<&WorkflowOutcome> {
        match &self.state {
            RegistrationState::Done(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Process an event and optionally return the next command.
    ///
    /// `None` means the machine is done, or the event does not apply to the
    /// current state (the state is left untouched in that case).
    pub fn decide(&mut self, event: &RegistrationEvent) -> Option<RegistrationCommand> {
        let state = std::mem::replace(&mut self.state, RegistrationState::Idle);
        let (next, command) = self.transition(state, event);
        self.state = next;
        command
    }

    fn transition(&self, state: RegistrationState, event: &RegistrationEvent) -> Transition {
        use RegistrationEvent as E;
        use RegistrationState as S;

        match (state, event) {
            (S::Idle, E::Submitted { record }) => (
                S::FetchingMember {
                    record: record.clone(),
                },
                Some(RegistrationCommand::FetchMember {
                    discord_id: record.discord_id.clone(),
                    role_id: self.config.verified_role_id.clone(),
                }),
            ),

            // No DM on this path: the id may not belong to anyone reachable
            (S::FetchingMember { record }, E::MemberFetchFailed { error }) => {
                done(WorkflowOutcome::MemberFetchFailed {
                    discord_id: record.discord_id,
                    error: error.clone(),
                })
            }
            (S::FetchingMember { record }, E::MemberFetched { member, has_access }) => {
                let command = find_candidates(&record);
                (
                    S::Classifying {
                        record,
                        member: member.clone(),
                        has_access: *has_access,
                    },
                    Some(command),
                )
            }

            (
                S::Classifying {
                    record,
                    member,
                    has_access,
                },
                E::CandidatesFound { candidates },
            ) => match aggregate(&record, candidates.clone()) {
                AggregateDecision::NoMatch => {
                    self.verify(record, member, has_access, RegistrationPath::Fresh)
                }
                AggregateDecision::SameIdentity(_) => {
                    self.verify(record, member, has_access, RegistrationPath::Returning)
                }
                AggregateDecision::ReportedConflicts(conflicts) => {
                    done(WorkflowOutcome::ReportedConflicts {
                        conflicts,
                        access_granted: false,
                    })
                }
            },
            (S::Classifying { .. }, E::CandidateLookupFailed { error }) => {
                done(WorkflowOutcome::LookupFailed {
                    error: error.clone(),
                })
            }

            (
                S::Verifying {
                    record,
                    member,
                    path,
                },
                E::AccessGranted,
            ) => (
                S::Welcoming { record, path },
                Some(RegistrationCommand::SendWelcome {
                    channel_id: self.config.welcome_channel_id.clone(),
                    embed: welcome_embed(&member, path),
                }),
            ),
            (S::Verifying { member, .. }, E::AccessGrantFailed { error }) => {
                let command = RegistrationCommand::NotifyUser {
                    user_id: member.id.clone(),
                    text: ACCESS_FAILURE_DM.to_string(),
                };
                (
                    S::NotifyingUser {
                        member,
                        error: error.clone(),
                    },
                    Some(command),
                )
            }

            (S::NotifyingUser { member, error }, E::UserNotified { delivered }) => {
                done(WorkflowOutcome::PermissionFailed {
                    member_id: member.id,
                    error,
                    dm_delivered: *delivered,
                })
            }

            // Delivery result never changes the path taken
            (S::Welcoming { record, path }, E::WelcomeAttempted { .. }) => match path {
                RegistrationPath::Fresh => (
                    S::Persisting {
                        record: record.clone(),
                    },
                    Some(RegistrationCommand::InsertRecord { record }),
                ),
                RegistrationPath::Returning => done(WorkflowOutcome::WelcomedBack),
            },

            (S::Persisting { .. }, E::RecordPersisted { .. }) => done(WorkflowOutcome::Proceeded),
            (S::Persisting { record }, E::RecordPersistFailed { error }) => match error {
                InsertError::DuplicateKey(_) => {
                    let command = find_candidates(&record);
                    (S::Reclassifying { record }, Some(command))
                }
                InsertError::Transport(reason) => done(WorkflowOutcome::PersistenceFailed {
                    discord_id: record.discord_id,
                    reason: reason.clone(),
                }),
            },

            (S::Reclassifying { record }, E::CandidatesFound { candidates }) => {
                match aggregate(&record, candidates.clone()) {
                    AggregateDecision::SameIdentity(_) => done(WorkflowOutcome::WelcomedBack),
                    AggregateDecision::ReportedConflicts(conflicts) => {
                        done(WorkflowOutcome::ReportedConflicts {
                            conflicts,
                            access_granted: true,
                        })
                    }
                    AggregateDecision::NoMatch => done(WorkflowOutcome::PersistenceFailed {
                        discord_id: record.discord_id,
                        reason: "duplicate key reported but no conflicting record is visible"
                            .to_string(),
                    }),
                }
            }
            (S::Reclassifying { record }, E::CandidateLookupFailed { error }) => {
                done(WorkflowOutcome::PersistenceFailed {
                    discord_id: record.discord_id,
                    reason: format!("duplicate key, then {}", error),
                })
            }

            (S::Done(outcome), _) => done(outcome),

            (state, event) => {
                warn!(
                    state = state.name(),
                    event = ?event,
                    "Event does not apply to current registration state"
                );
                (state, None)
            }
        }
    }

    /// Grant the role unless the member already holds it
    fn verify(
        &self,
        record: RegistrationRecord,
        member: GuildMember,
        has_access: bool,
        path: RegistrationPath,
    ) -> Transition {
        if has_access {
            return done(WorkflowOutcome::AlreadyVerified);
        }

        let command = RegistrationCommand::GrantAccess {
            member: member.clone(),
            role_id: self.config.verified_role_id.clone(),
        };
        (
            RegistrationState::Verifying {
                record,
                member,
                path,
            },
            Some(command),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{LookupError, MemberFetchError};

    fn config() -> RegistrationConfig {
        RegistrationConfig {
            verified_role_id: "role-verified".into(),
            welcome_channel_id: "chan-welcome".into(),
        }
    }

    fn record() -> RegistrationRecord {
        RegistrationRecord::new("111", "20200001", "ana@gmail.com", "Ana Torres", 2020)
    }

    fn member() -> GuildMember {
        GuildMember {
            id: "111".into(),
            username: "ana".into(),
            avatar_url: "https://cdn.discordapp.com/embed/avatars/0.png".into(),
            role_ids: vec![],
        }
    }

    /// Machine that has fetched the member and is waiting for candidates
    fn classifying(has_access: bool) -> RegistrationMachine {
        let mut machine = RegistrationMachine::new(config());
        machine.decide(&RegistrationEvent::Submitted { record: record() });
        machine.decide(&RegistrationEvent::MemberFetched {
            member: member(),
            has_access,
        });
        machine
    }

    #[test]
    fn submission_fetches_member_with_configured_role() {
        let mut machine = RegistrationMachine::new(config());
        let command = machine.decide(&RegistrationEvent::Submitted { record: record() });

        assert_eq!(
            command,
            Some(RegistrationCommand::FetchMember {
                discord_id: "111".into(),
                role_id: "role-verified".into(),
            })
        );
        assert_eq!(machine.state().name(), "fetching_member");
    }

    #[test]
    fn fetch_failure_is_terminal() {
        let mut machine = RegistrationMachine::new(config());
        machine.decide(&RegistrationEvent::Submitted { record: record() });
        let command = machine.decide(&RegistrationEvent::MemberFetchFailed {
            error: MemberFetchError::NotFound("Unknown Member".into()),
        });

        assert!(command.is_none());
        assert!(matches!(
            machine.outcome(),
            Some(WorkflowOutcome::MemberFetchFailed { .. })
        ));
    }

    #[test]
    fn fresh_path_grants_then_welcomes_then_inserts() {
        let mut machine = classifying(false);

        let grant = machine.decide(&RegistrationEvent::CandidatesFound { candidates: vec![] });
        assert_eq!(grant.map(|c| c.name()), Some("grant_access"));

        let welcome = machine.decide(&RegistrationEvent::AccessGranted);
        assert!(matches!(
            welcome,
            Some(RegistrationCommand::SendWelcome { ref channel_id, .. }) if channel_id == "chan-welcome"
        ));

        let insert = machine.decide(&RegistrationEvent::WelcomeAttempted { delivered: false });
        assert_eq!(
            insert,
            Some(RegistrationCommand::InsertRecord { record: record() })
        );

        let end = machine.decide(&RegistrationEvent::RecordPersisted { record: record() });
        assert!(end.is_none());
        assert_eq!(machine.outcome(), Some(&WorkflowOutcome::Proceeded));
    }

    #[test]
    fn returning_path_never_inserts() {
        let mut machine = classifying(false);

        machine.decide(&RegistrationEvent::CandidatesFound {
            candidates: vec![record()],
        });
        machine.decide(&RegistrationEvent::AccessGranted);
        let next = machine.decide(&RegistrationEvent::WelcomeAttempted { delivered: true });

        assert!(next.is_none());
        assert_eq!(machine.outcome(), Some(&WorkflowOutcome::WelcomedBack));
    }

    #[test]
    fn member_with_role_short_circuits() {
        let mut machine = classifying(true);
        let next = machine.decide(&RegistrationEvent::CandidatesFound { candidates: vec![] });

        assert!(next.is_none());
        assert_eq!(machine.outcome(), Some(&WorkflowOutcome::AlreadyVerified));
    }

    #[test]
    fn conflicts_stop_before_any_grant() {
        let mut machine = classifying(false);
        let mut other = record();
        other.discord_id = "222".into();

        let next = machine.decide(&RegistrationEvent::CandidatesFound {
            candidates: vec![other],
        });

        assert!(next.is_none());
        assert!(matches!(
            machine.outcome(),
            Some(WorkflowOutcome::ReportedConflicts {
                access_granted: false,
                ..
            })
        ));
    }

    #[test]
    fn grant_failure_notifies_user_before_failing() {
        let mut machine = classifying(false);
        machine.decide(&RegistrationEvent::CandidatesFound { candidates: vec![] });

        let notify = machine.decide(&RegistrationEvent::AccessGrantFailed {
            error: GrantAccessError::Permission("Missing Permissions".into()),
        });
        assert!(matches!(
            notify,
            Some(RegistrationCommand::NotifyUser { ref user_id, .. }) if user_id == "111"
        ));

        machine.decide(&RegistrationEvent::UserNotified { delivered: false });
        assert_eq!(
            machine.outcome(),
            Some(&WorkflowOutcome::PermissionFailed {
                member_id: "111".into(),
                error: GrantAccessError::Permission("Missing Permissions".into()),
                dm_delivered: false,
            })
        );
    }

    #[test]
    fn duplicate_key_rereads_candidates() {
        let mut machine = classifying(false);
        machine.decide(&RegistrationEvent::CandidatesFound { candidates: vec![] });
        machine.decide(&RegistrationEvent::AccessGranted);
        machine.decide(&RegistrationEvent::WelcomeAttempted { delivered: true });

        let reread = machine.decide(&RegistrationEvent::RecordPersistFailed {
            error: InsertError::DuplicateKey("registrations_identity_key".into()),
        });
        assert_eq!(reread.map(|c| c.name()), Some("find_candidates"));

        machine.decide(&RegistrationEvent::CandidatesFound {
            candidates: vec![record()],
        });
        assert_eq!(machine.outcome(), Some(&WorkflowOutcome::WelcomedBack));
    }

    #[test]
    fn failed_reread_after_duplicate_is_persistence_failure() {
        let mut machine = classifying(false);
        machine.decide(&RegistrationEvent::CandidatesFound { candidates: vec![] });
        machine.decide(&RegistrationEvent::AccessGranted);
        machine.decide(&RegistrationEvent::WelcomeAttempted { delivered: true });
        machine.decide(&RegistrationEvent::RecordPersistFailed {
            error: InsertError::DuplicateKey("registrations_identity_key".into()),
        });
        machine.decide(&RegistrationEvent::CandidateLookupFailed {
            error: LookupError::Transport("timeout".into()),
        });

        assert!(matches!(
            machine.outcome(),
            Some(WorkflowOutcome::PersistenceFailed { .. })
        ));
    }

    #[test]
    fn unexpected_event_leaves_state_alone() {
        let mut machine = RegistrationMachine::new(config());
        machine.decide(&RegistrationEvent::Submitted { record: record() });

        let command = machine.decide(&RegistrationEvent::AccessGranted);

        assert!(command.is_none());
        assert_eq!(machine.state().name(), "fetching_member");
        assert!(machine.outcome().is_none());
    }
}
