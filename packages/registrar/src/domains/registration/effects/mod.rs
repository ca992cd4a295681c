//! Registration effects - execute commands against collaborators
//!
//! Effects are stateless: the command carries everything needed. Every
//! collaborator result, success or failure, comes back as exactly one event;
//! nothing here decides what happens next.

use tracing::{error, info, warn};

use super::commands::RegistrationCommand;
use super::events::RegistrationEvent;
use super::feedback::Acknowledgment;
use crate::common::SourceMessage;
use crate::kernel::{
    DeliveryError, GrantAccessError, InsertError, LookupError, MemberFetchError, ServerDeps,
};

pub struct RegistrationEffect<'a> {
    deps: &'a ServerDeps,
}

impl<'a> RegistrationEffect<'a> {
    pub fn new(deps: &'a ServerDeps) -> Self {
        Self { deps }
    }

    pub async fn execute(&self, command: RegistrationCommand) -> RegistrationEvent {
        match command {
            RegistrationCommand::FetchMember {
                discord_id,
                role_id,
            } => match self.deps.directory.fetch_member(&discord_id).await {
                Ok(member) => {
                    let has_access = self.deps.directory.has_access(&member, &role_id);
                    RegistrationEvent::MemberFetched { member, has_access }
                }
                Err(error) => {
                    match &error {
                        MemberFetchError::NotFound(_) => {
                            info!(discord_id = %discord_id, error = %error, "Member not in guild");
                        }
                        MemberFetchError::Transport(_) => {
                            error!(discord_id = %discord_id, error = %error, "Member lookup failed");
                        }
                    }
                    RegistrationEvent::MemberFetchFailed { error }
                }
            },

            RegistrationCommand::FindCandidates {
                gmail,
                discord_id,
                student_code,
            } => match self
                .deps
                .store
                .find_candidates(&gmail, &discord_id, &student_code)
                .await
            {
                Ok(candidates) => {
                    info!(
                        discord_id = %discord_id,
                        candidates = candidates.len(),
                        "Candidate registrations loaded"
                    );
                    RegistrationEvent::CandidatesFound { candidates }
                }
                Err(error) => {
                    match &error {
                        LookupError::Transport(_) => {
                            error!(discord_id = %discord_id, error = %error, "Candidate lookup failed");
                        }
                    }
                    RegistrationEvent::CandidateLookupFailed { error }
                }
            },

            RegistrationCommand::GrantAccess { member, role_id } => {
                match self.deps.directory.grant_access(&member, &role_id).await {
                    Ok(()) => {
                        info!(member_id = %member.id, role_id = %role_id, "Verified role granted");
                        RegistrationEvent::AccessGranted
                    }
                    Err(error) => {
                        match &error {
                            GrantAccessError::Permission(_) => {
                                error!(member_id = %member.id, error = %error, "Bot lacks permission to grant role");
                            }
                            GrantAccessError::NotFound(_) => {
                                error!(member_id = %member.id, role_id = %role_id, error = %error, "Member or role vanished before grant");
                            }
                            GrantAccessError::Transport(_) => {
                                error!(member_id = %member.id, error = %error, "Role grant request failed");
                            }
                        }
                        RegistrationEvent::AccessGrantFailed { error }
                    }
                }
            }

            RegistrationCommand::SendWelcome { channel_id, embed } => {
                let delivered = match self
                    .deps
                    .messenger
                    .send_channel_embed(&channel_id, embed)
                    .await
                {
                    Ok(()) => true,
                    Err(error) => {
                        log_delivery_failure("welcome", &channel_id, &error);
                        false
                    }
                };
                RegistrationEvent::WelcomeAttempted { delivered }
            }

            RegistrationCommand::NotifyUser { user_id, text } => {
                let delivered = match self
                    .deps
                    .messenger
                    .send_direct_message(&user_id, &text)
                    .await
                {
                    Ok(()) => true,
                    Err(error) => {
                        log_delivery_failure("direct message", &user_id, &error);
                        false
                    }
                };
                RegistrationEvent::UserNotified { delivered }
            }

            RegistrationCommand::InsertRecord { record } => {
                match self.deps.store.insert(&record).await {
                    Ok(created) => {
                        info!(discord_id = %created.discord_id, "Registration saved");
                        RegistrationEvent::RecordPersisted { record: created }
                    }
                    Err(error) => {
                        match &error {
                            InsertError::DuplicateKey(_) => {
                                warn!(discord_id = %record.discord_id, error = %error, "Registration raced with an identical submission");
                            }
                            InsertError::Transport(_) => {
                                error!(discord_id = %record.discord_id, error = %error, "Member verified but registration not saved");
                            }
                        }
                        RegistrationEvent::RecordPersistFailed { error }
                    }
                }
            }
        }
    }
}

fn log_delivery_failure(what: &str, target: &str, error: &DeliveryError) {
    match error {
        DeliveryError::ChannelNotFound(_) => {
            warn!(target_id = %target, error = %error, "{} channel not found", what)
        }
        DeliveryError::Unreachable(_) => {
            warn!(target_id = %target, error = %error, "{} recipient unreachable", what)
        }
        DeliveryError::Transport(_) => {
            warn!(target_id = %target, error = %error, "{} delivery failed", what)
        }
    }
}

/// Attach an acknowledgment to the source message (reactions, then reply).
///
/// Best-effort: delivery failures are logged and never surface as errors.
pub async fn dispatch_acknowledgment(
    deps: &ServerDeps,
    source: &SourceMessage,
    ack: Acknowledgment,
) {
    if let Err(error) = deps.messenger.acknowledge(source, ack.signal).await {
        log_delivery_failure("acknowledgment", &source.message_id, &error);
    }

    for emoji in &ack.extra_reactions {
        if let Err(error) = deps.messenger.react(source, emoji).await {
            log_delivery_failure("reaction", &source.message_id, &error);
        }
    }

    if ack.needs_reply() {
        if let Err(error) = deps
            .messenger
            .reply(source, ack.message.as_deref(), ack.embeds)
            .await
        {
            log_delivery_failure("reply", &source.message_id, &error);
        }
    }
}
