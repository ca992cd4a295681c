//! Feedback - what each outcome looks like to moderators and members
//!
//! Pure lookups from outcomes to acknowledgment signals, diagnostic text
//! and embeds. Nothing here performs IO.

use chrono::{DateTime, FixedOffset, Utc};
use discord::models::{Embed, EmbedAuthor, EmbedFooter, EmbedImage};

use super::classifier::ConflictReport;
use super::intake::IntakeError;
use super::machines::RegistrationPath;
use super::outcome::WorkflowOutcome;
use super::workflows::WorkflowError;
use crate::common::{GuildMember, Signal};
use crate::kernel::MemberFetchError;

/// Discord's "Blue" embed color
pub const EMBED_COLOR: u32 = 0x3498DB;

/// Author icon on the welcome post for new members
pub const FRESH_WELCOME_ICON: &str =
    "https://media.discordapp.net/attachments/744860318743920711/962177397262811136/9619_GhostWave.gif";

/// Author icon on the welcome post for returning members
pub const RETURNING_WELCOME_ICON: &str = "https://static.wikia.nocookie.net/floppapedia-revamped/images/6/64/RREFCC.jpg/revision/latest?cb=20210705233223";

/// Extra reaction on the source message when a member comes back
pub const RETURNING_REACTION: &str = "👋";

/// America/Lima, which has no daylight saving time
const LIMA_UTC_OFFSET_SECS: i32 = -5 * 3600;

/// Sent to a member whose role grant failed
pub const ACCESS_FAILURE_DM: &str = "The bot team ran into a problem (ours) while registering you.\n\n\
     We are (_clearly_) fixing it, but in the meantime you can contact an \
     administrator to register you manually.";

/// What to attach to the source message once the workflow finished
#[derive(Debug, Clone, PartialEq)]
pub struct Acknowledgment {
    pub signal: Signal,
    /// Reactions added after the signal's own
    pub extra_reactions: Vec<&'static str>,
    pub message: Option<String>,
    pub embeds: Vec<Embed>,
}

impl Acknowledgment {
    fn signal(signal: Signal) -> Self {
        Self {
            signal,
            extra_reactions: Vec::new(),
            message: None,
            embeds: Vec::new(),
        }
    }

    fn with_message(signal: Signal, message: String) -> Self {
        Self {
            message: Some(message),
            ..Self::signal(signal)
        }
    }

    /// Whether a reply must be posted besides the reaction
    pub fn needs_reply(&self) -> bool {
        self.message.is_some() || !self.embeds.is_empty()
    }
}

/// Map a terminal outcome to its acknowledgment. Total over every outcome.
pub fn acknowledgment_for(outcome: &WorkflowOutcome) -> Acknowledgment {
    match outcome {
        WorkflowOutcome::Proceeded => Acknowledgment::signal(Signal::Success),
        WorkflowOutcome::WelcomedBack => Acknowledgment {
            extra_reactions: vec![RETURNING_REACTION],
            ..Acknowledgment::signal(Signal::Success)
        },
        WorkflowOutcome::AlreadyVerified => Acknowledgment::signal(Signal::AlreadyDone),
        WorkflowOutcome::ReportedConflicts {
            conflicts,
            access_granted,
        } => {
            let mut message = if conflicts.len() == 1 {
                "❗️ Found a registration similar to this one".to_string()
            } else {
                format!(
                    "❗️ Found {} registrations similar to this one",
                    conflicts.len()
                )
            };
            if *access_granted {
                message.push_str(
                    "\n⚠️ Access was granted before the conflicting registration became \
                     visible; this member needs manual review.",
                );
            }
            Acknowledgment {
                embeds: conflicts.iter().map(conflict_embed).collect(),
                ..Acknowledgment::with_message(Signal::Suspicious, message)
            }
        }
        WorkflowOutcome::MemberFetchFailed { discord_id, error } => {
            let message = match error {
                MemberFetchError::NotFound(_) => {
                    format!("Can't fetch user `{}`: {}", discord_id, error)
                }
                MemberFetchError::Transport(_) => format!(
                    "Unknown error when registering: {}. Could not send DM to `{}`",
                    error, discord_id
                ),
            };
            Acknowledgment::with_message(Signal::HardError, message)
        }
        WorkflowOutcome::PermissionFailed {
            member_id,
            error,
            dm_delivered,
        } => {
            let dm_note = if *dm_delivered {
                format!("DM feedback sent to `{}`", member_id)
            } else {
                format!("Could not send DM to `{}`", member_id)
            };
            Acknowledgment::with_message(
                Signal::HardError,
                format!("API error when registering: {}. {}", error, dm_note),
            )
        }
        WorkflowOutcome::PersistenceFailed { discord_id, reason } => {
            Acknowledgment::with_message(
                Signal::SoftError,
                format!(
                    "User `{}` was verified, but could not be saved to the database: {}. \
                     No DM sent; reconcile manually.",
                    discord_id, reason
                ),
            )
        }
        WorkflowOutcome::LookupFailed { error } => Acknowledgment::with_message(
            Signal::HardError,
            format!("Could not check existing registrations: {}", error),
        ),
    }
}

/// Acknowledgment for a submission that never reached the workflow
pub fn acknowledgment_for_intake(error: &IntakeError) -> Acknowledgment {
    Acknowledgment::with_message(
        Signal::HardError,
        format!("Malformed registration: {}", error),
    )
}

/// Acknowledgment for a workflow that stopped without an outcome
pub fn acknowledgment_for_failure(error: &WorkflowError) -> Acknowledgment {
    Acknowledgment::with_message(
        Signal::HardError,
        format!("Internal error while registering: {}", error),
    )
}

/// Local date as moderators read it, e.g. `5/3/2024, 09:15:00` for March 5th
fn lima_date(at: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(LIMA_UTC_OFFSET_SECS) {
        Some(lima) => at
            .with_timezone(&lima)
            .format("%-d/%-m/%Y, %H:%M:%S")
            .to_string(),
        None => at.format("%-d/%-m/%Y, %H:%M:%S UTC").to_string(),
    }
}

fn flagged(value: &str, matched: bool) -> String {
    if matched {
        format!("{} 🚩", value)
    } else {
        value.to_string()
    }
}

/// One report embed per overlapping record, matching fields flagged
pub fn conflict_embed(report: &ConflictReport) -> Embed {
    let existing = &report.existing;

    let registered = match existing.created_at {
        Some(at) => format!(
            "_Registered_ <t:{}:R> _({})_",
            at.timestamp(),
            lima_date(at)
        ),
        None => "_Registered_ at an unknown time".to_string(),
    };

    let description = format!(
        "**fullName**: `{}`\n\
         **gmail**: `{}`\n\
         **studentCode**: `{}`\n\
         **base**: `{}`\n\
         **discordId**: `{}`\n\n\
         {}",
        existing.full_name,
        flagged(&existing.gmail, report.matches.gmail),
        flagged(&existing.student_code, report.matches.student_code),
        existing.base,
        flagged(&existing.discord_id, report.matches.discord_id),
        registered,
    );

    Embed {
        description: Some(description),
        footer: Some(EmbedFooter {
            text: report.reason().unwrap_or(" ").to_string(),
        }),
        ..Default::default()
    }
}

/// Public welcome post; returning members get their own wording
pub fn welcome_embed(member: &GuildMember, path: RegistrationPath) -> Embed {
    let (description, author, icon) = match path {
        RegistrationPath::Fresh => (
            format!(
                "{} passed all our checks and has appeared on the server!!",
                member.mention()
            ),
            "New member!!! 🎉".to_string(),
            FRESH_WELCOME_ICON,
        ),
        RegistrationPath::Returning => (
            format!("{} has come back to the server!!", member.mention()),
            format!("{}... is... back...", member.username),
            RETURNING_WELCOME_ICON,
        ),
    };

    Embed {
        description: Some(description),
        author: Some(EmbedAuthor {
            name: author,
            icon_url: Some(icon.to_string()),
        }),
        thumbnail: Some(EmbedImage {
            url: member.avatar_url.clone(),
        }),
        color: Some(EMBED_COLOR),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::registration::classifier::ConflictReport;
    use crate::domains::registration::models::RegistrationRecord;
    use crate::kernel::{GrantAccessError, LookupError};

    fn member() -> GuildMember {
        GuildMember {
            id: "111".into(),
            username: "ana".into(),
            avatar_url: "https://cdn.discordapp.com/embed/avatars/0.png".into(),
            role_ids: vec![],
        }
    }

    fn report() -> ConflictReport {
        let submitted = RegistrationRecord::new("111", "20200001", "ana@gmail.com", "Ana", 2020);
        let existing = RegistrationRecord::new("222", "20200001", "bob@gmail.com", "Bob", 2020);
        ConflictReport::new(&submitted, existing)
    }

    #[test]
    fn every_outcome_maps_to_one_signal() {
        let cases = vec![
            (WorkflowOutcome::Proceeded, Signal::Success),
            (WorkflowOutcome::WelcomedBack, Signal::Success),
            (WorkflowOutcome::AlreadyVerified, Signal::AlreadyDone),
            (
                WorkflowOutcome::ReportedConflicts {
                    conflicts: vec![report()],
                    access_granted: false,
                },
                Signal::Suspicious,
            ),
            (
                WorkflowOutcome::MemberFetchFailed {
                    discord_id: "111".into(),
                    error: MemberFetchError::NotFound("Unknown Member".into()),
                },
                Signal::HardError,
            ),
            (
                WorkflowOutcome::PermissionFailed {
                    member_id: "111".into(),
                    error: GrantAccessError::Permission("Missing Permissions".into()),
                    dm_delivered: false,
                },
                Signal::HardError,
            ),
            (
                WorkflowOutcome::PersistenceFailed {
                    discord_id: "111".into(),
                    reason: "connection reset".into(),
                },
                Signal::SoftError,
            ),
            (
                WorkflowOutcome::LookupFailed {
                    error: LookupError::Transport("timeout".into()),
                },
                Signal::HardError,
            ),
        ];

        for (outcome, signal) in cases {
            assert_eq!(acknowledgment_for(&outcome).signal, signal, "{:?}", outcome);
        }
    }

    #[test]
    fn returning_member_gets_a_wave() {
        let back = acknowledgment_for(&WorkflowOutcome::WelcomedBack);
        assert_eq!(back.extra_reactions, vec!["👋"]);
        assert!(!back.needs_reply());

        assert!(acknowledgment_for(&WorkflowOutcome::Proceeded)
            .extra_reactions
            .is_empty());
    }

    #[test]
    fn report_dates_are_lima_time() {
        let at = chrono::TimeZone::with_ymd_and_hms(&Utc, 2024, 3, 5, 14, 15, 0).unwrap();
        assert_eq!(lima_date(at), "5/3/2024, 09:15:00");

        let mut with_date = report();
        with_date.existing.created_at = Some(at);
        let description = conflict_embed(&with_date).description.unwrap();
        assert!(description.contains(&format!("<t:{}:R>", at.timestamp())));
        assert!(description.contains("_(5/3/2024, 09:15:00)_"));
    }

    #[test]
    fn success_needs_no_reply() {
        assert!(!acknowledgment_for(&WorkflowOutcome::Proceeded).needs_reply());
        assert!(!acknowledgment_for(&WorkflowOutcome::AlreadyVerified).needs_reply());
    }

    #[test]
    fn conflict_report_has_one_embed_per_record() {
        let ack = acknowledgment_for(&WorkflowOutcome::ReportedConflicts {
            conflicts: vec![report(), report()],
            access_granted: false,
        });

        assert_eq!(ack.embeds.len(), 2);
        assert!(ack.message.unwrap().contains("Found 2 registrations"));
    }

    #[test]
    fn race_conflict_warns_about_granted_access() {
        let ack = acknowledgment_for(&WorkflowOutcome::ReportedConflicts {
            conflicts: vec![report()],
            access_granted: true,
        });

        assert!(ack.message.unwrap().contains("Access was granted"));
    }

    #[test]
    fn permission_failure_mentions_dm_result() {
        let ack = acknowledgment_for(&WorkflowOutcome::PermissionFailed {
            member_id: "111".into(),
            error: GrantAccessError::Permission("Missing Permissions".into()),
            dm_delivered: true,
        });

        assert!(ack.message.unwrap().contains("DM feedback sent to `111`"));
    }

    #[test]
    fn conflict_embed_flags_matching_fields() {
        let embed = conflict_embed(&report());
        let description = embed.description.unwrap();

        assert!(description.contains("`20200001 🚩`"));
        assert!(description.contains("`bob@gmail.com`"));
        assert!(description.contains("`222`"));
        assert_eq!(
            embed.footer.unwrap().text,
            "⚠️ Student code already registered, possible impersonation ⚠️"
        );
    }

    #[test]
    fn welcome_wording_differs_for_returning_members() {
        let fresh = welcome_embed(&member(), RegistrationPath::Fresh);
        let back = welcome_embed(&member(), RegistrationPath::Returning);

        assert_ne!(fresh.description, back.description);
        assert_eq!(fresh.color, Some(EMBED_COLOR));
        assert_eq!(
            fresh.author.unwrap().icon_url.as_deref(),
            Some(FRESH_WELCOME_ICON)
        );
        let author = back.author.unwrap();
        assert_eq!(author.name, "ana... is... back...");
        assert_eq!(author.icon_url.as_deref(), Some(RETURNING_WELCOME_ICON));
    }
}
