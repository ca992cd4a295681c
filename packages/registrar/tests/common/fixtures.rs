//! Test fixtures for registration records and guild members.

use registrar_core::common::GuildMember;
use registrar_core::domains::registration::RegistrationRecord;
use registrar_core::RegistrationConfig;

pub const VERIFIED_ROLE: &str = "role-verified";
pub const WELCOME_CHANNEL: &str = "chan-welcome";

pub fn test_config() -> RegistrationConfig {
    RegistrationConfig {
        verified_role_id: VERIFIED_ROLE.to_string(),
        welcome_channel_id: WELCOME_CHANNEL.to_string(),
    }
}

/// The submission most tests send
pub fn submitted_record() -> RegistrationRecord {
    RegistrationRecord::new("111", "20200001", "ana@gmail.com", "Ana Torres", 2020)
}

/// Existing record sharing exactly the requested fields with `submitted_record()`
pub fn existing_record(gmail: bool, discord_id: bool, student_code: bool) -> RegistrationRecord {
    RegistrationRecord::new(
        if discord_id { "111" } else { "222" },
        if student_code { "20200001" } else { "20209999" },
        if gmail { "ana@gmail.com" } else { "bob@gmail.com" },
        "Registered Earlier",
        2019,
    )
}

/// Guild member for the submitted discord id
pub fn guild_member(verified: bool) -> GuildMember {
    GuildMember {
        id: "111".to_string(),
        username: "ana".to_string(),
        avatar_url: "https://cdn.discordapp.com/embed/avatars/0.png".to_string(),
        role_ids: if verified {
            vec![VERIFIED_ROLE.to_string()]
        } else {
            vec!["role-everyone".to_string()]
        },
    }
}
