// TestDependencies - mock implementations for testing
//
// In-memory collaborators that record every call in one shared log, so
// tests can assert both what happened and in which order.

use async_trait::async_trait;
use discord::models::Embed;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use super::{
    BaseMemberDirectory, BaseMessenger, BaseRecordStore, DeliveryError, GrantAccessError,
    InsertError, LookupError, MemberFetchError, ServerDeps,
};
use crate::common::{GuildMember, Signal, SourceMessage};
use crate::domains::registration::models::RegistrationRecord;

/// Ordered log of collaborator calls shared by all mocks
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    fn push(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }

    /// All recorded call names, oldest first
    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|c| *c == name).count()
    }

    /// Position of the first call with this name
    pub fn position(&self, name: &str) -> Option<usize> {
        self.0.lock().unwrap().iter().position(|c| c == name)
    }
}

// =============================================================================
// Mock Member Directory
// =============================================================================

pub struct MockMemberDirectory {
    log: CallLog,
    members: Mutex<HashMap<String, GuildMember>>,
    fetch_errors: Mutex<VecDeque<MemberFetchError>>,
    grant_errors: Mutex<VecDeque<GrantAccessError>>,
}

impl MockMemberDirectory {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            members: Mutex::new(HashMap::new()),
            fetch_errors: Mutex::new(VecDeque::new()),
            grant_errors: Mutex::new(VecDeque::new()),
        }
    }

    pub fn add_member(&self, member: GuildMember) {
        self.members
            .lock()
            .unwrap()
            .insert(member.id.clone(), member);
    }

    pub fn fail_next_fetch(&self, error: MemberFetchError) {
        self.fetch_errors.lock().unwrap().push_back(error);
    }

    pub fn fail_next_grant(&self, error: GrantAccessError) {
        self.grant_errors.lock().unwrap().push_back(error);
    }

    /// Current state of a member, including granted roles
    pub fn member(&self, id: &str) -> Option<GuildMember> {
        self.members.lock().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl BaseMemberDirectory for MockMemberDirectory {
    async fn fetch_member(&self, discord_id: &str) -> Result<GuildMember, MemberFetchError> {
        self.log.push("fetch_member");

        if let Some(error) = self.fetch_errors.lock().unwrap().pop_front() {
            return Err(error);
        }

        self.members
            .lock()
            .unwrap()
            .get(discord_id)
            .cloned()
            .ok_or_else(|| MemberFetchError::NotFound(format!("Unknown Member {}", discord_id)))
    }

    async fn grant_access(
        &self,
        member: &GuildMember,
        role_id: &str,
    ) -> Result<(), GrantAccessError> {
        self.log.push("grant_access");

        if let Some(error) = self.grant_errors.lock().unwrap().pop_front() {
            return Err(error);
        }

        let mut members = self.members.lock().unwrap();
        let stored = members
            .get_mut(&member.id)
            .ok_or_else(|| GrantAccessError::NotFound(format!("Unknown Member {}", member.id)))?;
        if !stored.has_role(role_id) {
            stored.role_ids.push(role_id.to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Mock Record Store
// =============================================================================

pub struct MockRecordStore {
    log: CallLog,
    records: Mutex<Vec<RegistrationRecord>>,
    /// Rows another writer commits just before our next insert
    concurrent_inserts: Mutex<VecDeque<RegistrationRecord>>,
    insert_errors: Mutex<VecDeque<InsertError>>,
    lookup_errors: Mutex<VecDeque<LookupError>>,
}

impl MockRecordStore {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            records: Mutex::new(Vec::new()),
            concurrent_inserts: Mutex::new(VecDeque::new()),
            insert_errors: Mutex::new(VecDeque::new()),
            lookup_errors: Mutex::new(VecDeque::new()),
        }
    }

    pub fn seed(&self, record: RegistrationRecord) {
        let mut record = record;
        if record.created_at.is_none() {
            record.created_at = Some(chrono::Utc::now());
        }
        self.records.lock().unwrap().push(record);
    }

    /// Simulate a racing writer that commits `record` right before our next insert
    pub fn insert_concurrently(&self, record: RegistrationRecord) {
        self.concurrent_inserts.lock().unwrap().push_back(record);
    }

    pub fn fail_next_insert(&self, error: InsertError) {
        self.insert_errors.lock().unwrap().push_back(error);
    }

    pub fn fail_next_lookup(&self, error: LookupError) {
        self.lookup_errors.lock().unwrap().push_back(error);
    }

    pub fn records(&self) -> Vec<RegistrationRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseRecordStore for MockRecordStore {
    async fn find_candidates(
        &self,
        gmail: &str,
        discord_id: &str,
        student_code: &str,
    ) -> Result<Vec<RegistrationRecord>, LookupError> {
        self.log.push("find_candidates");

        if let Some(error) = self.lookup_errors.lock().unwrap().pop_front() {
            return Err(error);
        }

        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| {
                r.gmail == gmail || r.discord_id == discord_id || r.student_code == student_code
            })
            .cloned()
            .collect())
    }

    async fn insert(&self, record: &RegistrationRecord) -> Result<RegistrationRecord, InsertError> {
        self.log.push("insert");

        let racing: Vec<_> = self.concurrent_inserts.lock().unwrap().drain(..).collect();
        for record in racing {
            self.seed(record);
        }

        if let Some(error) = self.insert_errors.lock().unwrap().pop_front() {
            return Err(error);
        }

        let mut records = self.records.lock().unwrap();
        if records.iter().any(|r| r.same_identity(record)) {
            return Err(InsertError::DuplicateKey(
                "registrations_identity_key".to_string(),
            ));
        }

        let mut created = record.clone();
        created.created_at = Some(chrono::Utc::now());
        records.push(created.clone());
        Ok(created)
    }
}

// =============================================================================
// Mock Messenger
// =============================================================================

#[derive(Debug, Clone)]
pub struct SentReply {
    pub source: SourceMessage,
    pub text: Option<String>,
    pub embeds: Vec<Embed>,
}

pub struct MockMessenger {
    log: CallLog,
    channel_embeds: Mutex<Vec<(String, Embed)>>,
    direct_messages: Mutex<Vec<(String, String)>>,
    acknowledgments: Mutex<Vec<(SourceMessage, Signal)>>,
    reactions: Mutex<Vec<(SourceMessage, String)>>,
    replies: Mutex<Vec<SentReply>>,
    fail_channel: Mutex<bool>,
    fail_direct: Mutex<bool>,
}

impl MockMessenger {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            channel_embeds: Mutex::new(Vec::new()),
            direct_messages: Mutex::new(Vec::new()),
            acknowledgments: Mutex::new(Vec::new()),
            reactions: Mutex::new(Vec::new()),
            replies: Mutex::new(Vec::new()),
            fail_channel: Mutex::new(false),
            fail_direct: Mutex::new(false),
        }
    }

    /// Make every channel post fail
    pub fn fail_channel_posts(&self) {
        *self.fail_channel.lock().unwrap() = true;
    }

    /// Make every direct message fail (user has DMs closed)
    pub fn fail_direct_messages(&self) {
        *self.fail_direct.lock().unwrap() = true;
    }

    pub fn channel_embeds(&self) -> Vec<(String, Embed)> {
        self.channel_embeds.lock().unwrap().clone()
    }

    pub fn direct_messages(&self) -> Vec<(String, String)> {
        self.direct_messages.lock().unwrap().clone()
    }

    pub fn acknowledgments(&self) -> Vec<(SourceMessage, Signal)> {
        self.acknowledgments.lock().unwrap().clone()
    }

    /// Reactions beyond the acknowledgment signal
    pub fn reactions(&self) -> Vec<(SourceMessage, String)> {
        self.reactions.lock().unwrap().clone()
    }

    pub fn replies(&self) -> Vec<SentReply> {
        self.replies.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseMessenger for MockMessenger {
    async fn send_channel_embed(
        &self,
        channel_id: &str,
        embed: Embed,
    ) -> Result<(), DeliveryError> {
        self.log.push("send_channel_embed");

        if *self.fail_channel.lock().unwrap() {
            return Err(DeliveryError::ChannelNotFound(channel_id.to_string()));
        }

        self.channel_embeds
            .lock()
            .unwrap()
            .push((channel_id.to_string(), embed));
        Ok(())
    }

    async fn send_direct_message(&self, user_id: &str, text: &str) -> Result<(), DeliveryError> {
        self.log.push("send_direct_message");

        if *self.fail_direct.lock().unwrap() {
            return Err(DeliveryError::Unreachable(user_id.to_string()));
        }

        self.direct_messages
            .lock()
            .unwrap()
            .push((user_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn acknowledge(
        &self,
        source: &SourceMessage,
        signal: Signal,
    ) -> Result<(), DeliveryError> {
        self.log.push("acknowledge");
        self.acknowledgments
            .lock()
            .unwrap()
            .push((source.clone(), signal));
        Ok(())
    }

    async fn react(&self, source: &SourceMessage, emoji: &str) -> Result<(), DeliveryError> {
        self.log.push("react");
        self.reactions
            .lock()
            .unwrap()
            .push((source.clone(), emoji.to_string()));
        Ok(())
    }

    async fn reply(
        &self,
        source: &SourceMessage,
        text: Option<&str>,
        embeds: Vec<Embed>,
    ) -> Result<(), DeliveryError> {
        self.log.push("reply");
        self.replies.lock().unwrap().push(SentReply {
            source: source.clone(),
            text: text.map(str::to_string),
            embeds,
        });
        Ok(())
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

/// Bundle of mocks sharing one call log
pub struct TestDependencies {
    pub log: CallLog,
    pub directory: Arc<MockMemberDirectory>,
    pub store: Arc<MockRecordStore>,
    pub messenger: Arc<MockMessenger>,
}

impl TestDependencies {
    pub fn new() -> Self {
        let log = CallLog::default();
        Self {
            directory: Arc::new(MockMemberDirectory::new(log.clone())),
            store: Arc::new(MockRecordStore::new(log.clone())),
            messenger: Arc::new(MockMessenger::new(log.clone())),
            log,
        }
    }

    pub fn server_deps(&self) -> ServerDeps {
        ServerDeps::new(
            self.directory.clone(),
            self.store.clone(),
            self.messenger.clone(),
        )
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
