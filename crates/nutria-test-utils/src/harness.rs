// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the full assistant with a mock channel, mock
//! inference, a manual clock and a temp SQLite database. `send()` drives one
//! inbound message through the agent loop and returns the replies.

use std::sync::Arc;

use nutria_agent::{AgentLoop, ReminderDispatcher, SessionManager};
use nutria_config::model::{NutriaConfig, ReminderConfig, SessionConfig, StorageConfig};
use nutria_core::{Clock, InboundMessage, NutriaError, StorageAdapter};
use nutria_storage::SqliteStorage;

use crate::clock::ManualClock;
use crate::mock_channel::{MockChannel, text_message};
use crate::mock_inference::MockInference;
use crate::mock_storage::FaultyStorage;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    chat_replies: Vec<String>,
    system_prompt: String,
    session: SessionConfig,
    reminders: ReminderConfig,
    clock: Option<ManualClock>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            chat_replies: Vec::new(),
            system_prompt: "Você é uma nutricionista de teste.".to_string(),
            session: SessionConfig::default(),
            reminders: ReminderConfig::default(),
            clock: None,
        }
    }

    /// Set mock chat replies.
    pub fn with_chat_replies(mut self, replies: Vec<String>) -> Self {
        self.chat_replies = replies;
        self
    }

    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    pub fn with_reminders(mut self, reminders: ReminderConfig) -> Self {
        self.reminders = reminders;
        self
    }

    /// Start the manual clock at a fixed time. Defaults to 2026-03-10 12:30.
    pub fn with_clock(mut self, clock: ManualClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, NutriaError> {
        let temp_dir = tempfile::TempDir::new().map_err(NutriaError::storage)?;
        let db_path = temp_dir.path().join("nutria-test.db");

        let storage_config = StorageConfig {
            database_path: db_path.to_string_lossy().into_owned(),
            wal_mode: true,
        };
        let faults = Arc::new(FaultyStorage::new(SqliteStorage::new(
            storage_config.clone(),
        )));
        faults.initialize().await?;
        let storage: Arc<dyn StorageAdapter + Send + Sync> = faults.clone();

        let clock = Arc::new(
            self.clock
                .unwrap_or_else(|| ManualClock::at(2026, 3, 10, 12, 30)),
        );
        let channel = Arc::new(MockChannel::new());
        let inference = Arc::new(MockInference::with_chat_replies(self.chat_replies));

        let sessions = Arc::new(SessionManager::new(
            storage.clone(),
            inference.clone(),
            clock.clone() as Arc<dyn Clock>,
            self.session.clone(),
            self.system_prompt,
        ));
        let reminders = Arc::new(
            ReminderDispatcher::new(
                storage.clone(),
                channel.clone(),
                clock.clone() as Arc<dyn Clock>,
                self.reminders.clone(),
            )
            .with_pending_sweep(sessions.pending()),
        );
        let agent = AgentLoop::new(
            channel.clone(),
            storage.clone(),
            sessions.clone(),
            reminders.clone(),
        );

        let config = NutriaConfig {
            storage: storage_config,
            session: self.session,
            reminders: self.reminders,
            ..NutriaConfig::default()
        };

        Ok(TestHarness {
            channel,
            inference,
            clock,
            storage,
            faults,
            sessions,
            reminders,
            agent,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    pub channel: Arc<MockChannel>,
    pub inference: Arc<MockInference>,
    pub clock: Arc<ManualClock>,
    /// SQLite storage adapter (temp DB, cleaned up on drop).
    pub storage: Arc<dyn StorageAdapter + Send + Sync>,
    /// The same storage, for injecting store failures.
    pub faults: Arc<FaultyStorage>,
    pub sessions: Arc<SessionManager>,
    pub reminders: Arc<ReminderDispatcher>,
    pub agent: AgentLoop,
    pub config: NutriaConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Drives one inbound message through the agent loop and returns every
    /// text sent back to its sender while handling it.
    pub async fn send(&self, inbound: InboundMessage) -> Vec<String> {
        let sender = inbound.sender.clone();
        let before = self.channel.sent_count().await;
        self.agent.handle_inbound(inbound).await;
        self.channel
            .sent_messages()
            .await
            .into_iter()
            .skip(before)
            .filter(|m| m.recipient == sender)
            .map(|m| m.text)
            .collect()
    }

    /// Sends a text message and returns the last reply, if any.
    pub async fn send_text(&self, address: &str, text: &str) -> Option<String> {
        self.send(text_message(address, text)).await.pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nutria_core::Role;

    #[tokio::test]
    async fn builder_creates_working_environment() {
        let harness = TestHarness::builder().build().await.unwrap();
        let profile = harness.storage.get_profile("5511").await.unwrap();
        assert!(profile.is_none());
    }

    #[tokio::test]
    async fn send_text_returns_mock_reply() {
        let harness = TestHarness::builder()
            .with_chat_replies(vec!["Olá! Como posso ajudar?".into()])
            .build()
            .await
            .unwrap();

        let reply = harness.send_text("5511", "oi").await;
        assert_eq!(reply.as_deref(), Some("Olá! Como posso ajudar?"));
    }

    #[tokio::test]
    async fn send_text_persists_both_turns() {
        let harness = TestHarness::builder()
            .with_chat_replies(vec!["resposta".into()])
            .build()
            .await
            .unwrap();

        harness.send_text("5511", "pergunta").await;

        let profile = harness.storage.get_profile("5511").await.unwrap().unwrap();
        let turns = harness.storage.recent_turns(&profile.id, 10).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, "pergunta");
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].content, "resposta");
    }

    #[tokio::test]
    async fn injected_fault_reaches_the_shared_storage() {
        let harness = TestHarness::builder().build().await.unwrap();
        harness.faults.fail(crate::StoreFault::Profiles);
        assert!(harness.storage.get_profile("5511").await.is_err());
        harness.faults.heal(crate::StoreFault::Profiles);
        assert!(harness.storage.get_profile("5511").await.is_ok());
    }

    #[tokio::test]
    async fn temp_db_is_unique_per_harness() {
        let h1 = TestHarness::builder().build().await.unwrap();
        let h2 = TestHarness::builder().build().await.unwrap();

        h1.send_text("5511", "oi").await;
        assert!(h1.storage.get_profile("5511").await.unwrap().is_some());
        assert!(h2.storage.get_profile("5511").await.unwrap().is_none());
    }
}
