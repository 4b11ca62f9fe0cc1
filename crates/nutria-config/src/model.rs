// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Nutria assistant.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Nutria configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NutriaConfig {
    /// Assistant identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// WhatsApp Cloud API transport.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// OpenAI-compatible inference backend.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Conversation and pending-action settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Scheduled reminder settings.
    #[serde(default)]
    pub reminders: ReminderConfig,
}

/// Assistant identity and behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the assistant.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Inline system prompt string. Overridden by `system_prompt_file` if both set.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Path to a markdown file containing the system prompt.
    #[serde(default)]
    pub system_prompt_file: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            system_prompt: None,
            system_prompt_file: None,
        }
    }
}

fn default_agent_name() -> String {
    "Nutri.ia".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// WhatsApp Cloud API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsAppConfig {
    /// Graph API access token. `None` disables the transport.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Business phone number id messages are sent from.
    #[serde(default)]
    pub phone_number_id: Option<String>,

    /// Token echoed back during webhook verification.
    #[serde(default)]
    pub verify_token: Option<String>,

    /// App secret used to check `X-Hub-Signature-256`. Unchecked when unset.
    #[serde(default)]
    pub app_secret: Option<String>,

    /// Address the webhook server binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port the webhook server listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Graph API base URL, including the version segment.
    #[serde(default = "default_graph_url")]
    pub api_base_url: String,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            phone_number_id: None,
            verify_token: None,
            app_secret: None,
            bind_address: default_bind_address(),
            port: default_port(),
            api_base_url: default_graph_url(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_graph_url() -> String {
    "https://graph.facebook.com/v21.0".to_string()
}

/// OpenAI-compatible inference configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiConfig {
    /// API key. Falls back to the `OPENAI_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// API base URL.
    #[serde(default = "default_openai_url")]
    pub base_url: String,

    /// Model used for conversation.
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Model used for food photo analysis.
    #[serde(default = "default_chat_model")]
    pub vision_model: String,

    /// Model used for audio transcription.
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,

    /// Maximum tokens for chat replies.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Maximum tokens for image analysis.
    #[serde(default = "default_vision_max_tokens")]
    pub vision_max_tokens: u32,

    /// Sampling temperature for chat replies.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// ISO-639-1 language hint for transcription.
    #[serde(default = "default_language")]
    pub language: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_url(),
            chat_model: default_chat_model(),
            vision_model: default_chat_model(),
            transcription_model: default_transcription_model(),
            max_tokens: default_max_tokens(),
            vision_max_tokens: default_vision_max_tokens(),
            temperature: default_temperature(),
            language: default_language(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_openai_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o".to_string()
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_vision_max_tokens() -> u32 {
    500
}

fn default_temperature() -> f32 {
    0.8
}

fn default_language() -> String {
    "pt".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("nutria").join("nutria.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("nutria.db"))
        .display()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Conversation context and pending-action configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Number of recent turns sent to the model.
    #[serde(default = "default_context_turns")]
    pub context_turns: usize,

    /// Number of turns retained per user.
    #[serde(default = "default_history_retention")]
    pub history_retention: usize,

    /// Seconds before an unanswered meal confirmation is dropped.
    #[serde(default = "default_pending_ttl_secs")]
    pub pending_ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            context_turns: default_context_turns(),
            history_retention: default_history_retention(),
            pending_ttl_secs: default_pending_ttl_secs(),
        }
    }
}

fn default_context_turns() -> usize {
    15
}

fn default_history_retention() -> usize {
    50
}

fn default_pending_ttl_secs() -> u64 {
    300
}

/// Reminder dispatcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReminderConfig {
    /// Master switch for all scheduled reminders.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cron expression for the custom-reminder check tick.
    #[serde(default = "default_check_schedule")]
    pub check_schedule: String,

    /// Send the four fixed daily broadcasts (08:00, 12:00, 16:00, 19:00).
    #[serde(default = "default_true")]
    pub default_broadcasts: bool,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_schedule: default_check_schedule(),
            default_broadcasts: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_check_schedule() -> String {
    "*/15 * * * *".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = NutriaConfig::default();
        assert_eq!(config.session.context_turns, 15);
        assert_eq!(config.session.history_retention, 50);
        assert_eq!(config.session.pending_ttl_secs, 300);
        assert_eq!(config.reminders.check_schedule, "*/15 * * * *");
        assert_eq!(config.openai.transcription_model, "whisper-1");
        assert!(config.storage.database_path.ends_with("nutria.db"));
    }

    #[test]
    fn unknown_session_key_is_rejected() {
        let result: Result<SessionConfig, _> = toml::from_str("context_turn = 3");
        assert!(result.is_err());
    }
}
