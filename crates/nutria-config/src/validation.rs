// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks that serde attributes cannot express.

use croner::Cron;

use crate::diagnostic::ConfigError;
use crate::model::NutriaConfig;

/// Validates a deserialized configuration.
///
/// Collects every failure instead of stopping at the first.
pub fn validate_config(config: &NutriaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::invalid("storage.database_path", "must not be empty"));
    }

    let session = &config.session;
    if session.context_turns == 0 {
        errors.push(ConfigError::invalid("session.context_turns", "must be at least 1"));
    }
    if session.history_retention < session.context_turns {
        errors.push(ConfigError::invalid(
            "session.history_retention",
            format!(
                "must be at least session.context_turns ({}), got {}",
                session.context_turns, session.history_retention
            ),
        ));
    }
    if session.pending_ttl_secs == 0 {
        errors.push(ConfigError::invalid("session.pending_ttl_secs", "must be at least 1"));
    }

    let temperature = config.openai.temperature;
    if !(0.0..=2.0).contains(&temperature) {
        errors.push(ConfigError::invalid(
            "openai.temperature",
            format!("must be between 0 and 2, got {temperature}"),
        ));
    }

    if config.whatsapp.port == 0 {
        errors.push(ConfigError::invalid("whatsapp.port", "must not be 0"));
    }

    let bind = config.whatsapp.bind_address.trim();
    if bind.parse::<std::net::IpAddr>().is_err()
        && (bind.is_empty()
            || !bind
                .chars()
                .all(|c| c.is_alphanumeric() || c == '.' || c == '-'))
    {
        errors.push(ConfigError::invalid(
            "whatsapp.bind_address",
            format!("`{bind}` is not a valid IP address or hostname"),
        ));
    }

    if let Err(e) = Cron::new(&config.reminders.check_schedule).parse() {
        errors.push(ConfigError::invalid(
            "reminders.check_schedule",
            format!("`{}` is not a cron expression: {e}", config.reminders.check_schedule),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
