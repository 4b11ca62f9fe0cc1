// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `nutria config check` command implementation.
//!
//! Validates the configuration, then checks that what it points at is
//! usable: the database opens, the OpenAI key resolves, and the WhatsApp
//! credentials are present.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use nutria_config::model::NutriaConfig;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Runs every check and prints the results. Returns the number of failures.
pub async fn run_check(plain: bool) -> usize {
    let use_color = !plain && std::io::stdout().is_terminal();
    let start = Instant::now();

    let mut results = Vec::new();
    match nutria_config::load_and_validate() {
        Ok(config) => {
            results.push(CheckResult::new(
                "Configuration",
                CheckStatus::Pass,
                "valid",
                start,
            ));
            results.push(check_database(&config.storage.database_path).await);
            results.push(check_openai(&config));
            results.extend(check_whatsapp(&config));
        }
        Err(errors) => {
            nutria_config::render_errors(&errors);
            results.push(CheckResult::new(
                "Configuration",
                CheckStatus::Fail,
                format!("{} error(s)", errors.len()),
                start,
            ));
        }
    }

    print_results(&results, use_color);
    results
        .iter()
        .filter(|r| r.status == CheckStatus::Fail)
        .count()
}

fn print_results(results: &[CheckResult], use_color: bool) {
    use colored::Colorize;

    println!();
    println!("  nutria config check");
    println!("  {}", "-".repeat(50));

    let mut issues = 0;
    for result in results {
        let duration_ms = result.duration.as_millis();
        let (tag, symbol, message) = match result.status {
            CheckStatus::Pass => ("[OK]  ", "✓".green(), result.message.normal()),
            CheckStatus::Warn => ("[WARN]", "!".yellow(), result.message.yellow()),
            CheckStatus::Fail => ("[FAIL]", "✗".red(), result.message.red()),
        };
        if result.status != CheckStatus::Pass {
            issues += 1;
        }
        if use_color {
            println!(
                "    {symbol} {:<20} {message} ({duration_ms}ms)",
                result.name
            );
        } else {
            println!(
                "    {tag} {:<20} {} ({duration_ms}ms)",
                result.name, result.message
            );
        }
    }

    println!();
    if issues > 0 {
        let word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();
}

/// Check the database file exists and answers a query.
async fn check_database(db_path: &str) -> CheckResult {
    let start = Instant::now();

    if !std::path::Path::new(db_path).exists() {
        return CheckResult::new(
            "Database",
            CheckStatus::Warn,
            format!("not found: {db_path} (will be created on first run)"),
            start,
        );
    }

    let conn = match tokio_rusqlite::Connection::open(db_path).await {
        Ok(conn) => conn,
        Err(e) => {
            return CheckResult::new(
                "Database",
                CheckStatus::Fail,
                format!("open failed: {e}"),
                start,
            );
        }
    };
    let query = conn.call(|conn| conn.execute_batch("SELECT 1")).await;
    match query {
        Ok(()) => CheckResult::new("Database", CheckStatus::Pass, "connected", start),
        Err(e) => CheckResult::new(
            "Database",
            CheckStatus::Fail,
            format!("query failed: {e}"),
            start,
        ),
    }
}

/// Check an OpenAI key is available from config or the environment.
fn check_openai(config: &NutriaConfig) -> CheckResult {
    let start = Instant::now();
    let from_config = config.openai.api_key.as_deref().is_some_and(|k| !k.is_empty());
    let from_env = std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty());

    match (from_config, from_env) {
        (true, _) => CheckResult::new("OpenAI", CheckStatus::Pass, "api key set in config", start),
        (false, true) => {
            CheckResult::new("OpenAI", CheckStatus::Pass, "api key from OPENAI_API_KEY", start)
        }
        (false, false) => CheckResult::new(
            "OpenAI",
            CheckStatus::Fail,
            "no api key (set openai.api_key or OPENAI_API_KEY)",
            start,
        ),
    }
}

/// Check the WhatsApp credentials. Missing webhook secrets only warn.
fn check_whatsapp(config: &NutriaConfig) -> Vec<CheckResult> {
    let start = Instant::now();
    let wa = &config.whatsapp;
    let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());

    let mut results = Vec::new();
    let missing: Vec<&str> = [
        ("access_token", &wa.access_token),
        ("phone_number_id", &wa.phone_number_id),
    ]
    .into_iter()
    .filter(|(_, v)| !set(*v))
    .map(|(k, _)| k)
    .collect();
    if missing.is_empty() {
        results.push(CheckResult::new(
            "WhatsApp",
            CheckStatus::Pass,
            format!("webhook on {}:{}", wa.bind_address, wa.port),
            start,
        ));
    } else {
        results.push(CheckResult::new(
            "WhatsApp",
            CheckStatus::Fail,
            format!("missing whatsapp.{}", missing.join(", whatsapp.")),
            start,
        ));
    }

    if !set(&wa.verify_token) {
        results.push(CheckResult::new(
            "Webhook verify",
            CheckStatus::Warn,
            "no verify_token, subscription handshake will be refused",
            start,
        ));
    }
    if !set(&wa.app_secret) {
        results.push(CheckResult::new(
            "Webhook signature",
            CheckStatus::Warn,
            "no app_secret, payload signatures are not verified",
            start,
        ));
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn check_database_missing_warns() {
        let result = check_database("/tmp/nonexistent-nutria-test-xyz.db").await;
        assert_eq!(result.status, CheckStatus::Warn);
        assert!(result.message.contains("not found"));
    }

    #[tokio::test]
    async fn check_database_existing_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("check.db");
        std::fs::write(&path, b"").unwrap();
        let result = check_database(&path.to_string_lossy()).await;
        assert_eq!(result.status, CheckStatus::Pass);
    }

    #[test]
    fn openai_key_in_config_passes() {
        let mut config = NutriaConfig::default();
        config.openai.api_key = Some("sk-test".into());
        assert_eq!(check_openai(&config).status, CheckStatus::Pass);
    }

    #[test]
    fn whatsapp_defaults_fail_and_warn() {
        let results = check_whatsapp(&NutriaConfig::default());
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].status, CheckStatus::Fail);
        assert!(results[0].message.contains("whatsapp.access_token"));
        assert!(results[0].message.contains("whatsapp.phone_number_id"));
        assert!(results[1..].iter().all(|r| r.status == CheckStatus::Warn));
    }

    #[test]
    fn complete_whatsapp_config_passes() {
        let mut config = NutriaConfig::default();
        config.whatsapp.access_token = Some("EAAG".into());
        config.whatsapp.phone_number_id = Some("1234".into());
        config.whatsapp.verify_token = Some("verify".into());
        config.whatsapp.app_secret = Some("secret".into());
        let results = check_whatsapp(&config);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, CheckStatus::Pass);
    }
}
