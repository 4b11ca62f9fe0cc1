// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `nutria serve` command implementation.
//!
//! Wires SQLite storage, the OpenAI inference client and the WhatsApp
//! channel into the session manager, reminder dispatcher and agent loop,
//! then runs until SIGTERM or Ctrl+C.

use std::sync::Arc;

use nutria_agent::{AgentLoop, ReminderDispatcher, SessionManager, context, shutdown};
use nutria_config::model::NutriaConfig;
use nutria_core::{
    ChannelAdapter, Clock, HealthStatus, InferenceAdapter, NutriaError, PluginAdapter,
    StorageAdapter, SystemClock,
};
use nutria_openai::OpenAiInference;
use nutria_storage::SqliteStorage;
use nutria_whatsapp::WhatsAppChannel;
use tracing::{info, warn};

/// Runs the `nutria serve` command.
pub async fn run_serve(config: NutriaConfig) -> Result<(), NutriaError> {
    init_tracing(&config.agent.log_level);

    info!(name = config.agent.name.as_str(), "starting nutria serve");

    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    let storage: Arc<dyn StorageAdapter + Send + Sync> = Arc::new(storage);
    report_health(storage.as_ref()).await;

    let inference: Arc<dyn InferenceAdapter + Send + Sync> =
        Arc::new(OpenAiInference::new(&config.openai)?);

    let mut whatsapp = WhatsAppChannel::new(config.whatsapp.clone())?;
    whatsapp.connect().await?;
    let channel: Arc<dyn ChannelAdapter + Send + Sync> = Arc::new(whatsapp);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let system_prompt = context::load_system_prompt(&config.agent).await;

    let sessions = Arc::new(SessionManager::new(
        storage.clone(),
        inference,
        clock.clone(),
        config.session.clone(),
        system_prompt,
    ));
    let reminders = Arc::new(
        ReminderDispatcher::new(
            storage.clone(),
            channel.clone(),
            clock,
            config.reminders.clone(),
        )
        .with_pending_sweep(sessions.pending()),
    );
    reminders.initialize()?;

    let cancel = shutdown::install_signal_handler();
    let agent_loop = AgentLoop::new(channel.clone(), storage, sessions, reminders);
    agent_loop.run(cancel).await?;

    if let Err(e) = channel.shutdown().await {
        warn!(error = %e, "channel shutdown failed");
    }

    info!("nutria serve shutdown complete");
    Ok(())
}

async fn report_health<A: PluginAdapter + ?Sized>(adapter: &A) {
    match adapter.health_check().await {
        Ok(HealthStatus::Healthy) => info!(adapter = adapter.name(), "adapter healthy"),
        Ok(HealthStatus::Degraded(reason)) | Ok(HealthStatus::Unhealthy(reason)) => {
            warn!(adapter = adapter.name(), reason = reason.as_str(), "adapter not healthy")
        }
        Err(e) => warn!(adapter = adapter.name(), error = %e, "health check failed"),
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("nutria={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
