// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation and reminder orchestration for the Nutria assistant.
//!
//! The [`AgentLoop`] is the central coordinator that:
//! - Receives messages from a channel adapter
//! - Resolves pending meal confirmations before anything else
//! - Routes images, audio, commands and text to the [`SessionManager`]
//! - Sends each reply back through the channel
//!
//! The [`ReminderDispatcher`] runs alongside it on its own schedule.

pub mod analysis;
pub mod commands;
pub mod context;
pub mod extraction;
pub mod pending;
pub mod reminder;
pub mod schedule;
pub mod session;
pub mod shutdown;

use std::sync::Arc;

use nutria_core::{
    ChannelAdapter, InboundMessage, MessageContent, NutriaError, OutboundMessage, StorageAdapter,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::commands::{Command, REMINDER_FAILED, REMINDER_USAGE, parse_command};

pub use crate::reminder::{FireReport, ReminderDispatcher};
pub use crate::session::SessionManager;

pub const IMAGE_PROGRESS: &str = "Analisando sua imagem... 🔍";
pub const AUDIO_PROGRESS: &str = "Ouvindo seu áudio... 🎧";
pub const MEDIA_APOLOGY: &str =
    "Desculpe, tive dificuldade em processar essa mídia. Pode tentar enviar novamente?";
pub const UNSUPPORTED_MEDIA: &str =
    "Por favor, envie imagens ou áudios para que eu possa te ajudar! 📸🎤";

/// Routes inbound messages to the session manager and sends the replies.
pub struct AgentLoop {
    channel: Arc<dyn ChannelAdapter + Send + Sync>,
    storage: Arc<dyn StorageAdapter + Send + Sync>,
    sessions: Arc<SessionManager>,
    reminders: Arc<ReminderDispatcher>,
}

impl AgentLoop {
    pub fn new(
        channel: Arc<dyn ChannelAdapter + Send + Sync>,
        storage: Arc<dyn StorageAdapter + Send + Sync>,
        sessions: Arc<SessionManager>,
        reminders: Arc<ReminderDispatcher>,
    ) -> Self {
        info!("agent loop initialized");
        Self {
            channel,
            storage,
            sessions,
            reminders,
        }
    }

    /// Runs until the cancellation token is triggered or the channel closes.
    ///
    /// Messages are handled one at a time. On exit the reminder jobs are
    /// cancelled and storage is closed.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), NutriaError> {
        info!("agent loop running");

        loop {
            tokio::select! {
                msg = self.channel.receive() => {
                    match msg {
                        Ok(inbound) => self.handle_inbound(inbound).await,
                        Err(e) => {
                            error!(error = %e, "channel receive error, stopping agent loop");
                            break;
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping agent loop");
                    break;
                }
            }
        }

        self.reminders.shutdown();
        self.storage.close().await?;

        info!("agent loop stopped");
        Ok(())
    }

    /// Handles one inbound message end to end, including sending replies.
    pub async fn handle_inbound(&self, inbound: InboundMessage) {
        let address = inbound.sender.as_str();
        debug!(address, id = inbound.id.as_str(), "handling inbound message");

        if let Some(text) = inbound.content.text()
            && let Some(reply) = self.sessions.check_pending(address, text).await
        {
            self.reply(address, reply).await;
            return;
        }

        let reply = match &inbound.content {
            MessageContent::Text(text) => {
                if text.trim().is_empty() {
                    debug!(address, "ignoring empty text message");
                    return;
                }
                match parse_command(text) {
                    Some(command) => self.run_command(address, command).await,
                    None => self.sessions.handle_text(address, text).await,
                }
            }
            MessageContent::Image { media, caption } => {
                self.reply(address, IMAGE_PROGRESS.to_string()).await;
                match self.channel.fetch_media(media).await {
                    Ok(bytes) => {
                        self.sessions
                            .handle_image(address, &bytes, &media.mime_type, caption.as_deref())
                            .await
                    }
                    Err(e) => {
                        error!(address, error = %e, "failed to download image");
                        MEDIA_APOLOGY.to_string()
                    }
                }
            }
            MessageContent::Audio { media } => {
                self.reply(address, AUDIO_PROGRESS.to_string()).await;
                match self.channel.fetch_media(media).await {
                    Ok(bytes) => {
                        self.sessions
                            .handle_audio(address, &bytes, &media.mime_type)
                            .await
                    }
                    Err(e) => {
                        error!(address, error = %e, "failed to download audio");
                        MEDIA_APOLOGY.to_string()
                    }
                }
            }
            MessageContent::Unsupported { kind } => {
                debug!(address, kind = kind.as_str(), "unsupported message type");
                UNSUPPORTED_MEDIA.to_string()
            }
        };

        self.reply(address, reply).await;
    }

    async fn run_command(&self, address: &str, command: Command) -> String {
        match command {
            Command::Summary => self.sessions.summary(address).await,
            Command::ReminderUsage => REMINDER_USAGE.to_string(),
            Command::SetReminder { slot, time } => {
                let profile = match self.storage.get_or_create_profile(address).await {
                    Ok(p) => p,
                    Err(e) => {
                        error!(address, error = %e, "failed to load profile for reminder");
                        return REMINDER_FAILED.to_string();
                    }
                };
                let time_str = time.format("%H:%M").to_string();
                if self
                    .reminders
                    .schedule_custom(&profile.id, address, slot, &time_str)
                    .await
                {
                    commands::reminder_confirmation(slot, time)
                } else {
                    REMINDER_FAILED.to_string()
                }
            }
        }
    }

    async fn reply(&self, address: &str, text: String) {
        if let Err(e) = self.channel.send(OutboundMessage::new(address, text)).await {
            error!(address, error = %e, "failed to send reply");
        }
    }
}
