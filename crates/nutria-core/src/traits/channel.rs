// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for chat transports.

use async_trait::async_trait;

use crate::error::NutriaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChannelCapabilities, InboundMessage, MediaRef, MessageId, OutboundMessage};

/// Adapter for a bidirectional chat transport.
///
/// Inbound messages are pulled with [`receive`](Self::receive); the agent
/// loop calls it repeatedly until shutdown. Outbound delivery is shared with
/// the reminder dispatcher, so `send` takes `&self`.
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// Returns the capabilities supported by this channel.
    fn capabilities(&self) -> ChannelCapabilities;

    /// Establishes a connection to the messaging platform.
    async fn connect(&mut self) -> Result<(), NutriaError>;

    /// Sends a text message.
    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, NutriaError>;

    /// Receives the next inbound message from the channel.
    async fn receive(&self) -> Result<InboundMessage, NutriaError>;

    /// Downloads the bytes behind a media reference.
    async fn fetch_media(&self, media: &MediaRef) -> Result<Vec<u8>, NutriaError>;
}
