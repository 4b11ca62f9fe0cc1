// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod channel;
pub mod clock;
pub mod inference;
pub mod storage;

pub use adapter::PluginAdapter;
pub use channel::ChannelAdapter;
pub use clock::{Clock, SystemClock};
pub use inference::InferenceAdapter;
pub use storage::{HistoryStore, MealStore, ProfileStore, ReminderStore, StorageAdapter};
