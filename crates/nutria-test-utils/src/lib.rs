// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Nutria integration tests.
//!
//! Provides mock collaborators and test harness infrastructure for fast,
//! deterministic tests without WhatsApp, OpenAI or wall-clock time.
//!
//! # Components
//!
//! - [`MockChannel`] - Mock transport with message injection, capture and media
//! - [`MockInference`] - Mock model with queued chat, vision and transcription replies
//! - [`FaultyStorage`] - SQLite storage with per-store failure injection
//! - [`ManualClock`] - Clock that only moves when told to
//! - [`TestHarness`] - The wired assistant over a temp database

pub mod clock;
pub mod harness;
pub mod mock_channel;
pub mod mock_inference;
pub mod mock_storage;

pub use clock::ManualClock;
pub use harness::TestHarness;
pub use mock_channel::MockChannel;
pub use mock_inference::MockInference;
pub use mock_storage::{FaultyStorage, StoreFault};
