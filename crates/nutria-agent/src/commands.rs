// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text commands recognized before a message reaches the model.

use chrono::NaiveTime;
use nutria_core::MealSlot;

use crate::schedule::parse_time_of_day;

pub const REMINDER_USAGE: &str = "Para criar um lembrete, envie: lembrete <refeição> <HH:MM>\nExemplo: lembrete almoço 12:30\nRefeições: café da manhã, almoço, lanche, jantar.";

pub const REMINDER_FAILED: &str =
    "Desculpe, não consegui criar seu lembrete. Pode tentar novamente?";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `resumo` or `resumo do dia`.
    Summary,
    /// `lembrete <refeição> <HH:MM>`.
    SetReminder { slot: MealSlot, time: NaiveTime },
    /// A `lembrete` message that did not parse.
    ReminderUsage,
}

/// Recognizes a command, or `None` for ordinary conversation.
pub fn parse_command(text: &str) -> Option<Command> {
    let lower = text
        .trim()
        .trim_end_matches(['!', '?', '.'])
        .to_lowercase();

    if lower == "resumo" || lower == "resumo do dia" {
        return Some(Command::Summary);
    }

    let rest = lower.strip_prefix("lembrete")?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let words: Vec<&str> = rest.split_whitespace().collect();
    let parsed = words.split_last().and_then(|(time, slot_words)| {
        let slot = MealSlot::parse_user_input(&slot_words.join(" "))?;
        let time = parse_time_of_day(time)?;
        Some(Command::SetReminder { slot, time })
    });
    Some(parsed.unwrap_or(Command::ReminderUsage))
}

/// Reply after a reminder was stored and armed.
pub fn reminder_confirmation(slot: MealSlot, time: NaiveTime) -> String {
    format!(
        "Pronto! Vou te lembrar do {} todos os dias às {}. ⏰",
        slot.label().to_lowercase(),
        time.format("%H:%M")
    )
}
