// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user conversation orchestration.
//!
//! Every public operation returns reply text and never an error. Each one
//! runs an inner `Result`-returning function; on `Err` the detail is logged
//! with `error!` and the user receives a fixed Portuguese apology.

use std::fmt::Write;
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, Timelike};
use nutria_config::model::SessionConfig;
use nutria_core::{
    Clock, InferenceAdapter, MealRecord, MealSlot, NewMeal, NutriaError, Role, StorageAdapter,
};
use tracing::{debug, error, info, warn};

use crate::analysis::{extract_calories, extract_food_name};
use crate::context::{self, format_number, total_calories};
use crate::extraction::extract_profile_fields;
use crate::pending::{PendingAction, PendingActions, PendingKind};

pub const TEXT_APOLOGY: &str =
    "Desculpe, tive um problema ao processar sua mensagem. Pode tentar novamente?";
pub const IMAGE_APOLOGY: &str = "Desculpe, tive dificuldade em analisar esta imagem. Pode tentar enviar novamente ou descrever o que comeu?";
pub const AUDIO_APOLOGY: &str =
    "Desculpe, tive um problema ao processar seu áudio. Pode tentar novamente?";
pub const SUMMARY_APOLOGY: &str = "Desculpe, tive um problema ao buscar suas informações.";

const DENY_ACK: &str = "Tudo bem! Não vou registrar. Se precisar de algo, é só chamar!";
const ONBOARDING: &str = "Ainda não tenho informações suas. Vamos começar?";
const NO_MEALS_TODAY: &str =
    "Você ainda não registrou nenhuma refeição hoje. Que tal me enviar uma foto do que comeu?";

const AFFIRMATIVE: &[&str] = &["sim", "quero", "registr"];
const NEGATIVE: &[&str] = &["não", "nao"];

/// How a reply to a pending action reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyIntent {
    Confirm,
    Deny,
    Neither,
}

/// Classifies a reply by substring. Affirmative tokens are tested first,
/// so "não quero" confirms.
pub fn classify_reply(text: &str) -> ReplyIntent {
    let lower = text.trim().to_lowercase();
    if AFFIRMATIVE.iter().any(|t| lower.contains(t)) {
        ReplyIntent::Confirm
    } else if NEGATIVE.iter().any(|t| lower.contains(t)) {
        ReplyIntent::Deny
    } else {
        ReplyIntent::Neither
    }
}

fn follow_up_question(food_name: &str, calories: u32) -> String {
    format!(
        "\n\nGostaria de registrar \"{food_name}\" ({calories} kcal) na sua refeição de hoje? Responda \"sim\" para registrar ou \"não\" se preferir não registrar."
    )
}

fn confirmation(food_name: &str, slot: MealSlot) -> String {
    format!(
        "Perfeito! Registrei \"{food_name}\" no seu {}. Continue assim! 💪",
        slot.label().to_lowercase()
    )
}

/// Renders today's meals grouped by slot, in slot order.
pub fn render_day_summary(meals: &[MealRecord]) -> String {
    let mut out = String::from("Aqui está o resumo das suas refeições de hoje:\n\n");
    for slot in MealSlot::ALL {
        for meal in meals.iter().filter(|m| m.slot == slot) {
            let _ = writeln!(
                out,
                "{}: {} ({} kcal)",
                slot.label(),
                meal.food_name,
                format_number(meal.calories)
            );
        }
    }
    let _ = write!(out, "\nTotal: {:.0} kcal", total_calories(meals));
    out
}

/// Renders a multi-day report, one block per date.
pub fn render_period_report(start: NaiveDate, end: NaiveDate, meals: &[MealRecord]) -> String {
    let mut out = format!(
        "Refeições de {} a {}:\n",
        start.format("%d/%m/%Y"),
        end.format("%d/%m/%Y")
    );
    if meals.is_empty() {
        out.push_str("\nNenhuma refeição registrada no período.");
        return out;
    }

    let mut dates: Vec<NaiveDate> = meals.iter().map(|m| m.date).collect();
    dates.dedup();
    for date in dates {
        let day: Vec<&MealRecord> = meals.iter().filter(|m| m.date == date).collect();
        let _ = writeln!(out, "\n{}:", date.format("%d/%m/%Y"));
        for slot in MealSlot::ALL {
            for meal in day.iter().filter(|m| m.slot == slot) {
                let _ = writeln!(
                    out,
                    "- {} {}: {} ({} kcal)",
                    meal.time.format("%H:%M"),
                    slot.label(),
                    meal.food_name,
                    format_number(meal.calories)
                );
            }
        }
        let subtotal: f64 = day.iter().map(|m| m.calories).sum();
        let _ = writeln!(out, "Subtotal: {subtotal:.0} kcal");
    }
    let _ = write!(out, "\nTotal: {:.0} kcal", total_calories(meals));
    out
}

/// Orchestrates one user's conversation: context, inference, persistence
/// and the pending meal confirmation.
pub struct SessionManager {
    storage: Arc<dyn StorageAdapter + Send + Sync>,
    inference: Arc<dyn InferenceAdapter + Send + Sync>,
    clock: Arc<dyn Clock>,
    pending: Arc<PendingActions>,
    config: SessionConfig,
    system_prompt: String,
}

impl SessionManager {
    pub fn new(
        storage: Arc<dyn StorageAdapter + Send + Sync>,
        inference: Arc<dyn InferenceAdapter + Send + Sync>,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
        system_prompt: String,
    ) -> Self {
        let pending = Arc::new(PendingActions::new(std::time::Duration::from_secs(
            config.pending_ttl_secs,
        )));
        Self {
            storage,
            inference,
            clock,
            pending,
            config,
            system_prompt,
        }
    }

    /// Shared handle to the pending store, swept by the reminder tick.
    pub fn pending(&self) -> Arc<PendingActions> {
        self.pending.clone()
    }

    fn now(&self) -> DateTime<Local> {
        self.clock.now()
    }

    /// Replies to a text message.
    pub async fn handle_text(&self, address: &str, text: &str) -> String {
        debug!(address, text, "handling text");
        match self.converse(address, text, text).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(address, error = %e, "failed to handle text message");
                TEXT_APOLOGY.to_string()
            }
        }
    }

    /// Transcribes an audio message and replies to the transcript.
    pub async fn handle_audio(&self, address: &str, audio: &[u8], mime_type: &str) -> String {
        match self.try_handle_audio(address, audio, mime_type).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(address, error = %e, "failed to handle audio message");
                AUDIO_APOLOGY.to_string()
            }
        }
    }

    /// Analyzes a food photo and, when a calorie figure is found, proposes
    /// recording it.
    pub async fn handle_image(
        &self,
        address: &str,
        image: &[u8],
        mime_type: &str,
        caption: Option<&str>,
    ) -> String {
        match self.try_handle_image(address, image, mime_type, caption).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(address, error = %e, "failed to handle image message");
                IMAGE_APOLOGY.to_string()
            }
        }
    }

    /// Answers a live pending action, if `text` confirms or denies it.
    ///
    /// Returns `None` when there is no live action or the text is neither,
    /// so normal handling proceeds.
    pub async fn check_pending(&self, address: &str, text: &str) -> Option<String> {
        let now = self.now();
        let mut slot = self.pending.lock(address).await;
        let action = slot.live(now)?.clone();

        match classify_reply(text) {
            ReplyIntent::Confirm => match self.record_meal(address, &action, now).await {
                Ok(meal) => {
                    slot.clear();
                    info!(address, meal_id = meal.id, slot = %meal.slot, "meal recorded");
                    Some(confirmation(&meal.food_name, meal.slot))
                }
                Err(e) => {
                    // Kept so the user can retry within the TTL.
                    error!(address, error = %e, "failed to record confirmed meal");
                    Some(TEXT_APOLOGY.to_string())
                }
            },
            ReplyIntent::Deny => {
                slot.clear();
                debug!(address, "pending action declined");
                Some(DENY_ACK.to_string())
            }
            ReplyIntent::Neither => None,
        }
    }

    /// Today's meals for `address`, grouped by slot.
    pub async fn summary(&self, address: &str) -> String {
        match self.try_summary(address).await {
            Ok(text) => text,
            Err(e) => {
                error!(address, error = %e, "failed to build summary");
                SUMMARY_APOLOGY.to_string()
            }
        }
    }

    /// Meals in the inclusive date range. Unknown addresses have none.
    pub async fn meals_between(
        &self,
        address: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MealRecord>, NutriaError> {
        if start > end {
            return Err(NutriaError::InvalidInput(format!(
                "start date {start} is after end date {end}"
            )));
        }
        match self.storage.get_profile(address).await? {
            Some(profile) => self.storage.meals_between(&profile.id, start, end).await,
            None => Ok(Vec::new()),
        }
    }

    async fn converse(
        &self,
        address: &str,
        stored_text: &str,
        raw_text: &str,
    ) -> Result<String, NutriaError> {
        let profile = self.storage.get_or_create_profile(address).await?;
        self.storage
            .append_turn(&profile.id, Role::User, stored_text)
            .await?;

        let history = self
            .storage
            .recent_turns(&profile.id, self.config.context_turns)
            .await?;
        let today = self
            .storage
            .meals_on(&profile.id, self.now().date_naive())
            .await?;
        let request = context::assemble_request(&self.system_prompt, &profile, &today, history);

        let reply = self.inference.chat(request).await?;
        self.storage
            .append_turn(&profile.id, Role::Assistant, &reply)
            .await?;
        self.trim_history(&profile.id).await;
        self.merge_profile_fields(&profile.id, raw_text).await;
        Ok(reply)
    }

    async fn try_handle_audio(
        &self,
        address: &str,
        audio: &[u8],
        mime_type: &str,
    ) -> Result<String, NutriaError> {
        let transcript = self.inference.transcribe(audio, mime_type).await?;
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return Err(NutriaError::InvalidInput("empty transcription".into()));
        }
        debug!(address, transcript, "audio transcribed");
        self.converse(address, &format!("[Áudio] {transcript}"), transcript)
            .await
    }

    async fn try_handle_image(
        &self,
        address: &str,
        image: &[u8],
        mime_type: &str,
        caption: Option<&str>,
    ) -> Result<String, NutriaError> {
        let profile = self.storage.get_or_create_profile(address).await?;
        let analysis = self.inference.analyze_image(image, mime_type).await?;

        let user_turn = match caption.map(str::trim).filter(|c| !c.is_empty()) {
            Some(caption) => format!("[Imagem enviada] {caption}"),
            None => "[Imagem enviada]".to_string(),
        };
        self.storage
            .append_turn(&profile.id, Role::User, &user_turn)
            .await?;
        self.storage
            .append_turn(&profile.id, Role::Assistant, &analysis)
            .await?;
        self.trim_history(&profile.id).await;

        let Some(calories) = extract_calories(&analysis) else {
            debug!(address, "no calorie figure in analysis");
            return Ok(analysis);
        };
        let food_name = extract_food_name(&analysis);
        self.pending
            .open(
                address,
                PendingAction::meal(food_name.clone(), calories, self.now()),
            )
            .await;
        info!(address, calories, "meal confirmation pending");

        let question = follow_up_question(&food_name, calories);
        Ok(analysis + &question)
    }

    async fn try_summary(&self, address: &str) -> Result<String, NutriaError> {
        let Some(profile) = self.storage.get_profile(address).await? else {
            return Ok(ONBOARDING.to_string());
        };
        let meals = self
            .storage
            .meals_on(&profile.id, self.now().date_naive())
            .await?;
        if meals.is_empty() {
            return Ok(NO_MEALS_TODAY.to_string());
        }
        Ok(render_day_summary(&meals))
    }

    async fn record_meal(
        &self,
        address: &str,
        action: &PendingAction,
        now: DateTime<Local>,
    ) -> Result<MealRecord, NutriaError> {
        let PendingKind::MealConfirmation {
            food_name,
            calories,
            from_image,
        } = &action.kind;

        let profile = self.storage.get_or_create_profile(address).await?;
        let time = now.time().with_nanosecond(0).unwrap_or(now.time());
        let meal = NewMeal {
            slot: MealSlot::from_time(time),
            food_name: food_name.clone(),
            calories: f64::from(*calories),
            date: now.date_naive(),
            time,
            from_image: *from_image,
        };
        self.storage.add_meal(&profile.id, &meal).await
    }

    /// Best effort: a failed trim leaves extra history, never a failed reply.
    async fn trim_history(&self, user_id: &str) {
        match self
            .storage
            .trim_history(user_id, self.config.history_retention)
            .await
        {
            Ok(0) => {}
            Ok(removed) => debug!(user_id, removed, "history trimmed"),
            Err(e) => warn!(user_id, error = %e, "failed to trim history"),
        }
    }

    async fn merge_profile_fields(&self, user_id: &str, text: &str) {
        let update = extract_profile_fields(text);
        if update.is_empty() {
            return;
        }
        match self.storage.update_profile(user_id, &update).await {
            Ok(_) => info!(user_id, "profile updated from message"),
            Err(e) => warn!(user_id, error = %e, "failed to update profile"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn meal(slot: MealSlot, food: &str, calories: f64, day: u32, hour: u32) -> MealRecord {
        MealRecord {
            id: 0,
            user_id: "u1".into(),
            slot,
            food_name: food.into(),
            calories,
            date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
            time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            from_image: true,
            created_at: String::new(),
        }
    }

    #[test]
    fn reply_classification() {
        assert_eq!(classify_reply("Sim!"), ReplyIntent::Confirm);
        assert_eq!(classify_reply("  quero sim "), ReplyIntent::Confirm);
        assert_eq!(classify_reply("pode registrar"), ReplyIntent::Confirm);
        assert_eq!(classify_reply("Não"), ReplyIntent::Deny);
        assert_eq!(classify_reply("nao obrigado"), ReplyIntent::Deny);
        assert_eq!(classify_reply("qual o total?"), ReplyIntent::Neither);
    }

    #[test]
    fn affirmative_is_checked_before_negative() {
        assert_eq!(classify_reply("não quero"), ReplyIntent::Confirm);
    }

    #[test]
    fn follow_up_names_food_and_calories() {
        let q = follow_up_question("Arroz com feijão", 450);
        assert!(q.starts_with("\n\n"));
        assert!(q.contains("\"Arroz com feijão\" (450 kcal)"));
    }

    #[test]
    fn confirmation_uses_lowercase_label() {
        assert_eq!(
            confirmation("Pão", MealSlot::Breakfast),
            "Perfeito! Registrei \"Pão\" no seu café da manhã. Continue assim! 💪"
        );
    }

    #[test]
    fn day_summary_groups_by_slot_order() {
        let meals = vec![
            meal(MealSlot::Dinner, "Sopa", 199.5, 10, 7),
            meal(MealSlot::Breakfast, "Pão", 150.0, 10, 8),
            meal(MealSlot::Lunch, "Arroz", 400.5, 10, 12),
        ];
        assert_eq!(
            render_day_summary(&meals),
            "Aqui está o resumo das suas refeições de hoje:\n\n\
             Café da manhã: Pão (150 kcal)\n\
             Almoço: Arroz (400.5 kcal)\n\
             Jantar: Sopa (199.5 kcal)\n\
             \nTotal: 750 kcal"
        );
    }

    #[test]
    fn period_report_has_daily_subtotals() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let meals = vec![
            meal(MealSlot::Lunch, "Arroz", 400.0, 9, 12),
            meal(MealSlot::Breakfast, "Pão", 150.0, 10, 8),
            meal(MealSlot::Snack, "Fruta", 80.0, 10, 16),
        ];
        let report = render_period_report(start, end, &meals);
        assert!(report.starts_with("Refeições de 09/03/2026 a 10/03/2026:\n"));
        assert!(report.contains("09/03/2026:\n- 12:00 Almoço: Arroz (400 kcal)\nSubtotal: 400 kcal"));
        assert!(report.contains("Subtotal: 230 kcal"));
        assert!(report.ends_with("Total: 630 kcal"));
    }

    #[test]
    fn empty_period_report() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert!(render_period_report(day, day, &[]).contains("Nenhuma refeição"));
    }
}
