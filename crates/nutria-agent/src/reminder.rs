// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduled meal reminders.
//!
//! Three kinds of firing share one send path:
//! - the periodic tick, which sends the slot template to every active
//!   reminder whose `HH:MM` equals the current local minute;
//! - four default broadcasts (08:00, 12:00, 16:00, 19:00) to every
//!   address with at least one enabled reminder;
//! - one daily job per custom reminder, armed by
//!   [`ReminderDispatcher::schedule_custom`].
//!
//! A failed send is logged and counted; the rest of the cycle continues.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveTime};
use dashmap::DashMap;
use futures::FutureExt;
use nutria_config::model::ReminderConfig;
use nutria_core::{
    ChannelAdapter, Clock, MealSlot, NutriaError, OutboundMessage, StorageAdapter,
};
use tracing::{debug, error, info, warn};

use crate::pending::PendingActions;
use crate::schedule::{Job, JobHandle, Scheduler, daily_expression, parse_time_of_day};

/// Default broadcast times and texts, in slot order.
pub const DEFAULT_BROADCASTS: [(MealSlot, u32, &str); 4] = [
    (
        MealSlot::Breakfast,
        8,
        "Bom dia! ☀️ Já tomou café da manhã? Me envie uma foto do que comeu!",
    ),
    (
        MealSlot::Lunch,
        12,
        "Hora do almoço! 🍽️ Não se esqueça de registrar sua refeição!",
    ),
    (
        MealSlot::Snack,
        16,
        "Que tal um lanchinho saudável? 🥗 Me conte o que comeu!",
    ),
    (
        MealSlot::Dinner,
        19,
        "Hora do jantar! 🌙 Vamos registrar sua última refeição do dia?",
    ),
];

/// Text sent by the tick for a matching reminder.
pub fn tick_message(slot: MealSlot) -> &'static str {
    match slot {
        MealSlot::Breakfast => {
            "Bom dia! ☀️ Hora do café da manhã! Me envie uma foto do que vai comer."
        }
        MealSlot::Lunch => "Hora do almoço! 🍽️ Não se esqueça de registrar sua refeição!",
        MealSlot::Snack => "Hora do lanche! 🥤 Me conte o que vai comer!",
        MealSlot::Dinner => "Boa noite! 🌙 Hora do jantar! Vamos registrar o que você comeu?",
    }
}

/// Text sent by a user's own daily reminder job.
pub fn custom_message(slot: MealSlot) -> &'static str {
    match slot {
        MealSlot::Breakfast => "Bom dia! ☀️ Hora do café da manhã!",
        MealSlot::Lunch => "Hora do almoço! 🍽️",
        MealSlot::Snack => "Hora do lanche! 🥤",
        MealSlot::Dinner => "Boa noite! 🌙 Hora do jantar!",
    }
}

fn default_broadcast_message(slot: MealSlot) -> &'static str {
    DEFAULT_BROADCASTS
        .iter()
        .find(|(s, _, _)| *s == slot)
        .map(|(_, _, text)| *text)
        .unwrap_or_else(|| tick_message(slot))
}

/// Outcome of one firing cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FireReport {
    /// Recipients the cycle tried to reach.
    pub matched: usize,
    pub sent: usize,
    pub failed: usize,
}

/// The store and transport handles a firing needs. Cloned into jobs.
#[derive(Clone)]
struct Delivery {
    storage: Arc<dyn StorageAdapter + Send + Sync>,
    channel: Arc<dyn ChannelAdapter + Send + Sync>,
}

impl Delivery {
    async fn send(&self, address: &str, text: &str, report: &mut FireReport) {
        report.matched += 1;
        match self.channel.send(OutboundMessage::new(address, text)).await {
            Ok(_) => {
                report.sent += 1;
                debug!(address, "reminder sent");
            }
            Err(e) => {
                report.failed += 1;
                warn!(address, error = %e, "failed to send reminder");
            }
        }
    }

    async fn check_and_fire(&self, now: DateTime<Local>) -> FireReport {
        let mut report = FireReport::default();
        let current = now.format("%H:%M").to_string();
        let reminders = match self.storage.list_active_reminders().await {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, "failed to list active reminders");
                return report;
            }
        };
        for reminder in reminders
            .iter()
            .filter(|r| r.time.get(..5) == Some(current.as_str()))
        {
            self.send(&reminder.address, tick_message(reminder.slot), &mut report)
                .await;
        }
        if report.matched > 0 {
            info!(
                time = current.as_str(),
                sent = report.sent,
                failed = report.failed,
                "reminder tick fired"
            );
        }
        report
    }

    async fn broadcast(&self, slot: MealSlot) -> FireReport {
        let mut report = FireReport::default();
        let reminders = match self.storage.list_active_reminders().await {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, "failed to list active reminders");
                return report;
            }
        };
        let text = default_broadcast_message(slot);
        let mut seen = HashSet::new();
        for reminder in &reminders {
            if seen.insert(reminder.address.as_str()) {
                self.send(&reminder.address, text, &mut report).await;
            }
        }
        info!(
            slot = %slot,
            sent = report.sent,
            failed = report.failed,
            "default broadcast fired"
        );
        report
    }
}

/// Arms and fires meal reminders.
pub struct ReminderDispatcher {
    delivery: Delivery,
    clock: Arc<dyn Clock>,
    scheduler: Scheduler,
    config: ReminderConfig,
    pending: Option<Arc<PendingActions>>,
    custom_jobs: DashMap<(String, MealSlot), JobHandle>,
}

impl ReminderDispatcher {
    pub fn new(
        storage: Arc<dyn StorageAdapter + Send + Sync>,
        channel: Arc<dyn ChannelAdapter + Send + Sync>,
        clock: Arc<dyn Clock>,
        config: ReminderConfig,
    ) -> Self {
        Self {
            delivery: Delivery { storage, channel },
            scheduler: Scheduler::new(clock.clone()),
            clock,
            config,
            pending: None,
            custom_jobs: DashMap::new(),
        }
    }

    /// Sweeps expired pending actions on every tick.
    pub fn with_pending_sweep(mut self, pending: Arc<PendingActions>) -> Self {
        self.pending = Some(pending);
        self
    }

    /// Arms the periodic tick and, unless disabled, the default broadcasts.
    pub fn initialize(&self) -> Result<(), NutriaError> {
        if !self.config.enabled {
            info!("reminders disabled");
            return Ok(());
        }

        let delivery = self.delivery.clone();
        let clock = self.clock.clone();
        let pending = self.pending.clone();
        let tick: Job = Arc::new(move || {
            let delivery = delivery.clone();
            let clock = clock.clone();
            let pending = pending.clone();
            async move {
                let now = clock.now();
                if let Some(pending) = pending {
                    let swept = pending.sweep(now);
                    if swept > 0 {
                        debug!(swept, "expired pending actions swept");
                    }
                }
                delivery.check_and_fire(now).await;
            }
            .boxed()
        });
        self.scheduler
            .arm("reminder-tick", &self.config.check_schedule, tick)?;

        if self.config.default_broadcasts {
            for (slot, hour, _) in DEFAULT_BROADCASTS {
                let delivery = self.delivery.clone();
                let job: Job = Arc::new(move || {
                    let delivery = delivery.clone();
                    async move {
                        delivery.broadcast(slot).await;
                    }
                    .boxed()
                });
                let expression = format!("0 {hour} * * *");
                self.scheduler
                    .arm(&format!("default-{slot}"), &expression, job)?;
            }
        }

        info!(
            schedule = self.config.check_schedule.as_str(),
            default_broadcasts = self.config.default_broadcasts,
            "reminder dispatcher initialized"
        );
        Ok(())
    }

    /// Sends the slot template to every reminder set for `now`'s minute.
    pub async fn check_and_fire(&self, now: DateTime<Local>) -> FireReport {
        self.delivery.check_and_fire(now).await
    }

    /// Sends the default broadcast for `slot` to each distinct address
    /// with an enabled reminder.
    pub async fn broadcast_default(&self, slot: MealSlot) -> FireReport {
        self.delivery.broadcast(slot).await
    }

    /// Stores a user's reminder and (re)arms its daily job.
    ///
    /// Any job already armed for the same address and slot is cancelled
    /// first. Returns false on an invalid time or a store failure.
    pub async fn schedule_custom(
        &self,
        user_id: &str,
        address: &str,
        slot: MealSlot,
        time: &str,
    ) -> bool {
        let Some(at) = parse_time_of_day(time) else {
            warn!(address, time, "invalid reminder time");
            return false;
        };
        let normalized = at.format("%H:%M").to_string();

        if let Err(e) = self
            .delivery
            .storage
            .upsert_reminder(user_id, slot, &normalized)
            .await
        {
            error!(address, error = %e, "failed to store reminder");
            return false;
        }

        match self.arm_custom(address, slot, at) {
            Ok(handle) => {
                // One job per user and slot; the replaced one is cancelled.
                let key = (address.to_string(), slot);
                if let Some(old) = self.custom_jobs.insert(key, handle) {
                    self.scheduler.cancel(&old);
                }
                info!(address, slot = %slot, time = normalized.as_str(), "custom reminder armed");
                true
            }
            Err(e) => {
                error!(address, error = %e, "failed to arm custom reminder");
                false
            }
        }
    }

    fn arm_custom(
        &self,
        address: &str,
        slot: MealSlot,
        at: NaiveTime,
    ) -> Result<JobHandle, NutriaError> {
        let channel = self.delivery.channel.clone();
        let recipient = address.to_string();
        let job: Job = Arc::new(move || {
            let channel = channel.clone();
            let recipient = recipient.clone();
            async move {
                let msg = OutboundMessage::new(recipient.as_str(), custom_message(slot));
                if let Err(e) = channel.send(msg).await {
                    warn!(address = recipient.as_str(), error = %e, "failed to send custom reminder");
                }
            }
            .boxed()
        });
        self.scheduler.arm(
            &format!("custom-{address}-{slot}"),
            &daily_expression(at),
            job,
        )
    }

    /// Number of armed custom jobs.
    pub fn custom_job_count(&self) -> usize {
        self.custom_jobs.len()
    }

    /// Number of armed jobs of every kind.
    pub fn armed_jobs(&self) -> usize {
        self.scheduler.armed()
    }

    /// Cancels every armed job.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
        self.custom_jobs.clear();
        info!("reminder dispatcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_broadcasts_cover_every_slot_in_order() {
        let slots: Vec<MealSlot> = DEFAULT_BROADCASTS.iter().map(|(s, _, _)| *s).collect();
        assert_eq!(slots, MealSlot::ALL.to_vec());
        let hours: Vec<u32> = DEFAULT_BROADCASTS.iter().map(|(_, h, _)| *h).collect();
        assert_eq!(hours, vec![8, 12, 16, 19]);
    }

    #[test]
    fn templates_differ_by_kind() {
        assert_ne!(
            tick_message(MealSlot::Breakfast),
            custom_message(MealSlot::Breakfast)
        );
        assert_ne!(
            default_broadcast_message(MealSlot::Breakfast),
            tick_message(MealSlot::Breakfast)
        );
        assert!(custom_message(MealSlot::Snack).contains("lanche"));
    }
}
