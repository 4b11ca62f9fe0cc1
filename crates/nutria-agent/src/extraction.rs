// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Profile field extraction from free-form Portuguese text.
//!
//! A fixed table of patterns is tried in order; the first pattern that
//! matches wins for its field. There is no scoring, and extraction never
//! fails: text with nothing recognizable yields an empty [`ProfileUpdate`].

use std::sync::LazyLock;

use nutria_core::{Gender, Goal, ProfileUpdate};
use regex::Regex;

/// What a pattern's first capture group holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    WeightKg,
    HeightCm,
    /// Height written in meters with a decimal separator.
    HeightMeters,
    AgeYears,
    Name,
}

/// Ordered pattern table. Order matters only within a field.
static PATTERNS: LazyLock<Vec<(Capture, Regex)>> = LazyLock::new(|| {
    vec![
        (Capture::WeightKg, Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*kg").unwrap()),
        (
            Capture::WeightKg,
            Regex::new(r"(?i)peso\s*(?:é|:)?\s*(\d+(?:[.,]\d+)?)").unwrap(),
        ),
        (Capture::HeightCm, Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*cm").unwrap()),
        (
            Capture::HeightCm,
            Regex::new(r"(?i)altura\s*(?:é|:)?\s*(\d+(?:[.,]\d+)?)").unwrap(),
        ),
        (Capture::HeightCm, Regex::new(r"(?i)(\d{3})\s*cm").unwrap()),
        (Capture::HeightMeters, Regex::new(r"\b(1[.,]\d{2})\b").unwrap()),
        (Capture::AgeYears, Regex::new(r"(?i)(\d{1,2})\s*anos").unwrap()),
        (
            Capture::AgeYears,
            Regex::new(r"(?i)idade\s*(?:é|:)?\s*(\d{1,2})").unwrap(),
        ),
        // Prefix is case-insensitive, the name itself must be capitalized.
        (
            Capture::Name,
            Regex::new(r"(?i:me chamo|meu nome é|\bsou(?: a| o)?)\s+([A-ZÀ-Ú][a-zà-ú]+)")
                .unwrap(),
        ),
    ]
});

const GENDER_KEYWORDS: &[(&[&str], Gender)] = &[
    (&["homem", "masculino"], Gender::Male),
    (&["mulher", "feminino"], Gender::Female),
];

const GOAL_KEYWORDS: &[(&[&str], Goal)] = &[
    (&["ganhar massa", "ganhar peso", "hipertrofia"], Goal::GainMuscle),
    (&["emagrecer", "perder peso", "emagrecimento"], Goal::LoseWeight),
    (&["manter", "manutenção"], Goal::MaintainWeight),
];

/// Mines `text` for profile attributes.
pub fn extract_profile_fields(text: &str) -> ProfileUpdate {
    let mut update = ProfileUpdate::default();

    for (capture, pattern) in PATTERNS.iter() {
        if is_set(&update, *capture) {
            continue;
        }
        let Some(raw) = pattern
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
        else {
            continue;
        };
        match capture {
            Capture::WeightKg => update.weight_kg = parse_decimal(raw),
            Capture::HeightCm => update.height_cm = parse_decimal(raw).map(normalize_height),
            Capture::HeightMeters => update.height_cm = parse_decimal(raw).map(meters_to_cm),
            Capture::AgeYears => update.age = raw.parse().ok(),
            Capture::Name => update.name = Some(raw.to_string()),
        }
    }

    let lower = text.to_lowercase();
    update.gender = first_keyword_match(&lower, GENDER_KEYWORDS);
    update.goal = first_keyword_match(&lower, GOAL_KEYWORDS);
    update
}

fn is_set(update: &ProfileUpdate, capture: Capture) -> bool {
    match capture {
        Capture::WeightKg => update.weight_kg.is_some(),
        Capture::HeightCm | Capture::HeightMeters => update.height_cm.is_some(),
        Capture::AgeYears => update.age.is_some(),
        Capture::Name => update.name.is_some(),
    }
}

fn first_keyword_match<T: Copy>(lower: &str, table: &[(&[&str], T)]) -> Option<T> {
    table
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, value)| *value)
}

/// Parses a number that may use a decimal comma.
fn parse_decimal(raw: &str) -> Option<f64> {
    raw.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Rounded to a tenth of a centimeter.
fn meters_to_cm(meters: f64) -> f64 {
    (meters * 1000.0).round() / 10.0
}

/// "altura: 1,75" is meters even though it came through a centimeter pattern.
fn normalize_height(value: f64) -> f64 {
    if value < 3.0 { meters_to_cm(value) } else { value }
}
