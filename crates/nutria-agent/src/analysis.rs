// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Heuristic parsing of food photo analyses.

use std::sync::LazyLock;

use regex::Regex;

/// Food name used when no line of the analysis names one.
pub const UNKNOWN_FOOD: &str = "Alimento não identificado";

static CALORIES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*(?:kcal|calorias)").unwrap());

static RANGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*-\s*(\d+)").unwrap());

/// Lines containing these describe the absence of food.
const NO_FOOD_MARKERS: &[&str] = &["não consigo", "não há"];

/// Finds the calorie estimate in an analysis.
///
/// The first `<n> kcal` or `<n> calorias` wins. Without one, the upper
/// bound of the first `<a> - <b>` range is used.
pub fn extract_calories(text: &str) -> Option<u32> {
    if let Some(caps) = CALORIES.captures(text) {
        return caps[1].parse().ok();
    }
    RANGE.captures(text).and_then(|caps| caps[2].parse().ok())
}

/// Takes the food name from the first line that names one: the text
/// before its first `-`.
pub fn extract_food_name(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| {
            let lower = line.to_lowercase();
            !NO_FOOD_MARKERS.iter().any(|m| lower.contains(m))
        })
        .filter_map(|line| line.split('-').next())
        .map(str::trim)
        .find(|name| !name.is_empty())
        .map(String::from)
        .unwrap_or_else(|| UNKNOWN_FOOD.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calories_from_kcal_suffix() {
        assert_eq!(extract_calories("Arroz com feijão - 300g - 450 kcal"), Some(450));
        assert_eq!(extract_calories("Total: 620 Calorias"), Some(620));
    }

    #[test]
    fn calories_from_range_when_no_suffix() {
        assert_eq!(extract_calories("Salada - entre 150 - 200"), Some(200));
        assert_eq!(extract_calories("estimativa 300-350"), Some(350));
    }

    #[test]
    fn first_kcal_wins() {
        assert_eq!(
            extract_calories("Pão - 50g - 130 kcal\nOvo - 50g - 70 kcal"),
            Some(130)
        );
    }

    #[test]
    fn no_calories() {
        assert_eq!(extract_calories("Não consigo identificar comida."), None);
    }

    #[test]
    fn food_name_before_separator() {
        assert_eq!(
            extract_food_name("Arroz com feijão - 300g - 450 kcal"),
            "Arroz com feijão"
        );
    }

    #[test]
    fn food_name_skips_no_food_lines() {
        let text = "\nNão há legenda na foto.\nFrango grelhado - 150g - 250 kcal";
        assert_eq!(extract_food_name(text), "Frango grelhado");
    }

    #[test]
    fn food_name_skips_bullet_only_prefix() {
        assert_eq!(
            extract_food_name("- 200g\nMacarrão - 200g - 300 kcal"),
            "Macarrão"
        );
    }

    #[test]
    fn food_name_default() {
        assert_eq!(extract_food_name("não consigo ver comida"), UNKNOWN_FOOD);
        assert_eq!(extract_food_name(""), UNKNOWN_FOOD);
    }
}
