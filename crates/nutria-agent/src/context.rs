// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model context: the system prompt and the per-user context block.

use std::fmt::Write;

use nutria_config::model::AgentConfig;
use nutria_core::{ChatRequest, ChatTurn, ConversationTurn, Gender, Goal, MealRecord, UserProfile};
use tracing::{info, warn};

const DEFAULT_PERSONA: &str = "uma nutricionista profissional virtual altamente experiente e empática que atua via WhatsApp.

Sua personalidade:
- Amigável, acolhedora e motivadora
- Faz perguntas de forma natural e conversacional, nunca de forma robotizada
- Coleta informações aos poucos, sem interrogar o usuário
- Demonstra interesse genuíno pela saúde e bem-estar do usuário
- Usa linguagem simples e acessível

Suas responsabilidades:
1. Reconhecer alimentos em fotos e estimar calorias com precisão
2. Registrar refeições quando o usuário concordar
3. Coletar informações do perfil (peso, altura, idade, sexo, objetivo) de forma natural e gradual
4. Criar planos alimentares personalizados baseados nos objetivos do usuário
5. Dar sugestões práticas e motivadoras sobre alimentação
6. Lembrar o contexto das conversas anteriores

Diretrizes importantes:
- Nunca force o usuário a responder perguntas
- Seja proativa em sugerir melhorias na alimentação
- Celebre as conquistas do usuário
- Adapte suas recomendações ao estilo de vida e preferências do usuário
- Mantenha um tom positivo e encorajador";

/// Loads the system prompt following config priority: file > inline > default.
pub async fn load_system_prompt(config: &AgentConfig) -> String {
    if let Some(ref file_path) = config.system_prompt_file {
        match tokio::fs::read_to_string(file_path).await {
            Ok(content) => {
                let trimmed = content.trim();
                if !trimmed.is_empty() {
                    info!(path = file_path.as_str(), "loaded system prompt from file");
                    return trimmed.to_string();
                }
            }
            Err(e) => {
                warn!(
                    path = file_path.as_str(),
                    error = %e,
                    "failed to read system prompt file, falling back"
                );
            }
        }
    }

    if let Some(ref prompt) = config.system_prompt
        && !prompt.trim().is_empty()
    {
        return prompt.clone();
    }

    format!("Você é {}, {DEFAULT_PERSONA}", config.name)
}

/// Formats a figure without a trailing `.0`.
pub fn format_number(calories: f64) -> String {
    if calories.fract() == 0.0 {
        format!("{calories:.0}")
    } else {
        format!("{calories:.1}")
    }
}

pub fn total_calories(meals: &[MealRecord]) -> f64 {
    meals.iter().map(|m| m.calories).sum()
}

/// Serializes what the model should know about the user right now.
pub fn build_context_block(profile: &UserProfile, today: &[MealRecord]) -> String {
    let mut block = String::from("Contexto do usuário:\n");

    // Writing into a String cannot fail.
    if let Some(name) = &profile.name {
        let _ = writeln!(block, "- Nome: {name}");
    }
    if let Some(weight) = profile.weight_kg {
        let _ = writeln!(block, "- Peso: {}kg", format_number(weight));
    }
    if let Some(height) = profile.height_cm {
        let _ = writeln!(block, "- Altura: {}cm", format_number(height));
    }
    if let Some(age) = profile.age {
        let _ = writeln!(block, "- Idade: {age} anos");
    }
    match profile.gender {
        Gender::Male => block.push_str("- Sexo: masculino\n"),
        Gender::Female => block.push_str("- Sexo: feminino\n"),
        Gender::Unknown => {}
    }
    if profile.goal != Goal::Unknown {
        let _ = writeln!(block, "- Objetivo: {}", profile.goal.description());
    }

    if !today.is_empty() {
        block.push_str("\nRefeições de hoje:\n");
        for meal in today {
            let _ = writeln!(
                block,
                "- {}: {} ({} kcal)",
                meal.slot.label(),
                meal.food_name,
                format_number(meal.calories)
            );
        }
        let _ = writeln!(
            block,
            "Total de calorias hoje: {:.0} kcal",
            total_calories(today)
        );
    }

    block
}

/// Assembles the chat request from the prompt, context block and history.
pub fn assemble_request(
    system_prompt: &str,
    profile: &UserProfile,
    today: &[MealRecord],
    history: Vec<ConversationTurn>,
) -> ChatRequest {
    ChatRequest {
        system_prompt: format!(
            "{system_prompt}\n\n{}",
            build_context_block(profile, today)
        ),
        turns: history
            .into_iter()
            .map(|t| ChatTurn {
                role: t.role,
                content: t.content,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use nutria_core::{MealSlot, Role};

    fn profile() -> UserProfile {
        UserProfile {
            id: "u1".into(),
            address: "5511".into(),
            name: None,
            weight_kg: None,
            height_cm: None,
            age: None,
            gender: Gender::Unknown,
            goal: Goal::Unknown,
            created_at: "2026-03-10T08:00:00Z".into(),
            updated_at: "2026-03-10T08:00:00Z".into(),
        }
    }

    fn meal(slot: MealSlot, food: &str, calories: f64) -> MealRecord {
        MealRecord {
            id: 1,
            user_id: "u1".into(),
            slot,
            food_name: food.into(),
            calories,
            date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            from_image: true,
            created_at: "2026-03-10T12:00:00Z".into(),
        }
    }

    #[tokio::test]
    async fn default_prompt_uses_agent_name() {
        let config = AgentConfig {
            name: "Nutri.ia".into(),
            system_prompt: None,
            system_prompt_file: None,
            ..Default::default()
        };
        let prompt = load_system_prompt(&config).await;
        assert!(prompt.starts_with("Você é Nutri.ia, uma nutricionista"));
    }

    #[tokio::test]
    async fn inline_prompt_wins_over_default() {
        let config = AgentConfig {
            system_prompt: Some("Prompt curto.".into()),
            ..Default::default()
        };
        assert_eq!(load_system_prompt(&config).await, "Prompt curto.");
    }

    #[tokio::test]
    async fn file_prompt_wins_over_inline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.md");
        std::fs::write(&path, "  Prompt do arquivo.\n").unwrap();
        let config = AgentConfig {
            system_prompt: Some("Inline.".into()),
            system_prompt_file: Some(path.to_string_lossy().into_owned()),
            ..Default::default()
        };
        assert_eq!(load_system_prompt(&config).await, "Prompt do arquivo.");
    }

    #[tokio::test]
    async fn missing_prompt_file_falls_back() {
        let config = AgentConfig {
            system_prompt: Some("Reserva.".into()),
            system_prompt_file: Some("/nonexistent/nutria/prompt.md".into()),
            ..Default::default()
        };
        assert_eq!(load_system_prompt(&config).await, "Reserva.");
    }

    #[test]
    fn empty_profile_block() {
        assert_eq!(build_context_block(&profile(), &[]), "Contexto do usuário:\n");
    }

    #[test]
    fn full_block() {
        let mut p = profile();
        p.name = Some("Ana".into());
        p.weight_kg = Some(62.5);
        p.height_cm = Some(165.0);
        p.age = Some(30);
        p.gender = Gender::Female;
        p.goal = Goal::LoseWeight;
        let meals = vec![
            meal(MealSlot::Breakfast, "Pão com ovo", 320.0),
            meal(MealSlot::Lunch, "Arroz com feijão", 450.0),
        ];

        let block = build_context_block(&p, &meals);
        assert_eq!(
            block,
            "Contexto do usuário:\n\
             - Nome: Ana\n\
             - Peso: 62.5kg\n\
             - Altura: 165cm\n\
             - Idade: 30 anos\n\
             - Sexo: feminino\n\
             - Objetivo: emagrecer\n\
             \nRefeições de hoje:\n\
             - Café da manhã: Pão com ovo (320 kcal)\n\
             - Almoço: Arroz com feijão (450 kcal)\n\
             Total de calorias hoje: 770 kcal\n"
        );
    }

    #[test]
    fn request_carries_history_in_order() {
        let history = vec![
            ConversationTurn {
                id: 1,
                user_id: "u1".into(),
                role: Role::User,
                content: "oi".into(),
                created_at: String::new(),
            },
            ConversationTurn {
                id: 2,
                user_id: "u1".into(),
                role: Role::Assistant,
                content: "olá!".into(),
                created_at: String::new(),
            },
        ];
        let request = assemble_request("Sistema.", &profile(), &[], history);
        assert!(request.system_prompt.starts_with("Sistema.\n\nContexto do usuário:"));
        assert_eq!(request.turns.len(), 2);
        assert_eq!(request.turns[0].role, Role::User);
        assert_eq!(request.turns[1].content, "olá!");
    }

    #[test]
    fn kcal_formatting() {
        assert_eq!(format_number(450.0), "450");
        assert_eq!(format_number(72.5), "72.5");
    }
}
