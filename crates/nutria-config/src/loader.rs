// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Lookup order: `./nutria.toml` > `~/.config/nutria/nutria.toml` > `/etc/nutria/nutria.toml`,
//! with `NUTRIA_` environment variables on top.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::NutriaConfig;

/// Section names that env var keys are split on.
const SECTIONS: &[&str] = &["agent", "whatsapp", "openai", "storage", "session", "reminders"];

pub(crate) const SYSTEM_CONFIG: &str = "/etc/nutria/nutria.toml";
pub(crate) const LOCAL_CONFIG: &str = "nutria.toml";

pub(crate) fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("nutria/nutria.toml"))
        .unwrap_or_default()
}

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/nutria/nutria.toml`
/// 3. `~/.config/nutria/nutria.toml`
/// 4. `./nutria.toml`
/// 5. `NUTRIA_*` environment variables
pub fn load_config() -> Result<NutriaConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string on top of the defaults only.
pub fn load_config_from_str(toml_content: &str) -> Result<NutriaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(NutriaConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<NutriaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(NutriaConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The full layered Figment before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(NutriaConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Environment provider that maps `NUTRIA_<SECTION>_<KEY>` to `section.key`.
///
/// Uses `Env::map()` rather than `Env::split("_")` so keys that contain
/// underscores (`NUTRIA_OPENAI_API_KEY` -> `openai.api_key`) stay intact.
fn env_provider() -> Env {
    Env::prefixed("NUTRIA_").map(|key| map_env_key(key.as_str()).into())
}

pub(crate) fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section)
            && let Some(field) = rest.strip_prefix('_')
        {
            return format!("{section}.{field}");
        }
    }
    key.to_string()
}
