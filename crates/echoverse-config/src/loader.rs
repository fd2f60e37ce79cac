// SPDX-FileCopyrightText: 2026 Echoverse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./echoverse.toml` > `~/.config/echoverse/echoverse.toml`
//! > `/etc/echoverse/echoverse.toml`, with environment variable overrides via
//! the `ECHOVERSE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::EchoverseConfig;

/// System-wide configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/echoverse/echoverse.toml";

/// Configuration file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "echoverse.toml";

/// Returns the per-user configuration file path, if a config dir exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("echoverse").join(LOCAL_CONFIG_FILE))
}

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/echoverse/echoverse.toml`
/// 3. `~/.config/echoverse/echoverse.toml`
/// 4. `./echoverse.toml`
/// 5. `ECHOVERSE_*` environment variables
pub fn load_config() -> Result<EchoverseConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<EchoverseConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(EchoverseConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<EchoverseConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(EchoverseConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for hierarchy loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(EchoverseConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Environment provider mapping `ECHOVERSE_<SECTION>_<KEY>` to `section.key`.
///
/// Only the first underscore after the section name is a separator, so
/// `ECHOVERSE_RELAY_IDENTITY_HEADER` maps to `relay.identity_header`.
fn env_provider() -> Env {
    Env::prefixed("ECHOVERSE_").map(|key| {
        key.as_str()
            .replacen("server_", "server.", 1)
            .replacen("relay_", "relay.", 1)
            .replacen("openai_", "openai.", 1)
            .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_nested_keys() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("ECHOVERSE_SERVER_PORT", "8080");
            jail.set_env("ECHOVERSE_RELAY_IDENTITY_HEADER", "x-client-id");
            jail.set_env("ECHOVERSE_OPENAI_MAX_TOKENS", "256");

            let config = load_config()?;
            assert_eq!(config.server.port, 8080);
            assert_eq!(config.relay.identity_header, "x-client-id");
            assert_eq!(config.openai.max_tokens, 256);
            Ok(())
        });
    }

    #[test]
    fn local_file_is_picked_up() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                LOCAL_CONFIG_FILE,
                r#"
[relay]
greeting = "hi there"
"#,
            )?;

            let config = load_config()?;
            assert_eq!(config.relay.greeting, "hi there");
            Ok(())
        });
    }

    #[test]
    fn env_beats_explicit_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("custom.toml", "[server]\nport = 7000\n")?;
            jail.set_env("ECHOVERSE_SERVER_PORT", "7001");

            let config = load_config_from_path(Path::new("custom.toml"))?;
            assert_eq!(config.server.port, 7001);
            Ok(())
        });
    }
}
