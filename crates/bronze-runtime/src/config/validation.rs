//! Configuration validation.

use std::collections::HashSet;

use bronze_adapter_discord::DiscordConfig;
use bronze_core::RetryConfig;

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotConfig, BronzeConfig, LogOutput, PlatformConfig};

/// Validates the whole configuration.
pub fn validate_config(config: &BronzeConfig) -> ConfigResult<()> {
    if config.logging.output == LogOutput::File && config.logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    let mut seen = HashSet::new();
    for bot in &config.bots {
        if !seen.insert(bot.id.as_str()) {
            return Err(ConfigError::DuplicateBotId(bot.id.clone()));
        }
        validate_bot(bot)?;
    }
    Ok(())
}

fn validate_bot(bot: &BotConfig) -> ConfigResult<()> {
    if bot.id.trim().is_empty() {
        return Err(ConfigError::missing_field("bots.id"));
    }
    if bot.id.contains(char::is_whitespace) {
        return Err(ConfigError::validation(format!(
            "Bot ID cannot contain whitespace: {:?}",
            bot.id
        )));
    }

    match &bot.platform {
        PlatformConfig::Discord(discord) => validate_discord(bot, discord),
    }
}

fn validate_discord(bot: &BotConfig, config: &DiscordConfig) -> ConfigResult<()> {
    // Disabled bots may keep a placeholder token.
    if bot.enabled && config.token.trim().is_empty() {
        return Err(ConfigError::missing_field(format!(
            "bots.{}.platform.token",
            bot.id
        )));
    }

    if !(config.api_url.starts_with("https://") || config.api_url.starts_with("http://")) {
        return Err(ConfigError::invalid_url(
            &config.api_url,
            "API URL must start with http:// or https://",
        ));
    }

    if config.close_timeout.is_zero() {
        return Err(ConfigError::validation(
            "close_timeout must be greater than 0",
        ));
    }

    validate_retry(&config.retry)
}

fn validate_retry(retry: &RetryConfig) -> ConfigResult<()> {
    if retry.initial_delay.is_zero() {
        return Err(ConfigError::validation(
            "Initial retry delay must be greater than 0",
        ));
    }
    if retry.max_delay < retry.initial_delay {
        return Err(ConfigError::validation(
            "Max retry delay must be greater than or equal to initial delay",
        ));
    }
    if retry.multiplier < 1.0 {
        return Err(ConfigError::validation(
            "Backoff multiplier must be at least 1.0",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn bot(id: &str, token: &str) -> BotConfig {
        BotConfig {
            id: id.into(),
            enabled: true,
            platform: PlatformConfig::Discord(DiscordConfig::new(token)),
        }
    }

    fn with_bots(bots: Vec<BotConfig>) -> BronzeConfig {
        BronzeConfig {
            bots,
            ..Default::default()
        }
    }

    #[test]
    fn empty_config_is_valid() {
        assert!(validate_config(&BronzeConfig::default()).is_ok());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let config = with_bots(vec![bot("main", "a"), bot("main", "b")]);
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::DuplicateBotId(id)) if id == "main"
        ));
    }

    #[test]
    fn empty_ids_are_rejected() {
        let config = with_bots(vec![bot(" ", "a")]);
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn enabled_bots_need_a_token() {
        let config = with_bots(vec![bot("main", "")]);
        assert!(validate_config(&config).is_err());

        let mut disabled = bot("main", "");
        disabled.enabled = false;
        assert!(validate_config(&with_bots(vec![disabled])).is_ok());
    }

    #[test]
    fn retry_bounds_are_checked() {
        let mut config = DiscordConfig::new("t");
        config.retry.max_delay = Duration::from_millis(1);
        let bot = BotConfig {
            id: "main".into(),
            enabled: true,
            platform: PlatformConfig::Discord(config),
        };
        assert!(matches!(
            validate_config(&with_bots(vec![bot])),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn file_output_needs_a_path() {
        let mut config = BronzeConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());
    }
}
