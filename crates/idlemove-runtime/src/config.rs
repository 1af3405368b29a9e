//! Session options → engine configuration.

use anyhow::Context;
use idlemove_core::EngineConfig;

use crate::cli::SessionOpts;

/// Build the immutable engine configuration. Seconds are normalized to
/// milliseconds here, once; the engine only ever compares milliseconds.
pub fn engine_config(opts: &SessionOpts) -> anyhow::Result<EngineConfig> {
    let ignored_channel_names: Vec<String> = serde_json::from_str(&opts.ignored_channels)
        .context("TS3_IGNORED_CHANNELS is not a valid JSON string array")?;

    Ok(EngineConfig {
        afk_channel_name: opts.afk_channel.clone(),
        max_idle_time_ms: opts.max_idle_time_sec * 1000,
        ignored_channel_names,
        allow_grace_period: opts.allow_grace_period,
    })
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> SessionOpts {
        SessionOpts {
            server_url: "localhost:10011".into(),
            user: "serveradmin".into(),
            password: "secret".into(),
            server_id: 1,
            nickname: None,
            afk_channel: "AFK".into(),
            max_idle_time_sec: 600,
            ignored_channels: "[\"Quiet\", \"Music Bots\"]".into(),
            allow_grace_period: true,
            poll_interval_secs: 10,
            retry_wait_secs: 5,
            max_connect_attempts: 5,
        }
    }

    #[test]
    fn seconds_normalized_to_milliseconds() {
        let cfg = engine_config(&opts()).expect("config");
        assert_eq!(cfg.max_idle_time_ms, 600_000);
    }

    #[test]
    fn ignored_channels_parsed_from_json_array() {
        let cfg = engine_config(&opts()).expect("config");
        assert_eq!(
            cfg.ignored_channel_names,
            vec!["Quiet".to_string(), "Music Bots".to_string()]
        );
    }

    #[test]
    fn invalid_ignored_channels_rejected() {
        let mut o = opts();
        o.ignored_channels = "Quiet,Music".into();
        assert!(engine_config(&o).is_err());
    }

    #[test]
    fn empty_array_default() {
        let mut o = opts();
        o.ignored_channels = "[]".into();
        let cfg = engine_config(&o).expect("config");
        assert!(cfg.ignored_channel_names.is_empty());
    }
}
