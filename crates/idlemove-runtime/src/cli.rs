//! CLI definition using clap derive. Every session option is backed by a
//! `TS3_*` environment variable so the binary runs unattended with no
//! arguments at all.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "idlemove", about = "ServerQuery AFK mover")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the poller: evaluate every interval and move idle clients
    Run(SessionOpts),
    /// Fetch one snapshot and print the would-be moves as JSON, move nobody
    Plan(SessionOpts),
}

#[derive(clap::Args)]
pub struct SessionOpts {
    /// ServerQuery address (host:port)
    #[arg(long, env = "TS3_URL")]
    pub server_url: String,

    /// ServerQuery login name
    #[arg(long, env = "TS3_USER")]
    pub user: String,

    /// ServerQuery password
    #[arg(long, env = "TS3_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Virtual server id to select after login
    #[arg(long, env = "TS3_SERVER_ID")]
    pub server_id: u64,

    /// Nickname for the query session (best-effort, failure is not fatal)
    #[arg(long, env = "TS3_NICKNAME")]
    pub nickname: Option<String>,

    /// Name of the channel idle clients are moved into
    #[arg(long, env = "TS3_AFK_CHANNEL_NAME")]
    pub afk_channel: String,

    /// Idle threshold in seconds
    #[arg(long, env = "TS3_MAX_IDLE_TIME_SEC")]
    pub max_idle_time_sec: u64,

    /// JSON string array of channel names exempt from the move policy
    #[arg(long, env = "TS3_IGNORED_CHANNELS", default_value = "[]")]
    pub ignored_channels: String,

    /// Grant a one-cycle grace when a solo client's channel gains company
    #[arg(
        long,
        env = "TS3_ALLOW_GRACE_PERIOD",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub allow_grace_period: bool,

    /// Poll interval in seconds
    #[arg(long, default_value_t = 10)]
    pub poll_interval_secs: u64,

    /// Wait after a cycle-transient failure in seconds
    #[arg(long, default_value_t = 5)]
    pub retry_wait_secs: u64,

    /// Connect/login attempts before giving up
    #[arg(long, default_value_t = 5)]
    pub max_connect_attempts: u32,
}
