//! Poll loop: session bootstrap, snapshot fetch, engine invocation, move
//! application. One cycle runs to completion before the next tick; the
//! tracker state is only ever touched from inside a completed cycle, so a
//! skipped cycle leaves solo/recent-join bookkeeping untouched.

use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::{MissedTickBehavior, interval};

use idlemove_core::types::{Client, EngineConfig, Snapshot};
use idlemove_core::{RECENT_JOIN_WINDOW_SECS, TrackerState, evaluate};
use idlemove_query::{QueryClient, QueryError, QueryTransport, TcpTransport};

use crate::cli::SessionOpts;
use crate::config;

/// Consecutive cycle-transient failures before the session is rebuilt.
const RECONNECT_AFTER_FAILURES: u32 = 3;

/// Run the poller until a fatal error or a shutdown signal.
pub async fn run(opts: SessionOpts) -> anyhow::Result<()> {
    let cfg = config::engine_config(&opts)?;

    tokio::select! {
        res = poll_loop(&opts, &cfg) => res,
        () = shutdown_signal() => {
            tracing::info!("idlemove stopped");
            Ok(())
        }
    }
}

/// Fetch one snapshot, evaluate it against empty tracker state, and print
/// the would-be moves and skips as JSON. Issues no `clientmove`.
pub async fn plan(opts: SessionOpts) -> anyhow::Result<()> {
    let cfg = config::engine_config(&opts)?;
    let mut client = connect_session(&opts).await?;

    let now = Utc::now();
    let snapshot = fetch_snapshot(&mut client, now).context("fetching snapshot")?;
    let mut state = TrackerState::new();
    let evaluation = evaluate(&snapshot, &cfg, &mut state, now)?;

    let report = serde_json::json!({
        "captured_at": snapshot.captured_at,
        "moves": evaluation.moves,
        "skips": evaluation.skips,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn poll_loop(opts: &SessionOpts, cfg: &EngineConfig) -> anyhow::Result<()> {
    let mut client = connect_session(opts).await?;
    let mut state = TrackerState::new().with_join_window(join_window(opts.poll_interval_secs));
    let mut consecutive_failures = 0u32;

    let mut ticker = interval(Duration::from_secs(opts.poll_interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match poll_cycle(&mut client, cfg, &mut state)? {
            CycleOutcome::Completed => consecutive_failures = 0,
            CycleOutcome::Skipped(err) => {
                consecutive_failures += 1;
                tracing::warn!(
                    error = %err,
                    consecutive_failures,
                    "cycle skipped, waiting {}s",
                    opts.retry_wait_secs
                );
                tokio::time::sleep(Duration::from_secs(opts.retry_wait_secs)).await;

                if consecutive_failures >= RECONNECT_AFTER_FAILURES {
                    tracing::warn!("rebuilding ServerQuery session");
                    client = connect_session(opts).await?;
                    consecutive_failures = 0;
                }
            }
        }
    }
}

/// Join freshness window: `max(10s, poll interval + 2s)`. Joins are
/// recorded with the cycle's timestamp and consulted one interval later
/// at the earliest, so the default window must be stretched to span the
/// interval (plus drift slack) once the interval reaches it.
fn join_window(poll_interval_secs: u64) -> TimeDelta {
    let floor = TimeDelta::seconds(RECENT_JOIN_WINDOW_SECS);
    let spanning = TimeDelta::seconds(poll_interval_secs as i64 + 2);
    std::cmp::max(floor, spanning)
}

enum CycleOutcome {
    Completed,
    /// Channel or client listing failed; the cycle was aborted before any
    /// state mutation.
    Skipped(QueryError),
}

/// One cycle: fetch → decide → apply. `Err` is fatal (configuration);
/// listing failures come back as [`CycleOutcome::Skipped`].
fn poll_cycle<T: QueryTransport>(
    client: &mut QueryClient<T>,
    cfg: &EngineConfig,
    state: &mut TrackerState,
) -> anyhow::Result<CycleOutcome> {
    let now = Utc::now();
    let snapshot = match fetch_snapshot(client, now) {
        Ok(snapshot) => snapshot,
        Err(err) => return Ok(CycleOutcome::Skipped(err)),
    };

    let evaluation = evaluate(&snapshot, cfg, state, now).context("evaluating snapshot")?;

    for skip in &evaluation.skips {
        tracing::debug!(
            client_id = skip.client_id,
            reason = %skip.reason,
            "move suppressed"
        );
    }

    for action in &evaluation.moves {
        let nickname = snapshot
            .clients
            .iter()
            .find(|c| c.id == action.client_id)
            .map(|c| c.nickname.as_str())
            .unwrap_or("?");
        match client.move_client(action.client_id, action.target_channel_id) {
            Ok(()) => tracing::info!(
                client_id = action.client_id,
                nickname,
                target_channel_id = action.target_channel_id,
                "moved idle client to afk channel"
            ),
            // Not retried until the client is re-evaluated next cycle.
            Err(err) => tracing::warn!(
                client_id = action.client_id,
                nickname,
                error = %err,
                "clientmove failed"
            ),
        }
    }

    tracing::debug!(
        clients = snapshot.clients.len(),
        moves = evaluation.moves.len(),
        skips = evaluation.skips.len(),
        "cycle complete"
    );
    Ok(CycleOutcome::Completed)
}

/// Build the snapshot the engine consumes. Listing failures abort the
/// whole fetch. A failed `clientinfo` is a per-item failure: the client
/// stays in the snapshot with unknown idle time so it still counts toward
/// occupancy and join diffing, and only its own idle verdict is skipped.
/// Query-type clients (our own session included) never enter the snapshot.
fn fetch_snapshot<T: QueryTransport>(
    client: &mut QueryClient<T>,
    now: DateTime<Utc>,
) -> Result<Snapshot, QueryError> {
    let channels = client.channel_list()?;
    let entries = client.client_list()?;

    let mut clients = Vec::with_capacity(entries.len());
    for entry in entries {
        if !entry.is_regular() {
            continue;
        }
        let idle_time_ms = match client.client_info(entry.id) {
            Ok(status) => Some(status.idle_time_ms),
            Err(err) => {
                tracing::warn!(
                    client_id = entry.id,
                    error = %err,
                    "clientinfo failed, idle time unknown this cycle"
                );
                None
            }
        };
        clients.push(Client {
            id: entry.id,
            nickname: entry.nickname,
            channel_id: entry.channel_id,
            idle_time_ms,
        });
    }

    Ok(Snapshot {
        channels,
        clients,
        captured_at: now,
    })
}

/// Establish a ServerQuery session under a bounded fixed-interval retry
/// schedule. Transient failures (network) retry up to
/// `max_connect_attempts`; a rejected login or server selection fails
/// immediately.
async fn connect_session(opts: &SessionOpts) -> anyhow::Result<QueryClient<TcpTransport>> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match try_connect(opts) {
            Ok(client) => return Ok(client),
            Err(err) if err.is_transient() && attempt < opts.max_connect_attempts => {
                tracing::warn!(
                    attempt,
                    max_attempts = opts.max_connect_attempts,
                    error = %err,
                    "connect failed, retrying in {}s",
                    opts.retry_wait_secs
                );
                tokio::time::sleep(Duration::from_secs(opts.retry_wait_secs)).await;
            }
            Err(err) => {
                return Err(anyhow::Error::from(err)).with_context(|| {
                    format!(
                        "could not establish ServerQuery session to {} (attempt {attempt})",
                        opts.server_url
                    )
                });
            }
        }
    }
}

fn try_connect(opts: &SessionOpts) -> Result<QueryClient<TcpTransport>, QueryError> {
    let transport = TcpTransport::connect(&opts.server_url)?;
    let mut client = QueryClient::new(transport);

    client.login(&opts.user, &opts.password)?;
    client.use_server(opts.server_id)?;

    if let Some(nickname) = &opts.nickname {
        // Best-effort: a nickname collision must not take the mover down.
        if let Err(err) = client.set_nickname(nickname) {
            tracing::warn!(error = %err, "failed to set nickname");
        }
    }

    let me = client.whoami()?;
    tracing::info!(
        client_id = me.client_id,
        nickname = %me.nickname,
        "ServerQuery session established"
    );
    Ok(client)
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
            _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        tracing::info!("received ctrl-c, shutting down");
    }
}

// ─── Tests ────────────────────────────────────────────────────────
