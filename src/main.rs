//! Railbot - SimRail community ride tracking bot
//!
//! Entry point: wires the ride engine to the live collaborators (SimRail
//! train data, announcement delivery, spreadsheet logging) and runs the
//! command event loop. Commands are pushed into the loop by the
//! chat-platform gateway adapter; replies and announcements go back out
//! through the [`Notifier`](railbot::sinks::Notifier).

#![deny(unused_imports)]
#![deny(unused_mut)]
#![warn(unused_must_use)]

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use railbot::config::Config;
use railbot::endpoints;
use railbot::leaderboard::{Leaderboard, LeaderboardView, UserSummary};
use railbot::metrics;
use railbot::ride_engine::RideEngine;
use railbot::ride_tracker::RideTracker;
use railbot::simrail::SimRailClient;
use railbot::sinks::{LogNotifier, NameResolver, Notifier, SheetsSink, StaticNameResolver};
use railbot::types::{BotCommand, RideReceipt, UserId};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Override the SimRail server code from the config
    #[arg(short, long)]
    server: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Metrics port
    #[arg(long, default_value = "9090")]
    metrics_port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose)?;

    info!("🚂 Starting Railbot ride tracker");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    info!("📋 Loading configuration from: {}", args.config);
    let config = load_config(&args.config)?;

    let server_code = args
        .server
        .clone()
        .unwrap_or_else(|| config.api.server_code.clone());
    info!("🎯 Tracking server: {}", server_code);

    // Shared state and collaborators
    let tracker = Arc::new(RideTracker::new());
    let trains = Arc::new(
        SimRailClient::new(&config.api)
            .context("Failed to build SimRail client")?
            .with_server_code(&server_code),
    );
    // The chat-platform gateway adapter supplies the real notifier and name
    // resolver; without one the engine talks through the log.
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
    let names: Arc<dyn NameResolver> = Arc::new(StaticNameResolver);

    let mut engine = RideEngine::new(
        Arc::clone(&tracker),
        trains,
        Arc::clone(&notifier),
        Arc::clone(&names),
        config.dispatch.channel.clone(),
        config.api.sample_size,
    );

    if let Some(sheets) = SheetsSink::from_config(&config.sheets) {
        info!("📊 Spreadsheet logging enabled");
        engine = engine.with_sink(Arc::new(sheets));
    } else if config.sheets.enabled {
        warn!("Spreadsheet logging requested but not fully configured, skipping");
    }
    let engine = Arc::new(engine);
    let view = LeaderboardView::new(Arc::clone(&tracker), names);

    if config.monitoring.enable_metrics {
        info!("📈 Starting metrics endpoint on port {}", args.metrics_port);
        let metrics_port = args.metrics_port;
        tokio::spawn(async move {
            if let Err(e) = endpoints::endpoint_server(metrics_port).await {
                error!("Metrics server error: {}", e);
            }
        });
    }

    // Command channel fed by the chat-platform gateway adapter
    let (_command_tx, command_rx) = mpsc::unbounded_channel::<BotCommand>();

    info!("✅ All components initialized");
    run_event_loop(engine, view, notifier, &config, command_rx).await?;

    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        "railbot=debug,info"
    } else {
        "railbot=info,warn,error"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    Ok(())
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path))
    } else {
        warn!("Config file '{}' not found, using defaults", path);
        Ok(Config::default())
    }
}

/// Main event loop
async fn run_event_loop(
    engine: Arc<RideEngine>,
    view: LeaderboardView,
    notifier: Arc<dyn Notifier>,
    config: &Config,
    mut command_rx: mpsc::UnboundedReceiver<BotCommand>,
) -> Result<()> {
    info!("🎬 Event loop started");

    let mut stats_interval = tokio::time::interval(tokio::time::Duration::from_secs(60));

    loop {
        tokio::select! {
            Some(command) = command_rx.recv() => {
                handle_command(&engine, &view, notifier.as_ref(), config, command).await;
            }

            // Periodic statistics reporting
            _ = stats_interval.tick() => {
                let m = metrics::metrics();
                info!("📊 Statistics:");
                info!("   Rides started: {}", m.rides_started.get());
                info!("   Rides completed: {}", m.rides_completed.get());
                info!("   Requests rejected: {}", m.rides_rejected.get());
                info!("   Points awarded: {}", m.points_awarded.get());
                info!("   Open rides: {}", m.open_rides.get());
            }

            _ = tokio::signal::ctrl_c() => {
                info!("🛑 Received shutdown signal");
                break;
            }
        }
    }

    info!("👋 Shutting down gracefully...");
    Ok(())
}

/// Run one command to completion and reply to the requester.
async fn handle_command(
    engine: &RideEngine,
    view: &LeaderboardView,
    notifier: &dyn Notifier,
    config: &Config,
    command: BotCommand,
) {
    match command {
        BotCommand::StartRide { user, train_number } => {
            let reply = match engine.start_ride(user, &train_number).await {
                Ok(ride) => format!(
                    "✅ Ride on train **{}** ({}) started!\n🚉 {}",
                    ride.train_number,
                    ride.train_label,
                    ride.route()
                ),
                Err(e) => format!("❌ {}", e),
            };
            reply_to(notifier, user, &reply).await;
        }
        BotCommand::EndRide { user, train_number } => {
            let reply = match engine.end_ride(user, &train_number).await {
                Ok(receipt) => format_receipt(&receipt),
                Err(e) => format!("❌ {}", e),
            };
            reply_to(notifier, user, &reply).await;
        }
        BotCommand::Summary { user } => {
            let summary = view.user_summary(user, config.leaderboard.recent_rides).await;
            reply_to(notifier, user, &format_summary(&summary)).await;
        }
        BotCommand::Leaderboard { top_n } => {
            let board = view
                .leaderboard(top_n.unwrap_or(config.leaderboard.top_n))
                .await;
            let text = format_leaderboard(&board);
            if let Err(e) = notifier.send_message(&config.dispatch.channel, &text).await {
                warn!(error = %e, "failed to deliver leaderboard");
            }
        }
    }
}

/// Direct reply to a user, best-effort.
async fn reply_to(notifier: &dyn Notifier, user: UserId, text: &str) {
    if let Err(e) = notifier.send_message(&format!("user:{}", user), text).await {
        warn!(user, error = %e, "failed to deliver reply");
    }
}

fn format_receipt(receipt: &RideReceipt) -> String {
    format!(
        "🏁 Ride on train **{}** finished!\n⏰ Duration: **{} min**\n💰 Points: **+{}**\n🏆 Total: **{} points** ({})",
        receipt.completed.train_number,
        receipt.completed.duration_minutes,
        receipt.completed.points_awarded,
        receipt.stats.total_points,
        receipt.stats.level_name,
    )
}

fn format_summary(summary: &UserSummary) -> String {
    let mut text = format!(
        "📊 Statistics for **{}**\n🏆 Level: {}\n💰 Points: {}\n🔥 Streak: {} rides\n🚂 Rides: {}\n⏱️ Total time: {} min",
        summary.display_name,
        summary.stats.level_name,
        summary.stats.total_points,
        summary.stats.streak_count,
        summary.stats.total_rides,
        summary.stats.total_minutes,
    );
    if summary.stats.total_rides > 0 {
        text.push_str(&format!(
            "\n📈 Per ride: {} points | {} min",
            summary.avg_points, summary.avg_minutes
        ));
    }
    for ride in &summary.recent {
        text.push_str(&format!(
            "\n• **{}** • {} • {} min • +{} points",
            ride.train_number, ride.route, ride.duration_minutes, ride.points_awarded
        ));
    }
    if let Some((ride, minutes)) = &summary.active {
        text.push_str(&format!(
            "\n🔄 Active ride: train **{}** ({}) • {} min so far",
            ride.train_number,
            ride.route(),
            minutes
        ));
    }
    text
}

fn format_leaderboard(board: &Leaderboard) -> String {
    if board.entries.is_empty() {
        return "🏆 The leaderboard is empty so far. Start a ride to earn points!".to_string();
    }

    let medals = ["🥇", "🥈", "🥉"];
    let mut text = String::from("🏆 Driver leaderboard\n");
    for (i, entry) in board.entries.iter().enumerate() {
        let rank = medals
            .get(i)
            .map(|m| m.to_string())
            .unwrap_or_else(|| format!("{}.", i + 1));
        text.push_str(&format!(
            "{} **{}** • {} points • {} • {} rides\n",
            rank, entry.display_name, entry.total_points, entry.level_name, entry.total_rides
        ));
    }
    text.push_str(&format!(
        "📊 {} active drivers, {} rides, {} min total",
        board.summary.participants, board.summary.total_rides, board.summary.total_minutes
    ));
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use railbot::types::{CompletedRide, UserStats};

    #[test]
    fn test_format_receipt() {
        let end = chrono::Utc::now();
        let receipt = RideReceipt {
            completed: CompletedRide {
                train_number: "100".into(),
                start_time: end - chrono::Duration::minutes(65),
                end_time: end,
                duration_minutes: 65,
                route: "A → B".into(),
                train_label: "EC Fastlane".into(),
                points_awarded: 38,
                completion_date: end.date_naive(),
            },
            stats: UserStats {
                total_points: 38,
                ..UserStats::default()
            },
        };

        let text = format_receipt(&receipt);
        assert!(text.contains("**100**"));
        assert!(text.contains("+38"));
        assert!(text.contains("38 points"));
        assert!(text.contains("Beginner"));
    }

    #[test]
    fn test_format_empty_leaderboard() {
        let board = Leaderboard {
            entries: vec![],
            summary: railbot::leaderboard::LeaderboardSummary {
                participants: 0,
                total_rides: 0,
                total_minutes: 0,
            },
        };
        assert!(format_leaderboard(&board).contains("empty"));
    }
}
