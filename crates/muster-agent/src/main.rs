//! # muster-agent
//!
//! Command-line attendance agent for the hostel portal.
//!
//! This binary provides:
//! - Geofenced check-in and unconditional check-out against the portal
//! - Attendance status and history display
//! - Structured logging to file and stdout
//!
//! ## Running
//!
//! ```bash
//! muster status
//! muster verify
//! muster check-in
//! muster check-out
//! ```
//!
//! ## Environment Variables
//!
//! - `MUSTER_ENV`: Optional. `production` switches to file logging
//! - `MUSTER_LOG_LEVEL` / `RUST_LOG`: Optional. Logging level (default: info)
//! - `MUSTER_LATITUDE` / `MUSTER_LONGITUDE`: Optional. Override the
//!   configured position, set together

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use tracing::info;
use url::Url;

use muster_core::{
    default_config_path, AttendanceService, CheckFlag, Coordinate, MusterConfig,
    VerificationOutcome,
};

mod client;
mod logging;
mod provider;

use client::PortalClient;
use provider::{FixedLocationProvider, TerminalNotifier};

type AgentService =
    AttendanceService<FixedLocationProvider, PortalClient, PortalClient, TerminalNotifier>;

#[derive(Parser)]
#[command(
    name = "muster",
    version,
    about = "Geofenced attendance agent for the hostel portal"
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the current attendance status
    Status,
    /// Show the attendance history
    History,
    /// Check whether attendance can be marked from the current position
    Verify,
    /// Check in, subject to the geofence
    CheckIn,
    /// Check out (allowed from anywhere)
    CheckOut,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let is_production = std::env::var("MUSTER_ENV").is_ok_and(|v| v == "production");
    logging::init(is_production)?;

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = MusterConfig::load(&config_path).with_context(|| {
        format!(
            "failed to load configuration from {}",
            config_path.display()
        )
    })?;
    config.validate()?;

    info!(user_id = %config.user.id, portal = %config.portal.base_url, "Starting muster");

    let position = position_override()?.or_else(|| config.fixed_coordinate());

    let base_url = Url::parse(&config.portal.base_url).context("invalid portal base URL")?;
    let portal = PortalClient::new(
        base_url,
        Duration::from_secs(config.portal.timeout_secs),
        config.attendance.tolerance_radius_meters,
    )?;

    let service = AttendanceService::new(
        config.user_context(),
        FixedLocationProvider::new(position),
        portal.clone(),
        portal,
        TerminalNotifier,
    )
    .with_location_request(config.location_request())
    .with_remote_timeout(Duration::from_secs(config.portal.timeout_secs))
    .with_retry_policy(config.attendance.retry);

    // Ctrl-C aborts in-flight portal and location calls.
    let cancel = service.cancellation_token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    match cli.command {
        Command::Status => status(&service).await,
        Command::History => history(&service, config.timezone).await,
        Command::Verify => verify(&service).await.map(|_| ()),
        Command::CheckIn => check_in(&service, config.timezone).await,
        Command::CheckOut => check_out(&service, config.timezone).await,
    }
}

async fn status(service: &AgentService) -> anyhow::Result<()> {
    let status = service.load_status().await;
    println!("{}: {status}", service.user().name);
    Ok(())
}

async fn history(service: &AgentService, timezone: Tz) -> anyhow::Result<()> {
    let entries = service.load_history().await;
    if entries.is_empty() {
        println!("No attendance records.");
        return Ok(());
    }
    for entry in &entries {
        println!(
            "{}  {}",
            entry
                .recorded_at
                .with_timezone(&timezone)
                .format("%Y-%m-%d %H:%M:%S"),
            entry.check
        );
    }
    Ok(())
}

/// Run the pre-check flow and fail when the geofence refuses admission.
async fn verify(service: &AgentService) -> anyhow::Result<VerificationOutcome> {
    let outcome = service.verify().await;
    if let Some(decision) = outcome.decision {
        println!(
            "Distance from the hostel: {:.1} m ({})",
            decision.distance_meters, decision.reason
        );
    }
    if !outcome.may_proceed() {
        anyhow::bail!("You must be within the allowed location to proceed.");
    }
    Ok(outcome)
}

async fn check_in(service: &AgentService, timezone: Tz) -> anyhow::Result<()> {
    let outcome = verify(service).await?;
    if outcome.status.is_checked_in() {
        anyhow::bail!("Already checked in.");
    }
    let record = service.mark(CheckFlag::CheckIn).await?;
    println!(
        "Checked in at {}",
        record
            .recorded_at
            .with_timezone(&timezone)
            .format("%Y-%m-%d %H:%M:%S %Z")
    );
    Ok(())
}

async fn check_out(service: &AgentService, timezone: Tz) -> anyhow::Result<()> {
    let status = service.load_status().await;
    if !status.is_checked_in() {
        anyhow::bail!("Not checked in.");
    }
    let record = service.mark(CheckFlag::CheckOut).await?;
    println!(
        "Checked out at {}",
        record
            .recorded_at
            .with_timezone(&timezone)
            .format("%Y-%m-%d %H:%M:%S %Z")
    );
    Ok(())
}

/// Position override from `MUSTER_LATITUDE` / `MUSTER_LONGITUDE`.
fn position_override() -> anyhow::Result<Option<Coordinate>> {
    let latitude = std::env::var("MUSTER_LATITUDE").ok();
    let longitude = std::env::var("MUSTER_LONGITUDE").ok();
    match (latitude, longitude) {
        (None, None) => Ok(None),
        (Some(latitude), Some(longitude)) => {
            let latitude = latitude
                .trim()
                .parse()
                .context("MUSTER_LATITUDE is not a number")?;
            let longitude = longitude
                .trim()
                .parse()
                .context("MUSTER_LONGITUDE is not a number")?;
            Ok(Some(Coordinate::new(latitude, longitude)))
        }
        _ => anyhow::bail!("MUSTER_LATITUDE and MUSTER_LONGITUDE must be set together"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
