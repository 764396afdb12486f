//! Periodic polling.
//!
//! Each tick fetches a fresh snapshot. While the retry gate is armed the
//! panel is reported as unavailable without touching the network. Ctrl-C
//! is honoured both between ticks and during a poll.

use std::future::Future;
use std::pin::pin;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{MissedTickBehavior, interval};

use jablonet_config::Profile;
use jablonet_core::{Controller, CoreError};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::status::{collect_views, render_views};

pub async fn handle(
    controller: &Controller,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let names = config::active_profile(global);
    watch_until(controller, &args, &names, global, tokio::signal::ctrl_c()).await
}

/// Poll until `shutdown` resolves or `--count` polls have run.
async fn watch_until<F: Future>(
    controller: &Controller,
    args: &WatchArgs,
    names: &Profile,
    global: &GlobalOpts,
    shutdown: F,
) -> Result<(), CliError> {
    let mut shutdown = pin!(shutdown);
    let mut ticker = interval(Duration::from_secs(args.interval));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut polls = 0_u64;
    loop {
        tokio::select! {
            _ = &mut shutdown => return interrupted(controller).await,
            _ = ticker.tick() => {}
        }

        // Dropping an in-flight poll releases the connection for close().
        tokio::select! {
            _ = &mut shutdown => return interrupted(controller).await,
            result = poll_once(controller, names, global) => result?,
        }

        polls += 1;
        if args.count.is_some_and(|limit| polls >= limit) {
            return Ok(());
        }
    }
}

async fn interrupted(controller: &Controller) -> Result<(), CliError> {
    tracing::info!("interrupted, closing connection");
    controller.close().await;
    Ok(())
}

async fn poll_once(
    controller: &Controller,
    names: &Profile,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let now = Utc::now();
    if let Some(until) = controller.next_retry_allowed_at() {
        if until > now {
            report_unavailable(&format!("cooling down until {}", until.to_rfc3339()), global);
            return Ok(());
        }
    }

    match controller.fetch_snapshot().await {
        Ok(snapshot) => {
            let views = collect_views(&snapshot, None, names);
            if !global.quiet {
                println!("── {} ──", snapshot.fetched_at.format("%Y-%m-%d %H:%M:%S"));
            }
            output::print_output(&render_views(&views, global), global.quiet);
            Ok(())
        }
        // A stale session or an unreachable service only costs this tick.
        Err(CoreError::Closed) => Err(CliError::Closed),
        Err(err) => {
            tracing::warn!(error = %err, "poll failed");
            report_unavailable(&err.to_string(), global);
            Ok(())
        }
    }
}

fn report_unavailable(reason: &str, global: &GlobalOpts) {
    if !global.quiet {
        println!("unavailable: {reason}");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use clap::Parser;
    use jablonet_core::{ControllerConfig, Credentials};
    use secrecy::SecretString;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::cli::{Cli, Command};

    fn quiet_watch() -> (GlobalOpts, WatchArgs) {
        let cli = Cli::parse_from(["jablonet", "--quiet", "watch", "--interval", "60"]);
        match cli.command {
            Command::Watch(args) => (cli.global, args),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[tokio::test]
    async fn shutdown_interrupts_a_poll_in_flight() {
        let server = MockServer::start().await;
        // The homepage hangs, so the first poll is stuck in its login.
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
            .mount(&server)
            .await;

        let config = ControllerConfig::new(Credentials::new(
            "user@example.com",
            SecretString::from("secret".to_string()),
        ))
        .with_base_url(server.uri().parse().expect("mock url"))
        .with_timeout(Duration::from_secs(30));
        let controller = Controller::new(config).expect("controller");
        let (global, args) = quiet_watch();

        let started = Instant::now();
        let shutdown = tokio::time::sleep(Duration::from_millis(200));
        watch_until(&controller, &args, &Profile::default(), &global, shutdown)
            .await
            .expect("clean shutdown");

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(controller.is_closed());
    }
}
