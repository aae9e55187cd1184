//! Tourney Console - headless batch submit and live table follower.
//!
//! Reads a batch from stdin and submits its valid lines, then mounts the
//! configured table and logs every refresh until Ctrl-C.

use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tourney_console::{
    Api, BatchForm, Config, StaticSession, TableView, ViewConfig, ViewEvent, WsConnector,
};
use tourney_engine::{Topic, Transcript};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tourney_console=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!(
        "Starting Tourney Console against {} (push {})",
        config.api_url,
        config.ws_url
    );

    let api = Api::http(config.api_url.clone());
    let session = Arc::new(StaticSession::admin());
    let mut transcript = Transcript::new(config.transcript_capacity);

    let mut buffer = String::new();
    tokio::io::stdin().read_to_string(&mut buffer).await?;

    if !buffer.trim().is_empty() {
        let mut form = match config.topic {
            Topic::Teams => BatchForm::team_registration(),
            _ => BatchForm::match_results(config.round),
        };
        form.set_text(buffer);

        let report = form.submit(&api, session.as_ref(), &mut transcript).await?;
        for diagnostic in report.assembly.all_diagnostics() {
            eprintln!("{}", diagnostic);
        }
        if !report.sent() {
            tracing::warn!("No valid lines to submit");
        }
        print!("{}", transcript.render());
    }

    let connector = Arc::new(WsConnector::new(config.ws_url.clone()));
    let mut view = TableView::mount(
        config.topic,
        api,
        connector,
        session,
        ViewConfig::from(&config),
    )
    .await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
            event = view.step(&mut transcript) => match event {
                Some(ViewEvent::Refreshed { rows, .. }) => {
                    tracing::info!(topic = %view.topic(), rows, "Table refreshed");
                }
                Some(ViewEvent::Connection(state)) => {
                    tracing::info!(topic = %view.topic(), state = %state, "Connection state changed");
                }
                Some(other) => tracing::debug!("{:?}", other),
                None => break,
            },
        }
    }

    view.unmount().await;
    Ok(())
}
