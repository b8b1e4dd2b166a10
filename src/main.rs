use color_eyre::{eyre::eyre, Result};
use ev3_remote::config::RemoteConfig;
use ev3_remote::sensor::InfraredSensor;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = RemoteConfig::load(None)?;
    info!("Using config: {:?}", config);

    let sensor = InfraredSensor::find(&config.sysfs_root, config.port)
        .await
        .map_err(|e| eyre!("Failed to find infrared sensor: {}", e))?;

    let cancel = CancellationToken::new();
    let settings = config.session_settings();

    let pressed = sensor
        .on_pressed(&cancel, settings.clone(), |channel, button| {
            info!("Pressed {:?} on {}", button, channel);
        })
        .await?;
    let released = sensor
        .on_released(&cancel, settings, |channel, button| {
            info!("Released {:?} on {}", button, channel);
        })
        .await?;

    // Stop on Ctrl-C, or as soon as either session dies on its own
    let shutdown = cancel.clone();
    let pressed_token = pressed.cancellation_token();
    let released_token = released.cancellation_token();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Ctrl-C received, shutting down"),
            _ = pressed_token.cancelled() => {}
            _ = released_token.cancelled() => {}
        }
        shutdown.cancel();
    });

    info!("Listening for remote buttons on {}", sensor.name());
    let (pressed_result, released_result) = tokio::join!(pressed.join(), released.join());

    for result in [pressed_result, released_result] {
        if let Err(e) = result {
            error!("Remote session failed: {}", e);
            return Err(e.into());
        }
    }

    info!("Shut down cleanly");
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    // Only plain levels ("debug", "warn", ...) are understood
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|value| value.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
