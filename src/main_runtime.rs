use agentdash::config::LoggingConfig;
use std::future::Future;
use tokio::signal;
use tracing::error;
use tracing_subscriber::EnvFilter;

pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},agentdash=debug,sqlx=warn", config.level)));

    // Prefer AGENTDASH_LOG_DIR, fall back to LOG_DIR or /var/log/agentdash.
    let log_dir = std::env::var("AGENTDASH_LOG_DIR")
        .or_else(|_| std::env::var("LOG_DIR"))
        .unwrap_or_else(|_| "/var/log/agentdash".to_string());

    // `tracing_appender::rolling::daily` panics if it can't create the initial
    // log file, so writability is checked first.
    let file_layer = if std::fs::create_dir_all(&log_dir).is_ok() {
        let test_path = std::path::Path::new(&log_dir).join(".agentdash_write_test");
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&test_path)
        {
            Ok(_) => {
                let _ = std::fs::remove_file(&test_path);

                let file_appender = tracing_appender::rolling::daily(&log_dir, "agentdash.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

                // Lives as long as the server process
                Box::leak(Box::new(guard));

                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true),
                )
            }
            Err(e) => {
                eprintln!(
                    "Warning: Could not write to log directory {} ({}), file logging disabled",
                    log_dir, e
                );
                None
            }
        }
    } else {
        eprintln!(
            "Warning: Could not create log directory {}, file logging disabled",
            log_dir
        );
        None
    };

    let json_layer = config
        .json
        .then(|| tracing_subscriber::fmt::layer().json().with_target(true));
    let text_layer = (!config.json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
    });

    let file_logging_enabled = file_layer.is_some();
    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .with(file_layer)
        .init();

    if file_logging_enabled {
        eprintln!("Logging to: {}/agentdash.log", log_dir);
    }
}

pub fn init_logging_simple() {
    // One-shot reports keep stdout for JSON
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Resolves once the signal arrives. A handler that failed to install never
/// resolves, so it cannot trigger a shutdown on its own.
async fn wait_for<F>(name: &str, received: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = received.await {
        error!("Failed to install {} handler: {}", name, e);
        std::future::pending::<()>().await;
    }
}

pub async fn shutdown_signal() {
    let ctrl_c = wait_for("Ctrl+C", signal::ctrl_c());

    #[cfg(unix)]
    let terminate = wait_for("SIGTERM", async {
        let mut stream = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        stream.recv().await;
        Ok::<(), std::io::Error>(())
    });

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
