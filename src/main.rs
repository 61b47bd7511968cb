use std::path::Path;
use std::sync::Arc;

use ai_mailer::api::{AppState, api_routes};
use ai_mailer::compose::EmailDrafter;
use ai_mailer::config::AppConfig;
use ai_mailer::llm::create_provider;
use ai_mailer::mail::{EmailOrchestrator, SmtpMailer};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export SMTP_HOST=smtp.example.com SMTP_USERNAME=... ANTHROPIC_API_KEY=sk-ant-...");
        std::process::exit(1);
    });

    let _log_guard = init_tracing(config.log_dir.as_deref());

    eprintln!("✉️  AI Mailer v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {} ({:?})", config.llm.model, config.llm.backend);
    eprintln!(
        "   SMTP: {}:{} (tls: {}, from: {})",
        config.smtp.host, config.smtp.port, config.smtp.tls, config.smtp.from_address
    );
    eprintln!("   API: http://{}/api/email", config.server.bind_addr());
    if let Some(dir) = &config.log_dir {
        eprintln!("   Logs: {}", dir.display());
    }

    let llm = create_provider(&config.llm)?;
    let drafter = Arc::new(EmailDrafter::new(llm, config.draft.clone()));

    let transport = Arc::new(SmtpMailer::new(&config.smtp)?);
    let orchestrator = Arc::new(EmailOrchestrator::new(
        transport,
        &config.smtp.from_address,
        config.smtp.from_name.clone(),
    )?);

    let app = api_routes(
        AppState {
            drafter,
            orchestrator,
        },
        &config.server.cors_origins,
    );

    let listener = tokio::net::TcpListener::bind(config.server.bind_addr()).await?;
    tracing::info!(addr = %config.server.bind_addr(), "HTTP server started");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// stderr always; a daily-rolling file too when a log directory is set.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "ai-mailer.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    guard
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
