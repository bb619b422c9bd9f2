use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskdash_api::{config, routes, state};
use taskdash_core::TaskSource;
use taskdash_db::Database;
use taskdash_export::Exporter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskdash_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let app_config = config::AppConfig::from_env()?;

    // Initialize database
    let db = Database::new(&app_config.database_url).await?;
    db.init_schema().await?;
    let db = Arc::new(db);
    let source: Arc<dyn TaskSource> = db.clone();

    // Object store clients; a failed connection leaves the exporter without
    // a client rather than aborting startup
    let s3_store = if app_config.s3_enabled {
        config::connect_s3_store().await
    } else {
        tracing::info!("S3 export disabled");
        None
    };

    let drive_store = if app_config.drive_enabled {
        config::connect_drive_store().await
    } else {
        tracing::info!("Drive export disabled");
        None
    };

    // Exporters, one per destination
    let s3_exporter = Exporter::new(
        "s3",
        source.clone(),
        s3_store,
        app_config.export_settings(app_config.s3_enabled)?,
    );
    let drive_exporter = Exporter::new(
        "drive",
        source.clone(),
        drive_store,
        app_config.export_settings(app_config.drive_enabled)?,
    );

    // Auto-start enabled exporters
    if app_config.s3_enabled {
        let outcome = s3_exporter.start().await;
        if !outcome.success {
            tracing::warn!(message = %outcome.message, "S3 auto-export not started");
        }
    }
    if app_config.drive_enabled {
        let outcome = drive_exporter.start().await;
        if !outcome.success {
            tracing::warn!(message = %outcome.message, "Drive auto-export not started");
        }
    }

    // Create app state
    let state = state::ApiState {
        db,
        s3_exporter: s3_exporter.clone(),
        drive_exporter: drive_exporter.clone(),
    };

    // Build router
    let app = routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", app_config.port);
    tracing::info!("Taskdash API server running on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let shutdown = async move {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::error!("Failed to listen for shutdown signal");
            return;
        }
        tracing::info!("Shutting down");
        s3_exporter.stop().await;
        drive_exporter.stop().await;
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
