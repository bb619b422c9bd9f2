use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;

use crate::cli::Commands;
use taskdash_api::config;
use taskdash_core::{ExportSettings, TaskSource};
use taskdash_db::Database;
use taskdash_export::{ArtifactFormat, Exporter};

pub async fn execute(command: Commands, db: Arc<Database>) -> Result<()> {
    match command {
        Commands::InitDb => {
            db.init_schema().await?;
            println!("✓ Database schema ready");
        }

        Commands::SeedUser {
            username,
            password,
            email,
            role,
        } => {
            let user = db
                .create_user(&username, &password, email.as_deref(), &role)
                .await?;
            println!("✓ User created: {} ({})", user.username, user.role);
        }

        Commands::Export {
            format,
            destination: None,
        } => {
            let format = ArtifactFormat::from_str(&format)?;
            let source: Arc<dyn TaskSource> = db;
            let exporter = Exporter::new("cli", source, None, ExportSettings::default());

            let rendered = exporter.render(format).await?;
            println!("{}", rendered.content);
        }

        Commands::Export {
            format: _,
            destination: Some(destination),
        } => {
            let store = match destination.as_str() {
                "s3" => config::connect_s3_store().await,
                "drive" => config::connect_drive_store().await,
                other => anyhow::bail!("Unknown destination: {}", other),
            };

            let Some(store) = store else {
                anyhow::bail!("Store client unavailable for '{}'", destination);
            };

            let source: Arc<dyn TaskSource> = db;
            let exporter = Exporter::new(
                destination.clone(),
                source,
                Some(store),
                ExportSettings::new(true, 5)?,
            );

            let outcome = exporter.trigger_manual().await;
            if outcome.success {
                println!("✓ {}", outcome.message);
            } else {
                anyhow::bail!(outcome.message);
            }
        }
    }

    Ok(())
}
