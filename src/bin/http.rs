#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use site_schedule::{
        ProjectId, ProjectMetadata, Schedule,
        config::{AppConfig, init_tracing},
        http_api::{self, AppState},
    };

    init_tracing("info");
    let config = AppConfig::from_env()?;
    let calendar = config.load_calendar()?;
    let project_id = config.project_id.unwrap_or_else(ProjectId::generate);
    let metadata = ProjectMetadata::new(project_id, "Site Schedule");

    let state = match &config.db_path {
        #[cfg(feature = "sqlite")]
        Some(path) => {
            use site_schedule::persistence::{SqliteTaskStore, load_schedule};
            use std::sync::Arc;

            let store = Arc::new(SqliteTaskStore::new(path)?);
            let schedule = load_schedule(store.as_ref(), metadata, calendar)?;
            tracing::info!(db = %path.display(), %project_id, "using sqlite store");
            AppState::with_store(schedule, store)
        }
        #[cfg(not(feature = "sqlite"))]
        Some(_) => {
            return Err("SITE_SCHEDULE_DB is set but the `sqlite` feature is disabled".into());
        }
        None => AppState::new(Schedule::new(metadata, calendar)),
    };

    println!("site-schedule HTTP API listening on http://{}", config.http_addr);
    http_api::serve(config.http_addr, state).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
