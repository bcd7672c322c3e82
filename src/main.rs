use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use tokio::signal;
use tracing::info;

use clinicdb::reference::CodeTable;
use clinicdb::storage::media::MediaStore;
use clinicdb::views::build_dashboard;
use clinicdb::{load_config, logging, Session, Store, Table, ViewRefresher};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("clinicdb.yaml"));
    let config = load_config(&config_path)?;
    logging::init(&config.logging.filter);

    info!(path = %config.storage.path.display(), "starting clinicdb");
    let store = Arc::new(Store::open(&config.storage.path)?);
    let version = store.ensure_schema()?;
    info!(version, "schema ready");

    let codes = CodeTable::load(&config.reference)?;
    let media = MediaStore::new(&config.storage.media_dir)?;
    info!(codes = codes.len(), media = %media.root().display(), "reference data loaded");

    let session = Session::load(&store)?;
    match session.doctor_id() {
        Some(id) => info!(doctor_id = id, "session restored"),
        None => info!("no doctor signed in"),
    }

    let dashboard = ViewRefresher::spawn(
        Arc::clone(&store),
        vec![Table::Appointments, Table::Patients, Table::Doctors],
        Some(config.refresh.interval()),
        move |store| build_dashboard(store, &session, Local::now().date_naive()),
    );
    let mut updates = dashboard.subscribe();

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let rendered = updates
                    .borrow_and_update()
                    .as_ref()
                    .map(serde_json::to_string_pretty)
                    .transpose()?;
                if let Some(json) = rendered {
                    println!("{json}");
                }
            }
            _ = signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down");
                break;
            }
        }
    }

    drop(dashboard);
    info!("clinicdb stopped");
    Ok(())
}
