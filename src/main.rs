use std::path::PathBuf;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use registry_core::config::{data_dir_from_env_value, storage_backend_from_env_value};
use registry_core::constants::{DATA_DIR_ENV, SEED_FILE_ENV, STORAGE_ENV};
use registry_core::seed::{SeedManifest, seed};
use registry_core::{CoreConfig, HospitalService, PatientService, open_registry};

/// Main entry point for the registry demo
///
/// Opens the configured registry, seeds it when it holds no records yet, and logs every
/// hospital together with the patients registered there.
///
/// # Environment Variables
/// - `REGISTRY_DATA_DIR`: Directory holding `registry.json` (default: "registry_data")
/// - `REGISTRY_STORAGE`: `file` or `memory` (default: "file")
/// - `REGISTRY_SEED_FILE`: YAML seed manifest used instead of the built-in demo data
/// - `RUST_LOG`: Log filter
///
/// # Returns
/// * `Ok(())` - If the registry was opened, seeded and listed
/// * `Err(anyhow::Error)` - If configuration, storage or seeding fails
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("registry_core=info".parse()?)
                .add_directive("registry_run=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = CoreConfig::new(
        data_dir_from_env_value(std::env::var(DATA_DIR_ENV).ok()),
        storage_backend_from_env_value(std::env::var(STORAGE_ENV).ok())?,
    )?;
    tracing::info!("++ Opening {} registry at {}", cfg.storage(), cfg.data_dir().display());

    let (hospitals, patients) = open_registry(&cfg)?;

    if hospitals.find_all_hospitals()?.is_empty() && patients.find_all_patients()?.is_empty() {
        let manifest = load_manifest(std::env::var(SEED_FILE_ENV).ok().map(PathBuf::from))?;
        seed(&hospitals, &patients, &manifest)?;
    } else {
        tracing::info!("registry already holds records, skipping seed");
    }

    log_registry(&hospitals, &patients)?;

    Ok(())
}

fn load_manifest(path: Option<PathBuf>) -> anyhow::Result<SeedManifest> {
    let Some(path) = path else {
        return Ok(SeedManifest::demo(chrono::Local::now().date_naive()));
    };

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("reading seed file {}", path.display()))?;
    Ok(SeedManifest::from_yaml(&raw)?)
}

fn log_registry(hospitals: &HospitalService, patients: &PatientService) -> anyhow::Result<()> {
    for hospital in hospitals.find_all_hospitals()? {
        let registered = hospitals.list_patients_by_hospital(&hospital)?;
        tracing::info!("{} has {} patient(s)", hospital.name, registered.len());
        for patient in &registered {
            tracing::info!("  {} <{}>", patient.full_name(), patient.email);
        }
    }

    for patient in patients.find_all_patients()? {
        let at = patients.list_hospital_by_patient(&patient)?;
        let names: Vec<String> = at.iter().map(|h| h.name.to_string()).collect();
        tracing::info!("{} is registered at [{}]", patient.full_name(), names.join(", "));
    }

    Ok(())
}
