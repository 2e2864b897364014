use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use registry_core::config::{data_dir_from_env_value, storage_backend_from_env_value};
use registry_core::constants::{DATA_DIR_ENV, STORAGE_ENV};
use registry_core::seed::{seed, SeedManifest};
use registry_core::{
    open_registry, CoreConfig, EntityKind, Hospital, HospitalId, HospitalService, NewPatient,
    Patient, PatientId, PatientService, Registration, RegistryError, RegistryResult, Sex,
    StorageBackend,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "registry")]
#[command(about = "Hospital and patient registry CLI")]
struct Cli {
    /// Registry data directory (overrides REGISTRY_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use a throwaway in-memory registry
    #[arg(long, global = true)]
    memory: bool,

    /// Log registry operations
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a hospital
    CreateHospital {
        name: String,
        #[arg(long, default_value = "")]
        address: String,
        #[arg(long, default_value = "")]
        phone: String,
    },
    /// List all hospitals
    ListHospitals,
    /// Show a hospital and its patients
    ShowHospital { id: u64 },
    /// Replace name, address and phone of a hospital
    UpdateHospital {
        id: u64,
        name: String,
        address: String,
        phone: String,
    },
    /// Delete a hospital (its patients are kept)
    DeleteHospital { id: u64 },
    /// Create a patient
    CreatePatient {
        first_name: String,
        last_name: String,
        /// Date of birth (YYYY-MM-DD)
        birth_date: NaiveDate,
        email: String,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        /// female, male, other or unknown
        #[arg(long)]
        sex: Option<Sex>,
        #[arg(long)]
        diagnosis: Option<String>,
    },
    /// List all patients
    ListPatients,
    /// Show a patient and their hospitals
    ShowPatient { id: u64 },
    /// Replace first name, last name and email of a patient
    UpdatePatient {
        id: u64,
        first_name: String,
        last_name: String,
        email: String,
    },
    /// Delete a patient (their hospitals are kept)
    DeletePatient { id: u64 },
    /// Record a diagnosis for a patient
    AddDiagnosis { id: u64, diagnosis: String },
    /// Register a patient at a hospital
    Register { patient_id: u64, hospital_id: u64 },
    /// Remove a patient's registration at a hospital
    Unregister { patient_id: u64, hospital_id: u64 },
    /// Load demo data, or a YAML seed manifest
    Seed {
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let Some(command) = cli.command else {
        println!("Use 'registry --help' for commands");
        return Ok(());
    };

    let cfg = resolve_config(cli.data_dir, cli.memory)?;
    let (hospitals, patients) = open_registry(&cfg)?;

    if let Err(e) = run(command, &hospitals, &patients) {
        eprintln!("Error: {}", e);
        std::process::exit(match e {
            RegistryError::NotFound { .. } => 2,
            _ => 1,
        });
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "registry_core=info"
    } else {
        "registry_core=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

fn resolve_config(data_dir: Option<PathBuf>, memory: bool) -> RegistryResult<CoreConfig> {
    let data_dir =
        data_dir.unwrap_or_else(|| data_dir_from_env_value(std::env::var(DATA_DIR_ENV).ok()));
    let storage = if memory {
        StorageBackend::Memory
    } else {
        storage_backend_from_env_value(std::env::var(STORAGE_ENV).ok())?
    };
    CoreConfig::new(data_dir, storage)
}

fn run(command: Commands, hospitals: &HospitalService, patients: &PatientService) -> RegistryResult<()> {
    match command {
        Commands::CreateHospital {
            name,
            address,
            phone,
        } => {
            let hospital = hospitals.create_hospital(&name, &address, &phone)?;
            println!("Created hospital {}", describe_hospital(&hospital));
        }
        Commands::ListHospitals => {
            let all = hospitals.find_all_hospitals()?;
            if all.is_empty() {
                println!("No hospitals found.");
            }
            for hospital in all {
                println!("{}", describe_hospital(&hospital));
            }
        }
        Commands::ShowHospital { id } => {
            let hospital = require_hospital(hospitals, id)?;
            println!("{}", describe_hospital(&hospital));
            println!("  address: {}", hospital.address);
            println!("  phone: {}", hospital.phone);
            let registered = hospitals.list_patients_by_hospital(&hospital)?;
            println!("  patients: {}", registered.len());
            for patient in registered {
                println!("    {}", describe_patient(&patient));
            }
        }
        Commands::UpdateHospital {
            id,
            name,
            address,
            phone,
        } => {
            let hospital =
                hospitals.update_hospital_by_id(HospitalId::new(id), &name, &address, &phone)?;
            println!("Updated hospital {}", describe_hospital(&hospital));
        }
        Commands::DeleteHospital { id } => {
            let detached = hospitals.delete_hospital_by_id(HospitalId::new(id))?;
            println!(
                "Deleted hospital {} (detached {} patient(s))",
                id,
                detached.len()
            );
        }
        Commands::CreatePatient {
            first_name,
            last_name,
            birth_date,
            email,
            address,
            phone,
            sex,
            diagnosis,
        } => {
            let patient = patients.create_patient_with_details(NewPatient {
                first_name,
                last_name,
                address,
                email,
                phone,
                date_of_birth: birth_date,
                sex,
                diagnosis,
            })?;
            println!("Created patient {}", describe_patient(&patient));
        }
        Commands::ListPatients => {
            let all = patients.find_all_patients()?;
            if all.is_empty() {
                println!("No patients found.");
            }
            for patient in all {
                println!("{}", describe_patient(&patient));
            }
        }
        Commands::ShowPatient { id } => {
            let patient = require_patient(patients, id)?;
            println!("{}", describe_patient(&patient));
            println!("  email: {}", patient.email);
            println!("  date of birth: {}", patient.date_of_birth);
            if let Some(sex) = patient.sex {
                println!("  sex: {}", sex);
            }
            if let Some(diagnosis) = &patient.diagnosis {
                println!("  diagnosis: {}", diagnosis);
            }
            let registered = patients.list_hospital_by_patient(&patient)?;
            println!("  hospitals: {}", registered.len());
            for hospital in registered {
                println!("    {}", describe_hospital(&hospital));
            }
        }
        Commands::UpdatePatient {
            id,
            first_name,
            last_name,
            email,
        } => {
            let patient =
                patients.update_patient_by_id(PatientId::new(id), &first_name, &last_name, &email)?;
            println!("Updated patient {}", describe_patient(&patient));
        }
        Commands::DeletePatient { id } => {
            let detached = patients.delete_patient_by_id(PatientId::new(id))?;
            println!(
                "Deleted patient {} (detached from {} hospital(s))",
                id,
                detached.len()
            );
        }
        Commands::AddDiagnosis { id, diagnosis } => {
            let patient = patients.add_diagnosis_by_id(PatientId::new(id), &diagnosis)?;
            println!("Recorded diagnosis for {}", describe_patient(&patient));
        }
        Commands::Register {
            patient_id,
            hospital_id,
        } => {
            let patient = require_patient(patients, patient_id)?;
            let hospital = require_hospital(hospitals, hospital_id)?;
            match patients.register_patient(&patient, &hospital)? {
                Registration::Linked(_) => println!(
                    "Registered {} at {}",
                    patient.full_name(),
                    hospital.name
                ),
                Registration::AlreadyLinked(_) => println!(
                    "{} is already registered at {}",
                    patient.full_name(),
                    hospital.name
                ),
            }
        }
        Commands::Unregister {
            patient_id,
            hospital_id,
        } => {
            let patient = require_patient(patients, patient_id)?;
            let hospital = require_hospital(hospitals, hospital_id)?;
            if patients.unregister_patient(&patient, &hospital)? {
                println!("Unregistered {} from {}", patient.full_name(), hospital.name);
            } else {
                println!("{} was not registered at {}", patient.full_name(), hospital.name);
            }
        }
        Commands::Seed { file } => {
            let manifest = match file {
                Some(path) => {
                    let raw = std::fs::read_to_string(&path).map_err(|e| {
                        RegistryError::InvalidInput(format!(
                            "cannot read seed file {}: {}",
                            path.display(),
                            e
                        ))
                    })?;
                    SeedManifest::from_yaml(&raw)?
                }
                None => SeedManifest::demo(chrono::Local::now().date_naive()),
            };
            let report = seed(hospitals, patients, &manifest)?;
            println!(
                "Seeded {} hospital(s), {} patient(s), {} registration(s)",
                report.hospitals.len(),
                report.patients.len(),
                report.registrations
            );
        }
    }

    Ok(())
}

fn require_hospital(hospitals: &HospitalService, id: u64) -> RegistryResult<Hospital> {
    hospitals
        .find_hospital_by_id(HospitalId::new(id))?
        .ok_or_else(|| RegistryError::not_found(EntityKind::Hospital, id))
}

fn require_patient(patients: &PatientService, id: u64) -> RegistryResult<Patient> {
    patients
        .find_patient_by_id(PatientId::new(id))?
        .ok_or_else(|| RegistryError::not_found(EntityKind::Patient, id))
}

fn describe_hospital(hospital: &Hospital) -> String {
    match hospital.id() {
        Some(id) => format!("[{}] {}", id, hospital.name),
        None => hospital.name.to_string(),
    }
}

fn describe_patient(patient: &Patient) -> String {
    match patient.id() {
        Some(id) => format!("[{}] {}", id, patient.full_name()),
        None => patient.full_name(),
    }
}
