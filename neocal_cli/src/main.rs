use clap::{Parser, Subcommand};
use neocal_core::records::read_records;
use neocal_core::render::render_print_html;
use neocal_core::settings::resolve_active;
use neocal_core::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "neocal")]
#[command(about = "Neonatal care milestone calendar", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use a specific config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Treat this run as offline (records are flagged for sync)
    #[arg(long, global = true)]
    offline: bool,

    /// Debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate the milestone calendar for an infant
    Calculate {
        /// Date of birth (YYYY-MM-DD)
        #[arg(long, default_value = "")]
        dob: String,

        /// Completed weeks of gestation at birth
        #[arg(long, default_value = "")]
        weeks: String,

        /// Additional days of gestation (0-7)
        #[arg(long, default_value = "")]
        days: String,

        /// Birth weight in kg
        #[arg(long, default_value = "")]
        weight: String,

        /// Patient name for the printout and history
        #[arg(long)]
        name: Option<String>,

        /// NHS number for the printout and history
        #[arg(long)]
        nhs_number: Option<String>,

        /// Show the calendar without storing a record
        #[arg(long)]
        dry_run: bool,

        /// Print the schedule as JSON
        #[arg(long)]
        json: bool,

        /// Also write a printable HTML document
        #[arg(long, value_name = "FILE")]
        print: Option<PathBuf>,
    },

    /// List stored calculations, newest first
    History,

    /// Mark calculations made offline as synced
    Sync,

    /// Export stored calculations to CSV
    Export {
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
    },

    /// Manage clinical settings profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// List profiles
    List,
    /// Show the settings in force
    Show,
    /// Create a profile and make it active
    Create {
        name: String,
        /// TOML file with thresholds (missing keys take defaults)
        #[arg(long, value_name = "FILE")]
        from: Option<PathBuf>,
    },
    /// Rename the active profile and optionally replace its thresholds
    Update {
        name: String,
        #[arg(long, value_name = "FILE")]
        from: Option<PathBuf>,
    },
    /// Make a profile active
    Activate { id: u64 },
    /// Delete a profile
    Delete { id: u64 },
    /// Restore the active profile's thresholds to the defaults
    Reset,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.verbose {
        neocal_core::logging::init_with_level("debug");
    } else {
        neocal_core::logging::init();
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::Validation(violations)) => {
            for message in violations.messages() {
                eprintln!("{}", message);
            }
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(dir) = cli.data_dir {
        config.data.data_dir = dir;
    }
    let online = config.sync.online && !cli.offline;

    match cli.command {
        Commands::Calculate {
            dob,
            weeks,
            days,
            weight,
            name,
            nhs_number,
            dry_run,
            json,
            print,
        } => {
            let raw = RawPatientInput {
                date_of_birth: dob,
                gestation_weeks: weeks,
                gestation_days: days,
                birth_weight_kg: weight,
            };
            let details = PatientDetails { name, nhs_number };
            cmd_calculate(&config, online, &raw, &details, dry_run, json, print.as_deref())
        }
        Commands::History => cmd_history(&config),
        Commands::Sync => cmd_sync(&config, online),
        Commands::Export { out } => cmd_export(&config, &out),
        Commands::Profile { action } => cmd_profile(&config, action),
    }
}

fn cmd_calculate(
    config: &Config,
    online: bool,
    raw: &RawPatientInput,
    details: &PatientDetails,
    dry_run: bool,
    json: bool,
    print: Option<&Path>,
) -> Result<()> {
    // Read-only: calculating never writes the profile store
    let profiles = ProfileStore::new(config.profiles_path());
    let mut store = JsonlRecordStore::new(config.records_path());
    let sink: Option<&mut dyn RecordSink> = if dry_run { None } else { Some(&mut store) };

    let outcome = calculate(raw, details, &profiles, sink, online)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.schedule)?);
    } else {
        print!("{}", outcome.rendered);
    }

    if let Some(path) = print {
        let html = render_print_html(&outcome.schedule, &outcome.input, details);
        std::fs::write(path, html)?;
        if !json {
            println!("\n✓ Printable calendar written to {}", path.display());
        }
    }

    match outcome.persistence {
        PersistenceStatus::Saved(id) => {
            if !json {
                let suffix = if online { "" } else { " (pending sync)" };
                println!("\n✓ Calculation saved: {}{}", id, suffix);
            }
        }
        PersistenceStatus::Skipped => {
            if !json {
                println!("\n[Dry run - calculation not saved]");
            }
        }
        PersistenceStatus::Failed(e) => {
            eprintln!("Warning: calculation could not be saved: {}", e);
        }
    }

    Ok(())
}

fn newest_first(config: &Config) -> Result<Vec<CalculationRecord>> {
    let mut records = read_records(&config.records_path())?;
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(records)
}

fn cmd_history(config: &Config) -> Result<()> {
    let records = newest_first(config)?;
    if records.is_empty() {
        println!("No calculations stored yet.");
        return Ok(());
    }

    for record in &records {
        let name = record.details.name.as_deref().unwrap_or("-");
        let pending = if record.needs_sync { "  [pending sync]" } else { "" };
        println!(
            "{}  {}  {}  DOB {}  {}+{} weeks  {} kg{}",
            record.timestamp.format("%Y-%m-%d %H:%M"),
            record.id,
            name,
            record.input.date_of_birth,
            record.input.gestation_weeks,
            record.input.gestation_days,
            record.input.birth_weight_kg,
            pending
        );
    }
    println!("\n{} calculations", records.len());
    Ok(())
}

fn cmd_sync(config: &Config, online: bool) -> Result<()> {
    if !online {
        println!("Offline - nothing synced.");
        return Ok(());
    }

    let mut store = JsonlRecordStore::new(config.records_path());
    let count = reconcile_pending(&mut store)?;
    println!("✓ Synced {} calculations", count);
    Ok(())
}

fn cmd_export(config: &Config, out: &Path) -> Result<()> {
    let records = newest_first(config)?;
    let count = export_records_csv(&records, out)?;
    println!("✓ Exported {} calculations", count);
    println!("  CSV: {}", out.display());
    Ok(())
}

fn settings_from(path: Option<&Path>) -> Result<Option<ClinicalSettings>> {
    match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)?;
            Ok(Some(ClinicalSettings::from_toml_str(&contents)?))
        }
        None => Ok(None),
    }
}

fn cmd_profile(config: &Config, action: ProfileAction) -> Result<()> {
    let store = ProfileStore::new(config.profiles_path());
    store.ensure_default()?;

    match action {
        ProfileAction::List => {
            for profile in store.list()? {
                let marker = if profile.is_active { "*" } else { " " };
                println!("{} {:>3}  {}", marker, profile.id, profile.name);
            }
        }
        ProfileAction::Show => {
            let profiles = store.list()?;
            if let Some(active) = profiles.iter().find(|p| p.is_active) {
                println!("# Profile: {}", active.name);
            }
            print!("{}", resolve_active(&profiles).to_toml_string()?);
        }
        ProfileAction::Create { name, from } => {
            let settings = settings_from(from.as_deref())?.unwrap_or_default();
            let profile = store.create(&name, &settings)?;
            println!("✓ Created profile {} ({}) and made it active", profile.name, profile.id);
        }
        ProfileAction::Update { name, from } => {
            let settings = match settings_from(from.as_deref())? {
                Some(settings) => settings,
                None => store.active_settings(),
            };
            let profile = store.update_active(&name, &settings)?;
            println!("✓ Updated profile {} ({})", profile.name, profile.id);
        }
        ProfileAction::Activate { id } => {
            let profile = store.activate(id)?;
            println!("✓ Activated profile {} ({})", profile.name, profile.id);
        }
        ProfileAction::Delete { id } => {
            let profile = store.delete(id)?;
            println!("✓ Deleted profile {} ({})", profile.name, profile.id);
        }
        ProfileAction::Reset => {
            let profile = store.reset_defaults()?;
            println!("✓ Reset profile {} to default thresholds", profile.name);
        }
    }

    Ok(())
}
