use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use genotypes_loader::config::{ConfigLoader, ResolvedConfig};
use genotypes_loader::domain::{InputFileType, ResolveMode, VocabularyToken};
use genotypes_loader::error::LoaderError;
use genotypes_loader::ingest::{IngestReport, ProgressSink};
use genotypes_loader::loader::GenotypesLoader;
use genotypes_loader::output::{JsonOutput, OutputMode, TextProgress};
use genotypes_loader::store::{ChadoStore, SqliteStore};

#[derive(Parser)]
#[command(name = "genoload")]
#[command(about = "Resolve genotype samples and germplasm into a Chado database")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Create the Chado tables used by the loader")]
    InitDb(InitDbArgs),
    #[command(about = "Add an organism and print its organism_id")]
    AddOrganism(AddOrganismArgs),
    #[command(about = "Add a project and print its project_id")]
    AddProject(AddProjectArgs),
    #[command(about = "Add a vocabulary term and print its cvterm_id")]
    AddTerm(AddTermArgs),
    #[command(about = "Load a samples file and print the source name to sample mapping")]
    Samples(SamplesArgs),
}

#[derive(Args)]
struct AddOrganismArgs {
    #[arg(long)]
    db: Utf8PathBuf,

    #[arg(long)]
    genus: String,

    #[arg(long)]
    species: String,

    #[arg(long)]
    infraspecific_name: Option<String>,
}

#[derive(Args)]
struct AddProjectArgs {
    #[arg(long)]
    db: Utf8PathBuf,

    #[arg(long)]
    name: String,
}

#[derive(Args)]
struct AddTermArgs {
    #[arg(long)]
    db: Utf8PathBuf,

    #[arg(long)]
    cv: String,

    /// DB:ACCESSION of the term.
    #[arg(long)]
    token: VocabularyToken,

    #[arg(long)]
    name: String,
}

#[derive(Args)]
struct InitDbArgs {
    #[arg(long)]
    db: Utf8PathBuf,
}

#[derive(Args)]
struct SamplesArgs {
    #[arg(long)]
    db: Utf8PathBuf,

    #[arg(long)]
    samples: Utf8PathBuf,

    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    samples_mode: Option<ResolveMode>,

    #[arg(long)]
    germplasm_mode: Option<ResolveMode>,

    #[arg(long)]
    organism_id: Option<i64>,

    #[arg(long)]
    project_id: Option<i64>,

    #[arg(long)]
    variant_subtype_id: Option<i64>,

    #[arg(long)]
    marker_subtype_id: Option<i64>,

    #[arg(long)]
    input_type: Option<InputFileType>,

    #[arg(long)]
    input: Option<Utf8PathBuf>,

    /// Roll back every row if any row fails.
    #[arg(long)]
    atomic: bool,

    #[arg(long)]
    output: Option<Utf8PathBuf>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<LoaderError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &LoaderError) -> u8 {
    match error {
        LoaderError::RecordNotFound { .. }
        | LoaderError::RecordAlreadyExists { .. }
        | LoaderError::AmbiguousRecord { .. }
        | LoaderError::MalformedVocabularyToken(_)
        | LoaderError::VocabularyTermNotFound(_)
        | LoaderError::AmbiguousVocabularyTerm { .. }
        | LoaderError::OrganismNotFound(_)
        | LoaderError::AmbiguousOrganism { .. }
        | LoaderError::MalformedFile(_)
        | LoaderError::MalformedRow { .. }
        | LoaderError::BlankField { .. }
        | LoaderError::SampleIsGermplasm { .. } => 2,
        LoaderError::MissingConfig
        | LoaderError::ConfigRead(_)
        | LoaderError::ConfigParse(_)
        | LoaderError::InvalidMode(_)
        | LoaderError::MissingDefault(_)
        | LoaderError::ParameterNotFound { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Verbose
    };

    match cli.command {
        Commands::InitDb(args) => {
            SqliteStore::open(&args.db)?;
            if matches!(output_mode, OutputMode::Verbose) {
                eprintln!("schema ready in {}", args.db);
            }
            Ok(())
        }
        Commands::AddOrganism(args) => {
            let store = SqliteStore::open(&args.db)?;
            let id = store.add_organism(
                &args.genus,
                &args.species,
                args.infraspecific_name.as_deref(),
            )?;
            println!("{id}");
            Ok(())
        }
        Commands::AddProject(args) => {
            let id = SqliteStore::open(&args.db)?.add_project(&args.name)?;
            println!("{id}");
            Ok(())
        }
        Commands::AddTerm(args) => {
            let store = SqliteStore::open(&args.db)?;
            let id = store.add_term(&args.cv, &args.token, &args.name)?;
            println!("{id}");
            Ok(())
        }
        Commands::Samples(args) => run_samples(args, output_mode),
    }
}

fn run_samples(args: SamplesArgs, output_mode: OutputMode) -> miette::Result<()> {
    let mut config = ConfigLoader::resolve(args.config.as_deref())?;
    if let Some(mode) = args.samples_mode {
        config.samples_mode = mode;
    }
    if let Some(mode) = args.germplasm_mode {
        config.germplasm_mode = mode;
    }
    let store = SqliteStore::open(&args.db)?;
    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::Verbose => &TextProgress,
        OutputMode::Quiet => &JsonOutput,
    };

    let report = if args.atomic {
        store.in_transaction(|store| load(store, config, &args, sink))?
    } else {
        load(&store, config, &args, sink)?
    };

    match &args.output {
        Some(path) => JsonOutput::write_report(path, &report)?,
        None => JsonOutput::print_report(&report).into_diagnostic()?,
    }
    Ok(())
}

fn load<S: ChadoStore>(
    store: S,
    config: ResolvedConfig,
    args: &SamplesArgs,
    sink: &dyn ProgressSink,
) -> Result<IngestReport, LoaderError> {
    let mut loader = GenotypesLoader::new(store, config);
    if let Some(id) = args.organism_id {
        loader.set_organism_id(id)?;
    }
    if let Some(id) = args.project_id {
        loader.set_project_id(id)?;
    }
    if let Some(id) = args.variant_subtype_id {
        loader.set_variant_subtype_id(id)?;
    }
    if let Some(id) = args.marker_subtype_id {
        loader.set_marker_subtype_id(id)?;
    }
    if let Some(file_type) = args.input_type {
        loader.set_input_file_type(file_type);
    }
    if let Some(input) = &args.input {
        loader.set_input_path(input.clone());
    }
    loader.set_samples_path(args.samples.clone());
    loader.process_samples_report(sink)
}
