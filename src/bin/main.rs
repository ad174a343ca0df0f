//! EVI RO-Crate CLI
//!
//! Command-line tool for initializing crates, registering provenance
//! entities, and inspecting or packaging crate metadata.

use std::fs;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use evi_rocrate::{
    add_dataset, add_software, categorize_entities, collect_support, determine_release_type,
    generate_evidence_graphs, package_crate, process_composition, process_distribution,
    process_overview, process_use_cases, read_crate, read_crate_from_zip, register_computation,
    register_dataset, register_software, rocrate_create, write_crate, ComputationParams,
    CrateError, CrateInitParams, DatasetParams, GraphContainer, SoftwareParams,
};
use evi_rocrate::register::normalize_keywords;

#[derive(Parser)]
#[command(name = "evi-rocrate")]
#[command(about = "Build, inspect and package EVI RO-Crate metadata graphs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new crate directory
    Init(InitArgs),
    /// Register a dataset entity in an existing crate
    RegisterDataset(DatasetArgs),
    /// Register a software entity in an existing crate
    RegisterSoftware(SoftwareArgs),
    /// Register a computation entity in an existing crate
    RegisterComputation(ComputationArgs),
    /// Copy a file into the crate and register it as a dataset
    AddDataset(AddDatasetArgs),
    /// Copy a file into the crate and register it as software
    AddSoftware(AddSoftwareArgs),
    /// Show the overview projection of a crate
    Overview(InspectArgs),
    /// Show the use-case projection of a crate
    UseCases(InspectArgs),
    /// Show the distribution projection of a crate
    Distribution(InspectArgs),
    /// Show the sub-crates making up a release
    Composition(InspectArgs),
    /// List member entities bucketed by category
    Entities(InspectArgs),
    /// Print the release-level category of a crate
    ReleaseType(InspectArgs),
    /// Show the provenance support of one entity
    Evidence(EvidenceArgs),
    /// Generate evidence graph entities for every member entity
    EvidenceGraphs(EvidenceGraphsArgs),
    /// Package a crate directory into a zip archive
    Package(PackageArgs),
}

#[derive(Args)]
struct InitArgs {
    /// Directory to create the crate in
    path: PathBuf,

    /// Crate name
    #[arg(long)]
    name: String,

    /// Organization the crate belongs to (UVA, UCSB, Stanford, USF)
    #[arg(long)]
    organization: Option<String>,

    /// Project the crate belongs to (CM4AI, Chorus, PreMo)
    #[arg(long)]
    project: Option<String>,

    /// Crate description
    #[arg(long, default_value = "")]
    description: String,

    /// Comma-separated keywords
    #[arg(long, default_value = "")]
    keywords: String,

    /// Use this id instead of minting one
    #[arg(long)]
    guid: Option<String>,
}

#[derive(Args)]
struct DatasetArgs {
    /// Path to the crate directory or metadata file
    crate_path: PathBuf,

    #[arg(long)]
    name: String,

    #[arg(long, default_value = "")]
    author: String,

    #[arg(long, default_value = "")]
    version: String,

    #[arg(long, default_value = "")]
    date_published: String,

    #[arg(long, default_value = "")]
    description: String,

    /// Comma-separated keywords
    #[arg(long, default_value = "")]
    keywords: String,

    #[arg(long, default_value = "")]
    data_format: String,

    #[arg(long)]
    url: Option<String>,

    /// Id of the schema describing this dataset
    #[arg(long)]
    schema: Option<String>,

    /// Ids of entities this dataset was derived from (repeatable)
    #[arg(long = "derived-from")]
    derived_from: Vec<String>,

    /// Ids of computations that use this dataset (repeatable)
    #[arg(long = "used-by")]
    used_by: Vec<String>,

    #[arg(long)]
    associated_publication: Option<String>,

    #[arg(long)]
    guid: Option<String>,
}

#[derive(Args)]
struct SoftwareArgs {
    /// Path to the crate directory or metadata file
    crate_path: PathBuf,

    #[arg(long)]
    name: String,

    #[arg(long, default_value = "")]
    author: String,

    #[arg(long, default_value = "")]
    version: String,

    #[arg(long, default_value = "")]
    description: String,

    /// Comma-separated keywords
    #[arg(long, default_value = "")]
    keywords: String,

    #[arg(long, default_value = "")]
    file_format: String,

    #[arg(long)]
    url: Option<String>,

    #[arg(long)]
    date_modified: Option<String>,

    /// Ids of computations that used this software (repeatable)
    #[arg(long = "used-by-computation")]
    used_by_computation: Vec<String>,

    #[arg(long)]
    associated_publication: Option<String>,

    #[arg(long)]
    guid: Option<String>,
}

#[derive(Args)]
struct ComputationArgs {
    /// Path to the crate directory or metadata file
    crate_path: PathBuf,

    #[arg(long)]
    name: String,

    #[arg(long, default_value = "")]
    run_by: String,

    #[arg(long, default_value = "")]
    date_created: String,

    #[arg(long, default_value = "")]
    description: String,

    /// Comma-separated keywords
    #[arg(long, default_value = "")]
    keywords: String,

    #[arg(long)]
    command: Option<String>,

    /// Ids of software used by this computation (repeatable)
    #[arg(long = "used-software")]
    used_software: Vec<String>,

    /// Ids of datasets used by this computation (repeatable)
    #[arg(long = "used-dataset")]
    used_dataset: Vec<String>,

    /// Ids of datasets generated by this computation (repeatable)
    #[arg(long = "generated")]
    generated: Vec<String>,

    #[arg(long)]
    guid: Option<String>,
}

#[derive(Args)]
struct AddDatasetArgs {
    /// File to copy into the crate
    #[arg(long)]
    source: PathBuf,

    #[command(flatten)]
    dataset: DatasetArgs,
}

#[derive(Args)]
struct AddSoftwareArgs {
    /// File to copy into the crate
    #[arg(long)]
    source: PathBuf,

    #[command(flatten)]
    software: SoftwareArgs,
}

#[derive(Args)]
struct InspectArgs {
    /// Crate directory, metadata file, or packaged .zip archive
    source: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct EvidenceArgs {
    /// Crate directory, metadata file, or packaged .zip archive
    source: PathBuf,

    /// Id of the entity to collect support for
    entity_id: String,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct EvidenceGraphsArgs {
    /// Crate directory or metadata file to rewrite
    crate_path: PathBuf,

    /// Write the augmented document here instead of back in place
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct PackageArgs {
    /// Crate directory to package
    crate_path: PathBuf,

    /// Output zip archive
    #[arg(short, long)]
    output: PathBuf,
}

/// Load crate metadata from a directory, metadata file, or zip archive
fn load_container(source: &PathBuf) -> Result<GraphContainer, CrateError> {
    let is_zip = source
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("zip"));
    if is_zip {
        read_crate_from_zip(source)
    } else {
        read_crate(source)
    }
}

/// Write output to file or stdout
fn write_output(content: &str, output: Option<&PathBuf>) -> Result<(), CrateError> {
    match output {
        Some(path) => {
            fs::write(path, content)?;
            eprintln!("Wrote output to {}", path.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}

fn print_projection<T: Serialize>(record: &T, output: Option<&PathBuf>) -> Result<(), CrateError> {
    let content = serde_json::to_string_pretty(record)?;
    write_output(&content, output)
}

fn dataset_params(args: &DatasetArgs) -> DatasetParams {
    DatasetParams {
        name: args.name.clone(),
        author: args.author.clone(),
        version: args.version.clone(),
        date_published: args.date_published.clone(),
        description: args.description.clone(),
        keywords: normalize_keywords(&args.keywords),
        data_format: args.data_format.clone(),
        url: args.url.clone(),
        schema: args.schema.clone(),
        derived_from: args.derived_from.clone(),
        used_by: args.used_by.clone(),
        associated_publication: args.associated_publication.clone(),
        additional_documentation: None,
        filepath: None,
        guid: args.guid.clone(),
    }
}

fn software_params(args: &SoftwareArgs) -> SoftwareParams {
    SoftwareParams {
        name: args.name.clone(),
        author: args.author.clone(),
        version: args.version.clone(),
        description: args.description.clone(),
        keywords: normalize_keywords(&args.keywords),
        file_format: args.file_format.clone(),
        url: args.url.clone(),
        date_modified: args.date_modified.clone(),
        used_by_computation: args.used_by_computation.clone(),
        associated_publication: args.associated_publication.clone(),
        additional_documentation: None,
        filepath: None,
        guid: args.guid.clone(),
    }
}

fn run(command: Commands) -> Result<(), CrateError> {
    match command {
        Commands::Init(args) => {
            let guid = rocrate_create(
                &args.path,
                &CrateInitParams {
                    name: args.name,
                    organization: args.organization,
                    project: args.project,
                    description: args.description,
                    keywords: normalize_keywords(&args.keywords),
                    guid: args.guid,
                },
            )?;
            println!("{}", guid);
            Ok(())
        }
        Commands::RegisterDataset(args) => {
            let guid = register_dataset(&args.crate_path, &dataset_params(&args))?;
            println!("{}", guid);
            Ok(())
        }
        Commands::RegisterSoftware(args) => {
            let guid = register_software(&args.crate_path, &software_params(&args))?;
            println!("{}", guid);
            Ok(())
        }
        Commands::RegisterComputation(args) => {
            let guid = register_computation(
                &args.crate_path,
                &ComputationParams {
                    name: args.name,
                    run_by: args.run_by,
                    date_created: args.date_created,
                    description: args.description,
                    keywords: normalize_keywords(&args.keywords),
                    command: args.command,
                    used_software: args.used_software,
                    used_dataset: args.used_dataset,
                    generated: args.generated,
                    guid: args.guid,
                },
            )?;
            println!("{}", guid);
            Ok(())
        }
        Commands::AddDataset(args) => {
            let guid = add_dataset(
                &args.dataset.crate_path,
                &dataset_params(&args.dataset),
                &args.source,
            )?;
            println!("{}", guid);
            Ok(())
        }
        Commands::AddSoftware(args) => {
            let guid = add_software(
                &args.software.crate_path,
                &software_params(&args.software),
                &args.source,
            )?;
            println!("{}", guid);
            Ok(())
        }
        Commands::Overview(args) => {
            let document = load_container(&args.source)?.to_document();
            print_projection(&process_overview(&document), args.output.as_ref())
        }
        Commands::UseCases(args) => {
            let document = load_container(&args.source)?.to_document();
            print_projection(&process_use_cases(&document), args.output.as_ref())
        }
        Commands::Distribution(args) => {
            let document = load_container(&args.source)?.to_document();
            print_projection(&process_distribution(&document), args.output.as_ref())
        }
        Commands::Composition(args) => {
            let document = load_container(&args.source)?.to_document();
            print_projection(&process_composition(&document), args.output.as_ref())
        }
        Commands::Entities(args) => {
            let document = load_container(&args.source)?.to_document();
            print_projection(&categorize_entities(&document), args.output.as_ref())
        }
        Commands::ReleaseType(args) => {
            let document = load_container(&args.source)?.to_document();
            let category = determine_release_type(&document);
            write_output(&category.to_string(), args.output.as_ref())
        }
        Commands::Evidence(args) => {
            let container = load_container(&args.source)?;
            let entity =
                container
                    .find_entity(&args.entity_id)
                    .ok_or_else(|| CrateError::InvalidStructure(format!(
                        "no entity with @id '{}'",
                        args.entity_id
                    )))?;
            let support = collect_support(entity, &container.graph);
            print_projection(&support, args.output.as_ref())
        }
        Commands::EvidenceGraphs(args) => {
            let mut container = read_crate(&args.crate_path)?;
            generate_evidence_graphs(&mut container);
            let target = args.output.as_ref().unwrap_or(&args.crate_path);
            write_crate(target, &container)?;
            eprintln!("Wrote evidence graphs to {}", target.display());
            Ok(())
        }
        Commands::Package(args) => {
            let count = package_crate(&args.crate_path, &args.output)?;
            eprintln!(
                "Packaged {} files into {}",
                count,
                args.output.display()
            );
            Ok(())
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
