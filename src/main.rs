use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use heritage_rdf::{
    config::{Configuration, OutputFormat},
    core::{DocumentStats, DocumentTripleBuilder, TabularTripleBuilder},
    handlers::{discover_csv_files, CsvFile, TableSource, TeiDocument},
    knowledge_graph::{GraphSink, KnowledgeGraph},
    templates::HtmlRenderer,
    utils::validate_rdf_triples,
};

#[derive(Parser)]
#[command(
    name = "heritage_rdf",
    about = "Convert cultural-heritage CSV triples and TEI documents into RDF and HTML",
    long_about = None,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert Subject/Property/Object CSV files into one graph
    Tabular {
        /// Configuration file path
        #[arg(short, long, env = "HERITAGE_RDF_CONFIG")]
        config: Option<PathBuf>,

        /// CSV files to convert (overrides the configured sources)
        #[arg(short, long)]
        input: Vec<PathBuf>,

        /// Convert every CSV file in this directory
        #[arg(long)]
        input_dir: Option<PathBuf>,

        /// Primary output file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Primary output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormatArg>,

        /// Secondary (RDF/XML) output file
        #[arg(long)]
        secondary_output: Option<PathBuf>,

        /// Write the batch report as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// Check generated IRIs
        #[arg(long)]
        validate: bool,

        /// Fail when no source could be loaded
        #[arg(long)]
        fail_on_empty: bool,
    },

    /// Convert a TEI document into a graph
    Document {
        /// Configuration file path
        #[arg(short, long, env = "HERITAGE_RDF_CONFIG")]
        config: Option<PathBuf>,

        /// TEI XML file
        #[arg(short, long)]
        input: PathBuf,

        /// Primary output file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Primary output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormatArg>,

        /// Secondary (RDF/XML) output file
        #[arg(long)]
        secondary_output: Option<PathBuf>,
    },

    /// Render a TEI document as an HTML reading edition
    Render {
        /// Configuration file path
        #[arg(short, long, env = "HERITAGE_RDF_CONFIG")]
        config: Option<PathBuf>,

        /// TEI XML file
        #[arg(short, long)]
        input: PathBuf,

        /// HTML output file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Generate example configuration file
    GenerateConfig {
        /// Output path for configuration file
        #[arg(short, long)]
        output: PathBuf,

        /// Configuration format (yaml or json)
        #[arg(short, long, default_value = "yaml")]
        format: ConfigFormat,
    },

    /// Show statistics of a Turtle or N-Triples file
    Stats {
        /// Graph file
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[derive(clap::ValueEnum, Clone)]
enum OutputFormatArg {
    Turtle,
    NTriples,
    RdfXml,
    JsonLd,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(format: OutputFormatArg) -> Self {
        match format {
            OutputFormatArg::Turtle => Self::Turtle,
            OutputFormatArg::NTriples => Self::NTriples,
            OutputFormatArg::RdfXml => Self::RdfXml,
            OutputFormatArg::JsonLd => Self::JsonLd,
        }
    }
}

#[derive(clap::ValueEnum, Clone)]
enum ConfigFormat {
    Yaml,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.debug {
        tracing::Level::DEBUG
    } else if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Tabular {
            config,
            input,
            input_dir,
            output,
            format,
            secondary_output,
            report,
            validate,
            fail_on_empty,
        } => tabular_command(
            config,
            input,
            input_dir,
            output,
            format,
            secondary_output,
            report,
            validate,
            fail_on_empty,
        ),
        Commands::Document {
            config,
            input,
            output,
            format,
            secondary_output,
        } => document_command(config, input, output, format, secondary_output),
        Commands::Render { config, input, output } => render_command(config, input, output),
        Commands::Validate { config } => validate_command(config),
        Commands::GenerateConfig { output, format } => generate_config_command(output, format),
        Commands::Stats { input } => stats_command(input),
    }
}

fn load_config(path: Option<&Path>) -> Result<Configuration> {
    let config = Configuration::load_or_default(path)?;
    config.validate()?;
    if let Some(path) = path {
        info!("Loaded configuration {} from {}", config.name, path.display());
    }
    Ok(config)
}

/// CLI inputs win over the configured sources; a directory is expanded to its CSV files.
fn resolve_sources(config: &Configuration, input: Vec<PathBuf>, input_dir: Option<PathBuf>) -> Vec<PathBuf> {
    if !input.is_empty() {
        return input;
    }
    if let Some(dir) = input_dir.or_else(|| config.tabular.source_dir.clone()) {
        let mut sources = config.tabular.sources.clone();
        sources.extend(discover_csv_files(&dir));
        return sources;
    }
    config.tabular.sources.clone()
}

#[allow(clippy::too_many_arguments)]
fn tabular_command(
    config_path: Option<PathBuf>,
    input: Vec<PathBuf>,
    input_dir: Option<PathBuf>,
    output: Option<PathBuf>,
    format: Option<OutputFormatArg>,
    secondary_output: Option<PathBuf>,
    report_path: Option<PathBuf>,
    validate: bool,
    fail_on_empty: bool,
) -> Result<()> {
    println!("{}", "Starting CSV to RDF conversion...".bright_blue().bold());

    let config = load_config(config_path.as_deref())?;
    let settings = &config.tabular;
    let output = output.unwrap_or_else(|| settings.output.clone());
    let format: OutputFormat = format.map(Into::into).unwrap_or_else(|| settings.output_format.clone());
    let secondary_output = secondary_output.or_else(|| settings.secondary_output.clone());

    let paths = resolve_sources(&config, input, input_dir);
    println!(" Sources: {}", paths.len().to_string().bright_cyan());

    let sources: Vec<Box<dyn TableSource>> = paths
        .into_iter()
        .map(|path| Box::new(CsvFile::new(path)) as Box<dyn TableSource>)
        .collect();

    let builder = TabularTripleBuilder::from_config(&config)
        .with_fail_on_empty_batch(settings.fail_on_empty_batch || fail_on_empty);

    let mut graph = KnowledgeGraph::new();
    builder.bind_prefixes(&mut graph);

    let pb = ProgressBar::new(sources.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>4}/{len:4} {msg}")?
            .progress_chars("##-"),
    );

    let result = builder.build_with(&sources, &mut graph, |source| {
        pb.set_message(source.source.clone());
        pb.inc(1);
        if !source.is_loaded() {
            pb.println(format!(" {} {}", "Skipped".bright_yellow(), source.source));
        }
    });
    pb.finish_and_clear();

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            error!(" Conversion failed: {}", e);
            return Err(e.into());
        }
    };

    if validate {
        let issues = validate_rdf_triples(graph.triples());
        if !issues.is_empty() {
            warn!(" Validation issues: {}", issues.join(", "));
        }
    }

    graph
        .serialize(&output, &format)
        .with_context(|| format!("Failed to write primary output: {}", output.display()))?;
    println!(" RDF file generated: {}", output.display().to_string().bright_green());

    if let Some(secondary) = &secondary_output {
        write_secondary(&graph, secondary, &settings.secondary_format);
    }

    if let Some(path) = &report_path {
        let content = serde_json::to_string_pretty(&report)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        println!(" Batch report written to: {}", path.display().to_string().bright_green());
    }

    print_graph_summary(&graph);

    println!("\n{}", " Conversion Summary".bright_green().bold());
    println!(" Sources loaded: {}/{}", report.loaded_sources(), report.sources.len());
    println!(" Rows skipped: {}", report.skipped_rows());
    println!(" Processing time: {:.2}s", report.processing_time_seconds);

    if report.skipped_sources() > 0 || report.skipped_rows() > 0 {
        println!(" {} completed with some errors", "Conversion".bright_yellow());
    } else {
        println!(" {} completed successfully!", "Conversion".bright_green());
    }

    Ok(())
}

fn document_command(
    config_path: Option<PathBuf>,
    input: PathBuf,
    output: Option<PathBuf>,
    format: Option<OutputFormatArg>,
    secondary_output: Option<PathBuf>,
) -> Result<()> {
    println!("{}", "Starting TEI to RDF conversion...".bright_blue().bold());

    let config = load_config(config_path.as_deref())?;
    let output = output.unwrap_or_else(|| config.document.output.clone());
    let format: OutputFormat = format.map(Into::into).unwrap_or(OutputFormat::Turtle);
    let secondary_output = secondary_output.or_else(|| config.document.secondary_output.clone());

    let document = TeiDocument::from_file(&input)?;
    let mut graph = KnowledgeGraph::new();
    let stats = DocumentTripleBuilder::from_config(&config).build(&document, &mut graph);

    graph
        .serialize(&output, &format)
        .with_context(|| format!("Failed to write primary output: {}", output.display()))?;
    println!(" RDF file generated: {}", output.display().to_string().bright_green());

    if let Some(secondary) = &secondary_output {
        write_secondary(&graph, secondary, &OutputFormat::RdfXml);
    }

    print_graph_summary(&graph);
    print_document_stats(&stats);

    Ok(())
}

fn render_command(config_path: Option<PathBuf>, input: PathBuf, output: Option<PathBuf>) -> Result<()> {
    println!("{}", "Rendering TEI document as HTML...".bright_blue().bold());

    let config = load_config(config_path.as_deref())?;
    let output = output.unwrap_or_else(|| config.document.html_output.clone());

    let document = TeiDocument::from_file(&input)?;
    HtmlRenderer::from_config(&config)?.render_to_file(&document, &output)?;

    println!(" HTML file generated: {}", output.display().to_string().bright_green());
    Ok(())
}

fn validate_command(config_path: PathBuf) -> Result<()> {
    println!("{}", " Validating configuration...".bright_blue().bold());

    match Configuration::from_file(&config_path) {
        Ok(config) => match config.validate() {
            Ok(()) => {
                println!(" Configuration is valid!");
                println!(" Name: {}", config.name.bright_green());
                println!(" Version: {}", config.version);
                println!(" Default namespace: {}", config.namespaces.default_base);
                println!(" Prefixes: {}", config.namespaces.prefixes.len());
                println!(" CSV sources: {}", config.tabular.sources.len());
                println!(" Document base: {}", config.document.base_uri);
                Ok(())
            }
            Err(e) => {
                error!(" Configuration validation failed: {}", e);
                Err(e)
            }
        },
        Err(e) => {
            error!(" Failed to load configuration: {}", e);
            Err(e)
        }
    }
}

fn generate_config_command(output_path: PathBuf, format: ConfigFormat) -> Result<()> {
    println!("{}", " Generating example configuration...".bright_blue().bold());

    let config = Configuration::example();

    let content = match format {
        ConfigFormat::Yaml => serde_yaml::to_string(&config)?,
        ConfigFormat::Json => serde_json::to_string_pretty(&config)?,
    };

    fs::write(&output_path, content)
        .with_context(|| format!("Failed to write configuration: {}", output_path.display()))?;

    println!(" Example configuration generated at: {}", output_path.display().to_string().bright_green());
    println!(" Edit the file to customize for your use case");

    Ok(())
}

fn stats_command(input: PathBuf) -> Result<()> {
    println!("{}", " Knowledge Graph Statistics".bright_blue().bold());

    let graph = KnowledgeGraph::load_from_file(&input)?;
    println!("{}", graph.get_statistics());

    Ok(())
}

/// A failed secondary export is reported but never undoes the primary one.
fn write_secondary(graph: &KnowledgeGraph, target: &Path, format: &OutputFormat) {
    match graph.serialize(target, format) {
        Ok(()) => println!(" Secondary file generated: {}", target.display().to_string().bright_green()),
        Err(e) => {
            warn!(" Secondary export failed: {}", e);
            println!(" {} {}", "Secondary export failed:".bright_yellow(), e);
        }
    }
}

fn print_graph_summary(graph: &KnowledgeGraph) {
    println!("\n{}", " Sample triples".bright_green().bold());
    for triple in graph.triples().take(10) {
        println!("  {}", triple.to_ntriple().dimmed());
    }
    if graph.len() > 10 {
        println!("  ... and {} more", graph.len() - 10);
    }

    println!("\n{}", graph.get_statistics());
}

fn print_document_stats(stats: &DocumentStats) {
    println!("\n{}", " Document Statistics".bright_green().bold());
    println!(" Persons: {}", stats.persons.to_string().bright_cyan());
    println!(" Places: {}", stats.places.to_string().bright_cyan());
    println!(" Organizations: {}", stats.organizations.to_string().bright_cyan());
    println!(" Events: {}", stats.events.to_string().bright_cyan());
}
