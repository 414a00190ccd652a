//! clientgen CLI
//!
//! Command-line interface for building typed client models from OpenAPI
//! 3.0 documents.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use clientgen_common::{BuilderConfig, ClientModel, Pointer};
use clientgen_parser::openapi::Resolver;
use clientgen_parser::{EscapingIdentifiers, OpenApiParser, SchemaContext};
use colored::*;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "clientgen")]
#[command(version, about = "Build typed client models from OpenAPI 3.0 documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the client model of a document and summarize it
    #[command(after_help = "EXAMPLES:\n  \
        # Summarize a JSON document\n  \
        clientgen inspect --spec petstore.json\n\n  \
        # Dump the full model of a YAML document\n  \
        clientgen inspect --spec petstore.yaml --json\n\n  \
        # Use builder settings from a file\n  \
        clientgen inspect --spec petstore.json --config clientgen.yaml")]
    Inspect {
        /// Path to the OpenAPI document
        #[arg(short, long)]
        spec: PathBuf,

        /// Document format (detected if not specified)
        #[arg(short, long)]
        format: Option<DocumentFormat>,

        /// Builder configuration (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the whole model as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the type one schema resolves to
    #[command(after_help = "EXAMPLES:\n  \
        clientgen schema --spec petstore.json --pointer '#/components/schemas/Pet'")]
    Schema {
        /// Path to the OpenAPI document
        #[arg(short, long)]
        spec: PathBuf,

        /// Document format (detected if not specified)
        #[arg(short, long)]
        format: Option<DocumentFormat>,

        /// Builder configuration (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// JSON pointer of the schema, e.g. `#/components/schemas/Pet`
        #[arg(short, long)]
        pointer: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DocumentFormat {
    Json,
    Yaml,
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentFormat::Json => write!(f, "JSON"),
            DocumentFormat::Yaml => write!(f, "YAML"),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Inspect {
            spec,
            format,
            config,
            json,
        } => {
            inspect_command(&spec, format, config.as_deref(), json, cli.verbose)?;
        }
        Commands::Schema {
            spec,
            format,
            config,
            pointer,
        } => {
            schema_command(&spec, format, config.as_deref(), &pointer)?;
        }
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` wins over `--verbose`
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "clientgen=debug,clientgen_parser=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn inspect_command(
    spec_path: &Path,
    format: Option<DocumentFormat>,
    config_path: Option<&Path>,
    json: bool,
    verbose: bool,
) -> Result<()> {
    let document = load_document(spec_path, format)?;
    let config = load_config(config_path)?;

    let model = OpenApiParser::from_value(document)
        .with_config(config)
        .parse()
        .with_context(|| format!("Failed to build client model for {}", spec_path.display()))?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&model).context("Failed to serialize client model")?
        );
        return Ok(());
    }

    print_summary(&model, verbose);
    Ok(())
}

fn schema_command(
    spec_path: &Path,
    format: Option<DocumentFormat>,
    config_path: Option<&Path>,
    pointer: &str,
) -> Result<()> {
    let document = load_document(spec_path, format)?;
    let config = load_config(config_path)?;
    let pointer = Pointer::parse(pointer).context("Invalid pointer")?;

    let mut context = SchemaContext::new(
        Resolver::new(&document),
        Box::new(EscapingIdentifiers::new(&config.extra_keywords)),
    );
    let annotation = context
        .annotate(&pointer, true)
        .with_context(|| format!("Failed to resolve schema at {}", pointer))?;

    match annotation {
        Some(annotation) => println!("{} {}", "✓".green(), annotation.to_string().yellow()),
        None => println!("{} {} can never match", "✗".red(), pointer),
    }

    for (name, class) in context.classes() {
        println!("\n{}", name.to_string().bold());
        for field in &class.fields {
            println!("  {} ({}): {}", field.name.cyan(), field.alias, field.annotation);
        }
    }

    for warning in context.warnings() {
        println!("{} {}", "!".yellow(), warning);
    }
    Ok(())
}

fn print_summary(model: &ClientModel, verbose: bool) {
    println!("\n{}", "✓ Build successful!".green().bold());
    println!("\n{}", "Client:".bold());
    println!("  Title: {}", model.title.yellow());
    println!("  Version: {}", model.version.yellow());
    println!(
        "  Base URL: {}",
        model.init.base_url.as_deref().unwrap_or("(none)")
    );
    println!("  Operations: {}", model.operations.len());
    println!("  Classes: {}", model.class_count());
    println!("  Security schemes: {}", model.security_schemes.len());

    println!("\n{}", "Operations:".bold());
    for operation in &model.operations {
        println!(
            "  • {} {} {} -> {}",
            operation.name.cyan(),
            operation.method,
            operation.path,
            operation.return_type
        );
        if verbose {
            for parameter in &operation.parameters {
                println!("      {}: {}", parameter.name, parameter.annotation);
            }
            if let Some(body) = &operation.request_body {
                println!("      body ({}): {}", body.media_type, body.annotation);
            }
        }
    }

    println!("\n{}", "Modules:".bold());
    for (module, classes) in &model.modules {
        println!("  • {} ({} classes)", module.cyan(), classes.len());
        if verbose {
            for class in classes {
                println!("      {} [{} fields]", class.name.name, class.fields.len());
            }
        }
    }

    if !model.warnings.is_empty() {
        println!("\n{}", "Warnings:".yellow().bold());
        for warning in &model.warnings {
            println!("  ! {}", warning);
        }
    }
}

/// Parse the document as JSON or YAML into one JSON value tree
fn load_document(path: &Path, format: Option<DocumentFormat>) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let format = format.unwrap_or_else(|| detect_format(path, &content));
    tracing::debug!("Loading {} as {}", path.display(), format);

    let document = match format {
        DocumentFormat::Json => serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {} as JSON", path.display()))?,
        DocumentFormat::Yaml => serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {} as YAML", path.display()))?,
    };

    if !matches!(document, Value::Object(_)) {
        bail!("{} does not contain an OpenAPI object", path.display());
    }
    Ok(document)
}

fn load_config(path: Option<&Path>) -> Result<BuilderConfig> {
    match path {
        Some(path) => BuilderConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(BuilderConfig::default()),
    }
}

fn detect_format(path: &Path, content: &str) -> DocumentFormat {
    // Try extension first
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => return DocumentFormat::Json,
        Some("yaml" | "yml") => return DocumentFormat::Yaml,
        _ => {}
    }

    // JSON documents are objects; anything else is read as YAML
    if content.trim_start().starts_with('{') {
        DocumentFormat::Json
    } else {
        DocumentFormat::Yaml
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_detect_format() {
        assert_eq!(
            detect_format(Path::new("api.yml"), "{}"),
            DocumentFormat::Yaml
        );
        assert_eq!(
            detect_format(Path::new("api.json"), "openapi: 3.0.0"),
            DocumentFormat::Json
        );
        assert_eq!(
            detect_format(Path::new("api"), "  {\"openapi\": \"3.0.0\"}"),
            DocumentFormat::Json
        );
        assert_eq!(
            detect_format(Path::new("api"), "openapi: 3.0.0"),
            DocumentFormat::Yaml
        );
    }

    #[test]
    fn test_yaml_and_json_documents_agree() {
        let mut yaml = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(yaml, "openapi: 3.0.0").unwrap();
        writeln!(yaml, "info: {{title: Test, version: '1'}}").unwrap();
        writeln!(yaml, "paths: {{}}").unwrap();

        let mut json = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            json,
            r#"{{"openapi": "3.0.0", "info": {{"title": "Test", "version": "1"}}, "paths": {{}}}}"#
        )
        .unwrap();

        let from_yaml = load_document(yaml.path(), None).unwrap();
        let from_json = load_document(json.path(), None).unwrap();
        assert_eq!(from_yaml, from_json);
    }

    #[test]
    fn test_non_object_document_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "[1, 2, 3]").unwrap();

        assert!(load_document(file.path(), None).is_err());
    }
}
