use autoedit::{
    editor, ImageSource, MatchResult, MatcherBuilder, MatcherConfig, MatcherSpec, TemplateMethod,
};
use clap::Parser;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "autoedit CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output.
    #[arg(long)]
    trace: bool,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum Operation {
    #[default]
    Find,
    Slice,
    Mark,
    MarkAndSlice,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Config {
    original: String,
    targets: Vec<String>,
    operation: Operation,
    inpaint: bool,
    workers: Option<usize>,
    matchers: Option<MatcherSpec>,
    options: MatcherConfig,
    output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            original: String::new(),
            targets: Vec::new(),
            operation: Operation::Find,
            inpaint: true,
            workers: None,
            matchers: None,
            options: MatcherConfig::default(),
            output_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    count: usize,
    matches: Vec<MatchResult>,
}

fn build_matchers(config: &Config) -> Result<MatcherBuilder, Box<dyn std::error::Error>> {
    let builder = match &config.matchers {
        Some(spec) => MatcherBuilder::deserialize(spec, config.options)?,
        None => MatcherBuilder::new()
            .template(0.9, TemplateMethod::CcoeffNormed)?
            .with_config(config.options),
    };
    Ok(builder)
}

fn save(dir: &Path, name: &str, img: &RgbImage) -> Result<(), Box<dyn std::error::Error>> {
    let path = dir.join(name);
    img.save(&path)?;
    println!("wrote {}", path.display());
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("autoedit=debug".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.original.is_empty() || config.targets.is_empty() {
        return Err("original and targets must be set in the config".into());
    }
    if config.workers == Some(0) {
        return Err("workers must be at least 1".into());
    }

    let builder = build_matchers(&config)?;
    tracing::info!(
        operation = ?config.operation,
        targets = config.targets.len(),
        matchers = builder.matchers().len(),
        "starting"
    );
    let original = ImageSource::from(config.original.as_str());
    let targets: Vec<ImageSource> = config
        .targets
        .iter()
        .map(|t| ImageSource::from(t.as_str()))
        .collect();

    if config.operation == Operation::Find {
        let matches = editor::find_matches(&original, &targets, &builder, config.workers)?;
        let output = Output {
            count: matches.len(),
            matches,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    fs::create_dir_all(&config.output_dir)?;
    let dir = config.output_dir.as_path();
    let written = match config.operation {
        Operation::Slice => {
            editor::slice(&original, &targets, &builder, config.inpaint, config.workers)?
                .map(|sliced| save(dir, "sliced.png", &sliced))
        }
        Operation::Mark => editor::mark(&original, &targets, &builder, config.workers)?
            .map(|marked| save(dir, "marked.png", &marked)),
        Operation::MarkAndSlice => {
            editor::mark_and_slice(&original, &targets, &builder, config.inpaint, config.workers)?
                .map(|(sliced, marked)| {
                    save(dir, "sliced.png", &sliced)?;
                    save(dir, "marked.png", &marked)
                })
        }
        Operation::Find => None,
    };

    match written {
        Some(result) => result,
        None => {
            println!("no match");
            Ok(())
        }
    }
}
