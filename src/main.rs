//! fuzzkit - Fuzzy Inference System engine
//!
//! Command-line interface for validating, evaluating and compiling
//! declarative FIS model files.

use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use fuzzkit::{FisConfig, FisModel, ModelDef};

#[derive(Parser)]
#[command(name = "fuzzkit")]
#[command(version)]
#[command(about = "Fuzzy inference system engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (defaults to the standard search path)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Suppress warnings
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a model file and report its structure
    Check {
        /// Model definition (TOML or JSON); '-' reads stdin
        model: PathBuf,
    },
    /// Evaluate a model against crisp inputs
    Eval {
        /// Model definition (TOML or JSON); '-' reads stdin
        model: PathBuf,

        /// Crisp inputs as name=value pairs
        #[arg(value_name = "NAME=VALUE", required = true)]
        inputs: Vec<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Emit a standalone C evaluation routine for a model
    Codegen {
        /// Model definition (TOML or JSON); '-' reads stdin
        model: PathBuf,

        /// Function name prefix (defaults to the model file stem)
        #[arg(long)]
        name: Option<String>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => FisConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => FisConfig::load().context("failed to load configuration")?,
    };

    match &cli.command {
        Command::Check { model } => check(model, &config, cli.quiet),
        Command::Eval { model, inputs, json } => eval(model, inputs, *json, &config, cli.quiet),
        Command::Codegen { model, name, output } => {
            codegen(model, name.as_deref(), output.as_deref(), &config)
        }
    }
}

fn read_source(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read from stdin")?;
        Ok(text)
    } else {
        fs::read_to_string(path)
            .with_context(|| format!("failed to read model file {}", path.display()))
    }
}

fn load_model(path: &Path, config: &FisConfig, quiet: bool) -> Result<FisModel> {
    let text = read_source(path)?;

    let def = if path.extension().is_some_and(|e| e == "json") {
        ModelDef::from_json(&text)
    } else {
        ModelDef::from_toml(&text)
    }
    .with_context(|| format!("invalid model definition {}", path.display()))?;

    // configuration supplies defaults for whatever the definition leaves
    // unspecified; explicit definition fields always win
    let mut builder = def.to_builder()?;
    if def.system.resolution.is_none() {
        builder.resolution(config.engine.resolution)?;
    }
    if def.system.and.is_none() {
        builder.and_op(config.defaults.and)?;
    }
    if def.system.or.is_none() {
        builder.or_op(config.defaults.or)?;
    }
    if def.system.implication.is_none() {
        builder.implication(config.defaults.implication)?;
    }
    if def.system.aggregation.is_none() {
        builder.aggregation(config.defaults.aggregation)?;
    }
    if def.system.defuzzification.is_none() {
        if let Some(m) = config.defaults.defuzzification {
            builder.defuzz(m)?;
        }
    }

    let model = builder.build()?;
    if !quiet {
        for w in builder.warnings() {
            eprintln!("warning: {}", w.message);
        }
    }
    Ok(model)
}

fn check(path: &Path, config: &FisConfig, quiet: bool) -> Result<()> {
    let model = load_model(path, config, quiet)?;
    println!("{}", model);
    for (name, var) in model.inputs() {
        println!("  input  {} [{}, {}]", name, var.min(), var.max());
        for set in var.sets() {
            println!("    {}", set);
        }
    }
    for (name, var) in model.outputs() {
        println!("  output {} [{}, {}]", name, var.min(), var.max());
        for set in var.sets() {
            println!("    {}", set);
        }
    }
    for (i, text) in model.rule_texts().iter().enumerate() {
        println!("  rule {}: {}", i + 1, text);
    }
    println!(
        "  defuzzification: {} ({} samples)",
        model.defuzz().name(),
        model.resolution()
    );
    Ok(())
}

fn parse_inputs(pairs: &[String]) -> Result<HashMap<String, f64>> {
    let mut map = HashMap::new();
    for pair in pairs {
        let Some((name, value)) = pair.split_once('=') else {
            bail!("input '{}' is not of the form name=value", pair);
        };
        let value: f64 = value
            .trim()
            .parse()
            .with_context(|| format!("input '{}' has a non-numeric value", pair))?;
        map.insert(name.trim().to_string(), value);
    }
    Ok(map)
}

fn eval(
    path: &Path,
    inputs: &[String],
    json: bool,
    config: &FisConfig,
    quiet: bool,
) -> Result<()> {
    let model = load_model(path, config, quiet)?;
    let values = parse_inputs(inputs)?;

    let result = model.evaluate(&values).context("evaluation failed")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("failed to serialize result")?
        );
    } else {
        for (name, value) in result.outputs() {
            println!("{} = {}", name, value);
        }
    }
    if !quiet {
        for w in result.warnings() {
            eprintln!("warning: {}", w.message);
        }
    }
    Ok(())
}

fn codegen(
    path: &Path,
    name: Option<&str>,
    output: Option<&Path>,
    config: &FisConfig,
) -> Result<()> {
    let model = load_model(path, config, true)?;
    let default_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("fis")
        .to_string();
    let name = name.unwrap_or(&default_name);

    let code = fuzzkit::codegen::emit_c(&model, name);
    match output {
        Some(out_path) => fs::write(out_path, code)
            .with_context(|| format!("failed to write {}", out_path.display()))?,
        None => print!("{}", code),
    }
    Ok(())
}
