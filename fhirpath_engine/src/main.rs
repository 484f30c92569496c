//! # FHIRPath CLI
//!
//! Evaluate an expression against a JSON document from a file or stdin and
//! print the result sequence as JSON.

use clap::Parser;
use fhirpath_engine::{evaluate, EvaluationContext, Value};
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "fhirpath",
    version,
    about = "Evaluate FHIRPath expressions against JSON documents"
)]
struct Cli {
    /// The FHIRPath expression to evaluate
    expression: String,

    /// JSON document to evaluate against (stdin when omitted)
    #[arg(long, short = 'd')]
    data: Option<PathBuf>,

    /// Environment variable bindings as NAME=JSON (repeatable)
    #[arg(long = "var", value_name = "NAME=JSON")]
    vars: Vec<String>,

    /// Pretty-print the result sequence
    #[arg(long)]
    pretty: bool,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(message) = run(&cli) {
        eprintln!("{message}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let source = match &cli.data {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| format!("cannot read stdin: {e}"))?;
            buffer
        }
    };
    let data: Value =
        serde_json::from_str(&source).map_err(|e| format!("invalid JSON document: {e}"))?;

    let mut builder = EvaluationContext::builder();
    for binding in &cli.vars {
        let (name, raw) = binding
            .split_once('=')
            .ok_or_else(|| format!("invalid --var '{binding}', expected NAME=JSON"))?;
        // A bare word that is not JSON binds as a plain string.
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        builder = builder.variable(name, value);
    }
    let mut ctx = builder.build();

    let result = evaluate(&mut ctx, &cli.expression, &data).map_err(|e| e.to_string())?;

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&result)
    } else {
        serde_json::to_string(&result)
    }
    .map_err(|e| format!("cannot render result: {e}"))?;
    println!("{rendered}");
    Ok(())
}
