//! Mustachio CLI
//!
//! Usage:
//!   mustachio [OPTIONS] [TEMPLATE]
//!
//! Options:
//!   -d, --data <FILE>       Data to render against (JSON, or TOML by extension)
//!   -p, --partials <DIR>    Directory of *.mustache partials
//!   -c, --config <FILE>     Compile options (TOML)
//!   --delimiters <PAIR>     Initial delimiters, e.g. "<% %>"
//!   --model-get             Enable getter lookups on model values
//!   --disable-lambda        Refuse to compile lambda output
//!   --as-string             Print the serialized form instead of rendering
//!   --load                  Treat the input as a serialized form
//!   -h, --help              Print help

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mustachio::{CompileOptions, Compiled, Compiler, Delimiters, Partials, Value};

#[derive(Parser)]
#[command(name = "mustachio")]
#[command(about = "Compile and render mustache templates")]
struct Cli {
    /// Template file (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Data file: JSON, or TOML when the extension is .toml
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Directory whose *.mustache files become partials named by file stem
    #[arg(short, long)]
    partials: Option<PathBuf>,

    /// Compile options file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Initial delimiters as "open close"
    #[arg(long)]
    delimiters: Option<Delimiters>,

    /// Fall back to getter lookups on model values
    #[arg(long)]
    model_get: bool,

    /// Fail instead of compiling text returned by lambdas
    #[arg(long)]
    disable_lambda: bool,

    /// Print the serialized compiled form instead of rendering
    #[arg(long)]
    as_string: bool,

    /// Treat the input as a serialized compiled form
    #[arg(long, conflicts_with = "as_string")]
    load: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut options = match &cli.config {
        Some(path) => CompileOptions::from_file(path).unwrap_or_else(|e| {
            fail(&format!("Error loading options '{}': {}", path.display(), e))
        }),
        None => CompileOptions::default(),
    };
    if let Some(delimiters) = cli.delimiters.clone() {
        options.delimiters = Some(delimiters);
    }
    options.model_get |= cli.model_get;
    options.disable_lambda |= cli.disable_lambda;
    options.as_string |= cli.as_string;

    let (source, filename) = read_input(cli.input.as_deref());
    let compiler = Compiler::new();

    let template = if cli.load {
        compiler
            .load(&source)
            .unwrap_or_else(|e| fail(&e.format(&source, &filename)))
    } else {
        match compiler.compile(&source, &options) {
            Ok(Compiled::Template(template)) => template,
            Ok(Compiled::Serialized(text)) => {
                println!("{}", text);
                return;
            }
            Err(e) => fail(&e.format(&source, &filename)),
        }
    };

    let data = match &cli.data {
        Some(path) => read_data(path),
        None => Value::Null,
    };

    let partials = match &cli.partials {
        Some(dir) => Partials::from_dir(dir).unwrap_or_else(|e| {
            fail(&format!("Error loading partials from '{}': {}", dir.display(), e))
        }),
        None => Partials::new(),
    };

    match template.render_with(&data, &partials) {
        Ok(out) => print!("{}", out),
        Err(e) => fail(&format!("Error: {}", e)),
    }
}

fn read_input(path: Option<&Path>) -> (String, String) {
    match path {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => (content, path.display().to_string()),
            Err(e) => fail(&format!("Error reading file '{}': {}", path.display(), e)),
        },
        None => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => (buffer, "<stdin>".to_string()),
                Err(e) => fail(&format!("Error reading from stdin: {}", e)),
            }
        }
    }
}

fn read_data(path: &Path) -> Value {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|e| fail(&format!("Error reading data '{}': {}", path.display(), e)));

    let parsed = if path.extension().is_some_and(|ext| ext == "toml") {
        toml::from_str::<Value>(&content).map_err(|e| e.to_string())
    } else {
        serde_json::from_str::<Value>(&content).map_err(|e| e.to_string())
    };
    parsed.unwrap_or_else(|e| fail(&format!("Error parsing data '{}': {}", path.display(), e)))
}

fn fail(message: &str) -> ! {
    eprintln!("{}", message);
    process::exit(1);
}
