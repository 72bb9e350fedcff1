use clap::Parser;
use richedit::config::EditorConfig;
use richedit::richtext::editor::RichTextEditor;
use richedit::richtext::surface::MemorySurface;
use richedit::script::{parse_script, run_script};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{Level, info};

#[derive(Parser, Debug)]
#[command(name = "richedit")]
#[command(about = "Apply rich-text editing commands to a document", long_about = None)]
struct Args {
    /// Config file (default: the user config directory)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log editing steps to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Plain-text document; blank lines separate paragraphs
    #[arg(value_name = "DOCUMENT")]
    document: PathBuf,

    /// Editing script, one command per line
    #[arg(value_name = "SCRIPT")]
    script: PathBuf,
}

fn read(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path.display(), e))
}

fn run(args: Args) -> Result<(), String> {
    let config = EditorConfig::load_or_default(args.config.as_deref());
    let document = read(&args.document)?;
    let script = read(&args.script)?;
    let commands = parse_script(&script).map_err(|e| e.to_string())?;
    info!(commands = commands.len(), "script parsed");

    let surface = MemorySurface::from_plain_text(&document).with_metrics(config.layout);
    let mut editor = RichTextEditor::new(surface, config);
    let mut stdout = io::stdout().lock();
    run_script(&mut editor, &commands, &mut stdout).map_err(|e| e.to_string())?;

    writeln!(stdout, "{}", editor.surface().markup()).map_err(|e| e.to_string())
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(if args.verbose {
            Level::DEBUG
        } else {
            Level::WARN
        })
        .init();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
