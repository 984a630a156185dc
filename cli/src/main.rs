mod config;
mod logging;
mod test_runner;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing::debug;

use lockorder::{BlockId, ParseError, Program, Scan, scan_path};
use tracer::{ThreadTrace, trace_thread_entries};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "lockorder", version, about = "Trace lock acquisition order through thread entry points")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// Config file (defaults to ./lockorder.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the lock trace of every thread entry under a path
    Trace(TraceArgs),

    /// Parse only; exit 0 if every file parses
    Check(CheckArgs),

    /// Run .test.java fixture files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct TraceArgs {
    /// Source file or directory
    path: PathBuf,

    /// Only trace entries with this label (`Class.label` or just `label`)
    #[arg(short, long)]
    entry: Option<String>,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Source file or directory
    path: PathBuf,

    /// Print the block tree of every file
    #[arg(long)]
    list_blocks: bool,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.java file or directory containing them
    path: PathBuf,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };
    logging::init(&config.logging, cli.verbose);

    let exit_code = match cli.command {
        Command::Trace(args) => do_trace(args, &config, cli.no_color),
        Command::Check(args) => do_check(args, &config, cli.no_color),
        Command::Test(args) => {
            if args.list_categories {
                test_runner::list_categories(&args.path);
                return;
            }
            test_runner::run_tests(&args.path, cli.no_color, &args.category, &config.trace)
        }
    };
    process::exit(exit_code);
}

fn color_choice(no_color: bool) -> ColorChoice {
    if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    }
}

/// Scan the path and render any parse errors. `None` when the path itself
/// could not be scanned.
fn scan(path: &Path, config: &Config, no_color: bool) -> Option<Scan> {
    let scan = match scan_path(path, &config.scan.extensions) {
        Ok(scan) => scan,
        Err(e) => {
            eprintln!("error: {}", e);
            return None;
        }
    };
    debug!(files = scan.program.files().len(), blocks = scan.program.len(), "scan finished");
    emit_diagnostics(&scan.program, &scan.errors, no_color);
    Some(scan)
}

fn emit_diagnostics(program: &Program, errors: &[ParseError], no_color: bool) {
    if errors.is_empty() {
        return;
    }
    // File ids in the database line up with the program's file ids.
    let mut files = SimpleFiles::new();
    for file in program.files() {
        files.add(file.name.clone(), file.source.clone());
    }
    let writer = StandardStream::stderr(color_choice(no_color));
    let config = term::Config::default();
    for error in errors {
        let diagnostic = error.to_diagnostic();
        let _ = term::emit_to_write_style(&mut writer.lock(), &config, &files, &diagnostic);
    }
}

fn do_trace(args: TraceArgs, config: &Config, no_color: bool) -> i32 {
    let Some(scan) = scan(&args.path, config, no_color) else {
        return 1;
    };

    let mut traces = match trace_thread_entries(&scan.program, &config.trace) {
        Ok(traces) => traces,
        Err(e) => {
            eprintln!("error: {}", e);
            return 1;
        }
    };

    if let Some(entry) = &args.entry {
        traces.retain(|trace| label_matches(&trace.label, entry));
        if traces.is_empty() {
            eprintln!("error: no thread entry named '{}'", entry);
            return 1;
        }
    }

    if args.json {
        match serde_json::to_string_pretty(&traces) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("error: {}", e);
                return 1;
            }
        }
    } else {
        print_traces(&traces);
    }

    if scan.errors.is_empty() { 0 } else { 1 }
}

/// Exact label, or the part after the class name, ignoring case.
fn label_matches(label: &str, wanted: &str) -> bool {
    let short = label.rsplit_once('.').map_or(label, |(_, short)| short);
    label.eq_ignore_ascii_case(wanted) || short.eq_ignore_ascii_case(wanted)
}

fn print_traces(traces: &[ThreadTrace]) {
    for trace in traces {
        println!("{} ({})", trace.label, trace.location);
        if trace.events.is_empty() {
            println!("  (no locks)");
        }
        for event in &trace.events {
            println!("  {:<24} {}", event.to_string(), event.lock_type);
        }
    }
}

fn do_check(args: CheckArgs, config: &Config, no_color: bool) -> i32 {
    let Some(scan) = scan(&args.path, config, no_color) else {
        return 1;
    };
    let program = &scan.program;

    if args.list_blocks {
        fn print_blocks(program: &Program, ids: &[BlockId], indent: usize) {
            for &id in ids {
                let block = program.block(id);
                let pad = "  ".repeat(indent);
                let label = match &block.name {
                    Some(name) => name.clone(),
                    None if block.header.is_empty() => "{ }".to_string(),
                    None => block.header.clone(),
                };
                println!("{}{} {} (line {})", pad, block.kind, label, program.line_of(id));
                print_blocks(program, &block.children, indent + 1);
            }
        }
        for (file_id, file) in program.files().iter().enumerate() {
            println!("{}", file.name);
            print_blocks(program, &program.roots_in(file_id), 1);
        }
    }

    if !scan.errors.is_empty() {
        return 1;
    }
    eprintln!(
        "ok: {} file(s), {} blocks, {} thread entries",
        program.files().len(),
        program.len(),
        program.thread_entries().len()
    );
    0
}
