//! Bramble CLI - parse, inspect and re-serialize HTML
//!
//! Usage:
//!   bramble <file>              Write the document back out (unchanged markup stays byte-exact)
//!   bramble <file> --xml        Write the document as XML
//!   bramble <file> --tree       Show the parsed node tree
//!   bramble <file> --errors     Show recovered parse errors
//!
//! Examples:
//!   bramble page.html --errors --json
//!   bramble --html '<ul><li>a<li>b</ul>' --tree --fix-nested-tags

use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use bramble::html::print_tree;
use bramble::{Document, Options};
use clap::Parser;
use owo_colors::OwoColorize;

/// Bramble — error-tolerant HTML parser
#[derive(Parser, Debug)]
#[command(name = "bramble")]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"EXAMPLES:
    # Round-trip a file
    bramble ./index.html

    # Show the tree an unclosed list produces
    bramble --html '<ul><li>a<li>b</ul>' --tree --fix-nested-tags

    # Parse errors as JSON
    bramble ./index.html --errors --json

    # Only parse up to the end of <head>
    bramble ./index.html --stop-at head
"#)]
struct Cli {
    /// Path to an HTML file
    #[arg(value_name = "FILE")]
    path: Option<PathBuf>,

    /// Parse HTML string directly instead of a file
    #[arg(long, value_name = "HTML")]
    html: Option<String>,

    /// Write the document as XML
    #[arg(long)]
    xml: bool,

    /// Print the parsed node tree
    #[arg(short = 't', long)]
    tree: bool,

    /// Print the recovered parse errors
    #[arg(short = 'e', long)]
    errors: bool,

    /// Print parse errors as JSON (implies --errors)
    #[arg(long)]
    json: bool,

    /// Load parser and output options from a JSON file
    #[arg(long, value_name = "FILE")]
    options: Option<PathBuf>,

    /// Let a start tag close an open element of the same name
    #[arg(long)]
    fix_nested_tags: bool,

    /// Stop parsing once an element with this name is closed
    #[arg(long, value_name = "NAME")]
    stop_at: Option<String>,

    /// Fail when elements nest deeper than this
    #[arg(long, value_name = "N")]
    max_depth: Option<usize>,

    /// Log more (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = build_options(&cli)?;
    let doc = load_doc(&cli, options)?;

    if cli.errors || cli.json {
        return print_errors(&doc, cli.json);
    }
    if cli.tree {
        print_tree(doc.tree(), doc.root(), 0).context("failed to print the node tree")?;
        return Ok(());
    }

    let stdout = io::stdout().lock();
    if cli.xml {
        doc.save_xml(stdout).context("failed to write XML")?;
    } else {
        doc.save(stdout).context("failed to write HTML")?;
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Options from `--options`, then the individual flags on top.
fn build_options(cli: &Cli) -> Result<Options> {
    let mut options = match &cli.options {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read options file '{}'", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("invalid options file '{}'", path.display()))?
        }
        None => Options::default(),
    };
    if cli.fix_nested_tags {
        options.fix_nested_tags = true;
    }
    if let Some(name) = &cli.stop_at {
        options.stopper_node_name = Some(name.clone());
    }
    if let Some(depth) = cli.max_depth {
        options.max_depth = depth;
    }
    log::debug!(target: "bramble::cli", "{options:?}");
    Ok(options)
}

/// Load document from CLI arguments
fn load_doc(cli: &Cli, options: Options) -> Result<Document> {
    if let Some(html) = &cli.html {
        Document::parse_with_options(html, options).context("failed to parse --html input")
    } else if let Some(path) = &cli.path {
        Document::load_file(path, options)
            .with_context(|| format!("failed to load '{}'", path.display()))
    } else {
        anyhow::bail!("a file path or --html is required")
    }
}

fn print_errors(doc: &Document, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(doc.errors())?);
        return Ok(());
    }

    if doc.errors().is_empty() {
        println!("{}", "no parse errors".green());
    }
    for error in doc.errors() {
        println!(
            "{} {} {}",
            format!("{}:{}", error.line, error.column).dimmed(),
            error.code.to_string().yellow().bold(),
            error.reason
        );
        if let Some(excerpt) = &error.source_text {
            println!("    {}", excerpt.replace('\n', "\\n").dimmed());
        }
    }
    if let Some(offset) = doc.remainder_offset() {
        println!(
            "{}",
            format!("stopped at byte {offset}, {} bytes left unparsed", doc.source().len() - offset).cyan()
        );
    }
    Ok(())
}
