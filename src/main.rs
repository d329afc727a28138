//! CLI entry point for `mboxmend`.

use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};

use mboxmend::{assemble, datefix, dedup, outdir, split};

#[derive(Parser)]
#[command(name = "mboxmend", version, about = "Repair a migrated email archive")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Print the run summary as JSON instead of a table
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Split an mbox file into individual .eml files
    Split {
        /// Input mbox file
        input: PathBuf,
        /// Output directory (default: ./0-originals/<name>)
        output: Option<PathBuf>,
    },
    /// Recover dates and standardize headers for a directory of .eml files
    Fix {
        /// Input directory of .eml files
        input: PathBuf,
        /// Output directory (default: ./1-fixed/<name>)
        output: Option<PathBuf>,
    },
    /// Remove duplicate messages, keeping the cleanest copy of each
    Dedup {
        /// Input directory of .eml files
        input: PathBuf,
        /// Output directory (default: ./2-deduplicated/<name>)
        output: Option<PathBuf>,
    },
    /// Reassemble a directory of .eml files into a single mbox
    Assemble {
        /// Input directory of .eml files
        input: PathBuf,
        /// Output mbox file (default: ./3-mbox/<name>.mbox)
        output: Option<PathBuf>,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    });

    match cli.command {
        Commands::Split { input, output } => cmd_split(&input, output, cli.json),
        Commands::Fix { input, output } => cmd_fix(&input, output, cli.json),
        Commands::Dedup { input, output } => cmd_dedup(&input, output, cli.json),
        Commands::Assemble { input, output } => cmd_assemble(&input, output, cli.json),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing to stderr with an env-filter override.
fn setup_logging(level: &str) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .init();
}

/// Standard batch progress bar.
fn batch_bar(label: &str) -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} {label} [{{bar:40.cyan/blue}}] {{pos}}/{{len}}"
            ))
            .expect("valid template")
            .progress_chars("#>-"),
    );
    pb
}

fn cmd_split(input: &Path, output: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    if !input.exists() {
        anyhow::bail!("Input mbox not found: {}", input.display());
    }
    let output = output.unwrap_or_else(|| outdir::stage_output_dir(input, outdir::STAGE_SPLIT));

    let pb = batch_bar("Splitting");
    let stats = split::split_mbox_file(input, &output, &|current, total| {
        pb.set_length(total as u64);
        pb.set_position(current as u64);
    })?;
    pb.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!();
    println!("  {:<25} {}", "Input file", input.display());
    println!("  {:<25} {}", "Output directory", output.display());
    println!("  {:<25} {}", "Messages found", stats.total);
    println!("  {:<25} {}", "Written", stats.written);
    if stats.failed > 0 {
        println!("  {:<25} {}", "Failed", stats.failed);
    }
    println!();
    Ok(())
}

fn cmd_fix(input: &Path, output: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    if !input.exists() {
        anyhow::bail!("Input directory not found: {}", input.display());
    }
    let output = output.unwrap_or_else(|| outdir::stage_output_dir(input, outdir::STAGE_FIX));

    let pb = batch_bar("Fixing");
    let stats = datefix::fix_directory(input, &output, &|current, total| {
        pb.set_length(total as u64);
        pb.set_position(current as u64);
    })?;
    pb.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!();
    println!("  {:<25} {}", "Input directory", input.display());
    println!("  {:<25} {}", "Output directory", output.display());
    println!("  {:<25} {}", "Processed", stats.processed);
    println!("  {:<25} {}", "Failed", stats.failed.len());
    if !stats.failed.is_empty() {
        println!();
        println!("  Failed files:");
        for (path, reason) in &stats.failed {
            println!("    {} — {}", path.display(), reason);
        }
    }
    println!();
    Ok(())
}

fn cmd_dedup(input: &Path, output: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    if !input.exists() {
        anyhow::bail!("Input directory not found: {}", input.display());
    }
    let output = output.unwrap_or_else(|| outdir::stage_output_dir(input, outdir::STAGE_DEDUP));

    let pb = batch_bar("Scanning");
    let stats = dedup::dedup_directory(input, &output, &|current, total| {
        pb.set_length(total as u64);
        pb.set_position(current as u64);
    })?;
    pb.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!();
    println!("  {:<25} {}", "Input directory", input.display());
    println!("  {:<25} {}", "Output directory", output.display());
    println!("  {:<25} {}", "Files processed", stats.total);
    println!("  {:<25} {}", "Duplicate groups", stats.groups.len());
    println!("  {:<25} {}", "Duplicates removed", stats.duplicates_removed);
    println!("  {:<25} {}", "Files kept", stats.kept);
    for group in &stats.groups {
        println!();
        println!("  Group {}", group.key);
        println!("    kept    {}", group.kept.display());
        for dropped in &group.dropped {
            println!("    dropped {}", dropped.display());
        }
    }
    println!();
    Ok(())
}

fn cmd_assemble(input: &Path, output: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    if !input.exists() {
        anyhow::bail!("Input directory not found: {}", input.display());
    }
    let output = output.unwrap_or_else(|| outdir::default_mbox_path(input));

    let pb = batch_bar("Assembling");
    let stats = assemble::assemble_directory(input, &output, &|current, total| {
        pb.set_length(total as u64);
        pb.set_position(current as u64);
    })?;
    pb.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!();
    println!("  {:<25} {}", "Input directory", input.display());
    println!("  {:<25} {}", "Output file", output.display());
    println!("  {:<25} {}", "Files found", stats.total);
    println!("  {:<25} {}", "Written", stats.written);
    if stats.failed > 0 {
        println!("  {:<25} {}", "Skipped", stats.failed);
    }
    println!(
        "  {:<25} {}",
        "Output size",
        format_size(stats.output_size, BINARY)
    );
    println!();
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mboxmend", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}
