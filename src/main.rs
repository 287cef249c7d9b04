//! CLI entry point for `eml2pdf`.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use eml2pdf::config::Config;

#[derive(Parser)]
#[command(
    name = "eml2pdf",
    version,
    about = "Convert EML email messages into paginated PDF documents"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// EML file(s) to convert when no subcommand is given
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Directory for generated PDFs (default: next to each source file)
    #[arg(short, long, global = true, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert EML files to PDF
    Convert {
        /// EML files to convert
        files: Vec<PathBuf>,
    },
    /// Run the HTTP conversion service
    Serve {
        /// Bind address (default: from config)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (default: from config)
        #[arg(long)]
        port: Option<u16>,
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

    // Load configuration
    let config = eml2pdf::config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Some(Commands::Convert { files }) => cmd_convert(&files, cli.output.as_deref(), &config),
        Some(Commands::Serve { host, port }) => cmd_serve(host, port, &config),
        Some(Commands::Completions { shell }) => cmd_completions(shell),
        Some(Commands::Manpage) => cmd_manpage(),
        None => {
            if cli.files.is_empty() {
                eprintln!("No input files given. Try 'eml2pdf --help'.");
                Ok(())
            } else {
                cmd_convert(&cli.files, cli.output.as_deref(), &config)
            }
        }
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_dir = eml2pdf::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "eml2pdf.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Convert one or more EML files to PDF.
fn cmd_convert(files: &[PathBuf], output: Option<&Path>, config: &Config) -> anyhow::Result<()> {
    if files.is_empty() {
        anyhow::bail!("No input files given");
    }
    for file in files {
        if !file.exists() {
            anyhow::bail!("File not found: {}", file.display());
        }
    }

    // The CLI flag wins over the configured default directory.
    let out_dir = output
        .map(Path::to_path_buf)
        .or_else(|| config.output.dir.clone());
    if let Some(dir) = &out_dir {
        std::fs::create_dir_all(dir)?;
    }

    let pb = if files.len() > 1 {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} Converting [{bar:40.cyan/blue}] {pos}/{len}")
                .expect("valid template")
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let start = Instant::now();
    for file in files {
        let message = eml2pdf::parser::parse_file(file)?;
        let target = pdf_output_path(file, out_dir.as_deref());
        eml2pdf::render::render_pdf_file(&message, &target)?;

        let line = format!(
            "  {} -> {} ({} attachment(s))",
            file.display(),
            target.display(),
            message.attachments.len()
        );
        match &pb {
            Some(pb) => pb.println(line),
            None => println!("{line}"),
        }
        if let Some(pb) = &pb {
            pb.inc(1);
        }
    }
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    println!(
        "  Converted {} file(s) in {:.2?}",
        files.len(),
        start.elapsed()
    );
    Ok(())
}

/// Output path for a converted file: inside the output directory when one
/// is given, otherwise next to the source with the extension swapped.
fn pdf_output_path(input: &Path, out_dir: Option<&Path>) -> PathBuf {
    match out_dir {
        Some(dir) => {
            let stem = input.file_stem().unwrap_or_else(|| OsStr::new("converted"));
            let mut name = stem.to_os_string();
            name.push(".pdf");
            dir.join(name)
        }
        None => input.with_extension("pdf"),
    }
}

/// Run the HTTP conversion service until interrupted.
fn cmd_serve(host: Option<String>, port: Option<u16>, config: &Config) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");
    let state = eml2pdf::server::AppState::from_config(config);

    println!("  Serving on http://{addr} (Ctrl-C to stop)");

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(eml2pdf::server::serve(&addr, state))?;
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "eml2pdf", &mut std::io::stdout());
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
