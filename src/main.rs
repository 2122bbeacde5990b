use clap::{Parser, Subcommand};
use cipherbench::cli::{
    compare_strategies, decode_file, digest_file, encode_file, render_comparison, render_report,
    run_benchmark,
};
use cipherbench::options::{default_workers, BenchOptions, Buffering, IoPath};
use cipherbench::progress::{ProgressHandle, ProgressSink};
use cipherbench::Result;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Version info from build.rs
const VERSION: &str = env!("CIPHERBENCH_VERSION");
const BUILD: &str = env!("CIPHERBENCH_BUILD");
const PROFILE: &str = env!("CIPHERBENCH_PROFILE");
const GIT_HASH: &str = env!("CIPHERBENCH_GIT_HASH");

fn get_version() -> &'static str {
    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();
    VERSION_STRING.get_or_init(|| format!("{} {} build {} ({})", PROFILE, VERSION, BUILD, GIT_HASH))
}

#[derive(Parser)]
#[command(name = "cipherbench")]
#[command(author, about = "Parallel encode, digest, verify and decode benchmark", long_about = None)]
struct Cli {
    /// Print version
    #[arg(short = 'V', long)]
    version: bool,

    /// Debug logging on stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline over N copies of a source file
    #[command(alias = "r")]
    Run {
        /// Source file
        source: PathBuf,

        /// Number of copies (1-50)
        #[arg(short = 'n', long, default_value = "1")]
        copies: usize,

        /// Worker threads (defaults to min(4, cores))
        #[arg(short, long)]
        workers: Option<usize>,

        /// Storage buffering policy
        #[arg(long, default_value = "large", value_parser = parse_buffering)]
        buffering: Buffering,

        /// Re-read artifacts from disk or keep them in memory
        #[arg(long, default_value = "in-memory", value_parser = parse_io_path)]
        io_path: IoPath,

        /// Directory for derived artifacts (defaults to a temp directory)
        #[arg(long)]
        work_dir: Option<PathBuf>,

        /// Leave artifacts in place after the run
        #[arg(long)]
        keep: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// No per-unit progress lines
        #[arg(short, long)]
        quiet: bool,
    },

    /// Run the read-back/unbuffered baseline and the in-memory/large-buffer
    /// variant back to back and report the difference
    #[command(alias = "c")]
    Compare {
        /// Source file
        source: PathBuf,

        /// Number of copies (1-50)
        #[arg(short = 'n', long, default_value = "1")]
        copies: usize,

        /// Worker threads (defaults to min(4, cores))
        #[arg(short, long)]
        workers: Option<usize>,

        /// Directory for derived artifacts (defaults to a temp directory)
        #[arg(long)]
        work_dir: Option<PathBuf>,

        /// Print the comparison as JSON
        #[arg(long)]
        json: bool,

        /// No per-unit progress lines
        #[arg(short, long)]
        quiet: bool,
    },

    /// Print the SHA-256 of a file
    #[command(alias = "d")]
    Digest {
        file: PathBuf,
    },

    /// Encode a file
    Encode {
        input: PathBuf,
        output: PathBuf,
    },

    /// Decode a file
    Decode {
        input: PathBuf,
        output: PathBuf,
    },
}

fn parse_buffering(s: &str) -> std::result::Result<Buffering, String> {
    s.parse().map_err(|e| format!("{}", e))
}

fn parse_io_path(s: &str) -> std::result::Result<IoPath, String> {
    s.parse().map_err(|e| format!("{}", e))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

/// Progress goes to stdout unless the output must stay machine readable
fn progress_sink(enabled: bool) -> Result<Option<ProgressSink<Stdout>>> {
    if enabled {
        Ok(Some(ProgressSink::spawn(io::stdout())?))
    } else {
        Ok(None)
    }
}

fn with_progress<T>(enabled: bool, f: impl FnOnce(ProgressHandle) -> Result<T>) -> Result<T> {
    let sink = progress_sink(enabled)?;
    let handle = sink.as_ref().map(ProgressSink::handle).unwrap_or_default();
    let result = f(handle);
    if let Some(sink) = sink {
        sink.finish()?;
    }
    result
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version {
        println!("cipherbench {}", get_version());
        return ExitCode::SUCCESS;
    }

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            use clap::CommandFactory;
            let _ = Cli::command().print_help();
            println!();
            return ExitCode::SUCCESS;
        }
    };

    init_tracing(cli.verbose);

    let result = match command {
        Commands::Run {
            source,
            copies,
            workers,
            buffering,
            io_path,
            work_dir,
            keep,
            json,
            quiet,
        } => {
            let options = BenchOptions {
                copies,
                workers: workers.unwrap_or_else(default_workers),
                buffering,
                io_path,
                work_dir,
                keep_artifacts: keep,
            };

            with_progress(!quiet && !json, |progress| run_benchmark(&source, &options, progress))
                .and_then(|report| {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&report)?);
                    } else {
                        print!("{}", render_report(&report));
                    }
                    Ok(())
                })
        }

        Commands::Compare {
            source,
            copies,
            workers,
            work_dir,
            json,
            quiet,
        } => {
            let options = BenchOptions {
                copies,
                workers: workers.unwrap_or_else(default_workers),
                work_dir,
                ..Default::default()
            };

            with_progress(!quiet && !json, |progress| compare_strategies(&source, &options, progress))
                .and_then(|cmp| {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&cmp)?);
                    } else {
                        print!("{}", render_comparison(&cmp));
                    }
                    Ok(())
                })
        }

        Commands::Digest { file } => digest_file(&file).map(|line| print!("{}", line)),

        Commands::Encode { input, output } => encode_file(&input, &output).map(|n| {
            println!("Encoded {} bytes to {}", n, output.display());
        }),

        Commands::Decode { input, output } => decode_file(&input, &output).map(|n| {
            println!("Decoded {} bytes to {}", n, output.display());
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
