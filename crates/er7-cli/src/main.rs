use clap::Parser;
use er7_cli::{Commands, ParserArgs, run};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "er7",
    about = "Decode, re-encode and acknowledge HL7 v2 pipe-delimited messages",
    version,
    author,
    long_about = "A command-line tool for HL7 v2 messages in the ER7 (pipe-delimited) encoding. \
                  Messages are placed into the groups of their structure using the built-in \
                  catalog for v2.3 through v2.6."
)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(short, long, value_enum, global = true, default_value = "warn")]
    log_level: LogLevel,

    #[command(flatten)]
    parser: ParserArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so command output can be piped
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let output = run(&cli.command, &cli.parser)?;
    print!("{output}");
    Ok(())
}
