//! linewire CLI binary.
//!
//! Connects to a local Unix-domain socket, sends the `HELLO` handshake and
//! prints every line the peer sends until it closes the connection or
//! Ctrl-C is pressed.
//!
//! Settings are layered: config file, then `LINEWIRE_*` environment
//! variables, then command-line flags.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use linewire::{
    Config, ConfigOverlay, Endpoint, Message, PartialFramePolicy, Session, SessionOverrides,
    StopSignal, VERSION,
};

#[derive(Parser)]
#[command(name = "linewire")]
#[command(version = VERSION)]
#[command(about = "Handshake with a local line-protocol peer and print its messages", long_about = None)]
struct Cli {
    /// Socket path of the peer (or LINEWIRE_ENDPOINT / config `endpoint`)
    endpoint: Option<Endpoint>,

    /// Config file (default: <config dir>/linewire/config.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pause before the handshake, in milliseconds
    #[arg(long)]
    settle_ms: Option<u64>,

    /// Connect timeout, in milliseconds
    #[arg(long)]
    connect_timeout_ms: Option<u64>,

    /// Fail when no data arrives for this many milliseconds
    #[arg(long)]
    idle_timeout_ms: Option<u64>,

    /// Maximum accepted frame length in bytes
    #[arg(long)]
    max_frame_len: Option<usize>,

    /// Print an undelimited final line instead of dropping it
    #[arg(long)]
    emit_partial: bool,

    /// Print messages as JSON objects
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    let config = load_config(&cli)?;
    let endpoint = match cli.endpoint.clone() {
        Some(endpoint) => endpoint,
        None => config
            .endpoint()?
            .context("no endpoint given (pass ENDPOINT, set LINEWIRE_ENDPOINT, or configure `endpoint`)")?,
    };
    let session_config = config.session_config()?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(endpoint, session_config, cli.json))
}

fn init_logging(verbose: bool, json: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let file = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load_default()?,
    };

    let flags = ConfigOverlay {
        endpoint: None,
        session: SessionOverrides {
            settle_delay_ms: cli.settle_ms,
            connect_timeout_ms: cli.connect_timeout_ms,
            idle_timeout_ms: cli.idle_timeout_ms,
            max_frame_len: cli.max_frame_len,
            partial_frame: cli.emit_partial.then_some(PartialFramePolicy::Emit),
        },
    };

    Ok(file.merge(Config::from_env()).merge(flags))
}

async fn run(
    endpoint: Endpoint,
    session_config: linewire::SessionConfig,
    json: bool,
) -> anyhow::Result<()> {
    let (stop_handle, stop) = StopSignal::new();

    let ctrl_c_handle = stop_handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping");
            ctrl_c_handle.stop();
        }
    });

    let mut session = match Session::open(endpoint.clone(), session_config, stop).await {
        Ok(session) => session,
        Err(e) if e.is_cancelled() => return Ok(()),
        Err(e) => return Err(e).with_context(|| format!("failed to open session to {endpoint}")),
    };
    match session.handshake().await {
        Ok(()) => {},
        Err(e) if e.is_cancelled() => return Ok(()),
        Err(e) => return Err(e.into()),
    }

    let mut stdout = io::stdout().lock();
    let mut output_error: Option<io::Error> = None;
    let result = session
        .receive_loop(|message| {
            if output_error.is_some() {
                return;
            }
            if let Err(e) = print_message(&mut stdout, &message, json) {
                output_error = Some(e);
                stop_handle.stop();
            }
        })
        .await;

    match (result, output_error) {
        (_, Some(e)) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        (_, Some(e)) => Err(e).context("failed to write to stdout"),
        (Ok(stats), None) => {
            tracing::info!(
                messages = stats.messages_received,
                bytes = stats.bytes_received,
                uptime_ms = stats.uptime.as_millis() as u64,
                "Session finished"
            );
            Ok(())
        },
        (Err(e), None) if e.is_cancelled() => Ok(()),
        (Err(e), None) => Err(e.into()),
    }
}

fn print_message(out: &mut impl Write, message: &Message, json: bool) -> io::Result<()> {
    if json {
        serde_json::to_writer(&mut *out, &message.record())?;
        out.write_all(b"\n")?;
    } else {
        out.write_all(message.as_bytes())?;
        out.write_all(b"\n")?;
    }
    out.flush()
}
