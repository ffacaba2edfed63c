//! Command-line driver for the record pipeline and its collaborators.

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use runtime_native::{available_cores, PipelineConfig, StatsSnapshot};
use sys_storage::{FileBackend, SysConfig, SysStorage};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use transport::{PoolOccupancy, StrategyKind};

/// Text rendering helpers used by the CLI commands.
mod render {
    use std::fmt::Write;

    use runtime_native::StatsSnapshot;
    use sys_storage::SysConfig;
    use transport::{PoolOccupancy, StrategyKind};

    /// Format the end-of-run report.
    pub fn run_report(
        strategy: StrategyKind,
        capacity: u32,
        payload: usize,
        stats: &StatsSnapshot,
        occupancy: Option<PoolOccupancy>,
    ) -> String {
        let unit = match strategy {
            StrategyKind::Copy => "record channel",
            StrategyKind::Pool => "slot pool",
        };
        let mut out = String::new();
        writeln!(out, "Strategy: {strategy} ({capacity}-{unit}, {payload}-byte payload)")
            .expect("write strategy");
        writeln!(
            out,
            "Sent={} Consumed={} Corrupted={} TicksMissed={}",
            stats.sent, stats.consumed, stats.corrupted, stats.ticks_missed
        )
        .expect("write counters");
        writeln!(
            out,
            "Dropped={} (queue full {}, pool exhausted {})",
            stats.dropped(),
            stats.dropped_queue_full,
            stats.dropped_pool_exhausted
        )
        .expect("write drops");
        let latency = &stats.latency;
        let written = match latency.mean_us() {
            Some(mean) => writeln!(
                out,
                "Latency(us): samples={} min={} mean={mean:.1} max={} last={}",
                latency.count, latency.min_us, latency.max_us, latency.last_us
            ),
            None => writeln!(out, "Latency(us): no samples"),
        };
        written.expect("write latency");
        if let Some(o) = occupancy {
            writeln!(
                out,
                "Pool: free={} acquired={} in_transit={} owned={}",
                o.free, o.acquired, o.in_transit, o.owned
            )
            .expect("write pool");
        }
        out
    }

    /// Format a stored system config.
    pub fn sys_config(config: &SysConfig) -> String {
        format!(
            "Magic=0x{:08X} Version={} Flag=0x{:02X}\n",
            config.magic_id, config.config_ver, config.flag
        )
    }
}

/// Benchmark cross-core record handoff.
#[derive(Parser, Debug)]
#[command(author, version, about = "Cross-core record pipeline bench", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the producer/consumer pipeline and print its counters.
    Run(RunArgs),
    /// Relay `[payload]` frames from a TCP peer to stdout with a CRC suffix.
    Relay {
        /// Address to bind.
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to bind.
        #[arg(long, default_value_t = 3333)]
        port: u16,
    },
    /// Save or load the persisted system config.
    Config {
        /// Storage directory.
        #[arg(long, default_value = "ipc-store")]
        dir: PathBuf,
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Transport strategy.
    #[arg(long, value_enum, default_value_t = StrategyArg::Pool)]
    strategy: StrategyArg,
    /// Channel depth (copy) or pool size (pool); strategy default when omitted.
    #[arg(long)]
    capacity: Option<u32>,
    /// Record payload size in bytes.
    #[arg(long, value_enum, default_value_t = PayloadSize::B4096)]
    payload: PayloadSize,
    /// Producer tick interval in microseconds.
    #[arg(long, default_value_t = 1_000)]
    interval_us: u64,
    /// Sample latency every K consumed records; strategy default when omitted.
    #[arg(long)]
    sample_every: Option<u32>,
    /// Simulated per-record consumer work in microseconds; strategy default when omitted.
    #[arg(long)]
    work_us: Option<u64>,
    /// Core for the producer timer thread.
    #[arg(long)]
    producer_core: Option<usize>,
    /// Core for the consumer thread.
    #[arg(long)]
    consumer_core: Option<usize>,
    /// Leave both threads unpinned.
    #[arg(long, conflicts_with_all = ["producer_core", "consumer_core"])]
    no_pin: bool,
    /// How long to run before printing the report.
    #[arg(long, default_value_t = 10)]
    duration_secs: u64,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Persist a config record.
    Save {
        /// Magic identifier (decimal or hex, e.g. 0xAABBCCDD).
        #[arg(long, value_parser = parse_u32, default_value = "0xAABBCCDD")]
        magic: u32,
        /// Layout version.
        #[arg(long, default_value_t = 1)]
        version: u16,
        /// Flag byte (decimal or hex).
        #[arg(long, value_parser = parse_u8, default_value = "0xFF")]
        flag: u8,
    },
    /// Print the persisted config record.
    Load,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyArg {
    /// Full-payload copy through a bounded channel.
    Copy,
    /// Slot-index handoff through a buffer pool.
    Pool,
}

impl From<StrategyArg> for StrategyKind {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Copy => StrategyKind::Copy,
            StrategyArg::Pool => StrategyKind::Pool,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PayloadSize {
    #[value(name = "64")]
    B64,
    #[value(name = "256")]
    B256,
    #[value(name = "1024")]
    B1024,
    #[value(name = "4096")]
    B4096,
}

impl PayloadSize {
    fn bytes(self) -> usize {
        match self {
            PayloadSize::B64 => 64,
            PayloadSize::B256 => 256,
            PayloadSize::B1024 => 1024,
            PayloadSize::B4096 => 4096,
        }
    }
}

fn main() -> Result<()> {
    init_tracing();

    match Cli::parse().command {
        Command::Run(args) => handle_run(args),
        Command::Relay { host, port } => handle_relay(&host, port),
        Command::Config { dir, action } => handle_config(dir, action),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Ignore error if already set (e.g., during tests).
    let _ = fmt().with_env_filter(env_filter).with_writer(io::stderr).try_init();
}

fn pipeline_config(args: &RunArgs) -> PipelineConfig {
    let mut config = PipelineConfig::new(args.strategy.into());
    if let Some(capacity) = args.capacity {
        config.capacity = capacity;
    }
    if let Some(sample_every) = args.sample_every {
        config.sample_every = sample_every;
    }
    if let Some(work_us) = args.work_us {
        config.consumer_work = Duration::from_micros(work_us);
    }
    config.tick_interval = Duration::from_micros(args.interval_us);

    let explicit = args.producer_core.is_some() || args.consumer_core.is_some();
    if explicit {
        config.producer_core = args.producer_core;
        config.consumer_core = args.consumer_core;
    } else if !args.no_pin && available_cores() >= 2 {
        config.producer_core = Some(0);
        config.consumer_core = Some(1);
    }
    config
}

fn handle_run(args: RunArgs) -> Result<()> {
    let config = pipeline_config(&args);
    let duration = Duration::from_secs(args.duration_secs);
    let (stats, occupancy) = match args.payload {
        PayloadSize::B64 => run_pipeline::<64>(config.clone(), duration)?,
        PayloadSize::B256 => run_pipeline::<256>(config.clone(), duration)?,
        PayloadSize::B1024 => run_pipeline::<1024>(config.clone(), duration)?,
        PayloadSize::B4096 => run_pipeline::<4096>(config.clone(), duration)?,
    };
    print!(
        "{}",
        render::run_report(
            config.strategy,
            config.capacity,
            args.payload.bytes(),
            &stats,
            occupancy
        )
    );
    Ok(())
}

fn run_pipeline<const N: usize>(
    config: PipelineConfig,
    duration: Duration,
) -> Result<(StatsSnapshot, Option<PoolOccupancy>)> {
    let handle = runtime_native::start::<N>(config).context("failed to start pipeline")?;
    info!(secs = duration.as_secs(), "running");
    thread::sleep(duration);
    let occupancy = handle.occupancy();
    let stats = handle.stop();
    if stats.corrupted > 0 {
        warn!(corrupted = stats.corrupted, "corrupted records observed");
    }
    Ok((stats, occupancy))
}

fn handle_relay(host: &str, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .context("failed to parse bind address")?;
    let listener =
        TcpListener::bind(addr).with_context(|| format!("failed to bind listener on {addr}"))?;
    let stdout = io::stdout();
    let mut forward = stdout.lock();
    relay_codec::serve(&listener, &mut forward).context("relay stopped")
}

fn handle_config(dir: PathBuf, action: ConfigAction) -> Result<()> {
    let storage = SysStorage::new(FileBackend::new(dir));
    match action {
        ConfigAction::Save {
            magic,
            version,
            flag,
        } => {
            let config = SysConfig {
                magic_id: magic,
                config_ver: version,
                flag,
            };
            storage.save(&config).context("failed to save config")?;
            print!("Saved {}", render::sys_config(&config));
        }
        ConfigAction::Load => {
            let config = storage.load().with_context(|| {
                format!(
                    "failed to load config from {}",
                    storage.backend().root().display()
                )
            })?;
            print!("{}", render::sys_config(&config));
        }
    }
    Ok(())
}

fn parse_u32(input: &str) -> Result<u32, String> {
    if let Some(stripped) = input.strip_prefix("0x") {
        u32::from_str_radix(stripped, 16).map_err(|_| format!("invalid hex value '{input}'"))
    } else {
        input
            .parse::<u32>()
            .map_err(|_| format!("invalid number '{input}'"))
    }
}

fn parse_u8(input: &str) -> Result<u8, String> {
    let value = parse_u32(input)?;
    u8::try_from(value).map_err(|_| format!("'{input}' does not fit in a byte"))
}
