mod ram;
mod stats;
mod trace;

use std::{fs, io, process::ExitCode};

use cashier::{cache::Cache, clock::Tick, config::Config, error::CacheError};
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ram::Ram;
use stats::{CacheStats, Counters};
use trace::{Access, Trace, TraceError};

#[derive(Debug, Error)]
enum RunError {
    #[error("bad arguments: {0}")]
    Args(#[from] pico_args::Error),
    #[error("must provide a config with --config <json> or -p <path>")]
    NoConfig,
    #[error("must provide a trace with -t")]
    NoTrace,
    #[error("{path}: {source}")]
    Io { path: String, source: io::Error },
    #[error("bad config: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Trace(#[from] TraceError),
}

fn io_error(path: &str) -> impl FnOnce(io::Error) -> RunError + '_ {
    move |source| RunError::Io {
        path: path.to_string(),
        source,
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            eprintln!("cashier: {err}");
            ExitCode::FAILURE
        }
    }
}

/// How a trace is fed through the cache.
#[derive(Debug, Clone, Copy)]
struct Replay {
    n_warm: u64,
    heartbeat_int: u64,
    access_per_block: usize,
    blocks_per_queue: usize,
}

impl Default for Replay {
    fn default() -> Self {
        Replay {
            n_warm: 0,
            heartbeat_int: 0,
            access_per_block: 1024 * 16,
            blocks_per_queue: 32,
        }
    }
}

/// Reports progress every `interval` accesses; an interval of 0 is silent.
/// Driven by the total access count, which warmup never resets.
#[derive(Debug)]
struct Heartbeat {
    interval: u64,
    next: u64,
}

impl Heartbeat {
    fn new(interval: u64) -> Self {
        Heartbeat {
            interval,
            next: interval,
        }
    }

    fn due(&mut self, ran: u64) -> bool {
        if self.interval == 0 || ran <= self.next {
            return false;
        }
        while self.next < ran {
            self.next += self.interval;
        }
        true
    }
}

fn run() -> Result<(), RunError> {
    let mut args = pico_args::Arguments::from_env();
    let defaults = Replay::default();
    let replay = Replay {
        n_warm: args.opt_value_from_str("-w")?.unwrap_or(defaults.n_warm),
        heartbeat_int: args.opt_value_from_str("-h")?.unwrap_or(defaults.heartbeat_int),
        access_per_block: args
            .opt_value_from_str("--buffer-size")?
            .unwrap_or(defaults.access_per_block),
        blocks_per_queue: args
            .opt_value_from_str("--queue-size")?
            .unwrap_or(defaults.blocks_per_queue),
    };

    let config_str: String = if let Some(config_str) = args.opt_value_from_str("--config")? {
        config_str
    } else {
        let config_path: String = args.opt_value_from_str("-p")?.ok_or(RunError::NoConfig)?;
        fs::read_to_string(&config_path).map_err(io_error(&config_path))?
    };
    let config: Config = serde_json::from_str(&config_str)?;

    let stats_path: Option<String> = args.opt_value_from_str("--json")?;
    let trace_path: String = args.opt_value_from_str("-t")?.ok_or(RunError::NoTrace)?;

    let stats = simulate(&config, &trace_path, replay)?;
    match stats_path {
        Some(path) => {
            let stats_file = fs::File::create(&path).map_err(io_error(&path))?;
            serde_json::to_writer_pretty(stats_file, &stats)?;
        }
        None => println!("{}", serde_json::to_string_pretty(&stats)?),
    }
    Ok(())
}

/// Replays the trace at `trace_path` through a fresh cache and returns the
/// statistics gathered after warmup, including the traffic of the final
/// write-back.
fn simulate(config: &Config, trace_path: &str, replay: Replay) -> Result<CacheStats, RunError> {
    let trace = Trace::read(
        trace_path.into(),
        replay.access_per_block,
        replay.blocks_per_queue,
    )
    .map_err(io_error(trace_path))?;

    let mut ram = Ram::new(config.cache.address_bits, config.seed);
    info!(name = %config.name, bytes = ram.len(), seed = config.seed, "backing memory ready");

    let mut cache = config.to_cache(&mut ram, Tick::new())?;
    let mut counters = Counters::default();
    let mut warmup = replay.n_warm > 0;
    let mut ran: u64 = 0;
    let mut heartbeat = Heartbeat::new(replay.heartbeat_int);

    for block in trace.rec.iter() {
        for access in block? {
            let result = match access {
                Access::Read(addr) => cache.read(addr)?.1,
                Access::Write(addr, byte) => cache.write(addr, byte)?,
            };
            counters.record(access, result);
            ran += 1;

            if warmup && ran >= replay.n_warm {
                counters.clear_stats(cache.memory());
                warmup = false;
                println!("Finished Warmup!");
            }
        }
        if heartbeat.due(ran) {
            println!("Accesses: {ran}");
        }
    }
    println!("Ran {ran} accesses");

    release(cache)?;
    Ok(counters.make_stats(&config.name, &ram))
}

fn release(cache: Cache<&mut Ram, Tick>) -> Result<(), CacheError> {
    let dirty = cache.lines().iter().filter(|line| line.dirty).count();
    info!(dirty, "releasing cache");
    cache.release()
}
