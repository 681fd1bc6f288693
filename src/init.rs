//! Start-up helpers for the binary: argument parsing and wiring the registry, the store and
//! the background tasks together.

use std::env;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context};
use tokio::task::JoinHandle;

use crate::config::{self, Timing};
use crate::elevator_logic::timer::{SharedClock, TokioClock};
use crate::persistence::memory::MemoryStore;
use crate::persistence::worker::{self, RetryPolicy, WorkerStats};
use crate::persistence::{Persister, Store};
use crate::registry::ElevatorRegistry;

/// One call given on the command line as `pickup:destination:passengers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSpec {
    #[allow(missing_docs)]
    pub pickup: i32,
    #[allow(missing_docs)]
    pub destination: i32,
    #[allow(missing_docs)]
    pub passengers: u32,
}

impl FromStr for CallSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 3 {
            bail!("call '{}' is not pickup:destination:passengers", s);
        }
        Ok(CallSpec {
            pickup: parts[0].parse().with_context(|| format!("bad pickup floor in '{}'", s))?,
            destination: parts[1].parse().with_context(|| format!("bad destination floor in '{}'", s))?,
            passengers: parts[2].parse().with_context(|| format!("bad passenger count in '{}'", s))?,
        })
    }
}

/// Calls submitted when none are given.
pub const DEMO_CALLS: [CallSpec; 3] = [
    CallSpec { pickup: 0, destination: 5, passengers: 2 },
    CallSpec { pickup: 3, destination: 1, passengers: 1 },
    CallSpec { pickup: 7, destination: 2, passengers: 3 },
];

/// Command-line options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Capacity of the elevator
    pub capacity: u32,
    /// Calls to submit, in order
    pub calls: Vec<CallSpec>,
    /// Only errors are printed
    pub quiet: bool,
    /// Print the final status as JSON
    pub json: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            capacity: config::DEFAULT_MAX_CAPACITY,
            calls: DEMO_CALLS.to_vec(),
            quiet: false,
            json: false,
        }
    }
}

fn set_switch(switch: &std::sync::Mutex<bool>, on: bool) {
    match switch.lock() {
        Ok(mut s) => *s = on,
        Err(poisoned) => *poisoned.into_inner() = on,
    }
}

fn parse_bool(key: &str, value: &str) -> anyhow::Result<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("{} expects true/false, got '{}'", key, value),
    }
}

/// Parses `args` (without the program name).
///
/// Options are written `key::value`, `--key=value` or `--key value`:
/// - `capacity::<n>`
/// - `calls::<p:d:n>,<p:d:n>,...`
/// - `quiet` (only errors)
/// - `json` (final status as JSON)
/// - `print_status`, `print_err`, `print_warn`, `print_ok`, `print_info`, `print_elev` with `true/false`
/// - `help`
pub fn parse_from<I>(args: I) -> anyhow::Result<Options>
where
    I: IntoIterator<Item = String>,
{
    let mut options = Options::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let arg = arg.trim_start_matches("--").to_lowercase();
        let (key, inline) = match arg.split_once("::").or_else(|| arg.split_once('=')) {
            Some((k, v)) => (k.to_string(), Some(v.to_string())),
            None => (arg.clone(), None),
        };
        let mut value = || -> anyhow::Result<String> {
            match &inline {
                Some(v) => Ok(v.clone()),
                None => args.next().with_context(|| format!("{} needs a value", key)),
            }
        };

        match key.as_str() {
            "capacity" => {
                let v = value()?;
                options.capacity = v.parse().with_context(|| format!("bad capacity '{}'", v))?;
                if options.capacity == 0 {
                    bail!("capacity must be at least 1");
                }
            }
            "calls" => {
                options.calls = value()?
                    .split(',')
                    .filter(|c| !c.trim().is_empty())
                    .map(CallSpec::from_str)
                    .collect::<anyhow::Result<Vec<_>>>()?;
            }
            "quiet" => options.quiet = true,
            "json" => options.json = true,
            "print_status" => set_switch(&config::PRINT_STATUS_ON, parse_bool(&key, &value()?)?),
            "print_err" => set_switch(&config::PRINT_ERR_ON, parse_bool(&key, &value()?)?),
            "print_warn" => set_switch(&config::PRINT_WARN_ON, parse_bool(&key, &value()?)?),
            "print_ok" => set_switch(&config::PRINT_OK_ON, parse_bool(&key, &value()?)?),
            "print_info" => set_switch(&config::PRINT_INFO_ON, parse_bool(&key, &value()?)?),
            "print_elev" => set_switch(&config::PRINT_ELEV_ON, parse_bool(&key, &value()?)?),
            "help" => {
                println!("Available arguments:");
                println!("  capacity::<n>                 riders the car holds (default {})", config::DEFAULT_MAX_CAPACITY);
                println!("  calls::<p:d:n>,...            calls to submit (default: a demo set)");
                println!("  quiet                         only print errors");
                println!("  json                          print the final status as JSON");
                println!("  print_<channel>::true/false   status, err, warn, ok, info, elev");
                std::process::exit(0);
            }
            other => bail!("unknown argument '{}' (try 'help')", other),
        }
    }
    Ok(options)
}

/// Parses the process arguments.
pub fn parse_args() -> anyhow::Result<Options> {
    parse_from(env::args().skip(1))
}

/// The running engine: registry, store and background tasks.
pub struct System {
    /// Root of the engine
    pub registry: Arc<ElevatorRegistry>,
    /// The bundled store the worker writes to
    pub store: Arc<MemoryStore>,
    worker: JoinHandle<WorkerStats>,
    sweeper: JoinHandle<()>,
}

/// Builds the registry with one elevator of `capacity`, a [MemoryStore], and spawns the
/// persistence worker and the sweeper.
pub fn build(capacity: u32, timing: Timing, clock: SharedClock) -> System {
    let store = Arc::new(MemoryStore::new());
    let (persister, rx) = Persister::channel(config::PERSIST_QUEUE_CAPACITY);

    let worker = {
        let store: Arc<dyn Store> = store.clone();
        let clock = clock.clone();
        tokio::spawn(async move { worker::run_persistence_worker(store, rx, clock, RetryPolicy::default()).await })
    };
    let sweeper = {
        let store: Arc<dyn Store> = store.clone();
        let clock = clock.clone();
        tokio::spawn(async move { worker::run_sweeper(store, clock, config::SWEEP_INTERVAL).await })
    };

    let registry = ElevatorRegistry::new(clock, persister, timing).with_elevator(config::DEFAULT_ELEVATOR_ID, capacity);
    System {
        registry: Arc::new(registry),
        store,
        worker,
        sweeper,
    }
}

impl System {
    /// Stops the sweeper, drops the registry and waits for the worker to drain the queue.
    pub async fn shutdown(self) -> anyhow::Result<WorkerStats> {
        self.sweeper.abort();
        drop(self.registry);
        self.worker.await.context("store worker panicked")
    }
}

/// Same as [build] on the real tokio clock with default timing.
pub fn build_default(capacity: u32) -> System {
    build(capacity, Timing::default(), TokioClock::shared())
}
