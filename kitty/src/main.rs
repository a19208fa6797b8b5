use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use kitty::analysis::Interpreter;
use kitty::config::HostConfig;
use kitty::console::Console;
use kitty::devices::DeviceTable;
use kitty_driver::{spawn_driver_task, ActionSink, SimulatedDriver, SimulatorSettings};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;


/// Run kitty device scripts against a simulated driver
#[derive(Parser, Debug)]
#[command(name = "kitty-console", version, about)]
struct Args {
    /// Host configuration with devices, groups and settings
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Run this script instead of reading commands from stdin
    #[arg(long, short = 's')]
    script: Option<PathBuf>,

    /// Simulate in process without delays or injected failures
    #[arg(long)]
    dry_run: bool,

    /// Do not echo device actions
    #[arg(long, short = 'q')]
    quiet: bool,

    /// Limit on statements plus loop iterations per command
    #[arg(long)]
    max_steps: Option<u64>,

    /// Print the compiled program as JSON and exit
    #[arg(long)]
    dump_ast: bool,

    /// Wait out action durations in real time
    #[arg(long)]
    realtime: bool,

    /// Probability that the simulated driver rejects an action
    #[arg(long)]
    failure_rate: Option<f64>,
}


fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => HostConfig::load(path).with_context(|| format!("Failed to load {}", path.display()))?,
        None => HostConfig::default(),
    };
    if let Some(max_steps) = args.max_steps {
        config.interpreter.max_steps = Some(max_steps);
    }
    config.interpreter.echo_actions = !args.quiet;
    if args.realtime {
        config.driver.realtime = true;
    }
    if let Some(failure_rate) = args.failure_rate {
        config.driver.failure_rate = failure_rate;
    }
    let devices = config.build_device_table()?;

    if args.dump_ast {
        let source = match &args.script {
            Some(path) => read_script(path)?,
            None => {
                let mut source = String::new();
                io::stdin().read_to_string(&mut source)?;
                source
            },
        };
        let program = kitty::compile(&source)?;
        println!("{}", serde_json::to_string_pretty(&program)?);
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(serve(args, config, devices))
}

fn read_script(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// An in-process driver that never sleeps or fails
fn dry_run_driver() -> SimulatedDriver {
    SimulatedDriver::with_settings(SimulatorSettings { realtime: false, failure_rate: 0.0, seed: None })
}

/// Run the console on a blocking thread while the driver lives on the runtime
async fn serve(args: Args, config: HostConfig, devices: DeviceTable) -> Result<()> {
    let mut driver_task = None;
    let sink: Box<dyn ActionSink + Send> = if args.dry_run {
        Box::new(dry_run_driver())
    } else {
        let (sink, handle) = spawn_driver_task(SimulatedDriver::with_settings(config.driver.clone()));
        driver_task = Some(handle);
        Box::new(sink)
    };
    let interpreter = Interpreter::with_options(sink, config.interpreter.clone());

    let cancel = interpreter.cancel_handle();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling the running command.");
            cancel.cancel();
        }
    });

    let script = args.script.clone();
    let outcome = tokio::task::spawn_blocking(move || -> Result<()> {
        let mut console = Console::new(interpreter, devices);
        match script {
            Some(path) => {
                let source = read_script(&path)?;
                let result = console.run_script(&source);
                for line in console.take_output() {
                    println!("{}", line);
                }
                if let Some(value) = result? {
                    println!("{}", value);
                }
            },
            None => console.run(io::stdin().lock(), io::stdout())?,
        }
        Ok(())
    })
    .await?;

    // The console owned the last sender, so the driver task is finishing up
    if let Some(handle) = driver_task {
        let driver = handle.await?;
        info!(changes = driver.history().len(), "driver stopped");
    }
    outcome
}
