//! Rebalab CLI: calibrate, backtest and synthesize price histories.
//!
//! Commands:
//! - `calibrate`: fit the benchmark and strategy parameters from a TOML run config;
//!   Ctrl-C or `--time-limit-secs` stops the search and keeps the best result
//! - `backtest`: replay the configured strategy once and report rewards
//! - `synth`: write a seeded synthetic history as long-format CSV

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rebalab_runner::{
    generate_synthetic, read_params, run_episode, write_csv, write_report, CalibrationProgress,
    CalibrationReport, Calibrator, CancellationToken, EpisodeOptions, EpisodeStart, ReportFile,
    RunConfig, SyntheticSpec,
};

#[derive(Parser)]
#[command(
    name = "rebalab",
    about = "Rebalab CLI: online portfolio rebalancing backtests and calibration"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calibrate the benchmark and strategy parameters.
    Calibrate {
        /// Path to a TOML run config.
        #[arg(long)]
        config: PathBuf,

        /// Where to write the JSON report.
        #[arg(long, default_value = "results/calibration.json")]
        out: PathBuf,

        /// Stop searching after this many seconds and keep the best so far.
        #[arg(long)]
        time_limit_secs: Option<u64>,
    },
    /// Run one episode of the configured strategy.
    Backtest {
        /// Path to a TOML run config.
        #[arg(long)]
        config: PathBuf,

        /// Parameters to apply: a calibration report or a bare JSON object.
        #[arg(long)]
        params: Option<PathBuf>,

        /// Maximum number of steps (defaults to the whole history).
        #[arg(long)]
        steps: Option<usize>,

        /// First cursor row (defaults to the first full observation window).
        #[arg(long)]
        start: Option<usize>,

        /// Log every step.
        #[arg(long, default_value_t = false)]
        verbose: bool,
    },
    /// Write a synthetic price history as CSV.
    Synth {
        /// Asset symbols (e.g., BTC ETH XRP).
        #[arg(required = true)]
        assets: Vec<String>,

        #[arg(long, default_value_t = 400)]
        rows: usize,

        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Per-asset log drift per row, comma separated.
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        drift: Vec<f64>,

        #[arg(long, default_value_t = 0.02)]
        volatility: f64,

        #[arg(long, default_value = "USDT")]
        fiat: String,

        /// Output CSV path.
        #[arg(long, default_value = "prices.csv")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Calibrate {
            config,
            out,
            time_limit_secs,
        } => {
            let token = CancellationToken::new();
            cancel_on_interrupt(token.clone())?;
            if let Some(secs) = time_limit_secs {
                let timer = token.clone();
                std::thread::spawn(move || {
                    std::thread::sleep(Duration::from_secs(secs));
                    info!(secs, "time limit reached, cancelling");
                    timer.cancel();
                });
            }
            run_calibrate(&config, &out, &token).map(|_| ())
        }
        Commands::Backtest {
            config,
            params,
            steps,
            start,
            verbose,
        } => run_backtest(&config, params.as_deref(), steps, start, verbose),
        Commands::Synth {
            assets,
            rows,
            seed,
            drift,
            volatility,
            fiat,
            out,
        } => {
            init_logging("info");
            let refs: Vec<&str> = assets.iter().map(String::as_str).collect();
            let spec = SyntheticSpec::new(&refs, rows, seed)
                .with_drift(&drift)
                .with_volatility(volatility);
            run_synth(&spec, &fiat, &out)
        }
    }
}

/// `RUST_LOG` wins over the configured level.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // a second init (tests, embedding) is harmless
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn load_config(path: &Path) -> Result<RunConfig> {
    let config = RunConfig::load(path)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    init_logging(&config.logging.level);
    Ok(config)
}

/// First Ctrl-C cancels the token; the search then winds down cooperatively.
fn cancel_on_interrupt(token: CancellationToken) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the signal runtime")?;
    std::thread::spawn(move || {
        runtime.block_on(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, keeping the best result so far");
                token.cancel();
            }
        });
    });
    Ok(())
}

fn run_calibrate(
    config_path: &Path,
    out: &Path,
    token: &CancellationToken,
) -> Result<CalibrationReport> {
    let config = load_config(config_path)?;
    let history = Arc::new(config.load_history()?);
    info!(
        run_id = %config.run_id(),
        rows = history.len(),
        assets = history.n_assets(),
        dataset = history.dataset_hash(),
        "history loaded"
    );

    let mut env = config.build_environment(Arc::clone(&history))?;
    let mut agent = config.build_agent()?;
    let space = config.search_space()?;
    let constraints = config.constraints()?;
    let calibrator = Calibrator::new(config.calibration_config())?;

    let progress = |p: &CalibrationProgress| {
        if p.evaluation == p.budget {
            info!(stage = %p.stage, evaluations = p.evaluation, best = ?p.best, "stage finished");
        }
    };
    let mut report = calibrator.fit(
        &mut agent,
        &mut env,
        &space,
        &constraints,
        Some(token),
        Some(&progress),
    )?;
    report.dataset_hash = Some(history.dataset_hash().to_string());

    print_calibration_summary(&report);
    write_report(&ReportFile::new(report.clone()).with_run_id(config.run_id()), out)?;
    println!("Report saved to: {}", out.display());
    Ok(report)
}

fn run_backtest(
    config_path: &Path,
    params_path: Option<&Path>,
    steps: Option<usize>,
    start: Option<usize>,
    verbose: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let history = Arc::new(config.load_history()?);
    let mut env = config.build_environment(history)?;
    let mut agent = config.build_agent()?;

    if let Some(path) = params_path {
        let params = read_params(path)?;
        let merged = agent.state().params.merged(&params);
        agent
            .set_params(&merged)
            .with_context(|| format!("parameters from {} rejected", path.display()))?;
    }

    let opts = EpisodeOptions {
        max_steps: steps,
        start: start.map_or(EpisodeStart::Beginning, EpisodeStart::At),
        verbose,
    };
    let outcome = run_episode(&mut agent, &mut env, &opts, None)?;
    if outcome.termination.is_failure() && outcome.steps == 0 {
        bail!("episode failed before the first step: {:?}", outcome.termination);
    }

    println!("--- Backtest Summary ---");
    println!("Strategy:       {}", agent.strategy().name());
    println!("Params:         {}", agent.state().params);
    println!("Steps:          {}", outcome.steps);
    println!("Total reward:   {:.6}", outcome.total_reward);
    println!("Mean reward:    {:.6}", outcome.mean_reward());
    println!("Termination:    {:?}", outcome.termination);
    if let Some(weights) = &outcome.final_allocation {
        println!("Final weights:  {:?}", weights.weights());
    }
    Ok(())
}

fn run_synth(spec: &SyntheticSpec, fiat: &str, out: &Path) -> Result<()> {
    let history = generate_synthetic(spec, fiat)?;
    if let Some(dir) = out.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    write_csv(&history, out)?;
    println!(
        "Wrote {} rows x {} assets to {} (dataset {})",
        history.len(),
        history.n_assets(),
        out.display(),
        history.dataset_hash()
    );
    Ok(())
}

fn print_calibration_summary(report: &CalibrationReport) {
    println!("--- Calibration Summary ---");
    println!("Strategy:       {}", report.strategy);
    if let Some(benchmark) = &report.benchmark {
        println!("Benchmark:      {:?}", benchmark.weights.weights());
    }
    let opt = &report.optimization;
    println!("Evaluations:    {}", opt.evaluations);
    match opt.best_value {
        Some(v) => println!("Best value:     {v:.6}"),
        None => println!("Best value:     n/a"),
    }
    println!("Best params:    {}", opt.best_params);
    println!("Elapsed:        {:.1}s", opt.elapsed_secs);
    if report.interrupted {
        println!("(interrupted, best result so far)");
    }
}
