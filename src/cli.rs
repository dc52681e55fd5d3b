//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_price_source::CsvPriceSource;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::sim_executor::SimulatedExecutor;
use crate::domain::config::StrategyConfig;
use crate::domain::metrics::Metrics;
use crate::domain::orchestrator::{PortfolioOrchestrator, RunSummary};
use crate::ports::price_source::PriceSource;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "ninetrader", about = "Sequential-reversal trading strategy runner")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the strategy over CSV price data
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Override the price data directory from the config file
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Trade log output path
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Simulated order confirmation delay in bars
        #[arg(long)]
        fill_delay: Option<u32>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the available data range per configured asset
    Info {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            data,
            output,
            fill_delay,
        } => run_strategy(&config, data.as_ref(), output.as_ref(), fill_delay),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config } => run_info(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

fn run_strategy(
    config_path: &PathBuf,
    data_override: Option<&PathBuf>,
    output_path: Option<&PathBuf>,
    fill_delay: Option<u32>,
) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let config = match StrategyConfig::from_port(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 2: Load price data
    let data_path = data_override
        .cloned()
        .unwrap_or_else(|| PathBuf::from(&config.data_path));
    eprintln!(
        "Loading prices for {} asset(s) from {}",
        config.assets.len(),
        data_path.display()
    );
    let mut source = match CsvPriceSource::load(&data_path, &config.assets) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 3: Build the portfolio pipeline
    let orchestrator = match PortfolioOrchestrator::new(&config) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let mut executor = match fill_delay {
        Some(bars) if bars > 0 => SimulatedExecutor::with_fill_delay(bars),
        _ => SimulatedExecutor::new(),
    };

    // Stage 4: Run
    eprintln!(
        "Running: lookback {}, threshold {}, {:?} capital",
        config.lookback, config.threshold, config.capital_mode
    );
    let summary = match orchestrator.run(&mut source, &mut executor) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 5: Console summary
    print_summary(&summary);

    // Stage 6: Write the trade log
    let output = output_path
        .cloned()
        .unwrap_or_else(|| PathBuf::from("trades.csv"));
    let report = CsvReportAdapter::new();
    match report.write(&summary, &output.display().to_string()) {
        Ok(()) => {
            eprintln!("\nTrade log written to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn print_summary(summary: &RunSummary) {
    let metrics = Metrics::compute(summary);

    eprintln!("\n=== Results ===");
    eprintln!("Initial Capital:  {:.2}", summary.initial_capital);
    eprintln!("Final Equity:     {:.2}", summary.final_equity);
    eprintln!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    eprintln!("Max Drawdown:     -{:.1}%", metrics.max_drawdown * 100.0);
    eprintln!(
        "Trades:           {} ({} won / {} lost / {} flat)",
        summary.trades.len(),
        metrics.trades_won,
        metrics.trades_lost,
        metrics.trades_breakeven
    );
    eprintln!("Win Rate:         {:.1}%", metrics.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", metrics.profit_factor);
    eprintln!("Data Gaps:        {}", summary.data_gaps);
    eprintln!("Order Failures:   {}", summary.order_failures);

    let mut per_asset: Vec<(String, usize, f64)> = Vec::new();
    for trade in &summary.trades {
        match per_asset.iter_mut().find(|(asset, ..)| asset == &trade.asset) {
            Some((_, count, pnl)) => {
                *count += 1;
                *pnl += trade.pnl;
            }
            None => per_asset.push((trade.asset.clone(), 1, trade.pnl)),
        }
    }
    if !per_asset.is_empty() {
        per_asset.sort_by(|a, b| a.0.cmp(&b.0));
        eprintln!("\n=== Per-Asset Summary ===");
        for (asset, count, pnl) in &per_asset {
            let sign = if *pnl >= 0.0 { "+" } else { "" };
            eprintln!("  {}:  {} trade(s), {}{:.2}", asset, count, sign, pnl);
        }
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let config = match StrategyConfig::from_port(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("\nStrategy:");
    eprintln!("  lookback:   {}", config.lookback);
    eprintln!("  threshold:  {}", config.threshold);
    eprintln!("  polarity:   {:?}", config.convention);
    eprintln!("\nRisk:");
    eprintln!("  volatility_period:  {}", config.risk.volatility_period);
    eprintln!("  stop_multiplier:    {}", config.risk.stop_multiplier);
    eprintln!("  max_loss_fraction:  {}", config.risk.max_loss_fraction);
    eprintln!("  trailing_enabled:   {}", config.risk.trailing_enabled);
    eprintln!("\nCapital:");
    eprintln!("  mode:                 {:?}", config.capital_mode);
    eprintln!("  total_capital:        {}", config.total_capital);
    eprintln!("  deployment_fraction:  {}", config.deployment_fraction);
    eprintln!("\nAssets: {}", config.assets.join(", "));

    eprintln!("\nConfig validated successfully");
    ExitCode::SUCCESS
}

fn run_info(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let config = match StrategyConfig::from_port(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let data_path = PathBuf::from(&config.data_path);
    for asset in &config.assets {
        let assets = vec![asset.clone()];
        let mut source = match CsvPriceSource::load(&data_path, &assets) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("{}: error: {}", asset, e);
                continue;
            }
        };

        let mut bars = 0usize;
        let mut first = None;
        let mut last = None;
        loop {
            match source.next_bars() {
                Ok(Some(batch)) => {
                    for bar in &batch {
                        bars += 1;
                        if first.is_none() {
                            first = Some(bar.timestamp);
                        }
                        last = Some(bar.timestamp);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    eprintln!("{}: error: {}", asset, e);
                    break;
                }
            }
        }

        match (first, last) {
            (Some(first), Some(last)) => {
                println!("{}: {} bars, {} to {}", asset, bars, first.date(), last.date())
            }
            _ => println!("{}: no data", asset),
        }
    }

    ExitCode::SUCCESS
}
