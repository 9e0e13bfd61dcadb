//! lcyield CLI: import ntuples, build meta columns, compute efficiencies.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use lcyield_core::config::AnalysisConfig;
use lcyield_core::keys::{DatasetKey, DecayMode, Polarity, Year};
use lcyield_exec::{Analysis, EfficiencyKind, Report, DEFAULT_TOYS};
use lcyield_io::{readers::csv::import_csv, Codec, FsStorage};
use lcyield_meta::{MetaOutcome, SWeightFile};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lcyield")]
#[command(about = "Signal yields and selection efficiencies for Lambda_c -> p h h", long_about = None)]
struct Cli {
    /// Log filter, e.g. `info` or `lcyield_store=debug`
    #[arg(long, global = true, env = "LCYIELD_LOG", default_value = "info")]
    log: String,

    /// Root of the Collision/ and MonteCarlo/ trees (overrides environment)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Where meta files and reports are written (overrides environment)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Seed for the random meta column; 0 draws from entropy
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Use DLL PID thresholds instead of ProbNN
    #[arg(long, global = true)]
    dll: bool,

    /// Read the 17b stripping for 2011
    #[arg(long, global = true)]
    legacy_2011: bool,

    /// Log iteration progress
    #[arg(long, global = true)]
    progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Copy)]
struct KeyArgs {
    /// Decay mode: pKpi, pKK, ppipi, pKSLL, pKSDD or pphi
    #[arg(long)]
    mode: DecayMode,

    /// MagUp, MagDown or Combined
    #[arg(long, default_value = "Combined")]
    polarity: Polarity,

    #[arg(long, default_value = "2011")]
    year: Year,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a CSV table into a record file
    Import {
        #[arg(long)]
        csv: PathBuf,

        #[arg(long)]
        out: PathBuf,

        /// none, zstd or lz4
        #[arg(long, default_value = "none")]
        codec: String,
    },

    /// Compute efficiencies for a dataset
    Efficiency {
        #[command(flatten)]
        key: KeyArgs,

        /// Efficiency kinds; the total-efficiency chain when omitted
        #[arg(long = "kind", value_parser = parse_kind)]
        kinds: Vec<EfficiencyKind>,

        /// Tracking table JSON (default: <data-dir>/tracking_table.json)
        #[arg(long)]
        table: Option<PathBuf>,

        #[arg(long, default_value_t = DEFAULT_TOYS)]
        toys: u64,

        /// Write the JSON report here
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Efficiency chain, selected yields and branching fractions relative
    /// to pKpi
    Branching {
        /// Decay modes besides pKpi
        #[arg(long = "mode", required = true)]
        modes: Vec<DecayMode>,

        #[arg(long, default_value = "Combined")]
        polarity: Polarity,

        #[arg(long, default_value = "2011")]
        year: Year,

        #[arg(long)]
        table: Option<PathBuf>,

        #[arg(long, default_value_t = DEFAULT_TOYS)]
        toys: u64,

        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Nominal and toy-smeared tracking efficiency
    Tracking {
        #[command(flatten)]
        key: KeyArgs,

        #[arg(long)]
        table: Option<PathBuf>,

        #[arg(long, default_value_t = DEFAULT_TOYS)]
        toys: u64,
    },

    /// Build the meta friend of a dataset from external sWeights
    Meta {
        #[command(flatten)]
        key: KeyArgs,

        /// CSV of mass,signal_sw,background_sw for the selected candidates
        #[arg(long)]
        sweights: PathBuf,

        /// Use the stripped signal MC instead of collision data
        #[arg(long)]
        mc: bool,

        /// Rebuild even if the meta file exists
        #[arg(long)]
        force: bool,
    },

    /// Integrated luminosity
    Lumi {
        #[arg(long, default_value = "Combined")]
        polarity: Polarity,

        #[arg(long, default_value = "2011")]
        year: Year,
    },
}

fn parse_kind(s: &str) -> Result<EfficiencyKind, String> {
    s.parse().map_err(|e: lcyield_exec::ExecError| e.to_string())
}

fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn config(cli: &Cli) -> AnalysisConfig {
    let mut cfg = AnalysisConfig::from_env();
    if let Some(dir) = &cli.data_dir {
        cfg.data_dir = dir.clone();
    }
    if let Some(dir) = &cli.output_dir {
        cfg.output_dir = dir.clone();
    }
    if let Some(seed) = cli.seed {
        cfg.seed = seed;
    }
    if cli.dll {
        cfg.use_probnn = false;
    }
    if cli.legacy_2011 {
        cfg.legacy_2011 = true;
    }
    if cli.progress {
        cfg.show_progress = true;
    }
    cfg
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config(cli);
    cfg.validate()?;
    match &cli.command {
        Commands::Import { csv, out, codec } => {
            let codec = Codec::from_name(codec)?;
            let rows = import_csv(csv, &FsStorage::new(), &out.to_string_lossy(), codec)?;
            println!("{rows} rows -> {}", out.display());
        }
        Commands::Efficiency {
            key,
            kinds,
            table,
            toys,
            report,
        } => {
            let analysis = analysis(cfg, table.as_ref(), *toys)?;
            let key = analysis.key(key.mode, key.polarity, key.year, true);
            let kinds = if kinds.is_empty() {
                EfficiencyKind::CHAIN.to_vec()
            } else {
                kinds.clone()
            };
            let result = analysis.report(&[key], &kinds)?;
            print_efficiencies(&result);
            if let Some(path) = report {
                result.write(path)?;
            }
        }
        Commands::Branching {
            modes,
            polarity,
            year,
            table,
            toys,
            report,
        } => {
            let analysis = analysis(cfg, table.as_ref(), *toys)?;
            let keys: Vec<DatasetKey> = modes
                .iter()
                .map(|&m| analysis.key(m, *polarity, *year, false))
                .collect();
            let result = analysis.branching(&keys)?;
            print_efficiencies(&result);
            for y in &result.yields {
                println!(
                    "{} {polarity} {year} yield {} background {} significance {:.2}",
                    y.mode, y.signal, y.background, y.significance
                );
            }
            for b in &result.branching {
                println!(
                    "{} {polarity} {year} total {} relative {} absolute {}",
                    b.mode, b.total_efficiency, b.relative, b.absolute
                );
            }
            if let Some(path) = report {
                result.write(path)?;
            }
        }
        Commands::Tracking { key, table, toys } => {
            let analysis = analysis(cfg, table.as_ref(), *toys)?;
            let key = analysis.key(key.mode, key.polarity, key.year, true);
            let table = analysis.tracking_table()?;
            let nominal = analysis.tracking(&key, &table)?;
            let smeared = analysis.tracking_smeared(&key, &table, *toys)?;
            println!("{key}");
            println!("  nominal: {nominal}");
            println!("  smeared: {smeared} ({toys} toys)");
        }
        Commands::Meta {
            key,
            sweights,
            mc,
            force,
        } => {
            let analysis = Analysis::new(cfg);
            let key = analysis.key(key.mode, key.polarity, key.year, *mc);
            let fitter = SWeightFile::load(sweights)?;
            match analysis.build_meta(&key, &fitter, *force)? {
                MetaOutcome::Built(summary) => {
                    println!(
                        "built {} ({} rows, {} selected)",
                        summary.path, summary.rows, summary.selected
                    );
                    println!(
                        "  signal {} background {} in [{:.1}, {:.1}]",
                        summary.yields.signal,
                        summary.yields.background,
                        summary.yields.range.0,
                        summary.yields.range.1
                    );
                }
                MetaOutcome::Reused { path } => println!("reused {path}"),
            }
        }
        Commands::Lumi { polarity, year } => {
            let analysis = Analysis::new(cfg);
            let lumi = analysis.luminosity(*polarity, *year)?;
            println!("{year} {polarity}: {lumi}");
        }
    }
    Ok(())
}

fn analysis(
    cfg: AnalysisConfig,
    table: Option<&PathBuf>,
    toys: u64,
) -> Result<Analysis, Box<dyn std::error::Error>> {
    let analysis = Analysis::new(cfg).with_toys(toys);
    Ok(match table {
        Some(path) => analysis.load_tracking_table(path)?,
        None => analysis,
    })
}

fn print_efficiencies(report: &Report) {
    for e in &report.efficiencies {
        let key = DatasetKey {
            mode: e.mode,
            polarity: e.polarity,
            year: e.year,
            stripping: e.stripping,
            mc: true,
        };
        println!("{key} {:<22} {}", e.kind.as_str(), e.result);
    }
    info!(entries = report.efficiencies.len(), "done");
}
