use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use paper_planner::core::Schedule;
use paper_planner::{algo, data, run_reader, validate, StrategyKind};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug)]
struct Algorithm(StrategyKind);

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ValueEnum for Algorithm {
    fn value_variants<'a>() -> &'a [Self] {
        static ALGORITHMS: std::sync::LazyLock<Vec<Algorithm>> = std::sync::LazyLock::new(|| {
            algo::SCHEDULERS.iter().map(|(kind, _)| Algorithm(*kind)).collect()
        });

        ALGORITHMS.as_slice()
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.0.name()))
    }
}

/// Application scheduling academic submissions.
#[derive(Debug, Parser)]
enum Application {
    /// Schedule the instance read from stdin with one of the strategies.
    Run {
        algorithm: Algorithm,
        /// First date items without an earliest start may begin. Defaults to today.
        #[clap(long)]
        as_of: Option<NaiveDate>,
        /// Seed of the randomized strategies.
        #[clap(short, long)]
        seed: Option<u64>,
    },
    /// Validate a schedule read from stdin against an instance.
    Validate {
        /// The instance file.
        instance: PathBuf,
        #[clap(long)]
        as_of: Option<NaiveDate>,
    },
    /// Compare every strategy on an instance.
    Bench {
        /// The instance file.
        input: PathBuf,
        /// Exclude scheduling algorithms.
        #[clap(short, long, value_delimiter = ',')]
        exclude: Vec<Algorithm>,
        #[clap(long)]
        as_of: Option<NaiveDate>,
    },
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn load(path: &Path, as_of: NaiveDate) -> anyhow::Result<paper_planner::core::Instance> {
    let file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    data::load(&mut BufReader::new(file), as_of)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match Application::parse() {
        Application::Run {
            algorithm,
            as_of,
            seed,
        } => run_reader(algorithm.0, as_of.unwrap_or_else(today), seed, &mut std::io::stdin().lock()),
        Application::Validate { instance, as_of } => {
            let instance = load(&instance, as_of.unwrap_or_else(today))?;
            let schedule: Schedule = data::deserialize(&mut std::io::stdin().lock())?;
            println!("{}", data::to_string(&validate(&schedule, &instance))?);
            Ok(())
        }
        Application::Bench {
            input,
            exclude,
            as_of,
        } => {
            let as_of = as_of.unwrap_or_else(today);
            let instance = load(&input, as_of)?;
            let strategies: Vec<StrategyKind> = StrategyKind::ALL
                .into_iter()
                .filter(|kind| !exclude.iter().any(|excluded| excluded.0 == *kind))
                .collect();
            println!("{}", data::compare(&instance, as_of, &strategies));
            Ok(())
        }
    }
}
