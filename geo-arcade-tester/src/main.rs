mod loaders;
mod logic;
mod storage;
mod util;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use geo_arcade_game::constants::DEFAULT_DATASET_URL;
use geo_arcade_game::{Dataset, GameConfig, GameEngine, Metric, Region, ScoreKey, ScoreLedger};

use loaders::{DatasetSource, resolve_loader};
use logic::{GameplayStrategy, LogicTester, resolve_seed_inputs};
use storage::ScoreStore;
use util::split_csv;

#[derive(Debug, Parser)]
#[command(name = "geo-arcade-tester", version = "0.1.0")]
#[command(about = "Automated QA for the Geo Arcade game core - scripted players on a virtual clock")]
struct Args {
    /// Country dataset file (JSON array of country records)
    #[arg(long, conflicts_with = "fetch")]
    dataset: Option<PathBuf>,

    /// Fetch the country dataset over HTTP
    #[arg(long)]
    fetch: bool,

    /// URL used with --fetch
    #[arg(long, default_value = DEFAULT_DATASET_URL)]
    fetch_url: String,

    /// Region pool to play (World, Africa, Americas, Asia, Europe, Oceania)
    #[arg(long, default_value = "World")]
    region: String,

    /// Compared metric (population, area, density, capital)
    #[arg(long, default_value = "population")]
    metric: String,

    /// Strategies to run (comma-separated, or "all")
    #[arg(long, default_value = "all")]
    strategies: String,

    /// List all available strategies and exit
    #[arg(long)]
    list_strategies: bool,

    /// Seeds to run (comma-separated)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per strategy and seed
    #[arg(long, default_value_t = 5)]
    iterations: usize,

    /// Guesses per game before the player stops answering
    #[arg(long, default_value_t = 40)]
    max_rounds: u32,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// High score file (JSON object); scores stay in memory when omitted
    #[arg(long)]
    scores: Option<PathBuf>,

    /// Clear every stored high score before running
    #[arg(long)]
    reset_scores: bool,

    /// Pace the session with the wall clock instead of the virtual clock
    #[arg(long)]
    realtime: bool,

    /// Game configuration overrides (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_strategies(&args)? {
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let config = load_config(args.config.as_ref())?;
    let (region, metric) = parse_scope(&args)?;
    let strategies = expand_strategies(&args.strategies)?;
    let seed_infos = resolve_seed_inputs(&split_csv(&args.seeds))?;
    let seeds: Vec<u64> = seed_infos.iter().map(|s| s.seed).collect();

    let dataset = load_dataset(&args, config.clone()).await;
    let store = ScoreStore::from_path(args.scores.clone());
    if args.reset_scores {
        ScoreLedger::load(store.clone()).reset_all();
        println!("🧹 Cleared high scores in {}", store.label());
    }

    let tester = LogicTester::new(config, dataset, store.clone(), args.verbose)
        .with_scope(region, metric)
        .with_max_rounds(args.max_rounds);

    println!("{}", "🧠 Running Strategy Tests".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let mut results = Vec::new();
    for strategy in strategies {
        if args.realtime {
            results.extend(tester.run_strategy_realtime(strategy, &seeds).await);
        } else {
            results.extend(tester.run_strategy(strategy, &seeds, args.iterations));
        }
    }

    let high_scores: Vec<(ScoreKey, u32)> = ScoreLedger::load(store).entries().collect();
    write_reports(&args, &results, &high_scores, start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_strategies(args: &Args) -> Result<bool> {
    if !args.list_strategies {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available strategies:")?;
    for strategy in GameplayStrategy::ALL {
        writeln!(
            output_target.writer(),
            "  {:15} - {}",
            strategy.label(),
            strategy.description()
        )?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🌍 Geo Arcade Automated Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn load_config(path: Option<&PathBuf>) -> Result<GameConfig> {
    let Some(path) = path else {
        return Ok(GameConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = GameConfig::from_json(&json)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

fn parse_scope(args: &Args) -> Result<(Region, Metric)> {
    let region = Region::ALL
        .into_iter()
        .find(|region| region.as_str().eq_ignore_ascii_case(&args.region))
        .ok_or_else(|| anyhow!("Unknown region: {}", args.region))?;
    let metric = args
        .metric
        .to_ascii_lowercase()
        .parse::<Metric>()
        .map_err(|()| anyhow!("Unknown metric: {}", args.metric))?;
    Ok((region, metric))
}

fn expand_strategies(strategies_arg: &str) -> Result<Vec<GameplayStrategy>> {
    let mut strategies = Vec::new();
    for token in split_csv(strategies_arg) {
        if token.eq_ignore_ascii_case("all") {
            strategies.extend(GameplayStrategy::ALL);
            continue;
        }
        match token.parse::<GameplayStrategy>() {
            Ok(strategy) => strategies.push(strategy),
            Err(_) => bail!("Unknown strategy: {token}"),
        }
    }
    let mut seen = Vec::new();
    strategies.retain(|s| {
        if seen.contains(s) {
            false
        } else {
            seen.push(*s);
            true
        }
    });
    if strategies.is_empty() {
        bail!("No strategies selected");
    }
    Ok(strategies)
}

fn dataset_source(args: &Args) -> DatasetSource {
    if let Some(path) = &args.dataset {
        DatasetSource::File(path.clone())
    } else if args.fetch {
        DatasetSource::Fetch(args.fetch_url.clone())
    } else {
        DatasetSource::Bundled
    }
}

async fn load_dataset(args: &Args, config: GameConfig) -> Dataset {
    let source = dataset_source(args);
    println!("📦 Dataset: {}", source.describe());
    let engine = GameEngine::with_config(resolve_loader(&source).await, config);
    match engine.load_dataset() {
        Ok(dataset) => {
            log::info!("loaded {} entities", dataset.all().len());
            dataset
        }
        Err(err) => {
            log::warn!("dataset unavailable, continuing without entities: {err}");
            eprintln!("⚠️  {}", format!("Dataset unavailable: {err}").yellow());
            Dataset::empty()
        }
    }
}

fn write_reports(
    args: &Args,
    results: &[logic::ScenarioResult],
    high_scores: &[(ScoreKey, u32)],
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => {
            logic::reports::generate_json_report(&mut output_target, results, high_scores)?;
        }
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Geo Arcade Logic Test Results\n\n_No strategies executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, results, high_scores)?;
            }
        }
        _ => {
            let duration = start_time.elapsed();
            if results.is_empty() {
                writeln!(&mut output_target, "No strategies executed.")?;
            } else {
                logic::reports::generate_console_report(
                    &mut output_target,
                    results,
                    high_scores,
                    duration,
                )?;
            }
            writeln!(&mut output_target)?;
            writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
