use std::{error::Error as StdError, fs::File, io, io::Write};

use clap::Parser as _;
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use whr::{DayRating, UsageError, WhrConfig, WholeHistoryRating};
use whr_research::game_log::GameLog;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct Experiment {
    w: f64,
    prior_stdev: f64,
    whr: WholeHistoryRating,
    cycles: usize,
    log_likelihood_test: f64,
    error: Option<String>,
}

impl Experiment {
    fn new(log: &GameLog, w: f64, prior_stdev: f64, holdout: usize) -> Result<Experiment, UsageError> {
        let config = WhrConfig::builder().w(w).prior_stdev(prior_stdev).build();
        Ok(Experiment {
            w,
            prior_stdev,
            whr: log.replay(config, holdout)?,
            cycles: 0,
            log_likelihood_test: f64::NEG_INFINITY,
            error: None,
        })
    }

    fn sort_key(&self) -> impl Ord {
        OrderedFloat(-self.log_likelihood_test)
    }

    fn run(&mut self, opt: &Opt) {
        let result = self
            .whr
            .iterate_until(opt.min_cycles, opt.max_cycles, opt.elo_diff)
            .and_then(|cycles| {
                self.cycles = cycles;
                self.whr.log_likelihood_test()
            });

        match result {
            Ok(log_likelihood_test) => {
                info!(
                    "w {} prior_stdev {}: {} cycles, log likelihood {log_likelihood_test}",
                    self.w, self.prior_stdev, self.cycles
                );
                self.log_likelihood_test = log_likelihood_test;
            }
            Err(err) => {
                warn!("w {} prior_stdev {}: {err}", self.w, self.prior_stdev);
                self.error = Some(err.to_string());
            }
        }
    }

    fn top_players(&self, n: usize) -> Vec<(&str, DayRating, usize)> {
        let mut top: Vec<_> = self
            .whr
            .players()
            .filter_map(|player| {
                let current = *player.ratings().last()?;
                let games = player.days().iter().map(|day| day.num_games()).sum();
                Some((player.name(), current, games))
            })
            .collect();
        top.sort_by_key(|&(_, rating, _)| OrderedFloat(-rating.elo.0));
        top.truncate(n);
        top
    }
}

fn write_report<W: Write>(
    mut writer: W,
    log: &GameLog,
    experiments: &[Experiment],
    top: usize,
) -> io::Result<()> {
    writeln!(writer, "w,prior_stdev,cycles,log_likelihood_test,error")?;
    for experiment in experiments {
        writeln!(
            writer,
            "{},{},{},{},{}",
            experiment.w,
            experiment.prior_stdev,
            experiment.cycles,
            experiment.log_likelihood_test,
            experiment.error.as_deref().unwrap_or_default()
        )?;
    }

    writeln!(writer, "# ---")?;
    if let Some(best) = experiments.first() {
        writeln!(
            writer,
            "# Best: w {}, prior_stdev {}",
            best.w, best.prior_stdev
        )?;
        for (name, rating, games) in best.top_players(top) {
            writeln!(
                writer,
                "# {name}: {:.1} ± {:.1} at {} ({games} games)",
                rating.elo.0,
                rating.elo_stdev.map_or(f64::NAN, |stdev| stdev.0),
                rating.time_step,
            )?;
        }
        writeln!(writer, "# ---")?;
    }
    writeln!(writer, "# Distinct players: {}", log.player_count())?;
    writeln!(
        writer,
        "# Games: {} (last on: {})",
        log.games().len(),
        log.last_date()
            .map(|date| date.to_string())
            .unwrap_or_default()
    )?;
    writeln!(writer, "# ---")?;

    Ok(())
}

#[derive(clap::Parser)]
struct Opt {
    #[clap(long, value_delimiter = ',', num_args = 1.., default_value = "30")]
    w: Vec<f64>,
    #[clap(long, value_delimiter = ',', num_args = 1.., default_value = "400")]
    prior_stdev: Vec<f64>,
    /// Hold out every n-th game for evaluation (0 to fit all games).
    #[clap(long, default_value = "10")]
    holdout: usize,
    #[clap(long, default_value = "2")]
    min_cycles: usize,
    #[clap(long, default_value = "200")]
    max_cycles: usize,
    #[clap(long, default_value = "0.01")]
    elo_diff: f64,
    #[clap(long, default_value = "20")]
    top: usize,
}

fn main() -> Result<(), Box<dyn StdError>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let opt = Opt::parse();

    let process_uuid = Uuid::now_v7();

    let log = GameLog::read(io::stdin().lock())?;
    info!(
        "read {} games of {} players",
        log.games().len(),
        log.player_count()
    );

    let mut experiments = Vec::new();
    for &w in &opt.w {
        for &prior_stdev in &opt.prior_stdev {
            experiments.push(Experiment::new(&log, w, prior_stdev, opt.holdout)?);
        }
    }

    println!("# Parallel experiments: {}", experiments.len());
    println!("# ---");

    experiments
        .par_iter_mut()
        .for_each(|experiment| experiment.run(&opt));

    experiments.sort_by_key(Experiment::sort_key);

    write_report(
        File::create(format!("report-{process_uuid}.csv"))?,
        &log,
        &experiments,
        opt.top,
    )?;
    write_report(io::stdout(), &log, &experiments, opt.top)?;

    Ok(())
}
