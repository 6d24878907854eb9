use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Args;
use fabfruit_core::{KeyMap, Phase, Roster, TrialKind};
use fabfruit_experiment::balance::{BalanceRules, timeline_balanced};
use fabfruit_experiment::config::{DEFAULT_BOX_COUNT, PhasePlan, PhaseSettings};
use fabfruit_experiment::session::{SessionRunner, write_session, write_survey};
use fabfruit_experiment::timing_file::{onsets_by_block, timing_files_in};
use fabfruit_experiment::{
    Design, assign_boxes, build_plan, read_timing_files, resume_boxes, seed_for_dir, select_runs, survey_items,
    write_timing,
};
use fabfruit_timing::SimulatedTimer;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::autopilot::Autopilot;

#[derive(Args, Debug)]
pub struct Participant {
    /// Participant directory, holds seed.txt and boxes.txt
    #[arg(short, long)]
    pub dir: PathBuf,
    /// Fruit names, whitespace separated
    #[arg(long)]
    pub names: PathBuf,
    /// Required for a new participant unless a random one is fine; must
    /// match seed.txt for a returning one
    #[arg(long)]
    pub seed: Option<u64>,
    /// Timing files to use instead of generating a design
    #[arg(short, long)]
    pub timing: Vec<PathBuf>,
    /// Phase plan JSON for a generated design
    #[arg(long)]
    pub plan: Option<PathBuf>,
}

/// Everything a session needs, derived from the participant's seed.
pub struct Prepared {
    pub seed: u64,
    pub design: Design,
    pub roster: Roster,
    pub rng: StdRng,
}

pub fn timing(
    phase: Phase,
    settings: Option<&Path>,
    boxes: usize,
    seeds: Range<u64>,
    count: usize,
    out: &Path,
) -> Result<()> {
    let settings = match settings {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str::<PhaseSettings>(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => PhaseSettings::default_for(phase).with_context(|| format!("{phase} has no timing"))?,
    };
    let plan = PhasePlan::single(phase, settings)?;
    let rules = BalanceRules::default();

    let mut kept = 0;
    for seed in seeds.clone() {
        let records = build_plan(&plan, boxes, &mut StdRng::seed_from_u64(seed))?;
        if !timeline_balanced(&records, &rules) {
            debug!(seed, "unbalanced, trying next seed");
            continue;
        }

        let dir = out.join(seed.to_string());
        std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        write_timing(&dir.join(format!("{phase}.csv")), &records)?;
        std::fs::write(dir.join("trial.1D"), onsets_by_block(&records))
            .with_context(|| format!("writing onsets to {}", dir.display()))?;
        println!("{}", dir.display());

        kept += 1;
        if kept == count {
            return Ok(());
        }
    }
    bail!(
        "only {kept} of {count} balanced {phase} timelines in seeds {}..{}",
        seeds.start,
        seeds.end
    )
}

/// `count` seeds from `first`, stopping short at `u64::MAX`.
pub fn seed_range(first: u64, count: u64) -> Range<u64> {
    first..first.saturating_add(count)
}

fn read_names(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading fruit names from {}", path.display()))?;
    Ok(text.split_whitespace().map(str::to_string).collect())
}

/// Seed, design and roster for a participant, reusing whatever the
/// directory already holds.
pub fn boxes(participant: &Participant) -> Result<Prepared> {
    let seed = seed_for_dir(&participant.dir, participant.seed)?;
    let mut rng = StdRng::seed_from_u64(seed);
    info!(seed, dir = %participant.dir.display(), "participant");

    let design = if participant.timing.is_empty() {
        let plan = match &participant.plan {
            Some(path) => PhasePlan::from_json_file(path)?,
            None => PhasePlan::default(),
        };
        Design::generate(&plan, DEFAULT_BOX_COUNT, &mut rng)?
    } else {
        read_timing_files(&participant.timing)?
    };

    let names = read_names(&participant.names)?;
    let generated = assign_boxes(&names, design.box_count, &design.devaluations, &mut rng)?;
    let roster = resume_boxes(&participant.dir, generated, &design.devaluations)?;
    for bx in roster.boxes() {
        println!("{bx}");
    }

    Ok(Prepared {
        seed,
        design,
        roster,
        rng,
    })
}

pub fn check(files: &[PathBuf]) -> Result<()> {
    let design = read_timing_files(files)?;
    let rules = BalanceRules::default();
    println!("{} events, {} boxes", design.records.len(), design.box_count);

    for phase in design.phases() {
        let records: Vec<_> = design.records.iter().filter(|t| t.phase == phase).cloned().collect();
        let shows = records.iter().filter(|t| t.kind == TrialKind::Show).count();
        let balanced = timeline_balanced(&records, &rules);
        let end = records.iter().map(|t| t.end).fold(0.0, f64::max);
        println!("{phase}: {shows} shows, last event ends at {end:.2}s, balanced: {balanced}");

        if let Some(blocks) = design.devaluations.get(&phase) {
            for (block, names) in blocks {
                println!("  block {block}: devalued {}", names.join(" "));
            }
        }
    }
    Ok(())
}

pub fn runs(pool: &Path, seed: u64, runs: Range<usize>) -> Result<()> {
    let files = timing_files_in(pool)?;
    for path in select_runs(files, seed, runs)? {
        println!("{}", path.display());
    }
    Ok(())
}

pub fn simulate(participant: &Participant, accuracy: f64, out: Option<PathBuf>) -> Result<()> {
    let Prepared {
        seed,
        design,
        roster,
        mut rng,
    } = boxes(participant)?;

    let presenter = Autopilot::new(StdRng::seed_from_u64(seed.wrapping_add(1)), accuracy);
    let mut runner = SessionRunner::new(SimulatedTimer::new(), presenter, &roster, KeyMap::default());
    let rows = runner.run(&design.records)?;
    let answers = runner.run_survey(&survey_items(&roster, &mut rng))?;

    let out = out.unwrap_or_else(|| participant.dir.join(format!("{seed}_results.csv")));
    write_session(&out, &rows)?;
    let survey_path = out.with_extension("survey.csv");
    let file = std::fs::File::create(&survey_path).with_context(|| format!("creating {}", survey_path.display()))?;
    write_survey(file, &answers)?;

    let total: i32 = rows.iter().filter_map(|t| t.score).map(|s| s.points()).sum();
    let correct = answers.iter().filter(|a| a.correct == Some(true)).count();
    info!(
        total,
        survey_correct = correct,
        survey_items = answers.len(),
        "simulated session"
    );
    println!("{}", out.display());
    Ok(())
}
