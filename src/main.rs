// Prop-edge pipeline entry point.
//
// Run sequence:
// 1. Initialize tracing (log to file, keep stdout for the report)
// 2. Load config
// 3. Load data files (history, team stats, defense, schedule, lines, slate)
// 4. Build stores and engines
// 5. Project every stat for the slate
// 6. Rank prop lines by expected value
// 7. Optimize lineups from the projected slate
// 8. Simulate the lineups
// 9. Print the report

use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, Instant};

use prop_edge::config;
use prop_edge::ev;
use prop_edge::features::FeatureEngine;
use prop_edge::optimizer::{self, constraints::LineupRules, simulator};
use prop_edge::projection::{Projection, ProjectionEngine, ProjectionError, PROJECTED_STATS};
use prop_edge::store::{self, DefenseLog, FeatureStore, Schedule, SlatePlayer, Stat, TeamLog};

use anyhow::Context;
use tracing::{info, warn};

fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, keep stdout for the report)
    init_tracing()?;
    info!("prop-edge pipeline starting up");

    // 2. Load config
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "engine.toml".to_string());
    let config = config::load_config(Path::new(&config_path))
        .context("failed to load configuration")?;
    let season = config.pipeline.season;
    let week = config.pipeline.week;
    info!(
        "Config loaded: season {season} week {week}, {} lineup slots, ${} salary cap",
        config.optimizer.slots.len(),
        config.optimizer.salary_cap
    );

    // 3. Load data files
    let paths = &config.data_paths;
    let history = store::load_history(Path::new(&paths.history))
        .context("failed to load player history")?;
    let team_stats = store::load_team_stats(Path::new(&paths.team_stats))
        .context("failed to load team stats")?;
    let defense = store::load_defense(Path::new(&paths.defense))
        .context("failed to load defense stats")?;
    let schedule = store::load_schedule(Path::new(&paths.schedule))
        .context("failed to load schedule")?;
    let lines = store::load_lines(Path::new(&paths.lines)).context("failed to load prop lines")?;
    let slate = store::load_slate(Path::new(&paths.slate)).context("failed to load slate")?;
    info!(
        "Loaded {} player-games, {} prop lines, {} slate players",
        history.len(),
        lines.len(),
        slate.len()
    );

    // 4. Build stores and engines
    let feature_store = FeatureStore::new(history);
    info!(
        "History covers {} distinct players",
        feature_store.player_count()
    );
    let team_log = TeamLog::new(team_stats);
    let defense_log = DefenseLog::new(defense);
    let schedule = Schedule::new(schedule);
    let feature_engine = FeatureEngine::new(
        &config.features,
        &feature_store,
        &team_log,
        &defense_log,
        &schedule,
    );
    let projection_engine = ProjectionEngine::with_models_dir(
        &feature_engine,
        &config.ev.stat_sigma,
        config.features.window,
        Path::new(&paths.models_dir),
    );

    // 5. Project every stat for the slate. Players without history (rookies,
    // new signings) are skipped with a warning rather than failing the run.
    let mut projections: Vec<Projection> = Vec::new();
    let mut skipped = 0usize;
    for player in &slate {
        match projection_engine.project_batch(
            std::slice::from_ref(&player.player_id),
            season,
            week,
            &PROJECTED_STATS,
        ) {
            Ok(batch) => projections.extend(batch),
            Err(ProjectionError::Feature(e)) => {
                warn!("skipping {}: {e}", player.name);
                skipped += 1;
            }
            Err(e) => return Err(e).context("projection failed"),
        }
    }
    info!(
        "Projected {} (player, stat) pairs; {skipped} slate players skipped",
        projections.len()
    );

    // 6. Rank prop lines by expected value
    let candidates = ev::rank_ev(&projections, &lines, config.ev.min_ev_percent)
        .context("EV ranking failed")?;
    info!(
        "{} candidates at or above {:.1}% EV",
        candidates.len(),
        config.ev.min_ev_percent
    );

    // 7. Optimize lineups, feeding our fantasy-point means into the pool
    let pool = projected_pool(&slate, &projections);
    let rules = LineupRules::from_config(&config.optimizer)
        .context("invalid optimizer configuration")?;
    let deadline = Instant::now() + Duration::from_millis(config.optimizer.solve_timeout_ms);
    let batch = match optimizer::optimize_lineups(&pool, &rules, config.optimizer.num_lineups, deadline) {
        Ok(batch) => Some(batch),
        Err(e) => {
            warn!("lineup optimization: {e}");
            None
        }
    };

    // 8. Simulate the lineups
    let summaries = batch.as_ref().map(|batch| {
        simulator::simulate_lineups(
            &batch.lineups,
            &config.ev.stat_sigma,
            &config.simulator,
            &mut rand::thread_rng(),
        )
    });

    // 9. Print the report
    print_ev_report(&candidates);
    if let (Some(batch), Some(summaries)) = (&batch, &summaries) {
        print_lineups(batch, summaries);
    } else {
        println!("\nNo feasible lineup for this slate.");
    }

    info!("prop-edge pipeline finished");
    Ok(())
}

/// The optimizer pool: slate players with their projected points replaced
/// by our fantasy-point model mean where one exists. Players we could not
/// project keep the slate's own number.
fn projected_pool(slate: &[SlatePlayer], projections: &[Projection]) -> Vec<SlatePlayer> {
    let fantasy: std::collections::HashMap<&str, f64> = projections
        .iter()
        .filter(|p| p.stat == Stat::FantasyPoints)
        .map(|p| (p.player_id.as_str(), p.mean))
        .collect();

    slate
        .iter()
        .map(|p| {
            let mut p = p.clone();
            if let Some(&mean) = fantasy.get(p.player_id.as_str()) {
                p.projected_points = mean;
            }
            p
        })
        .collect()
}

fn print_ev_report(candidates: &[ev::EvCandidate]) {
    println!("== Prop edges ==");
    if candidates.is_empty() {
        println!("(none above the EV threshold)");
        return;
    }
    // One player can clear the threshold on several books; show each once
    // per (player, stat, side) at its best price.
    let mut seen: HashSet<(String, Stat, ev::Side)> = HashSet::new();
    for c in candidates {
        if !seen.insert((c.player_id.clone(), c.stat, c.side)) {
            continue;
        }
        println!(
            "{:<24} {:<16} {:>6} {:>7.1} @ {:>5} ({})   EV {:>6.2}%  p={:.3}  proj {:.1}",
            c.name,
            c.stat.column_name(),
            c.side.display_str(),
            c.threshold,
            c.price,
            c.book,
            c.ev_percent,
            c.win_probability,
            c.projected_mean
        );
    }
}

fn print_lineups(batch: &optimizer::LineupBatch, summaries: &[simulator::SimulationSummary]) {
    println!("\n== Lineups ({} found) ==", batch.count_found);
    for (i, (lineup, summary)) in batch.lineups.iter().zip(summaries).enumerate() {
        println!(
            "Lineup {}: {:.1} pts, ${} salary  (sim mean {:.1}, floor {:.1}, ceiling {:.1}, win {:.1}%)",
            i + 1,
            lineup.total_points,
            lineup.total_salary,
            summary.mean_score,
            summary.floor,
            summary.ceiling,
            summary.win_probability * 100.0
        );
        for (slot, player) in &lineup.slots {
            println!(
                "  {:<5} {:<24} {:<4} {:<4} ${:<6} {:>5.1}",
                slot,
                player.name,
                player.position.display_str(),
                player.team,
                player.salary,
                player.projected_points
            );
        }
    }
}

/// Initialize tracing to log to a file, keeping stdout clean for the report.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("propedge.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("prop_edge=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
