// Opportunity-share features: player volume as a fraction of team volume.

use crate::store::{HistoricalRecord, TeamGameRecord};

/// The four volume-share features, each in [0, 1] for sane inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ShareFeatures {
    /// Targets / team pass attempts.
    pub target_share: f64,
    /// Rush attempts / team rush attempts.
    pub rush_share: f64,
    /// (RZ targets + RZ rushes) / team RZ opportunities.
    pub red_zone_share: f64,
    /// (Targets + rushes) / team total plays.
    pub opportunity_share: f64,
}

/// Ratio with a zero-volume guard: a team that ran no plays yields a 0.0
/// share, never a division error.
fn share(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Compute volume shares over matching trailing windows of player games and
/// team games. Totals are summed across each window before dividing, so a
/// player's share is volume-weighted rather than a mean of per-game ratios.
pub fn compute_shares(
    player_games: &[HistoricalRecord],
    team_games: &[TeamGameRecord],
) -> ShareFeatures {
    let player_targets: f64 = player_games.iter().map(|g| g.targets).sum();
    let player_rushes: f64 = player_games.iter().map(|g| g.rush_attempts).sum();
    let player_rz: f64 = player_games
        .iter()
        .map(|g| g.red_zone_targets + g.red_zone_rush_attempts)
        .sum();

    let team_passes: f64 = team_games.iter().map(|g| g.pass_attempts).sum();
    let team_rushes: f64 = team_games.iter().map(|g| g.rush_attempts).sum();
    let team_rz: f64 = team_games
        .iter()
        .map(|g| g.red_zone_pass_attempts + g.red_zone_rush_attempts)
        .sum();

    ShareFeatures {
        target_share: share(player_targets, team_passes),
        rush_share: share(player_rushes, team_rushes),
        red_zone_share: share(player_rz, team_rz),
        opportunity_share: share(player_targets + player_rushes, team_passes + team_rushes),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{GameContext, Position};
    use chrono::Utc;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn player_game(targets: f64, rushes: f64, rz_targets: f64, rz_rushes: f64) -> HistoricalRecord {
        HistoricalRecord {
            player_id: "p1".into(),
            name: "Test RB".into(),
            position: Position::RB,
            team: "PHI".into(),
            opponent: "DAL".into(),
            season: 2024,
            week: 1,
            kickoff: Utc::now(),
            is_home: true,
            pass_attempts: 0.0,
            pass_completions: 0.0,
            passing_yards: 0.0,
            passing_tds: 0.0,
            interceptions: 0.0,
            rush_attempts: rushes,
            rushing_yards: 0.0,
            rushing_tds: 0.0,
            targets,
            receptions: 0.0,
            receiving_yards: 0.0,
            receiving_tds: 0.0,
            red_zone_targets: rz_targets,
            red_zone_pass_attempts: 0.0,
            red_zone_rush_attempts: rz_rushes,
            fantasy_points: 0.0,
            context: GameContext::default(),
            vorp_last_season: 0.0,
            ppg_last_season: 0.0,
        }
    }

    fn team_game(passes: f64, rushes: f64, rz_passes: f64, rz_rushes: f64) -> TeamGameRecord {
        TeamGameRecord {
            team: "PHI".into(),
            season: 2024,
            week: 1,
            pass_attempts: passes,
            rush_attempts: rushes,
            red_zone_pass_attempts: rz_passes,
            red_zone_rush_attempts: rz_rushes,
        }
    }

    #[test]
    fn basic_shares() {
        // Player: 10 targets, 20 rushes over 2 games.
        // Team: 60 passes, 50 rushes.
        let player = vec![player_game(4.0, 12.0, 1.0, 2.0), player_game(6.0, 8.0, 1.0, 1.0)];
        let team = vec![team_game(30.0, 25.0, 5.0, 5.0), team_game(30.0, 25.0, 5.0, 5.0)];

        let shares = compute_shares(&player, &team);
        assert!(approx_eq(shares.target_share, 10.0 / 60.0, 1e-12));
        assert!(approx_eq(shares.rush_share, 20.0 / 50.0, 1e-12));
        assert!(approx_eq(shares.red_zone_share, 5.0 / 20.0, 1e-12));
        assert!(approx_eq(shares.opportunity_share, 30.0 / 110.0, 1e-12));
    }

    #[test]
    fn zero_team_volume_gives_zero_share() {
        let player = vec![player_game(5.0, 5.0, 1.0, 1.0)];
        let team = vec![team_game(0.0, 0.0, 0.0, 0.0)];

        let shares = compute_shares(&player, &team);
        assert!(approx_eq(shares.target_share, 0.0, 1e-12));
        assert!(approx_eq(shares.rush_share, 0.0, 1e-12));
        assert!(approx_eq(shares.red_zone_share, 0.0, 1e-12));
        assert!(approx_eq(shares.opportunity_share, 0.0, 1e-12));
    }

    #[test]
    fn missing_team_history_gives_zero_share() {
        let player = vec![player_game(5.0, 5.0, 1.0, 1.0)];
        let shares = compute_shares(&player, &[]);
        assert_eq!(shares, ShareFeatures::default());
    }

    #[test]
    fn empty_player_history_gives_zero_share() {
        let team = vec![team_game(30.0, 25.0, 5.0, 5.0)];
        let shares = compute_shares(&[], &team);
        assert_eq!(shares, ShareFeatures::default());
    }

    #[test]
    fn shares_are_volume_weighted_not_per_game_means() {
        // Game 1: 1 of 10 targets (10%). Game 2: 9 of 30 targets (30%).
        // Volume-weighted: 10/40 = 25%, not the 20% per-game mean.
        let player = vec![player_game(1.0, 0.0, 0.0, 0.0), player_game(9.0, 0.0, 0.0, 0.0)];
        let team = vec![team_game(10.0, 0.0, 0.0, 0.0), team_game(30.0, 0.0, 0.0, 0.0)];

        let shares = compute_shares(&player, &team);
        assert!(approx_eq(shares.target_share, 0.25, 1e-12));
    }
}
