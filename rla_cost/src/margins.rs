use log::{debug, warn};
use std::collections::BTreeMap;

use crate::config::*;

/// Absolute margin between the first party of the formula and all the others,
/// from vote shares.
///
/// For the presidency this is |R - D|, for the Senate |R - D - L|.
fn share_margin(contest: ContestType, party_votes: &[(Party, u64)], total_votes: u64) -> f64 {
    let share = |p: Party| -> f64 {
        party_votes
            .iter()
            .filter(|(p2, _)| *p2 == p)
            .map(|(_, v)| *v as f64)
            .sum::<f64>()
            / total_votes as f64
    };
    let parties = contest.margin_parties();
    let mut diff = share(parties[0]);
    for p in parties[1..].iter() {
        diff -= share(*p);
    }
    diff.abs().clamp(0.0, 1.0)
}

/// Computes one margin per race from per-candidate results.
///
/// Candidates of parties outside the margin formula are ignored. Candidates of
/// the same party in one race are summed. Races with no votes cast are dropped.
pub fn extract_margins(contest: ContestType, votes: &[CandidateVotes]) -> Vec<ContestMargin> {
    // (year, state, race) -> (votes per party, total votes of the race)
    let mut races: BTreeMap<(u32, StateKey, String), (BTreeMap<Party, u64>, u64)> =
        BTreeMap::new();
    for v in votes.iter() {
        if !contest.margin_parties().contains(&v.party) {
            continue;
        }
        let e = races
            .entry((v.year, v.state.clone(), v.race.clone()))
            .or_insert_with(|| (BTreeMap::new(), 0));
        *e.0.entry(v.party).or_insert(0) += v.candidate_votes;
        // The total is repeated on every row of the race.
        e.1 = e.1.max(v.total_votes);
    }

    let mut res: Vec<ContestMargin> = Vec::new();
    let mut dropped = 0;
    for ((year, state, race), (party_map, total_votes)) in races.into_iter() {
        if total_votes == 0 {
            dropped += 1;
            continue;
        }
        let party_votes: Vec<(Party, u64)> = party_map.into_iter().collect();
        let margin = share_margin(contest, &party_votes, total_votes);
        debug!(
            "extract_margins: {} {} {} {:?}: margin {}",
            contest.name(),
            year,
            state.postal(),
            race,
            margin
        );
        res.push(ContestMargin {
            year,
            state,
            contest,
            race,
            margin,
            party_votes,
            total_votes: Some(total_votes),
        });
    }
    if dropped > 0 {
        warn!(
            "extract_margins: {}: dropped {} races without any vote cast",
            contest.name(),
            dropped
        );
    }
    res
}

/// Margin from two percentages (0-100), as reported by news outlets.
pub fn margin_from_percentages(first_pct: f64, second_pct: f64) -> f64 {
    ((first_pct - second_pct) / 100.0).abs().clamp(0.0, 1.0)
}

impl HouseDistrictRecord {
    /// Margin between the winner and the first runner-up. Only reported: the
    /// House cost does not depend on it.
    pub fn margin(&self) -> f64 {
        margin_from_percentages(self.winner_pct, self.runner_up_pct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::states::StateTable;

    fn row(state: &StateKey, race: &str, party: Party, votes: u64, total: u64) -> CandidateVotes {
        CandidateVotes {
            year: 2020,
            state: state.clone(),
            race: race.to_string(),
            party,
            candidate_votes: votes,
            total_votes: total,
        }
    }

    #[test]
    fn president_uses_two_parties() {
        let oh = StateTable::builtin().lookup("OH").unwrap();
        let votes = vec![
            row(&oh, "statewide", Party::Republican, 530, 1000),
            row(&oh, "statewide", Party::Democrat, 450, 1000),
            row(&oh, "statewide", Party::Libertarian, 20, 1000),
        ];
        let m = extract_margins(ContestType::President, &votes);
        assert_eq!(m.len(), 1);
        assert!((m[0].margin - 0.08).abs() < 1e-12);
        assert_eq!(m[0].total_votes, Some(1000));
        assert_eq!(
            m[0].party_votes,
            vec![(Party::Republican, 530), (Party::Democrat, 450)]
        );
    }

    #[test]
    fn senate_uses_three_party_formula() {
        let ga = StateTable::builtin().lookup("GA").unwrap();
        let votes = vec![
            row(&ga, "regular", Party::Republican, 500, 1000),
            row(&ga, "regular", Party::Democrat, 400, 1000),
            row(&ga, "regular", Party::Libertarian, 50, 1000),
        ];
        let m = extract_margins(ContestType::Senate, &votes);
        assert_eq!(m.len(), 1);
        // |0.5 - 0.4 - 0.05|
        assert!((m[0].margin - 0.05).abs() < 1e-12);
    }

    #[test]
    fn races_stay_separate_and_same_party_is_summed() {
        let ga = StateTable::builtin().lookup("GA").unwrap();
        let votes = vec![
            row(&ga, "regular", Party::Republican, 300, 1000),
            row(&ga, "regular", Party::Republican, 200, 1000),
            row(&ga, "regular", Party::Democrat, 400, 1000),
            row(&ga, "special", Party::Republican, 100, 200),
            row(&ga, "special", Party::Democrat, 100, 200),
        ];
        let m = extract_margins(ContestType::Senate, &votes);
        assert_eq!(m.len(), 2);
        assert_eq!(m[0].race, "regular");
        assert!((m[0].margin - 0.1).abs() < 1e-12);
        assert_eq!(m[1].race, "special");
        assert_eq!(m[1].margin, 0.0);
    }

    #[test]
    fn race_without_votes_is_dropped() {
        let ak = StateTable::builtin().lookup("AK").unwrap();
        let votes = vec![row(&ak, "statewide", Party::Republican, 0, 0)];
        assert!(extract_margins(ContestType::President, &votes).is_empty());
    }

    #[test]
    fn percentages_margin() {
        assert!((margin_from_percentages(48.5, 50.5) - 0.02).abs() < 1e-12);
        assert_eq!(margin_from_percentages(50.0, 50.0), 0.0);
    }
}
