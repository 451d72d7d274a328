use log::{debug, info, warn};
use std::collections::BTreeMap;

use crate::config::*;
use crate::states::StateTable;

/// Costs of the House audits.
///
/// Districts are folded into their state: with the chart model every district
/// keeps its own race (and margin) and the aggregation sums them; with the
/// ballots cast model there is one race per state.
pub fn house_race_costs(
    model: &CostModel,
    districts: &[HouseDistrictRecord],
    ballots_cast: &BTreeMap<YearState, u64>,
) -> Vec<RaceCost> {
    match model.house_model {
        HouseCostModel::ChartSample => districts
            .iter()
            .map(|d| RaceCost {
                year: d.year,
                state: d.state.clone(),
                contest: ContestType::House,
                race: d.district.clone(),
                margin: Some(d.margin()),
                sample: AuditSampleSize::Ballots(d.ballots_to_audit),
                ballots: Some(d.ballots_to_audit),
                procedural_cost: model.procedural_cost(d.ballots_to_audit),
            })
            .collect(),
        HouseCostModel::BallotsCast => {
            let mut keys: Vec<YearState> = districts
                .iter()
                .map(|d| YearState {
                    year: d.year,
                    state: d.state.clone(),
                })
                .collect();
            keys.sort();
            keys.dedup();
            keys.into_iter()
                .map(|k| {
                    let ballots = match ballots_cast.get(&k) {
                        Some(b) => *b,
                        None => {
                            warn!(
                                "house_race_costs: no ballots cast for {} {}, counting 0",
                                k.year,
                                k.state.postal()
                            );
                            0
                        }
                    };
                    RaceCost {
                        year: k.year,
                        state: k.state,
                        contest: ContestType::House,
                        race: "statewide".to_string(),
                        margin: None,
                        sample: AuditSampleSize::FullHandCount,
                        ballots: Some(ballots),
                        procedural_cost: model.procedural_cost(ballots),
                    }
                })
                .collect()
        }
    }
}

/// The ballots cast in a state for `year`, else for its latest earlier year.
fn latest_ballots_cast(
    ballots_cast: &BTreeMap<YearState, u64>,
    year: u32,
    state: &StateKey,
) -> Option<(u32, u64)> {
    ballots_cast
        .iter()
        .filter(|(k, _)| k.state == *state && k.year <= year)
        .last()
        .map(|(k, b)| (k.year, *b))
}

/// Costs of the statewide (Senate, President) audits, one per race.
///
/// A tied race is counted by hand in full: the race's own total if known,
/// else the ballots cast in the state that year or in its latest earlier
/// year. With neither, the race keeps the full hand count without a size and
/// costs nothing.
pub fn margin_race_costs(
    model: &CostModel,
    margins: &[ContestMargin],
    ballots_cast: &BTreeMap<YearState, u64>,
) -> Vec<RaceCost> {
    let mut res: Vec<RaceCost> = Vec::new();
    for m in margins.iter() {
        let sample = model.sample_size(m.margin);
        let ballots = match sample {
            AuditSampleSize::Ballots(n) => Some(n),
            AuditSampleSize::FullHandCount => {
                let count = match m.total_votes {
                    Some(t) => Some(t),
                    None => match latest_ballots_cast(ballots_cast, m.year, &m.state) {
                        Some((year, b)) => {
                            if year != m.year {
                                debug!(
                                    "margin_race_costs: {} {}: using the ballots cast in {}",
                                    m.year,
                                    m.state.postal(),
                                    year
                                );
                            }
                            Some(b)
                        }
                        None => None,
                    },
                };
                match count {
                    Some(b) => warn!(
                        "margin_race_costs: tied {} race {:?} in {} {}: full hand count of {} ballots",
                        m.contest.name(),
                        m.race,
                        m.year,
                        m.state.postal(),
                        b
                    ),
                    None => warn!(
                        "margin_race_costs: tied {} race {:?} in {} {}: full hand count of unknown size, not costed",
                        m.contest.name(),
                        m.race,
                        m.year,
                        m.state.postal()
                    ),
                }
                count
            }
        };
        res.push(RaceCost {
            year: m.year,
            state: m.state.clone(),
            contest: m.contest,
            race: m.race.clone(),
            margin: Some(m.margin),
            sample,
            ballots,
            procedural_cost: ballots.map(|b| model.procedural_cost(b)).unwrap_or(0.0),
        });
    }
    res
}

/// Full outer join of the contests on (year, state).
///
/// A contest missing for a (year, state) did not take place and counts as
/// zero. The ballots cast only complete the rows created by the contests.
pub fn join_contests(
    model: &CostModel,
    states: &StateTable,
    race_costs: &[RaceCost],
    ballots_cast: &BTreeMap<YearState, u64>,
) -> Result<Vec<StateYearAggregate>, AuditErrors> {
    // Per key, one optional column per contest, in ContestType::ALL order.
    let mut joined: BTreeMap<YearState, [Option<ContestCost>; 3]> = BTreeMap::new();
    for rc in race_costs.iter() {
        let key = YearState {
            year: rc.year,
            state: rc.state.clone(),
        };
        let cols = joined.entry(key).or_insert([None, None, None]);
        let idx = match rc.contest {
            ContestType::House => 0,
            ContestType::Senate => 1,
            ContestType::President => 2,
        };
        let c = cols[idx].get_or_insert(ContestCost::ZERO);
        c.ballots = c.ballots.saturating_add(rc.ballots.unwrap_or(0));
        c.procedural_cost += rc.procedural_cost;
    }

    let mut res: Vec<StateYearAggregate> = Vec::new();
    for (key, cols) in joined.into_iter() {
        let [house, senate, president] = cols.map(|c| c.unwrap_or(ContestCost::ZERO));
        let total_ballots_cast = ballots_cast.get(&key).cloned();
        let counties = states.counties(&key.state)?;
        let preparation_cost = model.preparation_cost(counties, total_ballots_cast);
        let central_cost = model.central_cost();
        let cost_total_excl_president =
            house.procedural_cost + senate.procedural_cost + preparation_cost + central_cost;
        let cost_total = cost_total_excl_president + president.procedural_cost;
        debug!(
            "join_contests: {} {}: house {:?} senate {:?} president {:?} total {}",
            key.year,
            key.state.postal(),
            house,
            senate,
            president,
            cost_total
        );
        res.push(StateYearAggregate {
            year: key.year,
            state: key.state,
            house,
            senate,
            president,
            total_ballots_cast,
            preparation_cost,
            central_cost,
            cost_total,
            cost_total_excl_president,
        });
    }
    info!("join_contests: {} (year, state) rows", res.len());
    Ok(res)
}

impl CostColumns {
    fn add(&mut self, a: &StateYearAggregate) {
        self.num_ballots += a.num_ballots_total() as f64;
        self.num_ballots_excl_president += a.num_ballots_excl_president() as f64;
        self.procedural_cost_house += a.house.procedural_cost;
        self.procedural_cost_senate += a.senate.procedural_cost;
        self.procedural_cost_president += a.president.procedural_cost;
        self.preparation_cost += a.preparation_cost;
        self.central_cost += a.central_cost;
        self.cost_total += a.cost_total;
        self.cost_total_excl_president += a.cost_total_excl_president;
    }

    fn scaled(&self, factor: f64) -> CostColumns {
        CostColumns {
            num_ballots: self.num_ballots * factor,
            num_ballots_excl_president: self.num_ballots_excl_president * factor,
            procedural_cost_house: self.procedural_cost_house * factor,
            procedural_cost_senate: self.procedural_cost_senate * factor,
            procedural_cost_president: self.procedural_cost_president * factor,
            preparation_cost: self.preparation_cost * factor,
            central_cost: self.central_cost * factor,
            cost_total: self.cost_total * factor,
            cost_total_excl_president: self.cost_total_excl_president * factor,
        }
    }
}

/// Which years enter a national report.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum NationalReport {
    /// Presidential years only (year % 4 == 0).
    WithPresident,
    /// All the years; `cost_total_excl_president` is the relevant total.
    ExclPresident,
}

/// Sums the aggregates of each year over the states.
///
/// The aggregates are summed in the order given, so summing the state totals
/// of a year in that same order gives back the national figure exactly.
pub fn national_totals(aggregates: &[StateYearAggregate], report: NationalReport) -> Vec<NationalTotal> {
    let mut by_year: BTreeMap<u32, NationalTotal> = BTreeMap::new();
    for a in aggregates.iter() {
        if report == NationalReport::WithPresident && a.year % 4 != 0 {
            continue;
        }
        let e = by_year.entry(a.year).or_insert_with(|| NationalTotal {
            year: a.year,
            num_states: 0,
            costs: CostColumns::default(),
        });
        e.num_states += 1;
        e.costs.add(a);
    }
    by_year.into_values().collect()
}

/// Averages the aggregates of each state over the years it appears in.
pub fn state_averages(aggregates: &[StateYearAggregate]) -> Vec<StateAverage> {
    let mut by_state: BTreeMap<StateKey, (usize, CostColumns)> = BTreeMap::new();
    for a in aggregates.iter() {
        let e = by_state
            .entry(a.state.clone())
            .or_insert((0, CostColumns::default()));
        e.0 += 1;
        e.1.add(a);
    }
    by_state
        .into_iter()
        .map(|(state, (num_years, sums))| StateAverage {
            state,
            num_years,
            costs: sums.scaled(1.0 / num_years as f64),
        })
        .collect()
}

// Linear interpolation between the closest ranks.
fn quantile(sorted: &[u64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] as f64 + (sorted[hi] as f64 - sorted[lo] as f64) * frac
}

/// Count, mean, standard deviation, quartiles, extremes and total of a set of
/// sample sizes. None for an empty set.
pub fn sample_summary(samples: &[u64]) -> Option<SampleSummary> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    let count = sorted.len();
    let total: u64 = sorted.iter().fold(0u64, |acc, x| acc.saturating_add(*x));
    let mean = sorted.iter().map(|x| *x as f64).sum::<f64>() / count as f64;
    let std = if count > 1 {
        let ss: f64 = sorted.iter().map(|x| (*x as f64 - mean).powi(2)).sum();
        Some((ss / (count - 1) as f64).sqrt())
    } else {
        None
    };
    Some(SampleSummary {
        count,
        mean,
        std,
        min: sorted[0],
        q25: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q75: quantile(&sorted, 0.75),
        max: sorted[count - 1],
        total,
    })
}

/// Sample size statistics of each contest, nationally then per state.
pub fn sample_stats(race_costs: &[RaceCost]) -> Vec<SampleStats> {
    let mut res: Vec<SampleStats> = Vec::new();
    for contest in ContestType::ALL {
        let mut by_state: BTreeMap<StateKey, Vec<u64>> = BTreeMap::new();
        let mut all: Vec<u64> = Vec::new();
        for rc in race_costs.iter().filter(|rc| rc.contest == contest) {
            if let Some(b) = rc.ballots {
                all.push(b);
                by_state.entry(rc.state.clone()).or_default().push(b);
            }
        }
        if let Some(summary) = sample_summary(&all) {
            res.push(SampleStats {
                contest,
                state: None,
                summary,
            });
        }
        for (state, samples) in by_state.into_iter() {
            if let Some(summary) = sample_summary(&samples) {
                res.push(SampleStats {
                    contest,
                    state: Some(state),
                    summary,
                });
            }
        }
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn race(year: u32, state: &StateKey, contest: ContestType, ballots: u64) -> RaceCost {
        let model = CostModel::DEFAULT;
        RaceCost {
            year,
            state: state.clone(),
            contest,
            race: "r".to_string(),
            margin: None,
            sample: AuditSampleSize::Ballots(ballots),
            ballots: Some(ballots),
            procedural_cost: model.procedural_cost(ballots),
        }
    }

    #[test]
    fn missing_contests_are_zero() {
        let states = StateTable::builtin();
        let oh = states.lookup("OH").unwrap();
        let races = vec![
            race(2018, &oh, ContestType::House, 100),
            race(2018, &oh, ContestType::Senate, 50),
            race(2020, &oh, ContestType::President, 30),
        ];
        let aggs = join_contests(&CostModel::DEFAULT, &states, &races, &BTreeMap::new()).unwrap();
        assert_eq!(aggs.len(), 2);
        assert_eq!(aggs[0].year, 2018);
        assert_eq!(aggs[0].president, ContestCost::ZERO);
        assert_eq!(aggs[0].senate.ballots, 50);
        assert_eq!(aggs[1].year, 2020);
        assert_eq!(aggs[1].house, ContestCost::ZERO);
        assert_eq!(aggs[1].senate, ContestCost::ZERO);
        assert_eq!(aggs[1].president.procedural_cost, 30.0 * 2.0 * 0.35);
        assert_eq!(aggs[1].total_ballots_cast, None);
    }

    #[test]
    fn totals_add_up() {
        let states = StateTable::builtin();
        let de = states.lookup("DE").unwrap();
        let races = vec![
            race(2020, &de, ContestType::House, 100),
            race(2020, &de, ContestType::Senate, 10),
            race(2020, &de, ContestType::President, 20),
        ];
        let mut cast = BTreeMap::new();
        cast.insert(
            YearState {
                year: 2020,
                state: de.clone(),
            },
            50_000,
        );
        let model = CostModel::DEFAULT;
        let aggs = join_contests(&model, &states, &races, &cast).unwrap();
        let a = &aggs[0];
        assert_eq!(a.total_ballots_cast, Some(50_000));
        let prep = 8.0 * 21.23 * 3.0 + 100.0 * 2.0;
        assert!((a.preparation_cost - prep).abs() < 1e-9);
        let proc_total = 130.0 * 2.0 * 0.35;
        assert!((a.cost_total - (proc_total + prep + 33580.0)).abs() < 1e-9);
        assert!(
            (a.cost_total - a.cost_total_excl_president - 20.0 * 2.0 * 0.35).abs() < 1e-9
        );
        assert_eq!(a.num_ballots_total(), 130);
        assert_eq!(a.num_ballots_excl_president(), 110);
        let n = national_totals(&aggs, NationalReport::ExclPresident);
        assert_eq!(n[0].costs.num_ballots_excl_president, 110.0);
    }

    #[test]
    fn ballots_cast_alone_do_not_create_rows() {
        let states = StateTable::builtin();
        let de = states.lookup("DE").unwrap();
        let mut cast = BTreeMap::new();
        cast.insert(YearState { year: 2010, state: de }, 1000);
        let aggs = join_contests(&CostModel::DEFAULT, &states, &[], &cast).unwrap();
        assert!(aggs.is_empty());
    }

    #[test]
    fn house_ballots_cast_model() {
        let states = StateTable::builtin();
        let vt = states.lookup("VT").unwrap();
        let mut model = CostModel::DEFAULT;
        model.house_model = HouseCostModel::BallotsCast;
        let districts = vec![HouseDistrictRecord {
            year: 2022,
            state: vt.clone(),
            district: "At-large".to_string(),
            winner_pct: 60.0,
            runner_up_pct: 40.0,
            ballots_to_audit: 36,
        }];
        let mut cast = BTreeMap::new();
        cast.insert(
            YearState {
                year: 2022,
                state: vt,
            },
            280_000,
        );
        let rc = house_race_costs(&model, &districts, &cast);
        assert_eq!(rc.len(), 1);
        assert_eq!(rc[0].ballots, Some(280_000));
        assert_eq!(rc[0].margin, None);

        let rc = house_race_costs(&CostModel::DEFAULT, &districts, &cast);
        assert_eq!(rc[0].ballots, Some(36));
        assert!((rc[0].margin.unwrap() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn tie_without_ballot_count_keeps_sentinel() {
        let states = StateTable::builtin();
        let me = states.lookup("ME").unwrap();
        let m = ContestMargin {
            year: 2024,
            state: me.clone(),
            contest: ContestType::President,
            race: "statewide".to_string(),
            margin: 0.0,
            party_votes: vec![],
            total_votes: None,
        };
        let model = CostModel::DEFAULT;
        let res = margin_race_costs(&model, &[m.clone()], &BTreeMap::new());
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].sample, AuditSampleSize::FullHandCount);
        assert_eq!(res[0].ballots, None);
        assert_eq!(res[0].procedural_cost, 0.0);

        let aggs = join_contests(&model, &states, &res, &BTreeMap::new()).unwrap();
        assert_eq!(aggs[0].president.ballots, 0);
        assert!(sample_stats(&res).is_empty());

        // The latest earlier total stands in for the year.
        let mut cast = BTreeMap::new();
        cast.insert(
            YearState {
                year: 2020,
                state: me.clone(),
            },
            700_000,
        );
        cast.insert(
            YearState {
                year: 2022,
                state: me.clone(),
            },
            650_000,
        );
        let res = margin_race_costs(&model, &[m.clone()], &cast);
        assert_eq!(res[0].ballots, Some(650_000));

        cast.insert(YearState { year: 2024, state: me }, 800_000);
        let res = margin_race_costs(&model, &[m], &cast);
        assert_eq!(res[0].ballots, Some(800_000));
        assert!((res[0].procedural_cost - 800_000.0 * 2.0 * 0.35).abs() < 1e-6);
    }

    #[test]
    fn summary_statistics() {
        let s = sample_summary(&[1, 2, 3, 4]).unwrap();
        assert_eq!(s.count, 4);
        assert_eq!(s.mean, 2.5);
        assert_eq!(s.min, 1);
        assert_eq!(s.max, 4);
        assert_eq!(s.q25, 1.75);
        assert_eq!(s.median, 2.5);
        assert_eq!(s.q75, 3.25);
        assert_eq!(s.total, 10);
        assert!((s.std.unwrap() - 1.2909944487358056).abs() < 1e-12);
        assert!(sample_summary(&[]).is_none());
        assert_eq!(sample_summary(&[5]).unwrap().std, None);
    }
}
