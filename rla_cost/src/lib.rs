mod config;
use log::info;

use std::collections::BTreeMap;

pub mod aggregate;
pub mod builder;
pub mod cost;
pub mod manual;
pub mod margins;
pub mod states;

pub use crate::aggregate::NationalReport;
pub use crate::config::*;
pub use crate::cost::sample_size;
pub use crate::states::StateTable;

/// Runs the cost pipeline over parsed sources.
///
/// Arguments:
/// * `model` the constants of the cost model
/// * `states` the table all the state keys come from
/// * `house` the rows of the House chart
/// * `margins` the Senate and presidential margins, one per race
/// * `ballots_cast` the total ballots cast per (year, state), used for the
/// preparation cost and to size full hand counts
pub fn run_estimate(
    model: &CostModel,
    states: &StateTable,
    house: &[HouseDistrictRecord],
    margins: &[ContestMargin],
    ballots_cast: &BTreeMap<YearState, u64>,
) -> Result<Estimate, AuditErrors> {
    model.validate()?;
    info!(
        "Processing {} House districts, {} statewide races, {} ballot totals, model: {:?}",
        house.len(),
        margins.len(),
        ballots_cast.len(),
        model
    );

    let mut race_costs = aggregate::house_race_costs(model, house, ballots_cast);
    race_costs.extend(aggregate::margin_race_costs(model, margins, ballots_cast));

    let aggregates = aggregate::join_contests(model, states, &race_costs, ballots_cast)?;
    let national_with_president =
        aggregate::national_totals(&aggregates, NationalReport::WithPresident);
    let national_excl_president =
        aggregate::national_totals(&aggregates, NationalReport::ExclPresident);
    let state_averages = aggregate::state_averages(&aggregates);
    let sample_stats = aggregate::sample_stats(&race_costs);

    for n in national_with_president.iter() {
        info!(
            "{}: {} states, total cost {:.2}",
            n.year, n.num_states, n.costs.cost_total
        );
    }

    Ok(Estimate {
        race_costs,
        aggregates,
        national_with_president,
        national_excl_president,
        state_averages,
        sample_stats,
    })
}
