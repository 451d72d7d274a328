pub use crate::config::*;
use crate::states::StateTable;

use std::collections::BTreeMap;

/// A builder for collecting the parsed sources of one run.
///
/// ```
/// use rla_cost::builder::Builder;
/// use rla_cost::{CandidateVotes, ContestType, CostModel, Party, StateTable};
/// # use rla_cost::AuditErrors;
///
/// let states = StateTable::builtin();
/// let ohio = states.lookup("Ohio")?;
/// let mut builder = Builder::new(&CostModel::DEFAULT, states)?;
///
/// for (party, votes) in [(Party::Republican, 525), (Party::Democrat, 475)] {
///     builder.add_candidate_votes(
///         ContestType::President,
///         CandidateVotes {
///             year: 2020,
///             state: ohio.clone(),
///             race: "statewide".to_string(),
///             party,
///             candidate_votes: votes,
///             total_votes: 1000,
///         },
///     );
/// }
/// let estimate = builder.run()?;
/// // Margin of 5%: 141 ballots.
/// assert_eq!(estimate.aggregates[0].president.ballots, 141);
///
/// # Ok::<(), AuditErrors>(())
/// ```
pub struct Builder {
    pub(crate) _model: CostModel,
    pub(crate) _states: StateTable,
    pub(crate) _house: Vec<HouseDistrictRecord>,
    pub(crate) _votes: BTreeMap<ContestType, Vec<CandidateVotes>>,
    pub(crate) _margins: Vec<ContestMargin>,
    pub(crate) _ballots_cast: BTreeMap<YearState, u64>,
}

impl Builder {
    pub fn new(model: &CostModel, states: StateTable) -> Result<Builder, AuditErrors> {
        model.validate()?;
        Ok(Builder {
            _model: model.clone(),
            _states: states,
            _house: Vec::new(),
            _votes: BTreeMap::new(),
            _margins: Vec::new(),
            _ballots_cast: BTreeMap::new(),
        })
    }

    pub fn states(&self) -> &StateTable {
        &self._states
    }

    pub fn add_house_district(&mut self, record: HouseDistrictRecord) {
        self._house.push(record);
    }

    /// Adds one row of raw results. Margins are computed when running.
    pub fn add_candidate_votes(&mut self, contest: ContestType, votes: CandidateVotes) {
        self._votes.entry(contest).or_default().push(votes);
    }

    /// Adds a margin known directly (reported percentages).
    pub fn add_margin(&mut self, margin: ContestMargin) {
        self._margins.push(margin);
    }

    /// Adds ballots cast in a (year, state). Several calls for the same key
    /// (one per district) are summed.
    pub fn add_ballots_cast(&mut self, year: u32, state: StateKey, ballots: u64) {
        let e = self
            ._ballots_cast
            .entry(YearState { year, state })
            .or_insert(0);
        *e += ballots;
    }

    pub fn run(&self) -> Result<Estimate, AuditErrors> {
        let mut margins: Vec<ContestMargin> = Vec::new();
        for (contest, votes) in self._votes.iter() {
            margins.extend(crate::margins::extract_margins(*contest, votes));
        }
        margins.extend(self._margins.iter().cloned());
        crate::run_estimate(
            &self._model,
            &self._states,
            &self._house,
            &margins,
            &self._ballots_cast,
        )
    }
}
