// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// The federal contests covered by the cost model.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum ContestType {
    House,
    Senate,
    President,
}

impl ContestType {
    pub const ALL: [ContestType; 3] = [ContestType::House, ContestType::Senate, ContestType::President];

    /// Lower-case name, used in file names and column names.
    pub fn name(&self) -> &'static str {
        match self {
            ContestType::House => "house",
            ContestType::Senate => "senate",
            ContestType::President => "president",
        }
    }

    /// The parties entering the margin formula, in formula order.
    ///
    /// The first party is compared against the sum of all the others.
    pub fn margin_parties(&self) -> &'static [Party] {
        match self {
            ContestType::Senate => &[Party::Republican, Party::Democrat, Party::Libertarian],
            ContestType::House | ContestType::President => &[Party::Republican, Party::Democrat],
        }
    }
}

/// Simplified party labels, as found in the MIT Election Lab datasets.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Party {
    Republican,
    Democrat,
    Libertarian,
}

impl Party {
    /// Parses the `party_simplified` column. Other parties return None.
    pub fn from_simplified(s: &str) -> Option<Party> {
        match s.trim().to_uppercase().as_str() {
            "REPUBLICAN" => Some(Party::Republican),
            "DEMOCRAT" => Some(Party::Democrat),
            "LIBERTARIAN" => Some(Party::Libertarian),
            _ => None,
        }
    }
}

/// A validated state: upper-case name and postal code.
///
/// Only the state table hands these out, so any key in the pipeline refers to
/// a known state.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub struct StateKey {
    // Postal first: the derived ordering sorts by postal code.
    pub(crate) postal: String,
    pub(crate) name: String,
}

impl StateKey {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn postal(&self) -> &str {
        &self.postal
    }
}

/// The join key of the whole pipeline.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub struct YearState {
    pub year: u32,
    pub state: StateKey,
}

/// One row of raw results: the votes of one candidate in one race.
#[derive(PartialEq, Debug, Clone)]
pub struct CandidateVotes {
    pub year: u32,
    pub state: StateKey,
    /// Distinguishes several races of the same contest in the same state and
    /// year (regular and special Senate elections).
    pub race: String,
    pub party: Party,
    pub candidate_votes: u64,
    pub total_votes: u64,
}

/// One district row of the House chart.
#[derive(PartialEq, Debug, Clone)]
pub struct HouseDistrictRecord {
    pub year: u32,
    pub state: StateKey,
    pub district: String,
    /// Vote shares in percent. Blank cells (unopposed races) are 0.
    pub winner_pct: f64,
    pub runner_up_pct: f64,
    /// Ballots needed to confirm a 7-vote margin, as given by the chart.
    pub ballots_to_audit: u64,
}

// ******** Derived data structures *********

/// The margin of one race.
///
/// A margin of 0 is a tie or an unresolvable race. A contest that did not take
/// place has no record at all.
#[derive(PartialEq, Debug, Clone)]
pub struct ContestMargin {
    pub year: u32,
    pub state: StateKey,
    pub contest: ContestType,
    pub race: String,
    pub margin: f64,
    pub party_votes: Vec<(Party, u64)>,
    pub total_votes: Option<u64>,
}

/// Number of ballots to pull for an audit.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum AuditSampleSize {
    /// Always at least 1.
    Ballots(u64),
    /// The margin is zero: every ballot of the race gets counted by hand.
    FullHandCount,
}

impl AuditSampleSize {
    /// The number of ballots to audit. The full hand count needs the number of
    /// ballots cast in the race.
    pub fn resolve(&self, ballots_cast: Option<u64>) -> Option<u64> {
        match self {
            AuditSampleSize::Ballots(n) => Some(*n),
            AuditSampleSize::FullHandCount => ballots_cast,
        }
    }
}

/// The cost of auditing one race.
#[derive(PartialEq, Debug, Clone)]
pub struct RaceCost {
    pub year: u32,
    pub state: StateKey,
    pub contest: ContestType,
    pub race: String,
    /// Not defined for the House when the ballots cast are audited in full.
    pub margin: Option<f64>,
    pub sample: AuditSampleSize,
    /// None for a full hand count when no ballot count is known for the state.
    /// Such a race costs nothing and is left out of the sample statistics.
    pub ballots: Option<u64>,
    pub procedural_cost: f64,
}

/// The audit of one contest for a (year, state). Zero when the contest did not
/// take place.
#[derive(PartialEq, Debug, Clone, Copy, Default)]
pub struct ContestCost {
    pub ballots: u64,
    pub procedural_cost: f64,
}

impl ContestCost {
    pub const ZERO: ContestCost = ContestCost {
        ballots: 0,
        procedural_cost: 0.0,
    };
}

/// All the contests of one (year, state), after the outer join.
#[derive(PartialEq, Debug, Clone)]
pub struct StateYearAggregate {
    pub year: u32,
    pub state: StateKey,
    pub house: ContestCost,
    pub senate: ContestCost,
    pub president: ContestCost,
    /// From the House results, independently of the audits.
    pub total_ballots_cast: Option<u64>,
    pub preparation_cost: f64,
    pub central_cost: f64,
    pub cost_total: f64,
    pub cost_total_excl_president: f64,
}

impl StateYearAggregate {
    pub fn contest(&self, contest: ContestType) -> &ContestCost {
        match contest {
            ContestType::House => &self.house,
            ContestType::Senate => &self.senate,
            ContestType::President => &self.president,
        }
    }

    pub fn num_ballots_total(&self) -> u64 {
        self.house
            .ballots
            .saturating_add(self.senate.ballots)
            .saturating_add(self.president.ballots)
    }

    pub fn num_ballots_excl_president(&self) -> u64 {
        self.house.ballots.saturating_add(self.senate.ballots)
    }

    pub fn procedural_cost_total(&self) -> f64 {
        self.house.procedural_cost + self.senate.procedural_cost + self.president.procedural_cost
    }
}

/// The cost columns shared by the national and per-state rollups.
#[derive(PartialEq, Debug, Clone, Copy, Default)]
pub struct CostColumns {
    pub num_ballots: f64,
    pub num_ballots_excl_president: f64,
    pub procedural_cost_house: f64,
    pub procedural_cost_senate: f64,
    pub procedural_cost_president: f64,
    pub preparation_cost: f64,
    pub central_cost: f64,
    pub cost_total: f64,
    pub cost_total_excl_president: f64,
}

/// Costs summed over all the states for one year.
#[derive(PartialEq, Debug, Clone)]
pub struct NationalTotal {
    pub year: u32,
    pub num_states: usize,
    pub costs: CostColumns,
}

/// Costs of one state, averaged over the years it appears in.
#[derive(PartialEq, Debug, Clone)]
pub struct StateAverage {
    pub state: StateKey,
    pub num_years: usize,
    pub costs: CostColumns,
}

/// Descriptive statistics of a set of sample sizes.
#[derive(PartialEq, Debug, Clone)]
pub struct SampleSummary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation, undefined for a single value.
    pub std: Option<f64>,
    pub min: u64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: u64,
    pub total: u64,
}

/// Sample size statistics of one contest, nationally (state is None) or for
/// one state.
#[derive(PartialEq, Debug, Clone)]
pub struct SampleStats {
    pub contest: ContestType,
    pub state: Option<StateKey>,
    pub summary: SampleSummary,
}

/// Everything computed by one run.
#[derive(PartialEq, Debug, Clone)]
pub struct Estimate {
    pub race_costs: Vec<RaceCost>,
    pub aggregates: Vec<StateYearAggregate>,
    pub national_with_president: Vec<NationalTotal>,
    pub national_excl_president: Vec<NationalTotal>,
    pub state_averages: Vec<StateAverage>,
    pub sample_stats: Vec<SampleStats>,
}

/// Errors that prevent the pipeline from completing.
#[derive(PartialEq, Debug, Clone)]
pub enum AuditErrors {
    UnknownState(String),
    InvalidCostModel(String),
    InvalidStateTable(String),
}

impl Error for AuditErrors {}

impl Display for AuditErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditErrors::UnknownState(s) => write!(f, "unknown state: {:?}", s),
            AuditErrors::InvalidCostModel(s) => write!(f, "invalid cost model: {}", s),
            AuditErrors::InvalidStateTable(s) => write!(f, "invalid state table: {}", s),
        }
    }
}

// ********* Configuration **********

/// How the procedural cost of the House is computed.
///
/// The House margin is never derived from raw votes.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum HouseCostModel {
    /// Audit the number of ballots given per district by the House chart
    /// (ballots needed for a 7-vote margin), summed over the state.
    ChartSample,
    /// Audit every House ballot cast in the state.
    BallotsCast,
}

/// All the constants of the cost model.
#[derive(PartialEq, Debug, Clone)]
pub struct CostModel {
    /// K in `ceil(K / margin) + 1`. 7 corresponds to a 5% risk limit.
    pub risk_limit_constant: f64,
    /// Minutes spent on one audited ballot, for every contest.
    pub per_ballot_minutes: f64,
    /// USD per minute of audit work.
    pub per_minute_wage: f64,
    pub clerk_hourly_wage: f64,
    /// Hours of clerk work per county to prepare an audit.
    pub prep_hours_per_county: f64,
    pub hours_to_index_per_500_ballots: f64,
    /// Flat cost per state and election.
    pub central_cost: f64,
    pub house_model: HouseCostModel,
}

impl CostModel {
    pub const DEFAULT: CostModel = CostModel {
        risk_limit_constant: 7.0,
        per_ballot_minutes: 2.0,
        per_minute_wage: 0.35,
        clerk_hourly_wage: 21.23,
        prep_hours_per_county: 8.0,
        hours_to_index_per_500_ballots: 2.0,
        central_cost: 33580.0,
        house_model: HouseCostModel::ChartSample,
    };
}

impl Default for CostModel {
    fn default() -> Self {
        CostModel::DEFAULT
    }
}
