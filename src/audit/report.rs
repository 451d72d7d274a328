// Writing the reports (CSV) and comparing them with reference reports.

use serde::Serialize;
use text_diff::print_diff;

use crate::audit::*;

const ALL_DATA: &str = "all_data_by_state_yr.csv";
const STATE_DIR: &str = "state-by-state";
const NATIONAL_WITH_PRESIDENT: &str = "national_totals_with_president.csv";
const NATIONAL_EXCL_PRESIDENT: &str = "national_totals_excl_president.csv";
const STATE_AVERAGES: &str = "state_averages.csv";
const MARGIN_DIR: &str = "margins";

/// Money and averaged counts are written with two decimals.
fn money(x: f64) -> String {
    format!("{:.2}", x)
}

/// A report row. The header is written even when a report has no rows.
trait ReportRow: Serialize {
    const HEADER: &'static [&'static str];
}

#[derive(Debug, Serialize)]
struct AggregateRow<'a> {
    year: u32,
    state: &'a str,
    state_po: &'a str,
    num_ballots_house: u64,
    procedural_cost_house: String,
    num_ballots_senate: u64,
    procedural_cost_senate: String,
    num_ballots_president: u64,
    procedural_cost_president: String,
    num_ballots_total: u64,
    procedural_cost_total: String,
    totalvotes: Option<u64>,
    preparation_cost: String,
    central_cost: String,
    cost_total: String,
    cost_total_excl_president: String,
}

impl<'a> ReportRow for AggregateRow<'a> {
    const HEADER: &'static [&'static str] = &[
        "year",
        "state",
        "state_po",
        "num_ballots_house",
        "procedural_cost_house",
        "num_ballots_senate",
        "procedural_cost_senate",
        "num_ballots_president",
        "procedural_cost_president",
        "num_ballots_total",
        "procedural_cost_total",
        "totalvotes",
        "preparation_cost",
        "central_cost",
        "cost_total",
        "cost_total_excl_president",
    ];
}

impl<'a> AggregateRow<'a> {
    fn new(a: &'a StateYearAggregate) -> AggregateRow<'a> {
        AggregateRow {
            year: a.year,
            state: a.state.name(),
            state_po: a.state.postal(),
            num_ballots_house: a.house.ballots,
            procedural_cost_house: money(a.house.procedural_cost),
            num_ballots_senate: a.senate.ballots,
            procedural_cost_senate: money(a.senate.procedural_cost),
            num_ballots_president: a.president.ballots,
            procedural_cost_president: money(a.president.procedural_cost),
            num_ballots_total: a.num_ballots_total(),
            procedural_cost_total: money(a.procedural_cost_total()),
            totalvotes: a.total_ballots_cast,
            preparation_cost: money(a.preparation_cost),
            central_cost: money(a.central_cost),
            cost_total: money(a.cost_total),
            cost_total_excl_president: money(a.cost_total_excl_president),
        }
    }
}

/// Presidential years, every contest.
#[derive(Debug, Serialize)]
struct NationalRow {
    year: u32,
    num_states: usize,
    num_ballots: String,
    procedural_cost_house: String,
    procedural_cost_senate: String,
    procedural_cost_president: String,
    preparation_cost: String,
    central_cost: String,
    cost_total: String,
    cost_total_excl_president: String,
}

impl ReportRow for NationalRow {
    const HEADER: &'static [&'static str] = &[
        "year",
        "num_states",
        "num_ballots",
        "procedural_cost_house",
        "procedural_cost_senate",
        "procedural_cost_president",
        "preparation_cost",
        "central_cost",
        "cost_total",
        "cost_total_excl_president",
    ];
}

impl NationalRow {
    fn new(n: &NationalTotal) -> NationalRow {
        let c = &n.costs;
        NationalRow {
            year: n.year,
            num_states: n.num_states,
            num_ballots: format!("{:.0}", c.num_ballots),
            procedural_cost_house: money(c.procedural_cost_house),
            procedural_cost_senate: money(c.procedural_cost_senate),
            procedural_cost_president: money(c.procedural_cost_president),
            preparation_cost: money(c.preparation_cost),
            central_cost: money(c.central_cost),
            cost_total: money(c.cost_total),
            cost_total_excl_president: money(c.cost_total_excl_president),
        }
    }
}

/// All the years, without the presidential contest.
#[derive(Debug, Serialize)]
struct NationalExclPresidentRow {
    year: u32,
    num_states: usize,
    num_ballots: String,
    procedural_cost_house: String,
    procedural_cost_senate: String,
    preparation_cost: String,
    central_cost: String,
    cost_total_excl_president: String,
}

impl ReportRow for NationalExclPresidentRow {
    const HEADER: &'static [&'static str] = &[
        "year",
        "num_states",
        "num_ballots",
        "procedural_cost_house",
        "procedural_cost_senate",
        "preparation_cost",
        "central_cost",
        "cost_total_excl_president",
    ];
}

impl NationalExclPresidentRow {
    fn new(n: &NationalTotal) -> NationalExclPresidentRow {
        let c = &n.costs;
        NationalExclPresidentRow {
            year: n.year,
            num_states: n.num_states,
            num_ballots: format!("{:.0}", c.num_ballots_excl_president),
            procedural_cost_house: money(c.procedural_cost_house),
            procedural_cost_senate: money(c.procedural_cost_senate),
            preparation_cost: money(c.preparation_cost),
            central_cost: money(c.central_cost),
            cost_total_excl_president: money(c.cost_total_excl_president),
        }
    }
}

#[derive(Debug, Serialize)]
struct StateAverageRow<'a> {
    state: &'a str,
    state_po: &'a str,
    num_years: usize,
    num_ballots: String,
    procedural_cost_house: String,
    procedural_cost_senate: String,
    procedural_cost_president: String,
    preparation_cost: String,
    central_cost: String,
    cost_total: String,
    cost_total_excl_president: String,
}

impl<'a> ReportRow for StateAverageRow<'a> {
    const HEADER: &'static [&'static str] = &[
        "state",
        "state_po",
        "num_years",
        "num_ballots",
        "procedural_cost_house",
        "procedural_cost_senate",
        "procedural_cost_president",
        "preparation_cost",
        "central_cost",
        "cost_total",
        "cost_total_excl_president",
    ];
}

impl<'a> StateAverageRow<'a> {
    fn new(s: &'a StateAverage) -> StateAverageRow<'a> {
        let c = &s.costs;
        StateAverageRow {
            state: s.state.name(),
            state_po: s.state.postal(),
            num_years: s.num_years,
            num_ballots: money(c.num_ballots),
            procedural_cost_house: money(c.procedural_cost_house),
            procedural_cost_senate: money(c.procedural_cost_senate),
            procedural_cost_president: money(c.procedural_cost_president),
            preparation_cost: money(c.preparation_cost),
            central_cost: money(c.central_cost),
            cost_total: money(c.cost_total),
            cost_total_excl_president: money(c.cost_total_excl_president),
        }
    }
}

#[derive(Debug, Serialize)]
struct MarginRow<'a> {
    year: u32,
    state: &'a str,
    state_po: &'a str,
    race: &'a str,
    margin: Option<String>,
    full_hand_count: bool,
    // Empty for a full hand count of unknown size.
    num_ballots: Option<u64>,
    procedural_cost: String,
}

impl<'a> ReportRow for MarginRow<'a> {
    const HEADER: &'static [&'static str] = &[
        "year",
        "state",
        "state_po",
        "race",
        "margin",
        "full_hand_count",
        "num_ballots",
        "procedural_cost",
    ];
}

impl<'a> MarginRow<'a> {
    fn new(r: &'a RaceCost) -> MarginRow<'a> {
        MarginRow {
            year: r.year,
            state: r.state.name(),
            state_po: r.state.postal(),
            race: r.race.as_str(),
            margin: r.margin.map(|m| format!("{:.6}", m)),
            full_hand_count: r.sample == AuditSampleSize::FullHandCount,
            num_ballots: r.ballots,
            procedural_cost: money(r.procedural_cost),
        }
    }
}

#[derive(Debug, Serialize)]
struct SampleStatsRow<'a> {
    scope: &'a str,
    count: usize,
    mean: String,
    std: Option<String>,
    min: u64,
    #[serde(rename = "25%")]
    q25: String,
    #[serde(rename = "50%")]
    median: String,
    #[serde(rename = "75%")]
    q75: String,
    max: u64,
    total: u64,
}

impl<'a> ReportRow for SampleStatsRow<'a> {
    const HEADER: &'static [&'static str] = &[
        "scope", "count", "mean", "std", "min", "25%", "50%", "75%", "max", "total",
    ];
}

impl<'a> SampleStatsRow<'a> {
    fn new(s: &'a SampleStats) -> SampleStatsRow<'a> {
        let x = &s.summary;
        SampleStatsRow {
            scope: s.state.as_ref().map(|st| st.postal()).unwrap_or("ALL"),
            count: x.count,
            mean: money(x.mean),
            std: x.std.map(money),
            min: x.min,
            q25: money(x.q25),
            median: money(x.median),
            q75: money(x.q75),
            max: x.max,
            total: x.total,
        }
    }
}

/// Writes one CSV report under `out_dir` and returns its relative path.
fn write_csv<S: ReportRow>(
    out_dir: &Path,
    lpath: PathBuf,
    rows: impl IntoIterator<Item = S>,
) -> AuditResult<PathBuf> {
    let p = out_dir.join(&lpath);
    let path = display(&p);
    if let Some(parent) = p.parent() {
        fs::create_dir_all(parent).context(CreatingDirSnafu {
            path: display(parent),
        })?;
    }
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&p)
        .context(WritingReportSnafu { path: path.clone() })?;
    wtr.write_record(S::HEADER)
        .context(WritingReportSnafu { path: path.clone() })?;
    let mut count = 0;
    for row in rows {
        wtr.serialize(row)
            .context(WritingReportSnafu { path: path.clone() })?;
        count += 1;
    }
    wtr.flush().context(FlushingReportSnafu { path: path.clone() })?;
    if count == 0 {
        info!("{}: no rows, header only", path);
    }
    debug!("write_csv: {} rows to {}", count, path);
    Ok(lpath)
}

/// Writes all the reports of an estimate. The returned paths are relative to
/// `out_dir`.
pub fn write_reports(estimate: &Estimate, out_dir: &Path) -> AuditResult<Vec<PathBuf>> {
    let mut written: Vec<PathBuf> = Vec::new();

    written.push(write_csv(
        out_dir,
        PathBuf::from(ALL_DATA),
        estimate.aggregates.iter().map(AggregateRow::new),
    )?);

    let mut postals: Vec<&str> = estimate
        .aggregates
        .iter()
        .map(|a| a.state.postal())
        .collect();
    postals.sort_unstable();
    postals.dedup();
    for po in postals {
        written.push(write_csv(
            out_dir,
            Path::new(STATE_DIR).join(format!("all_data_{}.csv", po)),
            estimate
                .aggregates
                .iter()
                .filter(|a| a.state.postal() == po)
                .map(AggregateRow::new),
        )?);
    }

    written.push(write_csv(
        out_dir,
        PathBuf::from(NATIONAL_WITH_PRESIDENT),
        estimate.national_with_president.iter().map(NationalRow::new),
    )?);
    written.push(write_csv(
        out_dir,
        PathBuf::from(NATIONAL_EXCL_PRESIDENT),
        estimate
            .national_excl_president
            .iter()
            .map(NationalExclPresidentRow::new),
    )?);
    written.push(write_csv(
        out_dir,
        PathBuf::from(STATE_AVERAGES),
        estimate.state_averages.iter().map(StateAverageRow::new),
    )?);

    for contest in ContestType::ALL {
        written.push(write_csv(
            out_dir,
            Path::new(MARGIN_DIR).join(format!("{}_margins.csv", contest.name())),
            estimate
                .race_costs
                .iter()
                .filter(|r| r.contest == contest)
                .map(MarginRow::new),
        )?);
        written.push(write_csv(
            out_dir,
            Path::new(MARGIN_DIR).join(format!("{}_sample_stats.csv", contest.name())),
            estimate
                .sample_stats
                .iter()
                .filter(|s| s.contest == contest)
                .map(SampleStatsRow::new),
        )?);
    }
    Ok(written)
}

/// Compares each written report with the file of the same relative path in
/// `ref_dir`, printing the differences. Returns the number of reports that
/// differ or are missing from the reference.
pub fn compare_with_reference(
    out_dir: &Path,
    ref_dir: &Path,
    written: &[PathBuf],
) -> AuditResult<usize> {
    let mut mismatches = 0;
    for lpath in written.iter() {
        let ref_p = ref_dir.join(lpath);
        let reference = match fs::read_to_string(&ref_p) {
            Ok(s) => s,
            Err(e) => {
                warn!("Cannot read reference report {:?}: {}", ref_p, e);
                mismatches += 1;
                continue;
            }
        };
        let out_p = out_dir.join(lpath);
        let computed = fs::read_to_string(&out_p).context(OpeningTextSnafu {
            path: display(&out_p),
        })?;
        if reference != computed {
            warn!("Found differences with the reference report {:?}", ref_p);
            print_diff(reference.as_str(), computed.as_str(), "\n");
            mismatches += 1;
        }
    }
    Ok(mismatches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rla_cost::builder::Builder;

    fn ohio() -> StateKey {
        StateTable::builtin().lookup("OH").unwrap()
    }

    fn small_estimate() -> Estimate {
        let mut builder = Builder::new(&CostModel::DEFAULT, StateTable::builtin()).unwrap();
        for year in [2018, 2020] {
            builder.add_margin(ContestMargin {
                year,
                state: ohio(),
                contest: ContestType::Senate,
                race: "regular".to_string(),
                margin: 0.05,
                party_votes: Vec::new(),
                total_votes: Some(1000),
            });
        }
        builder.add_ballots_cast(2020, ohio(), 5000);
        builder.run().unwrap()
    }

    fn temp_dir(name: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!("rlacost-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&p);
        p
    }

    fn midterm_estimate() -> Estimate {
        let mut builder = Builder::new(&CostModel::DEFAULT, StateTable::builtin()).unwrap();
        builder.add_margin(ContestMargin {
            year: 2018,
            state: ohio(),
            contest: ContestType::Senate,
            race: "regular".to_string(),
            margin: 0.05,
            party_votes: Vec::new(),
            total_votes: Some(1000),
        });
        builder.run().unwrap()
    }

    fn header_of<S: ReportRow>(row: S) -> String {
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.serialize(row).unwrap();
        let bytes = wtr.into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        text.lines().next().unwrap().to_string()
    }

    #[test]
    fn headers_match_the_serialized_fields() {
        let estimate = small_estimate();
        assert_eq!(
            header_of(AggregateRow::new(&estimate.aggregates[0])),
            AggregateRow::HEADER.join(",")
        );
        assert_eq!(
            header_of(NationalRow::new(&estimate.national_with_president[0])),
            NationalRow::HEADER.join(",")
        );
        assert_eq!(
            header_of(NationalExclPresidentRow::new(&estimate.national_excl_president[0])),
            NationalExclPresidentRow::HEADER.join(",")
        );
        assert_eq!(
            header_of(StateAverageRow::new(&estimate.state_averages[0])),
            StateAverageRow::HEADER.join(",")
        );
        assert_eq!(
            header_of(MarginRow::new(&estimate.race_costs[0])),
            MarginRow::HEADER.join(",")
        );
        assert_eq!(
            header_of(SampleStatsRow::new(&estimate.sample_stats[0])),
            SampleStatsRow::HEADER.join(",")
        );
    }

    #[test]
    fn tie_of_unknown_size_is_flagged() {
        let mut builder = Builder::new(&CostModel::DEFAULT, StateTable::builtin()).unwrap();
        builder.add_margin(ContestMargin {
            year: 2024,
            state: ohio(),
            contest: ContestType::President,
            race: "statewide".to_string(),
            margin: 0.0,
            party_votes: Vec::new(),
            total_votes: None,
        });
        let estimate = builder.run().unwrap();
        let row = MarginRow::new(&estimate.race_costs[0]);
        assert!(row.full_hand_count);
        assert_eq!(row.num_ballots, None);
        assert_eq!(row.procedural_cost, "0.00");
    }

    #[test]
    fn empty_reports_keep_their_header() {
        let estimate = midterm_estimate();
        assert!(estimate.national_with_president.is_empty());
        let out = temp_dir("midterm");
        write_reports(&estimate, &out).unwrap();
        let national = fs::read_to_string(out.join(NATIONAL_WITH_PRESIDENT)).unwrap();
        assert_eq!(national, format!("{}\n", NationalRow::HEADER.join(",")));
        let president =
            fs::read_to_string(out.join(MARGIN_DIR).join("president_margins.csv")).unwrap();
        assert_eq!(president, format!("{}\n", MarginRow::HEADER.join(",")));
        let _ = fs::remove_dir_all(&out);
    }

    #[test]
    fn excl_president_table_has_no_president_columns() {
        let estimate = small_estimate();
        let out = temp_dir("excl");
        write_reports(&estimate, &out).unwrap();
        let excl = fs::read_to_string(out.join(NATIONAL_EXCL_PRESIDENT)).unwrap();
        let mut lines = excl.lines();
        let header = lines.next().unwrap();
        assert!(!header.contains("procedural_cost_president"));
        assert!(!header.split(',').any(|h| h == "cost_total"));
        assert_eq!(lines.count(), 2);
        let _ = fs::remove_dir_all(&out);
    }

    #[test]
    fn two_runs_write_identical_reports() {
        let out1 = temp_dir("run1");
        let out2 = temp_dir("run2");
        let written1 = write_reports(&small_estimate(), &out1).unwrap();
        let written2 = write_reports(&small_estimate(), &out2).unwrap();
        assert_eq!(written1, written2);
        assert_eq!(compare_with_reference(&out1, &out2, &written1).unwrap(), 0);
        for lpath in written1.iter() {
            assert_eq!(
                fs::read(out1.join(lpath)).unwrap(),
                fs::read(out2.join(lpath)).unwrap()
            );
        }
        let _ = fs::remove_dir_all(&out1);
        let _ = fs::remove_dir_all(&out2);
    }

    #[test]
    fn aggregate_row_formatting() {
        let estimate = small_estimate();
        let row = AggregateRow::new(&estimate.aggregates[0]);
        assert_eq!(row.state_po, "OH");
        assert_eq!(row.num_ballots_senate, 141);
        assert_eq!(row.procedural_cost_senate, "98.70");
        assert_eq!(row.procedural_cost_house, "0.00");
        assert_eq!(row.totalvotes, None);
        assert_eq!(row.central_cost, "33580.00");
    }

    #[test]
    fn writes_and_compares_reports() {
        let estimate = small_estimate();
        let out = temp_dir("out");
        let written = write_reports(&estimate, &out).unwrap();
        assert!(written.contains(&PathBuf::from(ALL_DATA)));
        assert!(written.contains(&Path::new(STATE_DIR).join("all_data_OH.csv")));
        assert!(written.contains(&Path::new(MARGIN_DIR).join("senate_margins.csv")));

        let all = fs::read_to_string(out.join(ALL_DATA)).unwrap();
        let mut lines = all.lines();
        assert!(lines
            .next()
            .unwrap()
            .starts_with("year,state,state_po,num_ballots_house"));
        assert_eq!(lines.count(), 2);

        let stats =
            fs::read_to_string(out.join(MARGIN_DIR).join("senate_sample_stats.csv")).unwrap();
        assert!(stats.starts_with("scope,count,mean,std,min,25%,50%,75%,max,total"));

        // A run compared with itself.
        assert_eq!(compare_with_reference(&out, &out, &written).unwrap(), 0);

        let reference = temp_dir("ref");
        write_reports(&estimate, &reference).unwrap();
        fs::write(reference.join(STATE_AVERAGES), "state\n").unwrap();
        fs::remove_file(reference.join(NATIONAL_WITH_PRESIDENT)).unwrap();
        assert_eq!(compare_with_reference(&out, &reference, &written).unwrap(), 2);

        let _ = fs::remove_dir_all(&out);
        let _ = fs::remove_dir_all(&reference);
    }
}
