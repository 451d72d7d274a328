// Reading the MIT Election Lab result files (CSV).

use std::collections::{BTreeMap, BTreeSet};
use std::io;

use csv::{Reader, StringRecord};

use crate::audit::{
    io_common::{parse_bool, parse_count, RowError, RowResult, RowSink},
    *,
};

/// Column positions, found by header name.
#[derive(Eq, PartialEq, Debug, Clone)]
struct MitColumns {
    year: usize,
    state: usize,
    state_po: Option<usize>,
    district: Option<usize>,
    stage: Option<usize>,
    special: Option<usize>,
    writein: Option<usize>,
    // `party_simplified` in the Senate and President files, `party` for the House.
    party: Option<usize>,
    candidate_votes: Option<usize>,
    total_votes: usize,
}

impl MitColumns {
    fn from_header(path: &str, header: &StringRecord) -> AuditResult<MitColumns> {
        let find = |name: &str| header.iter().position(|h| h.trim() == name);
        let require = |name: &str| -> AuditResult<usize> {
            match find(name) {
                Some(idx) => Ok(idx),
                None => whatever!("{}: missing column {:?}", path, name),
            }
        };
        Ok(MitColumns {
            year: require("year")?,
            state: require("state")?,
            state_po: find("state_po"),
            district: find("district"),
            stage: find("stage"),
            special: find("special"),
            writein: find("writein"),
            party: find("party_simplified").or_else(|| find("party")),
            candidate_votes: find("candidatevotes"),
            total_votes: require("totalvotes")?,
        })
    }
}

fn field<'a>(line: &'a StringRecord, idx: Option<usize>) -> Option<&'a str> {
    idx.and_then(|i| line.get(i)).map(|s| s.trim())
}

fn required<'a>(line: &'a StringRecord, idx: usize, name: &str) -> Result<&'a str, RowError> {
    line.get(idx)
        .map(|s| s.trim())
        .ok_or_else(|| RowError::Malformed(format!("line too short: no {}", name)))
}

/// The year, or None for the years before `first_year`.
fn read_year(line: &StringRecord, cols: &MitColumns, first_year: u32) -> Result<Option<u32>, RowError> {
    let s = required(line, cols.year, "year")?;
    let year = s
        .parse::<u32>()
        .map_err(|_| RowError::Malformed(format!("year: not a year: {:?}", s)))?;
    Ok(if year >= first_year { Some(year) } else { None })
}

/// Postal codes are preferred, the full names are the fallback.
fn read_state(line: &StringRecord, cols: &MitColumns, states: &StateTable) -> Result<StateKey, RowError> {
    let label = match field(line, cols.state_po) {
        Some(po) if !po.is_empty() => po,
        _ => required(line, cols.state, "state")?,
    };
    Ok(states.lookup(label)?)
}

fn is_general(line: &StringRecord, cols: &MitColumns) -> bool {
    match field(line, cols.stage) {
        Some(stage) => stage.eq_ignore_ascii_case("gen"),
        None => true,
    }
}

fn race_name(line: &StringRecord, cols: &MitColumns, contest: ContestType) -> String {
    match contest {
        ContestType::House => field(line, cols.district).unwrap_or("0").to_string(),
        ContestType::Senate => {
            if field(line, cols.special).map(parse_bool).unwrap_or(false) {
                "special".to_string()
            } else {
                "regular".to_string()
            }
        }
        ContestType::President => "statewide".to_string(),
    }
}

fn read_candidate_row(
    line: &StringRecord,
    cols: &MitColumns,
    contest: ContestType,
    first_year: u32,
    states: &StateTable,
) -> RowResult<CandidateVotes> {
    let year = match read_year(line, cols, first_year)? {
        Some(y) => y,
        None => return Ok(None),
    };
    if !is_general(line, cols) || field(line, cols.writein).map(parse_bool).unwrap_or(false) {
        return Ok(None);
    }
    let party = match field(line, cols.party).and_then(Party::from_simplified) {
        Some(p) if contest.margin_parties().contains(&p) => p,
        _ => return Ok(None),
    };
    let state = read_state(line, cols, states)?;
    let candidate_votes = match cols.candidate_votes {
        Some(idx) => parse_count("candidatevotes", required(line, idx, "candidatevotes")?)?,
        None => return Err(RowError::Malformed("no candidatevotes column".to_string())),
    };
    let total_votes = parse_count("totalvotes", required(line, cols.total_votes, "totalvotes")?)?;
    Ok(Some(CandidateVotes {
        year,
        state,
        race: race_name(line, cols, contest),
        party,
        candidate_votes,
        total_votes,
    }))
}

/// Parses the per-candidate rows of one contest type.
///
/// Write-ins, non-general stages, the parties outside of the margin formula and
/// the years before `first_year` are filtered out.
fn parse_candidate_votes<R: io::Read>(
    mut rdr: Reader<R>,
    path: &str,
    contest: ContestType,
    first_year: u32,
    states: &StateTable,
    strict: bool,
) -> AuditResult<Vec<CandidateVotes>> {
    let header = rdr.headers().context(CsvOpenSnafu { path })?.clone();
    let cols = MitColumns::from_header(path, &header)?;
    debug!("parse_candidate_votes: {} columns: {:?}", path, cols);
    let mut sink: RowSink<CandidateVotes> = RowSink::new(path, strict);
    for (idx, line_r) in rdr.records().enumerate() {
        let lineno = (idx + 2) as u64;
        let line = line_r.context(CsvLineParseSnafu { path, lineno })?;
        sink.push(lineno, read_candidate_row(&line, &cols, contest, first_year, states))?;
    }
    Ok(sink.finish())
}

pub fn read_candidate_votes(
    path: &str,
    contest: ContestType,
    first_year: u32,
    states: &StateTable,
    strict: bool,
) -> AuditResult<Vec<CandidateVotes>> {
    let rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    parse_candidate_votes(rdr, path, contest, first_year, states, strict)
}

type DistrictTotal = (u32, StateKey, String, u64);

fn read_district_total(
    line: &StringRecord,
    cols: &MitColumns,
    first_year: u32,
    states: &StateTable,
) -> RowResult<DistrictTotal> {
    let year = match read_year(line, cols, first_year)? {
        Some(y) => y,
        None => return Ok(None),
    };
    let state = read_state(line, cols, states)?;
    let district = field(line, cols.district).unwrap_or("").to_string();
    let total_votes = parse_count("totalvotes", required(line, cols.total_votes, "totalvotes")?)?;
    Ok(Some((year, state, district, total_votes)))
}

/// Total ballots cast per year and state in the House races.
///
/// Every candidate row repeats the district total: rows are deduplicated on
/// (year, state, district, total) before summing the districts.
fn parse_ballots_cast<R: io::Read>(
    mut rdr: Reader<R>,
    path: &str,
    first_year: u32,
    states: &StateTable,
    strict: bool,
) -> AuditResult<Vec<(u32, StateKey, u64)>> {
    let header = rdr.headers().context(CsvOpenSnafu { path })?.clone();
    let cols = MitColumns::from_header(path, &header)?;
    let mut sink: RowSink<DistrictTotal> = RowSink::new(path, strict);
    for (idx, line_r) in rdr.records().enumerate() {
        let lineno = (idx + 2) as u64;
        let line = line_r.context(CsvLineParseSnafu { path, lineno })?;
        sink.push(lineno, read_district_total(&line, &cols, first_year, states))?;
    }
    let unique: BTreeSet<DistrictTotal> = sink.finish().into_iter().collect();
    let mut totals: BTreeMap<(u32, StateKey), u64> = BTreeMap::new();
    for (year, state, _, total) in unique {
        let e = totals.entry((year, state)).or_insert(0);
        *e = e.saturating_add(total);
    }
    Ok(totals
        .into_iter()
        .map(|((year, state), total)| (year, state, total))
        .collect())
}

pub fn read_ballots_cast(
    path: &str,
    first_year: u32,
    states: &StateTable,
    strict: bool,
) -> AuditResult<Vec<(u32, StateKey, u64)>> {
    let rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    parse_ballots_cast(rdr, path, first_year, states, strict)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENATE: &str = "\
year,state,state_po,office,district,stage,special,candidate,party_detailed,writein,candidatevotes,totalvotes,party_simplified
2018,OHIO,OH,US SENATE,statewide,gen,FALSE,A,REPUBLICAN,FALSE,520,1000,REPUBLICAN
2018,OHIO,OH,US SENATE,statewide,gen,FALSE,B,DEMOCRAT,FALSE,440,1000,DEMOCRAT
2018,OHIO,OH,US SENATE,statewide,gen,FALSE,C,GREEN,FALSE,10,1000,OTHER
2018,OHIO,OH,US SENATE,statewide,gen,FALSE,D,,TRUE,5,1000,
2018,GEORGIA,GA,US SENATE,statewide,gen,TRUE,E,LIBERTARIAN,FALSE,30,900,LIBERTARIAN
2018,GEORGIA,GA,US SENATE,statewide,pri,FALSE,F,DEMOCRAT,FALSE,300,900,DEMOCRAT
1998,OHIO,OH,US SENATE,statewide,gen,FALSE,G,REPUBLICAN,FALSE,1,2,REPUBLICAN
";

    fn reader(s: &str) -> Reader<&[u8]> {
        csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(s.as_bytes())
    }

    #[test]
    fn senate_rows_are_filtered() {
        let states = StateTable::builtin();
        let rows =
            parse_candidate_votes(reader(SENATE), "s.csv", ContestType::Senate, 2000, &states, false)
                .unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].state.postal(), "OH");
        assert_eq!(rows[0].race, "regular");
        assert_eq!(rows[0].party, Party::Republican);
        assert_eq!(rows[1].candidate_votes, 440);
        assert_eq!(rows[2].race, "special");
        assert_eq!(rows[2].party, Party::Libertarian);
    }

    #[test]
    fn president_drops_libertarians() {
        let states = StateTable::builtin();
        let rows = parse_candidate_votes(
            reader(SENATE),
            "p.csv",
            ContestType::President,
            2000,
            &states,
            false,
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.race == "statewide"));
    }

    #[test]
    fn malformed_counts() {
        let states = StateTable::builtin();
        let data = "\
year,state,state_po,writein,candidatevotes,totalvotes,party_simplified
2020,OHIO,OH,FALSE,many,1000,REPUBLICAN
2020,OHIO,OH,FALSE,475,1000,DEMOCRAT
";
        let rows =
            parse_candidate_votes(reader(data), "p.csv", ContestType::President, 2000, &states, false)
                .unwrap();
        assert_eq!(rows.len(), 1);
        let res =
            parse_candidate_votes(reader(data), "p.csv", ContestType::President, 2000, &states, true);
        assert!(matches!(res, Err(AuditError::MalformedRow { lineno: 2, .. })));
    }

    #[test]
    fn unknown_state_is_fatal() {
        let states = StateTable::builtin();
        let data = "\
year,state,state_po,candidatevotes,totalvotes,party_simplified
2020,ATLANTIS,,10,20,DEMOCRAT
";
        let res =
            parse_candidate_votes(reader(data), "p.csv", ContestType::President, 2000, &states, false);
        assert!(matches!(res, Err(AuditError::Pipeline { .. })));
    }

    #[test]
    fn missing_column() {
        let states = StateTable::builtin();
        let data = "year,state\n2020,OHIO\n";
        assert!(
            parse_candidate_votes(reader(data), "p.csv", ContestType::Senate, 2000, &states, false)
                .is_err()
        );
    }

    #[test]
    fn house_totals_are_deduplicated() {
        let states = StateTable::builtin();
        let data = "\
year,state,state_po,district,stage,candidate,party,candidatevotes,totalvotes
2018,OHIO,OH,1,GEN,A,REPUBLICAN,60,100
2018,OHIO,OH,1,GEN,B,DEMOCRAT,40,100
2018,OHIO,OH,2,GEN,C,REPUBLICAN,150,200
2018,GEORGIA,GA,1,GEN,D,DEMOCRAT,50,50
2020,OHIO,OH,1,GEN,E,DEMOCRAT,70,70
1998,OHIO,OH,1,GEN,F,DEMOCRAT,70,70
";
        let totals = parse_ballots_cast(reader(data), "h.csv", 2000, &states, false).unwrap();
        let flat: Vec<(u32, &str, u64)> = totals
            .iter()
            .map(|(y, s, t)| (*y, s.postal(), *t))
            .collect();
        assert_eq!(flat, vec![(2018, "GA", 50), (2018, "OH", 300), (2020, "OH", 70)]);
    }
}
