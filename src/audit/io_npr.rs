// Reading the 2024 presidential results (NPR text export).

use std::collections::BTreeSet;

use rla_cost::margins::margin_from_percentages;

use crate::audit::{io_common::parse_percentage, *};

const NPR_YEAR: u32 = 2024;
const TITLE_LINES: usize = 5;
const LINES_PER_RECORD: usize = 5;
const FLIP_MARKER: &str = "Flip";
const NUM_STATES: usize = 51;

pub fn read_npr_president(path: &str, states: &StateTable) -> AuditResult<Vec<ContestMargin>> {
    let text = fs::read_to_string(path).context(OpeningTextSnafu { path })?;
    parse_npr_president(&text, path, states)
}

fn layout_error<T>(path: &str, message: String) -> AuditResult<T> {
    NprLayoutSnafu { path, message }.fail()
}

/// Parses the text export: title lines, then one record of five lines per
/// state (name, electoral votes, Harris %, Trump %, percent reporting).
///
/// `Flip` markers and blank lines are ignored. The congressional district
/// records of Maine and Nebraska are skipped.
pub fn parse_npr_president(
    text: &str,
    path: &str,
    states: &StateTable,
) -> AuditResult<Vec<ContestMargin>> {
    let lines: Vec<&str> = text
        .lines()
        .skip(TITLE_LINES)
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && *l != FLIP_MARKER)
        .collect();
    if lines.len() % LINES_PER_RECORD != 0 {
        return layout_error(
            path,
            format!(
                "{} data lines, expected a multiple of {}",
                lines.len(),
                LINES_PER_RECORD
            ),
        );
    }

    let mut res: Vec<ContestMargin> = Vec::new();
    let mut seen: BTreeSet<StateKey> = BTreeSet::new();
    for (idx, record) in lines.chunks(LINES_PER_RECORD).enumerate() {
        debug!("parse_npr_president: record {}: {:?}", idx, record);
        let name = record[0];
        if record[1].parse::<u32>().is_err() {
            return layout_error(
                path,
                format!("record {} ({}): electoral votes {:?}", idx, name, record[1]),
            );
        }
        let harris = match parse_percentage("harris", record[2]) {
            Ok(x) => x,
            Err(_) => {
                return layout_error(path, format!("record {} ({}): {:?}", idx, name, record[2]))
            }
        };
        let trump = match parse_percentage("trump", record[3]) {
            Ok(x) => x,
            Err(_) => {
                return layout_error(path, format!("record {} ({}): {:?}", idx, name, record[3]))
            }
        };

        let state = match states.lookup(name) {
            Ok(s) => s,
            Err(_) => {
                let (state, district) = states
                    .lookup_prefix(name)
                    .context(InvalidDataSnafu { path })?;
                if district.is_empty() {
                    state
                } else {
                    debug!("parse_npr_president: skipping district record {:?}", name);
                    continue;
                }
            }
        };
        if !seen.insert(state.clone()) {
            return layout_error(path, format!("duplicate record for {}", name));
        }
        res.push(ContestMargin {
            year: NPR_YEAR,
            state,
            contest: ContestType::President,
            race: "statewide".to_string(),
            margin: margin_from_percentages(harris, trump),
            party_votes: Vec::new(),
            total_votes: None,
        });
    }
    if res.len() != NUM_STATES {
        warn!(
            "{}: found {} statewide records, expected {}",
            path,
            res.len(),
            NUM_STATES
        );
    }
    Ok(res)
}
