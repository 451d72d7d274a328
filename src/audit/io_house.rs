// Reading the House election chart (Excel).

use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::audit::{
    io_common::{parse_percentage, RowError, RowResult, RowSink},
    *,
};

const STATE_AND_DISTRICT: &str = "State and District";
const WINNER_PCT: &str = "Winner (Percentage of Votes)";
const RUNNER_UP_PCT: &str = "1st Runner-Up (Percentage of Votes)";

/// Column positions of one worksheet.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
struct ChartColumns {
    state_and_district: usize,
    winner_pct: usize,
    runner_up_pct: usize,
    // The ballot column has no header.
    ballots: usize,
}

impl ChartColumns {
    const DEFAULT: ChartColumns = ChartColumns {
        state_and_district: 0,
        winner_pct: 1,
        runner_up_pct: 2,
        ballots: 3,
    };

    /// Locates the named columns in the header row. Older worksheets repeat
    /// the layout of the newest one without headers: positions are kept then.
    fn from_header(header: &[DataType]) -> ChartColumns {
        let find = |name: &str, default: usize| -> usize {
            header
                .iter()
                .position(|c| matches!(c, DataType::String(s) if s.trim() == name))
                .unwrap_or(default)
        };
        let d = ChartColumns::DEFAULT;
        ChartColumns {
            state_and_district: find(STATE_AND_DISTRICT, d.state_and_district),
            winner_pct: find(WINNER_PCT, d.winner_pct),
            runner_up_pct: find(RUNNER_UP_PCT, d.runner_up_pct),
            ballots: d.ballots,
        }
    }
}

/// Reads every worksheet named after a year, from `first_year` on.
pub fn read_house_chart(
    path: &str,
    first_year: u32,
    states: &StateTable,
    strict: bool,
) -> AuditResult<Vec<HouseDistrictRecord>> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let mut sheets: Vec<(u32, String)> = workbook
        .sheet_names()
        .iter()
        .filter_map(|s| match s.trim().parse::<u32>() {
            Ok(year) => Some((year, s.clone())),
            Err(_) => {
                debug!("read_house_chart: skipping worksheet {:?}", s);
                None
            }
        })
        .filter(|(year, _)| *year >= first_year)
        .collect();
    // Newest first, like the workbook.
    sheets.sort_by(|a, b| b.0.cmp(&a.0));

    let mut sink: RowSink<HouseDistrictRecord> = RowSink::new(path, strict);
    for (year, sheet) in sheets.iter() {
        let wrange = workbook
            .worksheet_range(sheet)
            .context(MissingWorksheetSnafu {
                path,
                sheet: sheet.clone(),
            })?
            .context(ReadingWorksheetSnafu {
                path,
                sheet: sheet.clone(),
            })?;
        let mut rows = wrange.rows();
        let cols = match rows.next() {
            Some(header) => ChartColumns::from_header(header),
            None => {
                warn!("read_house_chart: {}: empty worksheet {}", path, sheet);
                continue;
            }
        };
        debug!("read_house_chart: {} columns: {:?}", sheet, cols);
        for (idx, row) in rows.enumerate() {
            // Excel rows start at 1, plus the header.
            let lineno = (idx + 2) as u64;
            sink.push(lineno, read_district_row(row, &cols, *year, states))?;
        }
    }
    Ok(sink.finish())
}

fn cell_text(cell: Option<&DataType>) -> Option<String> {
    match cell {
        Some(DataType::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// A vote share in percent. Blank cells are unopposed races (0).
fn read_share(name: &str, cell: Option<&DataType>) -> Result<f64, RowError> {
    match cell {
        None | Some(DataType::Empty) => Ok(0.0),
        // Cells formatted as percentages hold fractions.
        Some(DataType::Float(f)) if (0.0..=1.0).contains(f) => Ok(f * 100.0),
        Some(DataType::Float(f)) if (0.0..=100.0).contains(f) => Ok(*f),
        Some(DataType::Int(i)) if (0..=100).contains(i) => Ok(*i as f64),
        Some(DataType::String(s)) if s.trim().is_empty() => Ok(0.0),
        Some(DataType::String(s)) => parse_percentage(name, s),
        Some(c) => Err(RowError::Malformed(format!(
            "{}: unexpected cell {:?}",
            name, c
        ))),
    }
}

/// The number of ballots to audit, rounded up. Blank cells count 0.
fn read_ballots(cell: Option<&DataType>) -> Result<u64, RowError> {
    let malformed = |c: &DataType| RowError::Malformed(format!("ballots: unexpected cell {:?}", c));
    match cell {
        None | Some(DataType::Empty) => Ok(0),
        Some(DataType::Int(i)) if *i >= 0 => Ok(*i as u64),
        Some(DataType::Float(f)) if f.is_finite() && *f >= 0.0 => Ok(f.ceil() as u64),
        Some(DataType::String(s)) if s.trim().is_empty() => Ok(0),
        Some(c @ DataType::String(s)) => match s.trim().replace(',', "").parse::<f64>() {
            Ok(f) if f.is_finite() && f >= 0.0 => Ok(f.ceil() as u64),
            _ => Err(malformed(c)),
        },
        Some(c) => Err(malformed(c)),
    }
}

fn read_district_row(
    row: &[DataType],
    cols: &ChartColumns,
    year: u32,
    states: &StateTable,
) -> RowResult<HouseDistrictRecord> {
    let label = match cell_text(row.get(cols.state_and_district)) {
        Some(l) => l,
        // Blank lines and notes at the bottom of the sheets.
        None => return Ok(None),
    };
    let (state, district) = states.lookup_prefix(&label)?;
    let winner_pct = read_share(WINNER_PCT, row.get(cols.winner_pct))?;
    let runner_up_pct = read_share(RUNNER_UP_PCT, row.get(cols.runner_up_pct))?;
    let ballots_to_audit = read_ballots(row.get(cols.ballots))?;
    Ok(Some(HouseDistrictRecord {
        year,
        state,
        district: if district.is_empty() {
            "At-large".to_string()
        } else {
            district
        },
        winner_pct,
        runner_up_pct,
        ballots_to_audit,
    }))
}
