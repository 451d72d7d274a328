/*!

This is the long-form manual for `rla_cost` and `rlacost`.

## Cost model

Every audited (year, state) costs the sum of:

* the **procedural cost** of each contest held that year:
  `ballots * per_ballot_minutes * per_minute_wage` (defaults: 2 minutes per
  ballot, 0.35 USD per minute);
* the **preparation cost**: `8 * clerk_hourly_wage * counties` plus
  `(ballots_cast / 500) * hours_to_index_per_500_ballots` (defaults: 21.23 USD
  per hour, 2 hours);
* the **central cost**: a flat 33580 USD.

A variant of the total leaves out the presidential contest.

## Sample sizes

For the Senate and the presidency, the number of ballots to audit comes from the
margin of the race: `ceil(7 / margin) + 1`, where 7 corresponds to a 5% risk
limit. The margin uses vote shares:

* President: `|R - D|`
* Senate: `|R - D - L|`

A margin of exactly zero cannot be confirmed by sampling: the race is counted by
hand in full. The number of ballots is then the total votes of the race or, when
unknown, the ballots cast in the state that year (or in the latest earlier year
with a total). When no count is known at all, the race keeps the full hand count
marker in the margin reports, is not costed and is left out of the sample
statistics. The run goes on.

The House is not sized from margins. Two models are available:

* `chartSample` (default): the House chart gives, for each district, the number
  of ballots needed to confirm a 7-vote margin. Districts are summed per state.
* `ballotsCast`: every House ballot cast in the state is audited.

## Joining the contests

The three contests are joined on (year, state). A contest that did not take
place (no Senate seat up, a midterm year for the presidency) contributes zero.
National totals sum the states of each year: the report with the presidency only
keeps presidential years, the report without it covers all the years. State
averages are taken over the years a state appears in.

Amounts keep full precision and are rounded to cents only when written out.

## Input formats

* `houseChart`: Excel workbook, one worksheet per even year (`2022`, `2020`,
  ..., `2000`). Columns: `State and District`, `Winner (Percentage of Votes)`,
  `1st Runner-Up (Percentage of Votes)`, then the number of ballots to audit.
* `houseResults`, `senateResults`, `presidentResults`: the MIT Election Data and
  Science Lab CSV files (Harvard Dataverse). The House file provides the total
  ballots cast per (year, state).
* `president2024`: text export of the NPR 2024 results page. Five title lines,
  then five lines per state: AP-style state name, electoral votes, Harris %,
  Trump %, percentage of the count reported. `Flip` markers are ignored.
* `stateAbbreviations` (optional): tab-separated `State`, `Standard`, `Postal`.

*/
