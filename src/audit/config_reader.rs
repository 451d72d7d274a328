use crate::audit::*;

use serde::{Deserialize, Serialize};

/// Default layout of a data directory, relative to its root.
const DEFAULT_HOUSE_CHART: &str = "house/house_election_chart.xlsx";
const DEFAULT_HOUSE_RESULTS: &str = "house/dataverse_files/1976-2022-house.csv";
const DEFAULT_SENATE_RESULTS: &str = "senate/dataverse_files/1976-2020-senate.csv";
const DEFAULT_PRESIDENT_RESULTS: &str = "presidential/dataverse_files/1976-2020-president.csv";
const DEFAULT_PRESIDENT_2024: &str = "presidential/dataverse_files/2024_US_President.txt";
const DEFAULT_STATE_ABBREVIATIONS: &str = "presidential/dataverse_files/state_abbr.tsv";

const DEFAULT_FIRST_YEAR: u32 = 2000;
const DEFAULT_OUTPUT_DIRECTORY: &str = "output";

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputFiles {
    #[serde(rename = "houseChart")]
    pub house_chart: Option<String>,
    #[serde(rename = "houseResults")]
    pub house_results: Option<String>,
    #[serde(rename = "senateResults")]
    pub senate_results: Option<String>,
    #[serde(rename = "presidentResults")]
    pub president_results: Option<String>,
    #[serde(rename = "president2024")]
    pub president_2024: Option<String>,
    #[serde(rename = "stateAbbreviations")]
    pub state_abbreviations: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostSettings {
    #[serde(rename = "riskLimitConstant")]
    pub risk_limit_constant: Option<f64>,
    #[serde(rename = "perBallotMinutes")]
    pub per_ballot_minutes: Option<f64>,
    #[serde(rename = "perMinuteWage")]
    pub per_minute_wage: Option<f64>,
    #[serde(rename = "clerkHourlyWage")]
    pub clerk_hourly_wage: Option<f64>,
    #[serde(rename = "prepHoursPerCounty")]
    pub prep_hours_per_county: Option<f64>,
    #[serde(rename = "hoursToIndexPer500Ballots")]
    pub hours_to_index_per_500_ballots: Option<f64>,
    #[serde(rename = "centralCost")]
    pub central_cost: Option<f64>,
    #[serde(rename = "houseModel")]
    pub house_model: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "firstYear")]
    pub first_year: Option<u32>,
    #[serde(default)]
    pub inputs: InputFiles,
    #[serde(rename = "costModel", default)]
    pub cost_model: CostSettings,
}

/// Input files, resolved to actual paths.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ResolvedInputs {
    pub house_chart: Option<PathBuf>,
    pub house_results: Option<PathBuf>,
    pub senate_results: Option<PathBuf>,
    pub president_results: Option<PathBuf>,
    pub president_2024: Option<PathBuf>,
    pub state_abbreviations: Option<PathBuf>,
}

impl ResolvedInputs {
    fn has_contest_source(&self) -> bool {
        self.house_chart.is_some()
            || self.senate_results.is_some()
            || self.president_results.is_some()
            || self.president_2024.is_some()
    }
}

/// Everything a run needs, after merging the configuration file, the data
/// directory and the command line.
#[derive(PartialEq, Debug, Clone)]
pub struct AuditSettings {
    pub inputs: ResolvedInputs,
    pub model: CostModel,
    pub first_year: u32,
    pub output_directory: PathBuf,
    pub strict: bool,
}

pub fn read_config(path: &str) -> AuditResult<AuditConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    debug!("read_config: {:?}", contents);
    serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })
}

pub fn parse_house_model(s: &str) -> AuditResult<HouseCostModel> {
    match s {
        "chartSample" => Ok(HouseCostModel::ChartSample),
        "ballotsCast" => Ok(HouseCostModel::BallotsCast),
        x => whatever!(
            "Cannot use house model {:?}: expected chartSample or ballotsCast",
            x
        ),
    }
}

/// Fills the cost model with the configured values, defaults otherwise.
pub fn validate_cost_model(settings: &CostSettings) -> AuditResult<CostModel> {
    let d = CostModel::DEFAULT;
    let model = CostModel {
        risk_limit_constant: settings.risk_limit_constant.unwrap_or(d.risk_limit_constant),
        per_ballot_minutes: settings.per_ballot_minutes.unwrap_or(d.per_ballot_minutes),
        per_minute_wage: settings.per_minute_wage.unwrap_or(d.per_minute_wage),
        clerk_hourly_wage: settings.clerk_hourly_wage.unwrap_or(d.clerk_hourly_wage),
        prep_hours_per_county: settings
            .prep_hours_per_county
            .unwrap_or(d.prep_hours_per_county),
        hours_to_index_per_500_ballots: settings
            .hours_to_index_per_500_ballots
            .unwrap_or(d.hours_to_index_per_500_ballots),
        central_cost: settings.central_cost.unwrap_or(d.central_cost),
        house_model: match &settings.house_model {
            Some(s) => parse_house_model(s)?,
            None => d.house_model,
        },
    };
    model.validate().context(PipelineSnafu {})?;
    Ok(model)
}

fn resolve(root: &Path, p: &Option<String>) -> Option<PathBuf> {
    p.as_ref().map(|s| root.join(s))
}

// Only the files actually present in a data directory are picked up.
fn from_data_dir(root: &Path, lpath: &str) -> Option<PathBuf> {
    let p = root.join(lpath);
    if p.is_file() {
        Some(p)
    } else {
        debug!("from_data_dir: no file at {:?}", p);
        None
    }
}

/// Merges the configuration file, the data directory and the command line
/// arguments. The configuration file wins over the data directory, the command
/// line wins over both.
pub fn resolve_settings(args: &Args) -> AuditResult<AuditSettings> {
    let (config, config_root) = match &args.config {
        Some(path) => {
            let config = read_config(path)?;
            let root = Path::new(path)
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_default();
            (config, root)
        }
        None => (AuditConfig::default(), PathBuf::new()),
    };

    let mut inputs = ResolvedInputs {
        house_chart: resolve(&config_root, &config.inputs.house_chart),
        house_results: resolve(&config_root, &config.inputs.house_results),
        senate_results: resolve(&config_root, &config.inputs.senate_results),
        president_results: resolve(&config_root, &config.inputs.president_results),
        president_2024: resolve(&config_root, &config.inputs.president_2024),
        state_abbreviations: resolve(&config_root, &config.inputs.state_abbreviations),
    };

    if let Some(dir) = &args.data_dir {
        let root = Path::new(dir);
        inputs.house_chart = inputs
            .house_chart
            .or_else(|| from_data_dir(root, DEFAULT_HOUSE_CHART));
        inputs.house_results = inputs
            .house_results
            .or_else(|| from_data_dir(root, DEFAULT_HOUSE_RESULTS));
        inputs.senate_results = inputs
            .senate_results
            .or_else(|| from_data_dir(root, DEFAULT_SENATE_RESULTS));
        inputs.president_results = inputs
            .president_results
            .or_else(|| from_data_dir(root, DEFAULT_PRESIDENT_RESULTS));
        inputs.president_2024 = inputs
            .president_2024
            .or_else(|| from_data_dir(root, DEFAULT_PRESIDENT_2024));
        inputs.state_abbreviations = inputs
            .state_abbreviations
            .or_else(|| from_data_dir(root, DEFAULT_STATE_ABBREVIATIONS));
    }

    if !inputs.has_contest_source() {
        whatever!("No input file found: use --config or --data-dir");
    }

    let mut cost_settings = config.cost_model.clone();
    if let Some(m) = &args.house_model {
        cost_settings.house_model = Some(m.clone());
    }
    if let Some(x) = args.per_ballot_minutes {
        cost_settings.per_ballot_minutes = Some(x);
    }
    let model = validate_cost_model(&cost_settings)?;

    let output_directory = match (&args.out, &config.output_directory) {
        (Some(out), _) => PathBuf::from(out),
        (None, Some(out)) => config_root.join(out),
        (None, None) => PathBuf::from(DEFAULT_OUTPUT_DIRECTORY),
    };

    Ok(AuditSettings {
        inputs,
        model,
        first_year: config.first_year.unwrap_or(DEFAULT_FIRST_YEAR),
        output_directory,
        strict: args.strict,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_config() {
        let js = r#"{
            "outputDirectory": "reports",
            "firstYear": 2004,
            "inputs": {
                "houseChart": "house/chart.xlsx",
                "senateResults": "senate.csv"
            },
            "costModel": {
                "perBallotMinutes": 1.5,
                "houseModel": "ballotsCast"
            }
        }"#;
        let config: AuditConfig = serde_json::from_str(js).unwrap();
        assert_eq!(config.first_year, Some(2004));
        assert_eq!(config.inputs.house_chart.as_deref(), Some("house/chart.xlsx"));
        assert_eq!(config.inputs.president_2024, None);
        let model = validate_cost_model(&config.cost_model).unwrap();
        assert_eq!(model.per_ballot_minutes, 1.5);
        assert_eq!(model.per_minute_wage, 0.35);
        assert_eq!(model.house_model, HouseCostModel::BallotsCast);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: AuditConfig = serde_json::from_str("{}").unwrap();
        let model = validate_cost_model(&config.cost_model).unwrap();
        assert_eq!(model, CostModel::DEFAULT);
    }

    #[test]
    fn rejects_unknown_house_model() {
        let settings = CostSettings {
            house_model: Some("perDistrict".to_string()),
            ..CostSettings::default()
        };
        assert!(validate_cost_model(&settings).is_err());
    }

    #[test]
    fn rejects_negative_wage() {
        let settings = CostSettings {
            per_minute_wage: Some(-0.35),
            ..CostSettings::default()
        };
        assert!(matches!(
            validate_cost_model(&settings),
            Err(AuditError::Pipeline { .. })
        ));
    }
}
