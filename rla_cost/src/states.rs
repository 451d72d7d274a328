//! Lookup of U.S. states by name, AP-style abbreviation or postal code.

use log::debug;
use std::collections::{HashMap, HashSet};

use crate::config::*;

/// Name, AP-style ("Standard") abbreviation, postal code and number of
/// counties (or county equivalents) of every state and D.C.
const BUILTIN_STATES: [(&str, &str, &str, u32); 51] = [
    ("Alabama", "Ala.", "AL", 67),
    ("Alaska", "Alaska", "AK", 30),
    ("Arizona", "Ariz.", "AZ", 15),
    ("Arkansas", "Ark.", "AR", 75),
    ("California", "Calif.", "CA", 58),
    ("Colorado", "Colo.", "CO", 64),
    ("Connecticut", "Conn.", "CT", 8),
    ("Delaware", "Del.", "DE", 3),
    ("District of Columbia", "D.C.", "DC", 1),
    ("Florida", "Fla.", "FL", 67),
    ("Georgia", "Ga.", "GA", 159),
    ("Hawaii", "Hawaii", "HI", 5),
    ("Idaho", "Idaho", "ID", 44),
    ("Illinois", "Ill.", "IL", 102),
    ("Indiana", "Ind.", "IN", 92),
    ("Iowa", "Iowa", "IA", 99),
    ("Kansas", "Kan.", "KS", 105),
    ("Kentucky", "Ky.", "KY", 120),
    ("Louisiana", "La.", "LA", 64),
    ("Maine", "Maine", "ME", 16),
    ("Maryland", "Md.", "MD", 24),
    ("Massachusetts", "Mass.", "MA", 14),
    ("Michigan", "Mich.", "MI", 83),
    ("Minnesota", "Minn.", "MN", 87),
    ("Mississippi", "Miss.", "MS", 82),
    ("Missouri", "Mo.", "MO", 115),
    ("Montana", "Mont.", "MT", 56),
    ("Nebraska", "Neb.", "NE", 93),
    ("Nevada", "Nev.", "NV", 17),
    ("New Hampshire", "N.H.", "NH", 10),
    ("New Jersey", "N.J.", "NJ", 21),
    ("New Mexico", "N.M.", "NM", 33),
    ("New York", "N.Y.", "NY", 62),
    ("North Carolina", "N.C.", "NC", 100),
    ("North Dakota", "N.D.", "ND", 53),
    ("Ohio", "Ohio", "OH", 88),
    ("Oklahoma", "Okla.", "OK", 77),
    ("Oregon", "Ore.", "OR", 36),
    ("Pennsylvania", "Pa.", "PA", 67),
    ("Rhode Island", "R.I.", "RI", 5),
    ("South Carolina", "S.C.", "SC", 46),
    ("South Dakota", "S.D.", "SD", 66),
    ("Tennessee", "Tenn.", "TN", 95),
    ("Texas", "Texas", "TX", 254),
    ("Utah", "Utah", "UT", 29),
    ("Vermont", "Vt.", "VT", 14),
    ("Virginia", "Va.", "VA", 133),
    ("Washington", "Wash.", "WA", 39),
    ("West Virginia", "W.Va.", "WV", 55),
    ("Wisconsin", "Wis.", "WI", 72),
    ("Wyoming", "Wyo.", "WY", 23),
];

#[derive(Eq, PartialEq, Debug, Clone)]
struct StateEntry {
    key: StateKey,
    standard: String,
    counties: u32,
}

/// The table of known states.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct StateTable {
    entries: Vec<StateEntry>,
    // Upper-cased name, standard abbreviation and postal code -> entry index.
    by_label: HashMap<String, usize>,
}

fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<&str>>().join(" ").to_uppercase()
}

impl StateTable {
    pub fn builtin() -> StateTable {
        let rows: Vec<(String, String, String)> = BUILTIN_STATES
            .iter()
            .map(|(n, s, p, _)| (n.to_string(), s.to_string(), p.to_string()))
            .collect();
        // The built-in rows are consistent with themselves.
        StateTable::from_rows(&rows).unwrap_or_else(|e| panic!("builtin state table: {}", e))
    }

    /// Builds a table from (name, standard abbreviation, postal code) rows.
    ///
    /// County counts are not part of the rows: they come from the built-in
    /// table, so every postal code must be a known one.
    pub fn from_rows(rows: &[(String, String, String)]) -> Result<StateTable, AuditErrors> {
        let counties: HashMap<&str, u32> = BUILTIN_STATES
            .iter()
            .map(|(_, _, postal, c)| (*postal, *c))
            .collect();
        let mut entries: Vec<StateEntry> = Vec::new();
        let mut by_label: HashMap<String, usize> = HashMap::new();
        let mut seen_postal: HashSet<String> = HashSet::new();
        for (name, standard, postal) in rows.iter() {
            let postal = normalize(postal);
            let num_counties = *counties.get(postal.as_str()).ok_or_else(|| {
                AuditErrors::InvalidStateTable(format!("unknown postal code {:?}", postal))
            })?;
            if !seen_postal.insert(postal.clone()) {
                return Err(AuditErrors::InvalidStateTable(format!(
                    "duplicate postal code {:?}",
                    postal
                )));
            }
            let idx = entries.len();
            let key = StateKey {
                postal: postal.clone(),
                name: normalize(name),
            };
            for label in [key.name.clone(), normalize(standard), postal.clone()] {
                if let Some(other) = by_label.insert(label.clone(), idx) {
                    if other != idx {
                        return Err(AuditErrors::InvalidStateTable(format!(
                            "ambiguous label {:?}",
                            label
                        )));
                    }
                }
            }
            entries.push(StateEntry {
                key,
                standard: standard.trim().to_string(),
                counties: num_counties,
            });
        }
        debug!("StateTable::from_rows: {} states", entries.len());
        Ok(StateTable { entries, by_label })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finds a state by full name, AP-style abbreviation or postal code,
    /// ignoring case and extra whitespace.
    pub fn lookup(&self, label: &str) -> Result<StateKey, AuditErrors> {
        self.by_label
            .get(&normalize(label))
            .map(|idx| self.entries[*idx].key.clone())
            .ok_or_else(|| AuditErrors::UnknownState(label.to_string()))
    }

    /// Splits a label such as `New York 12` into the state and the rest.
    ///
    /// The longest matching state label wins, so `West Virginia 2` is not read
    /// as Virginia.
    pub fn lookup_prefix(&self, label: &str) -> Result<(StateKey, String), AuditErrors> {
        let norm = normalize(label);
        let words: Vec<&str> = norm.split(' ').collect();
        for n in (1..=words.len()).rev() {
            let candidate = words[..n].join(" ");
            if let Some(idx) = self.by_label.get(&candidate) {
                let rest = label
                    .split_whitespace()
                    .skip(n)
                    .collect::<Vec<&str>>()
                    .join(" ");
                return Ok((self.entries[*idx].key.clone(), rest));
            }
        }
        Err(AuditErrors::UnknownState(label.to_string()))
    }

    /// Number of counties, used by the preparation cost.
    pub fn counties(&self, state: &StateKey) -> Result<u32, AuditErrors> {
        self.entries
            .iter()
            .find(|e| e.key == *state)
            .map(|e| e.counties)
            .ok_or_else(|| AuditErrors::UnknownState(state.name.clone()))
    }

    /// The AP-style abbreviation of a state.
    pub fn standard(&self, state: &StateKey) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == *state)
            .map(|e| e.standard.as_str())
    }
}

impl Default for StateTable {
    fn default() -> Self {
        StateTable::builtin()
    }
}
