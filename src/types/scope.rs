//! Time windows a comparison side is evaluated over.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// A championship year.
pub type Season = u16;

pub const FIRST_SEASON: Season = 1950;
pub const LAST_SEASON: Season = 2100;

/// Career totals, or a non-empty set of seasons to be summed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "years", rename_all = "lowercase")]
pub enum StatScope {
    #[default]
    Career,
    Years(BTreeSet<Season>),
}

impl StatScope {
    /// Returns `None` when no seasons are given.
    pub fn years<I: IntoIterator<Item = Season>>(years: I) -> Option<Self> {
        let set: BTreeSet<Season> = years.into_iter().collect();
        if set.is_empty() {
            None
        } else {
            Some(StatScope::Years(set))
        }
    }

    pub fn season(year: Season) -> Self {
        StatScope::Years(BTreeSet::from([year]))
    }

    /// The backend queries needed to materialize this scope, ascending.
    pub fn queries(&self) -> Vec<StatQuery> {
        match self {
            StatScope::Career => vec![StatQuery::Career],
            StatScope::Years(years) => years.iter().copied().map(StatQuery::Season).collect(),
        }
    }

    pub fn is_multi_season(&self) -> bool {
        matches!(self, StatScope::Years(years) if years.len() > 1)
    }
}

impl fmt::Display for StatScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatScope::Career => f.write_str("career"),
            StatScope::Years(years) => {
                // Collapse consecutive seasons into ranges: 2019,2021-2023
                let mut parts: Vec<String> = Vec::new();
                let mut iter = years.iter().copied().peekable();
                while let Some(start) = iter.next() {
                    let mut end = start;
                    while let Some(&next) = iter.peek() {
                        if next == end + 1 {
                            end = next;
                            iter.next();
                        } else {
                            break;
                        }
                    }
                    if start == end {
                        parts.push(start.to_string());
                    } else {
                        parts.push(format!("{start}-{end}"));
                    }
                }
                f.write_str(&parts.join(","))
            }
        }
    }
}

impl FromStr for StatScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("career") {
            return Ok(StatScope::Career);
        }

        let mut years = BTreeSet::new();
        for part in trimmed.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.split_once('-') {
                Some((from, to)) => {
                    let from = parse_season(from)?;
                    let to = parse_season(to)?;
                    if from > to {
                        return Err(format!("invalid season range '{part}': start after end"));
                    }
                    years.extend(from..=to);
                }
                None => {
                    years.insert(parse_season(part)?);
                }
            }
        }

        StatScope::years(years).ok_or_else(|| {
            format!("invalid scope '{s}': expected 'career' or at least one season (e.g. 2021,2023-2024)")
        })
    }
}

fn parse_season(raw: &str) -> Result<Season, String> {
    let year: Season = raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid season '{}'", raw.trim()))?;
    if !(FIRST_SEASON..=LAST_SEASON).contains(&year) {
        return Err(format!(
            "season {year} out of range ({FIRST_SEASON}-{LAST_SEASON})"
        ));
    }
    Ok(year)
}

/// One backend request's worth of statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "type", content = "year", rename_all = "lowercase")]
pub enum StatQuery {
    Career,
    Season(Season),
}

impl fmt::Display for StatQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatQuery::Career => f.write_str("career"),
            StatQuery::Season(year) => write!(f, "{year}"),
        }
    }
}
