use std::fs;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::enrich::{Buckets, Enrichment, Entry};

pub const OUTPUT_FILE: &str = "non_us_nba_players_by_country_current.json";

const DEFINITION: &str =
    "Non-US NBA players (born outside the United States) grouped by birth country with current NBA team.";
const SOURCE: &str =
    "NBA official stats service (stats.nba.com commonallplayers + commonplayerinfo)";

/// Countries in output order, serialized as a JSON object.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Countries(pub Vec<(String, Vec<Entry>)>);

impl Serialize for Countries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (country, entries) in &self.0 {
            map.serialize_entry(country, entries)?;
        }
        map.end()
    }
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub last_generated_utc: String,
    pub definition: String,
    pub source: String,
    pub total_countries: usize,
    pub total_players: usize,
    pub note: String,
    pub countries: Countries,
}

/// Countries case-insensitively, players by name. Both sorts are stable.
pub fn sort_buckets(mut buckets: Buckets) -> Countries {
    buckets.sort_by_cached_key(|(country, _)| country.to_lowercase());
    for (_, entries) in &mut buckets {
        entries.sort_by(|a, b| a.player.cmp(&b.player));
    }
    Countries(buckets)
}

pub fn build_report(enrichment: Enrichment, now: DateTime<Utc>) -> Report {
    let countries = sort_buckets(enrichment.buckets);
    let total_players = countries.0.iter().map(|(_, entries)| entries.len()).sum();

    Report {
        last_generated_utc: now.to_rfc3339_opts(SecondsFormat::Secs, false),
        definition: DEFINITION.to_string(),
        source: SOURCE.to_string(),
        total_countries: countries.0.len(),
        total_players,
        note: format!(
            "Excluded {} US-born players using country field from CommonPlayerInfo.",
            enrichment.domestic_excluded
        ),
        countries,
    }
}

/// Pretty JSON, non-ASCII kept as-is. Replaces any existing file.
pub fn write_report(path: &Path, report: &Report) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)?;
    Ok(())
}
