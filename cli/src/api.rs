//! Thin client for the NBA stats service.
//!
//! Every endpoint answers with `{"resultSets": [{"name", "headers", "rowSet"}]}`.
//! [`normalize_result_sets`] turns that into `name -> [{header: value}]`, which is
//! the only shape the rest of the crate looks at.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Datelike, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ORIGIN, REFERER, USER_AGENT};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::error::FetchError;

pub const STATS_BASE_URL: &str = "https://stats.nba.com/stats";

pub type Record = Map<String, Value>;
pub type ResultSets = HashMap<String, Vec<Record>>;

/// An active roster entry. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: u64,
    pub full_name: String,
    // Only `full_name` reaches the report.
    #[allow(dead_code)]
    pub first_name: String,
    #[allow(dead_code)]
    pub last_name: String,
}

#[derive(Deserialize)]
struct RosterRow {
    #[serde(rename = "PERSON_ID")]
    #[serde(deserialize_with = "deserialize_id")]
    person_id: u64,
    #[serde(rename = "DISPLAY_FIRST_LAST")]
    #[serde(default, deserialize_with = "deserialize_text")]
    display_first_last: String,
    #[serde(rename = "DISPLAY_LAST_COMMA_FIRST")]
    #[serde(default, deserialize_with = "deserialize_text")]
    display_last_comma_first: String,
    #[serde(rename = "ROSTERSTATUS")]
    #[serde(default, deserialize_with = "deserialize_flag")]
    roster_status: bool,
}

// Ids come back as numbers, but integer-like strings show up on some endpoints.
fn deserialize_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let id = match &value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    id.ok_or_else(|| serde::de::Error::custom(format!("invalid player id: {value}")))
}

/// Strings are trimmed; null, missing and non-string values become empty.
pub fn deserialize_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s.trim().to_string(),
        _ => String::new(),
    })
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        Some(Value::String(s)) => matches!(s.trim(), "1" | "Active"),
        Some(Value::Bool(b)) => b,
        _ => false,
    })
}

pub fn build_client() -> reqwest::Result<reqwest::Client> {
    // stats.nba.com stalls requests that don't look like they come from nba.com.
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36",
        ),
    );
    headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
    headers.insert(REFERER, HeaderValue::from_static("https://www.nba.com/"));
    headers.insert(ORIGIN, HeaderValue::from_static("https://www.nba.com"));
    headers.insert("x-nba-stats-origin", HeaderValue::from_static("stats"));
    headers.insert("x-nba-stats-token", HeaderValue::from_static("true"));

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(2)
        .build()
}

/// Season label (`2025-26`) for the season in progress at `now`.
/// A new season is counted from October.
pub fn season_label(now: DateTime<Utc>) -> String {
    let start = if now.month() >= 10 { now.year() } else { now.year() - 1 };
    format!("{}-{:02}", start, (start + 1).rem_euclid(100))
}

/// One GET, decoded as JSON. No retry here.
pub async fn get_json(client: &reqwest::Client, url: &str) -> Result<Value, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_owned(),
            status,
        });
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| FetchError::from_reqwest(url, e))
}

pub fn normalize_result_sets(url: &str, payload: &Value) -> Result<ResultSets, FetchError> {
    let sets = payload
        .get("resultSets")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::shape(url, "missing resultSets array"))?;

    let mut out = ResultSets::new();
    for set in sets {
        let name = set
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| FetchError::shape(url, "result set without a name"))?;
        let headers = set
            .get("headers")
            .and_then(Value::as_array)
            .ok_or_else(|| FetchError::shape(url, format!("{name}: headers is not an array")))?;
        let rows = set
            .get("rowSet")
            .and_then(Value::as_array)
            .ok_or_else(|| FetchError::shape(url, format!("{name}: rowSet is not an array")))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let cells = row
                .as_array()
                .ok_or_else(|| FetchError::shape(url, format!("{name}: row is not an array")))?;
            let record: Record = headers
                .iter()
                .zip(cells)
                .filter_map(|(header, cell)| header.as_str().map(|h| (h.to_string(), cell.clone())))
                .collect();
            records.push(record);
        }
        out.insert(name.to_string(), records);
    }

    Ok(out)
}

pub fn parse_roster(url: &str, sets: &ResultSets) -> Result<Vec<Player>, FetchError> {
    let rows = sets
        .get("CommonAllPlayers")
        .ok_or_else(|| FetchError::shape(url, "missing CommonAllPlayers result set"))?;

    let mut players = Vec::with_capacity(rows.len());
    for row in rows {
        let row: RosterRow = serde_json::from_value(Value::Object(row.clone()))
            .map_err(|e| FetchError::shape(url, e.to_string()))?;
        if !row.roster_status {
            continue;
        }

        let (last_name, first_name) = match row.display_last_comma_first.split_once(", ") {
            Some((last, first)) => (last.to_string(), first.to_string()),
            None => (row.display_last_comma_first.clone(), String::new()),
        };
        players.push(Player {
            id: row.person_id,
            full_name: row.display_first_last,
            first_name,
            last_name,
        });
    }

    Ok(players)
}

/// Currently active players, in the order the service lists them.
pub async fn fetch_active_players(client: &reqwest::Client) -> Result<Vec<Player>, FetchError> {
    let season = season_label(Utc::now());
    let url = format!(
        "{STATS_BASE_URL}/commonallplayers?LeagueID=00&IsOnlyCurrentSeason=1&Season={season}"
    );

    let payload = get_json(client, &url).await?;
    let sets = normalize_result_sets(&url, &payload)?;
    parse_roster(&url, &sets)
}
