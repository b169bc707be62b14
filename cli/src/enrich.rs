use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::sleep;

use crate::api::{self, deserialize_text, Player, ResultSets};
use crate::error::FetchError;
use crate::retry::retry;

/// Courtesy pause before every detail request, the first one included.
pub const PLAYER_INFO_PAUSE: Duration = Duration::from_millis(350);
pub const PROGRESS_EVERY: usize = 50;

pub const FREE_AGENT: &str = "Free Agent";
pub const UNKNOWN_COUNTRY: &str = "Unknown";

const DOMESTIC_NAMES: [&str; 5] = ["usa", "united states", "u.s.a.", "u.s.", "us"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PlayerProfile {
    #[serde(rename = "COUNTRY")]
    #[serde(default, deserialize_with = "deserialize_text")]
    pub country: String,
    #[serde(rename = "TEAM_CITY")]
    #[serde(default, deserialize_with = "deserialize_text")]
    pub team_city: String,
    #[serde(rename = "TEAM_NAME")]
    #[serde(default, deserialize_with = "deserialize_text")]
    pub team_name: String,
}

impl PlayerProfile {
    /// `"{city} {name}"`, trimmed; empty when both parts are.
    pub fn team(&self) -> String {
        format!("{} {}", self.team_city, self.team_name).trim().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub player: String,
    pub team: String,
}

/// Country buckets in first-seen order.
pub type Buckets = Vec<(String, Vec<Entry>)>;

#[derive(Debug, Default)]
pub struct Enrichment {
    pub buckets: Buckets,
    pub domestic_excluded: usize,
}

pub fn is_domestic(country: &str) -> bool {
    let c = country.trim().to_lowercase();
    DOMESTIC_NAMES.contains(&c.as_str())
}

pub fn make_entry(full_name: &str, team: &str) -> Entry {
    Entry {
        player: full_name.to_string(),
        team: if team.is_empty() { FREE_AGENT.to_string() } else { team.to_string() },
    }
}

fn push_entry(buckets: &mut Buckets, country: &str, entry: Entry) {
    let key = if country.is_empty() { UNKNOWN_COUNTRY } else { country };
    match buckets.iter_mut().find(|(k, _)| k.as_str() == key) {
        Some((_, entries)) => entries.push(entry),
        None => buckets.push((key.to_string(), vec![entry])),
    }
}

/// First `CommonPlayerInfo` record; an empty set means every field is empty.
pub fn parse_player_profile(url: &str, sets: &ResultSets) -> Result<PlayerProfile, FetchError> {
    let Some(rows) = sets.get("CommonPlayerInfo") else {
        return Ok(PlayerProfile::default());
    };
    match rows.first() {
        Some(row) => serde_json::from_value(Value::Object(row.clone()))
            .map_err(|e| FetchError::shape(url, e.to_string())),
        None => Ok(PlayerProfile::default()),
    }
}

pub async fn fetch_player_country_and_team(
    client: &reqwest::Client,
    base_url: &str,
    player_id: u64,
) -> Result<PlayerProfile, FetchError> {
    let url = format!("{base_url}/commonplayerinfo?PlayerID={player_id}&LeagueID=");

    let payload = retry(|| api::get_json(client, &url)).await?;
    let sets = api::normalize_result_sets(&url, &payload)?;
    parse_player_profile(&url, &sets)
}

/// Looks every player up in roster order, one request at a time.
/// The first unrecovered lookup error aborts the whole pass.
///
/// `on_progress` gets the 1-based count of processed players every
/// [`PROGRESS_EVERY`] players, excluded ones included.
pub async fn enrich_players<F, Fut, P>(
    players: &[Player],
    pause: Duration,
    mut lookup: F,
    mut on_progress: P,
) -> Result<Enrichment, FetchError>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<PlayerProfile, FetchError>>,
    P: FnMut(usize),
{
    let mut out = Enrichment::default();

    for (idx, player) in players.iter().enumerate() {
        let idx = idx + 1;
        sleep(pause).await;

        let profile = lookup(player.id).await?;

        if is_domestic(&profile.country) {
            out.domestic_excluded += 1;
        } else {
            let entry = make_entry(&player.full_name, &profile.team());
            push_entry(&mut out.buckets, &profile.country, entry);
        }

        if idx % PROGRESS_EVERY == 0 {
            on_progress(idx);
        }
    }

    Ok(out)
}
