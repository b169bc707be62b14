mod api;
mod enrich;
mod error;
mod report;
mod retry;

use std::path::Path;

use chrono::Utc;
use clap::Parser;

use api::STATS_BASE_URL;
use enrich::PLAYER_INFO_PAUSE;
use report::OUTPUT_FILE;

#[derive(Parser)]
#[command(name = "nba-intl-players")]
#[command(version)]
#[command(about = "Group active non-US NBA players by birth country")]
struct Cli {}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .init();

    let client = api::build_client()?;

    log::info!("Fetching active players...");
    let players = api::fetch_active_players(&client).await?;
    log::info!("Active players fetched: {}", players.len());

    let enrichment = enrich::enrich_players(
        &players,
        PLAYER_INFO_PAUSE,
        |player_id| enrich::fetch_player_country_and_team(&client, STATS_BASE_URL, player_id),
        |processed| log::info!("Processed {} players...", processed),
    )
    .await?;

    let report = report::build_report(enrichment, Utc::now());
    report::write_report(Path::new(OUTPUT_FILE), &report)?;

    println!(
        "Wrote {} with {} players across {} countries.",
        OUTPUT_FILE, report.total_players, report.total_countries
    );

    Ok(())
}
