use std::path::PathBuf;

use challonge_scraper::{
    ChallongeClient, ChallongeClientConfig, ChallongeError, TournamentBracketContent,
    TournamentBracketRequest,
};
use tracing_subscriber::EnvFilter;

/// Usage: fetch_bracket <url> [saved-page.html]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let url = args.next().ok_or("missing tournament url")?;
    let saved = args.next().map(PathBuf::from);

    let client = ChallongeClient::from_config(ChallongeClientConfig {
        user_agent: Some(format!("challonge-scraper/{}", env!("CARGO_PKG_VERSION"))),
        ..Default::default()
    })?;

    let content = match saved {
        Some(path) => Some(TournamentBracketContent::html(std::fs::read(path)?)),
        None => None,
    };

    let request = TournamentBracketRequest::parse(&url)?;
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let bracket = match client
        .get_tournament_bracket_until(request, content, ctrl_c)
        .await
    {
        Err(ChallongeError::Cancelled) => {
            println!("cancelled");
            return Ok(());
        }
        result => result?,
    };

    println!("{} ({})", bracket.page_content.name, bracket.page_content.url);
    if let Some(game) = &bracket.meta_list.game {
        println!("game: {game}");
    }
    if let Some(start) = bracket.meta_list.start_time {
        println!("starts: {start}");
    }
    println!("multi-stage: {}", bracket.is_multi_stage());
    for stage in bracket.bracket.brackets() {
        println!(
            "  {}: {} matches",
            stage.name.as_deref().unwrap_or("(unnamed)"),
            stage.matches().count()
        );
    }
    for player in bracket.players() {
        println!("  #{} {}", player.seed, player.display_name);
    }
    Ok(())
}
