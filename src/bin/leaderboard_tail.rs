//! Follows one source in the terminal and prints the board whenever it changes.
//!
//! Usage: `leaderboard_tail [source-id]` (defaults to the first configured source).

use std::time::Duration;

use leaderboard_watch::config::load_config_default;
use leaderboard_watch::movement::{annotate, Movement, Podium};
use leaderboard_watch::PresentationState;

fn render(p: &PresentationState) {
    println!("--- {} ---", p.active_source.as_deref().unwrap_or("-"));
    for row in annotate(&p.current, &p.previous) {
        let arrow = match row.movement {
            Movement::Up => "▲",
            Movement::Down => "▼",
            Movement::New => "*",
            Movement::Steady => " ",
        };
        let medal = match row.podium {
            Some(Podium::Gold) => "🥇",
            Some(Podium::Silver) => "🥈",
            Some(Podium::Bronze) => "🥉",
            None => "  ",
        };
        println!(
            "{medal} {:>2}. {arrow} {:<30} {:>8}",
            row.position + 1,
            row.team_name,
            row.total_score
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let cfg = load_config_default()?;
    let id = match std::env::args().nth(1) {
        Some(id) => id,
        None => cfg
            .sources
            .first()
            .map(|s| s.id.clone())
            .ok_or_else(|| anyhow::anyhow!("no sources configured"))?,
    };
    if cfg.source(&id).is_none() {
        anyhow::bail!("unknown source '{id}'");
    }

    let mut scheduler = leaderboard_watch::build_scheduler(&cfg);
    scheduler.select_source(&id);
    let orchestrator = scheduler.orchestrator().clone();

    let mut last_status = String::new();
    let mut last_update = None;
    let mut ticker = tokio::time::interval(Duration::from_millis(250));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                let p = orchestrator.presentation();
                if p.updated_at != last_update {
                    last_update = p.updated_at;
                    render(&p);
                }
                if p.status != last_status {
                    if !p.status.is_empty() {
                        println!("[{}]", p.status);
                    }
                    last_status = p.status;
                }
            }
        }
    }

    scheduler.deactivate();
    println!("leaderboard_tail done");
    Ok(())
}
