use anyhow::Context;
use pl_domain::turn::{Role, SessionKey, Turn};

use crate::bootstrap::App;

/// Print a session's turns, oldest first.
pub async fn show(app: &App, session: String, user: String, json: bool) -> anyhow::Result<()> {
    let key = SessionKey::new(session, user);
    let turns = app
        .history
        .get_messages(&key)
        .await
        .with_context(|| format!("loading history for {key}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&turns)?);
        return Ok(());
    }

    if turns.is_empty() {
        eprintln!("no turns stored for {key}");
        return Ok(());
    }
    for turn in &turns {
        println!("{}", render(turn));
    }
    Ok(())
}

fn render(turn: &Turn) -> String {
    let who = match turn.role {
        Role::Human => "user",
        Role::Assistant => "assistant",
    };
    let stamp = turn.timestamp.format("%Y-%m-%d %H:%M:%S");
    let sources = turn
        .metadata
        .as_ref()
        .and_then(|m| m.get("documents"))
        .and_then(|d| d.as_array())
        .map(|d| d.len())
        .unwrap_or(0);
    if sources > 0 {
        format!("[{stamp}] {who} ({sources} sources): {}", turn.content)
    } else {
        format!("[{stamp}] {who}: {}", turn.content)
    }
}
