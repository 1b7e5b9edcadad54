//! `parley run`: answer one message and exit.
//!
//! Ctrl-C cancels the turn; a turn interrupted before its answer is ready
//! leaves the session history untouched.

use anyhow::Context;
use pl_runtime::{CancellationToken, TurnRequest};

use crate::bootstrap::App;

pub struct RunArgs {
    pub message: String,
    pub session: String,
    pub user: String,
    pub model: String,
    pub workspace: Option<String>,
    pub kwargs: Option<String>,
    pub json: bool,
}

pub async fn run(app: &App, args: RunArgs) -> anyhow::Result<()> {
    let mut req = TurnRequest::new(args.session, args.user, args.message, args.model);
    if let Some(workspace) = args.workspace {
        req = req.with_workspace(workspace);
    }
    if let Some(raw) = args.kwargs.as_deref() {
        req = req.with_kwargs(parse_kwargs(raw)?);
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("cancelling turn");
            on_interrupt.cancel();
        }
    });

    let response = app.orchestrator.run(req, &cancel).await?;

    if args.json {
        let json = serde_json::to_string_pretty(&response).context("serializing response")?;
        println!("{json}");
    } else {
        println!("{}", response.content);
        let sources = response.metadata.documents.len();
        if sources > 0 {
            eprintln!("\x1b[2m[{sources} source document(s)]\x1b[0m");
        }
    }

    Ok(())
}

fn parse_kwargs(raw: &str) -> anyhow::Result<serde_json::Value> {
    let value: serde_json::Value =
        serde_json::from_str(raw).with_context(|| format!("--kwargs is not JSON: {raw}"))?;
    if !value.is_object() {
        anyhow::bail!("--kwargs must be a JSON object");
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kwargs_must_be_an_object() {
        assert!(parse_kwargs(r#"{"temperature":0.2}"#).is_ok());
        assert!(parse_kwargs("[1,2]").is_err());
        assert!(parse_kwargs("temperature=0.2").is_err());
    }
}
