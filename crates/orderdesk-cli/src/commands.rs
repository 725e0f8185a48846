//! Subcommand execution and rendering.

use std::fmt::Write as _;

use anyhow::Result;
use chrono::Utc;

use orderdesk_engine::LifecycleEngine;
use orderdesk_types::{Order, UserId};

use crate::Command;

/// Run `cmd` against `engine` and render the result for stdout.
pub(crate) async fn execute(engine: &LifecycleEngine, cmd: &Command, json: bool) -> Result<String> {
    let output = match cmd {
        Command::Stats => {
            let stats = engine.stats().await;
            if json {
                serde_json::to_string_pretty(&stats)?
            } else {
                stats.to_string()
            }
        }
        Command::Pending { limit } => {
            let pending = engine.list_pending(*limit).await;
            render_orders(&pending, json, "no orders awaiting review")?
        }
        Command::Stale => {
            let stale = engine.list_stale(Utc::now()).await;
            render_orders(&stale, json, "no stale orders")?
        }
        Command::Banned => {
            let banned = engine.list_banned().await;
            if json {
                serde_json::to_string_pretty(&banned)?
            } else if banned.is_empty() {
                "no banned users".to_string()
            } else {
                banned.iter().map(UserId::to_string).collect::<Vec<_>>().join("\n")
            }
        }
        Command::Ban { user } => {
            let outcome = engine.ban(*user).await?;
            tracing::info!(
                user = %user,
                cancelled = outcome.cancelled.is_some(),
                "Ban applied from CLI"
            );
            match outcome.cancelled {
                Some(cancellation) => format!(
                    "banned {user}; cancelled order {}",
                    cancellation.order.description()
                ),
                None => format!("banned {user}"),
            }
        }
        Command::Unban { user } => {
            engine.unban(*user).await?;
            tracing::info!(user = %user, "Ban lifted from CLI");
            format!("unbanned {user}")
        }
        Command::Show { user } => match engine.order(*user).await {
            Some(order) if json => serde_json::to_string_pretty(&order)?,
            Some(order) => order_detail(&order),
            None => format!("user {user} has no order"),
        },
    };
    Ok(output)
}

fn render_orders(orders: &[Order], json: bool, empty: &str) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(orders)?);
    }
    if orders.is_empty() {
        return Ok(empty.to_string());
    }
    let now = Utc::now();
    let mut out = String::new();
    for order in orders {
        let _ = writeln!(
            out,
            "{:>12}  {:<16}  {:<32}  {}m",
            order.owner.to_string(),
            order.status.to_string(),
            order.description(),
            order.age(now).num_minutes()
        );
    }
    Ok(out.trim_end().to_string())
}

fn order_detail(order: &Order) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "owner:    {} ({})", order.owner, order.display_name);
    let _ = writeln!(out, "order:    {}", order.description());
    let _ = writeln!(out, "status:   {}", order.status);
    let _ = writeln!(
        out,
        "proof:    {}",
        order.proof_ref.as_ref().map_or("-", |p| p.as_str())
    );
    let _ = writeln!(out, "created:  {}", order.created_at.to_rfc3339());
    let _ = write!(out, "updated:  {}", order.updated_at.to_rfc3339());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderdesk_store::FileSink;
    use orderdesk_types::{DeskConfig, ProofRef};

    fn engine_at(dir: &tempfile::TempDir) -> LifecycleEngine {
        let config = DeskConfig::with_operators([99]);
        LifecycleEngine::open(config, FileSink::new(dir.path().join("snap.json"))).unwrap()
    }

    #[tokio::test]
    async fn ban_persists_between_invocations() {
        let dir = tempfile::tempdir().unwrap();
        {
            let engine = engine_at(&dir);
            engine.create_or_get_order(UserId(7), "x", "week").await.unwrap();
            let out = execute(&engine, &Command::Ban { user: UserId(7) }, false).await.unwrap();
            assert!(out.starts_with("banned 7; cancelled order 1 Week"));
        }
        let engine = engine_at(&dir);
        let out = execute(&engine, &Command::Banned, false).await.unwrap();
        assert_eq!(out, "7");
        let out = execute(&engine, &Command::Stats, false).await.unwrap();
        assert!(out.contains("cancelled=1"));
    }

    #[tokio::test]
    async fn banning_operator_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_at(&dir);
        let err = execute(&engine, &Command::Ban { user: UserId(99) }, false).await.unwrap_err();
        assert!(err.to_string().starts_with("OD_ERR_303"));
    }

    #[tokio::test]
    async fn pending_lists_review_queue() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_at(&dir);
        assert_eq!(
            execute(&engine, &Command::Pending { limit: 10 }, false).await.unwrap(),
            "no orders awaiting review"
        );

        engine.create_or_get_order(UserId(1), "a", "week").await.unwrap();
        engine.choose_network(UserId(1), "TRC20").await.unwrap();
        engine.submit_proof(UserId(1), ProofRef::new("img1"), Utc::now()).await.unwrap();

        let out = execute(&engine, &Command::Pending { limit: 10 }, false).await.unwrap();
        assert!(out.contains("UNDER_REVIEW"));
        assert!(out.contains("1 Week ($30) via TRC20"));

        let json = execute(&engine, &Command::Pending { limit: 10 }, true).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn show_missing_order() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_at(&dir);
        let out = execute(&engine, &Command::Show { user: UserId(3) }, false).await.unwrap();
        assert_eq!(out, "user 3 has no order");
    }

    #[tokio::test]
    async fn unban_unknown_user_fails() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_at(&dir);
        assert!(execute(&engine, &Command::Unban { user: UserId(3) }, false).await.is_err());
    }
}
