use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use std::path::Path;
use uuid::Uuid;

use civic_cms::prelude::*;

use crate::utils::{self, format};

#[derive(Subcommand)]
pub enum AuditCommands {
    /// Create the PostgreSQL audit schema (idempotent)
    Init,
    /// List audit records, newest first
    List(ListArgs),
    /// Print one audit record as JSON
    Show {
        /// Record id
        #[arg(value_name = "ID")]
        id: Uuid,
    },
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Only records by this user id
    #[arg(long, value_name = "ID")]
    actor_id: Option<i64>,

    /// Only records on this entity type, e.g. content.Page
    #[arg(long, value_name = "LABEL")]
    entity_type: Option<String>,

    /// Only records on this entity id
    #[arg(long, value_name = "ID")]
    entity_id: Option<String>,

    /// Only records with this action (create, update, delete, login, logout)
    #[arg(long)]
    action: Option<AuditAction>,

    /// Only records at or after this RFC 3339 time
    #[arg(long, value_name = "TIME")]
    since: Option<DateTime<Utc>>,

    /// Only records at or before this RFC 3339 time
    #[arg(long, value_name = "TIME")]
    until: Option<DateTime<Utc>>,

    /// Case-insensitive text search
    #[arg(long, short)]
    search: Option<String>,

    /// Oldest first
    #[arg(long)]
    asc: bool,

    /// Page number, starting at 1
    #[arg(long, default_value_t = 1)]
    page: u32,

    /// Records per page (at most 100)
    #[arg(long, default_value_t = 20)]
    per_page: u32,

    /// Print the page as JSON
    #[arg(long)]
    json: bool,
}

impl ListArgs {
    fn to_query(&self) -> AuditQuery {
        AuditQuery {
            actor_id: self.actor_id,
            entity_type: self.entity_type.clone(),
            entity_id: self.entity_id.clone(),
            action: self.action,
            since: self.since,
            until: self.until,
            search: self.search.clone(),
            order: Some(if self.asc {
                SortOrder::Asc
            } else {
                SortOrder::Desc
            }),
            page: Some(self.page),
            per_page: Some(self.per_page),
        }
    }
}

pub async fn execute(command: AuditCommands, config_path: Option<&Path>) -> Result<()> {
    let config = utils::load_config(config_path)?;

    match command {
        AuditCommands::Init => init(&config).await,
        AuditCommands::List(args) => list(&config, &args).await,
        AuditCommands::Show { id } => show(&config, id).await,
    }
}

async fn open_store(config: &Config) -> Result<PgAuditStore> {
    let Some(db_config) = &config.database else {
        anyhow::bail!(
            "No [database] section configured.\n\n\
            Without a database the audit log lives in the memory of a running\n\
            server; query it there with GET /audit-logs."
        );
    };

    let pool = create_pool(db_config)
        .await
        .context("Failed to connect to the audit database")?;
    Ok(PgAuditStore::new(pool))
}

async fn init(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    store
        .initialize()
        .await
        .context("Failed to create the audit schema")?;

    utils::success("Audit schema is up to date");
    Ok(())
}

async fn list(config: &Config, args: &ListArgs) -> Result<()> {
    let store = open_store(config).await?;
    let page = store
        .query(&args.to_query())
        .await
        .context("Failed to query audit records")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    if page.records.is_empty() {
        utils::info("No audit records match");
        return Ok(());
    }

    println!("{}", format::header());
    for record in &page.records {
        println!("{}", format::record_line(record));
    }
    println!("\n{}", format::page_footer(&page));
    Ok(())
}

async fn show(config: &Config, id: Uuid) -> Result<()> {
    let store = open_store(config).await?;
    let record = store
        .get(id)
        .await
        .context("Failed to fetch audit record")?
        .with_context(|| format!("Audit record {} not found", id))?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
