use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use leaderboard_sync::{
    api::{LeaderboardApi, LeaderboardDataInput, LeaderboardScopeInput},
    cache::MemoryCache,
    config::{SyncConfig, load_config},
    db::migrate,
    ingest::{AdapterRegistry, IngestionOrchestrator},
    query::LeaderboardQueryService,
    scheduler::{IngestionScheduler, validate_cron},
    store::SqliteStore,
    telemetry::init_tracing,
    tenants::{config::load_tenants_path, sync_tenants},
};
use tracing::info;

#[derive(Parser)]
#[command(version, about = "Leaderboard ingestion and query CLI")]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Apply pending database migrations.
    Migrate,
    /// Manage registered tenants.
    Tenants(TenantsCmd),
    /// Run ingestion once.
    Ingest {
        /// Only ingest this tenant id.
        #[arg(long)]
        tenant: Option<String>,
    },
    /// Run ingestion on the configured cron schedule until Ctrl-C.
    Schedule,
    /// Print one leaderboard page as JSON.
    Page {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        casino: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },
    /// Print a leaderboard's configuration as JSON.
    Config {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        casino: String,
    },
}

#[derive(Args)]
struct TenantsCmd {
    #[command(subcommand)]
    sub: TenantsSub,
}

#[derive(Subcommand)]
enum TenantsSub {
    /// Upsert every tenant from a TOML seed file.
    Sync {
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
    },
}

struct App {
    config: SyncConfig,
    store: Arc<SqliteStore>,
    queries: Arc<LeaderboardQueryService>,
}

impl App {
    fn new(config: SyncConfig) -> Self {
        let store = Arc::new(SqliteStore::new(config.database.url.clone()));
        let queries = Arc::new(LeaderboardQueryService::new(
            store.clone(),
            Arc::new(MemoryCache::new()),
            config.cache_ttls(),
        ));
        Self {
            config,
            store,
            queries,
        }
    }

    fn orchestrator(&self) -> Result<IngestionOrchestrator> {
        let registry = AdapterRegistry::with_defaults(self.config.fetch_timeout())
            .context("building feed adapters")?;
        Ok(
            IngestionOrchestrator::new(self.store.clone(), registry, self.config.ingest_options())
                .with_invalidator(self.queries.clone()),
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json)?;

    let config = load_config(cli.config.as_deref())?;
    let app = App::new(config);

    match cli.cmd {
        Cmd::Migrate => {
            migrate::run_sqlite(&app.config.database.url)?;
        }
        Cmd::Tenants(TenantsCmd {
            sub: TenantsSub::Sync { file },
        }) => {
            migrate::run_sqlite(&app.config.database.url)?;
            let tenants = load_tenants_path(&file)?;
            let n = sync_tenants(app.store.as_ref(), &tenants).await?;
            info!(tenants = n, file = %file.display(), "tenants synced");
        }
        Cmd::Ingest { tenant } => {
            migrate::run_sqlite(&app.config.database.url)?;
            let orchestrator = app.orchestrator()?;
            match tenant {
                Some(id) => {
                    let outcome = orchestrator.run_tenant(&id).await?;
                    println!("{}", serde_json::to_string_pretty(&outcome)?);
                }
                None => {
                    let report = orchestrator.run_all().await?;
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
            }
        }
        Cmd::Schedule => {
            validate_cron(&app.config.schedule.cron)?;
            migrate::run_sqlite(&app.config.database.url)?;
            let mut scheduler =
                IngestionScheduler::new(app.orchestrator()?, app.config.schedule.cron.clone());
            scheduler.start().await?;
            tokio::signal::ctrl_c()
                .await
                .context("waiting for Ctrl-C")?;
            scheduler.shutdown().await?;
        }
        Cmd::Page {
            tenant,
            casino,
            page,
            page_size,
        } => {
            let api = LeaderboardApi::new(app.queries.clone());
            let result = api
                .get_leaderboard_data(LeaderboardDataInput {
                    tenant_id: tenant,
                    casino,
                    page: Some(page),
                    page_size: Some(page_size),
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Cmd::Config { tenant, casino } => {
            let api = LeaderboardApi::new(app.queries.clone());
            let config = api
                .get_leaderboard_config(LeaderboardScopeInput {
                    tenant_id: tenant,
                    casino,
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
