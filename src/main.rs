use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use wb_seller_export::app::ports::SellerApiPort;
use wb_seller_export::app::{CatalogUseCase, FeedbackUseCase};
use wb_seller_export::auth::InitDataVerifier;
use wb_seller_export::config::Config;
use wb_seller_export::constants::ENV_API_TOKENS;
use wb_seller_export::export::write_table;
use wb_seller_export::infra::ReqwestSellerApi;
use wb_seller_export::observability::{self, init_logging};
use wb_seller_export::storage::{credential_key, CredentialStore};
use wb_seller_export::types::{AnsweredFilter, CatalogOptions, Credential, FeedbackFilter};

#[derive(Parser)]
#[command(name = "wb-export")]
#[command(about = "Export a Wildberries seller catalog, reviews and questions to CSV")]
#[command(version)]
struct Cli {
    /// Seller API token. Falls back to WB_API_TOKEN / B_API_TOKEN, then the store
    #[arg(long, global = true)]
    token: Option<String>,
    /// Read the token saved for this user in the credential store
    #[arg(long, global = true)]
    user: Option<i64>,
    /// Print Prometheus metrics when the command finishes
    #[arg(long, global = true)]
    metrics: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export the normalized product catalog
    Catalog {
        #[arg(long, default_value = "output/catalog.csv")]
        output: PathBuf,
        /// Cards per request (at most 100)
        #[arg(long)]
        page_size: Option<usize>,
        #[arg(long)]
        max_items: Option<usize>,
        /// Also check that the token can read reviews and questions
        #[arg(long)]
        check_feedback_access: bool,
    },
    /// Export the latest reviews of one product
    Reviews {
        #[arg(long)]
        nm_id: i64,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, default_value = "output/reviews.csv")]
        output: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Export all questions of one product
    Questions {
        #[arg(long)]
        nm_id: i64,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, default_value = "output/questions.csv")]
        output: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Manage saved seller tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Check a signed mini-app init data string
    VerifyInitData {
        init_data: String,
        /// Defaults to TELEGRAM_BOT_TOKEN / [auth].bot_token
        #[arg(long)]
        bot_token: Option<String>,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Partitions to export: true, false or all
    #[arg(long, default_value = "all")]
    answered: AnsweredFilter,
    /// YYYY-MM-DD (start of day, UTC) or an ISO 8601 timestamp
    #[arg(long)]
    date_from: Option<String>,
    /// YYYY-MM-DD (end of day, UTC) or an ISO 8601 timestamp
    #[arg(long)]
    date_to: Option<String>,
}

impl FilterArgs {
    fn to_filter(&self) -> Result<FeedbackFilter> {
        Ok(FeedbackFilter::parse(
            self.answered,
            self.date_from.as_deref(),
            self.date_to.as_deref(),
        )?)
    }
}

#[derive(Subcommand)]
enum TokenAction {
    Set {
        user_id: i64,
        /// Token as pasted; quotes, `WB_API_TOKEN=` and `Bearer ` are stripped
        #[arg(value_name = "TOKEN")]
        raw_token: String,
    },
    Get { user_id: i64 },
    Delete { user_id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = init_logging();
    let cli = Cli::parse();
    let config = Config::load().context("Failed to load configuration")?;

    let metrics_handle = if cli.metrics {
        Some(observability::metrics::init().map_err(|e| anyhow!(e))?)
    } else {
        None
    };

    let store = Arc::new(CredentialStore::from_config(
        &config.store,
        config.seller_api.timeout(),
    )?);

    match cli.command {
        Commands::Catalog {
            ref output,
            page_size,
            max_items,
            check_feedback_access,
        } => {
            let credential = resolve_credential(cli.token.as_deref(), cli.user, &store).await?;
            let api = seller_api(&config)?;

            if check_feedback_access {
                FeedbackUseCase::new(api.clone(), config.feedback.clone())
                    .check_access(&credential)
                    .await
                    .context("Token has no access to reviews and questions")?;
                println!("✅ Token can read reviews and questions");
            }

            let options = CatalogOptions {
                page_size: page_size.unwrap_or(config.catalog.page_size),
                max_items: max_items.unwrap_or(config.catalog.max_items),
            };
            let report = CatalogUseCase::new(api, config.seller_api.locale.clone())
                .fetch_catalog_report(&credential, options)
                .await
                .context("Failed to fetch the product catalog")?;

            let rows = report
                .products
                .iter()
                .map(serde_json::to_value)
                .collect::<std::result::Result<Vec<Value>, _>>()?;
            export_rows(&rows, output)?;
            println!("📦 Products: {} rows -> {}", rows.len(), output.display());
            if report.hit_limit {
                warn!(max_items = options.max_items, "Catalog truncated at max_items");
                eprintln!("⚠️  Product limit reached, the catalog was truncated");
            }
        }
        Commands::Reviews {
            nm_id,
            limit,
            ref output,
            ref filter,
        } => {
            let filter = filter.to_filter()?;
            let credential = resolve_credential(cli.token.as_deref(), cli.user, &store).await?;
            let items = FeedbackUseCase::new(seller_api(&config)?, config.feedback.clone())
                .with_filter(filter)
                .fetch_latest_reviews(&credential, nm_id, limit.unwrap_or(config.feedback.reviews_limit))
                .await
                .context("Failed to fetch reviews")?;
            export_rows(&items, output)?;
            println!("💬 Reviews: {} rows -> {}", items.len(), output.display());
        }
        Commands::Questions {
            nm_id,
            limit,
            ref output,
            ref filter,
        } => {
            let filter = filter.to_filter()?;
            let credential = resolve_credential(cli.token.as_deref(), cli.user, &store).await?;
            let report = FeedbackUseCase::new(seller_api(&config)?, config.feedback.clone())
                .with_filter(filter)
                .fetch_questions_report(
                    &credential,
                    nm_id,
                    limit.unwrap_or(config.feedback.questions_limit),
                )
                .await
                .context("Failed to fetch questions")?;
            export_rows(&report.items, output)?;
            println!("❓ Questions: {} rows -> {}", report.items.len(), output.display());
            if report.hit_limit {
                eprintln!("⚠️  Pagination ceiling reached, older questions were not fetched");
            }
        }
        Commands::Token { action } => run_token_action(action, &store).await?,
        Commands::VerifyInitData {
            init_data,
            bot_token,
        } => {
            let bot_token = bot_token
                .or_else(|| config.auth.bot_token.clone())
                .ok_or_else(|| anyhow!("No bot token: pass --bot-token or set TELEGRAM_BOT_TOKEN"))?;
            let verifier = InitDataVerifier::new(bot_token, config.auth.max_age_seconds);
            let verified = verifier.verify(&init_data, chrono::Utc::now().timestamp())?;
            match verified.user_id {
                Some(user_id) => println!("✅ Valid init data for user {}", user_id),
                None => println!("✅ Valid init data (no user)"),
            }
        }
    }

    if let Some(handle) = metrics_handle {
        println!("{}", handle.render());
    }
    Ok(())
}

async fn run_token_action(action: TokenAction, store: &CredentialStore) -> Result<()> {
    match action {
        TokenAction::Set { user_id, raw_token } => {
            let credential = Credential::parse(&raw_token)?;
            if !credential.looks_like_seller_token() {
                eprintln!("⚠️  This does not look like a seller API token, saving anyway");
            }
            if store.set(&credential_key(user_id), credential.as_str()).await {
                println!("🔐 Token saved for user {}", user_id);
            } else {
                eprintln!("⚠️  Remote store unavailable, token kept for this process only");
            }
        }
        TokenAction::Get { user_id } => match store.get(&credential_key(user_id)).await {
            Some(token) => println!("{}", token),
            None => bail!("No token saved for user {}", user_id),
        },
        TokenAction::Delete { user_id } => {
            if store.delete(&credential_key(user_id)).await {
                println!("🗑️  Token deleted for user {}", user_id);
            } else {
                println!("No token saved for user {}", user_id);
            }
        }
    }
    Ok(())
}

/// `--token` wins, then the environment, then the store entry of `--user`.
async fn resolve_credential(
    flag: Option<&str>,
    user: Option<i64>,
    store: &CredentialStore,
) -> Result<Credential> {
    if let Some(raw) = flag {
        return Ok(Credential::parse(raw)?);
    }
    if let Some(raw) = ENV_API_TOKENS
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|v| !v.trim().is_empty()))
    {
        return Ok(Credential::parse(&raw)?);
    }
    if let Some(user_id) = user {
        if let Some(raw) = store.get(&credential_key(user_id)).await {
            info!(user_id, "Using stored credential");
            return Ok(Credential::parse(&raw)?);
        }
        bail!("No token saved for user {}", user_id);
    }
    bail!("No seller API token: pass --token, set WB_API_TOKEN / B_API_TOKEN or use --user")
}

fn seller_api(config: &Config) -> Result<Arc<dyn SellerApiPort>> {
    Ok(Arc::new(ReqwestSellerApi::new(&config.seller_api)?))
}

fn export_rows(rows: &[Value], output: &Path) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file = File::create(output).with_context(|| format!("Failed to create {}", output.display()))?;
    write_table(rows, BufWriter::new(file))?;
    info!(rows = rows.len(), path = %output.display(), "CSV written");
    Ok(())
}
