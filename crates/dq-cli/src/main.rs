//! # dq-cli: command-line front end of DYNQ
//!
//! - `dq parse`: Parse tokens and show the resolved spec and predicates.
//! - `dq explain`: Render the SQL a query would run as.
//! - `dq datasets`: List the datasets of a running hub.
//! - `dq query <dataset>`: Query a running hub and print a table.
//! - `dq verify`: Run Kani proofs.

use std::process::Command;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;

use dq_core::translate::predicates;
use dq_core::{sql, AliasMap, PageLimits, QueryParams, RecordShape};

mod table;

/// DYNQ: filter, sort, select and page relational data from flat tokens.
#[derive(Parser)]
#[command(name = "dq", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Default)]
struct TokenArgs {
    /// Filter token `path:operator[:value]` (repeatable).
    #[arg(long = "filter", short = 'f')]
    filters: Vec<String>,

    /// Sort token `path.asc|desc` (repeatable).
    #[arg(long = "sort", short = 's')]
    sorts: Vec<String>,

    /// Selected path (repeatable).
    #[arg(long = "select")]
    selects: Vec<String>,

    /// Zero-based page index.
    #[arg(long)]
    page: Option<String>,

    /// Page size.
    #[arg(long)]
    take: Option<String>,
}

impl TokenArgs {
    fn pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = Vec::new();
        pairs.extend(self.filters.iter().map(|f| ("filter", f.as_str())));
        pairs.extend(self.sorts.iter().map(|s| ("sort", s.as_str())));
        pairs.extend(self.selects.iter().map(|s| ("select", s.as_str())));
        pairs.extend(self.page.as_deref().map(|p| ("page", p)));
        pairs.extend(self.take.as_deref().map(|t| ("take", t)));
        pairs
    }

    fn params(&self) -> QueryParams {
        QueryParams::from_pairs(self.pairs())
    }

    fn query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs())
            .finish()
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Parse tokens offline and print the resolved query as JSON.
    Parse {
        #[command(flatten)]
        tokens: TokenArgs,

        /// Field alias `token=path` (repeatable).
        #[arg(long = "alias", value_parser = parse_alias)]
        aliases: Vec<(String, String)>,
    },

    /// Print the SQL a query translates to.
    Explain {
        /// Table name used in the rendered statements.
        #[arg(long, default_value = "records")]
        table: String,

        #[command(flatten)]
        tokens: TokenArgs,

        /// Field alias `token=path` (repeatable).
        #[arg(long = "alias", value_parser = parse_alias)]
        aliases: Vec<(String, String)>,

        /// Default page size.
        #[arg(long, default_value_t = 100)]
        default_take: u64,

        /// Maximum page size.
        #[arg(long, default_value_t = 100)]
        max_take: u64,
    },

    /// List the datasets served by the hub.
    Datasets {
        /// Print raw JSON.
        #[arg(long)]
        json: bool,
    },

    /// Query a dataset on the hub.
    Query {
        dataset: String,

        #[command(flatten)]
        tokens: TokenArgs,

        /// Print raw JSON.
        #[arg(long)]
        json: bool,
    },

    /// Run Kani formal verification proofs.
    Verify,
}

fn parse_alias(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((token, path)) if !token.is_empty() && !path.is_empty() => {
            Ok((token.to_string(), path.to_string()))
        }
        _ => Err(format!("expected token=path, got {:?}", raw)),
    }
}

fn alias_map(aliases: &[(String, String)]) -> anyhow::Result<AliasMap> {
    Ok(aliases
        .iter()
        .fold(AliasMap::builder(), |b, (token, path)| b.alias(token, path))
        .build()?)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Parse { tokens, aliases } => {
            let aliases = alias_map(&aliases)?;
            let spec = aliases.resolve_spec(&tokens.params().parse()?);
            let predicates = predicates(&spec.filters)?;
            let out = serde_json::json!({
                "filters": spec.filters,
                "sorts": spec.sorts,
                "selects": spec.selects,
                "predicates": predicates,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }

        Commands::Explain {
            table,
            tokens,
            aliases,
            default_take,
            max_take,
        } => {
            let aliases = alias_map(&aliases)?;
            let params = tokens.params();
            let spec = aliases.resolve_spec(&params.parse()?);
            let page = PageLimits::new(default_take, max_take)
                .page_from_params(params.page.as_deref(), params.take.as_deref());
            let preview = sql::render(&table, &RecordShape::default(), &spec, page.window())?;
            println!("{};", preview.count);
            println!("{};", preview.select);
            if !preview.args.is_empty() {
                println!("-- args: {:?}", preview.args);
            }
            println!("-- limit/offset: {:?}", preview.page_args);
        }

        Commands::Verify => {
            eprintln!("DYNQ: Running Kani proofs...");
            let status = Command::new("cargo")
                .args(["kani", "--package", "dq-verify"])
                .status()
                .context("failed to run cargo kani")?;

            if status.success() {
                eprintln!("DYNQ: All proofs verified.");
            } else {
                bail!("proof verification failed ({})", status);
            }
        }

        // Async Commands
        cmd => {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("failed to build tokio runtime")?;
            rt.block_on(async_main(cmd))?;
        }
    }
    Ok(())
}

async fn async_main(cmd: Commands) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let base_url =
        std::env::var("DQ_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());

    match cmd {
        Commands::Datasets { json } => {
            let url = format!("{}/api/datasets", base_url);
            let body = get_json(&client, &url).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                let list = body.as_array().map(Vec::as_slice).unwrap_or_default();
                println!("{}", table::datasets(list));
            }
        }
        Commands::Query {
            dataset,
            tokens,
            json,
        } => {
            let query = tokens.query_string();
            let url = if query.is_empty() {
                format!("{}/api/datasets/{}", base_url, dataset)
            } else {
                format!("{}/api/datasets/{}?{}", base_url, dataset, query)
            };
            let body = get_json(&client, &url).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                let rows = body["data"].as_array().map(Vec::as_slice).unwrap_or_default();
                println!("{}", table::records(rows));
                let meta = &body["meta"];
                println!(
                    "page {} of {} · {} rows · take {}",
                    meta["page"], meta["pageCount"], meta["itemCount"], meta["take"]
                );
            }
        }
        _ => {}
    }
    Ok(())
}

async fn get_json(client: &reqwest::Client, url: &str) -> anyhow::Result<Value> {
    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("GET {}", url))?;
    let status = resp.status();
    let body: Value = resp.json().await.context("hub returned a non-JSON body")?;
    if !status.is_success() {
        let message = body["error"].as_str().unwrap_or("unknown error");
        bail!("hub answered {}: {}", status, message);
    }
    Ok(body)
}
