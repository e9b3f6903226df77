mod render;
mod session;

use anyhow::{Context, bail};
use catalog_flow::{
    CatalogPage, HttpMovieService, ServiceConfig,
    review_form::SUBMISSION_FAILED_MESSAGE,
};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Terminals narrower than this get the modal review form.
const NARROW_COLUMNS: u16 = 80;

#[derive(Debug, Parser)]
#[command(name = "catalog-terminal", about = "Browse the movie catalog and post reviews")]
struct Cli {
    /// Base URL of the movie API (overrides MOVIE_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Pause before each request, in milliseconds (overrides MOVIE_BUSY_DELAY_MS)
    #[arg(long, global = true)]
    busy_delay_ms: Option<u64>,

    /// Maximum review comment length (overrides REVIEW_COMMENT_LIMIT)
    #[arg(long, global = true)]
    comment_limit: Option<usize>,

    /// Force the narrow layout regardless of terminal width
    #[arg(long, global = true)]
    narrow: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the catalog table once
    List {
        /// Lowest averaged score first
        #[arg(long)]
        asc: bool,
    },
    /// Post a review for one movie
    Review {
        movie_id: String,
        #[arg(long)]
        score: String,
        #[arg(long, default_value = "")]
        comment: String,
    },
    /// Interactive session (default)
    Interactive,
}

fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "catalog_terminal=info,catalog_flow=info".into());

    // stdout belongs to the rendered page
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn build_config(cli: &Cli) -> anyhow::Result<ServiceConfig> {
    let mut config = ServiceConfig::from_env().context("invalid environment configuration")?;
    if let Some(url) = &cli.api_url {
        config = config.with_base_url(url.as_str());
    }
    if let Some(millis) = cli.busy_delay_ms {
        config = config.with_busy_delay(Duration::from_millis(millis));
    }
    if let Some(limit) = cli.comment_limit {
        config = config.with_comment_limit(limit)?;
    }
    Ok(config)
}

fn detect_narrow(forced: bool) -> bool {
    forced
        || terminal_size::terminal_size()
            .is_some_and(|(terminal_size::Width(width), _)| width < NARROW_COLUMNS)
}

async fn run_list(mut page: CatalogPage, ascending: bool) -> anyhow::Result<()> {
    if ascending {
        page.toggle_sort();
    }
    let pending = page.begin_load().await;
    if page.view().await.busy {
        eprintln!("Loading...");
    }
    if let Err(err) = pending.run().await {
        error!(error = %err, "Catalog load failed");
    }
    print!("{}", render::render_page(&page.view().await));
    Ok(())
}

async fn run_review(
    mut page: CatalogPage,
    movie_id: &str,
    score: &str,
    comment: &str,
) -> anyhow::Result<()> {
    let pending = page.begin_load().await;
    if page.view().await.busy {
        eprintln!("Loading...");
    }
    pending.run().await.context("could not load the catalog")?;

    if page.click_row(movie_id).await.is_none() {
        bail!("no movie with id {movie_id:?}");
    }
    let Some(form) = page.form_mut() else {
        bail!("review form did not open for movie {movie_id:?}");
    };
    if !form.input_score(score).await {
        bail!("score must contain digits only, got {score:?}");
    }
    form.input_comment(comment).await;

    let pending = match form.start_submit().await {
        Ok(pending) => pending,
        Err(err) => bail!("{err}"),
    };
    if page.view().await.form.is_some_and(|form| form.busy) {
        eprintln!("Submitting...");
    }
    let result = pending.send().await;
    if let Some(form) = page.form_mut() {
        form.finish(&result).await;
    }

    match result {
        Ok(message) => {
            println!("{message}");
            Ok(())
        }
        Err(err) if err.is_validation() => bail!("{err}"),
        Err(err) => {
            error!(error = %err, "Review submission failed");
            bail!(SUBMISSION_FAILED_MESSAGE)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = build_config(&cli)?;
    info!(base_url = %config.base_url, "Using movie API");

    let comment_limit = config.comment_limit;
    let service = Arc::new(HttpMovieService::new(config));
    let mut page = CatalogPage::new(service).with_comment_limit(comment_limit);
    page.set_narrow(detect_narrow(cli.narrow));

    match cli.command.unwrap_or(Command::Interactive) {
        Command::List { asc } => run_list(page, asc).await,
        Command::Review {
            movie_id,
            score,
            comment,
        } => run_review(page, &movie_id, &score, &comment).await,
        Command::Interactive => session::run(page).await,
    }
}
