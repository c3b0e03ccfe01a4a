use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pulse_core::config::Settings;
use pulse_core::context::AppContext;
use pulse_core::llm::service::ScreenRequest;

#[derive(Debug, Parser)]
#[command(name = "pulse_worker", about = "Operator commands against the market data services")]
struct Args {
    /// Propagate completion failures instead of printing the fallback payload.
    #[arg(long, global = true)]
    no_fallback: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the completion catalog and the model resolution would choose.
    Models,
    /// Fetch a daily closing-price series from the configured vendor.
    Series {
        #[arg(long)]
        ticker: String,
        #[arg(long)]
        days: Option<u32>,
    },
    /// Aggregate the configured news feeds.
    News {
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        q: Option<String>,
    },
    /// Single-ticker analysis.
    Analyze {
        #[arg(long)]
        ticker: String,
    },
    /// Idea screen for a risk profile and region.
    Screen {
        #[arg(long)]
        risk: Option<String>,
        #[arg(long)]
        region: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    if args.no_fallback {
        settings.fallback_enabled = false;
    }

    let ctx = AppContext::from_settings(settings)?;
    if let Err(e) = run(&ctx, args.command).await {
        sentry_anyhow::capture_anyhow(&e);
        tracing::error!(error = %e, "command failed");
        return Err(e);
    }
    Ok(())
}

async fn run(ctx: &AppContext, command: Command) -> anyhow::Result<()> {
    let output = match command {
        Command::Models => {
            let (available, chosen) = ctx.analysis.client().resolver().probe().await?;
            serde_json::json!({ "available": available, "selected": chosen })
        }
        Command::Series { ticker, days } => {
            serde_json::to_value(ctx.series.get_series(&ticker, days).await?)?
        }
        Command::News { limit, q } => {
            serde_json::to_value(ctx.news.fetch_news(q.as_deref(), limit).await?)?
        }
        Command::Analyze { ticker } => serde_json::to_value(ctx.analysis.analyze(&ticker).await?)?,
        Command::Screen { risk, region } => {
            let req = ScreenRequest { risk, region };
            serde_json::to_value(ctx.analysis.screen(&req).await?)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_series_command() {
        let args = Args::try_parse_from(["pulse_worker", "series", "--ticker", "nvda", "--days", "90"])
            .unwrap();
        assert!(!args.no_fallback);
        match args.command {
            Command::Series { ticker, days } => {
                assert_eq!(ticker, "nvda");
                assert_eq!(days, Some(90));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn no_fallback_is_global() {
        let args = Args::try_parse_from(["pulse_worker", "analyze", "--ticker", "AAPL", "--no-fallback"])
            .unwrap();
        assert!(args.no_fallback);
    }

    #[test]
    fn screen_params_are_optional() {
        let args = Args::try_parse_from(["pulse_worker", "screen"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Screen {
                risk: None,
                region: None
            }
        ));
    }

    #[test]
    fn series_requires_ticker() {
        assert!(Args::try_parse_from(["pulse_worker", "series"]).is_err());
    }
}
