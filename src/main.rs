use std::sync::Arc;

use cardtrader::cli::commands::{CardArgs, Cli, Commands, FilterArgs};
use cardtrader::config::AppConfig;
use cardtrader::domain::values::card_condition::CardCondition;
use cardtrader::domain::values::card_query::CardQuery;
use cardtrader::domain::values::market_filters::MarketFilters;
use cardtrader::domain::values::performance::{PerformanceTrend, PlayerPerformanceSignal, RiskFlag};
use cardtrader::infrastructure::clock::SystemClock;
use cardtrader::infrastructure::feeds::file::FileFeed;
use cardtrader::CardTrader;
use clap::Parser;
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    // Logs go to stderr so stdout stays machine-readable JSON.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_level))
        .with_writer(std::io::stderr)
        .init();

    let trader = match &cli.listings {
        Some(path) => CardTrader::with_providers(&config, Arc::new(FileFeed::new(path)), Arc::new(SystemClock)),
        None => CardTrader::new(&config),
    };
    let trader = match trader {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error initializing cardtrader: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run_command(&trader, cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run_command(trader: &CardTrader, cmd: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        Commands::Research { card, filters } => {
            let query = build_query(&card)?;
            let snapshot = trader.research(&query, &build_filters(&filters)?).await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Commands::Recommend {
            card,
            filters,
            score,
            trend,
            risks,
        } => {
            let query = build_query(&card)?;
            let trend: PerformanceTrend = trend.parse()?;
            let risks = risks
                .iter()
                .map(|r| r.parse::<RiskFlag>())
                .collect::<Result<Vec<_>, _>>()?;
            let performance = PlayerPerformanceSignal::new(score, trend, risks)?;

            let report = trader
                .recommend(&query, &build_filters(&filters)?, &performance)
                .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Thresholds => {
            let config = serde_json::json!({
                "thresholds": trader.thresholds(),
                "weights": trader.weights(),
            });
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }
    Ok(())
}

fn build_query(card: &CardArgs) -> Result<String, Box<dyn std::error::Error>> {
    let query = CardQuery {
        player: card.query.clone(),
        year: card.year,
        manufacturer: card.manufacturer.clone(),
        rookie: card.rookie,
        auto: card.auto,
        graded: card.graded,
        psa_grade: card.psa_grade,
    };
    Ok(query.keywords()?)
}

fn build_filters(args: &FilterArgs) -> Result<MarketFilters, Box<dyn std::error::Error>> {
    let price = |raw: &Option<String>| -> Result<Option<Decimal>, Box<dyn std::error::Error>> {
        Ok(match raw {
            Some(s) => Some(s.parse::<Decimal>()?),
            None => None,
        })
    };
    Ok(MarketFilters {
        min_price: price(&args.min_price)?,
        max_price: price(&args.max_price)?,
        condition: args.condition.as_deref().map(str::parse::<CardCondition>).transpose()?,
        limit: args.limit,
        sold_only: args.sold_only,
    })
}
