use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cardtrader", about = "Sports-card market research and trading signals")]
pub struct Cli {
    /// Read listings from a JSON fixture instead of calling eBay
    #[arg(long, global = true)]
    pub listings: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Market statistics for a card search
    Research {
        #[command(flatten)]
        card: CardArgs,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Research the market and produce a BUY/HOLD/SELL recommendation
    Recommend {
        #[command(flatten)]
        card: CardArgs,
        #[command(flatten)]
        filters: FilterArgs,
        /// Player performance score (0-100)
        #[arg(long)]
        score: f64,
        /// Performance trend (improving, stable, declining)
        #[arg(long, default_value = "stable")]
        trend: String,
        /// Risk flag; repeat for several (injury, age, suspension, volatility)
        #[arg(long = "risk")]
        risks: Vec<String>,
    },
    /// Show the effective trading thresholds and scoring weights
    Thresholds,
}

#[derive(Args, Debug, Clone)]
pub struct CardArgs {
    /// Free-text search, or the player name when combined with the card flags
    pub query: String,
    #[arg(long)]
    pub year: Option<u16>,
    #[arg(long)]
    pub manufacturer: Option<String>,
    #[arg(long)]
    pub rookie: bool,
    #[arg(long)]
    pub auto: bool,
    #[arg(long)]
    pub graded: bool,
    #[arg(long)]
    pub psa_grade: Option<u8>,
}

#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    #[arg(long)]
    pub min_price: Option<String>,
    #[arg(long)]
    pub max_price: Option<String>,
    /// Card condition (new, like_new, good, fair, poor, graded_N)
    #[arg(long)]
    pub condition: Option<String>,
    #[arg(long, default_value = "20")]
    pub limit: u32,
    /// Only completed sales, no live listings
    #[arg(long)]
    pub sold_only: bool,
}
