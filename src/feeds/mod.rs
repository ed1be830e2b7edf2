//! Price feeds - spot-price ingestion for risk sizing

pub mod coingecko;

pub use coingecko::CoinGeckoFeed;
