//! Risk sizing - converts an order intent into a bounded quantity.

use rust_decimal::Decimal;
use std::sync::Arc;

use crate::core::config::RiskConfig;
use crate::core::{Error, PriceFeed, Result, Symbol};

/// Fractional precision for crypto quantities.
const QTY_DECIMALS: u32 = 6;

/// Outcome of a sizing computation.
#[derive(Debug, Clone, Copy)]
pub struct Sizing {
    pub qty: Decimal,
    /// Risk budget committed to the trade (equity x per-trade risk).
    pub risk_amount: Decimal,
    /// Spot price the sizing was computed against.
    pub price: Decimal,
}

/// Sizes positions so that at most `risk_per_trade_pct` of equity is at
/// risk on any single trade.
pub struct RiskSizer {
    feed: Arc<dyn PriceFeed>,
    config: RiskConfig,
}

impl RiskSizer {
    pub fn new(feed: Arc<dyn PriceFeed>, config: RiskConfig) -> Self {
        Self { feed, config }
    }

    /// Compute a bounded quantity for `symbol` at current price.
    ///
    /// With a stop strictly below price, quantity is budget over stop
    /// distance; without one, notional sizing (budget over price). A stop
    /// at or above price yields zero. Zero is a valid "do not trade"
    /// result, not an error.
    pub async fn size(
        &self,
        symbol: &Symbol,
        equity: Decimal,
        stop: Option<Decimal>,
    ) -> Result<Sizing> {
        let price = self.feed.spot_price(symbol).await?;
        if price <= Decimal::ZERO {
            return Err(Error::PriceUnavailable(format!(
                "non-positive price {price} for {symbol}"
            )));
        }

        let budget = equity * self.config.risk_per_trade_pct;
        let qty = match stop {
            Some(stop) if stop < price => budget / (price - stop),
            Some(_) => Decimal::ZERO,
            None => budget / price,
        };

        let qty = qty
            .clamp(Decimal::ZERO, self.config.max_order_qty)
            .round_dp(QTY_DECIMALS);

        Ok(Sizing {
            qty,
            risk_amount: budget,
            price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedFeed(Decimal);

    #[async_trait]
    impl PriceFeed for FixedFeed {
        async fn spot_price(&self, _symbol: &Symbol) -> Result<Decimal> {
            Ok(self.0)
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct FailingFeed;

    #[async_trait]
    impl PriceFeed for FailingFeed {
        async fn spot_price(&self, _symbol: &Symbol) -> Result<Decimal> {
            Err(Error::PriceUnavailable("connection refused".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn sizer(price: Decimal) -> RiskSizer {
        RiskSizer::new(Arc::new(FixedFeed(price)), RiskConfig::default())
    }

    #[tokio::test]
    async fn notional_sizing_without_stop() {
        // equity 10000, risk 2%, price 50000 -> 200 / 50000 = 0.004
        let sizing = sizer(Decimal::from(50_000))
            .size(&Symbol::new("BTCUSD"), Decimal::from(10_000), None)
            .await
            .unwrap();
        assert_eq!(sizing.qty, Decimal::new(4, 3));
        assert_eq!(sizing.risk_amount, Decimal::from(200));
    }

    #[tokio::test]
    async fn stop_distance_sizing() {
        // per-unit risk 1000 -> 200 / 1000 = 0.2
        let sizing = sizer(Decimal::from(50_000))
            .size(
                &Symbol::new("BTCUSD"),
                Decimal::from(10_000),
                Some(Decimal::from(49_000)),
            )
            .await
            .unwrap();
        assert_eq!(sizing.qty, Decimal::new(2, 1));
    }

    #[tokio::test]
    async fn stop_at_or_above_price_yields_zero() {
        let s = sizer(Decimal::from(50_000));
        let at = s
            .size(
                &Symbol::new("BTCUSD"),
                Decimal::from(10_000),
                Some(Decimal::from(50_000)),
            )
            .await
            .unwrap();
        assert_eq!(at.qty, Decimal::ZERO);

        let above = s
            .size(
                &Symbol::new("BTCUSD"),
                Decimal::from(10_000),
                Some(Decimal::from(60_000)),
            )
            .await
            .unwrap();
        assert_eq!(above.qty, Decimal::ZERO);
    }

    #[tokio::test]
    async fn zero_equity_yields_zero_not_error() {
        let sizing = sizer(Decimal::from(50_000))
            .size(&Symbol::new("BTCUSD"), Decimal::ZERO, None)
            .await
            .unwrap();
        assert_eq!(sizing.qty, Decimal::ZERO);
    }

    #[tokio::test]
    async fn qty_is_clamped_to_max_order_qty() {
        // tight stop on a huge account would size absurdly large
        let sizing = sizer(Decimal::from(50_000))
            .size(
                &Symbol::new("BTCUSD"),
                Decimal::from(100_000_000),
                Some(Decimal::from(49_999)),
            )
            .await
            .unwrap();
        assert_eq!(sizing.qty, RiskConfig::default().max_order_qty);
    }

    #[tokio::test]
    async fn qty_rounds_to_six_decimals() {
        // 200 / 30000 = 0.00666666... -> 0.006667
        let sizing = sizer(Decimal::from(30_000))
            .size(&Symbol::new("ETHUSD"), Decimal::from(10_000), None)
            .await
            .unwrap();
        assert_eq!(sizing.qty, Decimal::new(6_667, 6));
    }

    #[tokio::test]
    async fn feed_failure_propagates_as_price_unavailable() {
        let s = RiskSizer::new(Arc::new(FailingFeed), RiskConfig::default());
        let err = s
            .size(&Symbol::new("BTCUSD"), Decimal::from(10_000), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PriceUnavailable(_)));
    }

    #[tokio::test]
    async fn non_positive_price_is_an_error() {
        let err = sizer(Decimal::ZERO)
            .size(&Symbol::new("BTCUSD"), Decimal::from(10_000), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PriceUnavailable(_)));
    }
}
