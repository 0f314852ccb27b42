//! Numeric series behind the PnL charts
//!
//! Rendering is left to external tools; the series are exported as
//! tab-separated `index  value` files.

use std::fs::File;
use std::path::Path;

use rust_decimal::Decimal;
use tracing::info;

use super::accumulated::to_f64;
use super::series::RollingSeries;
use crate::common::errors::Result;
use crate::strategy::PriceTrackingState;

#[derive(Debug, Clone)]
pub struct ChartSeries {
    /// Per-trade return ratio against the tracked entry price
    pub profit: RollingSeries,
    /// Account value after each trade
    pub cum_profit: RollingSeries,
    /// Per-trade realized profit in quote currency
    pub profit_dollar: RollingSeries,
    /// Running sum of `profit_dollar`
    pub cum_profit_dollar: RollingSeries,
}

impl ChartSeries {
    /// Series seeded with two flat points so charts start at the initial state
    pub fn new(initial_asset_value: Decimal) -> Self {
        let init = to_f64(initial_asset_value);
        Self {
            profit: RollingSeries::from_values([1.0, 1.0]),
            cum_profit: RollingSeries::from_values([init, init]),
            profit_dollar: RollingSeries::from_values([0.0, 0.0]),
            cum_profit_dollar: RollingSeries::from_values([0.0, 0.0]),
        }
    }

    /// Record one fill
    ///
    /// `tracking` is the state from before the fill was applied: the ratio is
    /// measured against the entry the fill trades out of.
    pub fn record_fill(
        &mut self,
        tracking: &PriceTrackingState,
        price: Decimal,
        asset_value: Decimal,
        profit: Decimal,
    ) {
        let price_f = to_f64(price);
        let buy = to_f64(tracking.buy_price);
        let sell = to_f64(tracking.sell_price);

        if buy > 0.0 {
            self.profit.update(price_f / buy);
            self.cum_profit.update(to_f64(asset_value));
        } else if sell > 0.0 && price_f > 0.0 {
            self.profit.update(sell / price_f);
            self.cum_profit.update(to_f64(asset_value));
        }

        self.profit_dollar.update(to_f64(profit));
        self.cum_profit_dollar.update(self.profit_dollar.sum());
    }

    /// Export the return-ratio and account-value series
    pub fn write_tsv(&self, pnl_path: impl AsRef<Path>, cum_pnl_path: impl AsRef<Path>) -> Result<()> {
        write_series(pnl_path.as_ref(), "profit", &self.profit)?;
        write_series(cum_pnl_path.as_ref(), "cumProfit", &self.cum_profit)?;
        Ok(())
    }
}

fn write_series(path: &Path, column: &str, series: &RollingSeries) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(File::create(path)?);
    writer.write_record(["index", column])?;
    for (i, value) in series.values().enumerate() {
        writer.write_record([i.to_string(), format!("{:.6}", value)])?;
    }
    writer.flush()?;
    info!(path = %path.display(), points = series.len(), "Chart series written");
    Ok(())
}
