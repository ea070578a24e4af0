//! Read-only account queries.
//!
//! Pure projections over gateway data. Failures are reported to the notifier
//! and returned; nothing here changes exchange state.

use oms_core::{AccountSnapshot, AssetBalance, PositionView};
use oms_gateway::DynGateway;
use oms_notify::Notifications;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::warn;

use crate::error::PositionResult;

/// Balance and position lookups.
pub struct AccountQueries {
    gateway: DynGateway,
    notifications: Notifications,
}

impl AccountQueries {
    pub fn new(gateway: DynGateway, notifications: Notifications) -> Self {
        Self {
            gateway,
            notifications,
        }
    }

    /// Spot balances with a positive free amount.
    pub async fn get_positions(&self) -> PositionResult<Vec<AssetBalance>> {
        match self.gateway.account().await {
            Ok(account) => Ok(account.holdings()),
            Err(e) => {
                self.report(format!("Failed to fetch positions: {e}")).await;
                Err(e.into())
            }
        }
    }

    pub async fn get_account_summary(&self) -> PositionResult<AccountSnapshot> {
        match self.gateway.account().await {
            Ok(account) => Ok(account),
            Err(e) => {
                self.report(format!("Failed to fetch account summary: {e}"))
                    .await;
                Err(e.into())
            }
        }
    }

    /// Balance of one asset, `None` if the account has never held it.
    pub async fn get_available_balance(&self, asset: &str) -> PositionResult<Option<AssetBalance>> {
        let asset = asset.trim().to_ascii_uppercase();
        match self.gateway.asset_balance(asset.clone()).await {
            Ok(balance) => Ok(balance),
            Err(e) => {
                self.report(format!("Failed to fetch available balance for {asset}: {e}"))
                    .await;
                Err(e.into())
            }
        }
    }

    /// Open futures positions valued at the current mark price.
    ///
    /// If a mark lookup fails, the account's own mark price is used.
    pub async fn view_open_futures_positions(&self) -> PositionResult<Vec<PositionView>> {
        let account = match self.gateway.futures_account().await {
            Ok(account) => account,
            Err(e) => {
                self.report(format!("Failed to fetch open futures positions: {e}"))
                    .await;
                return Err(e.into());
            }
        };

        let mut views = Vec::new();
        for position in account.open_positions() {
            let mark = match self
                .gateway
                .futures_mark_price(position.symbol.clone())
                .await
            {
                Ok(mark) => mark,
                Err(e) => {
                    warn!(
                        symbol = %position.symbol,
                        error = %e,
                        "Mark price lookup failed, using account mark price"
                    );
                    position.mark_price
                }
            };
            views.push(PositionView::new(position, mark));
        }
        Ok(views)
    }

    async fn report(&self, text: String) {
        warn!(%text, "Account query failed");
        self.notifications.send(text).await;
    }
}

/// Format a quote-currency amount as `$1,234.56`.
///
/// Negative amounts keep the sign after the currency symbol: `$-1,234.56`.
pub fn format_usd(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let digits = format!("{:.2}", rounded.abs());
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));
    format!("${sign}{}.{fraction}", group_thousands(whole))
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

const COLUMNS: [&str; 8] = [
    "Symbol",
    "Size (Contracts)",
    "Size (USD)",
    "Entry Price",
    "Mark Price",
    "PNL (Unrealized)",
    "Liquidation Price",
    "Leverage",
];

/// Render positions as a fixed-width text table.
pub fn render_positions_table(views: &[PositionView]) -> String {
    let rows: Vec<[String; 8]> = views
        .iter()
        .map(|v| {
            [
                v.symbol.clone(),
                v.size.normalize().to_string(),
                format_usd(v.notional_usd),
                format_usd(v.entry_price.inner()),
                format_usd(v.mark_price.inner()),
                format_usd(v.unrealized_pnl),
                v.liquidation_price
                    .map(|p| format_usd(p.inner()))
                    .unwrap_or_else(|| "N/A".to_string()),
                format!("{}x", v.leverage),
            ]
        })
        .collect();

    let mut widths = COLUMNS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.len());
        }
    }

    let line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(widths.iter())
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![line(COLUMNS.to_vec())];
    for row in &rows {
        out.push(line(row.iter().map(String::as_str).collect()));
    }
    out.join("\n")
}
