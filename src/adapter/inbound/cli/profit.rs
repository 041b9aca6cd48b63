//! Handler for `arbfill profit`.

use serde_json::json;

use super::command::ProfitArgs;
use super::output;
use crate::domain::{format_cents, ProfitBreakdown, ProfitCalculator};
use crate::error::Result;
use crate::infrastructure::config::settings::Config;

/// Price a sale with the configured fee schedule. Touches no store.
pub fn execute(config: &Config, args: &ProfitArgs) -> Result<()> {
    let calculator = ProfitCalculator::new(config.fees.schedule());
    let breakdown = calculator.compute(args.buyer_paid, args.source_cost, args.platform)?;

    if output::is_json() {
        output::json_output(json!({
            "command": "profit",
            "breakdown": breakdown,
        }));
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    display(&breakdown);
    Ok(())
}

fn display(b: &ProfitBreakdown) {
    output::section(&format!("Profit on {}", b.platform));
    output::field("Buyer paid", format_cents(b.buyer_paid));
    output::field("Source cost", format_cents(b.source_cost));
    output::field("Commission", output::muted(format_cents(b.commission)));
    output::field("Processor", output::muted(format_cents(b.processor_fee)));
    output::field("Platform fee", output::muted(format_cents(b.platform_fee)));
    output::field("Total costs", format_cents(b.total_costs));
    output::field("Gross profit", format_cents(b.gross_profit));
    output::field(
        "Net profit",
        output::signed(b.net_profit, format_cents(b.net_profit)),
    );
    output::field("Margin", format!("{}%", b.margin_percent));
    if b.net_profit < 0 {
        output::warning("This sale loses money after fees");
    }
}
