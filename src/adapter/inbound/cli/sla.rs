//! Handlers for `arbfill sla` and `arbfill run`.

use serde_json::json;
use tokio::signal;
use tracing::info;

use super::output;
use crate::error::Result;
use crate::infrastructure::bootstrap::Services;
use crate::infrastructure::config::settings::Config;

/// One sweep, now.
pub async fn check(config: Config) -> Result<()> {
    let services = Services::open(config).await?;
    let router = if services.config.sla.auto_refund {
        Some(services.router()?)
    } else {
        None
    };
    let monitor = services.sla_monitor(router);
    let report = monitor.sweep().await?;

    if output::is_json() {
        output::json_output(json!({
            "command": "sla.check",
            "checked": report.checked,
            "breached": report.breached,
            "refunded": report.refunded,
        }));
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    output::field("Checked", report.checked);
    output::field(
        "Threshold",
        format!("{}h", monitor.config().threshold.num_hours()),
    );
    if report.breached.is_empty() {
        output::success("No new SLA breaches");
        return Ok(());
    }
    for number in &report.breached {
        output::warning(&format!("Task {number} breached SLA"));
    }
    for id in &report.refunded {
        output::field("Refunded", id);
    }
    Ok(())
}

/// Run the SLA monitor until Ctrl-C.
pub async fn run(config: Config) -> Result<()> {
    let services = Services::open(config).await?;
    let router = if services.config.sla.auto_refund {
        Some(services.router()?)
    } else {
        None
    };
    let monitor = services.sla_monitor(router);

    output::header(env!("CARGO_PKG_VERSION"));
    output::note("SLA monitor running; Ctrl-C to stop");

    monitor
        .run(async {
            if signal::ctrl_c().await.is_err() {
                // No signal handler; run until the process is killed.
                std::future::pending::<()>().await;
            }
            info!("Shutdown signal received");
        })
        .await;
    Ok(())
}
