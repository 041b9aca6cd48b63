//! Handlers for `arbfill queue`.

use chrono::Utc;
use serde_json::json;
use tabled::Tabled;

use super::command::{CompleteArgs, QueueListArgs, StatusFilter, TaskArg};
use super::output;
use crate::domain::{format_cents, DeliveryPayload, ManualTask, TaskNumber, TaskStatus};
use crate::error::Result;
use crate::infrastructure::bootstrap::Services;
use crate::infrastructure::config::settings::Config;

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "Task")]
    number: String,
    #[tabled(rename = "Platform")]
    platform: String,
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "Paid")]
    paid: String,
    #[tabled(rename = "Cost")]
    cost: String,
    #[tabled(rename = "Age")]
    age: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&ManualTask> for TaskRow {
    fn from(task: &ManualTask) -> Self {
        let status = if task.is_escalated() && task.is_pending() {
            "pending (sla)".to_string()
        } else {
            task.status.to_string()
        };
        Self {
            number: task.task_number.to_string(),
            platform: task.platform.to_string(),
            service: task.service_name.clone(),
            paid: format_cents(task.buyer_paid),
            cost: format_cents(task.source_cost),
            age: format!("{}h", task.age(Utc::now()).num_hours()),
            status,
        }
    }
}

const fn filter(status: StatusFilter) -> Option<TaskStatus> {
    match status {
        StatusFilter::Pending => Some(TaskStatus::Pending),
        StatusFilter::Completed => Some(TaskStatus::Completed),
        StatusFilter::Cancelled => Some(TaskStatus::Cancelled),
        StatusFilter::All => None,
    }
}

/// List queue entries.
pub async fn list(config: Config, args: &QueueListArgs) -> Result<()> {
    let services = Services::open(config).await?;
    let tasks = services.queue.list(filter(args.status)).await?;

    if output::is_json() {
        output::json_output(json!({
            "command": "queue.list",
            "tasks": tasks,
        }));
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    if tasks.is_empty() {
        output::note("No tasks");
        return Ok(());
    }
    output::section(&format!("{} task(s)", tasks.len()));
    output::table(tasks.iter().map(TaskRow::from));
    Ok(())
}

/// Show one task with everything the operator needs to fulfill it.
pub async fn view(config: Config, args: &TaskArg) -> Result<()> {
    let services = Services::open(config).await?;
    let task = services.queue.get(TaskNumber::new(args.number)).await?;

    if output::is_json() {
        output::json_output(json!({
            "command": "queue.view",
            "task": task,
        }));
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    output::section(&format!("Task {}", task.task_number));
    output::field("Transaction", task.transaction_id);
    output::field("Listing", &task.listing_id);
    output::field("Service", &task.service_name);
    output::field("Platform", task.platform);
    output::field("Source", output::highlight(&task.source_url));
    output::field("Buyer paid", format_cents(task.buyer_paid));
    output::field("Source cost", format_cents(task.source_cost));
    output::field("Status", task.status);
    output::field("Enqueued", task.enqueued_at.to_rfc3339());
    if let Some(at) = task.escalated_at {
        output::field("SLA breach", output::negative(at.to_rfc3339()));
    }
    if let Some(at) = task.cancelled_at {
        output::field("Cancelled", output::muted(at.to_rfc3339()));
    }
    if let Some(delivery) = &task.delivery {
        output::field("Delivered", delivery.payload.summary());
    }

    output::section("Buyer input");
    println!(
        "  {}",
        serde_json::to_string_pretty(&task.buyer_input)?.replace('\n', "\n  ")
    );
    output::section("Instructions");
    for line in task.instructions.lines() {
        println!("  {line}");
    }
    Ok(())
}

/// Close a task with the operator's delivery.
pub async fn complete(config: Config, args: CompleteArgs) -> Result<()> {
    let services = Services::open(config).await?;
    let router = services.router()?;
    let number = TaskNumber::new(args.number);
    let payload = payload(&args);

    let tx = router.complete_manual(number, payload, args.notes).await?;
    let profit = tx.profit.as_ref();

    if output::is_json() {
        output::json_output(json!({
            "command": "queue.complete",
            "task_number": number,
            "transaction_id": tx.id,
            "state": tx.state,
            "profit": profit,
        }));
        return Ok(());
    }

    output::success(&format!("Task {number} completed"));
    output::field("Transaction", tx.id);
    output::field("State", tx.state);
    if let Some(profit) = profit {
        output::field(
            "Net profit",
            output::signed(profit.net_profit, format_cents(profit.net_profit)),
        );
    }
    Ok(())
}

/// The one delivery kind clap let through.
fn payload(args: &CompleteArgs) -> DeliveryPayload {
    if let Some(path) = &args.file {
        DeliveryPayload::File { path: path.clone() }
    } else if let Some(body) = &args.text {
        DeliveryPayload::TextResult { body: body.clone() }
    } else if let Some(url) = &args.url {
        DeliveryPayload::Url { url: url.clone() }
    } else {
        DeliveryPayload::Credentials {
            lines: args.credential.clone(),
        }
    }
}
