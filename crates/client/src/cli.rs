//! `medstock-admin` command line.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use medstock_core::{AggregateId, DomainError};
use medstock_purchasing::{PurchaseOrderId, PurchaseOrderStatus};
use medstock_quarantine::{Decision, QuarantineAction, QuarantineRecordId, ReviewForm};

use crate::api::{Backend, HttpBackend};
use crate::config::ClientConfig;
use crate::dto::{PurchaseOrderView, QuarantineRecordView};
use crate::error::ClientError;
use crate::poller::summary_poller;
use crate::screens::{PurchaseOrderScreen, QuarantineScreen};
use crate::session::Session;

#[derive(Debug, Parser)]
#[command(name = "medstock-admin")]
#[command(about = "Pharmacy admin console: purchase orders and quarantine review")]
pub struct Cli {
    /// Backend base URL
    #[arg(long, global = true, help = "Override MEDSTOCK_API_URL for this invocation")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Purchase order lifecycle
    Po {
        #[command(subcommand)]
        command: PoCommand,
    },
    /// Quarantined batches
    Quarantine {
        #[command(subcommand)]
        command: QuarantineCommand,
    },
    /// Store a bearer token for later invocations
    Login {
        #[arg(long)]
        token: String,
    },
    /// Forget the stored bearer token
    Logout,
}

#[derive(Debug, Subcommand)]
pub enum PoCommand {
    /// List purchase orders
    List,
    /// Show one purchase order as JSON
    Show {
        #[arg(value_parser = parse_order_id)]
        id: PurchaseOrderId,
    },
    /// Statuses the order can move to next
    Transitions {
        #[arg(value_parser = parse_order_id)]
        id: PurchaseOrderId,
    },
    /// Move an order to a new status
    SetStatus {
        #[arg(value_parser = parse_order_id)]
        id: PurchaseOrderId,
        /// Target status, e.g. APPROVED or partially-received
        status: PurchaseOrderStatus,
        #[arg(long)]
        comments: Option<String>,
    },
    /// Reject a draft awaiting approval (cancels it)
    Reject {
        #[arg(value_parser = parse_order_id)]
        id: PurchaseOrderId,
        #[arg(long, help = "Reason for rejection (required)")]
        comments: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum QuarantineCommand {
    /// List quarantine records
    List,
    /// Actions available for a record
    Actions {
        #[arg(value_parser = parse_record_id)]
        id: QuarantineRecordId,
    },
    /// Review, dispose or return a record
    Act {
        #[arg(value_parser = parse_record_id)]
        id: QuarantineRecordId,
        /// REVIEW, DISPOSE or RETURN
        action: QuarantineAction,
        #[arg(long)]
        comments: Option<String>,
        #[arg(long)]
        disposal_method: Option<String>,
        #[arg(long)]
        disposal_certificate: Option<String>,
        #[arg(long)]
        return_reference: Option<String>,
    },
    /// Approve disposal or return through the review wizard
    Review(ReviewArgs),
    /// Poll the quarantine summary until Ctrl-C
    Watch,
}

#[derive(Debug, Args)]
pub struct ReviewArgs {
    #[arg(value_parser = parse_record_id)]
    pub id: QuarantineRecordId,
    #[arg(long, default_value = "")]
    pub review_notes: String,
    #[arg(long, default_value = "")]
    pub risk_assessment: String,
    /// DISPOSAL or RETURN
    #[arg(long)]
    pub decision: Option<Decision>,
    #[arg(long, default_value = "")]
    pub disposal_method: String,
    #[arg(long, default_value = "")]
    pub disposal_justification: String,
    #[arg(long, default_value = "")]
    pub return_justification: String,
    #[arg(long)]
    pub supplier_notified: bool,
    #[arg(long)]
    pub compliance_checked: bool,
    #[arg(long)]
    pub manager_approved: bool,
}

impl ReviewArgs {
    fn into_form(self) -> ReviewForm {
        ReviewForm {
            review_notes: self.review_notes,
            risk_assessment: self.risk_assessment,
            decision: self.decision,
            disposal_method: self.disposal_method,
            disposal_justification: self.disposal_justification,
            return_justification: self.return_justification,
            supplier_notified: self.supplier_notified,
            compliance_checked: self.compliance_checked,
            manager_approved: self.manager_approved,
        }
    }
}

fn parse_order_id(s: &str) -> Result<PurchaseOrderId, DomainError> {
    AggregateId::from_str(s).map(PurchaseOrderId::new)
}

fn parse_record_id(s: &str) -> Result<QuarantineRecordId, DomainError> {
    AggregateId::from_str(s).map(QuarantineRecordId::new)
}

/// Turn a client error into what the user should read; transport details go
/// to the log only.
fn user_facing(err: ClientError) -> anyhow::Error {
    if let ClientError::Transport(detail) = &err {
        tracing::warn!(%detail, "transport failure");
    }
    anyhow::anyhow!(err.alert_text())
}

pub async fn run(cli: Cli, config: ClientConfig) -> Result<()> {
    let config = match &cli.api_url {
        Some(url) => config.with_api_url(url)?,
        None => config,
    };
    let mut session = Session::load(&config).context("loading session")?;

    match cli.command {
        Commands::Login { token } => {
            session.login(&token)?;
            println!("token stored");
            Ok(())
        }
        Commands::Logout => {
            session.logout()?;
            println!("logged out");
            Ok(())
        }
        Commands::Po { command } => {
            let backend = connect(&config, &session)?;
            run_po(backend, command).await
        }
        Commands::Quarantine { command } => {
            let backend = connect(&config, &session)?;
            run_quarantine(backend, command, &config).await
        }
    }
}

fn connect(config: &ClientConfig, session: &Session) -> Result<Arc<dyn Backend>> {
    if !session.is_authenticated() {
        tracing::info!("no bearer token configured; requests are sent unauthenticated");
    }
    let backend = HttpBackend::new(config, session).map_err(user_facing)?;
    tracing::debug!(api_url = backend.api_url(), "backend configured");
    Ok(Arc::new(backend))
}

fn print_order(order: &PurchaseOrderView) {
    let total = order
        .totals()
        .map(|t| format_cents(t.total))
        .unwrap_or_else(|_| "-".to_string());
    println!(
        "{}\t{}\t{}\t{}\t{}",
        order.id,
        order.label(),
        order.status,
        order.supplier_name.as_deref().unwrap_or("-"),
        total
    );
}

fn print_record(record: &QuarantineRecordView) {
    println!(
        "{}\t{}\t{}\t{}\t{}\t{}",
        record.id,
        record.status,
        record.product_name.as_deref().unwrap_or("-"),
        record.batch_number,
        record.quantity,
        format_cents(record.estimated_loss)
    );
}

fn format_cents(cents: u64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    if items.is_empty() {
        return "(none)".to_string();
    }
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

async fn run_po(backend: Arc<dyn Backend>, command: PoCommand) -> Result<()> {
    if let PoCommand::Show { id } = command {
        let order = backend.get_purchase_order(id).await.map_err(user_facing)?;
        println!("{}", serde_json::to_string_pretty(&order)?);
        return Ok(());
    }

    let mut screen = PurchaseOrderScreen::new(backend);
    screen.refresh().await.map_err(user_facing)?;

    match command {
        PoCommand::List => screen.orders().iter().for_each(print_order),
        PoCommand::Show { .. } => {}
        PoCommand::Transitions { id } => {
            if screen.order(id).is_none() {
                anyhow::bail!("purchase order {id} not found");
            }
            println!("{}", join(screen.offered_transitions(id)));
        }
        PoCommand::SetStatus {
            id,
            status,
            comments,
        } => {
            let dialog = screen.open_transition(id, status).map_err(user_facing)?;
            dialog.comments = comments.unwrap_or_default();
            let updated = screen.confirm().await.map_err(user_facing)?;
            print_order(&updated);
        }
        PoCommand::Reject { id, comments } => {
            let dialog = screen.open_rejection(id).map_err(user_facing)?;
            dialog.comments = comments;
            let updated = screen.confirm().await.map_err(user_facing)?;
            print_order(&updated);
        }
    }
    Ok(())
}

async fn run_quarantine(
    backend: Arc<dyn Backend>,
    command: QuarantineCommand,
    config: &ClientConfig,
) -> Result<()> {
    if let QuarantineCommand::Watch = command {
        return watch(backend, config).await;
    }

    let mut screen = QuarantineScreen::new(backend);
    screen.refresh().await.map_err(user_facing)?;

    match command {
        QuarantineCommand::List => screen.records().iter().for_each(print_record),
        QuarantineCommand::Actions { id } => {
            if screen.record(id).is_none() {
                anyhow::bail!("quarantine record {id} not found");
            }
            println!("{}", join(screen.offered_actions(id)));
        }
        QuarantineCommand::Act {
            id,
            action,
            comments,
            disposal_method,
            disposal_certificate,
            return_reference,
        } => {
            let dialog = screen.open_action(id, action).map_err(user_facing)?;
            dialog.details.comments = comments;
            dialog.details.disposal_method = disposal_method;
            dialog.details.disposal_certificate = disposal_certificate;
            dialog.details.return_reference = return_reference;
            let updated = screen.submit_action().await.map_err(user_facing)?;
            print_record(&updated);
        }
        QuarantineCommand::Review(args) => {
            let id = args.id;
            let wizard = screen.open_review(id).map_err(user_facing)?;
            *wizard.form_mut() = args.into_form();
            if let Some(step) = wizard.first_incomplete() {
                tracing::info!(record_id = %id, step = step.number(), "review incomplete");
            }
            let updated = screen.submit_review().await.map_err(user_facing)?;
            print_record(&updated);
        }
        QuarantineCommand::Watch => {}
    }
    Ok(())
}

async fn watch(backend: Arc<dyn Backend>, config: &ClientConfig) -> Result<()> {
    let mut poller = summary_poller(backend, config.poll_interval);
    let notify = config.notifications.quarantine_alerts;

    loop {
        tokio::select! {
            alive = poller.changed() => {
                if !alive {
                    break;
                }
                let poll = poller.latest();
                if let Some(alert) = &poll.last_error {
                    eprintln!("summary unavailable: {}", alert.message);
                    continue;
                }
                let Some(summary) = poll.value else { continue };
                println!(
                    "records={} awaiting_decision={} open_loss={}",
                    summary.total_records,
                    summary.awaiting_decision,
                    format_cents(summary.open_estimated_loss)
                );
                if notify && summary.awaiting_decision > 0 {
                    tracing::warn!(
                        awaiting = summary.awaiting_decision,
                        "quarantined batches awaiting a decision"
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    poller.stop();
    Ok(())
}
