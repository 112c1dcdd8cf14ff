use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::LedgerService;
use crate::config::AppConfig;
use crate::domain::{ExpenseId, ExpenseUpdate, NewExpense, ParticipantId, format_money, parse_cents};
use crate::io::{Exporter, ImportOptions, import_full_json};
use crate::logging::init_logging;

/// Divvy - shared expense splitter
#[derive(Parser)]
#[command(name = "divvy")]
#[command(about = "Split shared expenses and work out who owes whom")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "DIVVY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database file path (overrides the config file)
    #[arg(short, long, global = true, env = "DIVVY_DATABASE")]
    pub database: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Participant management commands
    #[command(subcommand)]
    Participant(ParticipantCommands),

    /// Expense management commands
    #[command(subcommand)]
    Expense(ExpenseCommands),

    /// Show what everyone paid, owes and is owed
    Balances,

    /// Show the payments that would settle all balances
    Plan,

    /// Record a settlement of all outstanding expenses
    Settle {
        /// Confirm the settlement (otherwise only the plan is shown)
        #[arg(long)]
        yes: bool,
    },

    /// Show expense and settlement history, newest first
    History {
        /// Maximum number of entries to show
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Show ledger totals
    Summary,

    /// Export data to CSV or JSON
    Export {
        /// What to export: expenses, balances, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Import data from a full JSON export (replaces the current ledger)
    Import {
        /// What to import: full
        import_type: String,

        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,

        /// Validate without importing
        #[arg(long)]
        dry_run: bool,
    },

    /// Delete all participants and expenses
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum ParticipantCommands {
    /// Add a participant
    Add {
        /// Participant name (need not be unique)
        name: String,

        /// Email address
        #[arg(short, long)]
        email: Option<String>,
    },

    /// List participants
    List,

    /// Remove a participant; expenses they paid for are deleted
    Remove {
        /// Participant name or ID
        participant: String,
    },
}

#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// Record an expense
    Add {
        /// What the money was spent on
        description: String,

        /// Amount (e.g., "20.00" or "20")
        amount: String,

        /// Who paid (name or ID)
        #[arg(short, long)]
        paid_by: String,

        /// Who shares the cost, comma separated (defaults to everyone)
        #[arg(short, long, value_delimiter = ',')]
        split: Vec<String>,

        /// Category (e.g., "food", "transport")
        #[arg(long)]
        category: Option<String>,
    },

    /// List expenses
    List {
        /// Include settled expenses and settlement records
        #[arg(long)]
        all: bool,
    },

    /// Remove an expense
    Remove {
        /// Expense ID
        id: String,
    },

    /// Change fields of an unsettled expense
    Update {
        /// Expense ID
        id: String,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        amount: Option<String>,

        /// Who paid (name or ID)
        #[arg(long)]
        paid_by: Option<String>,

        /// Who shares the cost, comma separated
        #[arg(long, value_delimiter = ',')]
        split: Option<Vec<String>>,

        /// New category (empty string clears it)
        #[arg(long)]
        category: Option<String>,
    },
}

impl Cli {
    fn resolve_config(&self) -> Result<AppConfig> {
        let mut config = AppConfig::load(self.config.as_deref())?;
        if let Some(database) = &self.database {
            config.database = database.clone();
        }
        if self.verbose {
            config.log_level = "debug".to_string();
        }
        Ok(config)
    }

    pub async fn run(self) -> Result<()> {
        let config = self.resolve_config()?;
        init_logging(config.log_format, &config.log_level);
        let symbol = config.currency_symbol.as_str();

        if matches!(self.command, Commands::Init) {
            LedgerService::init(&config.database).await?;
            println!("Database initialized: {}", config.database);
            return Ok(());
        }

        let mut service = LedgerService::connect(&config.database)
            .await
            .with_context(|| {
                format!(
                    "Failed to open '{}'. Run 'divvy init' first",
                    config.database
                )
            })?;

        match self.command {
            Commands::Init => unreachable!("handled above"),

            Commands::Participant(cmd) => run_participant_command(&mut service, cmd).await?,

            Commands::Expense(cmd) => run_expense_command(&mut service, cmd, symbol).await?,

            Commands::Balances => run_balances_command(&service, symbol),

            Commands::Plan => run_plan_command(&service, symbol),

            Commands::Settle { yes } => run_settle_command(&mut service, yes, symbol).await?,

            Commands::History { limit, format } => {
                run_history_command(&service, limit, &format, symbol)?
            }

            Commands::Summary => {
                let summary = service.summary();
                println!("Participants:      {}", summary.participant_count);
                println!(
                    "Expenses:          {} ({} unsettled)",
                    summary.expense_count, summary.active_expense_count
                );
                println!("Settlements:       {}", summary.settlement_count);
                println!(
                    "Total spent:       {}",
                    format_money(summary.total_expenses, symbol)
                );
                println!(
                    "Unsettled:         {}",
                    format_money(summary.active_total, symbol)
                );
                if let Some(last) = summary.last_settlement {
                    println!("Last settled:      {}", last.format("%Y-%m-%d %H:%M"));
                }
            }

            Commands::Export {
                export_type,
                output,
            } => run_export_command(&service, &export_type, output.as_deref())?,

            Commands::Import {
                import_type,
                input,
                dry_run,
            } => run_import_command(&mut service, &import_type, input.as_deref(), dry_run).await?,

            Commands::Clear { yes } => {
                if !yes {
                    bail!("Refusing to delete everything without --yes");
                }
                service.clear().await;
                println!("Cleared all participants and expenses.");
            }
        }

        Ok(())
    }
}

fn parse_expense_id(id: &str) -> Result<ExpenseId> {
    Uuid::parse_str(id).context("Invalid expense ID format (expected UUID)")
}

fn resolve_participants(service: &LedgerService, names: &[String]) -> Result<Vec<ParticipantId>> {
    names
        .iter()
        .filter(|n| !n.trim().is_empty())
        .map(|n| -> Result<ParticipantId> { Ok(service.find_participant(n)?.id) })
        .collect()
}

async fn run_participant_command(service: &mut LedgerService, cmd: ParticipantCommands) -> Result<()> {
    match cmd {
        ParticipantCommands::Add { name, email } => {
            let participant = service.add_participant(&name, email.as_deref()).await?;
            println!("Added participant: {} ({})", participant.name, participant.id);
        }

        ParticipantCommands::List => {
            let participants = service.list_participants();
            if participants.is_empty() {
                println!("No participants yet.");
            } else {
                println!("{:<36}  {:<20} {}", "ID", "NAME", "EMAIL");
                println!("{}", "-".repeat(78));
                for p in participants {
                    println!(
                        "{:<36}  {:<20} {}",
                        p.id,
                        p.name,
                        p.email.as_deref().unwrap_or("")
                    );
                }
            }
        }

        ParticipantCommands::Remove { participant } => {
            let id = service.find_participant(&participant)?.id;
            if let Some(removal) = service.remove_participant(id).await {
                println!("Removed participant: {}", removal.participant.name);
                if !removal.deleted_expenses.is_empty() {
                    println!(
                        "  Deleted {} expense(s) that can no longer be split",
                        removal.deleted_expenses.len()
                    );
                }
                if !removal.pruned_expenses.is_empty() {
                    println!(
                        "  Re-split {} expense(s) among the remaining participants",
                        removal.pruned_expenses.len()
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_expense_command(
    service: &mut LedgerService,
    cmd: ExpenseCommands,
    symbol: &str,
) -> Result<()> {
    match cmd {
        ExpenseCommands::Add {
            description,
            amount,
            paid_by,
            split,
            category,
        } => {
            let amount_cents =
                parse_cents(&amount).context("Invalid amount format. Use '20.00' or '20'")?;
            let payer = service.find_participant(&paid_by)?.id;
            let split_among = if split.is_empty() {
                service.list_participants().iter().map(|p| p.id).collect()
            } else {
                resolve_participants(service, &split)?
            };

            let mut new = NewExpense::new(description, amount_cents, payer, split_among);
            if let Some(category) = category {
                new = new.with_category(category);
            }

            let expense = service.add_expense(new).await?;
            println!(
                "Recorded expense: {} {} paid by {}, split {} way(s) ({})",
                expense.description,
                format_money(expense.amount_cents, symbol),
                service.participant_name(payer),
                expense.split_among.len(),
                expense.id
            );
        }

        ExpenseCommands::List { all } => {
            let expenses: Vec<_> = service
                .list_expenses()
                .iter()
                .filter(|e| all || e.is_active())
                .collect();

            if expenses.is_empty() {
                println!("No expenses found.");
                return Ok(());
            }

            println!(
                "{:<36}  {:<10} {:<20} {:>10}  {:<12} {}",
                "ID", "DATE", "DESCRIPTION", "AMOUNT", "PAID BY", "STATUS"
            );
            println!("{}", "-".repeat(104));
            for expense in expenses {
                let status = if expense.is_settlement {
                    "settlement"
                } else if expense.is_settled {
                    "settled"
                } else {
                    "open"
                };
                let payer = expense
                    .paid_by
                    .map(|id| service.participant_name(id))
                    .unwrap_or("-");
                println!(
                    "{:<36}  {:<10} {:<20} {:>10}  {:<12} {}",
                    expense.id,
                    expense.date.format("%Y-%m-%d"),
                    truncate(&expense.description, 20),
                    format_money(expense.amount_cents, symbol),
                    truncate(payer, 12),
                    status
                );
            }
        }

        ExpenseCommands::Remove { id } => {
            let id = parse_expense_id(&id)?;
            match service.remove_expense(id).await {
                Some(expense) => println!("Removed expense: {}", expense.description),
                None => println!("No expense with ID {}", id),
            }
        }

        ExpenseCommands::Update {
            id,
            description,
            amount,
            paid_by,
            split,
            category,
        } => {
            let id = parse_expense_id(&id)?;
            let update = ExpenseUpdate {
                description,
                amount_cents: amount
                    .map(|a| parse_cents(&a))
                    .transpose()
                    .context("Invalid amount format. Use '20.00' or '20'")?,
                paid_by: paid_by
                    .map(|p| service.find_participant(&p).map(|p| p.id))
                    .transpose()?,
                split_among: split
                    .map(|names| resolve_participants(service, &names))
                    .transpose()?,
                category: category.map(|c| Some(c).filter(|c| !c.trim().is_empty())),
            };

            if update.is_empty() {
                bail!("Nothing to update. Pass at least one field to change");
            }

            match service.update_expense(id, &update).await? {
                Some(expense) => println!(
                    "Updated expense: {} {}",
                    expense.description,
                    format_money(expense.amount_cents, symbol)
                ),
                None => println!("No expense with ID {}", id),
            }
        }
    }
    Ok(())
}

fn run_balances_command(service: &LedgerService, symbol: &str) {
    let balances = service.balances();
    if balances.is_empty() {
        println!("No participants yet.");
        return;
    }

    println!(
        "{:<20} {:>12} {:>12} {:>12}",
        "PARTICIPANT", "PAID", "SHARE", "BALANCE"
    );
    println!("{}", "-".repeat(59));
    for entry in &balances {
        println!(
            "{:<20} {:>12} {:>12} {:>12}",
            truncate(&entry.participant.name, 20),
            format_money(entry.total_paid, symbol),
            format_money(entry.total_owed, symbol),
            format_money(entry.balance, symbol)
        );
    }
}

fn run_plan_command(service: &LedgerService, symbol: &str) {
    let plan = service.describe_plan();
    if plan.is_empty() {
        println!("Nothing to settle! Everyone is already even.");
        return;
    }

    println!("Suggested payments:");
    for payment in plan {
        println!(
            "  {} pays {} {}",
            payment.from_name,
            payment.to_name,
            format_money(payment.amount_cents, symbol)
        );
    }
}

async fn run_settle_command(service: &mut LedgerService, yes: bool, symbol: &str) -> Result<()> {
    run_plan_command(service, symbol);
    if service.settlement_plan().is_empty() {
        return Ok(());
    }

    if !yes {
        println!();
        println!("Run 'divvy settle --yes' once these payments have been made.");
        return Ok(());
    }

    if let Some(outcome) = service.settle_up().await {
        println!();
        println!(
            "Settled {} expense(s) with {} payment(s) (settlement {})",
            outcome.settled_expenses,
            outcome.payments.len(),
            outcome.settlement_id
        );
    }
    Ok(())
}

fn run_history_command(
    service: &LedgerService,
    limit: Option<usize>,
    format: &str,
    symbol: &str,
) -> Result<()> {
    let mut entries = service.history();
    if let Some(limit) = limit {
        entries.truncate(limit);
    }

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        "table" => {
            if entries.is_empty() {
                println!("No history yet.");
            }
            for entry in entries {
                let when = entry.date.format("%Y-%m-%d %H:%M");
                if entry.is_settlement {
                    println!("{}  {}", when, entry.description);
                    for payment in &entry.payments {
                        println!(
                            "    {} paid {} {}",
                            payment.from_name,
                            payment.to_name,
                            format_money(payment.amount_cents, symbol)
                        );
                    }
                } else {
                    let marker = if entry.is_settled { " [settled]" } else { "" };
                    println!(
                        "{}  {} {} paid by {}{}",
                        when,
                        entry.description,
                        format_money(entry.amount_cents, symbol),
                        entry.payer_name.as_deref().unwrap_or("-"),
                        marker
                    );
                    if let Some(share) = entry.share_per_person {
                        println!(
                            "    split among {} ({} each)",
                            entry.split_names.join(", "),
                            format_money(share, symbol)
                        );
                    }
                }
            }
        }
        other => bail!("Unknown format '{}'. Use table or json", other),
    }
    Ok(())
}

fn run_export_command(
    service: &LedgerService,
    export_type: &str,
    output: Option<&str>,
) -> Result<()> {
    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path))?,
        )),
        None => Box::new(std::io::stdout()),
    };

    let exporter = Exporter::new(service);
    match export_type {
        "expenses" => {
            let count = exporter.export_expenses_csv(writer)?;
            if output.is_some() {
                println!("Exported {} expense(s)", count);
            }
        }
        "balances" => {
            let count = exporter.export_balances_csv(writer)?;
            if output.is_some() {
                println!("Exported {} balance(s)", count);
            }
        }
        "full" => {
            let export = exporter.export_full_json(writer)?;
            if output.is_some() {
                println!(
                    "Exported {} participant(s) and {} expense(s)",
                    export.snapshot.participants.len(),
                    export.snapshot.expenses.len()
                );
            }
        }
        other => bail!(
            "Unknown export type '{}'. Use expenses, balances or full",
            other
        ),
    }
    Ok(())
}

async fn run_import_command(
    service: &mut LedgerService,
    import_type: &str,
    input: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    if import_type != "full" {
        bail!("Unknown import type '{}'. Only 'full' is supported", import_type);
    }

    let options = ImportOptions { dry_run };
    let result = match input {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("Failed to open {}", path))?;
            import_full_json(service, BufReader::new(file), options).await?
        }
        None => import_full_json(service, std::io::stdin().lock(), options).await?,
    };

    if result.applied {
        println!(
            "Imported {} participant(s) and {} expense(s)",
            result.participants, result.expenses
        );
    } else {
        println!(
            "Valid export: {} participant(s) and {} expense(s) (nothing imported)",
            result.participants, result.expenses
        );
    }
    Ok(())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let cut: String = text.chars().take(width.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
