use std::error::Error;

use clap::{Args, Parser, Subcommand, ValueEnum};
use engine::{
    BalanceQuery, BalanceScope, CreateSettlementCmd, DebtMode, Engine, ExpenseCmd, Money,
    Participant, RegisterUserCmd, SettlementListFilter, SplitRule,
};
use migration::{Migrator, MigratorTrait};
use serde::Serialize;

mod settings;

#[derive(Parser, Debug)]
#[command(name = "spartiamo")]
#[command(about = "Shared expenses: balances, debts and settlements")]
struct Cli {
    /// Settings file name, without extension.
    #[arg(long, env = "SPARTIAMO_CONFIG", default_value = "settings")]
    config: String,

    /// Overrides the database from the settings.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending migrations and exit.
    Migrate,
    #[command(subcommand)]
    User(UserCommand),
    #[command(subcommand)]
    Group(GroupCommand),
    /// Record an expense split equally among participants.
    Expense(ExpenseArgs),
    /// Balances and debts of a group.
    Balances(BalancesArgs),
    #[command(subcommand)]
    Settlement(SettlementCommand),
    /// Merge pending participants with this phone into a user.
    Reconcile {
        #[arg(long)]
        phone: String,
        #[arg(long)]
        user: String,
    },
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        display_name: String,
        #[arg(long)]
        phone: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum GroupCommand {
    Create {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        name: String,
    },
    Friendship {
        #[arg(long)]
        user: String,
        #[arg(long)]
        friend: String,
    },
    AddMember {
        #[arg(long)]
        group: String,
        #[arg(long)]
        admin: String,
        #[arg(long)]
        member: String,
    },
    AddPending {
        #[arg(long)]
        group: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
    },
    Roster {
        #[arg(long)]
        group: String,
        #[arg(long)]
        user: String,
    },
}

#[derive(Args, Debug)]
struct ExpenseArgs {
    #[arg(long)]
    group: String,
    #[arg(long)]
    user: String,
    /// Username, or `pending:<id>` for a pending participant.
    #[arg(long, value_parser = parse_participant)]
    payer: Participant,
    #[arg(long, value_parser = parse_money)]
    amount: Money,
    #[arg(long)]
    description: String,
    #[arg(long, value_delimiter = ',', value_parser = parse_participant, required = true)]
    split: Vec<Participant>,
    #[arg(long)]
    category: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Detailed,
    Simplified,
    Minimal,
}

impl From<Mode> for DebtMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Detailed => DebtMode::Detailed,
            Mode::Simplified => DebtMode::Simplified,
            Mode::Minimal => DebtMode::Minimal,
        }
    }
}

#[derive(Args, Debug)]
struct BalancesArgs {
    #[arg(long)]
    group: String,
    #[arg(long)]
    user: String,
    /// Every pair of the group instead of the caller's (admins only).
    #[arg(long)]
    all: bool,
    #[arg(long, value_enum, default_value = "detailed")]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum SettlementCommand {
    /// Record a payment that the recipient has to confirm.
    Create(SettleArgs),
    /// Record a payment you received.
    Received(SettleArgs),
    Confirm(SettlementRef),
    Reject(SettlementRef),
    Delete(SettlementRef),
    List {
        #[arg(long)]
        group: String,
        #[arg(long)]
        user: String,
    },
}

#[derive(Args, Debug)]
struct SettleArgs {
    #[arg(long)]
    group: String,
    #[arg(long)]
    user: String,
    #[arg(long, value_parser = parse_participant)]
    from: Participant,
    #[arg(long, value_parser = parse_participant)]
    to: Participant,
    #[arg(long, value_parser = parse_money)]
    amount: Money,
    #[arg(long)]
    note: Option<String>,
}

impl SettleArgs {
    fn into_cmd(self) -> CreateSettlementCmd {
        let cmd = CreateSettlementCmd::new(self.group, self.user, self.from, self.to, self.amount);
        match self.note {
            Some(note) => cmd.note(note),
            None => cmd,
        }
    }
}

#[derive(Args, Debug)]
struct SettlementRef {
    #[arg(long)]
    group: String,
    #[arg(long)]
    user: String,
    #[arg(long)]
    settlement: String,
}

fn parse_participant(raw: &str) -> Result<Participant, String> {
    match raw.trim().strip_prefix("pending:") {
        Some(id) if !id.is_empty() => Ok(Participant::pending(id)),
        Some(_) => Err("missing pending participant id".to_string()),
        None if raw.trim().is_empty() => Err("empty participant".to_string()),
        None => Ok(Participant::registered(raw.trim())),
    }
}

fn parse_money(raw: &str) -> Result<Money, String> {
    raw.parse::<Money>().map_err(|err| err.to_string())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn connect_db(
    url: &str,
) -> Result<sea_orm::DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = settings::Settings::new(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "spartiamo={level},engine={level},migration={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let url = cli
        .database_url
        .clone()
        .unwrap_or_else(|| settings.database.url());
    tracing::debug!(%url, "connecting to database");
    let db = connect_db(&url).await?;

    let engine = Engine::builder()
        .database(db)
        .default_country_code(settings.engine.default_country_code.clone())
        .build()
        .await?;

    match cli.command {
        Command::Migrate => tracing::info!("database is up to date"),
        Command::User(UserCommand::Register {
            username,
            display_name,
            phone,
        }) => {
            let mut cmd = RegisterUserCmd::new(username, display_name);
            if let Some(phone) = phone {
                cmd = cmd.phone(phone);
            }
            print_json(&engine.register_user(cmd).await?)?;
        }
        Command::Group(command) => run_group(&engine, command).await?,
        Command::Expense(args) => {
            let mut cmd = ExpenseCmd::new(
                args.group,
                args.user,
                args.description,
                args.amount,
                args.payer,
                SplitRule::Equal {
                    participants: args.split,
                },
            );
            if let Some(category) = args.category {
                cmd = cmd.category(category);
            }
            print_json(&engine.create_expense(cmd).await?)?;
        }
        Command::Balances(args) => {
            let scope = if args.all {
                BalanceScope::Group
            } else {
                BalanceScope::Caller
            };
            let query = BalanceQuery::new(args.group, args.user)
                .scope(scope)
                .mode(args.mode.into());
            print_json(&engine.group_balances(query).await?)?;
        }
        Command::Settlement(command) => run_settlement(&engine, command).await?,
        Command::Reconcile { phone, user } => {
            print_json(&engine.reconcile_pending_participant(&phone, &user).await?)?;
        }
    }

    Ok(())
}

async fn run_group(engine: &Engine, command: GroupCommand) -> Result<(), Box<dyn Error + Send + Sync>> {
    match command {
        GroupCommand::Create { owner, name } => {
            print_json(&engine.create_group(&name, &owner).await?)?;
        }
        GroupCommand::Friendship { user, friend } => {
            print_json(&engine.create_friendship(&user, &friend).await?)?;
        }
        GroupCommand::AddMember {
            group,
            admin,
            member,
        } => {
            engine.add_group_member(&group, &admin, &member).await?;
            println!("added {member} to {group}");
        }
        GroupCommand::AddPending {
            group,
            user,
            name,
            phone,
        } => {
            print_json(
                &engine
                    .add_pending_participant(&group, &user, &name, &phone)
                    .await?,
            )?;
        }
        GroupCommand::Roster { group, user } => {
            print_json(&engine.group_roster(&group, &user).await?)?;
        }
    }
    Ok(())
}

async fn run_settlement(
    engine: &Engine,
    command: SettlementCommand,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    match command {
        SettlementCommand::Create(args) => {
            print_json(&engine.create_settlement(args.into_cmd()).await?)?;
        }
        SettlementCommand::Received(args) => {
            print_json(&engine.record_received_payment(args.into_cmd()).await?)?;
        }
        SettlementCommand::Confirm(r) => {
            print_json(
                &engine
                    .confirm_settlement(&r.group, &r.settlement, &r.user)
                    .await?,
            )?;
        }
        SettlementCommand::Reject(r) => {
            engine
                .reject_settlement(&r.group, &r.settlement, &r.user)
                .await?;
            println!("rejected {}", r.settlement);
        }
        SettlementCommand::Delete(r) => {
            engine
                .delete_settlement(&r.group, &r.settlement, &r.user)
                .await?;
            println!("deleted {}", r.settlement);
        }
        SettlementCommand::List { group, user } => {
            print_json(
                &engine
                    .list_settlements(&group, &user, SettlementListFilter::default())
                    .await?,
            )?;
        }
    }
    Ok(())
}
