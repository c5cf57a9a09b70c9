use std::error::Error;

use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use engine::{Engine, FlatRate, Member, RegisterMemberCmd, SavingsCategory, build_schedule};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

#[derive(Parser, Debug)]
#[command(name = "koperasi_admin")]
#[command(about = "Admin utilities for the koperasi ledger (bootstrap members, inspect savings)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./koperasi.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending migrations and exit.
    Migrate,
    Member(MemberArgs),
    Savings(SavingsArgs),
    /// Preview a flat-rate schedule without touching the database.
    Schedule(ScheduleArgs),
}

#[derive(Args, Debug)]
struct MemberArgs {
    #[command(subcommand)]
    command: MemberCommand,
}

#[derive(Subcommand, Debug)]
enum MemberCommand {
    Register(MemberRegisterArgs),
    Verify {
        #[arg(long)]
        id: i64,
    },
    Activate {
        #[arg(long)]
        id: i64,
    },
}

#[derive(Args, Debug)]
struct MemberRegisterArgs {
    #[arg(long)]
    number: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    nik: String,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    phone: Option<String>,
}

#[derive(Args, Debug)]
struct SavingsArgs {
    #[command(subcommand)]
    command: SavingsCommand,
}

#[derive(Subcommand, Debug)]
enum SavingsCommand {
    Balances {
        #[arg(long)]
        member_id: i64,
    },
    /// Rebuild one running balance from the movement log.
    Recompute {
        #[arg(long)]
        member_id: i64,
        #[arg(long, value_enum)]
        category: CategoryArg,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CategoryArg {
    Mandatory,
    Voluntary,
    Special,
}

impl From<CategoryArg> for SavingsCategory {
    fn from(value: CategoryArg) -> Self {
        match value {
            CategoryArg::Mandatory => SavingsCategory::Mandatory,
            CategoryArg::Voluntary => SavingsCategory::Voluntary,
            CategoryArg::Special => SavingsCategory::Special,
        }
    }
}

#[derive(Args, Debug)]
struct ScheduleArgs {
    /// Principal in minor units.
    #[arg(long)]
    principal: i64,
    #[arg(long)]
    term: u32,
    /// Flat rate as a percentage, e.g. `12` or `12.5%`.
    #[arg(long)]
    rate: FlatRate,
    /// Disbursement day (`YYYY-MM-DD`), defaults to today.
    #[arg(long)]
    disbursed_on: Option<NaiveDate>,
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

fn print_member(action: &str, member: &Member) {
    println!(
        "{action} member {} ({}) id={} status={}",
        member.member_number,
        member.name,
        member.id,
        member.status.as_str()
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    if let Command::Schedule(args) = &cli.command {
        let disbursed_on = args
            .disbursed_on
            .unwrap_or_else(|| Utc::now().date_naive());
        let schedule = build_schedule(args.principal, args.term, args.rate, disbursed_on)?;
        for item in &schedule {
            println!(
                "{:>3}  {}  {}",
                item.sequence_number, item.due_date, item.amount_due_minor
            );
        }
        let total: i64 = schedule.iter().map(|i| i.amount_due_minor).sum();
        println!("total {total} at {}", args.rate);
        return Ok(());
    }

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::Migrate => println!("schema up to date"),
        Command::Member(MemberArgs {
            command: MemberCommand::Register(args),
        }) => {
            let mut cmd = RegisterMemberCmd::new(args.number, args.name, args.nik);
            cmd.address = args.address;
            cmd.phone = args.phone;
            let member = engine.register_member(cmd).await?;
            print_member("registered", &member);
        }
        Command::Member(MemberArgs {
            command: MemberCommand::Verify { id },
        }) => {
            let member = engine.verify_member(id).await?;
            print_member("verified", &member);
        }
        Command::Member(MemberArgs {
            command: MemberCommand::Activate { id },
        }) => {
            let member = engine.activate_member(id).await?;
            print_member("activated", &member);
        }
        Command::Savings(SavingsArgs {
            command: SavingsCommand::Balances { member_id },
        }) => {
            let balances = engine.savings_balances(member_id).await?;
            for category in SavingsCategory::ALL {
                println!("{:<10} {}", category.as_str(), balances.get(category));
            }
            println!("{:<10} {}", "total", balances.total_minor());
        }
        Command::Savings(SavingsArgs {
            command: SavingsCommand::Recompute {
                member_id,
                category,
            },
        }) => {
            let category = SavingsCategory::from(category);
            let balance = engine
                .recompute_savings_balance(member_id, category)
                .await?;
            println!("{} balance of member {member_id}: {balance}", category.as_str());
        }
        Command::Schedule(_) => {}
    }

    Ok(())
}
