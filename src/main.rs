use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use env_logger::Env;
use log::{error, info};
use rust_decimal::Decimal;
use std::process;

use bank_ledger::cli;
use bank_ledger::config;
use bank_ledger::currency::CurrencyApi;
use bank_ledger::database::Database;
use bank_ledger::ledger::Ledger;

/// Bank Ledger CLI - a multi-currency personal banking ledger
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Sets the configuration file
    #[clap(short, long, value_name = "FILE", default_value = "config.toml")]
    config: String,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database file and schema
    Init {},

    /// Load seed data from CSV files
    Load {
        #[clap(subcommand)]
        command: LoadCommands,
    },

    /// Transfer money between two accounts
    Transfer {
        /// Sender account number
        #[clap(long)]
        from: String,

        /// Receiver account number
        #[clap(long)]
        to: String,

        /// Amount in the sender's currency
        #[clap(short, long)]
        amount: Decimal,

        /// Transfer timestamp (YYYY-MM-DD HH:MM:SS); defaults to now
        #[clap(long)]
        time: Option<String>,
    },

    /// User management commands
    User {
        #[clap(subcommand)]
        command: UserCommands,
    },

    /// Bank management commands
    Bank {
        #[clap(subcommand)]
        command: BankCommands,
    },

    /// Account management commands
    Account {
        #[clap(subcommand)]
        command: AccountCommands,
    },

    /// Reporting commands
    Report {
        #[clap(subcommand)]
        command: ReportCommands,
    },

    /// Remove every row of a table
    Clear {
        /// Table name (users, banks, accounts or transactions)
        table: String,
    },
}

#[derive(Subcommand)]
enum LoadCommands {
    /// Load users from a CSV file with full_name, birth_day and accounts columns
    Users {
        /// Input CSV file
        file: String,
    },

    /// Load banks from a CSV file with a name column
    Banks {
        /// Input CSV file
        file: String,
    },

    /// Load accounts from a CSV file
    Accounts {
        /// Input CSV file
        file: String,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Update user fields
    Update {
        /// User ID
        #[clap(long)]
        id: i64,

        /// New first name
        #[clap(long)]
        name: Option<String>,

        /// New last name
        #[clap(long)]
        surname: Option<String>,

        /// New birth date (YYYY-MM-DD)
        #[clap(long)]
        birth_day: Option<String>,

        /// New comma-separated account numbers
        #[clap(long)]
        accounts: Option<String>,
    },

    /// Delete a user
    Delete {
        /// User ID
        #[clap(long)]
        id: i64,
    },
}

#[derive(Subcommand)]
enum BankCommands {
    /// Add a single bank
    Add {
        /// Bank name
        #[clap(long)]
        name: String,
    },

    /// Rename a bank
    Update {
        /// Bank ID
        #[clap(long)]
        id: i64,

        /// New name
        #[clap(long)]
        name: String,
    },

    /// Delete a bank
    Delete {
        /// Bank ID
        #[clap(long)]
        id: i64,
    },
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Update account fields
    Update {
        /// Account ID
        #[clap(long)]
        id: i64,

        /// New account number
        #[clap(long)]
        number: Option<String>,

        /// New account type (credit or debit)
        #[clap(long)]
        r#type: Option<String>,

        /// New status (gold, silver or platinum)
        #[clap(long)]
        status: Option<String>,

        /// New currency code
        #[clap(long)]
        currency: Option<String>,

        /// New balance
        #[clap(long)]
        amount: Option<Decimal>,
    },

    /// Delete an account
    Delete {
        /// Account ID
        #[clap(long)]
        id: i64,
    },
}

#[derive(Subcommand)]
enum ReportCommands {
    /// List users owning an account with a negative balance
    Debts {},

    /// Show the bank with the largest total balance
    BiggestBank {},

    /// Show the banks serving the oldest client
    OldestClientBanks {},

    /// Show the bank whose clients sent from the most distinct accounts
    MostActiveBank {},

    /// List transfers sent by a user
    UserTransactions {
        /// User ID
        #[clap(long)]
        user_id: i64,

        /// Only include transfers from the trailing number of days
        #[clap(long)]
        days: Option<i64>,
    },

    /// Assign random credit discounts to users
    Discounts {
        /// Number of users to pick
        #[clap(long, default_value = "1")]
        count: usize,
    },

    /// Delete users with missing fields
    PruneEmptyUsers {},
}

fn run(cli: Cli) -> Result<()> {
    let config = config::load_config(&cli.config)?;
    info!("Starting {}", config.app_name);

    let db = Database::new(&config.database.path);
    db.initialize()?;

    let rates = CurrencyApi::new(&config.currency)?;
    let ledger = Ledger::new(db, Box::new(rates));

    match &cli.command {
        Commands::Init {} => {
            println!("Database initialized at {}", config.database.path);
        }
        Commands::Load { command } => match command {
            LoadCommands::Users { file } => cli::load_users(&ledger, file)?,
            LoadCommands::Banks { file } => cli::load_banks(&ledger, file)?,
            LoadCommands::Accounts { file } => cli::load_accounts(&ledger, file)?,
        },
        Commands::Transfer {
            from,
            to,
            amount,
            time,
        } => cli::transfer(&ledger, from, to, *amount, time.as_deref())?,
        Commands::User { command } => match command {
            UserCommands::Update {
                id,
                name,
                surname,
                birth_day,
                accounts,
            } => cli::update_user(
                &ledger,
                *id,
                name.as_deref(),
                surname.as_deref(),
                birth_day.as_deref(),
                accounts.as_deref(),
            )?,
            UserCommands::Delete { id } => {
                ledger.delete_user(*id)?;
                println!("User {} deleted", id);
            }
        },
        Commands::Bank { command } => match command {
            BankCommands::Add { name } => {
                use bank_ledger::database::models::BankSeed;
                ledger.add_banks(vec![BankSeed { name: name.clone() }])?;
                println!("Bank {} added", name);
            }
            BankCommands::Update { id, name } => cli::update_bank(&ledger, *id, name)?,
            BankCommands::Delete { id } => {
                ledger.delete_bank(*id)?;
                println!("Bank {} deleted", id);
            }
        },
        Commands::Account { command } => match command {
            AccountCommands::Update {
                id,
                number,
                r#type,
                status,
                currency,
                amount,
            } => cli::update_account(
                &ledger,
                *id,
                number.as_deref(),
                r#type.as_deref(),
                status.as_deref(),
                currency.as_deref(),
                *amount,
            )?,
            AccountCommands::Delete { id } => {
                ledger.delete_account(*id)?;
                println!("Account {} deleted", id);
            }
        },
        Commands::Report { command } => match command {
            ReportCommands::Debts {} => cli::show_debts(&ledger)?,
            ReportCommands::BiggestBank {} => cli::show_biggest_bank(&ledger)?,
            ReportCommands::OldestClientBanks {} => cli::show_oldest_client_banks(&ledger)?,
            ReportCommands::MostActiveBank {} => cli::show_most_active_bank(&ledger)?,
            ReportCommands::UserTransactions { user_id, days } => {
                cli::show_user_transactions(&ledger, *user_id, *days)?
            }
            ReportCommands::Discounts { count } => cli::show_discounts(&ledger, *count)?,
            ReportCommands::PruneEmptyUsers {} => cli::prune_empty_users(&ledger)?,
        },
        Commands::Clear { table } => {
            ledger.clear_table(table)?;
            println!("Table {} cleared", table);
        }
    }

    Ok(())
}

fn main() {
    dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        error!("{:#}", err);
        process::exit(1);
    }
}
