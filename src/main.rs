mod commands;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use repair_tracker::auth::{AuthGate, Session};
use repair_tracker::bulk::{BulkUpdate, NotesMode, RecordUpdate};
use repair_tracker::config::{load_auth_settings, DataPaths, SECRETS_FILE};
use repair_tracker::query::RepairFilter;
use repair_tracker::store::{Clock, Store, TableKind};

#[derive(Parser)]
#[command(name = "repair-tracker")]
#[command(about = "Fleet maintenance repair tickets kept in flat CSV files")]
#[command(version)]
struct Cli {
    /// Directory holding the CSV files and the Backups folder
    #[arg(long, global = true, env = "REPAIR_TRACKER_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// Secrets file with the [auth] block (default: <data-dir>/secrets.toml)
    #[arg(long, global = true, env = "REPAIR_TRACKER_SECRETS")]
    secrets: Option<PathBuf>,

    /// User to sign in as
    #[arg(long, global = true, env = "REPAIR_TRACKER_USER")]
    user: Option<String>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Default)]
struct FilterArgs {
    /// Status to include (repeatable)
    #[arg(short, long)]
    status: Vec<String>,
    /// Assignee to include (repeatable)
    #[arg(short, long)]
    assigned: Vec<String>,
    /// Priority tier to include (repeatable)
    #[arg(short, long)]
    priority: Vec<String>,
    /// Unit # to include (repeatable)
    #[arg(long)]
    unit: Vec<String>,
    /// YMM to include (repeatable)
    #[arg(long)]
    ymm: Vec<String>,
    /// Search Description, Notes and Alert Type/Issue
    #[arg(short = 'q', long)]
    search: Option<String>,
}

impl FilterArgs {
    fn into_filter(self) -> Result<RepairFilter> {
        commands::list::canonical_filter(RepairFilter {
            statuses: self.status.into_iter().collect(),
            assigned: self.assigned.into_iter().collect(),
            priorities: self.priority.into_iter().collect(),
            units: self.unit.into_iter().collect(),
            ymms: self.ymm.into_iter().collect(),
            text: self.search,
        })
    }
}

/// Field changes shared by `edit`.
#[derive(Args, Default)]
struct UpdateArgs {
    /// New Alert Type/Issue
    #[arg(long = "set-alert")]
    alert: Option<String>,
    /// New description
    #[arg(short, long)]
    description: Option<String>,
    #[arg(long)]
    mileage: Option<i64>,
    /// Scheduled date (MM/DD/YYYY); empty clears it
    #[arg(long)]
    scheduled: Option<String>,
    /// Priority tier (1-4 or label)
    #[arg(short, long)]
    priority: Option<String>,
    #[arg(short, long)]
    assigned: Option<String>,
    /// Open, Scheduled or Completed
    #[arg(short, long)]
    status: Option<String>,
    /// Downtime in days
    #[arg(long)]
    downtime: Option<i64>,
    #[arg(long)]
    cost: Option<f64>,
    /// Replace the notes
    #[arg(short, long)]
    notes: Option<String>,
}

impl UpdateArgs {
    fn into_update(self) -> Result<RecordUpdate> {
        Ok(RecordUpdate {
            alert: self.alert,
            description: self.description,
            mileage: self.mileage,
            scheduled: self.scheduled,
            priority: self.priority.as_deref().map(commands::parse_priority).transpose()?,
            assigned_to: self.assigned,
            status: self.status.as_deref().map(commands::parse_status).transpose()?,
            downtime_days: self.downtime,
            cost: self.cost,
            notes: self.notes,
        })
    }
}

/// Overrides applied to every selected row.
#[derive(Args, Default)]
struct BulkArgs {
    /// Set Status on every selected row
    #[arg(long = "set-status")]
    status: Option<String>,
    /// Set Alert Type/Issue on every selected row
    #[arg(long = "set-alert")]
    alert: Option<String>,
    /// Notes text to add
    #[arg(long)]
    notes: Option<String>,
    /// Replace notes instead of appending
    #[arg(long)]
    replace_notes: bool,
}

impl BulkArgs {
    fn into_bulk(self) -> Result<BulkUpdate> {
        Ok(BulkUpdate {
            status: self.status.as_deref().map(commands::parse_status).transpose()?,
            alert: self.alert,
            notes: self.notes,
            notes_mode: if self.replace_notes {
                NotesMode::Replace
            } else {
                NotesMode::Append
            },
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory with seed tables and a secrets file
    Init {
        /// Rewrite the seed tables even if they exist
        #[arg(long)]
        force: bool,
    },

    /// Print a bcrypt hash for the secrets file
    HashPassword {
        /// Password to hash (prompted if omitted)
        password: Option<String>,
    },

    /// List repairs, filtered
    List {
        #[command(flatten)]
        filter: FilterArgs,
        /// Also print the values each filter can take
        #[arg(long)]
        facets: bool,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Show every alert line of a ticket
    Show {
        /// Ticket ID
        ticket: i64,
    },

    /// Open a new ticket with one row per alert
    Add {
        /// Unit #
        unit: String,
        /// Alert Type/Issue (repeatable)
        #[arg(short = 'l', long = "alert", required = true)]
        alerts: Vec<String>,
        /// What is wrong
        #[arg(short, long)]
        description: String,
        #[arg(short, long, default_value_t = 0)]
        mileage: i64,
        /// Date (MM/DD/YYYY, default today)
        #[arg(long)]
        date: Option<String>,
        /// Scheduled date (MM/DD/YYYY)
        #[arg(long)]
        scheduled: Option<String>,
        /// Priority tier (1-4 or label)
        #[arg(short, long, default_value = "1")]
        priority: String,
        #[arg(short, long)]
        assigned: Option<String>,
        #[arg(short, long, default_value = "Open")]
        status: String,
        /// Downtime in days
        #[arg(long, default_value_t = 0)]
        downtime: i64,
        #[arg(long, default_value_t = 0.0)]
        cost: f64,
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Edit one repair row
    Edit {
        /// Ticket ID
        ticket: Option<i64>,
        /// Current Alert Type/Issue of the row to edit
        #[arg(short = 'k', long)]
        alert_key: Option<String>,
        /// Row id (as shown by `list`) instead of ticket + alert
        #[arg(long, conflicts_with_all = ["ticket", "alert_key"])]
        row: Option<usize>,
        #[command(flatten)]
        update: UpdateArgs,
    },

    /// Apply the same change to many rows
    Bulk {
        /// Row id to include (repeatable)
        #[arg(long = "row")]
        rows: Vec<usize>,
        /// Include every row of this ticket (repeatable)
        #[arg(long = "ticket")]
        tickets: Vec<i64>,
        #[command(flatten)]
        bulk: BulkArgs,
    },

    /// Edit rows through a CSV grid
    Grid {
        #[command(subcommand)]
        action: GridCommands,
    },

    /// Delete repair rows
    Delete {
        /// Row id to delete (repeatable)
        #[arg(long = "row")]
        rows: Vec<usize>,
        /// Delete every row of this ticket (repeatable)
        #[arg(long = "ticket")]
        tickets: Vec<i64>,
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },

    /// Manage trucks
    Truck {
        #[command(subcommand)]
        action: TruckCommands,
    },

    /// Manage alert types
    Alert {
        #[command(subcommand)]
        action: AlertCommands,
    },

    /// Per-unit trend report
    Trend {
        /// Unit # (lists units when omitted)
        unit: Option<String>,
        /// How many top issues to show
        #[arg(long, default_value_t = 10)]
        top: usize,
        /// How many recent entries to show
        #[arg(long, default_value_t = 10)]
        recent: usize,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Export a table as CSV
    Export {
        #[arg(value_enum)]
        table: ExportTable,
        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the signed-in user
    Whoami,
}

#[derive(Subcommand)]
enum GridCommands {
    /// Write the editable grid for the filtered rows
    Export {
        /// Grid CSV to write
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Commit an edited grid
    Commit {
        /// Grid CSV to read
        file: PathBuf,
        /// Apply to rows marked Select (plus --row) instead of changed rows
        #[arg(long)]
        selected: bool,
        /// Extra row id to include with --selected (repeatable)
        #[arg(long = "row")]
        rows: Vec<usize>,
        #[command(flatten)]
        bulk: BulkArgs,
    },
}

#[derive(Subcommand)]
enum TruckCommands {
    /// List trucks
    List,
    /// Add a truck
    Add {
        /// Truck #
        number: String,
        /// YMM (year make model / type)
        ymm: String,
        /// Service type
        #[arg(short, long, default_value = "")]
        service_type: String,
    },
    /// Delete a truck
    Delete {
        /// Truck #
        number: Option<String>,
        /// Row index (as shown by `truck list`)
        #[arg(long, conflicts_with = "number")]
        index: Option<usize>,
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum AlertCommands {
    /// List alert types
    List,
    /// Add an alert type
    Add {
        name: String,
    },
    /// Delete an alert type
    Delete {
        name: Option<String>,
        /// Row index (as shown by `alert list`)
        #[arg(long, conflicts_with = "name")]
        index: Option<usize>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportTable {
    Repairs,
    Trucks,
    Alerts,
}

impl From<ExportTable> for TableKind {
    fn from(t: ExportTable) -> Self {
        match t {
            ExportTable::Repairs => TableKind::Repairs,
            ExportTable::Trucks => TableKind::Trucks,
            ExportTable::Alerts => TableKind::Alerts,
        }
    }
}

fn init_tracing(verbose: bool, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if verbose { "debug" } else { "warn" };
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| format!("repair_tracker={}", level));

    let builder = fmt()
        .with_env_filter(EnvFilter::new(filter_directive))
        .with_writer(io::stderr);
    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}

fn secrets_path(cli_secrets: Option<PathBuf>, data_dir: &Path) -> PathBuf {
    cli_secrets.unwrap_or_else(|| data_dir.join(SECRETS_FILE))
}

fn read_password(prompt: &str) -> Result<String> {
    if let Ok(password) = env::var("REPAIR_TRACKER_PASSWORD") {
        return Ok(password);
    }
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Failed to read password")?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

fn get_session(secrets: &Path, user: Option<&str>) -> Result<Session> {
    let settings = load_auth_settings(secrets)?;
    let user = match user {
        Some(u) => u,
        None => bail!("No user given. Pass --user or set REPAIR_TRACKER_USER."),
    };
    let password = read_password(&format!("Password for {}: ", user))?;
    AuthGate::new(settings)
        .login(user, &password)
        .context("Sign-in failed")
}

fn get_store(data_dir: &Path, secrets: &Path, user: Option<&str>) -> Result<Store> {
    let session = get_session(secrets, user)?;
    let store = Store::open(&session, DataPaths::new(data_dir), Clock::System)?;
    for warning in store.load_warnings() {
        eprintln!("Warning: {}. Using default data.", warning);
    }
    Ok(store)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let data_dir = cli.data_dir;
    let secrets = secrets_path(cli.secrets, &data_dir);
    let user = cli.user.as_deref();

    match cli.command {
        Commands::Init { force } => {
            let account = match user {
                Some(u) if !secrets.exists() => {
                    let password = read_password(&format!("Password for {}: ", u))?;
                    Some((u.to_string(), password))
                }
                _ => None,
            };
            commands::init::run(&data_dir, &secrets, account, Clock::System, force)
        }

        Commands::HashPassword { password } => {
            let password = match password {
                Some(p) => p,
                None => read_password("Password: ")?,
            };
            commands::init::hash_password(&password)
        }

        Commands::List {
            filter,
            facets,
            json,
        } => {
            let store = get_store(&data_dir, &secrets, user)?;
            let filter = filter.into_filter()?;
            if json {
                commands::list::run_json(&store, &filter)
            } else {
                commands::list::run(&store, &filter, facets)
            }
        }

        Commands::Show { ticket } => {
            let store = get_store(&data_dir, &secrets, user)?;
            commands::show::run(&store, ticket)
        }

        Commands::Add {
            unit,
            alerts,
            description,
            mileage,
            date,
            scheduled,
            priority,
            assigned,
            status,
            downtime,
            cost,
            notes,
        } => {
            let mut store = get_store(&data_dir, &secrets, user)?;
            let ticket = commands::add::TicketArgs {
                unit,
                alerts,
                description,
                mileage,
                date,
                scheduled,
                priority,
                assigned,
                status,
                downtime,
                cost,
                notes,
            };
            commands::add::run(&mut store, ticket)
        }

        Commands::Edit {
            ticket,
            alert_key,
            row,
            update,
        } => {
            let mut store = get_store(&data_dir, &secrets, user)?;
            let target = match (row, ticket) {
                (Some(row), _) => commands::edit::Target::Row(row),
                (None, Some(ticket)) => commands::edit::Target::Ticket { ticket, alert_key },
                (None, None) => bail!("Give a ticket id or --row"),
            };
            let update = update.into_update()?;
            commands::edit::run(&mut store, target, &update)
        }

        Commands::Bulk {
            rows,
            tickets,
            bulk,
        } => {
            let mut store = get_store(&data_dir, &secrets, user)?;
            let bulk = bulk.into_bulk()?;
            commands::bulk::run(&mut store, &rows, &tickets, &bulk)
        }

        Commands::Grid { action } => {
            let mut store = get_store(&data_dir, &secrets, user)?;
            match action {
                GridCommands::Export { output, filter } => {
                    commands::grid::export(&store, &filter.into_filter()?, &output)
                }
                GridCommands::Commit {
                    file,
                    selected,
                    rows,
                    bulk,
                } => {
                    let bulk = bulk.into_bulk()?;
                    commands::grid::commit(&mut store, &file, selected, rows, bulk)
                }
            }
        }

        Commands::Delete {
            rows,
            tickets,
            force,
        } => {
            let mut store = get_store(&data_dir, &secrets, user)?;
            commands::delete::run(&mut store, &rows, &tickets, force)
        }

        Commands::Truck { action } => {
            let mut store = get_store(&data_dir, &secrets, user)?;
            match action {
                TruckCommands::List => commands::truck::list(&store),
                TruckCommands::Add {
                    number,
                    ymm,
                    service_type,
                } => commands::truck::add(&mut store, &number, &ymm, &service_type),
                TruckCommands::Delete {
                    number,
                    index,
                    force,
                } => commands::truck::delete(&mut store, number.as_deref(), index, force),
            }
        }

        Commands::Alert { action } => {
            let mut store = get_store(&data_dir, &secrets, user)?;
            match action {
                AlertCommands::List => commands::alert::list(&store),
                AlertCommands::Add { name } => commands::alert::add(&mut store, &name),
                AlertCommands::Delete { name, index } => {
                    commands::alert::delete(&mut store, name.as_deref(), index)
                }
            }
        }

        Commands::Trend {
            unit,
            top,
            recent,
            json,
        } => {
            let store = get_store(&data_dir, &secrets, user)?;
            match unit {
                Some(unit) if json => commands::trend::run_json(&store, &unit, top, recent),
                Some(unit) => commands::trend::run(&store, &unit, top, recent),
                None => commands::trend::list_units(&store),
            }
        }

        Commands::Export { table, output } => {
            let store = get_store(&data_dir, &secrets, user)?;
            commands::export::run(&store, table.into(), output.as_deref())
        }

        Commands::Whoami => {
            let session = get_session(&secrets, user)?;
            commands::whoami::run(&session, &DataPaths::new(&data_dir))
        }
    }
}
