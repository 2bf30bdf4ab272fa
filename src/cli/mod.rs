//! CLI argument definitions for `bk`.

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("BK_GIT_COMMIT"),
    ", built ",
    env!("BK_BUILD_TIMESTAMP"),
    ")"
);

/// bk - Track brokerage listings, clients and deals.
///
/// Start with `bk system init`, then add properties and clients.
#[derive(Parser, Debug)]
#[command(name = "bk")]
#[command(author, version, long_version = LONG_VERSION, about = "Track real-estate listings, clients and transactions", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Directory holding the brokerage records.
    /// Can also be set via BK_DATA_DIR environment variable.
    #[arg(long = "data-dir", global = true, env = "BK_DATA_DIR")]
    pub data_dir: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Data directory administration
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },

    /// Property listing commands
    Property {
        #[command(subcommand)]
        command: PropertyCommands,
    },

    /// Client relationship commands
    Client {
        #[command(subcommand)]
        command: ClientCommands,
    },

    /// Transaction commands (lifecycle, milestones, commission)
    Transaction {
        #[command(subcommand)]
        command: TransactionCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

impl Commands {
    /// Name recorded in the action log, e.g. "property create".
    pub fn name(&self) -> String {
        match self {
            Commands::System { command } => format!("system {}", command.name()),
            Commands::Property { command } => format!("property {}", command.name()),
            Commands::Client { command } => format!("client {}", command.name()),
            Commands::Transaction { command } => format!("transaction {}", command.name()),
            Commands::Config { command } => format!("config {}", command.name()),
        }
    }

    /// Arguments as JSON for the action log.
    pub fn args(&self) -> Value {
        let value = match self {
            Commands::System { command } => serde_json::to_value(command),
            Commands::Property { command } => serde_json::to_value(command),
            Commands::Client { command } => serde_json::to_value(command),
            Commands::Transaction { command } => serde_json::to_value(command),
            Commands::Config { command } => serde_json::to_value(command),
        };
        value.unwrap_or(Value::Null)
    }
}

#[derive(Subcommand, Debug, Serialize)]
#[serde(untagged)]
pub enum SystemCommands {
    /// Create the data directory and empty record files
    Init,
}

impl SystemCommands {
    pub fn name(&self) -> &'static str {
        match self {
            SystemCommands::Init => "init",
        }
    }
}

/// Address and physical details shared by create and update.
#[derive(Args, Debug, Default, Serialize)]
pub struct PropertyFields {
    /// Longer description
    #[arg(short, long)]
    pub description: Option<String>,

    /// Property type (house, apartment, condo, townhouse, commercial, land)
    #[arg(short = 't', long = "type")]
    pub property_type: Option<String>,

    #[arg(long)]
    pub street: Option<String>,

    #[arg(long)]
    pub city: Option<String>,

    #[arg(long)]
    pub state: Option<String>,

    #[arg(long)]
    pub zip: Option<String>,

    #[arg(long)]
    pub bedrooms: Option<u32>,

    #[arg(long)]
    pub bathrooms: Option<f64>,

    #[arg(long)]
    pub square_feet: Option<f64>,

    #[arg(long)]
    pub year_built: Option<u32>,

    /// Feature (repeatable)
    #[arg(long = "feature")]
    pub features: Vec<String>,

    /// Photo reference (repeatable)
    #[arg(long = "photo")]
    pub photos: Vec<String>,
}

/// Listing filters shared by `list` and `stats`.
#[derive(Args, Debug, Default, Serialize)]
pub struct PropertyFilterArgs {
    /// Filter by status (repeatable, matches any)
    #[arg(long)]
    pub status: Vec<String>,

    /// Filter by type (repeatable, matches any)
    #[arg(long = "type")]
    pub property_type: Vec<String>,

    #[arg(long)]
    pub min_price: Option<f64>,

    #[arg(long)]
    pub max_price: Option<f64>,

    /// City contains this text
    #[arg(long)]
    pub city: Option<String>,

    /// State contains this text
    #[arg(long)]
    pub state: Option<String>,

    #[arg(long)]
    pub min_bedrooms: Option<u32>,

    #[arg(long)]
    pub min_bathrooms: Option<f64>,

    /// Listing agent
    #[arg(long)]
    pub agent: Option<String>,

    /// Free-text search over title, description, address and features
    #[arg(short, long)]
    pub search: Option<String>,
}

/// Page selection for list commands.
#[derive(Args, Debug, Serialize)]
pub struct PageArgs {
    /// Page number, starting at 1
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Items per page (defaults to the page-size config)
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Subcommand, Debug, Serialize)]
#[serde(untagged)]
pub enum PropertyCommands {
    /// Create a new listing
    Create {
        /// Listing title
        title: String,

        /// Asking price
        #[arg(short, long)]
        price: f64,

        /// Listing agent
        #[arg(short, long)]
        agent: String,

        /// Initial status (defaults to active)
        #[arg(long)]
        status: Option<String>,

        #[command(flatten)]
        fields: PropertyFields,
    },

    /// List listings, newest first
    List {
        #[command(flatten)]
        filter: PropertyFilterArgs,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Show a listing
    Show {
        /// Property ID (e.g., prop-1a2b3c4d)
        id: String,
    },

    /// Update listing fields. Unset flags leave fields untouched.
    Update {
        /// Property ID
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(short, long)]
        price: Option<f64>,

        #[arg(short, long)]
        agent: Option<String>,

        #[command(flatten)]
        fields: PropertyFields,
    },

    /// Change listing status (active, pending, sold, rented, off-market)
    Status {
        /// Property ID
        id: String,

        /// New status
        status: String,
    },

    /// Delete a listing
    Delete {
        /// Property ID
        id: String,
    },

    /// Listing statistics
    Stats {
        #[command(flatten)]
        filter: PropertyFilterArgs,
    },
}

impl PropertyCommands {
    pub fn name(&self) -> &'static str {
        match self {
            PropertyCommands::Create { .. } => "create",
            PropertyCommands::List { .. } => "list",
            PropertyCommands::Show { .. } => "show",
            PropertyCommands::Update { .. } => "update",
            PropertyCommands::Status { .. } => "status",
            PropertyCommands::Delete { .. } => "delete",
            PropertyCommands::Stats { .. } => "stats",
        }
    }
}

/// Contact and preference fields shared by client create and update.
#[derive(Args, Debug, Default, Serialize)]
pub struct ClientFields {
    #[arg(long)]
    pub phone: Option<String>,

    /// Client type (buyer, seller, renter, landlord)
    #[arg(short = 't', long = "type")]
    pub client_type: Option<String>,

    /// Acquisition source (referral, website, social-media, advertising, walk-in, cold-call, other)
    #[arg(long)]
    pub source: Option<String>,

    #[arg(long)]
    pub budget_min: Option<f64>,

    #[arg(long)]
    pub budget_max: Option<f64>,

    /// Buyer is pre-approved for financing
    #[arg(long)]
    pub pre_approved: bool,

    /// Timeline (immediate, 1-3-months, 3-6-months, 6-12-months, flexible)
    #[arg(long)]
    pub timeline: Option<String>,

    /// Tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Responsible agent
    #[arg(short, long)]
    pub agent: Option<String>,
}

/// Client filters shared by `list` and `stats`.
#[derive(Args, Debug, Default, Serialize)]
pub struct ClientFilterArgs {
    /// Filter by status (repeatable, matches any)
    #[arg(long)]
    pub status: Vec<String>,

    /// Filter by type (repeatable, matches any)
    #[arg(long = "type")]
    pub client_type: Vec<String>,

    /// Filter by source (repeatable, matches any)
    #[arg(long)]
    pub source: Vec<String>,

    /// Budget floor at least this much
    #[arg(long)]
    pub min_budget: Option<f64>,

    /// Budget ceiling at most this much
    #[arg(long)]
    pub max_budget: Option<f64>,

    /// Tag (repeatable, matches any)
    #[arg(long)]
    pub tag: Vec<String>,

    #[arg(long)]
    pub agent: Option<String>,

    /// Follow-up due on or before this date (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    pub follow_up_before: Option<String>,

    /// Free-text search over name, email, phone and tags
    #[arg(short, long)]
    pub search: Option<String>,
}

#[derive(Subcommand, Debug, Serialize)]
#[serde(untagged)]
pub enum ClientCommands {
    /// Create a new client
    Create {
        first_name: String,

        last_name: String,

        #[arg(short, long)]
        email: String,

        /// Next follow-up (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        follow_up: Option<String>,

        #[command(flatten)]
        fields: ClientFields,
    },

    /// List clients, newest first
    List {
        #[command(flatten)]
        filter: ClientFilterArgs,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Show a client
    Show {
        /// Client ID (e.g., cli-1a2b3c4d)
        id: String,
    },

    /// Update client fields. Unset flags leave fields untouched.
    Update {
        /// Client ID
        id: String,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(short, long)]
        email: Option<String>,

        #[command(flatten)]
        fields: ClientFields,
    },

    /// Change client status (active, inactive, closed)
    Status {
        /// Client ID
        id: String,

        /// New status
        status: String,
    },

    /// Delete a client
    Delete {
        /// Client ID
        id: String,
    },

    /// Append a note to a client
    Note {
        /// Client ID
        id: String,

        /// Note text
        content: String,

        /// Note type (general, call, email, meeting, showing, follow-up)
        #[arg(short = 't', long = "type", default_value = "general")]
        note_type: String,

        /// Author of the note
        #[arg(long, env = "USER", default_value = "unknown")]
        author: String,
    },

    /// Schedule or clear the next follow-up
    FollowUp {
        /// Client ID
        id: String,

        /// When to follow up (YYYY-MM-DD or RFC 3339)
        #[arg(long, conflicts_with = "clear", required_unless_present = "clear")]
        at: Option<String>,

        /// Remove the scheduled follow-up
        #[arg(long)]
        clear: bool,
    },

    /// Manage the properties a client is interested in
    Interest {
        #[command(subcommand)]
        command: InterestCommands,
    },

    /// Client statistics
    Stats {
        #[command(flatten)]
        filter: ClientFilterArgs,
    },
}

impl ClientCommands {
    pub fn name(&self) -> &'static str {
        match self {
            ClientCommands::Create { .. } => "create",
            ClientCommands::List { .. } => "list",
            ClientCommands::Show { .. } => "show",
            ClientCommands::Update { .. } => "update",
            ClientCommands::Status { .. } => "status",
            ClientCommands::Delete { .. } => "delete",
            ClientCommands::Note { .. } => "note",
            ClientCommands::FollowUp { .. } => "follow-up",
            ClientCommands::Interest { command } => match command {
                InterestCommands::Add { .. } => "interest add",
                InterestCommands::Remove { .. } => "interest remove",
            },
            ClientCommands::Stats { .. } => "stats",
        }
    }
}

#[derive(Subcommand, Debug, Serialize)]
#[serde(untagged)]
pub enum InterestCommands {
    /// Record interest in a property
    Add {
        /// Client ID
        id: String,

        /// Property ID
        property_id: String,
    },

    /// Drop interest in a property
    Remove {
        /// Client ID
        id: String,

        /// Property ID
        property_id: String,
    },
}

/// Transaction filters shared by `list` and `stats`.
#[derive(Args, Debug, Default, Serialize)]
pub struct TransactionFilterArgs {
    /// Filter by status (repeatable, matches any)
    #[arg(long)]
    pub status: Vec<String>,

    /// Filter by type (repeatable, matches any)
    #[arg(long = "type")]
    pub transaction_type: Vec<String>,

    #[arg(long)]
    pub agent: Option<String>,

    #[arg(long)]
    pub client: Option<String>,

    #[arg(long)]
    pub property: Option<String>,

    #[arg(long)]
    pub min_price: Option<f64>,

    #[arg(long)]
    pub max_price: Option<f64>,

    /// Free-text search over transaction, property, client and agent IDs
    #[arg(short, long)]
    pub search: Option<String>,
}

#[derive(Subcommand, Debug, Serialize)]
#[serde(untagged)]
pub enum TransactionCommands {
    /// Open a transaction (starts pending)
    Create {
        /// Property ID
        #[arg(long)]
        property: String,

        /// Client ID
        #[arg(long)]
        client: String,

        /// Agent handling the deal
        #[arg(short, long)]
        agent: String,

        /// Sale or rent price
        #[arg(long)]
        sale_price: f64,

        /// Transaction type (purchase, sale, lease, rental)
        #[arg(short = 't', long = "type")]
        transaction_type: Option<String>,

        #[arg(long)]
        list_price: Option<f64>,

        /// Commission percent (defaults to the default-commission-rate config)
        #[arg(long)]
        commission_rate: Option<f64>,

        /// Explicit commission amount instead of the derived one
        #[arg(long)]
        commission_amount: Option<f64>,

        /// Contract date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        contract_date: Option<String>,

        /// Closing date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        closing_date: Option<String>,
    },

    /// List transactions, newest first
    List {
        #[command(flatten)]
        filter: TransactionFilterArgs,
    },

    /// Show a transaction with milestone progress
    Show {
        /// Transaction ID (e.g., txn-1a2b3c4d)
        id: String,
    },

    /// Move a transaction to a new status
    Status {
        /// Transaction ID
        id: String,

        /// New status (e.g., under-contract, inspection, closing, closed, cancelled)
        status: String,
    },

    /// Milestone management
    Milestone {
        #[command(subcommand)]
        command: MilestoneCommands,
    },

    /// Append a note to a transaction
    Note {
        /// Transaction ID
        id: String,

        /// Note text
        content: String,

        /// Note type (general, call, email, meeting, showing, follow-up)
        #[arg(short = 't', long = "type", default_value = "general")]
        note_type: String,

        /// Author of the note
        #[arg(long, env = "USER", default_value = "unknown")]
        author: String,
    },

    /// Change price or commission terms
    Financials {
        /// Transaction ID
        id: String,

        #[arg(long)]
        sale_price: Option<f64>,

        #[arg(long)]
        list_price: Option<f64>,

        #[arg(long)]
        commission_rate: Option<f64>,

        /// Explicit commission amount instead of the derived one
        #[arg(long)]
        commission_amount: Option<f64>,
    },

    /// Mark the commission as paid
    CommissionPaid {
        /// Transaction ID
        id: String,
    },

    /// Performance summary for an agent
    Analytics {
        #[arg(short, long)]
        agent: String,

        /// Only transactions created on or after this date
        #[arg(long)]
        from: Option<String>,

        /// Only transactions created on or before this date
        #[arg(long)]
        to: Option<String>,
    },

    /// Milestones and closings coming due for an agent
    Deadlines {
        #[arg(short, long)]
        agent: String,

        /// Horizon in days (defaults to the deadline-days config)
        #[arg(long)]
        days: Option<i64>,
    },

    /// Transaction statistics
    Stats {
        #[command(flatten)]
        filter: TransactionFilterArgs,
    },
}

impl TransactionCommands {
    pub fn name(&self) -> &'static str {
        match self {
            TransactionCommands::Create { .. } => "create",
            TransactionCommands::List { .. } => "list",
            TransactionCommands::Show { .. } => "show",
            TransactionCommands::Status { .. } => "status",
            TransactionCommands::Milestone { command } => match command {
                MilestoneCommands::Add { .. } => "milestone add",
                MilestoneCommands::Complete { .. } => "milestone complete",
            },
            TransactionCommands::Note { .. } => "note",
            TransactionCommands::Financials { .. } => "financials",
            TransactionCommands::CommissionPaid { .. } => "commission-paid",
            TransactionCommands::Analytics { .. } => "analytics",
            TransactionCommands::Deadlines { .. } => "deadlines",
            TransactionCommands::Stats { .. } => "stats",
        }
    }
}

#[derive(Subcommand, Debug, Serialize)]
#[serde(untagged)]
pub enum MilestoneCommands {
    /// Add a milestone to a transaction
    Add {
        /// Transaction ID
        id: String,

        /// Milestone name
        name: String,

        /// Due date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        due: String,

        /// Responsible party
        #[arg(long, default_value = "")]
        responsible: String,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// Mark a milestone completed
    Complete {
        /// Transaction ID
        id: String,

        /// Milestone ID
        milestone_id: String,
    },
}

#[derive(Subcommand, Debug, Serialize)]
#[serde(untagged)]
pub enum ConfigCommands {
    /// Show every setting with its effective value and source
    Show,

    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,

        /// Configuration value
        value: String,

        /// Write the user-wide config instead of the data directory's
        #[arg(long)]
        system: bool,
    },
}

impl ConfigCommands {
    pub fn name(&self) -> &'static str {
        match self {
            ConfigCommands::Show => "show",
            ConfigCommands::Get { .. } => "get",
            ConfigCommands::Set { .. } => "set",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_property_create() {
        let cli = Cli::try_parse_from([
            "bk", "property", "create", "Loft", "--price", "450000", "--agent", "agent-1",
            "--city", "Austin", "--feature", "pool", "--feature", "garage",
        ])
        .unwrap();
        assert_eq!(cli.command.name(), "property create");
        match cli.command {
            Commands::Property {
                command:
                    PropertyCommands::Create {
                        title,
                        price,
                        fields,
                        ..
                    },
            } => {
                assert_eq!(title, "Loft");
                assert_eq!(price, 450000.0);
                assert_eq!(fields.city.as_deref(), Some("Austin"));
                assert_eq!(fields.features, vec!["pool", "garage"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_nested_command_names() {
        let cli = Cli::try_parse_from([
            "bk", "transaction", "milestone", "complete", "txn-1", "m-1",
        ])
        .unwrap();
        assert_eq!(cli.command.name(), "transaction milestone complete");

        let cli =
            Cli::try_parse_from(["bk", "client", "interest", "add", "cli-1", "prop-1"]).unwrap();
        assert_eq!(cli.command.name(), "client interest add");
    }

    #[test]
    fn test_follow_up_requires_date_or_clear() {
        assert!(Cli::try_parse_from(["bk", "client", "follow-up", "cli-1"]).is_err());
        assert!(
            Cli::try_parse_from(["bk", "client", "follow-up", "cli-1", "--at", "2026-04-01", "--clear"])
                .is_err()
        );
        assert!(Cli::try_parse_from(["bk", "client", "follow-up", "cli-1", "--clear"]).is_ok());
    }

    #[test]
    fn test_args_serialize_for_action_log() {
        let cli = Cli::try_parse_from([
            "bk", "client", "create", "Ana", "Lima", "--email", "ana@example.com",
        ])
        .unwrap();
        let args = cli.command.args();
        assert_eq!(args["first_name"], "Ana");
        assert_eq!(args["email"], "ana@example.com");
        assert_eq!(args["fields"]["tags"], serde_json::json!([]));
    }
}
