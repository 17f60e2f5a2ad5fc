//! Critic administration CLI.
//!
//! Provides the `critic` binary for seeding a review database and running
//! the read and membership operations against it without a server. The
//! commands go through the same `AppState` components as the HTTP handlers,
//! so output and errors match the API.

use std::fmt;
use std::process;

use clap::{Parser, Subcommand};

use critic_core::{AccountId, ChangeState};
use critic_server::caller::identify;
use critic_server::config::{ConfigError, ServerConfig};
use critic_server::error::ApiError;
use critic_server::schema::changes::ChangeQuery;
use critic_server::state::AppState;
use critic_storage::{NewAccount, NewGroup, StorageError};

/// Critic review database tools.
#[derive(Parser)]
#[command(name = "critic", about = "Critic review database tools")]
struct Cli {
    /// Path to the review database file.
    #[arg(short, long, global = true, default_value = "critic.db")]
    db: String,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Create a local account.
    CreateAccount {
        username: String,

        /// Full name.
        #[arg(long)]
        name: Option<String>,

        /// Preferred email address.
        #[arg(long)]
        email: Option<String>,

        /// Create the account inactive.
        #[arg(long)]
        inactive: bool,
    },

    /// Create an internal group.
    CreateGroup {
        name: String,

        /// Name of the owning group (default: the group owns itself).
        #[arg(long)]
        owner: Option<String>,

        /// Username of an initial member. May be repeated.
        #[arg(short, long = "member")]
        members: Vec<String>,

        /// Make the group visible to every user.
        #[arg(long)]
        visible: bool,
    },

    /// Store a change from a JSON file, recording a new meta snapshot if it
    /// already exists.
    ImportChange { file: String },

    /// Print a change as the API would render it.
    GetChange {
        id: String,

        /// Output option name. May be repeated.
        #[arg(short = 'o')]
        options: Vec<String>,

        /// Output options as a hex bitmask.
        #[arg(short = 'O')]
        hex: Option<String>,

        /// Meta snapshot to render instead of the current one.
        #[arg(long)]
        meta: Option<String>,
    },

    /// Add members to a group on behalf of an account.
    AddMembers {
        group: String,

        /// Account id of the acting user.
        #[arg(long = "as")]
        caller: u32,

        /// Account tokens to add.
        #[arg(required = true)]
        members: Vec<String>,
    },
}

/// Why a command failed. Exit codes: 1 = rejected request, 3 = I/O or
/// storage error.
enum Failure {
    Request(ApiError),
    Io(String),
}

impl Failure {
    fn exit_code(&self) -> i32 {
        match self {
            Failure::Request(_) => 1,
            Failure::Io(_) => 3,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Request(err) => write!(f, "{} ({})", err, err.code()),
            Failure::Io(msg) => f.write_str(msg),
        }
    }
}

impl From<ApiError> for Failure {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::InternalError(msg) => Failure::Io(msg),
            other => Failure::Request(other),
        }
    }
}

impl From<StorageError> for Failure {
    fn from(err: StorageError) -> Self {
        ApiError::from(err).into()
    }
}

impl From<ConfigError> for Failure {
    fn from(err: ConfigError) -> Self {
        Failure::Io(err.to_string())
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(output) => println!("{output:#}"),
        Err(failure) => {
            eprintln!("Error: {failure}");
            process::exit(failure.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<serde_json::Value, Failure> {
    let config = ServerConfig {
        db_path: cli.db,
        ..ServerConfig::from_env()?
    };
    let state = AppState::new(config)?;

    match cli.command {
        Commands::CreateAccount {
            username,
            name,
            email,
            inactive,
        } => {
            if !critic_core::is_valid_username(&username) {
                return Err(Failure::Request(ApiError::BadRequest(format!(
                    "invalid username '{username}'"
                ))));
            }
            let account = state.accounts.create_account(&NewAccount {
                username: Some(username),
                full_name: name,
                preferred_email: email,
                active: !inactive,
                registered_on: 0,
            })?;
            Ok(to_json(&account))
        }
        Commands::CreateGroup {
            name,
            owner,
            members,
            visible,
        } => create_group(&state, name, owner, members, visible),
        Commands::ImportChange { file } => import_change(&state, &file),
        Commands::GetChange {
            id,
            options,
            hex,
            meta,
        } => {
            let mut pairs: Vec<(String, String)> =
                options.into_iter().map(|o| ("o".to_string(), o)).collect();
            pairs.extend(hex.map(|h| ("O".to_string(), h)));
            pairs.extend(meta.map(|m| ("meta".to_string(), m)));
            let query = ChangeQuery::from_pairs(&pairs)?;
            get_change(&state, &id, query)
        }
        Commands::AddMembers {
            group,
            caller,
            members,
        } => {
            let caller = identify(AccountId(caller), state.accounts.as_ref())?;
            let resource = state.groups_collection().parse(&caller, &group)?;
            let added = state
                .membership_editor()
                .add_members(&caller, &resource, &members)
                .await?;
            Ok(to_json(&added))
        }
    }
}

fn create_group(
    state: &AppState,
    name: String,
    owner: Option<String>,
    members: Vec<String>,
    visible: bool,
) -> Result<serde_json::Value, Failure> {
    let owner_group_uuid = match owner {
        Some(owner) => Some(
            state
                .groups
                .find_group_by_name(&owner)?
                .ok_or_else(|| ApiError::NotFound(format!("Group Not Found: {owner}")))?
                .uuid,
        ),
        None => None,
    };
    let members = members
        .iter()
        .map(|username| {
            state
                .accounts
                .find_by_username(username)?
                .map(|a| a.id)
                .ok_or_else(|| Failure::Request(ApiError::UnprocessableEntity(format!(
                    "Account '{username}' not found"
                ))))
        })
        .collect::<Result<_, Failure>>()?;

    let group = state.groups.create_group(&NewGroup {
        name,
        description: None,
        owner_group_uuid,
        members,
        visible_to_all: visible,
        created_on: 0,
    })?;
    Ok(to_json(&group))
}

fn import_change(state: &AppState, file: &str) -> Result<serde_json::Value, Failure> {
    let raw = std::fs::read_to_string(file)
        .map_err(|e| Failure::Io(format!("failed to read '{file}': {e}")))?;
    let change: ChangeState = serde_json::from_str(&raw)
        .map_err(|e| Failure::Request(ApiError::BadRequest(format!("invalid change: {e}"))))?;

    let meta = match state.changes.get_change(change.id, None) {
        Ok(_) => state.changes.update_change(&change)?,
        Err(StorageError::ChangeNotFound(_)) => state.changes.insert_change(&change)?,
        Err(err) => return Err(err.into()),
    };
    Ok(serde_json::json!({
        "_number": change.id,
        "meta_rev_id": meta.to_hex(),
    }))
}

fn get_change(state: &AppState, id: &str, query: ChangeQuery) -> Result<serde_json::Value, Failure> {
    let change = state.changes_collection().parse(id)?;
    let plugins = state.plugins.clone();
    let info = state.change_json(query.options).format(
        change,
        query.meta,
        &|changes: &[ChangeState]| plugins.create_all(changes),
    )?;
    Ok(to_json(&info))
}

fn to_json<T: serde::Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value)
        .unwrap_or_else(|e| serde_json::json!({ "error": format!("failed to serialize: {e}") }))
}
