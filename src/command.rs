use clap::{Parser, Subcommand, ValueEnum};
use cueline_core::Role;

/// Terminal front-end for a shared music queue
#[derive(Debug, Parser)]
#[command(name = "cueline", version)]
#[command(after_help = "Set CUELINE_SERVER_URL to choose the server.")]
pub struct Cli {
    /// Show debug logs
    #[arg(short, long, global = true, env = "CUELINE_VERBOSE")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Log in and remember the session
    Login { username: String, password: String },

    /// Forget the session
    Logout,

    /// Show the logged in user
    #[command(name = "whoami")]
    WhoAmI,

    /// Show the queue once
    Queue,

    /// Follow the queue until interrupted
    Watch,

    /// Add a song by url or search query
    Add {
        #[arg(required = true)]
        query: Vec<String>,
    },

    /// Skip the current song
    Skip,

    /// Remove a song from the queue
    Delete { id: String },

    /// Vote a song up
    #[command(name = "up", alias = "upvote")]
    Upvote { id: String },

    /// Vote a song down
    #[command(name = "down", alias = "downvote")]
    Downvote { id: String },

    /// List users
    Users,

    /// Create a user
    #[command(name = "adduser")]
    AddUser {
        username: String,
        password: String,
        #[arg(value_enum)]
        role: RoleArg,
    },

    /// Delete a user
    #[command(name = "deluser")]
    DeleteUser { username: String },

    /// Set the coin balance of a user
    #[command(name = "setcoins")]
    SetCoins { username: String, coins: u64 },

    /// Give coins to a user
    #[command(name = "addcoins")]
    AddCoins { username: String, coins: u64 },

    /// Change your own password
    #[command(name = "passwd")]
    Password { new_password: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    User,
    #[value(alias = "mod")]
    Moderator,
    Admin,
}

impl From<RoleArg> for Role {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::User => Role::User,
            RoleArg::Moderator => Role::Moderator,
            RoleArg::Admin => Role::Admin,
        }
    }
}
