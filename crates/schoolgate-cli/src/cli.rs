//! Command-line arguments.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "schoolgate",
    version,
    about = "Sign in to the school portal and open your role's dashboard"
)]
pub struct Cli {
    /// API base URL, overriding config and SCHOOLGATE_API_URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in (password is read from SCHOOLGATE_PASSWORD or prompted)
    Login {
        username: Option<String>,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Show the dashboard for the signed-in user's role
    Dashboard,
    /// Check whether a client route can be opened
    Open {
        path: String,
    },
    /// Show the profile, or update it with FIELD=VALUE pairs
    Profile {
        #[arg(value_name = "FIELD=VALUE")]
        fields: Vec<String>,
    },
    /// Change the signed-in user's password
    Passwd,
    /// Create a new account (does not sign in)
    Register {
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        role: String,
        /// Extra role-specific fields, e.g. --field department=Science
        #[arg(long = "field", value_name = "FIELD=VALUE")]
        fields: Vec<String>,
    },
    /// Exchange the current token for a fresh one
    Refresh,
    /// Ask the server whether the current token is still valid
    Verify,
    /// Send an authenticated request and print the JSON response
    Request {
        method: String,
        endpoint: String,
        /// JSON request body
        #[arg(long)]
        data: Option<String>,
    },
}
