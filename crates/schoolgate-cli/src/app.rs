//! Command handlers for the schoolgate CLI.
//!
//! `App` owns the configuration and the auth gateway. Each command is a
//! single pass: hydrate the stored session, do one thing, exit.

use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use schoolgate_core::api::Method;
use schoolgate_core::guard::navigate;
use schoolgate_core::{
    select_dashboard, AuthGateway, Config, Credentials, DashboardSelection, PasswordChange,
    Registration, Role,
};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::cli::Command;
use crate::ui;

// ============================================================================
// Constants
// ============================================================================

/// Environment variable consulted for the sign-in username.
const ENV_USERNAME: &str = "SCHOOLGATE_USERNAME";

/// Environment variable consulted for the sign-in password.
const ENV_PASSWORD: &str = "SCHOOLGATE_PASSWORD";

/// Maximum length for username input.
const MAX_USERNAME_LENGTH: usize = 80;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

pub struct App {
    config: Config,
    gateway: AuthGateway,
}

impl App {
    /// Create the application and restore any stored session.
    pub fn new(api_url: Option<String>) -> Result<Self> {
        let mut config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };
        if let Some(url) = api_url {
            config.api_base_url = url;
        }
        debug!(api = %config.api_base_url, storage = ?config.storage, "Config loaded");

        let gateway = AuthGateway::from_config(&config)?;
        let restored = gateway.hydrate();
        debug!(has_session = restored.is_some(), "Session hydrated");

        Ok(Self { config, gateway })
    }

    pub async fn run(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Login { username } => self.login(username).await,
            Command::Logout => {
                self.gateway.logout();
                println!("Signed out.");
                Ok(())
            }
            Command::Whoami => self.whoami(),
            Command::Dashboard => self.dashboard(),
            Command::Open { path } => {
                let navigation = navigate(&path, &self.gateway.snapshot());
                println!("{}", ui::render_navigation(&path, navigation));
                Ok(())
            }
            Command::Profile { fields } => self.profile(fields).await,
            Command::Passwd => self.change_password().await,
            Command::Register {
                username,
                email,
                role,
                fields,
            } => self.register(username, email, role, fields).await,
            Command::Refresh => {
                self.gateway.refresh_token().await?;
                println!("Token refreshed.");
                self.report_expiry();
                Ok(())
            }
            Command::Verify => {
                if self.gateway.verify().await? {
                    println!("Session is valid.");
                } else {
                    println!("Session is not valid.");
                }
                Ok(())
            }
            Command::Request {
                method,
                endpoint,
                data,
            } => self.request(&method, &endpoint, data.as_deref()).await,
        }
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    async fn login(&mut self, username: Option<String>) -> Result<()> {
        let username = match username.or_else(|| std::env::var(ENV_USERNAME).ok()) {
            Some(u) => u,
            None => Self::prompt_username(self.config.last_username.as_deref())?,
        };
        let password = match std::env::var(ENV_PASSWORD) {
            Ok(p) => p,
            Err(_) => rpassword::prompt_password("Password: ")?,
        };

        let credentials = Credentials::new(username.trim(), password);
        credentials.validate()?;
        if !is_acceptable_input(&credentials.username, MAX_USERNAME_LENGTH)
            || !is_acceptable_input(&credentials.password, MAX_PASSWORD_LENGTH)
        {
            bail!("Username or password contains invalid characters or is too long");
        }

        let user = self.gateway.login(&credentials).await?;

        self.config.last_username = Some(credentials.username.clone());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        info!(user_id = user.id, "Login successful");
        println!("Signed in as {} ({}).", user.username, user.role().display_name());
        self.report_expiry();
        Ok(())
    }

    /// Print the token expiry estimate, which only exists right after the
    /// token was issued in this process.
    fn report_expiry(&self) {
        if let Some(expires_at) = self.gateway.expires_at() {
            println!("Token expires at {}.", expires_at.format("%Y-%m-%d %H:%M UTC"));
        }
        if self.gateway.needs_refresh() {
            println!("The token expires soon. Run `schoolgate refresh` to renew it.");
        }
    }

    fn prompt_username(last: Option<&str>) -> Result<String> {
        match last {
            Some(last) => print!("Username [{}]: ", last),
            None => print!("Username: "),
        }
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();

        Ok(match (input.is_empty(), last) {
            (true, Some(last)) => last.to_string(),
            _ => input.to_string(),
        })
    }

    async fn change_password(&self) -> Result<()> {
        self.require_session()?;
        let change = PasswordChange {
            old_password: rpassword::prompt_password("Current password: ")?,
            new_password: rpassword::prompt_password("New password: ")?,
        };
        change.validate()?;
        let confirm = rpassword::prompt_password("Confirm new password: ")?;
        if confirm != change.new_password {
            bail!("Passwords do not match");
        }

        self.gateway.change_password(&change).await?;
        println!("Password changed.");
        Ok(())
    }

    async fn register(
        &self,
        username: String,
        email: String,
        role: String,
        fields: Vec<String>,
    ) -> Result<()> {
        let role_type: Role = role.parse().unwrap_or(Role::Unknown);
        if role_type == Role::Unknown {
            bail!(
                "Unknown role '{}', expected one of: admin, teacher, student, parent, staff",
                role
            );
        }

        let password = match std::env::var(ENV_PASSWORD) {
            Ok(p) => p,
            Err(_) => rpassword::prompt_password("Password for new account: ")?,
        };

        let registration = Registration {
            username,
            email,
            password,
            role_type,
            extra: parse_fields(&fields)?,
        };
        registration.validate()?;

        let user = self.gateway.register(&registration).await?;
        println!(
            "Registered {} as {}. Sign in with `schoolgate login {}`.",
            user.username,
            user.role().display_name(),
            user.username
        );
        Ok(())
    }

    // =========================================================================
    // Views
    // =========================================================================

    fn whoami(&self) -> Result<()> {
        let user = self
            .gateway
            .current_user()
            .context("Not signed in. Run `schoolgate login`.")?;
        print!("{}", ui::render_user(&user));
        Ok(())
    }

    fn dashboard(&self) -> Result<()> {
        let snapshot = self.gateway.snapshot();
        match select_dashboard(snapshot.session.as_ref()) {
            DashboardSelection::Show(kind) => {
                // Show(_) implies a session
                if let Some(user) = snapshot.user() {
                    print!("{}", ui::render_dashboard(kind, user));
                }
                Ok(())
            }
            selection @ DashboardSelection::RedirectToLogin => {
                let target = selection.redirect().unwrap_or_default();
                bail!("No dashboard available, redirected to {}. Run `schoolgate login`.", target)
            }
        }
    }

    async fn profile(&self, fields: Vec<String>) -> Result<()> {
        self.require_session()?;
        let user = if fields.is_empty() {
            self.gateway.fetch_profile().await?
        } else {
            let user = self.gateway.update_profile(parse_fields(&fields)?).await?;
            println!("Profile updated.");
            user
        };
        print!("{}", ui::render_user(&user));
        Ok(())
    }

    async fn request(&self, method: &str, endpoint: &str, data: Option<&str>) -> Result<()> {
        let method: Method = method.parse().map_err(anyhow::Error::msg)?;
        let body = data
            .map(serde_json::from_str::<Value>)
            .transpose()
            .context("--data is not valid JSON")?;

        let response: Value = self
            .gateway
            .authenticated_request(method, endpoint, body)
            .await?;
        println!("{}", serde_json::to_string_pretty(&response)?);
        Ok(())
    }

    fn require_session(&self) -> Result<()> {
        if self.gateway.session().is_none() {
            bail!("Not signed in. Run `schoolgate login`.");
        }
        Ok(())
    }
}

// ============================================================================
// Input helpers
// ============================================================================

/// Check if a character is valid for input (no control characters)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

fn is_acceptable_input(value: &str, max_len: usize) -> bool {
    value.chars().count() <= max_len && value.chars().all(is_valid_input_char)
}

/// Parse `FIELD=VALUE` pairs. Values are sent as strings.
fn parse_fields(pairs: &[String]) -> Result<Map<String, Value>> {
    let mut fields = Map::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("Expected FIELD=VALUE, got '{}'", pair);
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("Empty field name in '{}'", pair);
        }
        fields.insert(key.to_string(), Value::String(value.to_string()));
    }
    Ok(fields)
}

// ============================================================================
// Tests
// ============================================================================
