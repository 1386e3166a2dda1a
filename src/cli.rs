//! Command-line front end.
//!
//! Each subcommand maps onto one client operation. Results are printed to
//! stdout as JSON; diagnostics go to the log file.

use std::io::{self, BufRead, Write};

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};

use crate::api::{auth, FogbugzClient, PeopleQuery};
use crate::config::{Config, Profile};
use crate::error::{AppError, Result};

/// Command-line client for the FogBugz XML API.
#[derive(Debug, Parser)]
#[command(name = "fogbugz", version, about)]
pub struct Cli {
    /// Profile to use instead of the default one.
    #[arg(long, short, global = true)]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage connection profiles.
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// Log in; the password is read from stdin.
    Login,
    /// Log off and forget the stored session.
    Logout,
    /// Show the profile and whether a session is stored.
    Status,
    /// Check that the FogBugz server answers.
    Ping,
    /// Open a new case.
    New {
        title: String,
        #[arg(long, short)]
        description: String,
        #[command(flatten)]
        options: CaseOptions,
    },
    /// Add an event to a case.
    Edit {
        case_id: i64,
        content: String,
        #[command(flatten)]
        options: CaseOptions,
    },
    /// Reopen a case.
    Reopen {
        case_id: i64,
        #[command(flatten)]
        options: CaseOptions,
    },
    /// Resolve a case.
    Resolve { case_id: i64 },
    /// Close a case.
    Close { case_id: i64 },
    /// Show the event history of a case.
    Show { case_id: i64 },
    /// Describe a status.
    ViewStatus { status_id: i64 },
    /// List the areas of a project.
    Areas { project_id: i64 },
    /// List case categories.
    Categories,
    /// List available filters.
    Filters,
    /// List users.
    People {
        /// Leave out normal users.
        #[arg(long)]
        no_normal: bool,
        /// Include virtual users.
        #[arg(long)]
        virtual_users: bool,
        /// Include community users.
        #[arg(long)]
        community: bool,
    },
    /// List priorities.
    Priorities,
    /// List projects.
    Projects,
    /// Switch the current filter.
    SetFilter { filter_id: i64 },
    /// Search cases; with no query, lists the current filter.
    Search { query: Option<String> },
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// Add or replace a profile.
    Add {
        name: String,
        url: String,
        email: String,
        /// Make this the default profile.
        #[arg(long)]
        default: bool,
    },
    /// List profiles.
    List,
    /// Remove a profile and its stored session.
    Remove { name: String },
}

/// Extra case fields given as `--set name=value`.
#[derive(Debug, Clone, Default, Args)]
pub struct CaseOptions {
    /// Set a field, e.g. `--set priority=3 --set owner=7`.
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_option)]
    pub set: Vec<(String, String)>,
}

impl CaseOptions {
    fn as_pairs(&self) -> Vec<(&str, &str)> {
        self.set
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect()
    }
}

/// Parse a `name=value` option.
fn parse_option(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{}'", raw)),
    }
}

/// Run a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let command = match cli.command {
        Command::Profile(command) => return run_profile(command),
        command => command,
    };

    let config = Config::load()?;
    let profile = config.profile(cli.profile.as_deref())?.clone();
    debug!(profile = %profile.name, "Using profile");

    match command {
        Command::Login => login(&profile).await,
        Command::Logout => logout(&profile).await,
        Command::Status => print_json(&SessionInfo {
            profile: &profile.name,
            endpoint: profile.endpoint(),
            email: &profile.email,
            logged_in: auth::has_token(&profile.name),
        }),
        Command::Ping => {
            let client = FogbugzClient::new(&profile.endpoint())?;
            let reachable = client.server_status().await;
            print_json(&serde_json::json!({ "reachable": reachable }))
        }
        command => {
            let mut client = session_client(&profile)?;
            execute(&mut client, command).await
        }
    }
}

#[derive(Serialize)]
struct SessionInfo<'a> {
    profile: &'a str,
    endpoint: String,
    email: &'a str,
    logged_in: bool,
}

fn run_profile(command: ProfileCommand) -> Result<()> {
    let mut config = Config::load()?;
    match command {
        ProfileCommand::Add {
            name,
            url,
            email,
            default,
        } => {
            config.upsert_profile(Profile::new(name.clone(), url, email))?;
            if default || config.profiles.len() == 1 {
                config.settings.default_profile = Some(name.clone());
            }
            config.save()?;
            info!(profile = %name, "Profile saved");
            print_json(&config.profiles)
        }
        ProfileCommand::List => print_json(&config.profiles),
        ProfileCommand::Remove { name } => {
            let removed = config.remove_profile(&name)?;
            config.save()?;
            auth::delete_token(&removed.name)?;
            print_json(&removed)
        }
    }
}

async fn login(profile: &Profile) -> Result<()> {
    eprint!("Password for {}: ", profile.email);
    io::stderr().flush()?;

    let mut password = String::new();
    io::stdin().lock().read_line(&mut password)?;
    let password = password.trim_end_matches(['\r', '\n']);

    let mut client = FogbugzClient::new(&profile.endpoint())?;
    client.login(&profile.email, password).await?;
    auth::store_token(&profile.name, client.token())?;

    print_json(&serde_json::json!({ "profile": profile.name, "logged_in": true }))
}

async fn logout(profile: &Profile) -> Result<()> {
    let mut client = session_client(profile)?;
    let result = client.logout().await;
    auth::delete_token(&profile.name)?;
    result?;
    print_json(&serde_json::json!({ "profile": profile.name, "logged_in": false }))
}

/// A client carrying the stored session token, if there is one.
fn session_client(profile: &Profile) -> Result<FogbugzClient> {
    let token = auth::get_token(&profile.name).unwrap_or_else(|e| {
        debug!("No stored session: {}", e);
        String::new()
    });
    Ok(FogbugzClient::with_token(&profile.endpoint(), &token)?)
}

async fn execute(client: &mut FogbugzClient, command: Command) -> Result<()> {
    match command {
        Command::New {
            title,
            description,
            options,
        } => {
            let id = client
                .open_ticket(&title, &description, &options.as_pairs())
                .await?;
            print_json(&serde_json::json!({ "case": id }))
        }
        Command::Edit {
            case_id,
            content,
            options,
        } => {
            let id = client
                .update_ticket(case_id, &content, &options.as_pairs())
                .await?;
            print_json(&serde_json::json!({ "case": id }))
        }
        Command::Reopen { case_id, options } => {
            let id = client.reopen_ticket(case_id, &options.as_pairs()).await?;
            print_json(&serde_json::json!({ "case": id }))
        }
        Command::Resolve { case_id } => {
            let id = client.resolve_ticket(case_id).await?;
            print_json(&serde_json::json!({ "case": id }))
        }
        Command::Close { case_id } => {
            let id = client.close_ticket(case_id).await?;
            print_json(&serde_json::json!({ "case": id }))
        }
        Command::Show { case_id } => print_json(&client.get_ticket(case_id).await?),
        Command::ViewStatus { status_id } => {
            print_json(&client.get_ticket_status(status_id).await?)
        }
        Command::Areas { project_id } => print_json(&client.get_all_areas(project_id).await?),
        Command::Categories => print_json(&client.get_all_categories().await?),
        Command::Filters => print_json(&client.get_all_filters().await?),
        Command::People {
            no_normal,
            virtual_users,
            community,
        } => {
            let query = PeopleQuery {
                include_normal: !no_normal,
                include_virtual: virtual_users,
                include_community: community,
            };
            print_json(&client.get_all_fogbugz_users(query).await?)
        }
        Command::Priorities => print_json(&client.get_all_priorities().await?),
        Command::Projects => print_json(&client.get_project_list().await?),
        Command::SetFilter { filter_id } => {
            client.set_filter(filter_id).await?;
            print_json(&serde_json::json!({ "filter": filter_id }))
        }
        Command::Search { query } => {
            print_json(&client.search(query.as_deref().unwrap_or_default()).await?)
        }
        Command::Profile(_)
        | Command::Login
        | Command::Logout
        | Command::Status
        | Command::Ping => Err(AppError::usage("command does not use a session")),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).map_err(io::Error::from)?;
    println!("{}", out);
    Ok(())
}
