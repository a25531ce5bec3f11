#![forbid(unsafe_code)]

mod commands;
mod logger;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use lean_dashboard::{AppRegions, Client, Error, FatalError, Method, Region, Settings};

use crate::commands::{
    completions::CompletionsCommand, logout::LogoutCommand, remember::RememberCommand,
    request::RequestCommand,
};

#[derive(Parser)]
#[command(name = "lean-api")]
struct Cli {
    /// Region of the dashboard to talk to.
    #[clap(long, env = "LEANCLOUD_REGION", default_value = "cn")]
    region: Region,
    /// App whose region decides which dashboard to talk to; takes precedence over the region.
    #[clap(long, env = "LEANCLOUD_APP_ID")]
    app_id: Option<String>,
    /// Log more to stderr; repeat for more detail.
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn client(settings: Settings, region: Region, app_id: Option<String>) -> anyhow::Result<Client> {
        let client = match app_id {
            Some(app_id) => {
                let regions = AppRegions::load(settings.app_regions_path())?;
                Client::by_app(settings, app_id, regions)?
            }
            None => Client::by_region(settings, region)?,
        };
        Ok(client)
    }

    pub fn exec(self) -> anyhow::Result<()> {
        let Self {
            region,
            app_id,
            verbose: _,
            command,
        } = self;
        let (method, cmd) = match command {
            Commands::Completions(cmd) => return cmd.exec::<Self>(),
            Commands::Logout(cmd) => return cmd.exec(&Settings::from_env()?),
            Commands::Remember(cmd) => return cmd.exec(&Settings::from_env()?),
            Commands::Get(cmd) => (Method::GET, cmd),
            Commands::Post(cmd) => (Method::POST, cmd),
            Commands::Put(cmd) => (Method::PUT, cmd),
            Commands::Patch(cmd) => (Method::PATCH, cmd),
            Commands::Delete(cmd) => (Method::DELETE, cmd),
        };
        let client = Self::client(Settings::from_env()?, region, app_id)?;
        cmd.exec(&client, method)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Send a GET request and print the response body
    Get(RequestCommand),
    /// Send a POST request and print the response body
    Post(RequestCommand),
    /// Send a PUT request and print the response body
    Put(RequestCommand),
    /// Send a PATCH request and print the response body
    Patch(RequestCommand),
    /// Send a DELETE request and print the response body
    Delete(RequestCommand),
    /// Forget the stored dashboard session
    Logout(LogoutCommand),
    /// Remember which region an app is deployed in, for use with `--app-id`
    Remember(RememberCommand),
    /// Print a completion file for the given shell.
    ///
    /// Example: `lean-api completions zsh | source /dev/stdin`.
    Completions(CompletionsCommand),
}

fn is_fatal(e: &anyhow::Error) -> bool {
    e.chain().any(|cause| {
        cause.is::<FatalError>() || cause.downcast_ref::<Error>().is_some_and(Error::is_fatal)
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut guard = logger::init(cli.verbose);
    match cli.exec() {
        Ok(()) => {
            guard.disarm();
            ExitCode::SUCCESS
        }
        Err(e) if is_fatal(&e) => {
            eprintln!("Fatal configuration error: {e:?}");
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}
