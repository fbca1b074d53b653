use std::thread;

use clap::Parser;
use colored::Colorize;
use cueline_client::{
    Client, ClientError, HttpTransport, RonFileStore, SessionStore, StoreError, TransportError,
};
use cueline_core::{ClientEvent, Config, ConfigError, Identity, QueueSnapshot, Song, Stage};
use log::{error, info};
use thiserror::Error;
use tokio::runtime::{self, Runtime};

use crate::command::{Cli, Command};

mod command;
mod logging;

pub struct Cueline {
    client: Client<HttpTransport>,
    runtime: Runtime,
}

#[derive(Debug, Error)]
enum CuelineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Could not open session file: {0}")]
    Storage(#[from] StoreError),

    #[error("Could not set up http client: {0}")]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Client(#[from] ClientError),

    #[error("Fatal error: {0}")]
    Fatal(String),
}

impl Cueline {
    fn new(config: Config) -> Result<Self, CuelineError> {
        let runtime = runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("cueline-async")
            .build()
            .map_err(|e| CuelineError::Fatal(e.to_string()))?;

        let store = SessionStore::new(RonFileStore::open(&config.session_file)?);
        let transport = HttpTransport::new(&config)?;

        info!("Connecting to {}...", config.server_url);
        let client = runtime.block_on(Client::connect(config, transport, store))?;

        Ok(Self { client, runtime })
    }

    fn run(&self, command: Command) -> Result<(), CuelineError> {
        let client = &self.client;

        self.runtime.block_on(async move {
            match command {
                Command::Login { username, password } => {
                    client.login(&username, &password).await?;
                    print_identity(client.identity.current().as_ref());
                }
                Command::Logout => client.logout()?,
                Command::WhoAmI => print_identity(client.identity.current().as_ref()),
                Command::Queue => {
                    let (queue, current) =
                        tokio::join!(client.queue.poll_queue(), client.queue.poll_current_song());
                    queue?;
                    current?;

                    if let Some(view) = client.queue.view() {
                        print_queue(&view);
                    }
                }
                Command::Watch => self.watch().await?,
                Command::Add { query } => client.queue.submit(&query.join(" ")).await?,
                Command::Skip => client.queue.skip().await?,
                Command::Delete { id } => client.queue.delete(&id).await?,
                Command::Upvote { id } => client.queue.upvote(&id).await?,
                Command::Downvote { id } => client.queue.downvote(&id).await?,
                Command::Users => {
                    for user in client.admin.list_users().await? {
                        print_identity(Some(&user));
                    }
                }
                Command::AddUser {
                    username,
                    password,
                    role,
                } => client.admin.add_user(&username, &password, role.into()).await?,
                Command::DeleteUser { username } => client.admin.delete_user(&username).await?,
                Command::SetCoins { username, coins } => {
                    client.admin.set_coins(&username, coins).await?
                }
                Command::AddCoins { username, coins } => {
                    client.admin.add_coins(&username, coins).await?
                }
                Command::Password { new_password } => {
                    client.admin.change_password(&new_password).await?
                }
            }

            Ok::<_, CuelineError>(())
        })
    }

    /// Prints queue changes until interrupted
    async fn watch(&self) -> Result<(), CuelineError> {
        let events = self.client.events();

        thread::spawn(move || {
            for event in events.iter() {
                print_event(&event);
            }
        });

        let handle = self.client.queue.start();

        tokio::signal::ctrl_c()
            .await
            .map_err(|e| CuelineError::Fatal(e.to_string()))?;

        handle.stop();
        info!("Stopped watching");

        Ok(())
    }
}

impl CuelineError {
    fn hint(&self) -> String {
        match self {
            CuelineError::Config(_) => "Check the CUELINE_* environment variables.".to_string(),
            CuelineError::Storage(_) => "Delete the session file and log in again.".to_string(),
            CuelineError::Transport(_) => "Check that CUELINE_SERVER_URL is a valid url.".to_string(),
            CuelineError::Client(e) if e.is_session_fatal() => {
                "Log in again with `cueline login <username> <password>`.".to_string()
            }
            CuelineError::Client(e) if e.is_transient() => {
                "Make sure the server is running and reachable, then try again.".to_string()
            }
            CuelineError::Client(_) => "The server refused the request.".to_string(),
            CuelineError::Fatal(_) => "This error is fatal, and should not happen.".to_string(),
        }
    }
}

fn print_event(event: &ClientEvent) {
    match event {
        ClientEvent::QueueUpdated { snapshot, .. } => print_queue(&snapshot.merged(None)),
        ClientEvent::CurrentSongUpdated {
            song: Some(song), ..
        } => print_current(song),
        ClientEvent::SessionExpired => {
            println!("{}", "Session expired, please log in again".red())
        }
        event if event.is_error() => println!("{}", format!("{:?}", event).red()),
        _ => {}
    }
}

fn print_current(song: &Song) {
    println!(
        "{} {} {}",
        "Now playing".bold(),
        song.name,
        format!("{:.0}%", song.progress() * 100.).bright_black()
    );
}

fn print_queue(view: &QueueSnapshot) {
    if let Some(song) = &view.current_song {
        print_current(song);
    }

    for stage in Stage::ALL.into_iter().rev() {
        for song in view.stage(stage) {
            println!(
                "{:>4} {} {} {}",
                song.vote_score,
                song.name,
                song.id.bright_black(),
                format!("{:?}", stage).to_lowercase().dimmed()
            );
        }
    }

    if view.is_empty() {
        println!("{}", "The queue is empty".dimmed());
    }
}

fn print_identity(identity: Option<&Identity>) {
    match identity {
        Some(identity) => println!(
            "{} ({}, {} coins)",
            identity.username.bold(),
            identity.role,
            identity.coin_balance
        ),
        None => println!("{}", "Not logged in".dimmed()),
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init_logger(cli.verbose);

    let result = Config::from_env()
        .map_err(CuelineError::from)
        .and_then(|config| Cueline::new(config)?.run(cli.command));

    if let Err(error) = result {
        error!("{} {}", "cueline failed!".bold().red(), error);
        error!("{}", format!("Hint: {}", error.hint()).dimmed().italic());
        std::process::exit(1);
    }
}
