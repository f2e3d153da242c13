mod config;
mod render;
mod shell;

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use client_core::{
    DashboardController, DashboardError, DashboardEvent, HttpDispatchGateway,
    NotificationComposer,
};
use shared::{
    domain::UserId,
    protocol::{ActionField, NotificationAction, NotificationDraft},
};
use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};
use tracing_subscriber::EnvFilter;

/// Operator console for the push notification backend.
#[derive(Parser, Debug)]
struct Cli {
    /// Settings file; defaults to ./dashboard.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Backend base URL, overriding config and environment.
    #[arg(long, global = true)]
    base_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show every subscription.
    List,
    /// Send a notification to every subscription.
    NotifyAll(ComposeArgs),
    /// Send a notification to the given users.
    Notify {
        #[arg(long = "user", required = true)]
        users: Vec<String>,
        #[command(flatten)]
        compose: ComposeArgs,
    },
    /// Send the default notification to one user.
    NotifyUser { user: String },
    /// Remove a user's subscription.
    Unsubscribe { user: String },
    /// Interactive session.
    Shell,
}

#[derive(Args, Debug)]
struct ComposeArgs {
    #[arg(long, default_value = "")]
    title: String,
    #[arg(long, default_value = "")]
    message: String,
    /// `key:title:icon`; may be repeated.
    #[arg(long = "action", value_parser = parse_action)]
    actions: Vec<NotificationAction>,
}

impl ComposeArgs {
    fn into_draft(self) -> NotificationDraft {
        let mut composer = NotificationComposer::default();
        composer.set_title(self.title);
        composer.set_message(self.message);
        for action in self.actions {
            let index = composer.add_action();
            for (field, value) in [
                (ActionField::Action, action.action),
                (ActionField::Title, action.title),
                (ActionField::Icon, action.icon),
            ] {
                composer.update_action(index, field, value);
            }
        }
        composer.submit(NotificationDraft::from_parts)
    }
}

fn parse_action(raw: &str) -> Result<NotificationAction, String> {
    let mut parts = raw.splitn(3, ':');
    let action = parts.next().unwrap_or_default();
    if action.is_empty() {
        return Err(format!("action '{raw}' needs a key, as key:title:icon"));
    }
    Ok(NotificationAction {
        action: action.to_string(),
        title: parts.next().unwrap_or_default().to_string(),
        icon: parts.next().unwrap_or_default().to_string(),
    })
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let settings = config::load_settings(cli.config.as_deref(), cli.base_url.as_deref())?;
    let base_url = settings.base_url()?;
    tracing::info!(base_url = %base_url, "using dispatch backend");

    let gateway = HttpDispatchGateway::with_timeout(base_url, settings.request_timeout())?;
    let controller = DashboardController::new(Arc::new(gateway));
    let printer = spawn_alert_printer(&controller);

    let outcome = match cli.command {
        Command::Shell => {
            shell::run(Arc::clone(&controller)).await?;
            Ok(())
        }
        command => run_once(&controller, command).await,
    };

    controller.unmount().await;
    drop(controller);
    let _ = printer.await;

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            // Gateway failures were already printed as alerts.
            if err.gateway().is_none() {
                eprintln!("error: {err}");
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run_once(
    controller: &DashboardController,
    command: Command,
) -> Result<(), DashboardError> {
    controller.mount().await?;

    match command {
        Command::List => print_list(controller, false).await,
        Command::NotifyAll(compose) => controller.notify_all(&compose.into_draft()).await?,
        Command::Notify { users, compose } => {
            for user in users {
                let user_id = UserId::from(user);
                if !controller.snapshot().await.selection.contains(&user_id) {
                    controller.toggle_user_selection(&user_id).await?;
                }
            }
            controller.notify_selected(&compose.into_draft()).await?;
        }
        Command::NotifyUser { user } => {
            let user_id = known_user(controller, user).await?;
            controller.notify_user(&user_id).await?;
        }
        Command::Unsubscribe { user } => {
            let user_id = known_user(controller, user).await?;
            controller.unsubscribe(&user_id).await?;
            print_list(controller, false).await;
        }
        Command::Shell => {}
    }
    Ok(())
}

async fn known_user(
    controller: &DashboardController,
    user: String,
) -> Result<UserId, DashboardError> {
    let user_id = UserId::from(user);
    if controller.snapshot().await.store.contains(&user_id) {
        Ok(user_id)
    } else {
        Err(DashboardError::UnknownUser(user_id))
    }
}

async fn print_list(controller: &DashboardController, show_selection: bool) {
    let snapshot = controller.snapshot().await;
    for line in render::subscription_lines(&snapshot, show_selection) {
        println!("{line}");
    }
}

/// Prints alerts to stderr until the controller is dropped.
fn spawn_alert_printer(controller: &DashboardController) -> JoinHandle<()> {
    let mut events = controller.subscribe_events();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(DashboardEvent::Alert(alert)) => eprintln!("{}", render::alert_line(&alert)),
                Ok(DashboardEvent::StoreReplaced {
                    count,
                    pruned_selection,
                }) => {
                    tracing::debug!(count, pruned_selection, "subscriptions reloaded");
                }
                Ok(DashboardEvent::Busy { key, in_flight }) => {
                    tracing::debug!(operation = %key, in_flight, "operation state");
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "alert printer lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
