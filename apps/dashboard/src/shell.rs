//! Interactive session over one mounted controller. Sends run in the
//! background so the list can be inspected while they are pending.

use std::{future::Future, io::Write, sync::Arc};

use anyhow::Result;
use client_core::{DashboardController, DashboardError, NotificationComposer};
use shared::{
    domain::UserId,
    protocol::{ActionField, NotificationDraft},
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    task::JoinSet,
};

use crate::render;

const HELP: &str = "\
commands:
  list                           show subscriptions and selection
  refresh                        reload subscriptions
  toggle <user>                  select or deselect a user
  select-all                     select everyone, or clear if everyone is selected
  title <text>                   set the notification title
  message <text>                 set the notification message
  add-action                     append an empty action
  set-action <i> <field> <value> set action|title|icon of action #i
  remove-action <i>              delete action #i
  draft                          show the notification being composed
  send                           notify selected users
  send-all                       notify every subscription
  notify <user>                  send the default notification to one user
  remove <user>                  unsubscribe a user
  help                           show this text
  quit                           leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    List,
    Refresh,
    Toggle(UserId),
    SelectAll,
    Title(String),
    Message(String),
    AddAction,
    SetAction {
        index: usize,
        field: ActionField,
        value: String,
    },
    RemoveAction(usize),
    Draft,
    Send,
    SendAll,
    Notify(UserId),
    Remove(UserId),
    Help,
    Quit,
}

impl ShellCommand {
    pub fn name(&self) -> &'static str {
        match self {
            ShellCommand::List => "list",
            ShellCommand::Refresh => "refresh",
            ShellCommand::Toggle(_) => "toggle",
            ShellCommand::SelectAll => "select_all",
            ShellCommand::Title(_) => "title",
            ShellCommand::Message(_) => "message",
            ShellCommand::AddAction => "add_action",
            ShellCommand::SetAction { .. } => "set_action",
            ShellCommand::RemoveAction(_) => "remove_action",
            ShellCommand::Draft => "draft",
            ShellCommand::Send => "send",
            ShellCommand::SendAll => "send_all",
            ShellCommand::Notify(_) => "notify",
            ShellCommand::Remove(_) => "remove",
            ShellCommand::Help => "help",
            ShellCommand::Quit => "quit",
        }
    }
}

/// `Ok(None)` for a blank line.
pub fn parse_command(line: &str) -> Result<Option<ShellCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "list" | "ls" => ShellCommand::List,
        "refresh" => ShellCommand::Refresh,
        "toggle" => ShellCommand::Toggle(required_user(word, rest)?),
        "select-all" => ShellCommand::SelectAll,
        "title" => ShellCommand::Title(rest.to_string()),
        "message" => ShellCommand::Message(rest.to_string()),
        "add-action" => ShellCommand::AddAction,
        "set-action" => {
            let mut parts = rest.splitn(3, char::is_whitespace);
            let index = parse_index(parts.next().unwrap_or_default())?;
            let field = parts
                .next()
                .filter(|field| !field.is_empty())
                .ok_or("usage: set-action <i> <action|title|icon> <value>")?
                .parse::<ActionField>()?;
            let value = parts.next().unwrap_or_default().trim().to_string();
            ShellCommand::SetAction {
                index,
                field,
                value,
            }
        }
        "remove-action" => ShellCommand::RemoveAction(parse_index(rest)?),
        "draft" => ShellCommand::Draft,
        "send" => ShellCommand::Send,
        "send-all" => ShellCommand::SendAll,
        "notify" => ShellCommand::Notify(required_user(word, rest)?),
        "remove" | "unsubscribe" => ShellCommand::Remove(required_user(word, rest)?),
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        other => return Err(format!("unknown command '{other}'; try 'help'")),
    };
    Ok(Some(command))
}

fn required_user(word: &str, rest: &str) -> Result<UserId, String> {
    if rest.is_empty() {
        return Err(format!("usage: {word} <user>"));
    }
    Ok(UserId::from(rest))
}

fn parse_index(raw: &str) -> Result<usize, String> {
    raw.trim()
        .parse()
        .map_err(|_| format!("invalid action index '{}'", raw.trim()))
}

pub async fn run(controller: Arc<DashboardController>) -> Result<()> {
    let mut composer = NotificationComposer::default();
    let mut tasks = JoinSet::new();

    if controller.mount().await.is_ok() {
        print_list(&controller, true).await;
    }
    println!("type 'help' for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                eprintln!("{message}");
                continue;
            }
        };
        tracing::debug!(command = command.name(), "shell command");

        match command {
            ShellCommand::List => print_list(&controller, true).await,
            ShellCommand::Refresh => {
                let controller = Arc::clone(&controller);
                spawn_operation(&mut tasks, async move {
                    controller.refresh().await.map(|_| ())
                });
            }
            ShellCommand::Toggle(user_id) => {
                match controller.toggle_user_selection(&user_id).await {
                    Ok(true) => println!("selected {user_id}"),
                    Ok(false) => println!("deselected {user_id}"),
                    Err(err) => eprintln!("{err}"),
                }
            }
            ShellCommand::SelectAll => {
                let selected = controller.select_all().await;
                println!("{selected} selected");
            }
            ShellCommand::Title(title) => composer.set_title(title),
            ShellCommand::Message(message) => composer.set_message(message),
            ShellCommand::AddAction => {
                let index = composer.add_action();
                println!("added action #{index}");
            }
            ShellCommand::SetAction {
                index,
                field,
                value,
            } => {
                if !composer.update_action(index, field, value) {
                    eprintln!("no action #{index}");
                }
            }
            ShellCommand::RemoveAction(index) => {
                if composer.remove_action(index).is_none() {
                    eprintln!("no action #{index}");
                }
            }
            ShellCommand::Draft => {
                for line in render::draft_lines(composer.draft()) {
                    println!("{line}");
                }
            }
            ShellCommand::Send => {
                let draft = composer.submit(NotificationDraft::from_parts);
                let controller = Arc::clone(&controller);
                spawn_operation(&mut tasks, async move {
                    controller.notify_selected(&draft).await
                });
            }
            ShellCommand::SendAll => {
                let draft = composer.submit(NotificationDraft::from_parts);
                let controller = Arc::clone(&controller);
                spawn_operation(&mut tasks, async move {
                    controller.notify_all(&draft).await
                });
            }
            ShellCommand::Notify(user_id) => {
                let controller = Arc::clone(&controller);
                spawn_operation(&mut tasks, async move {
                    controller.notify_user(&user_id).await
                });
            }
            ShellCommand::Remove(user_id) => {
                let controller = Arc::clone(&controller);
                spawn_operation(&mut tasks, async move {
                    controller.unsubscribe(&user_id).await
                });
            }
            ShellCommand::Help => println!("{HELP}"),
            ShellCommand::Quit => break,
        }

        while tasks.try_join_next().is_some() {}
    }

    // Whatever is still pending resolves into a stale generation and is dropped.
    controller.unmount().await;
    tasks.shutdown().await;
    Ok(())
}

async fn print_list(controller: &DashboardController, show_selection: bool) {
    let snapshot = controller.snapshot().await;
    for line in render::subscription_lines(&snapshot, show_selection) {
        println!("{line}");
    }
}

fn spawn_operation<F>(tasks: &mut JoinSet<()>, operation: F)
where
    F: Future<Output = Result<(), DashboardError>> + Send + 'static,
{
    tasks.spawn(async move {
        match operation.await {
            // Gateway failures already reached the operator as an alert.
            Ok(()) | Err(DashboardError::Gateway(_)) | Err(DashboardError::Superseded(_)) => {}
            Err(err) => eprintln!("{err}"),
        }
    });
}
