//! Interactive terminal front-end.
//!
//! Pure presentation: renders the shell's phase and forwards user actions
//! to `natter-app`. Per-screen local state (the open chat's message list
//! with its optimistic placeholders and the greeting) lives here and
//! nowhere else. All slash commands are completable; anything else typed
//! in a chat is a message.

use std::borrow::Cow::{self, Borrowed, Owned};

use anyhow::Result;
use chrono::{Local, Utc};
use colored::Colorize;
use rustyline::Editor;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use uuid::Uuid;

use natter_app::{AppShell, ChatService, LaunchParams, Phase, VerificationOutcome};
use natter_core::{Chat, ChatMessage, MessageRole};

/// Greeting shown when a chat's history is empty. Display only, never
/// persisted.
const GREETING: &str = "Hello! I'm your AI assistant. How can I help you today?";

/// Local line appended when persisting an exchange fails.
const SEND_FAILED: &str = "Sorry, I encountered an error. Please try again.";

const CREATE_CHAT_FAILED: &str = "Failed to create chat. Please try again.";
const RENAME_CHAT_FAILED: &str = "Failed to rename chat. Please try again.";
const LOAD_CHATS_FAILED: &str = "Failed to load chats. Please try again.";
const LOAD_MESSAGES_FAILED: &str = "Failed to load messages. Please try again.";

const COMMANDS: &[&str] = &[
    "/signin", "/signup", "/signout", "/new", "/open", "/rename", "/history", "/back", "/quit",
];

/// CLI helper for rustyline that provides completion, highlighting, and hints.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: COMMANDS.iter().map(|cmd| cmd.to_string()).collect(),
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

/// The REPL driving one shell instance until the user quits.
pub struct Repl {
    editor: Editor<CliHelper, DefaultHistory>,
    shell: AppShell,
    chats: ChatService,
}

impl Repl {
    pub fn new(shell: AppShell, chats: ChatService) -> Result<Self> {
        let mut editor = Editor::new()?;
        editor.set_helper(Some(CliHelper::new()));
        Ok(Self {
            editor,
            shell,
            chats,
        })
    }

    /// Runs the phase loop until the user quits.
    pub async fn run(mut self, launch: LaunchParams) -> Result<()> {
        println!("{}", "=== natter ===".bright_magenta().bold());
        println!();

        self.shell.start(launch).await;

        loop {
            let keep_going = match self.shell.phase().await {
                Phase::Loading | Phase::Unauthenticated => self.auth_screen().await?,
                Phase::Authenticated => self.dashboard_screen().await?,
                Phase::EmailVerification(outcome) => self.verification_screen(&outcome).await?,
            };
            if !keep_going {
                break;
            }
        }

        println!("{}", "Goodbye!".bright_green());
        Ok(())
    }

    /// Sign-in / sign-up form. Returns `false` when the user quits.
    async fn auth_screen(&mut self) -> Result<bool> {
        println!("{}", "Sign in to natter".bold());
        self.render_notices().await;
        println!(
            "{}",
            "Type '/signin' or '/signup' to continue, '/quit' to exit.".bright_black()
        );

        loop {
            let Some(line) = self.read_command("natter> ")? else {
                return Ok(false);
            };

            match line.as_str() {
                "" => continue,
                "/quit" => return Ok(false),
                "/signin" => {
                    let Some((email, password)) = self.prompt_credentials()? else {
                        return Ok(false);
                    };
                    if self.shell.sign_in(&email, &password).await == Phase::Authenticated {
                        return Ok(true);
                    }
                    self.render_notices().await;
                }
                "/signup" => {
                    let Some((email, password)) = self.prompt_credentials()? else {
                        return Ok(false);
                    };
                    if self.shell.sign_up(&email, &password).await == Phase::Authenticated {
                        return Ok(true);
                    }
                    self.render_notices().await;
                }
                _ => println!("{}", "Unknown command".bright_black()),
            }
        }
    }

    /// Chat list plus creation. Returns `false` when the user quits.
    async fn dashboard_screen(&mut self) -> Result<bool> {
        let Some(user) = self.shell.user().await else {
            // The event mirror dropped the session underneath us; fall back
            // to the sign-in form.
            return Ok(true);
        };

        println!();
        println!("{}", "Welcome back!".bold());
        println!("{}", format!("Signed in as {}", user.email).bright_black());

        let mut chats = self.load_chats(&user.id).await;
        render_chat_list(&chats);
        println!(
            "{}",
            "Commands: /new [title], /open <n>, /rename <n> <title>, /signout, /quit"
                .bright_black()
        );

        loop {
            let Some(line) = self.read_command("natter> ")? else {
                return Ok(false);
            };
            if line.is_empty() {
                continue;
            }

            let (command, rest) = line.split_once(' ').unwrap_or((line.as_str(), ""));
            match command {
                "/quit" => return Ok(false),
                "/signout" => {
                    self.shell.sign_out().await;
                    println!();
                    return Ok(true);
                }
                "/new" => {
                    let title = rest.trim();
                    let title = if title.is_empty() {
                        default_chat_title()
                    } else {
                        title.to_string()
                    };
                    match self.chats.create_chat(&title, &user.id).await {
                        Ok(chat) => {
                            if !self.chat_screen(&chat, &user.id).await? {
                                return Ok(false);
                            }
                            // Reload on the way back; the new chat and any
                            // sends inside it changed the ordering.
                            chats = self.load_chats(&user.id).await;
                            render_chat_list(&chats);
                        }
                        Err(err) => {
                            tracing::debug!("Chat creation failed: {}", err);
                            println!("{}", CREATE_CHAT_FAILED.red());
                        }
                    }
                }
                "/open" => {
                    let Some(chat) = pick_chat(&chats, rest).cloned() else {
                        println!("{}", "No such chat".red());
                        continue;
                    };
                    if !self.chat_screen(&chat, &user.id).await? {
                        return Ok(false);
                    }
                    chats = self.load_chats(&user.id).await;
                    render_chat_list(&chats);
                }
                "/rename" => {
                    let Some((index, title)) = rest.trim().split_once(' ') else {
                        println!("{}", "Usage: /rename <n> <title>".bright_black());
                        continue;
                    };
                    let Some(chat_id) = pick_chat(&chats, index).map(|c| c.id.clone()) else {
                        println!("{}", "No such chat".red());
                        continue;
                    };
                    match self.chats.rename_chat(&chat_id, title.trim()).await {
                        Ok(_) => {
                            chats = self.load_chats(&user.id).await;
                            render_chat_list(&chats);
                        }
                        Err(err) => {
                            tracing::debug!("Chat rename failed: {}", err);
                            println!("{}", RENAME_CHAT_FAILED.red());
                        }
                    }
                }
                _ => println!("{}", "Unknown command".bright_black()),
            }
        }
    }

    /// One open conversation. Returns `false` when the user quits.
    async fn chat_screen(&mut self, chat: &Chat, user_id: &str) -> Result<bool> {
        println!();
        println!("{}", format!("=== {} ===", chat.title).bold());
        println!(
            "{}",
            "Type a message, '/history' to re-print the conversation, '/back' to return."
                .bright_black()
        );

        let mut messages = match self.chats.open_chat(&chat.id).await {
            Ok(messages) => messages,
            Err(err) => {
                tracing::debug!("History load failed: {}", err);
                println!("{}", LOAD_MESSAGES_FAILED.red());
                Vec::new()
            }
        };

        if messages.is_empty() {
            messages.push(local_message(
                &chat.id,
                user_id,
                MessageRole::Assistant,
                GREETING,
            ));
        }

        render_history(&messages);

        loop {
            let Some(line) = self.read_command("you> ")? else {
                return Ok(false);
            };

            if line.is_empty() {
                continue;
            }
            match line.as_str() {
                "/back" => return Ok(true),
                "/quit" => return Ok(false),
                "/history" => {
                    render_history(&messages);
                    continue;
                }
                _ => {}
            }
            if line.starts_with('/') {
                println!("{}", "Unknown command".bright_black());
                continue;
            }

            // Optimistic append: the user's turn joins the local list
            // immediately; the persisted row is never reconciled back.
            messages.push(local_message(&chat.id, user_id, MessageRole::User, &line));

            match self.chats.send_message(&chat.id, user_id, &line).await {
                Ok(reply) => {
                    render_message(&reply);
                    messages.push(reply);
                }
                Err(err) => {
                    tracing::debug!("Send failed: {}", err);
                    let fallback =
                        local_message(&chat.id, user_id, MessageRole::Assistant, SEND_FAILED);
                    render_message(&fallback);
                    messages.push(fallback);
                }
            }
        }
    }

    /// Verification outcome screen. Returns `false` when the user quits.
    async fn verification_screen(&mut self, outcome: &VerificationOutcome) -> Result<bool> {
        println!();
        match outcome {
            VerificationOutcome::Verified => {
                println!("{}", "Email verified!".bright_green().bold());
                println!("Your email has been verified successfully. You can now sign in.");
            }
            VerificationOutcome::Failed(message) => {
                println!("{}", "Verification failed".red().bold());
                println!("{}", message.red());
            }
        }
        println!();

        match self.read_command("Press Enter to go to sign-in, '/quit' to exit: ")? {
            None => Ok(false),
            Some(ref line) if line == "/quit" => Ok(false),
            Some(_) => {
                self.shell.acknowledge_verification().await;
                println!();
                Ok(true)
            }
        }
    }

    /// Prompts for email and password. `None` means the user bailed out
    /// with CTRL-D.
    fn prompt_credentials(&mut self) -> Result<Option<(String, String)>> {
        let Some(email) = self.prompt_value("Email: ")? else {
            return Ok(None);
        };
        let Some(password) = self.prompt_value("Password: ")? else {
            return Ok(None);
        };
        Ok(Some((email.trim().to_string(), password)))
    }

    async fn render_notices(&self) {
        if let Some(info) = self.shell.info_message().await {
            println!("{}", info.green());
        }
        if let Some(error) = self.shell.error_message().await {
            println!("{}", error.red());
        }
    }

    async fn load_chats(&self, user_id: &str) -> Vec<Chat> {
        match self.chats.list_chats(user_id).await {
            Ok(chats) => chats,
            Err(err) => {
                tracing::debug!("Chat list failed: {}", err);
                println!("{}", LOAD_CHATS_FAILED.red());
                Vec::new()
            }
        }
    }

    /// Reads one trimmed line, recording non-empty input in the history.
    /// `None` means the user pressed CTRL-D.
    fn read_command(&mut self, prompt: &str) -> Result<Option<String>> {
        loop {
            match self.editor.readline(prompt) {
                Ok(line) => {
                    let trimmed = line.trim().to_string();
                    if !trimmed.is_empty() {
                        let _ = self.editor.add_history_entry(&line);
                    }
                    return Ok(Some(trimmed));
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "CTRL-C detected. Type '/quit' to exit.".yellow());
                }
                Err(ReadlineError::Eof) => return Ok(None),
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Reads one line without touching the history (credentials).
    fn prompt_value(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// Title used when `/new` is given no argument.
fn default_chat_title() -> String {
    format!("Chat {}", Local::now().format("%Y-%m-%d %H:%M"))
}

/// Builds a message that exists only in this view: optimistic user turns,
/// the greeting, and local error lines.
fn local_message(chat_id: &str, user_id: &str, role: MessageRole, content: &str) -> ChatMessage {
    ChatMessage {
        id: Uuid::new_v4().to_string(),
        chat_id: chat_id.to_string(),
        user_id: user_id.to_string(),
        role,
        content: content.to_string(),
        created_at: Utc::now(),
    }
}

fn render_chat_list(chats: &[Chat]) {
    if chats.is_empty() {
        println!("{}", "No chats yet. Start one with /new.".bright_black());
        return;
    }

    println!("{}", "Your chats:".bold());
    for (index, chat) in chats.iter().enumerate() {
        let updated = chat
            .updated_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M");
        println!(
            "  {} {} {}",
            format!("[{}]", index + 1).bright_cyan(),
            chat.title,
            format!("({})", updated).bright_black()
        );
    }
}

fn pick_chat<'a>(chats: &'a [Chat], arg: &str) -> Option<&'a Chat> {
    let index: usize = arg.trim().parse().ok()?;
    if index == 0 {
        return None;
    }
    chats.get(index - 1)
}

fn render_message(message: &ChatMessage) {
    let stamp = message.created_at.with_timezone(&Local).format("%H:%M");
    let author = match message.role {
        MessageRole::User => "you",
        MessageRole::Assistant => "assistant",
    };
    println!("{}", format!("[{} {}]", stamp, author).bright_magenta());
    for line in message.content.lines() {
        match message.role {
            MessageRole::User => println!("{}", line.green()),
            MessageRole::Assistant => println!("{}", line.bright_blue()),
        }
    }
    println!();
}

fn render_history(messages: &[ChatMessage]) {
    println!();
    for message in messages {
        render_message(message);
    }
}
