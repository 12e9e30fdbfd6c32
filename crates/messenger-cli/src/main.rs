mod commands;
mod config;

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use messenger_client::composer::EMOJI_PALETTE;
use messenger_client::validation::{LoginForm, ProfileForm, RegisterForm};
use messenger_client::{ClientResult, MessengerClient, PanelEvent};
use messenger_db::Database;
use messenger_service::{LocalBackend, StaticProvider};
use messenger_types::{Message, MessageId, UserProfile};

use crate::commands::{Command, Input, ProfileEdit, joined};
use crate::config::Config;

/// Provider name used by `/provider`.
const PROVIDER_NAME: &str = "google";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging; stdout belongs to the conversation
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "messenger=debug,messenger_client=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Config
    let config = Config::from_env()?;
    if config.has_placeholder_secret() {
        eprintln!("FATAL: MESSENGER_JWT_SECRET is unset or still a placeholder.");
        eprintln!("       Session tokens are signed with it.");
        eprintln!("       Set it in your .env file and restart.");
        std::process::exit(1);
    }

    // Init database and backend
    let db = Database::open(&config.db_path)?;
    let backend = Arc::new(LocalBackend::new(db, config.jwt_secret.clone()));
    info!("Messenger store opened at {}", config.db_path.display());

    let (client, mut events) = MessengerClient::new(backend.clone(), backend, config.client.clone());
    let mut app = App {
        client,
        presence: None,
        last_shown: None,
    };

    println!("Messenger. Type /help for commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let result = match Input::parse(&line) {
                    Ok(Input::Command(Command::Quit)) => break,
                    Ok(Input::Command(command)) => app.run(command).await,
                    Ok(Input::Say(text)) => app.say(&text).await,
                    // Usage errors and help text, rendered by clap
                    Err(e) => {
                        e.print().ok();
                        continue;
                    }
                };
                if let Err(e) = result {
                    warn!("Command failed: {}", e);
                    println!("! {}", e.notice());
                }
            }
            Some(event) = events.recv() => app.render(event),
        }
    }

    // Leave presence accurate for everyone else
    if app.client.session.is_signed_in() {
        app.sign_out().await.ok();
    }
    Ok(())
}

struct App {
    client: MessengerClient,
    /// Stops the roster's profile watch on sign-out
    presence: Option<CancellationToken>,
    /// Newest message already printed
    last_shown: Option<MessageId>,
}

impl App {
    async fn run(&mut self, command: Command) -> ClientResult<()> {
        match command {
            Command::Register {
                username,
                email,
                password,
                confirm,
            } => {
                let form = RegisterForm {
                    username,
                    email,
                    password,
                    confirm_password: confirm,
                };
                let profile = self.client.identity.register(&form).await?;
                self.signed_in(profile).await?;
            }
            Command::Login { email, password } => {
                let profile = self
                    .client
                    .identity
                    .login(&LoginForm { email, password })
                    .await?;
                self.signed_in(profile).await?;
            }
            Command::Provider {
                email,
                display_name,
            } => {
                let provider =
                    StaticProvider::signed_in(PROVIDER_NAME, email, joined(&display_name), None);
                let profile = self.client.identity.login_with_provider(&provider).await?;
                self.signed_in(profile).await?;
            }
            Command::Restore { token } => {
                let profile = self.client.identity.restore(&token).await?;
                self.signed_in(profile).await?;
            }
            Command::Logout => {
                self.sign_out().await?;
                println!("Signed out.");
            }
            Command::Users { query } => {
                let contacts = self.client.contacts.search(&query.join(" "));
                if contacts.is_empty() {
                    println!("No users found.");
                }
                for contact in contacts {
                    let dot = if contact.online { "●" } else { "○" };
                    println!("{} {} <{}>", dot, contact.display_name(), contact.email);
                }
            }
            Command::Open { name } => {
                let name = name.join(" ");
                let Some(peer) = self.client.contacts.find(&name) else {
                    println!("! No single user matches {:?}", name);
                    return Ok(());
                };
                self.client.chat.open_conversation(peer.clone()).await?;
                println!("-- {} --", peer.display_name());
                self.last_shown = None;
                self.print_new();
            }
            Command::Older => {
                let added = self.client.chat.load_older().await?;
                if added == 0 && self.client.chat.is_exhausted() {
                    println!("-- start of conversation --");
                }
                // Older pages land at the top
                for message in self.client.chat.messages().iter().take(added) {
                    self.print_message(message);
                }
            }
            Command::Profile(edit) => self.profile(edit).await?,
            Command::Emoji { index: None } => {
                for (i, emoji) in EMOJI_PALETTE.iter().enumerate() {
                    print!("{}:{} ", i, emoji);
                }
                println!();
            }
            Command::Emoji { index: Some(i) } => match EMOJI_PALETTE.get(i) {
                Some(emoji) => {
                    self.client.chat.insert_emoji(emoji).await?;
                    println!("draft: {}", self.client.chat.draft());
                }
                None => println!("! Pick 0..{}", EMOJI_PALETTE.len() - 1),
            },
            Command::Blur => self.client.chat.on_blur().await?,
            Command::Quit => {}
        }
        Ok(())
    }

    /// Type `text` after the current draft and send it.
    async fn say(&mut self, text: &str) -> ClientResult<()> {
        let draft = format!("{}{}", self.client.chat.draft(), text);
        self.client.chat.on_input(&draft).await?;
        self.client.chat.send_message().await?;
        Ok(())
    }

    async fn signed_in(&mut self, profile: UserProfile) -> ClientResult<()> {
        println!("Signed in as {}.", profile.display_name());
        if let Some(token) = self.client.session.token() {
            println!("Resume later with /restore {}", token);
        }

        let contacts = self.client.contacts.load().await?;
        println!("{} other users. /users to list them, /open <name> to chat.", contacts.len());

        if let Some(previous) = self.presence.take() {
            previous.cancel();
        }
        let cancel = CancellationToken::new();
        self.client.contacts.follow_changes(cancel.clone()).await?;
        self.presence = Some(cancel);
        Ok(())
    }

    async fn sign_out(&mut self) -> ClientResult<()> {
        self.client.chat.close().await?;
        self.client.identity.logout().await?;
        if let Some(cancel) = self.presence.take() {
            cancel.cancel();
        }
        Ok(())
    }

    async fn profile(&self, edit: ProfileEdit) -> ClientResult<()> {
        let form = self.client.identity.profile_form().await?;
        if edit.is_empty() {
            println!("username: {}", form.username);
            println!("bio:      {}", form.bio);
            println!("photo:    {}", form.photo_url);
            return Ok(());
        }

        let form = ProfileForm {
            bio: edit.bio().unwrap_or(form.bio),
            username: edit.username.unwrap_or(form.username),
            photo_url: edit.photo.unwrap_or(form.photo_url),
        };
        let profile = self.client.identity.update_profile(&form).await?;
        println!("Profile updated, {}.", profile.display_name());
        Ok(())
    }

    fn render(&mut self, event: PanelEvent) {
        match event {
            PanelEvent::ScrollToBottom => self.print_new(),
            PanelEvent::RemoteTyping(true) => {
                if let Some(peer) = self.client.chat.peer() {
                    println!("   {} is typing...", peer.display_name());
                }
            }
            PanelEvent::Notice(text) => println!("! {}", text),
            PanelEvent::MessagesChanged | PanelEvent::RemoteTyping(false) => {}
        }
    }

    /// Print the messages after the last one shown.
    fn print_new(&mut self) {
        let messages = self.client.chat.messages();
        let start = self
            .last_shown
            .as_ref()
            .and_then(|id| messages.iter().position(|m| &m.id == id))
            .map_or(0, |i| i + 1);
        for message in &messages[start..] {
            self.print_message(message);
        }
        if let Some(last) = messages.last() {
            self.last_shown = Some(last.id.clone());
        }
    }

    fn print_message(&self, message: &Message) {
        let me = self.client.session.current_id();
        let sender = if me.as_ref() == Some(&message.sender_id) {
            "you".to_string()
        } else {
            self.client
                .chat
                .peer()
                .map(|p| p.display_name().to_string())
                .unwrap_or_else(|| message.sender_id.to_string())
        };
        println!("[{}] {}: {}", message.time_label, sender, message.text);
    }
}
