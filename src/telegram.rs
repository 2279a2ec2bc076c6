//! Telegram transport
//!
//! Maps incoming chat messages onto coordinator entry points and delivers the
//! coordinator's replies with the main reply keyboard attached.

use crate::runtime::{Dispatch, MessageSender, ProductionCoordinator, SendError};
use crate::state_machine::{Intent, UserId};
use async_trait::async_trait;
use std::error::Error;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{KeyboardButton, KeyboardMarkup, Me};
use teloxide::utils::command::BotCommands;

type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;

const MENU_TEXT: &str = "Choose an action:";

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "show the main menu")]
    Start,
    #[command(description = "show this help")]
    Help,
}

/// The persistent keyboard with both dialogue triggers
pub fn main_menu_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(Intent::LookupOnce.trigger_label())],
        vec![KeyboardButton::new(Intent::SetFavorite.trigger_label())],
    ])
    .resize_keyboard()
}

/// How an inbound message enters the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inbound<'a> {
    Trigger(Intent),
    Text(&'a str),
}

fn classify(text: &str) -> Inbound<'_> {
    [Intent::LookupOnce, Intent::SetFavorite]
        .into_iter()
        .find(|intent| intent.trigger_label() == text)
        .map_or(Inbound::Text(text), Inbound::Trigger)
}

/// `MessageSender` backed by the Telegram Bot API
#[derive(Clone)]
pub struct TelegramSender {
    bot: Bot,
}

impl TelegramSender {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl MessageSender for TelegramSender {
    async fn send_message(&self, user: UserId, text: &str) -> Result<(), SendError> {
        self.bot
            .send_message(ChatId(user.0), text)
            .reply_markup(main_menu_keyboard())
            .await
            .map(|_| ())
            .map_err(|e| SendError::new(user, e.to_string()))
    }
}

/// Update handler tree for the dispatcher
pub fn schema() -> UpdateHandler<Box<dyn Error + Send + Sync + 'static>> {
    Update::filter_message().endpoint(message_handler)
}

async fn message_handler(
    bot: Bot,
    me: Me,
    msg: Message,
    coordinator: Arc<ProductionCoordinator>,
) -> HandlerResult {
    let user = UserId(msg.chat.id.0);
    // Non-text messages (stickers, photos, ...) count as empty text
    let text = msg.text().unwrap_or_default();

    let dispatch = match classify(text) {
        Inbound::Trigger(Intent::LookupOnce) => coordinator.on_request_lookup(user).await,
        Inbound::Trigger(Intent::SetFavorite) => coordinator.on_request_set_favorite(user).await,
        Inbound::Text(text) => coordinator.on_user_text(user, text).await,
    };
    tracing::debug!(user_id = %user, dispatch = ?dispatch, "Message handled");

    if dispatch != Dispatch::Ignored {
        return Ok(());
    }

    match Command::parse(text, me.username()) {
        Ok(Command::Start) => {
            let reply = match coordinator.favorite_of(user).await {
                Ok(Some(city)) => format!("{MENU_TEXT}\n\nYour favorite city: {city}"),
                Ok(None) => MENU_TEXT.to_string(),
                Err(e) => {
                    tracing::warn!(user_id = %user, error = %e, "Could not read favorite for menu");
                    MENU_TEXT.to_string()
                }
            };
            bot.send_message(msg.chat.id, reply)
                .reply_markup(main_menu_keyboard())
                .await?;
        }
        Ok(Command::Help) => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string())
                .reply_markup(main_menu_keyboard())
                .await?;
        }
        Err(_) => {}
    }

    Ok(())
}
