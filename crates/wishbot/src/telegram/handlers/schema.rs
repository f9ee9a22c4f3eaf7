//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::callbacks::handle_callback;
use super::commands::handle_command;
use super::types::{sync_sender, HandlerDeps, HandlerError};
use crate::telegram::bot::Command;
use wishcore::storage::users::User;

/// Creates the dispatcher schema for the bot.
///
/// The sender of every update is synced into storage first; the synced
/// [`User`] is then available to all branches. Updates without a sender are
/// dropped.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_sync = deps.clone();
    let deps_commands = deps.clone();
    let deps_callback = deps;

    dptree::entry()
        .filter_map(move |update: Update| sync_sender(&deps_sync, &update))
        .branch(command_handler(deps_commands))
        .branch(callback_handler(deps_callback))
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command, user: User| {
            let deps = deps.clone();
            async move {
                log::info!("Received command {:?} from user {}", cmd, user.id);
                handle_command(&bot, &msg, cmd, &user, &deps).await
            }
        },
    ))
}

fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery, user: User| {
        let deps = deps.clone();
        async move { handle_callback(&bot, &q, &user, &deps).await }
    })
}
