//! Inline menu callbacks

use indoc::{formatdoc, indoc};
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, ParseMode};
use teloxide::utils::html::escape;

use super::types::{HandlerDeps, HandlerError};
use crate::telegram::keyboards::{groups_keyboard, main_keyboard, MenuAction};
use wishcore::get_connection;
use wishcore::storage::users::{self, User, UserStats};
use wishcore::storage::wishes;

const MAIN_MENU_TEXT: &str = "🏠 <b>Главное меню</b>\n\nВыбери действие:";

const ADD_WISH_ALERT: &str = "✍️ Добавлять желания можно в Web App. Открой полный интерфейс! 🚀";
const CREATE_GROUP_ALERT: &str = "Создание групп доступно в Web App. Открой полный интерфейс! 🚀";
const JOIN_GROUP_ALERT: &str = "Присоединение к группам доступно в Web App. Открой полный интерфейс! 🚀";

const GROUPS_TEXT: &str = indoc! {"
    👥 <b>Групповые списки</b>

    Создай группу для друзей или семьи:
    • Делитесь желаниями
    • Бронируйте подарки незаметно
    • Получайте уведомления о днях рождения

    Что делать дальше?
"};

/// What a callback turns into
#[derive(Debug, PartialEq)]
enum Reply {
    Alert(&'static str),
    Edit(String, InlineKeyboardMarkup),
}

pub(super) fn my_wishes_text(active: i64) -> String {
    let mut text = String::from("📋 <b>Мой список желаний</b>\n\n");
    if active == 0 {
        text.push_str("Список пуст. Добавь первое желание!\n\n");
        text.push_str("Используй /add или открой Web App 👇");
    } else {
        text.push_str(&format!("Всего желаний: <b>{}</b>\n\n", active));
        text.push_str("Открой Web App для управления списком 👇");
    }
    text
}

pub(super) fn settings_text(user: &User, stats: &UserStats) -> String {
    formatdoc! {"
        ⚙️ <b>Настройки</b>

        <b>Профиль:</b>
        Имя: {name}
        Username: {mention}
        Язык: {language}

        <b>Статистика:</b>
        Всего желаний: {wishes}
        Выполнено: {completed}
        Групп: {groups}

        Полные настройки доступны в Web App 👇
        ",
        name = escape(&user.full_name()),
        mention = escape(&user.mention()),
        language = escape(&user.language_code.to_uppercase()),
        wishes = stats.wishes_count,
        completed = stats.completed_wishes_count,
        groups = stats.groups_count,
    }
}

fn reply_for(action: MenuAction, user: &User, deps: &HandlerDeps) -> Result<Reply, HandlerError> {
    let reply = match action {
        MenuAction::MainMenu => Reply::Edit(MAIN_MENU_TEXT.to_string(), main_keyboard(&deps.web_app_url)),
        MenuAction::AddWish => Reply::Alert(ADD_WISH_ALERT),
        MenuAction::CreateGroup => Reply::Alert(CREATE_GROUP_ALERT),
        MenuAction::JoinGroup => Reply::Alert(JOIN_GROUP_ALERT),
        MenuAction::Groups => Reply::Edit(GROUPS_TEXT.to_string(), groups_keyboard()),
        MenuAction::MyWishes => {
            let conn = get_connection(&deps.db_pool)?;
            let active = wishes::count_active_wishes(&conn, user.id)?;
            Reply::Edit(my_wishes_text(active), main_keyboard(&deps.web_app_url))
        }
        MenuAction::Settings => {
            let conn = get_connection(&deps.db_pool)?;
            let stats = users::get_user_stats(&conn, user.id)?;
            Reply::Edit(settings_text(user, &stats), main_keyboard(&deps.web_app_url))
        }
    };
    Ok(reply)
}

/// Handles a button press from one of the inline menus
pub(super) async fn handle_callback(
    bot: &Bot,
    q: &CallbackQuery,
    user: &User,
    deps: &HandlerDeps,
) -> Result<(), HandlerError> {
    let Some(action) = q.data.as_deref().and_then(MenuAction::parse) else {
        log::debug!("Ignoring unknown callback data {:?} from user {}", q.data, user.id);
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    match reply_for(action, user, deps)? {
        Reply::Alert(text) => {
            bot.answer_callback_query(q.id.clone())
                .text(text)
                .show_alert(true)
                .await?;
        }
        Reply::Edit(text, keyboard) => {
            if let Some(message) = &q.message {
                bot.edit_message_text(message.chat().id, message.id(), text)
                    .parse_mode(ParseMode::Html)
                    .reply_markup(keyboard)
                    .await?;
            }
            bot.answer_callback_query(q.id.clone()).await?;
        }
    }
    Ok(())
}
