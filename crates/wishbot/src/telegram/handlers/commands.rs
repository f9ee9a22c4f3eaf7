//! Command handler implementations (/start, /help, /add, /list, /share)

use indoc::{formatdoc, indoc};
use teloxide::prelude::*;
use teloxide::types::{Message, ParseMode};
use teloxide::utils::html::escape;

use super::types::{HandlerDeps, HandlerError};
use crate::telegram::bot::Command;
use crate::telegram::keyboards::{main_keyboard, share_keyboard, share_link};
use wishcore::config;
use wishcore::get_connection;
use wishcore::storage::users::User;
use wishcore::storage::wishes::{self, Wish};

const HELP_TEXT: &str = indoc! {"
    📖 <b>Справка по командам:</b>

    <b>Основные команды:</b>
    /start - Главное меню
    /add - Быстро добавить желание
    /list - Показать мой список (топ-5)
    /share - Поделиться списком
    /help - Эта справка

    <b>Как пользоваться:</b>
    1. Нажми кнопку \"🎁 Мои желания\" для открытия полного интерфейса
    2. Добавляй желания с фото, ссылками и ценой
    3. Создавай группы и приглашай друзей
    4. Бронируй подарки в группах (невидимо для получателя)

    <b>Групповые списки:</b>
    • Создай группу для семьи/друзей
    • Добавь свои желания
    • Смотри желания других участников
    • Бронируй подарки незаметно
"};

const ADD_TEXT: &str = indoc! {"
    ➕ <b>Добавить желание</b>

    Желания добавляются в Web App: там можно указать фото, ссылку,
    цену, категорию и приоритет.

    Например:
    • iPhone 15 Pro
    • Книга \"Мастер и Маргарита\"
    • Абонемент в спортзал

    Открой Web App кнопкой ниже 👇
"};

const EMPTY_LIST_TEXT: &str = "📝 Твой список желаний пока пуст.\n\nДобавь первое желание командой /add или через Web App 👇";

pub(super) fn start_text(first_name: &str, web_app_enabled: bool) -> String {
    let mut text = formatdoc! {"
        👋 <b>Привет, {name}!</b>

        Добро пожаловать в <b>{project}</b> - твой личный менеджер желаний! 🎁

        Здесь ты можешь:
        ✨ Создавать списки желаний
        🎯 Управлять приоритетами
        👥 Делиться списками с друзьями
        🎂 Создавать групповые списки для дней рождения

        <b>Основные команды:</b>
        • /add - Добавить желание
        • /list - Посмотреть список
        • /share - Поделиться списком
        • /help - Справка
        ",
        name = escape(first_name),
        project = config::PROJECT_NAME,
    };

    if web_app_enabled {
        text.push_str("\n💡 Нажми кнопку ниже для полного функционала Web App!");
    }
    text
}

fn priority_emoji(priority: i64) -> &'static str {
    match priority {
        1 => "🟢",
        2 => "🟡",
        3 => "🔴",
        4 => "⚡",
        _ => "⚪",
    }
}

/// Cuts a description to the configured preview length, counting characters
fn preview(description: &str) -> String {
    let limit = config::bot::DESCRIPTION_PREVIEW_CHARS;
    if description.chars().count() > limit {
        let cut: String = description.chars().take(limit).collect();
        format!("{}...", cut)
    } else {
        description.to_string()
    }
}

/// Renders the /list preview of the top active wishes
pub(super) fn render_wish_list(wishes: &[Wish], total: i64) -> String {
    if wishes.is_empty() {
        return EMPTY_LIST_TEXT.to_string();
    }

    let mut text = format!("🎁 <b>Твои желания (топ-{}):</b>\n\n", config::bot::LIST_PREVIEW_LIMIT);

    for (i, wish) in wishes.iter().enumerate() {
        let price = match wish.price {
            Some(price) if price != 0.0 => format!(" • {}", wish.formatted_price()),
            _ => String::new(),
        };
        text.push_str(&format!(
            "{}. {} <b>{}</b>{}\n",
            i + 1,
            priority_emoji(wish.priority),
            escape(&wish.title),
            price
        ));

        if let Some(description) = wish.description.as_deref().filter(|d| !d.is_empty()) {
            text.push_str(&format!("   <i>{}</i>\n", escape(&preview(description))));
        }
        text.push('\n');
    }

    if total > config::bot::LIST_PREVIEW_LIMIT as i64 {
        text.push_str(&format!("\nВсего желаний: <b>{}</b>\n", total));
        text.push_str("Открой полный список в Web App 👇");
    }
    text
}

pub(super) fn share_text(web_app_url: &str, user_id: i64, web_app_enabled: bool) -> String {
    if web_app_enabled {
        formatdoc! {"
            📤 <b>Поделиться списком желаний</b>

            Отправь эту ссылку друзьям или семье, чтобы они увидели твои желания:

            👉 {link}

            Или используй кнопку ниже 👇
            ",
            link = escape(&share_link(web_app_url, user_id)),
        }
    } else {
        indoc! {"
            📤 <b>Поделиться списком желаний</b>

            ⚠️ В режиме разработки функция \"Поделиться\" недоступна.

            Для полного функционала задеплойте приложение на HTTPS сервер.

            Пока используйте команды:
            • /list - Посмотреть список
            • /add - Добавить желание
        "}
        .to_string()
    }
}

/// Dispatches a parsed command for an already synced sender
pub(super) async fn handle_command(
    bot: &Bot,
    msg: &Message,
    cmd: Command,
    user: &User,
    deps: &HandlerDeps,
) -> Result<(), HandlerError> {
    let keyboard = main_keyboard(&deps.web_app_url);

    let (text, keyboard) = match cmd {
        Command::Start => (start_text(&user.first_name, deps.web_app_enabled()), keyboard),
        Command::Help => (HELP_TEXT.to_string(), keyboard),
        Command::Add => (ADD_TEXT.to_string(), keyboard),
        Command::List => {
            let conn = get_connection(&deps.db_pool)?;
            let top = wishes::top_active_wishes(&conn, user.id, config::bot::LIST_PREVIEW_LIMIT)?;
            let total = wishes::count_active_wishes(&conn, user.id)?;
            (render_wish_list(&top, total), keyboard)
        }
        Command::Share => (
            share_text(&deps.web_app_url, user.id, deps.web_app_enabled()),
            share_keyboard(&deps.web_app_url, user.id),
        ),
    };

    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}
