//! Inline keyboards and the callback data they carry
//!
//! Telegram refuses Web App and URL buttons that point at plain-http hosts,
//! so those buttons only appear when the Mini-App is served over HTTPS.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, WebAppInfo};
use url::Url;

/// Callback data of the inline menu buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    MainMenu,
    AddWish,
    MyWishes,
    Groups,
    Settings,
    CreateGroup,
    JoinGroup,
}

impl MenuAction {
    pub fn as_str(self) -> &'static str {
        match self {
            MenuAction::MainMenu => "main_menu",
            MenuAction::AddWish => "add_wish",
            MenuAction::MyWishes => "my_wishes",
            MenuAction::Groups => "groups",
            MenuAction::Settings => "settings",
            MenuAction::CreateGroup => "create_group",
            MenuAction::JoinGroup => "join_group",
        }
    }

    pub fn parse(data: &str) -> Option<Self> {
        let action = match data {
            "main_menu" => MenuAction::MainMenu,
            "add_wish" => MenuAction::AddWish,
            "my_wishes" => MenuAction::MyWishes,
            "groups" => MenuAction::Groups,
            "settings" => MenuAction::Settings,
            "create_group" => MenuAction::CreateGroup,
            "join_group" => MenuAction::JoinGroup,
            _ => return None,
        };
        Some(action)
    }

    fn button(self, text: &str) -> InlineKeyboardButton {
        InlineKeyboardButton::callback(text, self.as_str())
    }
}

/// The Mini-App URL, when Telegram would accept it for a button
pub fn https_url(web_app_url: &str) -> Option<Url> {
    Url::parse(web_app_url).ok().filter(|url| url.scheme() == "https")
}

/// Link that opens someone's public list in the Mini-App
pub fn share_link(web_app_url: &str, user_id: i64) -> String {
    format!("{}?user={}", web_app_url, user_id)
}

pub fn main_keyboard(web_app_url: &str) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();

    if let Some(url) = https_url(web_app_url) {
        rows.push(vec![InlineKeyboardButton::web_app("🎁 Мои желания", WebAppInfo { url })]);
    }

    rows.push(vec![
        MenuAction::AddWish.button("➕ Добавить желание"),
        MenuAction::MyWishes.button("📋 Мой список"),
    ]);
    rows.push(vec![
        MenuAction::Groups.button("👥 Группы"),
        MenuAction::Settings.button("⚙️ Настройки"),
    ]);

    InlineKeyboardMarkup::new(rows)
}

pub fn groups_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![MenuAction::CreateGroup.button("➕ Создать группу")],
        vec![MenuAction::JoinGroup.button("🔗 Присоединиться")],
        vec![MenuAction::MainMenu.button("⬅️ Назад")],
    ])
}

/// Share buttons for HTTPS deployments, a back button otherwise
pub fn share_keyboard(web_app_url: &str, user_id: i64) -> InlineKeyboardMarkup {
    let Some(list_url) = https_url(&share_link(web_app_url, user_id)) else {
        return InlineKeyboardMarkup::new(vec![vec![MenuAction::MainMenu.button("⬅️ Назад")]]);
    };

    let mut rows = Vec::new();
    if let Ok(share_url) = Url::parse_with_params(
        "https://t.me/share/url",
        &[("url", list_url.as_str()), ("text", "Мой список желаний")],
    ) {
        rows.push(vec![InlineKeyboardButton::url("📤 Поделиться", share_url)]);
    }
    rows.push(vec![InlineKeyboardButton::url("🔗 Открыть в браузере", list_url)]);

    InlineKeyboardMarkup::new(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;

    fn callback_data(markup: &InlineKeyboardMarkup) -> Vec<String> {
        markup
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|button| match &button.kind {
                InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    fn has_web_app_button(markup: &InlineKeyboardMarkup) -> bool {
        markup
            .inline_keyboard
            .iter()
            .flatten()
            .any(|button| matches!(button.kind, InlineKeyboardButtonKind::WebApp(_)))
    }

    #[test]
    fn test_web_app_button_only_over_https() {
        assert!(has_web_app_button(&main_keyboard("https://wishes.example.com")));
        assert!(!has_web_app_button(&main_keyboard("http://localhost:3000")));
        assert!(!has_web_app_button(&main_keyboard("not a url")));
    }

    #[test]
    fn test_main_keyboard_callbacks_parse_back() {
        let data = callback_data(&main_keyboard("http://localhost:3000"));
        assert_eq!(data, vec!["add_wish", "my_wishes", "groups", "settings"]);
        for item in data {
            assert_eq!(MenuAction::parse(&item).map(MenuAction::as_str), Some(item.as_str()));
        }
        assert_eq!(MenuAction::parse("delete_everything"), None);
    }

    #[test]
    fn test_share_keyboard() {
        assert_eq!(share_link("https://wishes.example.com", 42), "https://wishes.example.com?user=42");

        let dev = share_keyboard("http://localhost:3000", 42);
        assert_eq!(callback_data(&dev), vec!["main_menu"]);

        let prod = share_keyboard("https://wishes.example.com", 42);
        let urls: Vec<String> = prod
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|button| match &button.kind {
                InlineKeyboardButtonKind::Url(url) => Some(url.to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(urls.len(), 2);
        assert!(urls[0].starts_with("https://t.me/share/url?url=https%3A%2F%2Fwishes.example.com"));
        assert_eq!(urls[1], "https://wishes.example.com/?user=42");
    }
}
