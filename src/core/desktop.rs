//! Desktop card model
//!
//! Tracks the open app cards, which one is focused, and the shell panels
//! (AI assistant, app launcher, settings). Opening an app that already has a
//! card focuses the existing card instead of creating a second one.

use serde::{Deserialize, Serialize};

/// Unique identifier for a card
pub type CardId = u64;

/// Default card width in pixels
pub const DEFAULT_CARD_WIDTH: u32 = 600;
/// Default card height in pixels
pub const DEFAULT_CARD_HEIGHT: u32 = 400;

/// Apps known to the launcher, with their card titles
const APP_TITLES: &[(&str, &str)] = &[
    ("mail", "Mail"),
    ("camera", "Camera"),
    ("music", "Music"),
    ("notes", "Notes"),
    ("calculator", "Calculator"),
    ("calendar", "Calendar"),
    ("browser", "Browser"),
    ("photos", "Photos"),
    ("code", "Code Editor"),
    ("database", "Database"),
    ("weather", "Weather"),
    ("maps", "Maps"),
    ("chat", "Chat"),
    ("files", "Files"),
    ("terminal", "Terminal"),
    ("store", "App Store"),
];

/// Card title for an app id ("App" for unknown ids)
pub fn app_title(app: &str) -> &'static str {
    APP_TITLES
        .iter()
        .find(|(id, _)| *id == app)
        .map(|(_, title)| *title)
        .unwrap_or("App")
}

/// A window-like card hosting one app
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub title: String,
    pub app: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub minimized: bool,
}

/// Result of asking the desktop to open an app
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenApp {
    /// A new card was created
    Opened(CardId),
    /// The app already had a card; it is now active
    Focused(CardId),
}

impl OpenApp {
    pub fn card_id(self) -> CardId {
        match self {
            OpenApp::Opened(id) | OpenApp::Focused(id) => id,
        }
    }
}

/// Desktop shell state
#[derive(Debug, Default)]
pub struct Desktop {
    cards: Vec<Card>,
    active: Option<CardId>,
    next_id: CardId,
    pub assistant_open: bool,
    pub launcher_open: bool,
    pub settings_open: bool,
}

impl Desktop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a card for `app`, or focus the existing one
    pub fn open_app(&mut self, app: &str) -> OpenApp {
        if let Some(card) = self.cards.iter().find(|c| c.app == app) {
            let id = card.id;
            self.active = Some(id);
            return OpenApp::Focused(id);
        }

        self.next_id += 1;
        let card = Card {
            id: self.next_id,
            title: app_title(app).to_string(),
            app: app.to_string(),
            width: DEFAULT_CARD_WIDTH,
            height: DEFAULT_CARD_HEIGHT,
            minimized: false,
        };
        let id = card.id;
        self.cards.push(card);
        self.active = Some(id);
        OpenApp::Opened(id)
    }

    /// Close a card, returning it if it was open
    pub fn close_card(&mut self, id: CardId) -> Option<Card> {
        let index = self.cards.iter().position(|c| c.id == id)?;
        if self.active == Some(id) {
            self.active = None;
        }
        Some(self.cards.remove(index))
    }

    /// Focus a card. Returns false if no such card is open.
    pub fn set_active(&mut self, id: CardId) -> bool {
        if self.cards.iter().any(|c| c.id == id) {
            self.active = Some(id);
            true
        } else {
            false
        }
    }

    pub fn toggle_minimized(&mut self, id: CardId) -> Option<bool> {
        let card = self.cards.iter_mut().find(|c| c.id == id)?;
        card.minimized = !card.minimized;
        Some(card.minimized)
    }

    pub fn toggle_assistant(&mut self) {
        self.assistant_open = !self.assistant_open;
    }

    pub fn toggle_launcher(&mut self) {
        self.launcher_open = !self.launcher_open;
    }

    pub fn toggle_settings(&mut self) {
        self.settings_open = !self.settings_open;
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn active_card(&self) -> Option<&Card> {
        self.active.and_then(|id| self.card(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_titles() {
        assert_eq!(app_title("terminal"), "Terminal");
        assert_eq!(app_title("store"), "App Store");
        assert_eq!(app_title("nope"), "App");
    }

    #[test]
    fn test_open_app_reuses_existing_card() {
        let mut desktop = Desktop::new();
        let first = desktop.open_app("notes");
        let other = desktop.open_app("mail");
        assert!(matches!(first, OpenApp::Opened(_)));
        assert_eq!(desktop.active_card().unwrap().app, "mail");

        let again = desktop.open_app("notes");
        assert_eq!(again, OpenApp::Focused(first.card_id()));
        assert_eq!(desktop.cards().len(), 2);
        assert_eq!(desktop.active_card().unwrap().id, first.card_id());
        assert_ne!(first.card_id(), other.card_id());
    }

    #[test]
    fn test_new_card_defaults() {
        let mut desktop = Desktop::new();
        let id = desktop.open_app("terminal").card_id();
        let card = desktop.card(id).unwrap();
        assert_eq!(card.title, "Terminal");
        assert_eq!((card.width, card.height), (600, 400));
        assert!(!card.minimized);
    }

    #[test]
    fn test_close_card_clears_active() {
        let mut desktop = Desktop::new();
        let a = desktop.open_app("mail").card_id();
        let b = desktop.open_app("chat").card_id();

        assert!(desktop.close_card(a).is_some());
        assert_eq!(desktop.active_card().unwrap().id, b);

        assert_eq!(desktop.close_card(b).unwrap().app, "chat");
        assert!(desktop.active_card().is_none());
        assert!(desktop.close_card(b).is_none());
    }

    #[test]
    fn test_panels_and_minimize() {
        let mut desktop = Desktop::new();
        desktop.toggle_assistant();
        desktop.toggle_launcher();
        desktop.toggle_launcher();
        assert!(desktop.assistant_open);
        assert!(!desktop.launcher_open);
        assert!(!desktop.settings_open);

        let id = desktop.open_app("files").card_id();
        assert_eq!(desktop.toggle_minimized(id), Some(true));
        assert_eq!(desktop.toggle_minimized(id), Some(false));
        assert_eq!(desktop.toggle_minimized(999), None);
        assert!(!desktop.set_active(999));
    }
}
