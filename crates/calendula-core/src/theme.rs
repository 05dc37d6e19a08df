//! Light/dark theme preference.
//!
//! Resolution order at boot: persisted value, then the system dark-mode
//! preference, then light. The visible side effect (a `dark` class on the
//! root element) is applied synchronously on every change; the preference
//! is staged in the [`DeferredWriter`] and reaches storage on the next flush.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::notify::{Signal, SubscriptionId};
use crate::storage::{DeferredWriter, THEME_KEY};

/// Class toggled on the root element while the dark theme is active.
pub const DARK_CLASS: &str = "dark";

/// Environment variable consulted by [`EnvPreference`].
pub const COLOR_SCHEME_ENV: &str = "CALENDULA_COLOR_SCHEME";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown theme: {0}")]
pub struct UnknownTheme(pub String);

impl FromStr for Theme {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(UnknownTheme(other.to_string())),
        }
    }
}

/// Source of the operating system's dark-mode preference.
pub trait SystemPreference {
    fn prefers_dark(&self) -> bool;
}

/// A preference fixed at construction.
#[derive(Debug, Clone, Copy)]
pub struct FixedPreference(pub bool);

impl SystemPreference for FixedPreference {
    fn prefers_dark(&self) -> bool {
        self.0
    }
}

/// Reads `CALENDULA_COLOR_SCHEME` (`dark` / `light`).
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvPreference;

impl SystemPreference for EnvPreference {
    fn prefers_dark(&self) -> bool {
        std::env::var(COLOR_SCHEME_ENV)
            .map(|v| v.trim().eq_ignore_ascii_case("dark"))
            .unwrap_or(false)
    }
}

/// Receives the synchronous visual side effect of a theme change.
pub trait ThemeApplier: Send + Sync {
    fn apply(&self, theme: Theme);
}

/// Class set of the root element.
#[derive(Debug, Clone, Default)]
pub struct RootClassList {
    classes: Arc<Mutex<BTreeSet<String>>>,
}

impl RootClassList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, class: &str) -> bool {
        self.classes.lock().contains(class)
    }

    pub fn add(&self, class: &str) {
        self.classes.lock().insert(class.to_string());
    }

    pub fn remove(&self, class: &str) {
        self.classes.lock().remove(class);
    }
}

impl ThemeApplier for RootClassList {
    fn apply(&self, theme: Theme) {
        match theme {
            Theme::Dark => self.add(DARK_CLASS),
            Theme::Light => self.remove(DARK_CLASS),
        }
    }
}

/// The theme preference service.
pub struct ThemeStore {
    current: Theme,
    writer: DeferredWriter,
    applier: Box<dyn ThemeApplier>,
    changed: Signal<Theme>,
}

impl ThemeStore {
    /// Resolve the initial theme and apply it immediately.
    pub fn boot<A>(writer: DeferredWriter, system: &dyn SystemPreference, applier: A) -> Self
    where
        A: ThemeApplier + 'static,
    {
        let current = Self::resolve(&writer, system);
        tracing::debug!("Theme resolved to {}", current);
        applier.apply(current);

        Self {
            current,
            writer,
            applier: Box::new(applier),
            changed: Signal::new(),
        }
    }

    fn resolve(writer: &DeferredWriter, system: &dyn SystemPreference) -> Theme {
        match writer.store().get(THEME_KEY) {
            Ok(Some(stored)) => match stored.parse::<Theme>() {
                Ok(theme) => return theme,
                Err(e) => tracing::warn!("Ignoring stored theme: {}", e),
            },
            Ok(None) => {}
            Err(e) => tracing::error!("Failed to load theme from storage: {}", e),
        }

        if system.prefers_dark() {
            Theme::Dark
        } else {
            Theme::Light
        }
    }

    pub fn current(&self) -> Theme {
        self.current
    }

    pub fn is_dark(&self) -> bool {
        self.current == Theme::Dark
    }

    pub fn is_light(&self) -> bool {
        self.current == Theme::Light
    }

    pub fn toggle_theme(&mut self) {
        self.set_theme(self.current.toggled());
    }

    /// Set the theme. Setting the current theme again does nothing.
    pub fn set_theme(&mut self, theme: Theme) {
        if theme == self.current {
            return;
        }
        self.current = theme;
        self.applier.apply(theme);
        self.writer.stage(THEME_KEY, theme.as_str().to_string());
        tracing::info!("Theme changed to {}", theme);
        self.changed.emit(&theme);
    }

    /// Subscribe to theme changes (not fired for the boot value).
    pub fn on_change<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&Theme) + Send + Sync + 'static,
    {
        self.changed.subscribe(callback)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::storage::{KeyValueStore, MemoryStore};

    fn writer_with(stored: Option<&str>) -> (Arc<MemoryStore>, DeferredWriter) {
        let store = Arc::new(MemoryStore::new());
        if let Some(value) = stored {
            store.set(THEME_KEY, value).unwrap();
        }
        let writer = DeferredWriter::new(store.clone());
        (store, writer)
    }

    #[test]
    fn test_boot_defaults_to_light() {
        let (_, writer) = writer_with(None);
        let classes = RootClassList::new();
        let theme = ThemeStore::boot(writer, &FixedPreference(false), classes.clone());

        assert!(theme.is_light());
        assert!(!classes.contains(DARK_CLASS));
    }

    #[test]
    fn test_boot_follows_system_preference() {
        let (_, writer) = writer_with(None);
        let classes = RootClassList::new();
        let theme = ThemeStore::boot(writer, &FixedPreference(true), classes.clone());

        assert!(theme.is_dark());
        assert!(classes.contains(DARK_CLASS));
    }

    #[test]
    fn test_stored_value_beats_system_preference() {
        let (_, writer) = writer_with(Some("light"));
        let theme = ThemeStore::boot(writer, &FixedPreference(true), RootClassList::new());
        assert_eq!(theme.current(), Theme::Light);
    }

    #[test]
    fn test_invalid_stored_value_falls_back() {
        let (_, writer) = writer_with(Some("purple"));
        let theme = ThemeStore::boot(writer, &FixedPreference(true), RootClassList::new());
        assert_eq!(theme.current(), Theme::Dark);
    }

    #[test]
    fn test_toggle_applies_now_and_persists_on_flush() {
        let (store, writer) = writer_with(None);
        let classes = RootClassList::new();
        let mut theme = ThemeStore::boot(writer.clone(), &FixedPreference(false), classes.clone());

        theme.toggle_theme();
        assert!(classes.contains(DARK_CLASS));
        assert_eq!(store.get(THEME_KEY).unwrap(), None);

        writer.flush().unwrap();
        assert_eq!(store.get(THEME_KEY).unwrap().as_deref(), Some("dark"));

        theme.toggle_theme();
        assert!(!classes.contains(DARK_CLASS));
        writer.flush().unwrap();
        assert_eq!(store.get(THEME_KEY).unwrap().as_deref(), Some("light"));
    }

    #[test]
    fn test_set_theme_survives_reload() {
        let (store, writer) = writer_with(None);
        let mut theme = ThemeStore::boot(writer.clone(), &FixedPreference(true), RootClassList::new());
        assert!(theme.is_dark());

        theme.set_theme(Theme::Light);
        writer.flush().unwrap();

        let reloaded = ThemeStore::boot(
            DeferredWriter::new(store),
            &FixedPreference(true),
            RootClassList::new(),
        );
        assert!(reloaded.is_light());
    }

    #[test]
    fn test_on_change_fires_only_on_change() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let (_, writer) = writer_with(None);
        let mut theme = ThemeStore::boot(writer, &FixedPreference(false), RootClassList::new());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        theme.on_change(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        theme.set_theme(Theme::Light);
        theme.set_theme(Theme::Dark);
        theme.set_theme(Theme::Dark);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_theme_parse() {
        assert_eq!("dark".parse::<Theme>().unwrap(), Theme::Dark);
        assert!("Dark".parse::<Theme>().is_err());
        assert_eq!(Theme::Light.to_string(), "light");
    }
}
