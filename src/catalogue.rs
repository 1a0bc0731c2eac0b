//! In-memory catalogue: channels, favorites, recent history and filter facets

use std::collections::{BTreeSet, HashSet};

use crate::filter::ALL;
use crate::models::{Channel, ChannelId};

/// Everything one `load_catalogue` round trip returns.
#[derive(Debug, Clone, Default)]
pub struct CatalogueSnapshot {
    pub channels: Vec<Channel>,
    pub favorites: Vec<Channel>,
    pub recent: Vec<Channel>,
    pub categories: Vec<String>,
    pub countries: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Catalogue {
    pub channels: Vec<Channel>,
    pub favorites: Vec<Channel>,
    /// Server order, most recent first
    pub recent: Vec<Channel>,
    pub categories: Vec<String>,
    pub countries: Vec<String>,
    favorite_ids: HashSet<ChannelId>,
}

impl Default for Catalogue {
    fn default() -> Self {
        Self {
            channels: Vec::new(),
            favorites: Vec::new(),
            recent: Vec::new(),
            categories: vec![ALL.to_string()],
            countries: vec![ALL.to_string()],
            favorite_ids: HashSet::new(),
        }
    }
}

impl Catalogue {
    pub fn apply_snapshot(&mut self, snapshot: CatalogueSnapshot) {
        self.channels = snapshot.channels;
        self.categories = build_categories(&snapshot.categories);
        self.countries = build_countries(&snapshot.countries);
        self.replace_favorites(snapshot.favorites);
        self.replace_recent(snapshot.recent);
    }

    pub fn replace_favorites(&mut self, favorites: Vec<Channel>) {
        self.favorite_ids = favorites.iter().map(|c| c.id.clone()).collect();
        self.favorites = favorites;
    }

    pub fn replace_recent(&mut self, recent: Vec<Channel>) {
        self.recent = recent;
    }

    pub fn is_favorite(&self, id: &ChannelId) -> bool {
        self.favorite_ids.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn find(&self, id: &ChannelId) -> Option<&Channel> {
        self.channels
            .iter()
            .chain(self.favorites.iter())
            .chain(self.recent.iter())
            .find(|c| &c.id == id)
    }

    /// Drop everything, e.g. after logout or a failed load.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Split `;`-joined values, trim, dedupe, sort and prepend `All`.
pub fn build_categories(raw: &[String]) -> Vec<String> {
    let unique: BTreeSet<String> = raw
        .iter()
        .flat_map(|c| c.split(';'))
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    with_all(unique)
}

/// Trim, dedupe, sort and prepend `All`.
pub fn build_countries(raw: &[String]) -> Vec<String> {
    let unique: BTreeSet<String> = raw
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    with_all(unique)
}

fn with_all(values: BTreeSet<String>) -> Vec<String> {
    std::iter::once(ALL.to_string()).chain(values).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn channel(id: i64, name: &str) -> Channel {
        Channel {
            id: ChannelId::from(id),
            name: name.to_string(),
            logo: None,
            category: None,
            country: None,
            language: None,
            channel_url: String::new(),
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_build_categories() {
        let raw = strings(&["News;Sports", " Kids ", "Sports", "", "Music; News"]);
        assert_eq!(
            build_categories(&raw),
            strings(&["All", "Kids", "Music", "News", "Sports"])
        );
    }

    #[test]
    fn test_build_countries() {
        let raw = strings(&["US", " UK", "US", "  ", "DE"]);
        assert_eq!(build_countries(&raw), strings(&["All", "DE", "UK", "US"]));
        assert_eq!(build_countries(&[]), strings(&["All"]));
    }

    #[test]
    fn test_favorite_membership_follows_list() {
        let mut catalogue = Catalogue::default();
        catalogue.replace_favorites(vec![channel(42, "CNN")]);
        assert!(catalogue.is_favorite(&ChannelId::from(42)));

        catalogue.replace_favorites(Vec::new());
        assert!(!catalogue.is_favorite(&ChannelId::from(42)));
    }

    #[test]
    fn test_apply_snapshot_and_clear() {
        let mut catalogue = Catalogue::default();
        catalogue.apply_snapshot(CatalogueSnapshot {
            channels: vec![channel(1, "CNN"), channel(2, "BBC")],
            favorites: vec![channel(2, "BBC")],
            recent: vec![channel(1, "CNN")],
            categories: strings(&["News"]),
            countries: strings(&["US"]),
        });

        assert_eq!(catalogue.channels.len(), 2);
        assert_eq!(catalogue.categories, strings(&["All", "News"]));
        assert!(catalogue.is_favorite(&ChannelId::from(2)));
        assert_eq!(catalogue.find(&ChannelId::from(1)).map(|c| c.name.as_str()), Some("CNN"));

        catalogue.clear();
        assert!(catalogue.is_empty());
        assert_eq!(catalogue.countries, strings(&["All"]));
        assert!(!catalogue.is_favorite(&ChannelId::from(2)));
    }
}
