//! User actions: offline guard, mutate, then re-fetch the affected list

use std::sync::Arc;
use std::thread;

use crate::api::{ChannelApi, DEFAULT_RECENT_LIMIT};
use crate::catalogue::CatalogueSnapshot;
use crate::error::ApiError;
use crate::models::{Channel, ChannelId};
use crate::network::NetworkMonitor;

/// Cloneable so each background worker can own a copy.
#[derive(Clone)]
pub struct Actions {
    api: Arc<ChannelApi>,
    network: NetworkMonitor,
    recent_limit: i64,
}

impl Actions {
    pub fn new(api: Arc<ChannelApi>, network: NetworkMonitor) -> Self {
        Self {
            api,
            network,
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }

    pub fn with_recent_limit(mut self, limit: i64) -> Self {
        self.recent_limit = limit;
        self
    }

    pub fn api(&self) -> &Arc<ChannelApi> {
        &self.api
    }

    pub fn network(&self) -> &NetworkMonitor {
        &self.network
    }

    pub fn ensure_online(&self, action: &str) -> Result<(), ApiError> {
        if self.network.is_online() {
            Ok(())
        } else {
            tracing::warn!("Offline, skipping: {}", action);
            Err(ApiError::Offline(action.to_string()))
        }
    }

    /// Fetch channels, favorites, recent history and both facet lists in parallel.
    pub fn load_catalogue(&self) -> Result<CatalogueSnapshot, ApiError> {
        self.ensure_online("load data")?;
        let api = self.api.as_ref();
        let limit = self.recent_limit;

        let (channels, favorites, recent, categories, countries) = thread::scope(|s| {
            let channels = s.spawn(|| api.channels());
            let favorites = s.spawn(|| api.favorites());
            let recent = s.spawn(move || api.recently_watched(limit));
            let categories = s.spawn(|| api.categories());
            let countries = s.spawn(|| api.countries());
            (
                joined(channels.join()),
                joined(favorites.join()),
                joined(recent.join()),
                joined(categories.join()),
                joined(countries.join()),
            )
        });

        let snapshot = CatalogueSnapshot {
            channels: channels?,
            favorites: favorites?,
            recent: recent?,
            categories: categories?,
            countries: countries?,
        };
        if snapshot.channels.is_empty() {
            return Err(ApiError::NoChannels);
        }
        tracing::info!(
            "Loaded {} channels, {} favorites, {} recent",
            snapshot.channels.len(),
            snapshot.favorites.len(),
            snapshot.recent.len()
        );
        Ok(snapshot)
    }

    /// Record the watch, then return the refreshed history.
    pub fn play(&self, channel: &Channel) -> Result<Vec<Channel>, ApiError> {
        self.ensure_online("play channel")?;
        self.api.record_watch(&channel.id, None)?;
        self.api.recently_watched(self.recent_limit)
    }

    pub fn add_favorite(&self, id: &ChannelId) -> Result<Vec<Channel>, ApiError> {
        self.ensure_online("add favorite")?;
        self.api.toggle_favorite(id, false)?;
        self.api.favorites()
    }

    pub fn remove_favorite(&self, id: &ChannelId) -> Result<Vec<Channel>, ApiError> {
        self.ensure_online("remove favorite")?;
        self.api.toggle_favorite(id, true)?;
        self.api.favorites()
    }

    pub fn remove_recent(&self, id: &ChannelId) -> Result<Vec<Channel>, ApiError> {
        self.ensure_online("remove from history")?;
        self.api.remove_recently_watched(id)?;
        self.api.recently_watched(self.recent_limit)
    }

    /// Server-side re-import, then a full catalogue reload.
    pub fn refresh_playlist(&self, playlist_url: &str) -> Result<CatalogueSnapshot, ApiError> {
        self.ensure_online("refresh playlist")?;
        self.api.refresh_playlist(playlist_url)?;
        self.load_catalogue()
    }
}

fn joined<T>(result: thread::Result<Result<T, ApiError>>) -> Result<T, ApiError> {
    result.unwrap_or_else(|_| Err(ApiError::Api("Request worker panicked".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{api_with, channel_json, FakeTransport};
    use crate::api::Method;
    use crate::session::SessionStore;
    use crate::token::encode_token;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn setup(online: bool) -> (FakeTransport, Actions) {
        let transport = FakeTransport::new();
        let session = Arc::new(SessionStore::in_memory());
        session
            .establish(&encode_token(&json!({ "exp": 4_000_000_000i64 })), "ann")
            .unwrap();
        let api = Arc::new(api_with(&transport, session));
        (transport, Actions::new(api, NetworkMonitor::fixed(online)))
    }

    fn catalogue_routes(transport: &FakeTransport) {
        transport.ok(
            Method::Get,
            "/api/channels",
            json!([
                channel_json(1, "CNN", "News", "US"),
                channel_json(42, "ESPN", "Sports", "US"),
            ]),
        );
        transport.ok(Method::Get, "/api/channels/favorites", json!([channel_json(1, "CNN", "News", "US")]));
        transport.ok(Method::Get, "/api/channels/recently-watched", json!([]));
        transport.ok(Method::Get, "/api/channels/categories", json!(["News", "Sports"]));
        transport.ok(Method::Get, "/api/channels/countries", json!(["US"]));
    }

    #[test]
    fn test_load_catalogue() {
        let (transport, actions) = setup(true);
        catalogue_routes(&transport);

        let snapshot = actions.load_catalogue().unwrap();
        assert_eq!(snapshot.channels.len(), 2);
        assert_eq!(snapshot.favorites.len(), 1);
        assert_eq!(snapshot.categories, vec!["News".to_string(), "Sports".to_string()]);
        assert_eq!(transport.request_count(), 5);
        assert!(transport
            .requests()
            .iter()
            .any(|r| r.url.ends_with("recently-watched?limit=10")));
    }

    #[test]
    fn test_load_catalogue_first_failure_wins() {
        let (transport, actions) = setup(true);
        catalogue_routes(&transport);
        transport.route(Method::Get, "/api/channels/favorites", 500, "");

        assert_eq!(
            actions.load_catalogue().unwrap_err(),
            ApiError::ServerError { status: 500 }
        );
    }

    #[test]
    fn test_empty_catalogue() {
        let (transport, actions) = setup(true);
        catalogue_routes(&transport);
        transport.ok(Method::Get, "/api/channels", json!([]));

        let err = actions.load_catalogue().unwrap_err();
        assert_eq!(err.to_string(), "No channels available. Please try again.");
    }

    #[test]
    fn test_offline_favorite_makes_no_request() {
        let (transport, actions) = setup(false);

        let err = actions.add_favorite(&ChannelId::from(42)).unwrap_err();
        assert_eq!(err.to_string(), "You are offline. Cannot add favorite.");
        assert_eq!(transport.request_count(), 0);

        let err = actions.remove_favorite(&ChannelId::from(42)).unwrap_err();
        assert_eq!(err, ApiError::Offline("remove favorite".to_string()));
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn test_offline_messages() {
        let (transport, actions) = setup(false);
        let channel: Channel = serde_json::from_value(channel_json(1, "CNN", "News", "US")).unwrap();

        assert_eq!(
            actions.play(&channel).unwrap_err().to_string(),
            "You are offline. Cannot play channel."
        );
        assert_eq!(
            actions.remove_recent(&channel.id).unwrap_err().to_string(),
            "You are offline. Cannot remove from history."
        );
        assert_eq!(
            actions.refresh_playlist("http://x/list.m3u").unwrap_err().to_string(),
            "You are offline. Cannot refresh playlist."
        );
        assert_eq!(
            actions.load_catalogue().unwrap_err().to_string(),
            "You are offline. Cannot load data."
        );
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn test_play_records_then_refetches() {
        let (transport, actions) = setup(true);
        transport.ok(Method::Post, "/api/channels/42/watch", serde_json::Value::Null);
        transport.ok(
            Method::Get,
            "/api/channels/recently-watched",
            json!([channel_json(42, "ESPN", "Sports", "US")]),
        );
        let channel: Channel = serde_json::from_value(channel_json(42, "ESPN", "Sports", "US")).unwrap();

        let recent = actions.play(&channel).unwrap();
        assert_eq!(recent[0].id, ChannelId::from(42));

        let methods: Vec<Method> = transport.requests().iter().map(|r| r.method).collect();
        assert_eq!(methods, vec![Method::Post, Method::Get]);
    }

    #[test]
    fn test_failed_mutation_skips_refetch() {
        let (transport, actions) = setup(true);
        transport.route(Method::Post, "/api/channels/42/favorite", 500, "");

        assert!(actions.add_favorite(&ChannelId::from(42)).is_err());
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn test_remove_favorite_refetches_list() {
        let (transport, actions) = setup(true);
        transport.ok(Method::Delete, "/api/channels/1/favorite", serde_json::Value::Null);
        transport.ok(Method::Get, "/api/channels/favorites", json!([]));

        assert!(actions.remove_favorite(&ChannelId::from(1)).unwrap().is_empty());
        let requests = transport.requests();
        assert_eq!(requests[0].method, Method::Delete);
        assert!(requests[1].url.ends_with("/api/channels/favorites"));
    }

    #[test]
    fn test_refresh_playlist_reloads_catalogue() {
        let (transport, actions) = setup(true);
        catalogue_routes(&transport);
        transport.ok(Method::Post, "/api/channels/refresh", json!({ "imported": 2 }));

        let snapshot = actions.refresh_playlist("http://x/list.m3u").unwrap();
        assert_eq!(snapshot.channels.len(), 2);
        assert_eq!(transport.requests()[0].method, Method::Post);
        assert_eq!(transport.request_count(), 6);
    }
}
