//! IPTV Browser
//! Desktop client for a channels REST service: login, browse, filter, play

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use eframe::egui;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

mod actions;
mod api;
mod catalogue;
mod config;
mod country;
mod debounce;
mod error;
mod filter;
mod logger;
mod models;
mod network;
mod player;
mod session;
mod toast;
mod token;
mod watchdog;

use actions::Actions;
use api::{ChannelApi, UreqTransport};
use catalogue::{Catalogue, CatalogueSnapshot};
use config::{AppConfig, DEFAULT_API_BASE_URL};
use debounce::{Debouncer, SEARCH_DELAY};
use error::{ApiError, Recovery};
use filter::{narrow_categories, narrow_countries, FilterState, ALL};
use models::{Channel, Session, Tab};
use network::{NetworkMonitor, PollHandle};
use player::{PlayerEvent, PlayerManager};
use session::{LogoutOutcome, SessionStore};
use toast::{ToastKind, ToastQueue};
use token::TokenStatus;
use watchdog::{SessionWatchdog, WatchdogEvent, WatchdogHandle, SESSION_EXPIRED_NOTICE};

/// Sidebar Favorites/Recent sections show at most this many entries
const SIDEBAR_MAX_ITEMS: usize = 6;
const CONSOLE_MAX_LINES: usize = 500;
const OFFLINE_LOGIN_NOTICE: &str = "You are offline. Please check your connection.";

fn timestamp_now() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

/// Window icon drawn at startup: a rounded teal tile with a screen and a play mark.
fn load_icon() -> egui::IconData {
    let size = 64usize;
    let mut rgba = vec![0u8; size * size * 4];

    for y in 0..size {
        for x in 0..size {
            let idx = (y * size + x) * 4;
            let nx = x as f32 / size as f32;
            let ny = y as f32 / size as f32;

            let corner = 0.14;
            let cx = nx.clamp(corner, 1.0 - corner);
            let cy = ny.clamp(corner, 1.0 - corner);
            let (dx, dy) = (nx - cx, ny - cy);
            if dx * dx + dy * dy > corner * corner {
                continue;
            }

            let in_screen = (0.14..=0.86).contains(&nx) && (0.20..=0.70).contains(&ny);
            let in_play = {
                let px = nx - 0.42;
                let py = ny - 0.45;
                (0.0..=0.18).contains(&px) && py.abs() <= px * 0.7
            };
            let in_stand = (0.38..=0.62).contains(&nx) && (0.76..=0.82).contains(&ny);

            let pixel: [u8; 3] = if in_play {
                [255, 255, 255]
            } else if in_screen {
                [22, 28, 40]
            } else if in_stand {
                [30, 41, 59]
            } else {
                let t = nx * 0.5 + ny * 0.5;
                [
                    (20.0 + 16.0 * t) as u8,
                    (184.0 - 64.0 * t) as u8,
                    (166.0 - 20.0 * t) as u8,
                ]
            };
            rgba[idx..idx + 3].copy_from_slice(&pixel);
            rgba[idx + 3] = 255;
        }
    }

    egui::IconData {
        rgba,
        width: size as u32,
        height: size as u32,
    }
}

// Background task results
enum TaskResult {
    LoggedIn(Session),
    LoginFailed(ApiError),
    CatalogueLoaded {
        epoch: u64,
        snapshot: CatalogueSnapshot,
        refreshed: bool,
    },
    CatalogueFailed {
        epoch: u64,
        error: ApiError,
        refreshed: bool,
    },
    FavoritesUpdated {
        epoch: u64,
        favorites: Vec<Channel>,
        notice: String,
    },
    RecentUpdated {
        epoch: u64,
        recent: Vec<Channel>,
        notice: Option<String>,
    },
    ActionFailed {
        epoch: u64,
        error: ApiError,
        context: &'static str,
        notify_user: bool,
    },
    SessionEnded {
        epoch: u64,
        event: WatchdogEvent,
        outcome: LogoutOutcome,
    },
    PlayerLog(String),
    PlayerExited { name: String, code: Option<i32> },
}

/// Clicks collected while drawing, applied once the frame's borrows end
enum UiAction {
    Play(Channel),
    ToggleFavorite(Channel),
    RemoveRecent(Channel),
    SelectCategory(String),
    SelectCountry(String),
    ClearFilters,
    NextPage(usize),
    PrevPage,
    Retry,
    Refresh,
    Logout,
    OpenTab(Tab),
}

fn main() -> Result<(), eframe::Error> {
    let config = AppConfig::load();
    logger::init_logging(&config.log_level);
    tracing::info!("Starting IPTV Browser {}", env!("CARGO_PKG_VERSION"));

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 720.0])
            .with_min_inner_size([900.0, 540.0])
            .with_icon(load_icon()),
        vsync: true,
        hardware_acceleration: eframe::HardwareAcceleration::Preferred,
        ..Default::default()
    };

    eframe::run_native(
        "IPTV Browser",
        options,
        Box::new(|cc| {
            cc.egui_ctx.set_fonts(emoji_fonts());
            cc.egui_ctx.set_visuals(if config.dark_mode {
                egui::Visuals::dark()
            } else {
                egui::Visuals::light()
            });
            Ok(Box::new(IptvApp::new(cc.egui_ctx.clone(), config)?))
        }),
    )
}

/// Default fonts plus the first system emoji font found for this OS.
fn emoji_fonts() -> egui::FontDefinitions {
    let mut fonts = egui::FontDefinitions::default();

    #[cfg(target_os = "windows")]
    let candidates: &[&str] = &["C:\\Windows\\Fonts\\seguiemj.ttf"];
    #[cfg(target_os = "macos")]
    let candidates: &[&str] = &["/System/Library/Fonts/Apple Color Emoji.ttc"];
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let candidates: &[&str] = &[
        "/usr/share/fonts/truetype/noto/NotoColorEmoji.ttf",
        "/usr/share/fonts/noto-emoji/NotoColorEmoji.ttf",
        "/usr/share/fonts/google-noto-emoji/NotoColorEmoji.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    ];

    if let Some(font_data) = candidates.iter().find_map(|path| std::fs::read(path).ok()) {
        fonts.font_data.insert(
            "emoji".to_owned(),
            egui::FontData::from_owned(font_data).into(),
        );
        fonts
            .families
            .entry(egui::FontFamily::Proportional)
            .or_default()
            .push("emoji".to_owned());
    }
    fonts
}

fn build_api(config: &AppConfig, session: Arc<SessionStore>) -> Result<ChannelApi, ApiError> {
    let timeout = Duration::from_secs(config.request_timeout_secs.max(1));
    match ChannelApi::new(&config.api_base_url, UreqTransport::new(timeout), session.clone()) {
        Ok(api) => Ok(api),
        Err(e) => {
            tracing::error!("{}. Falling back to {}", e, DEFAULT_API_BASE_URL);
            ChannelApi::new(DEFAULT_API_BASE_URL, UreqTransport::new(timeout), session)
        }
    }
}

struct IptvApp {
    ctx: egui::Context,
    config: AppConfig,
    session: Arc<SessionStore>,
    actions: Actions,
    network: NetworkMonitor,
    _poller: Option<PollHandle>,
    watchdog: Option<WatchdogHandle>,

    // Session state; the epoch invalidates results from an earlier session
    logged_in: bool,
    session_epoch: u64,
    username_input: String,
    login_in_progress: bool,
    login_notice: Option<String>,

    catalogue: Catalogue,
    filter: FilterState,
    current_tab: Tab,
    search_input: String,
    search_debounce: Debouncer<String>,
    category_query_input: String,
    category_query: String,
    category_debounce: Debouncer<String>,
    country_query_input: String,
    country_query: String,
    country_debounce: Debouncer<String>,

    toasts: ToastQueue,
    player: PlayerManager,
    now_playing: Option<Channel>,
    error_message: Option<String>,
    loading: bool,
    refreshing: bool,
    was_online: bool,
    status_message: String,
    console_log: Vec<String>,

    task_sender: Sender<TaskResult>,
    task_receiver: Receiver<TaskResult>,
}

impl IptvApp {
    fn new(ctx: egui::Context, config: AppConfig) -> Result<Self, ApiError> {
        let session = Arc::new(SessionStore::open_default());
        let api = Arc::new(build_api(&config, session.clone())?);
        let network = NetworkMonitor::default();
        let poller = network.start_polling(
            api.base_url().clone(),
            Duration::from_secs(config.network_check_secs.max(1)),
        );
        Ok(Self::with_parts(ctx, config, session, api, network, Some(poller)))
    }

    fn with_parts(
        ctx: egui::Context,
        config: AppConfig,
        session: Arc<SessionStore>,
        api: Arc<ChannelApi>,
        network: NetworkMonitor,
        poller: Option<PollHandle>,
    ) -> Self {
        let actions = Actions::new(api, network.clone()).with_recent_limit(config.recent_limit);
        let (task_sender, task_receiver) = channel();

        let mut app = Self {
            ctx,
            config,
            session,
            actions,
            network,
            _poller: poller,
            watchdog: None,
            logged_in: false,
            session_epoch: 0,
            username_input: String::new(),
            login_in_progress: false,
            login_notice: None,
            catalogue: Catalogue::default(),
            filter: FilterState::default(),
            current_tab: Tab::Channels,
            search_input: String::new(),
            search_debounce: Debouncer::new(SEARCH_DELAY),
            category_query_input: String::new(),
            category_query: String::new(),
            category_debounce: Debouncer::new(SEARCH_DELAY),
            country_query_input: String::new(),
            country_query: String::new(),
            country_debounce: Debouncer::new(SEARCH_DELAY),
            toasts: ToastQueue::default(),
            player: PlayerManager::new(),
            now_playing: None,
            error_message: None,
            loading: false,
            refreshing: false,
            was_online: true,
            status_message: "Ready".to_string(),
            console_log: Vec::new(),
            task_sender,
            task_receiver,
        };
        app.log(&format!("[INFO] API server: {}", app.actions.api().base_url()));
        app.resume_session();
        app
    }

    fn log(&mut self, message: &str) {
        self.console_log.push(format!("[{}] {}", timestamp_now(), message));
        if self.console_log.len() > CONSOLE_MAX_LINES {
            self.console_log.remove(0);
        }
    }

    /// Run `task` on a worker thread and wake the UI when it reports back.
    fn spawn_task<F>(&self, task: F)
    where
        F: FnOnce() -> TaskResult + Send + 'static,
    {
        let sender = self.task_sender.clone();
        let ctx = self.ctx.clone();
        thread::spawn(move || {
            let _ = sender.send(task());
            ctx.request_repaint();
        });
    }

    fn resume_session(&mut self) {
        match self.session.status() {
            TokenStatus::Valid { .. } if self.session.is_logged_in() => {
                let name = self.session.display_name().unwrap_or_default();
                self.log(&format!("[INFO] Resuming session for {}", name));
                self.enter_session();
            }
            TokenStatus::Missing => {}
            _ => {
                if self.session.logout() == LogoutOutcome::ReloadRequired {
                    self.log("[ERROR] Could not clear the stored session");
                }
                self.log("[WARN] Stored session is no longer valid");
                self.login_notice = Some(SESSION_EXPIRED_NOTICE.to_string());
            }
        }
    }

    fn enter_session(&mut self) {
        self.logged_in = true;
        self.session_epoch += 1;
        self.login_notice = None;
        self.start_watchdog();
        self.load_catalogue(false);
    }

    fn start_watchdog(&mut self) {
        self.stop_watchdog();
        let sender = self.task_sender.clone();
        let ctx = self.ctx.clone();
        let epoch = self.session_epoch;
        let interval = Duration::from_secs(self.config.watchdog_interval_secs.max(1));
        self.watchdog = Some(SessionWatchdog::start(
            self.session.clone(),
            interval,
            move |event, outcome| {
                let _ = sender.send(TaskResult::SessionEnded { epoch, event, outcome });
                ctx.request_repaint();
            },
        ));
    }

    fn stop_watchdog(&mut self) {
        if let Some(mut handle) = self.watchdog.take() {
            handle.stop();
        }
    }

    fn login(&mut self, username: &str) {
        if !self.network.is_online() {
            self.toasts.error(OFFLINE_LOGIN_NOTICE);
            return;
        }
        self.login_in_progress = true;
        self.status_message = "Logging in...".to_string();

        let session = self.session.clone();
        let api = self.actions.api().clone();
        let username = username.to_string();
        self.spawn_task(move || match session.login(&api, &username) {
            Ok(session) => TaskResult::LoggedIn(session),
            Err(error) => TaskResult::LoginFailed(error),
        });
    }

    fn logout(&mut self) {
        self.stop_watchdog();
        self.player.stop();
        match self.session.logout() {
            LogoutOutcome::Cleared => {
                self.return_to_login(None);
                self.log("[INFO] Logged out");
                self.toasts.info("Logged out");
            }
            LogoutOutcome::ReloadRequired => {
                self.reset_app("Logout failed. The application was reset.");
            }
        }
    }

    /// Drop everything tied to the current session and show the login screen.
    fn return_to_login(&mut self, notice: Option<String>) {
        self.stop_watchdog();
        self.session_epoch += 1;
        self.logged_in = false;
        self.login_in_progress = false;
        self.loading = false;
        self.refreshing = false;
        self.catalogue.clear();
        self.clear_filters();
        self.error_message = None;
        self.now_playing = None;
        self.current_tab = Tab::Channels;
        self.status_message = "Ready".to_string();
        if let Some(notice) = &notice {
            self.log(&format!("[WARN] {}", notice));
        }
        self.login_notice = notice;
    }

    /// Full reset, used when the session could not be cleared or access was denied.
    fn reset_app(&mut self, reason: &str) {
        self.log(&format!("[ERROR] {}", reason));
        self.player.stop();
        if let Err(e) = self.session.clear() {
            self.log(&format!("[ERROR] Failed to clear session storage: {}", e));
        }
        self.toasts = ToastQueue::default();
        self.username_input.clear();
        self.category_query_input.clear();
        self.category_query.clear();
        self.category_debounce.cancel();
        self.country_query_input.clear();
        self.country_query.clear();
        self.country_debounce.cancel();
        self.return_to_login(Some(reason.to_string()));
    }

    fn clear_filters(&mut self) {
        self.filter.clear();
        self.search_input.clear();
        self.search_debounce.cancel();
    }

    fn load_catalogue(&mut self, refresh: bool) {
        if refresh {
            self.refreshing = true;
            self.status_message = "Refreshing playlist...".to_string();
        } else {
            self.loading = true;
            self.error_message = None;
            self.status_message = "Loading channels...".to_string();
        }

        let actions = self.actions.clone();
        let epoch = self.session_epoch;
        let playlist_url = self.config.playlist_url.clone();
        self.spawn_task(move || {
            let result = if refresh {
                actions.refresh_playlist(&playlist_url)
            } else {
                actions.load_catalogue()
            };
            match result {
                Ok(snapshot) => TaskResult::CatalogueLoaded {
                    epoch,
                    snapshot,
                    refreshed: refresh,
                },
                Err(error) => TaskResult::CatalogueFailed {
                    epoch,
                    error,
                    refreshed: refresh,
                },
            }
        });
    }

    fn play_channel(&mut self, channel: Channel) {
        if let Err(e) = self.actions.ensure_online("play channel") {
            self.log(&format!("[WARN] {}", e));
            self.toasts.error(e.to_string());
            return;
        }

        self.log(&format!("[PLAY] {} - {}", channel.name, channel.channel_url));
        let sender = self.task_sender.clone();
        let ctx = self.ctx.clone();
        let notify = move |event: PlayerEvent| {
            let result = match event {
                PlayerEvent::Log(line) => TaskResult::PlayerLog(line),
                PlayerEvent::Exited { name, code } => TaskResult::PlayerExited { name, code },
            };
            let _ = sender.send(result);
            ctx.request_repaint();
        };

        match self.player.launch(
            &self.config.external_player,
            self.config.single_window_mode,
            &channel,
            notify,
        ) {
            Ok(pid) => {
                self.log(&format!("[PLAY] Player started (PID {})", pid));
                self.status_message = format!("Playing: {}", channel.name);
            }
            Err(e) => {
                self.log(&format!("[ERROR] Failed to start player: {}", e));
                self.toasts.error(format!("Failed to start player: {}", e));
            }
        }
        self.now_playing = Some(channel.clone());

        let actions = self.actions.clone();
        let epoch = self.session_epoch;
        self.spawn_task(move || match actions.play(&channel) {
            Ok(recent) => TaskResult::RecentUpdated {
                epoch,
                recent,
                notice: None,
            },
            Err(error) => TaskResult::ActionFailed {
                epoch,
                error,
                context: "Failed to record watch",
                notify_user: false,
            },
        });
    }

    fn toggle_favorite(&mut self, channel: Channel) {
        let was_favorite = self.catalogue.is_favorite(&channel.id);
        let actions = self.actions.clone();
        let epoch = self.session_epoch;
        self.spawn_task(move || {
            let result = if was_favorite {
                actions.remove_favorite(&channel.id)
            } else {
                actions.add_favorite(&channel.id)
            };
            match result {
                Ok(favorites) => TaskResult::FavoritesUpdated {
                    epoch,
                    favorites,
                    notice: if was_favorite {
                        format!("Removed {} from favorites", channel.name)
                    } else {
                        format!("Added {} to favorites", channel.name)
                    },
                },
                Err(error) => TaskResult::ActionFailed {
                    epoch,
                    error,
                    context: if was_favorite {
                        "Failed to remove favorite"
                    } else {
                        "Failed to add favorite"
                    },
                    notify_user: true,
                },
            }
        });
    }

    fn remove_recent(&mut self, channel: Channel) {
        let actions = self.actions.clone();
        let epoch = self.session_epoch;
        self.spawn_task(move || match actions.remove_recent(&channel.id) {
            Ok(recent) => TaskResult::RecentUpdated {
                epoch,
                recent,
                notice: Some(format!("Removed {} from history", channel.name)),
            },
            Err(error) => TaskResult::ActionFailed {
                epoch,
                error,
                context: "Failed to remove from history",
                notify_user: true,
            },
        });
    }

    fn handle_error(&mut self, error: ApiError, context: &str, notify_user: bool) {
        self.log(&format!("[ERROR] {}: {}", context, error));
        match error.recovery() {
            Recovery::Reset => self.reset_app(&error.to_string()),
            Recovery::Login => self.return_to_login(Some(error.to_string())),
            Recovery::Notify if notify_user => {
                self.toasts.error(error.to_string());
            }
            Recovery::Notify => {}
        }
    }

    fn apply(&mut self, action: UiAction) {
        match action {
            UiAction::Play(channel) => self.play_channel(channel),
            UiAction::ToggleFavorite(channel) => self.toggle_favorite(channel),
            UiAction::RemoveRecent(channel) => self.remove_recent(channel),
            UiAction::SelectCategory(category) => self.filter.set_category(category),
            UiAction::SelectCountry(country) => self.filter.set_country(country),
            UiAction::ClearFilters => self.clear_filters(),
            UiAction::NextPage(total) => self.filter.next_page(total),
            UiAction::PrevPage => self.filter.prev_page(),
            UiAction::Retry => self.load_catalogue(false),
            UiAction::Refresh => self.load_catalogue(true),
            UiAction::Logout => self.logout(),
            UiAction::OpenTab(tab) => self.current_tab = tab,
        }
    }

    fn process_tasks(&mut self) {
        while let Ok(result) = self.task_receiver.try_recv() {
            match result {
                TaskResult::LoggedIn(session) => {
                    self.login_in_progress = false;
                    self.username_input.clear();
                    self.log(&format!("[INFO] Logged in as {}", session.user_id));
                    self.toasts.success("Login successful!");
                    self.enter_session();
                }
                TaskResult::LoginFailed(error) => {
                    self.login_in_progress = false;
                    self.status_message = "Login failed".to_string();
                    self.log(&format!("[ERROR] Login failed: {}", error));
                    self.toasts.error(error.to_string());
                }
                TaskResult::CatalogueLoaded { epoch, snapshot, refreshed } => {
                    if epoch != self.session_epoch {
                        continue;
                    }
                    self.loading = false;
                    self.refreshing = false;
                    self.error_message = None;
                    self.catalogue.apply_snapshot(snapshot);
                    let count = self.catalogue.channels.len();
                    self.status_message = format!("Loaded {} channels", count);
                    self.log(&format!("[INFO] Loaded {} channels", count));
                    if refreshed {
                        self.toasts.success("Playlist refreshed successfully");
                    }
                }
                TaskResult::CatalogueFailed { epoch, error, refreshed } => {
                    if epoch != self.session_epoch {
                        continue;
                    }
                    self.loading = false;
                    self.refreshing = false;
                    self.status_message = error.to_string();
                    if error.ends_session() {
                        self.handle_error(error, "Failed to load data", true);
                    } else if refreshed {
                        self.handle_error(error, "Failed to refresh playlist", true);
                    } else {
                        self.log(&format!("[ERROR] Failed to load data: {}", error));
                        self.catalogue.clear();
                        self.toasts.error(match error {
                            ApiError::NoChannels => "No channels available".to_string(),
                            ref other => other.to_string(),
                        });
                        self.error_message = Some(error.to_string());
                    }
                }
                TaskResult::FavoritesUpdated { epoch, favorites, notice } => {
                    if epoch != self.session_epoch {
                        continue;
                    }
                    self.catalogue.replace_favorites(favorites);
                    self.log(&format!("[INFO] {}", notice));
                    self.toasts.success(notice);
                }
                TaskResult::RecentUpdated { epoch, recent, notice } => {
                    if epoch != self.session_epoch {
                        continue;
                    }
                    self.catalogue.replace_recent(recent);
                    if let Some(notice) = notice {
                        self.log(&format!("[INFO] {}", notice));
                        self.toasts.success(notice);
                    }
                }
                TaskResult::ActionFailed { epoch, error, context, notify_user } => {
                    if epoch != self.session_epoch {
                        continue;
                    }
                    self.handle_error(error, context, notify_user);
                }
                TaskResult::SessionEnded { epoch, event, outcome } => {
                    if epoch != self.session_epoch || !self.logged_in {
                        continue;
                    }
                    self.player.stop();
                    match outcome {
                        LogoutOutcome::Cleared => {
                            self.toasts.warning(event.notice());
                            self.return_to_login(Some(event.notice().to_string()));
                        }
                        LogoutOutcome::ReloadRequired => self.reset_app(event.notice()),
                    }
                }
                TaskResult::PlayerLog(line) => self.log(&line),
                TaskResult::PlayerExited { name, code } => {
                    let code = code.map_or("unknown".to_string(), |c| c.to_string());
                    self.log(&format!("[ERROR] Player for {} exited with code {}", name, code));
                    self.toasts.error(format!("Player exited unexpectedly ({})", name));
                }
            }
        }
    }

    fn poll_debouncers(&mut self, ctx: &egui::Context) {
        let now = Instant::now();
        if let Some(search) = self.search_debounce.poll_at(now) {
            self.filter.set_search(search);
        }
        if let Some(query) = self.category_debounce.poll_at(now) {
            self.category_query = query;
        }
        if let Some(query) = self.country_debounce.poll_at(now) {
            self.country_query = query;
        }

        let next = [
            self.search_debounce.remaining_at(now),
            self.category_debounce.remaining_at(now),
            self.country_debounce.remaining_at(now),
        ]
        .into_iter()
        .flatten()
        .min();
        if let Some(next) = next {
            ctx.request_repaint_after(next);
        }
    }

    fn track_network(&mut self, ctx: &egui::Context) {
        let online = self.network.is_online();
        if online != self.was_online {
            self.was_online = online;
            if online {
                self.log("[INFO] Back online");
                self.toasts.success("Back online");
            } else {
                self.log("[WARN] You are offline");
                self.toasts.warning("You are offline. Some features are unavailable.");
            }
        }
        // The polling thread only flips a flag; poll it
        ctx.request_repaint_after(Duration::from_secs(1));
    }

    fn show_login_screen(&mut self, ui: &mut egui::Ui) {
        let online = self.network.is_online();
        let mut submit: Option<String> = None;

        ui.vertical_centered(|ui| {
            ui.add_space(100.0);
            ui.heading("📺 Welcome to IPTV");
            ui.label("Enter a username, or continue as a guest");
            ui.add_space(20.0);

            if let Some(notice) = &self.login_notice {
                ui.colored_label(egui::Color32::YELLOW, notice);
                ui.add_space(10.0);
            }

            let can_submit = online && !self.login_in_progress;
            let response = ui.add_enabled(
                !self.login_in_progress,
                egui::TextEdit::singleline(&mut self.username_input)
                    .hint_text("Username")
                    .desired_width(240.0),
            );
            let pressed_enter =
                response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            ui.add_space(10.0);

            if ui.add_enabled(can_submit, egui::Button::new("🔑 Login")).clicked()
                || (pressed_enter && can_submit)
            {
                submit = Some(self.username_input.clone());
            }
            ui.add_space(5.0);
            if ui
                .add_enabled(can_submit, egui::Button::new("👤 Continue as Guest"))
                .clicked()
            {
                submit = Some("guest".to_string());
            }

            if self.login_in_progress {
                ui.add_space(10.0);
                ui.spinner();
            }
            if !online {
                ui.add_space(10.0);
                ui.colored_label(egui::Color32::RED, "You are offline. Login is not available.");
            }
        });

        if let Some(username) = submit {
            self.login(&username);
        }
    }

    fn show_top_panel(&mut self, ctx: &egui::Context) {
        let mut action: Option<UiAction> = None;

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.add_space(5.0);
            ui.horizontal(|ui| {
                ui.heading("📺 IPTV");
                ui.separator();

                if let Some(name) = self.session.short_display_name() {
                    let full = self.session.display_name().unwrap_or_default();
                    ui.label(egui::RichText::new(format!("👤 {}", name)).strong())
                        .on_hover_text(full);
                    ui.separator();
                }

                let busy = self.loading || self.refreshing;
                if ui
                    .add_enabled(!busy, egui::Button::new("🔄 Refresh"))
                    .on_hover_text("Re-import the playlist on the server")
                    .clicked()
                {
                    action = Some(UiAction::Refresh);
                }

                if ui.checkbox(&mut self.config.dark_mode, "Dark").changed() {
                    self.config.save();
                }
                if ui
                    .checkbox(&mut self.config.single_window_mode, "Single Window")
                    .on_hover_text("Close the previous player when starting a new one")
                    .changed()
                {
                    self.config.save();
                }

                ui.label("Player:");
                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.config.external_player)
                        .hint_text(player::DEFAULT_PLAYER)
                        .desired_width(140.0),
                );
                if response.lost_focus() {
                    self.config.save();
                }
                if ui.button("📂").on_hover_text("Browse for a player").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .set_title("Select Media Player")
                        .pick_file()
                    {
                        self.config.external_player = path.display().to_string();
                        self.config.save();
                    }
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("🚪 Logout").clicked() {
                        action = Some(UiAction::Logout);
                    }
                });
            });

            if !self.network.is_online() {
                ui.colored_label(
                    egui::Color32::YELLOW,
                    "⚠ You are offline. Some features are unavailable.",
                );
            }
            ui.add_space(5.0);
        });

        if let Some(action) = action {
            self.apply(action);
        }
    }

    fn show_status_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("bottom_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if self.loading || self.refreshing || self.login_in_progress {
                    ui.spinner();
                }
                ui.label(&self.status_message);

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if self.network.is_online() {
                        ui.colored_label(egui::Color32::GREEN, "● Online");
                    } else {
                        ui.colored_label(egui::Color32::RED, "● Offline");
                    }
                    if let Some(channel) = &self.now_playing {
                        ui.separator();
                        ui.label(egui::RichText::new(format!("▶ {}", channel.name)).strong());
                    }
                });
            });
        });
    }

    fn show_sidebar(&mut self, ui: &mut egui::Ui) {
        let mut action: Option<UiAction> = None;

        ui.add_space(5.0);
        let response = ui.add(
            egui::TextEdit::singleline(&mut self.search_input)
                .hint_text("🔍 Search channels...")
                .desired_width(f32::INFINITY),
        );
        if response.changed() {
            self.search_debounce.push(self.search_input.clone());
        }
        ui.add_space(5.0);

        egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
            egui::CollapsingHeader::new(format!("⭐ Favorites ({})", self.catalogue.favorites.len()))
                .default_open(true)
                .show(ui, |ui| {
                    if self.catalogue.favorites.is_empty() {
                        ui.label(egui::RichText::new("No favorites yet").weak());
                    }
                    for channel in self.catalogue.favorites.iter().take(SIDEBAR_MAX_ITEMS) {
                        ui.horizontal(|ui| {
                            if ui.small_button("✕").on_hover_text("Remove from favorites").clicked() {
                                action = Some(UiAction::ToggleFavorite(channel.clone()));
                            }
                            if ui.link(&channel.name).clicked() {
                                action = Some(UiAction::Play(channel.clone()));
                            }
                        });
                    }
                    if self.catalogue.favorites.len() > SIDEBAR_MAX_ITEMS && ui.link("Show all").clicked() {
                        action = Some(UiAction::OpenTab(Tab::Favorites));
                    }
                });

            egui::CollapsingHeader::new("🕘 Recently Watched")
                .default_open(true)
                .show(ui, |ui| {
                    if self.catalogue.recent.is_empty() {
                        ui.label(egui::RichText::new("Nothing watched yet").weak());
                    }
                    for channel in self.catalogue.recent.iter().take(SIDEBAR_MAX_ITEMS) {
                        ui.horizontal(|ui| {
                            if ui.small_button("✕").on_hover_text("Remove from history").clicked() {
                                action = Some(UiAction::RemoveRecent(channel.clone()));
                            }
                            if ui.link(&channel.name).clicked() {
                                action = Some(UiAction::Play(channel.clone()));
                            }
                        });
                    }
                    if self.catalogue.recent.len() > SIDEBAR_MAX_ITEMS && ui.link("Show all").clicked() {
                        action = Some(UiAction::OpenTab(Tab::Recent));
                    }
                });

            egui::CollapsingHeader::new("📂 Categories")
                .default_open(true)
                .show(ui, |ui| {
                    let response = ui.add(
                        egui::TextEdit::singleline(&mut self.category_query_input)
                            .hint_text("Filter categories...")
                            .desired_width(f32::INFINITY),
                    );
                    if response.changed() {
                        self.category_debounce.push(self.category_query_input.clone());
                    }
                    let matches = narrow_categories(&self.catalogue.categories, &self.category_query);
                    if matches.is_empty() {
                        ui.label(egui::RichText::new("No matches found").weak());
                    }
                    for category in matches {
                        let selected = self.filter.category() == category.as_str();
                        if ui.selectable_label(selected, category.as_str()).clicked() {
                            action = Some(UiAction::SelectCategory(category.clone()));
                        }
                    }
                });

            egui::CollapsingHeader::new("🌍 Countries")
                .default_open(false)
                .show(ui, |ui| {
                    let response = ui.add(
                        egui::TextEdit::singleline(&mut self.country_query_input)
                            .hint_text("Filter countries...")
                            .desired_width(f32::INFINITY),
                    );
                    if response.changed() {
                        self.country_debounce.push(self.country_query_input.clone());
                    }
                    let matches = narrow_countries(&self.catalogue.countries, &self.country_query);
                    if matches.is_empty() {
                        ui.label(egui::RichText::new("No matches found").weak());
                    }
                    for code in matches {
                        let selected = self.filter.country() == code.as_str();
                        let label = if code == ALL {
                            ALL.to_string()
                        } else {
                            format!("{} ({})", country::country_name(code), code)
                        };
                        if ui.selectable_label(selected, label).clicked() {
                            action = Some(UiAction::SelectCountry(code.clone()));
                        }
                    }
                });
        });

        if let Some(action) = action {
            self.apply(action);
        }
    }

    fn channel_row(&self, ui: &mut egui::Ui, channel: &Channel, action: &mut Option<UiAction>) {
        let is_favorite = self.catalogue.is_favorite(&channel.id);
        let is_playing = self.now_playing.as_ref().is_some_and(|c| c.id == channel.id);

        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.horizontal(|ui| {
                let star = if is_favorite {
                    egui::RichText::new("★").size(16.0).color(egui::Color32::GOLD)
                } else {
                    egui::RichText::new("☆").size(16.0).color(egui::Color32::GRAY)
                };
                let hover = if is_favorite { "Remove from favorites" } else { "Add to favorites" };
                if ui.button(star).on_hover_text(hover).clicked() {
                    *action = Some(UiAction::ToggleFavorite(channel.clone()));
                }
                if ui.button("▶").on_hover_text("Play").clicked() {
                    *action = Some(UiAction::Play(channel.clone()));
                }

                let name = egui::RichText::new(&channel.name).strong();
                ui.label(if is_playing { name.color(egui::Color32::GREEN) } else { name });

                if let Some(category) = channel.category.as_deref().filter(|c| !c.is_empty()) {
                    ui.label(egui::RichText::new(format!("({})", category)).weak());
                }
                if let Some(code) = channel.country.as_deref().filter(|c| !c.is_empty()) {
                    ui.label(egui::RichText::new(country::country_name(code)).small())
                        .on_hover_text(code);
                }
                if let Some(language) = channel.language.as_deref().filter(|l| !l.is_empty()) {
                    ui.label(egui::RichText::new(format!("[{}]", language)).small().weak());
                }
            });
        });
    }

    fn show_channels_tab(&mut self, ui: &mut egui::Ui) {
        let mut action: Option<UiAction> = None;

        if self.loading && self.catalogue.is_empty() {
            ui.vertical_centered(|ui| {
                ui.add_space(50.0);
                ui.spinner();
                ui.label("Loading channels...");
            });
            return;
        }

        if let Some(message) = self.error_message.clone() {
            ui.vertical_centered(|ui| {
                ui.add_space(50.0);
                ui.heading(egui::RichText::new(message).color(egui::Color32::RED));
                ui.add_space(10.0);
                if ui.button("🔄 Retry").clicked() {
                    action = Some(UiAction::Retry);
                }
            });
            if let Some(action) = action {
                self.apply(action);
            }
            return;
        }

        let view = self.filter.view(&self.catalogue.channels);

        ui.horizontal(|ui| {
            ui.heading("Channels");
            ui.label(
                egui::RichText::new(format!(
                    "{} of {} channels",
                    view.total_filtered,
                    self.catalogue.channels.len()
                ))
                .weak(),
            );
            if self.filter.has_active_filters() {
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("✕ Clear filters").clicked() {
                        action = Some(UiAction::ClearFilters);
                    }
                });
            }
        });
        ui.separator();

        if view.items.is_empty() {
            ui.vertical_centered(|ui| {
                ui.add_space(50.0);
                ui.heading("No channels found");
                ui.label("Try a different search or filter");
            });
        } else {
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .max_height(ui.available_height() - 36.0)
                .show(ui, |ui| {
                    for channel in &view.items {
                        self.channel_row(ui, channel, &mut action);
                    }
                });

            ui.separator();
            ui.horizontal(|ui| {
                if ui.add_enabled(view.has_prev(), egui::Button::new("◀ Prev")).clicked() {
                    action = Some(UiAction::PrevPage);
                }
                ui.label(format!("Page {} of {}", view.page, view.total_pages));
                if ui.add_enabled(view.has_next(), egui::Button::new("Next ▶")).clicked() {
                    action = Some(UiAction::NextPage(view.total_pages));
                }
            });
        }

        if let Some(action) = action {
            self.apply(action);
        }
    }

    fn show_list_tab(&mut self, ui: &mut egui::Ui, tab: Tab) {
        let mut action: Option<UiAction> = None;
        let (title, empty_title, empty_hint, channels) = match tab {
            Tab::Favorites => (
                "Favorites",
                "No favorites yet",
                "Click ☆ on a channel to add it here",
                &self.catalogue.favorites,
            ),
            _ => (
                "Recently Watched",
                "No watch history",
                "Channels you play will appear here",
                &self.catalogue.recent,
            ),
        };

        ui.heading(title);
        ui.separator();

        if channels.is_empty() {
            ui.vertical_centered(|ui| {
                ui.add_space(50.0);
                ui.heading(empty_title);
                ui.label(empty_hint);
            });
            return;
        }

        egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
            for channel in channels {
                ui.horizontal(|ui| {
                    if tab == Tab::Recent
                        && ui.small_button("✕").on_hover_text("Remove from history").clicked()
                    {
                        action = Some(UiAction::RemoveRecent(channel.clone()));
                    }
                    self.channel_row(ui, channel, &mut action);
                });
            }
        });

        if let Some(action) = action {
            self.apply(action);
        }
    }

    fn show_console_tab(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Console Log");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("🗑 Clear").clicked() {
                    self.console_log.clear();
                    self.console_log.push(format!("[{}] Console cleared", timestamp_now()));
                }
            });
        });
        ui.separator();

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in &self.console_log {
                    let color = if line.contains("[ERROR]") {
                        egui::Color32::RED
                    } else if line.contains("[WARN]") {
                        egui::Color32::YELLOW
                    } else if line.contains("[INFO]") {
                        egui::Color32::LIGHT_BLUE
                    } else if line.contains("[PLAY]") {
                        egui::Color32::GREEN
                    } else {
                        egui::Color32::GRAY
                    };
                    ui.label(egui::RichText::new(line).monospace().color(color));
                }
            });
    }

    fn show_toasts(&mut self, ctx: &egui::Context) {
        if self.toasts.is_empty() {
            return;
        }
        let mut dismissed: Option<u64> = None;

        egui::Area::new(egui::Id::new("toasts"))
            .anchor(egui::Align2::RIGHT_BOTTOM, [-12.0, -40.0])
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                for toast in self.toasts.iter() {
                    let color = match toast.kind {
                        ToastKind::Success => egui::Color32::GREEN,
                        ToastKind::Error => egui::Color32::RED,
                        ToastKind::Warning => egui::Color32::YELLOW,
                        ToastKind::Info => egui::Color32::LIGHT_BLUE,
                    };
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.horizontal(|ui| {
                            ui.label(egui::RichText::new(toast.kind.icon()).color(color));
                            ui.label(&toast.message);
                            if ui.small_button("✕").clicked() {
                                dismissed = Some(toast.id);
                            }
                        });
                    });
                }
            });

        if let Some(id) = dismissed {
            self.toasts.dismiss(id);
        }
    }
}

impl eframe::App for IptvApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_tasks();
        self.poll_debouncers(ctx);
        self.track_network(ctx);
        if let Some(next) = self.toasts.prune() {
            ctx.request_repaint_after(next);
        }

        ctx.set_visuals(if self.config.dark_mode {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        });

        if !self.logged_in {
            self.show_status_panel(ctx);
            egui::CentralPanel::default().show(ctx, |ui| self.show_login_screen(ui));
        } else {
            self.show_top_panel(ctx);
            self.show_status_panel(ctx);

            egui::SidePanel::left("sidebar")
                .resizable(true)
                .default_width(240.0)
                .show(ctx, |ui| self.show_sidebar(ui));

            egui::CentralPanel::default().show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.selectable_value(&mut self.current_tab, Tab::Channels, "📺 Channels");
                    ui.selectable_value(
                        &mut self.current_tab,
                        Tab::Favorites,
                        format!("⭐ Favorites ({})", self.catalogue.favorites.len()),
                    );
                    ui.selectable_value(&mut self.current_tab, Tab::Recent, "🕘 Recent");
                    ui.selectable_value(&mut self.current_tab, Tab::Console, "🖥 Console");
                });
                ui.separator();

                match self.current_tab {
                    Tab::Channels => self.show_channels_tab(ui),
                    Tab::Favorites => self.show_list_tab(ui, Tab::Favorites),
                    Tab::Recent => self.show_list_tab(ui, Tab::Recent),
                    Tab::Console => self.show_console_tab(ui),
                }
            });
        }

        self.show_toasts(ctx);
    }
}
