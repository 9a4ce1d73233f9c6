use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use std::path::{Path, PathBuf};
use tui_input::{Input, InputRequest};

use hotspot_setter::config::AppConfig;
use hotspot_setter::connectivity::has_internet;
use hotspot_setter::crop::{self, CropSession, CropState, Direction, SourceImage};
use hotspot_setter::envfile::{self, EnvEntry, EnvFile};
use hotspot_setter::gallery::{self, SavedImage};
use hotspot_setter::network::{select_backend, NetworkRecord, ScanCache, WifiBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Network,
    Images,
    Environment,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Network, Tab::Images, Tab::Environment];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Network => "Network",
            Tab::Images => "Images",
            Tab::Environment => "Environment",
        }
    }

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    fn previous(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

/// What the text prompt is collecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    Password { ssid: String },
    OpenImage,
    EnvKey { index: Option<usize> },
    EnvValue { index: Option<usize>, key: String },
}

impl Prompt {
    pub fn title(&self) -> String {
        match self {
            Prompt::Password { ssid } => format!("Password for {} (empty if none)", ssid),
            Prompt::OpenImage => "Open image (path)".to_string(),
            Prompt::EnvKey { .. } => "Key".to_string(),
            Prompt::EnvValue { key, .. } => format!("Value for {}", key),
        }
    }

    pub fn is_secret(&self) -> bool {
        matches!(self, Prompt::Password { .. })
    }
}

/// Header read of the selected saved image, refreshed on selection change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SavedDetail {
    Dimensions { width: u32, height: u32 },
    Unreadable(String),
}

#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App {
    pub config: AppConfig,
    pub tab: Tab,
    pub online: bool,
    pub status: Option<StatusMessage>,

    // Network
    backend: Option<Box<dyn WifiBackend>>,
    pub backend_note: String,
    pub scan_cache: ScanCache,
    pub selected_network: usize,
    pub show_raw: bool,
    pub last_diagnostic: Option<String>,

    // Images
    pub sources: Vec<SourceImage>,
    pub selected_source: usize,
    pub crop_session: CropSession,
    pub saved_images: Vec<SavedImage>,
    pub selected_saved: usize,
    pub saved_detail: Option<SavedDetail>,

    // Environment
    pub env: EnvFile,
    pub selected_env: usize,

    pub prompt: Option<Prompt>,
    pub input: Input,
}

impl App {
    pub async fn new(config: AppConfig, image_paths: &[PathBuf]) -> Self {
        let os = std::env::consts::OS;
        let (backend, backend_note) = match select_backend(config.network.backend, os) {
            Ok(backend) => {
                let note = format!("Detected OS: {} (using '{}')", os, backend.tool());
                (Some(backend), note)
            }
            Err(e) => (
                None,
                format!("{}. Only Windows (netsh) and Linux (nmcli) are supported.", e),
            ),
        };

        let mut app = Self::with_backend(config, backend, backend_note);
        for path in image_paths {
            app.open_image(path);
        }
        app.refresh_connectivity().await;
        app
    }

    pub fn with_backend(
        config: AppConfig,
        backend: Option<Box<dyn WifiBackend>>,
        backend_note: String,
    ) -> Self {
        let env_path = config.storage.env_file.clone();
        let (env, status) = match EnvFile::load(&env_path) {
            Ok(env) => (env, None),
            Err(e) => (
                EnvFile::new(env_path),
                Some(StatusMessage {
                    kind: StatusKind::Error,
                    text: e.to_string(),
                }),
            ),
        };

        let mut app = Self {
            config,
            tab: Tab::Network,
            online: false,
            status,
            backend,
            backend_note,
            scan_cache: ScanCache::new(),
            selected_network: 0,
            show_raw: false,
            last_diagnostic: None,
            sources: Vec::new(),
            selected_source: 0,
            crop_session: CropSession::new(),
            saved_images: Vec::new(),
            selected_saved: 0,
            saved_detail: None,
            env,
            selected_env: 0,
            prompt: None,
            input: Input::default(),
        };
        app.refresh_gallery();
        app
    }

    fn set_status(&mut self, kind: StatusKind, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            kind,
            text: text.into(),
        });
    }

    pub async fn refresh_connectivity(&mut self) {
        let probe = &self.config.connectivity;
        self.online = has_internet(&probe.probe_address, probe.timeout()).await;
        tracing::info!("Internet: {}", if self.online { "online" } else { "offline" });
    }

    /// Whether the saved-image gallery may be shown right now.
    pub fn gallery_available(&self) -> bool {
        self.online || !self.config.connectivity.gate_gallery
    }

    pub async fn on_key(&mut self, key: KeyEvent) -> Flow {
        if key.kind != KeyEventKind::Press {
            return Flow::Continue;
        }

        if self.prompt.is_some() {
            self.on_prompt_key(key.code).await;
            return Flow::Continue;
        }

        match key.code {
            KeyCode::Char('q') => return Flow::Quit,
            KeyCode::Tab => self.tab = self.tab.next(),
            KeyCode::BackTab => self.tab = self.tab.previous(),
            KeyCode::Char('i') => {
                self.refresh_connectivity().await;
                let text = if self.online { "Internet: online" } else { "Internet: offline" };
                self.set_status(StatusKind::Info, text);
            }
            code => match self.tab {
                Tab::Network => self.on_network_key(code),
                Tab::Images => self.on_images_key(code),
                Tab::Environment => self.on_env_key(code),
            },
        }
        Flow::Continue
    }

    async fn on_prompt_key(&mut self, code: KeyCode) {
        let request = match code {
            KeyCode::Esc => {
                self.prompt = None;
                self.input.reset();
                return;
            }
            KeyCode::Enter => {
                let value = self.input.value().to_string();
                self.input.reset();
                if let Some(prompt) = self.prompt.take() {
                    self.submit_prompt(prompt, value).await;
                }
                return;
            }
            KeyCode::Char(c) => InputRequest::InsertChar(c),
            KeyCode::Backspace => InputRequest::DeletePrevChar,
            KeyCode::Delete => InputRequest::DeleteNextChar,
            KeyCode::Left => InputRequest::GoToPrevChar,
            KeyCode::Right => InputRequest::GoToNextChar,
            KeyCode::Home => InputRequest::GoToStart,
            KeyCode::End => InputRequest::GoToEnd,
            _ => return,
        };
        self.input.handle(request);
    }

    fn open_prompt(&mut self, prompt: Prompt, initial: &str) {
        self.input = Input::new(initial.to_string());
        self.prompt = Some(prompt);
    }

    async fn submit_prompt(&mut self, prompt: Prompt, value: String) {
        match prompt {
            Prompt::Password { ssid } => {
                let password = (!value.is_empty()).then_some(value);
                self.connect(&ssid, password.as_deref()).await;
            }
            Prompt::OpenImage => {
                let path = value.trim();
                if !path.is_empty() {
                    self.open_image(Path::new(path));
                }
            }
            Prompt::EnvKey { index } => {
                let current = index
                    .and_then(|i| self.env.entries().get(i))
                    .map(|e| e.value.clone())
                    .unwrap_or_default();
                let key = value.trim().to_string();
                if let Err(e) = envfile::validate_key(&key) {
                    self.set_status(StatusKind::Error, e.to_string());
                    return;
                }
                self.open_prompt(Prompt::EnvValue { index, key }, &current);
            }
            Prompt::EnvValue { index, key } => {
                let result = match index {
                    Some(i) => self.env.edit(i, &key, &value).map(|_| ()),
                    None => self.env.add(&key, &value),
                };
                match result {
                    Ok(()) if index.is_none() => self.selected_env = self.env.len() - 1,
                    Ok(()) => {}
                    Err(e) => self.set_status(StatusKind::Error, e.to_string()),
                }
            }
        }
    }

    // Network

    fn on_network_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('s') => self.scan(),
            KeyCode::Up => self.selected_network = previous_index(self.selected_network, self.scan_cache.records().len()),
            KeyCode::Down => self.selected_network = next_index(self.selected_network, self.scan_cache.records().len()),
            KeyCode::Char('o') => self.show_raw = !self.show_raw,
            KeyCode::Enter => {
                if let Some(record) = self.selected_record() {
                    let ssid = record.ssid.clone();
                    self.open_prompt(Prompt::Password { ssid }, "");
                }
            }
            _ => {}
        }
    }

    pub fn selected_record(&self) -> Option<&NetworkRecord> {
        self.scan_cache.get(self.selected_network)
    }

    pub fn scan(&mut self) {
        let Some(backend) = &self.backend else {
            self.set_status(StatusKind::Warning, self.backend_note.clone());
            return;
        };

        let result = backend.scan();
        let count = result.records.len();
        self.scan_cache.store(result);
        self.selected_network = 0;

        if count == 0 {
            self.show_raw = true;
            self.set_status(
                StatusKind::Warning,
                "No networks parsed. Wi-Fi may be disabled, there may be no wireless interface, or the output format differs. See the raw output.",
            );
        } else {
            self.set_status(StatusKind::Success, format!("Found {} networks", count));
        }
    }

    pub async fn connect(&mut self, ssid: &str, password: Option<&str>) {
        let Some(backend) = &self.backend else {
            self.set_status(StatusKind::Warning, self.backend_note.clone());
            return;
        };

        self.last_diagnostic = Some(backend.connect(ssid, password));
        self.refresh_connectivity().await;
        self.refresh_gallery();
        self.set_status(
            StatusKind::Success,
            "Connection command executed. Re-checked connectivity.",
        );
    }

    // Images

    fn on_images_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('O') => self.open_prompt(Prompt::OpenImage, ""),
            KeyCode::Char('[') => self.selected_source = previous_index(self.selected_source, self.sources.len()),
            KeyCode::Char(']') => self.selected_source = next_index(self.selected_source, self.sources.len()),
            KeyCode::Char('x') => self.close_source(),
            KeyCode::Up => self.nudge(Direction::Up),
            KeyCode::Down => self.nudge(Direction::Down),
            KeyCode::Left => self.nudge(Direction::Left),
            KeyCode::Right => self.nudge(Direction::Right),
            KeyCode::Char('c') => {
                if let Some(state) = self.current_state_mut() {
                    state.center();
                }
            }
            KeyCode::Char('s') => self.save_crop(),
            KeyCode::Char('p') => self.export_preview(),
            KeyCode::Char('k') => self.select_saved(previous_index(self.selected_saved, self.saved_images.len())),
            KeyCode::Char('j') => self.select_saved(next_index(self.selected_saved, self.saved_images.len())),
            KeyCode::Char('d') => self.delete_saved(),
            KeyCode::Char('R') => self.refresh_gallery(),
            _ => {}
        }
    }

    pub fn open_image(&mut self, path: &Path) {
        match crop::load_image(path) {
            Ok(source) => {
                let (crop_w, crop_h) = (self.config.crop.width, self.config.crop.height);
                let state = *self.crop_session.state_for(&source.name, source.width(), source.height(), crop_w, crop_h);

                let mut text = format!("Loaded image: {} x {} pixels", source.width(), source.height());
                let kind = if state.is_reduced(crop_w, crop_h) {
                    text.push_str(&format!(
                        ". Image is smaller than {}x{}, using crop size {}x{} instead.",
                        crop_w, crop_h, state.crop_width, state.crop_height
                    ));
                    StatusKind::Warning
                } else {
                    StatusKind::Success
                };

                match self.sources.iter().position(|s| s.name == source.name) {
                    Some(i) => {
                        self.sources[i] = source;
                        self.selected_source = i;
                    }
                    None => {
                        self.sources.push(source);
                        self.selected_source = self.sources.len() - 1;
                    }
                }
                self.set_status(kind, text);
            }
            Err(e) => {
                tracing::warn!("{}", e);
                self.set_status(StatusKind::Error, e.to_string());
            }
        }
    }

    /// Drop the selected image along with its crop window.
    fn close_source(&mut self) {
        if self.selected_source >= self.sources.len() {
            return;
        }
        let source = self.sources.remove(self.selected_source);
        self.crop_session.forget(&source.name);
        if self.selected_source >= self.sources.len() {
            self.selected_source = self.sources.len().saturating_sub(1);
        }
        self.set_status(StatusKind::Info, format!("Closed {}", source.name));
    }

    pub fn current_source(&self) -> Option<&SourceImage> {
        self.sources.get(self.selected_source)
    }

    /// Crop window of the selected image, as it will be saved.
    pub fn current_crop(&self) -> Option<(&SourceImage, CropState)> {
        let source = self.current_source()?;
        let state = self.crop_session.get(&source.name).copied().unwrap_or_else(|| {
            CropState::new(source.width(), source.height(), self.config.crop.width, self.config.crop.height)
        });
        Some((source, state))
    }

    fn current_state_mut(&mut self) -> Option<&mut CropState> {
        let source = self.sources.get(self.selected_source)?;
        Some(self.crop_session.state_for(
            &source.name,
            source.width(),
            source.height(),
            self.config.crop.width,
            self.config.crop.height,
        ))
    }

    fn nudge(&mut self, direction: Direction) {
        let step = self.config.crop.step;
        if let Some(state) = self.current_state_mut() {
            state.nudge(direction, step);
        }
    }

    pub fn save_crop(&mut self) {
        let Some((source, state)) = self.current_crop() else {
            self.set_status(StatusKind::Info, "Open an image (O) to crop it.");
            return;
        };

        match crop::save_crop(source, &state, &self.config.storage.output_dir) {
            Ok(path) => {
                let text = format!("Saved cropped image to: {}", path.display());
                self.set_status(StatusKind::Success, text);
                self.refresh_gallery();
            }
            Err(e) => {
                tracing::error!("{}", e);
                self.set_status(StatusKind::Error, e.to_string());
            }
        }
    }

    pub fn preview_path(stem: &str) -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("hotspot-setter")
            .join(format!("{}_preview.png", stem))
    }

    fn export_preview(&mut self) {
        let Some((source, state)) = self.current_crop() else {
            self.set_status(StatusKind::Info, "Open an image (O) to crop it.");
            return;
        };

        let path = Self::preview_path(&source.stem);
        match crop::save_preview(source, &state, &path) {
            Ok(()) => self.set_status(StatusKind::Success, format!("Preview written to {}", path.display())),
            Err(e) => self.set_status(StatusKind::Error, e.to_string()),
        }
    }

    pub fn refresh_gallery(&mut self) {
        match gallery::list_saved_images(&self.config.storage.output_dir) {
            Ok(images) => self.saved_images = images,
            Err(e) => {
                self.saved_images.clear();
                self.set_status(StatusKind::Error, e.to_string());
            }
        }
        if self.selected_saved >= self.saved_images.len() {
            self.selected_saved = self.saved_images.len().saturating_sub(1);
        }
        self.inspect_saved();
    }

    pub fn selected_saved_image(&self) -> Option<&SavedImage> {
        self.saved_images.get(self.selected_saved)
    }

    fn select_saved(&mut self, index: usize) {
        if index != self.selected_saved {
            self.selected_saved = index;
            self.inspect_saved();
        }
    }

    fn inspect_saved(&mut self) {
        self.saved_detail = self.selected_saved_image().map(|image| match gallery::image_dimensions(image) {
            Ok((width, height)) => SavedDetail::Dimensions { width, height },
            Err(e) => {
                tracing::warn!("{}", e);
                SavedDetail::Unreadable(format!("Could not open {}", image.name))
            }
        });
    }

    fn delete_saved(&mut self) {
        if !self.gallery_available() {
            return;
        }
        let Some(image) = self.selected_saved_image().cloned() else {
            return;
        };

        match gallery::delete_saved_image(&image) {
            Ok(()) => self.set_status(StatusKind::Success, format!("Deleted {}", image.name)),
            Err(e) => self.set_status(StatusKind::Error, format!("Failed to delete {}: {}", image.name, e)),
        }
        self.refresh_gallery();
    }

    // Environment

    fn on_env_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Up => self.selected_env = previous_index(self.selected_env, self.env.len()),
            KeyCode::Down => self.selected_env = next_index(self.selected_env, self.env.len()),
            KeyCode::Char('a') => self.open_prompt(Prompt::EnvKey { index: None }, ""),
            KeyCode::Char('e') => {
                if let Some(entry) = self.env.entries().get(self.selected_env) {
                    let key = entry.key.clone();
                    self.open_prompt(Prompt::EnvKey { index: Some(self.selected_env) }, &key);
                }
            }
            KeyCode::Char('d') => {
                if let Some(EnvEntry { key, .. }) = self.env.remove(self.selected_env) {
                    self.set_status(StatusKind::Info, format!("Removed {} (not saved yet)", key));
                    if self.selected_env >= self.env.len() {
                        self.selected_env = self.env.len().saturating_sub(1);
                    }
                }
            }
            KeyCode::Char('w') => self.save_env(),
            KeyCode::Char('r') => self.reload_env(),
            _ => {}
        }
    }

    pub fn save_env(&mut self) {
        match self.env.save() {
            Ok(()) => {
                let text = format!("Saved {}", self.env.path().display());
                self.set_status(StatusKind::Success, text);
            }
            Err(e) => self.set_status(StatusKind::Error, e.to_string()),
        }
    }

    fn reload_env(&mut self) {
        match EnvFile::load(self.env.path()) {
            Ok(env) => {
                self.env = env;
                self.selected_env = 0;
                self.set_status(StatusKind::Info, "Reloaded env file");
            }
            Err(e) => self.set_status(StatusKind::Error, e.to_string()),
        }
    }
}

fn previous_index(current: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else if current == 0 {
        len - 1
    } else {
        current - 1
    }
}

fn next_index(current: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        (current + 1) % len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use hotspot_setter::network::ScanResult;
    use image::{Rgba, RgbaImage};
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    type ConnectLog = Arc<Mutex<Vec<(String, Option<String>)>>>;

    struct FakeBackend {
        connects: ConnectLog,
    }

    impl WifiBackend for FakeBackend {
        fn tool(&self) -> &'static str {
            "fake"
        }

        fn scan(&self) -> ScanResult {
            ScanResult {
                records: vec![
                    NetworkRecord::new("Home", "80", "WPA2"),
                    NetworkRecord::new("Cafe", "30", "?"),
                ],
                raw_output: "Home:80:WPA2\nCafe:30:".to_string(),
            }
        }

        fn connect(&self, ssid: &str, password: Option<&str>) -> String {
            self.connects
                .lock()
                .unwrap()
                .push((ssid.to_string(), password.map(str::to_string)));
            "Return code: 0\nSTDOUT:\nok\n\nSTDERR:\n".to_string()
        }
    }

    fn test_config(root: &Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.storage.output_dir = root.join("crops");
        config.storage.env_file = root.join(".env");
        // Closed local port keeps tests offline and fast.
        config.connectivity.probe_address = "127.0.0.1:9".to_string();
        config.connectivity.timeout_secs = 0.2;
        config
    }

    fn app_with_log(root: &Path) -> (App, ConnectLog) {
        let connects = ConnectLog::default();
        let backend = FakeBackend {
            connects: Arc::clone(&connects),
        };
        let app = App::with_backend(test_config(root), Some(Box::new(backend)), "fake".to_string());
        (app, connects)
    }

    fn app(root: &Path) -> App {
        app_with_log(root).0
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    async fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.on_key(press(KeyCode::Char(c))).await;
        }
    }

    #[tokio::test]
    async fn scan_then_connect_with_password() {
        let dir = tempdir().unwrap();
        let (mut app, connects) = app_with_log(dir.path());

        app.on_key(press(KeyCode::Char('s'))).await;
        assert_eq!(app.scan_cache.records().len(), 2);

        app.on_key(press(KeyCode::Down)).await;
        assert_eq!(app.selected_record().unwrap().ssid, "Cafe");

        app.on_key(press(KeyCode::Enter)).await;
        assert_eq!(app.prompt, Some(Prompt::Password { ssid: "Cafe".to_string() }));

        type_text(&mut app, "pw1").await;
        app.on_key(press(KeyCode::Enter)).await;

        assert!(app.prompt.is_none());
        assert!(app.last_diagnostic.as_deref().unwrap().starts_with("Return code: 0"));
        assert!(!app.online);

        // An empty password connects without one.
        app.on_key(press(KeyCode::Up)).await;
        app.on_key(press(KeyCode::Enter)).await;
        app.on_key(press(KeyCode::Enter)).await;

        assert_eq!(
            *connects.lock().unwrap(),
            vec![
                ("Cafe".to_string(), Some("pw1".to_string())),
                ("Home".to_string(), None),
            ]
        );
    }

    #[tokio::test]
    async fn quit_only_outside_prompt() {
        let dir = tempdir().unwrap();
        let mut app = app(dir.path());

        app.tab = Tab::Environment;
        app.on_key(press(KeyCode::Char('a'))).await;
        assert_eq!(app.on_key(press(KeyCode::Char('q'))).await, Flow::Continue);
        assert_eq!(app.input.value(), "q");

        app.on_key(press(KeyCode::Esc)).await;
        assert!(app.prompt.is_none());
        assert_eq!(app.on_key(press(KeyCode::Char('q'))).await, Flow::Quit);
    }

    #[tokio::test]
    async fn env_add_edit_and_save() {
        let dir = tempdir().unwrap();
        let mut app = app(dir.path());
        app.tab = Tab::Environment;

        app.on_key(press(KeyCode::Char('a'))).await;
        type_text(&mut app, "API_URL").await;
        app.on_key(press(KeyCode::Enter)).await;
        type_text(&mut app, "http://x").await;
        app.on_key(press(KeyCode::Enter)).await;

        app.on_key(press(KeyCode::Char('e'))).await;
        assert_eq!(app.input.value(), "API_URL");
        app.on_key(press(KeyCode::Enter)).await;
        assert_eq!(app.input.value(), "http://x");
        app.on_key(press(KeyCode::Backspace)).await;
        type_text(&mut app, "y").await;
        app.on_key(press(KeyCode::Enter)).await;

        app.on_key(press(KeyCode::Char('w'))).await;
        let saved = std::fs::read_to_string(dir.path().join(".env")).unwrap();
        assert_eq!(saved, "API_URL=http://y\n");
    }

    #[tokio::test]
    async fn crop_move_and_save() {
        let dir = tempdir().unwrap();
        let image_path = dir.path().join("cat.png");
        RgbaImage::from_pixel(150, 150, Rgba([1, 2, 3, 255]))
            .save(&image_path)
            .unwrap();

        let mut app = app(dir.path());
        app.config.connectivity.gate_gallery = false;
        app.tab = Tab::Images;
        app.open_image(&image_path);

        let (_, state) = app.current_crop().unwrap();
        assert_eq!((state.crop_width, state.crop_height, state.x, state.y), (150, 150, 0, 0));
        assert_eq!(app.status.as_ref().unwrap().kind, StatusKind::Warning);

        app.on_key(press(KeyCode::Right)).await;
        app.on_key(press(KeyCode::Char('s'))).await;

        let saved = dir.path().join("crops").join("cat_crop_0_0_150x150.png");
        assert!(saved.exists());
        assert_eq!(app.saved_images.len(), 1);

        app.on_key(press(KeyCode::Char('d'))).await;
        assert!(!saved.exists());
        assert!(app.saved_images.is_empty());
    }

    #[tokio::test]
    async fn gallery_delete_blocked_while_offline() {
        let dir = tempdir().unwrap();
        let crops = dir.path().join("crops");
        std::fs::create_dir_all(&crops).unwrap();
        std::fs::write(crops.join("keep.png"), b"x").unwrap();

        let mut app = app(dir.path());
        app.refresh_gallery();
        app.tab = Tab::Images;
        assert!(!app.gallery_available());

        app.on_key(press(KeyCode::Char('d'))).await;
        assert!(crops.join("keep.png").exists());
    }

    #[tokio::test]
    async fn saved_image_details_follow_selection() {
        let dir = tempdir().unwrap();
        let crops = dir.path().join("crops");
        std::fs::create_dir_all(&crops).unwrap();
        RgbaImage::from_pixel(12, 7, Rgba([0, 0, 0, 255]))
            .save(crops.join("a_crop_0_0_12x7.png"))
            .unwrap();
        std::fs::write(crops.join("b_broken.png"), b"not a png").unwrap();

        let mut app = app(dir.path());
        app.tab = Tab::Images;
        assert_eq!(app.saved_detail, Some(SavedDetail::Dimensions { width: 12, height: 7 }));

        app.on_key(press(KeyCode::Char('j'))).await;
        assert_eq!(app.selected_saved_image().unwrap().name, "b_broken.png");
        assert_eq!(
            app.saved_detail,
            Some(SavedDetail::Unreadable("Could not open b_broken.png".to_string()))
        );

        app.on_key(press(KeyCode::Char('k'))).await;
        assert_eq!(app.saved_detail, Some(SavedDetail::Dimensions { width: 12, height: 7 }));
    }

    #[tokio::test]
    async fn env_key_that_would_not_reload_is_refused() {
        let dir = tempdir().unwrap();
        let mut app = app(dir.path());
        app.tab = Tab::Environment;

        app.on_key(press(KeyCode::Char('a'))).await;
        type_text(&mut app, "A=B").await;
        app.on_key(press(KeyCode::Enter)).await;

        assert!(app.prompt.is_none());
        assert!(app.env.is_empty());
        assert_eq!(app.status.as_ref().unwrap().kind, StatusKind::Error);

        app.on_key(press(KeyCode::Char('a'))).await;
        type_text(&mut app, "#TAG").await;
        app.on_key(press(KeyCode::Enter)).await;
        assert!(app.prompt.is_none());
        assert!(app.env.is_empty());
    }

    #[tokio::test]
    async fn closing_source_drops_its_crop() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("one.png");
        let second = dir.path().join("two.png");
        RgbaImage::from_pixel(400, 400, Rgba([9, 9, 9, 255])).save(&first).unwrap();
        RgbaImage::from_pixel(300, 300, Rgba([9, 9, 9, 255])).save(&second).unwrap();

        let mut app = app(dir.path());
        app.tab = Tab::Images;
        app.open_image(&first);
        app.open_image(&second);
        assert_eq!(app.current_source().unwrap().name, "two.png");

        app.on_key(press(KeyCode::Left)).await;
        assert!(app.crop_session.get("two.png").is_some());

        app.on_key(press(KeyCode::Char('x'))).await;
        assert_eq!(app.sources.len(), 1);
        assert_eq!(app.current_source().unwrap().name, "one.png");
        assert!(app.crop_session.get("two.png").is_none());
    }

    #[test]
    fn broken_image_reports_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.jpg");
        std::fs::write(&path, b"nope").unwrap();

        let mut app = app(dir.path());
        app.open_image(&path);

        assert!(app.sources.is_empty());
        assert_eq!(app.status.as_ref().unwrap().kind, StatusKind::Error);
    }

    #[test]
    fn wrapping_selection() {
        assert_eq!(next_index(2, 3), 0);
        assert_eq!(previous_index(0, 3), 2);
        assert_eq!(next_index(0, 0), 0);
        assert_eq!(previous_index(0, 0), 0);
    }
}
