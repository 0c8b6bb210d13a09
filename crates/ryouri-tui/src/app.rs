use std::path::PathBuf;
use std::sync::Arc;

use ratatui::layout::Rect;
use ratatui::widgets::{Paragraph, Wrap};
use ryouri_core::{ChatProvider, ClaudeClient, Config, SendError, Session};
use tokio::task::JoinHandle;

use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Conversation (transcript, draft, pending flag)
    pub session: Session,
    pub input_cursor: usize, // cursor position in the draft, in chars
    pub send_task: Option<JoinHandle<Result<String, SendError>>>,

    // Chat view
    pub chat_scroll: u16,
    pub chat_height: u16, // Inner height of the chat pane
    pub chat_width: u16,  // Inner width of the chat pane

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // API key input state
    pub show_api_key_input: bool,
    pub api_key_input: String,
    pub api_key_input_cursor: usize,

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub suggestion_areas: Vec<Rect>,

    // Remote model
    pub provider: Arc<dyn ChatProvider>,
    pub config: Config,
    pub config_path: PathBuf,
}

impl App {
    pub fn new(config: Config, provider: Arc<dyn ChatProvider>, config_path: PathBuf) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,

            session: Session::new(),
            input_cursor: 0,
            send_task: None,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            animation_frame: 0,

            show_api_key_input: false,
            api_key_input: String::new(),
            api_key_input_cursor: 0,

            chat_area: None,
            suggestion_areas: Vec::new(),

            provider,
            config,
            config_path,
        }
    }

    /// Start a send cycle from the current draft.
    ///
    /// The request runs on a spawned task; [`App::poll_send_task`] finishes
    /// the cycle once it resolves.
    pub fn start_send(&mut self) {
        let Some(request) = self.session.submit_draft() else {
            return;
        };

        self.input_cursor = 0;
        self.scroll_to_bottom();

        let provider = Arc::clone(&self.provider);
        self.send_task = Some(tokio::spawn(async move {
            provider.complete(&request).await
        }));
    }

    /// Resolve the send cycle if its task has finished. Returns true when a
    /// turn was appended.
    pub async fn poll_send_task(&mut self) -> bool {
        let finished = self
            .send_task
            .as_ref()
            .is_some_and(|task| task.is_finished());
        if !finished {
            return false;
        }
        let Some(task) = self.send_task.take() else {
            return false;
        };

        let result = match task.await {
            Ok(result) => result,
            Err(join_err) => Err(SendError::Task(join_err.to_string())),
        };

        if let Err(err) = self.session.complete(result) {
            tracing::debug!(kind = err.kind(), "showing fallback reply");
        }

        self.scroll_to_bottom();
        true
    }

    /// Called on every Tick event
    pub async fn tick(&mut self) {
        if self.session.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        self.poll_send_task().await;
    }

    pub fn is_sending(&self) -> bool {
        self.session.is_pending()
    }

    /// Copy a suggested prompt into the draft and start typing after it
    pub fn apply_suggestion(&mut self, index: usize) -> bool {
        if !self.session.use_suggestion(index) {
            return false;
        }
        self.input_cursor = self.session.draft().chars().count();
        self.input_mode = InputMode::Editing;
        true
    }

    /// Number of rendered lines in the chat pane, wrapped the same way `ui::render_chat` draws them
    pub fn chat_line_count(&self) -> u16 {
        let wrap_width = if self.chat_width > 0 { self.chat_width } else { 50 };

        let total_lines = Paragraph::new(ui::chat_text(self))
            .wrap(Wrap { trim: true })
            .line_count(wrap_width);

        u16::try_from(total_lines).unwrap_or(u16::MAX)
    }

    /// Scroll chat so the newest turn (or the thinking indicator) is visible
    pub fn scroll_to_bottom(&mut self) {
        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        self.chat_scroll = self.chat_line_count().saturating_sub(visible_height);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max_scroll = self.chat_line_count().saturating_sub(self.chat_height.max(1));
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max_scroll);
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn open_api_key_input(&mut self) {
        self.show_api_key_input = true;
        self.api_key_input.clear();
        self.api_key_input_cursor = 0;
    }

    pub fn close_api_key_input(&mut self) {
        self.show_api_key_input = false;
        self.api_key_input.clear();
        self.api_key_input_cursor = 0;
    }

    /// Store the typed key in the config file and rebuild the client with it
    pub fn save_api_key(&mut self) {
        let key = self.api_key_input.trim().to_string();
        if key.is_empty() {
            self.close_api_key_input();
            return;
        }

        let mut stored = Config::load_from(&self.config_path).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "config unreadable, starting from defaults");
            Config::new()
        });
        stored.api_key = Some(key.clone());
        if let Err(err) = stored.save_to(&self.config_path) {
            tracing::error!(error = %err, path = %self.config_path.display(), "failed to save API key");
        } else {
            tracing::info!(path = %self.config_path.display(), "API key saved");
        }

        self.config.api_key = Some(key);
        self.provider = Arc::new(ClaudeClient::from_config(&self.config));
        self.close_api_key_input();
    }
}
