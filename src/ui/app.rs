use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyEvent};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use image::DynamicImage;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use ratatui_image::{picker::Picker, protocol::StatefulProtocol};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};
use tui_widgets::popup::PopupState;

use crate::avatar::{self, AvatarSlot, AvatarState};
use crate::config::{Config, UiColors};
use crate::confirm::{DeleteIntent, DestroySubmission};
use crate::contact::Contact;
use crate::detail::ContactDetail;
use crate::fetcher::{Settlement, SubmissionId};
use crate::route::{self, EditForm, Params, RoutePattern, RouteError};
use crate::store::ContactStore;
use crate::view::ContactView;

use super::draw;
use super::edit::InlineEditor;
use super::keys;
use super::panes::EditField;

const DEFAULT_FONT_SIZE: (u16, u16) = (8, 16);

fn create_image_picker() -> Picker {
    let mut picker = base_picker();
    picker.guess_protocol();
    picker
}

#[cfg(unix)]
fn base_picker() -> Picker {
    Picker::from_termios().unwrap_or_else(|_| Picker::new(DEFAULT_FONT_SIZE))
}

#[cfg(not(unix))]
fn base_picker() -> Picker {
    Picker::new(DEFAULT_FONT_SIZE)
}

/// Where a path points in the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Index,
    Contact(Params),
    Edit(Params),
    Unknown,
}

pub fn match_location(path: &str) -> Location {
    if path.trim_end_matches('/').is_empty() {
        return Location::Index;
    }
    if let Some(params) = RoutePattern::parse(route::EDIT_ROUTE).matches(path) {
        return Location::Edit(params);
    }
    if let Some(params) = RoutePattern::parse(route::CONTACT_ROUTE).matches(path) {
        return Location::Contact(params);
    }
    Location::Unknown
}

pub struct EditScreen {
    pub contact_id: String,
    pub form: EditForm,
    pub field: EditField,
}

pub enum Screen {
    Detail(ContactDetail),
    Edit(EditScreen),
    Empty,
    Error(String),
}

pub struct ConfirmModal {
    pub title: String,
    pub intent: DeleteIntent,
}

/// Completions reported back from spawned work.
pub enum AppEvent {
    FavoriteSettled {
        contact_id: String,
        submission: SubmissionId,
        reloaded: Option<Contact>,
    },
    AvatarLoaded {
        source: String,
        result: Result<DynamicImage>,
    },
}

pub struct App<'a> {
    config: &'a Config,
    runtime: Handle,
    store: Arc<dyn ContactStore>,
    http: reqwest::Client,
    events_tx: UnboundedSender<AppEvent>,
    events_rx: UnboundedReceiver<AppEvent>,
    pub contacts: Vec<Contact>,
    pub location: String,
    pub screen: Screen,
    pub editor: InlineEditor,
    pub confirm_modal: Option<ConfirmModal>,
    pub modal_popup: PopupState,
    pub status: Option<String>,
    image_picker: Picker,
    image_state: Option<Box<dyn StatefulProtocol>>,
    avatar: AvatarSlot,
}

impl<'a> App<'a> {
    pub fn new(
        config: &'a Config,
        runtime: Handle,
        store: Arc<dyn ContactStore>,
        start: Option<&str>,
    ) -> Result<Self> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut app = Self {
            config,
            runtime,
            store,
            http: reqwest::Client::new(),
            events_tx,
            events_rx,
            contacts: Vec::new(),
            location: "/".to_string(),
            screen: Screen::Empty,
            editor: InlineEditor::default(),
            confirm_modal: None,
            modal_popup: PopupState::default(),
            status: None,
            image_picker: create_image_picker(),
            image_state: None,
            avatar: AvatarSlot::default(),
        };

        app.refresh_contacts()?;
        let start = start.map(route::contact_path).unwrap_or_else(|| "/".to_string());
        app.navigate(&start)?;
        Ok(app)
    }

    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop<B>(&mut self, terminal: &mut Terminal<B>) -> Result<()>
    where
        B: ratatui::backend::Backend,
    {
        loop {
            self.drain_events();
            draw::render(terminal, self)?;

            if event::poll(Duration::from_millis(250))? {
                match event::read()? {
                    Event::Key(key) => {
                        if self.handle_key(key)? {
                            break;
                        }
                    }
                    Event::Resize(_, _) => {}
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                AppEvent::FavoriteSettled {
                    contact_id,
                    submission,
                    reloaded,
                } => self.apply_favorite_settled(&contact_id, submission, reloaded),
                AppEvent::AvatarLoaded { source, result } => {
                    if let Some(image) = self.avatar.accept(&source, result) {
                        self.image_state = Some(self.image_picker.new_resize_protocol(image));
                    }
                }
            }
        }
    }

    fn apply_favorite_settled(
        &mut self,
        contact_id: &str,
        submission: SubmissionId,
        reloaded: Option<Contact>,
    ) {
        if let Some(contact) = &reloaded {
            if let Some(entry) = self.contacts.iter_mut().find(|c| c.id == contact.id) {
                *entry = contact.clone();
            }
        }
        let Screen::Detail(detail) = &mut self.screen else {
            return;
        };
        if detail.contact().id != contact_id {
            return;
        }
        if detail.settle(submission, reloaded) == Settlement::Superseded {
            debug!(contact = contact_id, "favorite settled behind a newer submission");
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        if keys::is_interrupt(&key) {
            return Ok(true);
        }

        if self.confirm_modal.is_some() {
            self.handle_confirm_modal_key(key)?;
            return Ok(false);
        }

        if self.editor.active {
            self.handle_editor_key(key);
            return Ok(false);
        }

        if matches!(self.screen, Screen::Edit(_)) {
            return self.handle_form_key(key);
        }

        self.handle_detail_key(key)
    }

    fn handle_detail_key(&mut self, key: KeyEvent) -> Result<bool> {
        let global = &self.config.keys.global;
        let detail_keys = &self.config.keys.detail;

        if keys::matches_any(&key, &global.quit) {
            return Ok(true);
        }
        if keys::matches_any(&key, &global.refresh) {
            self.refresh_contacts()?;
            let location = self.location.clone();
            self.navigate(&location)?;
            self.set_status("Reloaded");
            return Ok(false);
        }
        if keys::matches_any(&key, &detail_keys.next) {
            self.move_selection(1)?;
            return Ok(false);
        }
        if keys::matches_any(&key, &detail_keys.prev) {
            self.move_selection(-1)?;
            return Ok(false);
        }

        let Screen::Detail(detail) = &self.screen else {
            return Ok(false);
        };
        let path = detail.path();
        let contact_id = detail.contact().id.clone();
        let link = self.current_view_of(detail).external_link().cloned();

        if keys::matches_any(&key, &detail_keys.favorite) {
            self.toggle_favorite();
        } else if keys::matches_any(&key, &detail_keys.open_link) {
            match link {
                Some(link) => self.open_link(&link.href),
                None => self.set_status("No link to open"),
            }
        } else if keys::matches_any(&key, &detail_keys.edit) {
            self.navigate(&route::resolve(&path, "edit"))?;
        } else if keys::matches_any(&key, &detail_keys.delete) {
            let intent = DeleteIntent::new(contact_id);
            self.modal_popup = PopupState::default();
            self.confirm_modal = Some(ConfirmModal {
                title: "DELETE CONTACT".to_string(),
                intent,
            });
        }
        Ok(false)
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> Result<bool> {
        let form_keys = &self.config.keys.form;
        let Screen::Edit(screen) = &mut self.screen else {
            return Ok(false);
        };

        if keys::matches_any(&key, &form_keys.next) {
            if let Some(next) = screen.field.next() {
                screen.field = next;
            }
        } else if keys::matches_any(&key, &form_keys.prev) {
            if let Some(prev) = screen.field.prev() {
                screen.field = prev;
            }
        } else if keys::matches_any(&key, &form_keys.edit) {
            let field = screen.field;
            let current = field.get(&screen.form).to_string();
            self.editor.start(&current, field);
        } else if keys::matches_any(&key, &form_keys.save) {
            let params = Params::contact(screen.contact_id.clone());
            let form = screen.form.to_form_data();
            self.submit_edit(params, form)?;
        } else if keys::matches_any(&key, &form_keys.cancel) {
            let back = route::contact_path(&screen.contact_id);
            self.navigate(&back)?;
        }
        Ok(false)
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        let editor_keys = &self.config.keys.editor;
        if keys::matches_any(&key, &editor_keys.cancel) {
            self.editor.cancel();
            return;
        }
        if keys::matches_any(&key, &editor_keys.confirm) {
            if let Some((field, value)) = self.editor.finish() {
                if let Screen::Edit(screen) = &mut self.screen {
                    field.set(&mut screen.form, value);
                }
            }
            return;
        }
        self.editor.handle_key_event(key);
    }

    fn handle_confirm_modal_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(modal) = self.confirm_modal.take() else {
            return Ok(());
        };

        let modal_keys = &self.config.keys.modal;

        if keys::matches_any(&key, &modal_keys.cancel) {
            modal.intent.decline();
            return Ok(());
        }

        if keys::matches_any(&key, &modal_keys.confirm) {
            self.submit_destroy(modal.intent.accept())?;
            return Ok(());
        }

        // Put the modal back if key wasn't handled
        self.confirm_modal = Some(modal);
        Ok(())
    }

    /// Non-navigating favorite submission; the result arrives through the
    /// event channel.
    fn toggle_favorite(&mut self) {
        let Screen::Detail(detail) = &mut self.screen else {
            return;
        };
        let submission = detail.toggle_favorite();
        let contact_id = detail.contact().id.clone();
        let store = Arc::clone(&self.store);
        let tx = self.events_tx.clone();

        self.runtime.spawn(async move {
            if let Err(err) = route::action(&*store, &submission.params, &submission.form).await {
                warn!(contact = %contact_id, error = %err, "favorite update failed");
            }
            let reloaded = match route::loader(&*store, &submission.params).await {
                Ok(data) => Some(data.contact),
                Err(err) => {
                    warn!(contact = %contact_id, error = %err, "reload after favorite failed");
                    None
                }
            };
            let _ = tx.send(AppEvent::FavoriteSettled {
                contact_id,
                submission: submission.id,
                reloaded,
            });
        });
    }

    fn submit_edit(&mut self, params: Params, form: route::FormData) -> Result<()> {
        let store = Arc::clone(&self.store);
        let result = self
            .runtime
            .block_on(async move { route::edit_action(&*store, &params, &form).await });
        match result {
            Ok(redirect) => {
                self.refresh_contacts()?;
                self.navigate(&redirect.location)?;
                self.set_status("Saved");
            }
            Err(err) => {
                warn!(error = %err, "edit failed");
                self.set_status(format!("Save failed: {}", err));
            }
        }
        Ok(())
    }

    fn submit_destroy(&mut self, submission: DestroySubmission) -> Result<()> {
        debug!(action = %submission.action, "submitting delete");
        let store = Arc::clone(&self.store);
        let params = submission.params;
        let result = self
            .runtime
            .block_on(async move { route::destroy_action(&*store, &params).await });
        match result {
            Ok(redirect) => {
                self.refresh_contacts()?;
                self.navigate(&redirect.location)?;
                self.set_status("Contact deleted");
            }
            Err(err) => {
                warn!(error = %err, "delete failed");
                self.set_status(format!("Delete failed: {}", err));
            }
        }
        Ok(())
    }

    fn refresh_contacts(&mut self) -> Result<()> {
        let store = Arc::clone(&self.store);
        self.contacts = self
            .runtime
            .block_on(async move { store.list_contacts(None).await })?;
        Ok(())
    }

    fn move_selection(&mut self, delta: isize) -> Result<()> {
        if self.contacts.is_empty() {
            return Ok(());
        }
        let next = match self.selected_index() {
            Some(current) => {
                let max = self.contacts.len() as isize - 1;
                (current as isize + delta).clamp(0, max) as usize
            }
            None => 0,
        };
        let path = route::contact_path(&self.contacts[next].id);
        if path != self.location {
            self.navigate(&path)?;
        }
        Ok(())
    }

    pub fn selected_index(&self) -> Option<usize> {
        let id = match &self.screen {
            Screen::Detail(detail) => detail.contact().id.as_str(),
            Screen::Edit(screen) => screen.contact_id.as_str(),
            _ => return None,
        };
        self.contacts.iter().position(|c| c.id == id)
    }

    /// Load the route at `path` and swap the screen.
    fn navigate(&mut self, path: &str) -> Result<()> {
        info!(path, "navigate");
        self.editor.cancel();

        match match_location(path) {
            Location::Index => match self.contacts.first() {
                Some(first) => {
                    let path = route::contact_path(&first.id);
                    return self.navigate(&path);
                }
                None => {
                    self.location = "/".to_string();
                    self.screen = Screen::Empty;
                }
            },
            Location::Contact(params) => {
                self.location = path.to_string();
                match self.load(&params) {
                    Ok(contact) => match &mut self.screen {
                        Screen::Detail(detail) if detail.contact().id == contact.id => {
                            detail.revalidate(contact);
                        }
                        screen => *screen = Screen::Detail(ContactDetail::new(contact)),
                    },
                    Err(err) => self.screen = Screen::Error(err.to_string()),
                }
            }
            Location::Edit(params) => {
                self.location = path.to_string();
                match self.load(&params) {
                    Ok(contact) => {
                        self.screen = Screen::Edit(EditScreen {
                            contact_id: contact.id.clone(),
                            form: EditForm::from_contact(&contact),
                            field: EditField::First,
                        });
                    }
                    Err(err) => self.screen = Screen::Error(err.to_string()),
                }
            }
            Location::Unknown => {
                self.location = path.to_string();
                self.screen = Screen::Error(RouteError::Response(
                    route::ErrorResponse::not_found(),
                )
                .to_string());
            }
        }

        self.sync_avatar();
        Ok(())
    }

    fn load(&self, params: &Params) -> Result<Contact, RouteError> {
        let store = Arc::clone(&self.store);
        let params = params.clone();
        self.runtime
            .block_on(async move { route::loader(&*store, &params).await })
            .map(|data| data.contact)
    }

    fn sync_avatar(&mut self) {
        let source = match &self.screen {
            Screen::Detail(detail) => self.current_view_of(detail).avatar_src,
            _ => None,
        };
        if self.avatar.source() != source.as_deref() {
            self.image_state = None;
        }
        if !self.avatar.request(source.as_deref()) {
            return;
        }
        let Some(source) = source else {
            return;
        };

        let client = self.http.clone();
        let tx = self.events_tx.clone();
        self.runtime.spawn(async move {
            let result = avatar::fetch(&client, &source).await;
            if let Err(err) = &result {
                warn!(%source, error = %format!("{:#}", err), "avatar fetch failed");
            }
            let _ = tx.send(AppEvent::AvatarLoaded { source, result });
        });
    }

    fn open_link(&mut self, href: &str) {
        match open::that(href) {
            Ok(()) => {
                info!(%href, "opened link");
                self.set_status(format!("Opened {}", href));
            }
            Err(err) => {
                warn!(%href, error = %err, "failed to open link");
                self.set_status(format!("Could not open {}: {}", href, err));
            }
        }
    }

    fn current_view_of(&self, detail: &ContactDetail) -> ContactView {
        detail.view(&self.config.links.twitter)
    }

    pub fn current_view(&self) -> Option<ContactView> {
        match &self.screen {
            Screen::Detail(detail) => Some(self.current_view_of(detail)),
            _ => None,
        }
    }

    pub fn is_submitting(&self) -> bool {
        matches!(&self.screen, Screen::Detail(detail) if detail.is_submitting())
    }

    fn set_status<S: Into<String>>(&mut self, message: S) {
        self.status = Some(message.into());
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    pub fn ui_colors(&self) -> &UiColors {
        &self.config.ui.colors
    }

    pub fn image_pane_width(&self) -> u16 {
        self.config.ui.image.width
    }

    pub fn image_pane_height(&self) -> u16 {
        self.config.ui.image.height
    }

    pub fn avatar_state(&mut self) -> Option<&mut Box<dyn StatefulProtocol>> {
        self.image_state.as_mut()
    }

    pub fn avatar_status(&self) -> &AvatarState {
        self.avatar.state()
    }
}
