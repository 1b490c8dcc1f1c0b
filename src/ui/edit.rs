use crossterm::event::{Event, KeyEvent};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

use super::panes::EditField;

/// Single-line text input bound to one field of the edit form.
#[derive(Default)]
pub struct InlineEditor {
    pub active: bool,
    target: Option<EditField>,
    input: Input,
}

impl InlineEditor {
    pub fn start(&mut self, current: &str, target: EditField) {
        self.active = true;
        self.target = Some(target);
        self.input = Input::new(current.to_string());
    }

    pub fn cancel(&mut self) {
        self.active = false;
        self.target = None;
        self.input.reset();
    }

    /// Close the editor and hand back the edited field and its value.
    pub fn finish(&mut self) -> Option<(EditField, String)> {
        let target = self.target.take()?;
        let value = self.input.value().to_string();
        self.active = false;
        self.input.reset();
        Some((target, value))
    }

    pub fn target(&self) -> Option<EditField> {
        self.target
    }

    pub fn value(&self) -> &str {
        self.input.value()
    }

    pub fn visual_cursor(&self) -> usize {
        self.input.visual_cursor()
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) -> bool {
        self.input.handle_event(&Event::Key(key)).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};

    #[test]
    fn test_typing_and_finish() {
        let mut editor = InlineEditor::default();
        editor.start("Ad", EditField::First);
        assert!(editor.active);
        editor.handle_key_event(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE));
        assert_eq!(editor.value(), "Ada");
        assert_eq!(editor.visual_cursor(), 3);

        assert_eq!(editor.finish(), Some((EditField::First, "Ada".to_string())));
        assert!(!editor.active);
        assert!(editor.target().is_none());
    }

    #[test]
    fn test_cancel_discards() {
        let mut editor = InlineEditor::default();
        editor.start("x", EditField::Notes);
        editor.cancel();
        assert!(editor.finish().is_none());
        assert_eq!(editor.value(), "");
    }
}
