use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Check if the key event matches any of the bindings in the list
pub fn matches_any(event: &KeyEvent, bindings: &[String]) -> bool {
    bindings.iter().any(|b| matches_single(event, b))
}

/// Check if the key event matches a single binding string
pub fn matches_single(event: &KeyEvent, binding: &str) -> bool {
    let trimmed = binding.trim();
    if trimmed.is_empty() {
        return false;
    }

    // Ctrl/Alt/Super combinations are not bindable
    let disallowed = KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER;
    if event.modifiers.intersects(disallowed) {
        return false;
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "enter" => matches!(event.code, KeyCode::Enter),
        "tab" => matches!(event.code, KeyCode::Tab),
        "backtab" | "shift+tab" => matches!(event.code, KeyCode::BackTab),
        "backspace" => matches!(event.code, KeyCode::Backspace),
        "delete" | "del" => matches!(event.code, KeyCode::Delete),
        "esc" | "escape" => matches!(event.code, KeyCode::Esc),
        "space" => matches!(event.code, KeyCode::Char(' ')),
        "up" => matches!(event.code, KeyCode::Up),
        "down" => matches!(event.code, KeyCode::Down),
        "left" => matches!(event.code, KeyCode::Left),
        "right" => matches!(event.code, KeyCode::Right),
        "pageup" | "page_up" => matches!(event.code, KeyCode::PageUp),
        "pagedown" | "page_down" => matches!(event.code, KeyCode::PageDown),
        "home" => matches!(event.code, KeyCode::Home),
        "end" => matches!(event.code, KeyCode::End),
        name => {
            if let Some(n) = function_key(name) {
                return matches!(event.code, KeyCode::F(f) if f == n);
            }
            // Single character - case-sensitive (f != F, since F requires Shift)
            let mut chars = trimmed.chars();
            if let (Some(first), None) = (chars.next(), chars.next()) {
                matches!(event.code, KeyCode::Char(c) if c == first)
            } else {
                false
            }
        }
    }
}

fn function_key(name: &str) -> Option<u8> {
    let n: u8 = name.strip_prefix('f')?.parse().ok()?;
    (1..=12).contains(&n).then_some(n)
}

/// True for Ctrl+C, which always quits.
pub fn is_interrupt(event: &KeyEvent) -> bool {
    event.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(event.code, KeyCode::Char('c') | KeyCode::Char('C'))
}

/// Label for the footer help, e.g. `f/Space`.
pub fn describe(bindings: &[String]) -> String {
    bindings.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_named_keys() {
        assert!(matches_single(&key(KeyCode::Enter), "Enter"));
        assert!(matches_single(&key(KeyCode::Esc), "escape"));
        assert!(matches_single(&key(KeyCode::Esc), "Esc"));
        assert!(matches_single(&key(KeyCode::Char(' ')), "Space"));
        assert!(matches_single(&key(KeyCode::Delete), "Delete"));
        assert!(matches_single(&key(KeyCode::F(5)), "F5"));
        assert!(!matches_single(&key(KeyCode::F(5)), "F13"));
        assert!(!matches_single(&key(KeyCode::Enter), "Tab"));
    }

    #[test]
    fn test_single_chars_are_case_sensitive() {
        assert!(matches_single(&key(KeyCode::Char('f')), "f"));
        assert!(!matches_single(&key(KeyCode::Char('F')), "f"));
        assert!(matches_single(
            &KeyEvent::new(KeyCode::Char('F'), KeyModifiers::SHIFT),
            "F"
        ));
    }

    #[test]
    fn test_modifiers_disallowed() {
        let ctrl_f = KeyEvent::new(KeyCode::Char('f'), KeyModifiers::CONTROL);
        assert!(!matches_single(&ctrl_f, "f"));

        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(is_interrupt(&ctrl_c));
        assert!(!is_interrupt(&key(KeyCode::Char('c'))));
    }

    #[test]
    fn test_matches_any() {
        let bindings = vec!["j".to_string(), "Down".to_string()];
        assert!(matches_any(&key(KeyCode::Down), &bindings));
        assert!(matches_any(&key(KeyCode::Char('j')), &bindings));
        assert!(!matches_any(&key(KeyCode::Char('k')), &bindings));
        assert_eq!(describe(&bindings), "j/Down");
    }
}
