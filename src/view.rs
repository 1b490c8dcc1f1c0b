//! What the contact detail screen shows, independent of how it is drawn.

use crate::contact::Contact;
use crate::route::encode_bool;

pub const NO_NAME: &str = "No Name";
pub const DEFAULT_TWITTER_URL: &str = "https://twitter.com/{handle}";

pub const FAVORITE_GLYPH: &str = "★";
pub const NOT_FAVORITE_GLYPH: &str = "☆";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayName {
    Named(String),
    NoName,
}

impl DisplayName {
    pub fn text(&self) -> &str {
        match self {
            DisplayName::Named(name) => name,
            DisplayName::NoName => NO_NAME,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, DisplayName::NoName)
    }
}

/// External link; `new_context` asks the host to open it outside the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub href: String,
    pub text: String,
    pub new_context: bool,
}

/// The favorite toggle as rendered. `value` is what pressing it submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FavoriteButton {
    pub favorite: bool,
}

impl FavoriteButton {
    pub fn glyph(self) -> &'static str {
        if self.favorite {
            FAVORITE_GLYPH
        } else {
            NOT_FAVORITE_GLYPH
        }
    }

    pub fn label(self) -> &'static str {
        if self.favorite {
            "Remove from favorites"
        } else {
            "Add to favorites"
        }
    }

    pub fn next_intent(self) -> bool {
        !self.favorite
    }

    pub fn value(self) -> &'static str {
        encode_bool(self.next_intent())
    }
}

/// Everything the detail screen shows for one contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactView {
    pub id: String,
    pub name: DisplayName,
    pub avatar_src: Option<String>,
    pub twitter: Option<Link>,
    pub notes: Option<String>,
    pub favorite: FavoriteButton,
}

impl ContactView {
    /// Render `contact`, showing `pending_favorite` in place of the stored flag
    /// while a toggle is in flight.
    pub fn build(contact: &Contact, pending_favorite: Option<bool>, twitter_url: &str) -> Self {
        Self {
            id: contact.id.clone(),
            name: display_name(contact.first.as_deref(), contact.last.as_deref()),
            avatar_src: non_empty(contact.avatar.as_deref()),
            twitter: non_empty(contact.twitter.as_deref()).map(|handle| Link {
                href: twitter_profile_url(twitter_url, &handle),
                text: handle,
                new_context: true,
            }),
            notes: non_empty(contact.notes.as_deref()),
            favorite: FavoriteButton {
                favorite: pending_favorite.unwrap_or(contact.favorite),
            },
        }
    }

    /// The link the host should open in an external browser, if any.
    pub fn external_link(&self) -> Option<&Link> {
        self.twitter.as_ref().filter(|link| link.new_context)
    }

    /// Plain-text rendering used by the CLI.
    pub fn to_text(&self) -> String {
        let mut out = format!("{} {}\n", self.name.text(), self.favorite.glyph());
        if let Some(link) = &self.twitter {
            out.push_str(&format!("{} <{}>\n", link.text, link.href));
        }
        if let Some(notes) = &self.notes {
            out.push_str(notes);
            out.push('\n');
        }
        if let Some(src) = &self.avatar_src {
            out.push_str(&format!("avatar: {}\n", src));
        }
        out
    }
}

pub fn display_name(first: Option<&str>, last: Option<&str>) -> DisplayName {
    let parts: Vec<&str> = [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        DisplayName::NoName
    } else {
        DisplayName::Named(parts.join(" "))
    }
}

/// Fill `{handle}` in the template; without a placeholder the handle is appended.
pub fn twitter_profile_url(template: &str, handle: &str) -> String {
    let handle = handle.trim_start_matches('@');
    if template.contains("{handle}") {
        template.replace("{handle}", handle)
    } else {
        format!("{}{}", template, handle)
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::contact;

    #[test]
    fn test_full_name() {
        let view = ContactView::build(
            &contact("a", Some("Ada"), Some("Lovelace")),
            None,
            DEFAULT_TWITTER_URL,
        );
        assert_eq!(view.name, DisplayName::Named("Ada Lovelace".into()));
    }

    #[test]
    fn test_partial_and_missing_name() {
        assert_eq!(display_name(Some("Ada"), None).text(), "Ada");
        assert_eq!(display_name(None, Some("Lovelace")).text(), "Lovelace");
        assert_eq!(display_name(Some(" "), Some("")), DisplayName::NoName);

        let view = ContactView::build(&contact("a", None, None), None, DEFAULT_TWITTER_URL);
        assert!(view.name.is_placeholder());
        assert_eq!(view.name.text(), "No Name");
    }

    #[test]
    fn test_twitter_link_only_when_present() {
        let mut record = contact("a", Some("Ada"), None);
        let view = ContactView::build(&record, None, DEFAULT_TWITTER_URL);
        assert!(view.twitter.is_none());

        record.twitter = Some("adalovelace".into());
        let view = ContactView::build(&record, None, DEFAULT_TWITTER_URL);
        assert_eq!(
            view.twitter,
            Some(Link {
                href: "https://twitter.com/adalovelace".into(),
                text: "adalovelace".into(),
                new_context: true,
            })
        );
    }

    #[test]
    fn test_external_link() {
        let mut record = contact("a", Some("Ada"), None);
        let view = ContactView::build(&record, None, DEFAULT_TWITTER_URL);
        assert!(view.external_link().is_none());

        record.twitter = Some("@ada".into());
        let mut view = ContactView::build(&record, None, "https://x.com/");
        assert_eq!(
            view.external_link().map(|link| link.href.as_str()),
            Some("https://x.com/ada")
        );

        if let Some(link) = view.twitter.as_mut() {
            link.new_context = false;
        }
        assert!(view.external_link().is_none());
    }

    #[test]
    fn test_twitter_template() {
        assert_eq!(
            twitter_profile_url("https://x.com/", "@ada"),
            "https://x.com/ada"
        );
        assert_eq!(
            twitter_profile_url("https://nitter.net/{handle}/media", "ada"),
            "https://nitter.net/ada/media"
        );
    }

    #[test]
    fn test_notes_and_avatar_fallbacks() {
        let mut record = contact("a", Some("Ada"), None);
        record.notes = Some(String::new());
        let view = ContactView::build(&record, None, DEFAULT_TWITTER_URL);
        assert!(view.notes.is_none());
        assert!(view.avatar_src.is_none());

        record.notes = Some("Analytical engine".into());
        record.avatar = Some("https://example.com/ada.png".into());
        let view = ContactView::build(&record, None, DEFAULT_TWITTER_URL);
        assert_eq!(view.notes.as_deref(), Some("Analytical engine"));
        assert_eq!(view.avatar_src.as_deref(), Some("https://example.com/ada.png"));
    }

    #[test]
    fn test_favorite_button_states() {
        let off = FavoriteButton { favorite: false };
        assert_eq!(off.glyph(), "☆");
        assert_eq!(off.label(), "Add to favorites");
        assert_eq!(off.value(), "true");

        let on = FavoriteButton { favorite: true };
        assert_eq!(on.glyph(), "★");
        assert_eq!(on.label(), "Remove from favorites");
        assert_eq!(on.value(), "false");
    }

    #[test]
    fn test_pending_favorite_overrides_record() {
        let record = contact("a", Some("Ada"), None);
        let view = ContactView::build(&record, Some(true), DEFAULT_TWITTER_URL);
        assert!(view.favorite.favorite);
        assert_eq!(view.favorite.label(), "Remove from favorites");
    }

    #[test]
    fn test_to_text() {
        let mut record = contact("a", Some("Ada"), Some("Lovelace"));
        record.twitter = Some("adalovelace".into());
        let text = ContactView::build(&record, None, DEFAULT_TWITTER_URL).to_text();
        assert!(text.starts_with("Ada Lovelace ☆\n"));
        assert!(text.contains("adalovelace <https://twitter.com/adalovelace>"));
    }
}
