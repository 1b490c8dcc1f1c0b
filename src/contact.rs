//! Contact records and the partial updates applied to them.

use serde::{Deserialize, Serialize};

/// A contact record as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub first: Option<String>,
    pub last: Option<String>,
    pub avatar: Option<String>,
    pub twitter: Option<String>,
    pub notes: Option<String>,
    pub favorite: bool,
    /// Unix seconds
    pub created_at: i64,
}

/// Fields for a new contact. Text values are normalized on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewContact {
    pub first: Option<String>,
    pub last: Option<String>,
    pub avatar: Option<String>,
    pub twitter: Option<String>,
    pub notes: Option<String>,
    pub favorite: bool,
}

/// Partial update. `None` leaves a field untouched; `Some("")` clears a text field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactUpdate {
    pub first: Option<String>,
    pub last: Option<String>,
    pub avatar: Option<String>,
    pub twitter: Option<String>,
    pub notes: Option<String>,
    pub favorite: Option<bool>,
}

impl ContactUpdate {
    pub fn favorite(favorite: bool) -> Self {
        Self {
            favorite: Some(favorite),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_none()
            && self.last.is_none()
            && self.avatar.is_none()
            && self.twitter.is_none()
            && self.notes.is_none()
            && self.favorite.is_none()
    }

    /// Apply this update on top of `contact`, returning the merged record.
    pub fn apply_to(&self, contact: &Contact) -> Contact {
        let merge = |update: &Option<String>, current: &Option<String>| match update {
            Some(value) => normalize_text(Some(value.as_str())),
            None => current.clone(),
        };

        Contact {
            id: contact.id.clone(),
            first: merge(&self.first, &contact.first),
            last: merge(&self.last, &contact.last),
            avatar: merge(&self.avatar, &contact.avatar),
            twitter: merge(&self.twitter, &contact.twitter),
            notes: merge(&self.notes, &contact.notes),
            favorite: self.favorite.unwrap_or(contact.favorite),
            created_at: contact.created_at,
        }
    }
}

impl Contact {
    /// Build a record from creation fields.
    pub fn from_new(id: impl Into<String>, new: &NewContact, created_at: i64) -> Self {
        Self {
            id: id.into(),
            first: normalize_text(new.first.as_deref()),
            last: normalize_text(new.last.as_deref()),
            avatar: normalize_text(new.avatar.as_deref()),
            twitter: normalize_text(new.twitter.as_deref()),
            notes: normalize_text(new.notes.as_deref()),
            favorite: new.favorite,
            created_at,
        }
    }
}

/// Trim surrounding whitespace; blank values become absent.
pub fn normalize_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ada() -> Contact {
        Contact {
            id: "ada".into(),
            first: Some("Ada".into()),
            last: Some("Lovelace".into()),
            avatar: None,
            twitter: Some("adalovelace".into()),
            notes: None,
            favorite: false,
            created_at: 1,
        }
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text(Some("  Ada ")), Some("Ada".to_string()));
        assert_eq!(normalize_text(Some("   ")), None);
        assert_eq!(normalize_text(None), None);
    }

    #[test]
    fn test_update_leaves_untouched_fields() {
        let updated = ContactUpdate::favorite(true).apply_to(&ada());
        assert!(updated.favorite);
        assert_eq!(updated.first.as_deref(), Some("Ada"));
        assert_eq!(updated.twitter.as_deref(), Some("adalovelace"));
        assert_eq!(updated.created_at, 1);
    }

    #[test]
    fn test_update_empty_string_clears_field() {
        let update = ContactUpdate {
            twitter: Some(String::new()),
            notes: Some("  first programmer ".into()),
            ..ContactUpdate::default()
        };
        let updated = update.apply_to(&ada());
        assert_eq!(updated.twitter, None);
        assert_eq!(updated.notes.as_deref(), Some("first programmer"));
        assert!(!updated.favorite);
    }

    #[test]
    fn test_from_new_normalizes() {
        let new = NewContact {
            first: Some(" Grace ".into()),
            last: Some("".into()),
            ..NewContact::default()
        };
        let contact = Contact::from_new("g", &new, 42);
        assert_eq!(contact.first.as_deref(), Some("Grace"));
        assert_eq!(contact.last, None);
        assert!(ContactUpdate::default().is_empty());
    }
}
