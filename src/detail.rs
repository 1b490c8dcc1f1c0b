//! Contact detail screen state: the confirmed record and its optimistic
//! favorite toggle.

use tracing::{debug, warn};

use crate::contact::Contact;
use crate::fetcher::{Fetcher, Settlement, SubmissionId};
use crate::route::{self, FavoriteForm, FormData, Params};
use crate::view::ContactView;

/// State behind the contact detail screen: the last confirmed record plus the
/// favorite submission in flight, if any.
#[derive(Debug, Clone)]
pub struct ContactDetail {
    confirmed: Contact,
    favorite: Fetcher<bool>,
}

/// A favorite toggle ready to be sent to the contact action.
#[derive(Debug, Clone)]
pub struct FavoriteSubmission {
    pub id: SubmissionId,
    pub params: Params,
    pub form: FormData,
}

impl ContactDetail {
    pub fn new(confirmed: Contact) -> Self {
        Self {
            confirmed,
            favorite: Fetcher::new(),
        }
    }

    pub fn contact(&self) -> &Contact {
        &self.confirmed
    }

    pub fn path(&self) -> String {
        route::contact_path(&self.confirmed.id)
    }

    pub fn is_submitting(&self) -> bool {
        self.favorite.is_pending()
    }

    pub fn displayed_favorite(&self) -> bool {
        *self.favorite.resolve(&self.confirmed.favorite)
    }

    /// Submit the inverse of what is currently shown.
    pub fn toggle_favorite(&mut self) -> FavoriteSubmission {
        let intent = !self.displayed_favorite();
        let id = self.favorite.submit(intent);
        debug!(contact = %self.confirmed.id, intent, "favorite submitted");
        FavoriteSubmission {
            id,
            params: Params::contact(self.confirmed.id.clone()),
            form: FavoriteForm::new(intent).to_form_data(),
        }
    }

    /// Finish a submission. `reloaded` is the record as re-read from the store
    /// after the action ran; `None` keeps the previous confirmed record.
    pub fn settle(&mut self, id: SubmissionId, reloaded: Option<Contact>) -> Settlement {
        if let Some(contact) = reloaded {
            if contact.id == self.confirmed.id {
                self.confirmed = contact;
            } else {
                warn!(
                    expected = %self.confirmed.id,
                    got = %contact.id,
                    "ignoring reload for a different contact"
                );
            }
        }
        self.favorite.settle(id)
    }

    /// Replace the confirmed record after a plain reload.
    pub fn revalidate(&mut self, contact: Contact) {
        if contact.id != self.confirmed.id {
            self.favorite.reset();
        }
        self.confirmed = contact;
    }

    pub fn view(&self, twitter_url: &str) -> ContactView {
        ContactView::build(&self.confirmed, self.favorite.pending().copied(), twitter_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::{action, loader, FAVORITE_FIELD};
    use crate::store::testing::{contact, MemoryStore};
    use crate::store::ContactStore;
    use crate::view::DEFAULT_TWITTER_URL;

    fn ada() -> Contact {
        contact("ada", Some("Ada"), Some("Lovelace"))
    }

    /// Run a submission against `store` the way the host does: action, then
    /// re-read the record, then settle.
    async fn run(
        detail: &mut ContactDetail,
        store: &dyn ContactStore,
        submission: FavoriteSubmission,
    ) -> Settlement {
        let _ = action(store, &submission.params, &submission.form).await;
        let reloaded = loader(store, &submission.params)
            .await
            .ok()
            .map(|data| data.contact);
        detail.settle(submission.id, reloaded)
    }

    #[test]
    fn test_toggle_submits_inverse_of_displayed() {
        let mut detail = ContactDetail::new(ada());
        let submission = detail.toggle_favorite();
        assert_eq!(submission.form.get(FAVORITE_FIELD), Some("true"));
        assert_eq!(submission.params, Params::contact("ada"));

        // Second press while pending inverts the pending value, not the record
        let submission = detail.toggle_favorite();
        assert_eq!(submission.form.get(FAVORITE_FIELD), Some("false"));
    }

    #[test]
    fn test_pending_shows_submitted_value() {
        let mut detail = ContactDetail::new(ada());
        detail.toggle_favorite();

        let view = detail.view(DEFAULT_TWITTER_URL);
        assert!(detail.is_submitting());
        assert_eq!(view.favorite.glyph(), "★");
        assert_eq!(view.favorite.label(), "Remove from favorites");
        assert!(!detail.contact().favorite);
    }

    #[tokio::test]
    async fn test_settled_success_matches_store() {
        let store = MemoryStore::with([ada()]);
        let mut detail = ContactDetail::new(ada());

        let submission = detail.toggle_favorite();
        assert_eq!(run(&mut detail, &store, submission).await, Settlement::Current);

        assert!(!detail.is_submitting());
        assert!(detail.view(DEFAULT_TWITTER_URL).favorite.favorite);
        assert!(store.snapshot("ada").unwrap().favorite);
    }

    #[tokio::test]
    async fn test_settled_failure_reverts_to_store() {
        let store = MemoryStore::failing([ada()]);
        let mut detail = ContactDetail::new(ada());

        let submission = detail.toggle_favorite();
        assert!(detail.view(DEFAULT_TWITTER_URL).favorite.favorite);

        run(&mut detail, &store, submission).await;
        let view = detail.view(DEFAULT_TWITTER_URL);
        assert!(!view.favorite.favorite);
        assert_eq!(view.favorite.label(), "Add to favorites");
        assert_eq!(store.updates.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_superseded_submission_keeps_latest_intent() {
        let store = MemoryStore::with([ada()]);
        let mut detail = ContactDetail::new(ada());

        let first = detail.toggle_favorite();
        let second = detail.toggle_favorite();

        assert_eq!(run(&mut detail, &store, first).await, Settlement::Superseded);
        // Store now says favorite, but the newer "false" intent is still shown
        assert!(!detail.displayed_favorite());

        assert_eq!(run(&mut detail, &store, second).await, Settlement::Current);
        assert!(!detail.displayed_favorite());
        assert!(!store.snapshot("ada").unwrap().favorite);
    }

    #[tokio::test]
    async fn test_completion_from_replaced_screen_is_superseded() {
        let store = MemoryStore::with([ada()]);
        let mut replaced = ContactDetail::new(ada());
        let stale = replaced.toggle_favorite();
        assert_eq!(stale.form.get(FAVORITE_FIELD), Some("true"));

        // Navigated away and back: a fresh screen for the same contact
        let mut record = ada();
        record.favorite = true;
        let mut current = ContactDetail::new(record);
        let fresh = current.toggle_favorite();
        assert_eq!(fresh.form.get(FAVORITE_FIELD), Some("false"));
        assert_ne!(stale.id, fresh.id);

        assert_eq!(run(&mut current, &store, stale).await, Settlement::Superseded);
        assert!(current.is_submitting());
        assert!(!current.displayed_favorite());
    }

    #[test]
    fn test_revalidate_other_contact_drops_pending() {
        let mut detail = ContactDetail::new(ada());
        detail.toggle_favorite();
        detail.revalidate(contact("grace", Some("Grace"), Some("Hopper")));
        assert!(!detail.is_submitting());
        assert_eq!(detail.path(), "/contacts/grace");
    }
}
