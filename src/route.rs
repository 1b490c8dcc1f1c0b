//! Contact routes: path matching, typed form data and the loader/action handlers.
//!
//! Handlers follow the loader/action split: the loader reads a contact for a
//! `/contacts/:contactId` path, actions apply form submissions to the store.
//! Failures are returned as `RouteError`; rendering them is up to the host.

use std::collections::HashMap;
use std::fmt;

use http::StatusCode;
use thiserror::Error;
use tracing::{debug, info};

use crate::contact::{Contact, ContactUpdate};
use crate::store::{ContactStore, StoreError};

/// Name of the dynamic segment holding the contact identifier.
pub const CONTACT_ID: &str = "contactId";

pub const CONTACT_ROUTE: &str = "/contacts/:contactId";
pub const EDIT_ROUTE: &str = "/contacts/:contactId/edit";
pub const DESTROY_ROUTE: &str = "/contacts/:contactId/destroy";

/// Form field carrying the favorite intent.
pub const FAVORITE_FIELD: &str = "favorite";

// =============================================================================
// Paths and params
// =============================================================================

/// Values bound to dynamic segments, keyed by segment name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(HashMap<String, String>);

impl Params {
    pub fn contact(id: impl Into<String>) -> Self {
        let mut params = Self::default();
        params.insert(CONTACT_ID, id);
        params
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    fn contact_id(&self) -> Result<&str, RouteError> {
        self.get(CONTACT_ID)
            .filter(|id| !id.is_empty())
            .ok_or(RouteError::MissingParam(CONTACT_ID))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Dynamic(String),
}

/// A path pattern such as `/contacts/:contactId/edit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    segments: Vec<Segment>,
}

impl RoutePattern {
    pub fn parse(pattern: &str) -> Self {
        let segments = split_path(pattern)
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) => Segment::Dynamic(name.to_string()),
                None => Segment::Static(segment.to_string()),
            })
            .collect();
        Self { segments }
    }

    /// Match a concrete path, binding dynamic segments.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let parts: Vec<&str> = split_path(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = Params::default();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Static(expected) if expected == part => {}
                Segment::Static(_) => return None,
                Segment::Dynamic(name) => params.insert(name.clone(), part),
            }
        }
        Some(params)
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

pub fn contact_path(id: &str) -> String {
    format!("/contacts/{}", id)
}

/// Resolve a form action against the path the form is rendered at.
/// Relative actions (`edit`, `destroy`) nest under `base`; `..` climbs one level.
pub fn resolve(base: &str, action: &str) -> String {
    if action.starts_with('/') {
        return action.to_string();
    }

    let mut parts: Vec<&str> = split_path(base).collect();
    for part in split_path(action) {
        match part {
            "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    format!("/{}", parts.join("/"))
}

// =============================================================================
// Form data
// =============================================================================

/// Submitted name/value pairs, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData(Vec<(String, String)>);

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.append(name, value);
        self
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// First value submitted under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Typed body of the favorite toggle submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FavoriteForm {
    pub favorite: bool,
}

impl FavoriteForm {
    pub fn new(favorite: bool) -> Self {
        Self { favorite }
    }

    pub fn to_form_data(self) -> FormData {
        FormData::new().with(FAVORITE_FIELD, encode_bool(self.favorite))
    }
}

impl TryFrom<&FormData> for FavoriteForm {
    type Error = RouteError;

    fn try_from(form: &FormData) -> Result<Self, Self::Error> {
        let raw = form.get(FAVORITE_FIELD).ok_or(RouteError::InvalidForm {
            field: FAVORITE_FIELD,
            reason: "missing".to_string(),
        })?;
        let favorite = decode_bool(raw).ok_or_else(|| RouteError::InvalidForm {
            field: FAVORITE_FIELD,
            reason: format!("expected \"true\" or \"false\", got {:?}", raw),
        })?;
        Ok(Self { favorite })
    }
}

pub fn encode_bool(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

pub fn decode_bool(raw: &str) -> Option<bool> {
    match raw {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Typed body of the edit submission. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditForm {
    pub first: Option<String>,
    pub last: Option<String>,
    pub avatar: Option<String>,
    pub twitter: Option<String>,
    pub notes: Option<String>,
}

impl EditForm {
    pub const FIELDS: [&'static str; 5] = ["first", "last", "avatar", "twitter", "notes"];

    /// Prefill every field from the stored record; absent values become blank.
    pub fn from_contact(contact: &Contact) -> Self {
        let field = |value: &Option<String>| Some(value.clone().unwrap_or_default());
        Self {
            first: field(&contact.first),
            last: field(&contact.last),
            avatar: field(&contact.avatar),
            twitter: field(&contact.twitter),
            notes: field(&contact.notes),
        }
    }

    pub fn to_form_data(&self) -> FormData {
        let mut form = FormData::new();
        for (name, value) in Self::FIELDS.iter().zip(self.values()) {
            if let Some(value) = value {
                form.append(*name, value.clone());
            }
        }
        form
    }

    fn values(&self) -> [&Option<String>; 5] {
        [
            &self.first,
            &self.last,
            &self.avatar,
            &self.twitter,
            &self.notes,
        ]
    }

    fn into_update(self) -> ContactUpdate {
        ContactUpdate {
            first: self.first,
            last: self.last,
            avatar: self.avatar,
            twitter: self.twitter,
            notes: self.notes,
            favorite: None,
        }
    }
}

impl From<&FormData> for EditForm {
    fn from(form: &FormData) -> Self {
        let field = |name: &str| form.get(name).map(str::to_string);
        Self {
            first: field("first"),
            last: field("last"),
            avatar: field("avatar"),
            twitter: field("twitter"),
            notes: field("notes"),
        }
    }
}

// =============================================================================
// Responses and errors
// =============================================================================

/// A response thrown by a handler instead of data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub status: StatusCode,
    pub status_text: String,
    pub data: String,
}

impl ErrorResponse {
    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            status_text: "Not Found".to_string(),
            data: String::new(),
        }
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.status_text)
    }
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("{0}")]
    Response(ErrorResponse),
    #[error("invalid form field `{field}`: {reason}")]
    InvalidForm { field: &'static str, reason: String },
    #[error("missing route parameter `{0}`")]
    MissingParam(&'static str),
    #[error(transparent)]
    Store(StoreError),
}

impl RouteError {
    pub fn status(&self) -> StatusCode {
        match self {
            RouteError::Response(response) => response.status,
            RouteError::InvalidForm { .. } | RouteError::MissingParam(_) => {
                StatusCode::BAD_REQUEST
            }
            RouteError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == StatusCode::NOT_FOUND
    }
}

impl From<StoreError> for RouteError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => RouteError::Response(ErrorResponse::not_found()),
            other => RouteError::Store(other),
        }
    }
}

/// Where a navigating submission sends the host next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
}

impl Redirect {
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderData {
    pub contact: Contact,
}

/// Load the contact named by the `contactId` segment.
pub async fn loader(store: &dyn ContactStore, params: &Params) -> Result<LoaderData, RouteError> {
    let id = params.contact_id()?;
    match store.get_contact(id).await? {
        Some(contact) => Ok(LoaderData { contact }),
        None => {
            debug!(id, "contact not found");
            Err(RouteError::Response(ErrorResponse::not_found()))
        }
    }
}

/// Apply a favorite submission and return the updated record.
pub async fn action(
    store: &dyn ContactStore,
    params: &Params,
    form: &FormData,
) -> Result<Contact, RouteError> {
    let id = params.contact_id()?;
    let FavoriteForm { favorite } = FavoriteForm::try_from(form)?;
    let contact = store
        .update_contact(id, ContactUpdate::favorite(favorite))
        .await?;
    Ok(contact)
}

/// Save the edit form, then return to the contact.
pub async fn edit_action(
    store: &dyn ContactStore,
    params: &Params,
    form: &FormData,
) -> Result<Redirect, RouteError> {
    let id = params.contact_id()?;
    let update = EditForm::from(form).into_update();
    store.update_contact(id, update).await?;
    info!(id, "contact edited");
    Ok(Redirect::to(contact_path(id)))
}

/// Delete the contact, then return to the index.
pub async fn destroy_action(
    store: &dyn ContactStore,
    params: &Params,
) -> Result<Redirect, RouteError> {
    let id = params.contact_id()?;
    if !store.delete_contact(id).await? {
        return Err(RouteError::Response(ErrorResponse::not_found()));
    }
    info!(id, "contact deleted");
    Ok(Redirect::to("/"))
}
