//! Confirmation gate for destructive submissions.

use std::io::{BufRead, Write};

use tracing::debug;

use crate::route::{self, Params};

pub const DELETE_PROMPT: &str = "Please confirm you want to delete this record.";

/// Asks the user a yes/no question. `false` cancels the pending submission.
pub trait Confirm {
    fn confirm(&mut self, message: &str) -> bool;
}

/// Accepts every prompt (`--yes`).
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _message: &str) -> bool {
        true
    }
}

/// Prompts on a writer and reads the answer from a reader; `y`/`yes` accepts.
pub struct PromptConfirm<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptConfirm<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Confirm for PromptConfirm<R, W> {
    fn confirm(&mut self, message: &str) -> bool {
        if write!(self.output, "{} [y/N] ", message)
            .and_then(|_| self.output.flush())
            .is_err()
        {
            return false;
        }
        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

/// A delete the user asked for but has not confirmed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteIntent {
    contact_id: String,
}

/// A confirmed, navigating submission to the destroy action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestroySubmission {
    pub action: String,
    pub params: Params,
}

impl DeleteIntent {
    pub fn new(contact_id: impl Into<String>) -> Self {
        Self {
            contact_id: contact_id.into(),
        }
    }

    pub fn message(&self) -> &'static str {
        DELETE_PROMPT
    }

    pub fn contact_id(&self) -> &str {
        &self.contact_id
    }

    pub fn accept(self) -> DestroySubmission {
        let base = route::contact_path(&self.contact_id);
        DestroySubmission {
            action: route::resolve(&base, "destroy"),
            params: Params::contact(self.contact_id),
        }
    }

    pub fn decline(self) {
        debug!(contact = %self.contact_id, "delete cancelled");
    }

    /// Ask `confirm`; only an accepted prompt yields a submission.
    pub fn resolve(self, confirm: &mut dyn Confirm) -> Option<DestroySubmission> {
        if confirm.confirm(self.message()) {
            Some(self.accept())
        } else {
            self.decline();
            None
        }
    }
}
