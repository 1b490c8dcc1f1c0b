use crate::route::EditForm;

/// Fields of the edit form, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditField {
    First,
    Last,
    Avatar,
    Twitter,
    Notes,
}

impl EditField {
    pub const ALL: [EditField; 5] = [
        EditField::First,
        EditField::Last,
        EditField::Avatar,
        EditField::Twitter,
        EditField::Notes,
    ];

    pub fn title(self) -> &'static str {
        match self {
            EditField::First => "First",
            EditField::Last => "Last",
            EditField::Avatar => "Avatar URL",
            EditField::Twitter => "Twitter",
            EditField::Notes => "Notes",
        }
    }

    /// Form field name submitted to the edit action
    pub fn name(self) -> &'static str {
        EditForm::FIELDS[self.index()]
    }

    pub fn index(self) -> usize {
        match self {
            EditField::First => 0,
            EditField::Last => 1,
            EditField::Avatar => 2,
            EditField::Twitter => 3,
            EditField::Notes => 4,
        }
    }

    /// Get the next field, or None if at the end
    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// Get the previous field, or None if at the beginning
    pub fn prev(self) -> Option<Self> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }

    pub fn get(self, form: &EditForm) -> &str {
        let value = match self {
            EditField::First => &form.first,
            EditField::Last => &form.last,
            EditField::Avatar => &form.avatar,
            EditField::Twitter => &form.twitter,
            EditField::Notes => &form.notes,
        };
        value.as_deref().unwrap_or_default()
    }

    pub fn set(self, form: &mut EditForm, value: String) {
        let slot = match self {
            EditField::First => &mut form.first,
            EditField::Last => &mut form.last,
            EditField::Avatar => &mut form.avatar,
            EditField::Twitter => &mut form.twitter,
            EditField::Notes => &mut form.notes,
        };
        *slot = Some(value);
    }
}
