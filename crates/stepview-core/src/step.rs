//! Step cursor and the numeric step input bound to it

use crate::error::{Result, ViewerError};

/// Selected time step of an animated sequence.
///
/// `None` means "follow the latest step": the poll loop then requests
/// `/scene` without a step parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepCursor {
    selected: Option<u32>,
    total: Option<u32>,
}

impl StepCursor {
    pub fn selected(&self) -> Option<u32> {
        self.selected
    }

    pub fn total(&self) -> Option<u32> {
        self.total
    }

    /// Highest selectable step, once the total is known and non-zero
    pub fn max_step(&self) -> Option<u32> {
        self.total.and_then(|t| t.checked_sub(1))
    }

    /// Step to show in the controls: the selection, or the latest step
    pub fn display_step(&self) -> Option<u32> {
        self.selected.or_else(|| self.max_step())
    }

    pub fn is_following_latest(&self) -> bool {
        self.selected.is_none()
    }

    /// Select a step. Rejected when a known total says it does not exist.
    pub fn select(&mut self, step: u32) -> Result<()> {
        if let Some(total) = self.total {
            if step >= total {
                return Err(ViewerError::StepOutOfRange { step, total });
            }
        }
        self.selected = Some(step);
        Ok(())
    }

    pub fn follow_latest(&mut self) {
        self.selected = None;
    }

    /// Update the step count reported by the server, clamping the selection
    pub fn set_total(&mut self, total: u32) {
        self.total = Some(total);
        if let Some(step) = self.selected {
            if step >= total {
                self.selected = total.checked_sub(1);
            }
        }
    }
}

/// Text state of the numeric step input.
///
/// While the input has focus, cursor changes do not overwrite what the user
/// sees or types. On blur an edited value is committed and the display is
/// resynchronised with the cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepInput {
    text: String,
    focused: bool,
    edited: bool,
}

impl StepInput {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn focus(&mut self) {
        self.focused = true;
    }

    /// User typed into the input
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.edited = true;
    }

    /// Refresh the display from the cursor unless the input has focus
    pub fn sync(&mut self, cursor: &StepCursor) {
        if self.focused {
            return;
        }
        self.text = cursor
            .display_step()
            .map(|s| s.to_string())
            .unwrap_or_default();
        self.edited = false;
    }

    /// Commit the typed value (Enter). Returns true when the cursor moved.
    pub fn commit(&mut self, cursor: &mut StepCursor) -> bool {
        let Ok(step) = self.text.trim().parse::<u32>() else {
            tracing::debug!(text = %self.text, "Ignoring non-numeric step input");
            return false;
        };
        if let Err(e) = cursor.select(step) {
            tracing::debug!(error = %e, "Ignoring step input");
            return false;
        }
        self.edited = false;
        true
    }

    /// Focus lost: commit an edit, then show the cursor's value.
    /// Returns true when the cursor moved.
    pub fn blur(&mut self, cursor: &mut StepCursor) -> bool {
        self.focused = false;
        let moved = self.edited && self.commit(cursor);
        self.sync(cursor);
        moved
    }
}
