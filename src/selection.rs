use crate::models::Job;

/// Terminal width at which the list and detail panes fit side by side.
pub const WIDE_MIN_COLUMNS: u16 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutClass {
    Narrow,
    Wide,
}

impl LayoutClass {
    pub fn from_width(columns: u16) -> Self {
        if columns >= WIDE_MIN_COLUMNS {
            LayoutClass::Wide
        } else {
            LayoutClass::Narrow
        }
    }
}

/// The job shown in the detail pane, and whether that pane covers the list
/// on a narrow layout.
#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    selected: Option<Job>,
    detail_foregrounded: bool,
}

impl SelectionController {
    pub fn selected(&self) -> Option<&Job> {
        self.selected.as_ref()
    }

    pub fn detail_foregrounded(&self) -> bool {
        self.detail_foregrounded
    }

    pub fn select(&mut self, job: Job, layout: LayoutClass) {
        self.selected = Some(job);
        if layout == LayoutClass::Narrow {
            self.detail_foregrounded = true;
        }
    }

    /// Back to the list. The selection itself is kept.
    pub fn dismiss_detail(&mut self) {
        self.detail_foregrounded = false;
    }

    /// Pick the first job of a fresh result set when nothing is selected yet.
    /// Never replaces an existing selection and never fires on narrow layouts.
    pub fn auto_select(&mut self, results: &[Job], layout: LayoutClass) -> bool {
        if self.selected.is_some() || layout != LayoutClass::Wide {
            return false;
        }
        match results.first() {
            Some(first) => {
                self.selected = Some(first.clone());
                true
            }
            None => false,
        }
    }
}
