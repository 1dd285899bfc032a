use crate::models::{JobType, Pagination};

/// Fixed page size sent with every request.
pub const PAGE_SIZE: u32 = 20;

/// Experience levels understood by the jobs API. These are wire values.
pub const EXPERIENCE_LEVELS: [&str; 4] = ["0-1 tahun", "1-3 tahun", "3-5 tahun", "5+ tahun"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    Latest,
    Salary,
    Popular,
}

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Latest => "latest",
            SortMode::Salary => "salary",
            SortMode::Popular => "popular",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "latest" => Some(SortMode::Latest),
            "salary" => Some(SortMode::Salary),
            "popular" => Some(SortMode::Popular),
            _ => None,
        }
    }

    pub fn next(self) -> Self {
        match self {
            SortMode::Latest => SortMode::Salary,
            SortMode::Salary => SortMode::Popular,
            SortMode::Popular => SortMode::Latest,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetKind {
    JobType,
    Experience,
    // Not offered in the UI yet; never sent to the API.
    #[allow(dead_code)]
    Category,
}

/// One user-driven change to the filter state.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterUpdate {
    SearchQuery(String),
    Location(String),
    #[allow(dead_code)]
    Salary(String),
    ToggleFacet(FacetKind, String),
    Sort(SortMode),
    ClearAll,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterState {
    pub search_query: String,
    pub location: String,
    /// Facet sets keep insertion order for rendering.
    pub job_type: Vec<JobType>,
    pub experience: Vec<String>,
    pub salary: String,
    pub category: Vec<String>,
    pub sort_by: SortMode,
}

impl FilterState {
    pub fn with_search(search_query: &str) -> Self {
        Self {
            search_query: search_query.to_string(),
            ..Self::default()
        }
    }

    /// Apply an update. Returns true when the query-relevant state was replaced
    /// and a new fetch is due.
    pub fn apply(&mut self, update: FilterUpdate) -> bool {
        match update {
            FilterUpdate::SearchQuery(text) => replace(&mut self.search_query, text),
            FilterUpdate::Location(text) => replace(&mut self.location, text),
            FilterUpdate::Salary(text) => replace(&mut self.salary, text),
            FilterUpdate::ToggleFacet(kind, value) => {
                self.toggle_facet(kind, value);
                true
            }
            FilterUpdate::Sort(mode) => {
                let changed = self.sort_by != mode;
                self.sort_by = mode;
                changed
            }
            FilterUpdate::ClearAll => {
                self.clear_all();
                true
            }
        }
    }

    pub fn toggle_facet(&mut self, kind: FacetKind, value: String) {
        match kind {
            FacetKind::JobType => toggle_member(&mut self.job_type, JobType::from(value)),
            FacetKind::Experience => toggle_member(&mut self.experience, value),
            FacetKind::Category => toggle_member(&mut self.category, value),
        }
    }

    pub fn has_facet(&self, kind: FacetKind, value: &str) -> bool {
        match kind {
            FacetKind::JobType => self.job_type.iter().any(|t| t.as_str() == value),
            FacetKind::Experience => self.experience.iter().any(|e| e == value),
            FacetKind::Category => self.category.iter().any(|c| c == value),
        }
    }

    /// Sort mode survives a clear.
    pub fn clear_all(&mut self) {
        *self = Self {
            sort_by: self.sort_by,
            ..Self::default()
        };
    }

    pub fn active_filters_count(&self) -> usize {
        self.job_type.len() + self.experience.len()
    }
}

fn replace(field: &mut String, value: String) -> bool {
    if *field == value {
        return false;
    }
    *field = value;
    true
}

fn toggle_member<T: PartialEq>(set: &mut Vec<T>, value: T) {
    if let Some(pos) = set.iter().position(|v| *v == value) {
        set.remove(pos);
    } else {
        set.push(value);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    pub page: u32,
    pub limit: u32,
    pub total_count: u64,
    pub total_pages: u32,
}

impl Default for Paginator {
    fn default() -> Self {
        Self {
            page: 1,
            limit: PAGE_SIZE,
            total_count: 0,
            total_pages: 0,
        }
    }
}

impl Paginator {
    /// Back to page 1. Returns true if the page moved.
    pub fn reset(&mut self) -> bool {
        self.set_page(1)
    }

    /// Not clamped against `total_pages`; only the lower bound is enforced.
    pub fn set_page(&mut self, page: u32) -> bool {
        let page = page.max(1);
        let changed = self.page != page;
        self.page = page;
        changed
    }

    pub fn next_page(&mut self) -> bool {
        if self.page < self.total_pages {
            self.set_page(self.page + 1)
        } else {
            false
        }
    }

    pub fn prev_page(&mut self) -> bool {
        if self.page > 1 {
            self.set_page(self.page - 1)
        } else {
            false
        }
    }

    /// Metadata comes from the response; the requested page stays ours.
    pub fn update_from(&mut self, pagination: &Pagination) {
        self.limit = pagination.limit;
        self.total_count = pagination.total_count;
        self.total_pages = pagination.total_pages;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_is_its_own_inverse() {
        let mut filters = FilterState::default();
        filters.toggle_facet(FacetKind::Experience, "1-3 tahun".to_string());
        let original = filters.clone();

        for n in 1..=6 {
            filters.toggle_facet(FacetKind::JobType, "CONTRACT".to_string());
            if n % 2 == 0 {
                assert_eq!(filters, original);
            } else {
                assert!(filters.has_facet(FacetKind::JobType, "CONTRACT"));
            }
        }
    }

    #[test]
    fn test_facets_keep_insertion_order() {
        let mut filters = FilterState::default();
        filters.toggle_facet(FacetKind::JobType, "INTERNSHIP".to_string());
        filters.toggle_facet(FacetKind::JobType, "FULL_TIME".to_string());
        filters.toggle_facet(FacetKind::JobType, "PART_TIME".to_string());
        filters.toggle_facet(FacetKind::JobType, "FULL_TIME".to_string());
        assert_eq!(filters.job_type, vec![JobType::Internship, JobType::PartTime]);
    }

    #[test]
    fn test_clear_all_keeps_sort() {
        let mut filters = FilterState::with_search("rust");
        filters.apply(FilterUpdate::Location("Surabaya".to_string()));
        filters.apply(FilterUpdate::ToggleFacet(FacetKind::JobType, "FREELANCE".to_string()));
        filters.apply(FilterUpdate::ToggleFacet(FacetKind::Experience, "5+ tahun".to_string()));
        filters.apply(FilterUpdate::ToggleFacet(FacetKind::Category, "IT".to_string()));
        filters.apply(FilterUpdate::Salary("10jt".to_string()));
        filters.apply(FilterUpdate::Sort(SortMode::Popular));

        assert!(filters.apply(FilterUpdate::ClearAll));

        assert_eq!(filters.search_query, "");
        assert_eq!(filters.location, "");
        assert!(filters.job_type.is_empty());
        assert!(filters.experience.is_empty());
        assert!(filters.category.is_empty());
        assert_eq!(filters.salary, "");
        assert_eq!(filters.sort_by, SortMode::Popular);
    }

    #[test]
    fn test_apply_reports_changes() {
        let mut filters = FilterState::default();
        assert!(filters.apply(FilterUpdate::SearchQuery("go".to_string())));
        assert!(!filters.apply(FilterUpdate::SearchQuery("go".to_string())));
        assert!(!filters.apply(FilterUpdate::Sort(SortMode::Latest)));
        assert!(filters.apply(FilterUpdate::Sort(SortMode::Salary)));
        assert!(filters.apply(FilterUpdate::ToggleFacet(FacetKind::Experience, "0-1 tahun".to_string())));
    }

    #[test]
    fn test_active_filters_count() {
        let mut filters = FilterState::default();
        filters.toggle_facet(FacetKind::JobType, "FULL_TIME".to_string());
        filters.toggle_facet(FacetKind::Experience, "3-5 tahun".to_string());
        filters.toggle_facet(FacetKind::Category, "Design".to_string());
        assert_eq!(filters.active_filters_count(), 2);
    }

    #[test]
    fn test_sort_mode_cycle_and_parse() {
        assert_eq!(SortMode::default(), SortMode::Latest);
        assert_eq!(SortMode::Latest.next().next().next(), SortMode::Latest);
        assert_eq!(SortMode::parse("popular"), Some(SortMode::Popular));
        assert_eq!(SortMode::parse("oldest"), None);
    }

    #[test]
    fn test_paginator_bounds() {
        let mut pager = Paginator::default();
        assert!(!pager.prev_page());
        assert!(!pager.next_page());

        pager.update_from(&Pagination { page: 1, limit: 20, total_count: 45, total_pages: 3 });
        assert!(pager.next_page());
        assert!(pager.next_page());
        assert!(!pager.next_page());
        assert_eq!(pager.page, 3);

        assert!(!pager.set_page(3));
        assert!(pager.set_page(0));
        assert_eq!(pager.page, 1);

        // Page may run past total_pages when set directly.
        assert!(pager.set_page(9));
        assert_eq!(pager.page, 9);
        assert!(pager.reset());
        assert_eq!(pager.page, 1);
    }
}
