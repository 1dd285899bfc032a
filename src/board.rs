use anyhow::Result;
use tracing::info;

use crate::db::KeyValueStore;
use crate::filters::{FacetKind, FilterState, FilterUpdate, Paginator, SortMode};
use crate::models::{Job, JobId, JobsPage};
use crate::query::{FetchError, FetchOutcome, PendingFetch, QueryExecutor, ResponseOrdering};
use crate::saved::SavedJobsStore;
use crate::selection::{LayoutClass, SelectionController};

/// State behind the job search screen.
///
/// Every action that changes what should be on screen returns the fetch it
/// triggers, if any. The caller runs it against a `JobSource` and reports the
/// result through [`JobBoard::complete_fetch`], in whatever order results
/// arrive.
pub struct JobBoard<S: KeyValueStore> {
    filters: FilterState,
    pager: Paginator,
    executor: QueryExecutor,
    selection: SelectionController,
    saved: SavedJobsStore<S>,
    layout: LayoutClass,
}

impl<S: KeyValueStore> JobBoard<S> {
    /// Build the screen and issue the initial search.
    pub fn mount(
        saved: SavedJobsStore<S>,
        filters: FilterState,
        layout: LayoutClass,
        ordering: ResponseOrdering,
    ) -> (Self, PendingFetch) {
        let mut board = Self {
            filters,
            pager: Paginator::default(),
            executor: QueryExecutor::new(ordering),
            selection: SelectionController::default(),
            saved,
            layout,
        };
        info!(?layout, ?ordering, saved = board.saved.ids().len(), "job board mounted");
        let initial = board.fetch();
        (board, initial)
    }

    /// Flush saved jobs one last time.
    pub fn unmount(self) -> Result<()> {
        self.saved.save()
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn pager(&self) -> &Paginator {
        &self.pager
    }

    pub fn results(&self) -> &[Job] {
        self.executor.results()
    }

    pub fn loading(&self) -> bool {
        self.executor.loading()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.executor.last_error()
    }

    pub fn selected(&self) -> Option<&Job> {
        self.selection.selected()
    }

    pub fn detail_foregrounded(&self) -> bool {
        self.selection.detail_foregrounded()
    }

    pub fn layout(&self) -> LayoutClass {
        self.layout
    }

    pub fn is_saved(&self, id: &JobId) -> bool {
        self.saved.is_saved(id)
    }

    pub fn saved_count(&self) -> usize {
        self.saved.ids().len()
    }

    // --- Filter and page actions ---

    /// Any filter change sends the user back to page 1.
    pub fn update_filters(&mut self, update: FilterUpdate) -> Option<PendingFetch> {
        let changed = self.filters.apply(update);
        let page_moved = self.pager.reset();
        (changed || page_moved).then(|| self.fetch())
    }

    pub fn set_search_query(&mut self, text: &str) -> Option<PendingFetch> {
        self.update_filters(FilterUpdate::SearchQuery(text.to_string()))
    }

    pub fn set_location(&mut self, text: &str) -> Option<PendingFetch> {
        self.update_filters(FilterUpdate::Location(text.to_string()))
    }

    pub fn toggle_facet(&mut self, kind: FacetKind, value: &str) -> Option<PendingFetch> {
        self.update_filters(FilterUpdate::ToggleFacet(kind, value.to_string()))
    }

    pub fn set_sort(&mut self, mode: SortMode) -> Option<PendingFetch> {
        self.update_filters(FilterUpdate::Sort(mode))
    }

    pub fn clear_all(&mut self) -> Option<PendingFetch> {
        self.update_filters(FilterUpdate::ClearAll)
    }

    /// Leaves filters alone.
    pub fn set_page(&mut self, page: u32) -> Option<PendingFetch> {
        self.pager.set_page(page).then(|| self.fetch())
    }

    pub fn next_page(&mut self) -> Option<PendingFetch> {
        self.pager.next_page().then(|| self.fetch())
    }

    pub fn prev_page(&mut self) -> Option<PendingFetch> {
        self.pager.prev_page().then(|| self.fetch())
    }

    fn fetch(&mut self) -> PendingFetch {
        self.executor.begin(&self.filters, &self.pager)
    }

    pub fn complete_fetch(
        &mut self,
        seq: u64,
        result: Result<JobsPage, FetchError>,
    ) -> FetchOutcome {
        let outcome = self.executor.complete(seq, result, &mut self.pager);
        if outcome == FetchOutcome::Applied {
            self.selection.auto_select(self.executor.results(), self.layout);
        }
        outcome
    }

    // --- Selection ---

    pub fn select(&mut self, job: Job) {
        self.selection.select(job, self.layout);
    }

    pub fn select_index(&mut self, index: usize) -> bool {
        match self.executor.results().get(index) {
            Some(job) => {
                let job = job.clone();
                self.select(job);
                true
            }
            None => false,
        }
    }

    pub fn dismiss_detail(&mut self) {
        self.selection.dismiss_detail();
    }

    /// The detail pane only covers the list on narrow layouts.
    pub fn set_layout(&mut self, layout: LayoutClass) {
        self.layout = layout;
        if layout == LayoutClass::Wide {
            self.selection.dismiss_detail();
        }
    }

    // --- Saved jobs ---

    /// Touches nothing but the saved set.
    pub fn toggle_saved(&mut self, id: &JobId) -> bool {
        self.saved.toggle(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{Pagination, sample_job};

    fn mount(layout: LayoutClass) -> (JobBoard<Database>, PendingFetch) {
        let saved = SavedJobsStore::load(Database::open_in_memory().unwrap());
        JobBoard::mount(saved, FilterState::default(), layout, ResponseOrdering::AsCompleted)
    }

    fn page_of(ids: &[&str], total_pages: u32) -> JobsPage {
        JobsPage {
            jobs: ids.iter().map(|id| sample_job(id)).collect(),
            pagination: Pagination {
                page: 1,
                limit: 20,
                total_count: ids.len() as u64,
                total_pages,
            },
        }
    }

    fn selected_id(board: &JobBoard<Database>) -> Option<String> {
        board.selected().map(|j| j.id.to_string())
    }

    #[test]
    fn test_mount_issues_one_fetch_and_loads() {
        let (board, initial) = mount(LayoutClass::Wide);
        assert_eq!(initial.seq, 1);
        assert_eq!(initial.query.page, 1);
        assert!(board.loading());
        assert!(board.results().is_empty());
    }

    #[test]
    fn test_every_filter_mutation_resets_page() {
        let (mut board, _) = mount(LayoutClass::Wide);

        let updates = [
            FilterUpdate::SearchQuery("rust".to_string()),
            FilterUpdate::Location("Bali".to_string()),
            FilterUpdate::ToggleFacet(FacetKind::JobType, "INTERNSHIP".to_string()),
            FilterUpdate::ToggleFacet(FacetKind::Experience, "0-1 tahun".to_string()),
            FilterUpdate::Sort(SortMode::Salary),
            FilterUpdate::ClearAll,
        ];

        for update in updates {
            board.set_page(5);
            let pending = board.update_filters(update).expect("mutation should fetch");
            assert_eq!(board.pager().page, 1);
            assert_eq!(pending.query.page, 1);
        }
    }

    #[test]
    fn test_set_page_keeps_filters() {
        let (mut board, _) = mount(LayoutClass::Wide);
        board.set_search_query("designer");
        board.toggle_facet(FacetKind::JobType, "CONTRACT");
        let before = board.filters().clone();

        let pending = board.set_page(3).unwrap();
        assert_eq!(pending.query.page, 3);
        assert_eq!(pending.query.search.as_deref(), Some("designer"));
        assert_eq!(board.filters(), &before);
    }

    #[test]
    fn test_one_fetch_per_change() {
        let (mut board, initial) = mount(LayoutClass::Wide);
        let mut issued = vec![initial.seq];

        // Each keystroke is its own fetch; no debounce.
        for text in ["r", "ru", "rus", "rust"] {
            issued.push(board.set_search_query(text).unwrap().seq);
        }
        assert!(board.set_search_query("rust").is_none());
        assert!(board.set_sort(SortMode::Latest).is_none());
        assert!(board.set_page(1).is_none());
        issued.push(board.clear_all().unwrap().seq);

        assert_eq!(issued, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_clear_all_keeps_sort_and_resets_page() {
        let (mut board, _) = mount(LayoutClass::Wide);
        board.set_search_query("qa");
        board.set_location("Depok");
        board.toggle_facet(FacetKind::Experience, "3-5 tahun");
        board.set_sort(SortMode::Popular);
        board.set_page(4);

        let pending = board.clear_all().unwrap();
        assert_eq!(board.filters().search_query, "");
        assert_eq!(board.filters().location, "");
        assert!(board.filters().job_type.is_empty());
        assert!(board.filters().experience.is_empty());
        assert_eq!(board.filters().sort_by, SortMode::Popular);
        assert_eq!(board.pager().page, 1);
        assert_eq!(pending.query.params().len(), 3);
    }

    #[test]
    fn test_auto_select_first_job_on_wide() {
        let (mut board, initial) = mount(LayoutClass::Wide);
        board.complete_fetch(initial.seq, Ok(page_of(&["A", "B"], 1)));
        assert_eq!(selected_id(&board), Some("A".to_string()));
        assert!(!board.loading());
    }

    #[test]
    fn test_auto_select_keeps_existing_selection() {
        let (mut board, initial) = mount(LayoutClass::Wide);
        board.select(sample_job("B"));
        board.complete_fetch(initial.seq, Ok(page_of(&["A", "B"], 1)));
        assert_eq!(selected_id(&board), Some("B".to_string()));

        let next = board.set_search_query("other").unwrap();
        board.complete_fetch(next.seq, Ok(page_of(&["C"], 1)));
        assert_eq!(selected_id(&board), Some("B".to_string()));
    }

    #[test]
    fn test_no_auto_select_on_narrow() {
        let (mut board, initial) = mount(LayoutClass::Narrow);
        board.complete_fetch(initial.seq, Ok(page_of(&["A"], 1)));
        assert!(board.selected().is_none());

        assert!(board.select_index(0));
        assert!(board.detail_foregrounded());
        board.dismiss_detail();
        assert!(!board.detail_foregrounded());
        assert_eq!(selected_id(&board), Some("A".to_string()));
        assert!(!board.select_index(3));
    }

    #[test]
    fn test_failed_fetch_leaves_results_and_selection() {
        let (mut board, initial) = mount(LayoutClass::Wide);
        board.complete_fetch(initial.seq, Ok(page_of(&["A", "B"], 2)));

        let next = board.next_page().unwrap();
        assert_eq!(next.query.page, 2);
        let outcome = board.complete_fetch(next.seq, Err(FetchError::Unsuccessful));

        assert_eq!(outcome, FetchOutcome::Failed);
        assert!(!board.loading());
        assert_eq!(board.results().len(), 2);
        assert_eq!(selected_id(&board), Some("A".to_string()));
        assert!(board.last_error().is_some());
    }

    #[test]
    fn test_stale_response_overwrites_fresher_results() {
        let (mut board, initial) = mount(LayoutClass::Narrow);
        board.complete_fetch(initial.seq, Ok(page_of(&["R0"], 1)));

        let q1 = board.set_search_query("q1").unwrap();
        let q2 = board.set_search_query("q2").unwrap();

        board.complete_fetch(q2.seq, Ok(page_of(&["R2"], 1)));
        assert_eq!(board.results()[0].id.to_string(), "R2");

        // The older request lands last and wins.
        board.complete_fetch(q1.seq, Ok(page_of(&["R1"], 1)));
        assert_eq!(board.results()[0].id.to_string(), "R1");
        assert_eq!(board.filters().search_query, "q2");
    }

    #[test]
    fn test_latest_only_ordering_on_board() {
        let saved = SavedJobsStore::load(Database::open_in_memory().unwrap());
        let (mut board, _) = JobBoard::mount(
            saved,
            FilterState::default(),
            LayoutClass::Wide,
            ResponseOrdering::LatestOnly,
        );
        let q1 = board.set_search_query("q1").unwrap();
        let q2 = board.set_search_query("q2").unwrap();

        board.complete_fetch(q2.seq, Ok(page_of(&["R2"], 1)));
        assert_eq!(board.complete_fetch(q1.seq, Ok(page_of(&["R1"], 1))), FetchOutcome::Stale);
        assert_eq!(board.results()[0].id.to_string(), "R2");
    }

    #[test]
    fn test_toggle_saved_does_not_select() {
        let (mut board, initial) = mount(LayoutClass::Narrow);
        board.complete_fetch(initial.seq, Ok(page_of(&["A", "B"], 1)));

        let id = board.results()[1].id.clone();
        assert!(board.toggle_saved(&id));
        assert!(board.is_saved(&id));
        assert!(board.selected().is_none());
        assert!(!board.detail_foregrounded());
        assert_eq!(board.saved_count(), 1);

        assert!(!board.toggle_saved(&id));
        assert!(!board.is_saved(&id));
        assert!(board.unmount().is_ok());
    }

    #[test]
    fn test_widening_lowers_foregrounded_detail() {
        let (mut board, initial) = mount(LayoutClass::Narrow);
        board.complete_fetch(initial.seq, Ok(page_of(&["A"], 1)));
        board.select_index(0);
        assert!(board.detail_foregrounded());

        board.set_layout(LayoutClass::Wide);
        assert!(!board.detail_foregrounded());
        assert_eq!(selected_id(&board), Some("A".to_string()));

        board.set_layout(LayoutClass::Narrow);
        assert!(!board.detail_foregrounded());
    }

    #[test]
    fn test_prev_page_bounded() {
        let (mut board, initial) = mount(LayoutClass::Wide);
        board.complete_fetch(initial.seq, Ok(page_of(&["A"], 3)));
        assert!(board.prev_page().is_none());
        assert!(board.next_page().is_some());
        assert_eq!(board.prev_page().map(|p| p.query.page), Some(1));
    }
}
