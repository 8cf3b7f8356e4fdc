//! Place search view model
//!
//! Holds the query text, the candidate list and the selected place. Searches
//! run to completion on background tasks; completions are applied in arrival
//! order with no debouncing or cancellation, so a slow earlier search can
//! still overwrite a faster later one.

use crate::geo::{Place, PlaceSearch};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

enum SearchEvent {
    Completed { candidates: Vec<Place> },
}

/// UI state for the place search box
pub struct SearchViewModel {
    provider: Arc<dyn PlaceSearch>,
    /// Query text, bound to the search field
    pub query: String,
    candidates: Vec<Place>,
    selected: Option<Place>,
    dropdown_open: bool,
    in_flight: usize,
    searched: bool,
    events_rx: UnboundedReceiver<SearchEvent>,
    events_tx: UnboundedSender<SearchEvent>,
}

impl SearchViewModel {
    pub fn new(provider: Arc<dyn PlaceSearch>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            provider,
            query: String::new(),
            candidates: Vec::new(),
            selected: None,
            dropdown_open: false,
            in_flight: 0,
            searched: false,
            events_rx,
            events_tx,
        }
    }

    /// Run the current query against the search provider.
    ///
    /// An empty query clears the candidates without a provider call. Failures
    /// are logged and yield an empty candidate list.
    pub fn search(&mut self) {
        let query = self.query.trim().to_string();
        self.dropdown_open = true;

        if query.is_empty() {
            self.candidates.clear();
            self.searched = true;
            return;
        }

        let provider = self.provider.clone();
        let events = self.events_tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let candidates = match provider.search(&query).await {
                Ok(places) => places,
                Err(e) => {
                    tracing::warn!("place search failed for {query:?}: {e}");
                    Vec::new()
                }
            };
            let _ = events.send(SearchEvent::Completed { candidates });
        });
    }

    /// Select a place from the candidate list and close the dropdown
    pub fn select(&mut self, place: Place) {
        tracing::info!(locality = %place.locality, "selected place");
        self.selected = Some(place);
        self.dropdown_open = false;
    }

    /// Drain pending search completions. Returns whether any state changed.
    pub fn process_events(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                SearchEvent::Completed { candidates } => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    self.candidates = candidates;
                    self.searched = true;
                }
            }
            changed = true;
        }
        changed
    }

    pub fn candidates(&self) -> &[Place] {
        &self.candidates
    }

    pub fn selected(&self) -> Option<&Place> {
        self.selected.as_ref()
    }

    pub fn is_searching(&self) -> bool {
        self.in_flight > 0
    }

    pub fn is_dropdown_open(&self) -> bool {
        self.dropdown_open
    }

    /// Whether at least one search has completed since startup
    pub fn has_searched(&self) -> bool {
        self.searched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{Coordinates, GeoError, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct MockSearch {
        calls: AtomicUsize,
    }

    impl MockSearch {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn paris() -> Place {
        Place {
            locality: "Paris".to_string(),
            country: "FR".to_string(),
            coordinates: Coordinates::new(48.85, 2.35),
        }
    }

    #[async_trait]
    impl PlaceSearch for MockSearch {
        async fn search(&self, query: &str) -> Result<Vec<Place>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match query {
                "Paris" => Ok(vec![paris()]),
                "Nowhere" => Ok(Vec::new()),
                _ => Err(GeoError::OperationFailed("mock backend down".to_string())),
            }
        }
    }

    /// Pump completions until the predicate holds or a generous deadline passes
    async fn drive(vm: &mut SearchViewModel, ready: impl Fn(&SearchViewModel) -> bool) {
        for _ in 0..500 {
            vm.process_events();
            if ready(vm) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("view model did not reach the expected state");
    }

    #[tokio::test]
    async fn test_search_replaces_candidates_and_select_sets_place() {
        let mut vm = SearchViewModel::new(MockSearch::new());

        vm.query = "Paris".to_string();
        vm.search();
        drive(&mut vm, |vm| vm.has_searched()).await;

        assert_eq!(vm.candidates().len(), 1);
        assert!(vm.is_dropdown_open());

        let candidate = vm.candidates()[0].clone();
        vm.select(candidate);

        assert_eq!(vm.selected(), Some(&paris()));
        assert!(!vm.is_dropdown_open());
    }

    #[tokio::test]
    async fn test_empty_query_yields_empty_candidates_without_provider_call() {
        let provider = MockSearch::new();
        let mut vm = SearchViewModel::new(provider.clone());

        vm.query = "   ".to_string();
        vm.search();

        assert!(vm.candidates().is_empty());
        assert!(vm.has_searched());
        assert!(!vm.is_searching());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_search_yields_empty_candidates() {
        let mut vm = SearchViewModel::new(MockSearch::new());

        vm.query = "Atlantis".to_string();
        vm.search();
        drive(&mut vm, |vm| vm.has_searched()).await;

        assert!(vm.candidates().is_empty());
        assert!(!vm.is_searching());
    }

    #[tokio::test]
    async fn test_selected_place_survives_failed_search() {
        let mut vm = SearchViewModel::new(MockSearch::new());

        vm.query = "Paris".to_string();
        vm.search();
        drive(&mut vm, |vm| !vm.candidates().is_empty()).await;
        let candidate = vm.candidates()[0].clone();
        vm.select(candidate);

        vm.query = "Atlantis".to_string();
        vm.search();
        drive(&mut vm, |vm| vm.candidates().is_empty()).await;

        assert_eq!(vm.selected(), Some(&paris()));
    }

    #[tokio::test]
    async fn test_empty_result_search_completes() {
        let mut vm = SearchViewModel::new(MockSearch::new());

        vm.query = "Nowhere".to_string();
        vm.search();
        drive(&mut vm, |vm| vm.has_searched()).await;

        assert!(vm.candidates().is_empty());
    }
}
