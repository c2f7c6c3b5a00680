//! ============================================================================
//! Catalog View Controller - Filtered, incrementally revealed product list
//! ============================================================================
//! Fetches the catalog once per activation, filters it by category, and
//! reveals it a page at a time. Paging is driven by a boundary sentinel at
//! the end of the displayed list: the platform reports when it becomes
//! visible through a `VisibilityNotifier`.
//!
//! ## Reveal rules
//! - Initial reveal and every step are `PAGE_SIZE` items
//! - `reveal_count` never exceeds the filtered length
//! - Changing the category resets the reveal to the first page
//! - A sentinel is tagged with the slice generation it was armed for; once the
//!   slice grows, repeats of the old sentinel are ignored
//! ============================================================================

use tracing::{debug, info, warn};

use crate::catalog::CatalogSource;
use crate::types::{CatalogError, Product};

/// Items per reveal step (and the initial page)
pub const PAGE_SIZE: usize = 8;

/// Category selection. `All` shows the whole catalog.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Category(String),
}

impl CategoryFilter {
    /// "all" (any case) selects everything, anything else is a category name
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            CategoryFilter::All
        } else {
            CategoryFilter::Category(trimmed.to_string())
        }
    }

    pub fn matches(&self, product: &Product) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Category(name) => product.category == *name,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            CategoryFilter::All => "all",
            CategoryFilter::Category(name) => name,
        }
    }
}

/// End-of-list marker handed to the notifier. Only the most recently armed
/// sentinel can advance the reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sentinel {
    generation: u64,
}

/// Platform hook reporting when the end-of-list sentinel scrolls into view.
/// The platform calls back into `CatalogViewController::on_boundary_visible`.
pub trait VisibilityNotifier {
    /// Start watching `sentinel`, replacing anything watched before
    fn observe(&mut self, sentinel: Sentinel);

    /// Stop watching; no sentinel is rendered
    fn disconnect(&mut self);
}

/// Notifier for front ends without a viewport: the armed sentinel is handed
/// out once per arming when the user reaches the end of the list.
#[derive(Debug, Default)]
pub struct ScrollNotifier {
    armed: Option<Sentinel>,
}

impl ScrollNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// The user reached the end of the list. Yields the sentinel the first
    /// time only; later calls wait for the controller to re-arm.
    pub fn scrolled_to_end(&mut self) -> Option<Sentinel> {
        self.armed.take()
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }
}

impl VisibilityNotifier for ScrollNotifier {
    fn observe(&mut self, sentinel: Sentinel) {
        self.armed = Some(sentinel);
    }

    fn disconnect(&mut self) {
        self.armed = None;
    }
}

/// Identity of one catalog load; completions for older tickets are dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// What the list area should render
#[derive(Debug, PartialEq)]
pub enum CatalogView<'a> {
    Loading,
    /// Nothing matches the selected category
    Empty,
    Ready {
        products: &'a [Product],
        /// A "loading more" sentinel follows the list
        has_more: bool,
        /// Size of the filtered set
        total: usize,
    },
}

/// Fetch products and categories together. Either failing fails the pair.
pub async fn fetch_catalog(
    source: &dyn CatalogSource,
) -> Result<(Vec<Product>, Vec<String>), CatalogError> {
    tokio::try_join!(source.products(), source.categories())
}

pub struct CatalogViewController<N: VisibilityNotifier> {
    loading: bool,
    all_products: Vec<Product>,
    categories: Vec<String>,
    selected: CategoryFilter,
    filtered: Vec<Product>,
    reveal_count: usize,
    generation: u64,
    latest_load: u64,
    last_error: Option<String>,
    notifier: N,
}

impl<N: VisibilityNotifier> CatalogViewController<N> {
    /// New controller in the loading state
    pub fn new(notifier: N) -> Self {
        Self {
            loading: true,
            all_products: Vec::new(),
            categories: Vec::new(),
            selected: CategoryFilter::All,
            filtered: Vec::new(),
            reveal_count: 0,
            generation: 0,
            latest_load: 0,
            last_error: None,
            notifier,
        }
    }

    /// Load the catalog and become ready. Fetch failures are logged and kept
    /// in `last_error`; the view then shows an empty catalog.
    pub async fn activate(&mut self, source: &dyn CatalogSource) {
        let ticket = self.begin_load();
        let result = fetch_catalog(source).await;
        self.apply_load(ticket, result);
    }

    /// Enter loading and issue a ticket for the load about to start.
    /// Any earlier ticket becomes stale.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.latest_load += 1;
        self.loading = true;
        self.notifier.disconnect();
        debug!("Catalog load #{} started", self.latest_load);
        LoadTicket(self.latest_load)
    }

    /// Apply a finished load. Returns false when `ticket` was superseded.
    pub fn apply_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<(Vec<Product>, Vec<String>), CatalogError>,
    ) -> bool {
        if ticket.0 != self.latest_load {
            debug!(
                "Dropping stale catalog load #{} (latest #{})",
                ticket.0, self.latest_load
            );
            return false;
        }

        match result {
            Ok((products, categories)) => {
                info!(
                    "Catalog loaded: {} products in {} categories",
                    products.len(),
                    categories.len()
                );
                self.all_products = products;
                self.categories = categories;
                self.last_error = None;
            }
            Err(e) => {
                warn!("Failed to fetch catalog: {}", e);
                self.all_products.clear();
                self.categories.clear();
                self.last_error = Some(e.to_string());
            }
        }

        self.loading = false;
        self.selected = CategoryFilter::All;
        self.refilter();
        true
    }

    /// Switch category; the reveal restarts at the first page
    pub fn select_category(&mut self, filter: CategoryFilter) {
        debug!("Category selected: {}", filter.label());
        self.selected = filter;
        self.refilter();
    }

    /// The sentinel came into view. Advances the reveal by one page if the
    /// sentinel is current and more items remain; returns whether it did.
    pub fn on_boundary_visible(&mut self, sentinel: Sentinel) -> bool {
        if self.loading || sentinel.generation != self.generation {
            debug!(
                "Ignoring stale sentinel (gen {} vs {})",
                sentinel.generation, self.generation
            );
            return false;
        }
        if self.reveal_count >= self.filtered.len() {
            return false;
        }

        self.reveal_count = (self.reveal_count + PAGE_SIZE).min(self.filtered.len());
        debug!(
            "Revealed {}/{} products",
            self.reveal_count,
            self.filtered.len()
        );
        self.rearm();
        true
    }

    /// Tear down: stop observing and invalidate any outstanding sentinel or
    /// in-flight load
    pub fn deactivate(&mut self) {
        self.generation += 1;
        self.latest_load += 1;
        self.notifier.disconnect();
    }

    pub fn view(&self) -> CatalogView<'_> {
        if self.loading {
            return CatalogView::Loading;
        }
        if self.filtered.is_empty() {
            return CatalogView::Empty;
        }
        CatalogView::Ready {
            products: self.displayed_products(),
            has_more: self.has_more(),
            total: self.filtered.len(),
        }
    }

    /// `filtered[0..reveal_count]`
    pub fn displayed_products(&self) -> &[Product] {
        &self.filtered[..self.reveal_count]
    }

    pub fn filtered_products(&self) -> &[Product] {
        &self.filtered
    }

    pub fn all_products(&self) -> &[Product] {
        &self.all_products
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn selected_category(&self) -> &CategoryFilter {
        &self.selected
    }

    pub fn reveal_count(&self) -> usize {
        self.reveal_count
    }

    pub fn has_more(&self) -> bool {
        self.reveal_count < self.filtered.len()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Message from the last failed load, cleared by a successful one
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    fn refilter(&mut self) {
        self.filtered = self
            .all_products
            .iter()
            .filter(|p| self.selected.matches(p))
            .cloned()
            .collect();
        self.reveal_count = PAGE_SIZE.min(self.filtered.len());
        self.rearm();
    }

    /// New slice generation; watch a fresh sentinel only while items remain
    fn rearm(&mut self) {
        self.generation += 1;
        if !self.loading && self.has_more() {
            self.notifier.observe(Sentinel {
                generation: self.generation,
            });
        } else {
            self.notifier.disconnect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProductId, Rating};
    use async_trait::async_trait;

    #[derive(Default)]
    struct RecordingNotifier {
        watching: Option<Sentinel>,
        observed: Vec<Sentinel>,
        disconnects: usize,
    }

    impl VisibilityNotifier for RecordingNotifier {
        fn observe(&mut self, sentinel: Sentinel) {
            self.watching = Some(sentinel);
            self.observed.push(sentinel);
        }

        fn disconnect(&mut self) {
            self.watching = None;
            self.disconnects += 1;
        }
    }

    struct FakeCatalog {
        products: Vec<Product>,
        categories: Vec<String>,
        fail_products: bool,
        fail_categories: bool,
    }

    impl FakeCatalog {
        fn ok(products: Vec<Product>) -> Self {
            let mut categories: Vec<String> =
                products.iter().map(|p| p.category.clone()).collect();
            categories.sort();
            categories.dedup();
            Self {
                products,
                categories,
                fail_products: false,
                fail_categories: false,
            }
        }
    }

    #[async_trait]
    impl CatalogSource for FakeCatalog {
        async fn products(&self) -> Result<Vec<Product>, CatalogError> {
            if self.fail_products {
                return Err(CatalogError::Status(500));
            }
            Ok(self.products.clone())
        }

        async fn product(&self, id: ProductId) -> Result<Option<Product>, CatalogError> {
            Ok(self.products.iter().find(|p| p.id == id).cloned())
        }

        async fn categories(&self) -> Result<Vec<String>, CatalogError> {
            if self.fail_categories {
                return Err(CatalogError::Network("connection reset".to_string()));
            }
            Ok(self.categories.clone())
        }
    }

    fn product(id: ProductId, category: &str) -> Product {
        Product {
            id,
            title: format!("Item {}", id),
            price: id as f64,
            description: String::new(),
            category: category.to_string(),
            image: String::new(),
            rating: Rating {
                rate: 4.0,
                count: 1,
            },
        }
    }

    /// 20 products: 10 in "a", 7 in "b", 3 in "c"
    fn twenty_products() -> Vec<Product> {
        (1..=20)
            .map(|id| {
                let category = match id {
                    1..=10 => "a",
                    11..=17 => "b",
                    _ => "c",
                };
                product(id, category)
            })
            .collect()
    }

    async fn ready_controller(products: Vec<Product>) -> CatalogViewController<RecordingNotifier> {
        let mut controller = CatalogViewController::new(RecordingNotifier::default());
        controller.activate(&FakeCatalog::ok(products)).await;
        controller
    }

    fn trigger(controller: &mut CatalogViewController<RecordingNotifier>) -> bool {
        match controller.notifier().watching {
            Some(sentinel) => controller.on_boundary_visible(sentinel),
            None => false,
        }
    }

    #[test]
    fn test_starts_loading() {
        let controller = CatalogViewController::new(RecordingNotifier::default());
        assert!(controller.is_loading());
        assert_eq!(controller.view(), CatalogView::Loading);
    }

    #[tokio::test]
    async fn test_activation_reveals_first_page() {
        let controller = ready_controller(twenty_products()).await;

        assert!(!controller.is_loading());
        assert_eq!(controller.selected_category(), &CategoryFilter::All);
        assert_eq!(controller.categories().len(), 3);
        assert_eq!(controller.reveal_count(), PAGE_SIZE);
        assert_eq!(controller.displayed_products().len(), 8);
        assert!(controller.notifier().watching.is_some());
        assert_eq!(
            controller.view(),
            CatalogView::Ready {
                products: controller.displayed_products(),
                has_more: true,
                total: 20,
            }
        );
    }

    #[tokio::test]
    async fn test_select_category_resets_reveal() {
        let mut controller = ready_controller(twenty_products()).await;
        assert!(trigger(&mut controller));
        assert_eq!(controller.reveal_count(), 16);

        controller.select_category(CategoryFilter::Category("b".to_string()));
        assert_eq!(controller.reveal_count(), 7);
        assert_eq!(controller.displayed_products().len(), 7.min(PAGE_SIZE));
        assert!(controller.displayed_products().iter().all(|p| p.category == "b"));
        assert!(!controller.has_more());
        assert!(controller.notifier().watching.is_none());

        controller.select_category(CategoryFilter::Category("a".to_string()));
        assert_eq!(controller.reveal_count(), 8);
        assert!(controller.has_more());
    }

    #[tokio::test]
    async fn test_reveal_never_exceeds_filtered_len() {
        let mut controller = ready_controller(twenty_products()).await;

        let mut steps = Vec::new();
        for _ in 0..10 {
            trigger(&mut controller);
            steps.push(controller.reveal_count());
            assert!(controller.reveal_count() <= controller.filtered_products().len());
        }

        assert_eq!(&steps[..3], &[16, 20, 20]);
        assert!(!controller.has_more());
        assert!(controller.notifier().watching.is_none());
    }

    #[tokio::test]
    async fn test_repeated_signal_for_same_sentinel_advances_once() {
        let mut controller = ready_controller(twenty_products()).await;
        let sentinel = controller.notifier().watching.unwrap();

        assert!(controller.on_boundary_visible(sentinel));
        assert!(!controller.on_boundary_visible(sentinel));
        assert!(!controller.on_boundary_visible(sentinel));
        assert_eq!(controller.reveal_count(), 16);
    }

    #[tokio::test]
    async fn test_sentinel_from_previous_category_is_ignored() {
        let mut controller = ready_controller(twenty_products()).await;
        let old = controller.notifier().watching.unwrap();

        controller.select_category(CategoryFilter::Category("a".to_string()));
        assert!(!controller.on_boundary_visible(old));
        assert_eq!(controller.reveal_count(), 8);

        assert!(trigger(&mut controller));
        assert_eq!(controller.reveal_count(), 10);
    }

    #[tokio::test]
    async fn test_unknown_category_renders_empty() {
        let mut controller = ready_controller(twenty_products()).await;
        controller.select_category(CategoryFilter::Category("toys".to_string()));

        assert_eq!(controller.view(), CatalogView::Empty);
        assert_eq!(controller.reveal_count(), 0);
        assert!(!trigger(&mut controller));
    }

    #[tokio::test]
    async fn test_select_all_restores_full_list() {
        let mut controller = ready_controller(twenty_products()).await;
        controller.select_category(CategoryFilter::Category("c".to_string()));
        controller.select_category(CategoryFilter::parse("ALL"));

        assert_eq!(controller.filtered_products().len(), 20);
        assert_eq!(controller.reveal_count(), 8);
    }

    #[tokio::test]
    async fn test_small_catalog_has_no_sentinel() {
        let products = (1..=5).map(|id| product(id, "a")).collect();
        let controller = ready_controller(products).await;

        assert_eq!(controller.reveal_count(), 5);
        assert!(!controller.has_more());
        assert!(controller.notifier().observed.is_empty());
    }

    #[tokio::test]
    async fn test_partial_failure_is_total_failure() {
        let mut fake = FakeCatalog::ok(twenty_products());
        fake.fail_categories = true;

        let mut controller = CatalogViewController::new(RecordingNotifier::default());
        controller.activate(&fake).await;

        assert!(!controller.is_loading());
        assert!(controller.all_products().is_empty());
        assert!(controller.categories().is_empty());
        assert_eq!(controller.view(), CatalogView::Empty);
        assert!(controller.last_error().unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_product_failure_reported() {
        let mut fake = FakeCatalog::ok(twenty_products());
        fake.fail_products = true;

        let mut controller = CatalogViewController::new(RecordingNotifier::default());
        controller.activate(&fake).await;
        assert!(controller.all_products().is_empty());
        assert!(controller.last_error().is_some());

        controller.activate(&FakeCatalog::ok(twenty_products())).await;
        assert_eq!(controller.all_products().len(), 20);
        assert!(controller.last_error().is_none());
    }

    #[test]
    fn test_stale_load_is_dropped() {
        let mut controller = CatalogViewController::new(RecordingNotifier::default());
        let first = controller.begin_load();
        let second = controller.begin_load();

        assert!(controller.apply_load(second, Ok((twenty_products(), vec!["a".to_string()]))));
        assert!(!controller.apply_load(first, Ok((Vec::new(), Vec::new()))));
        assert_eq!(controller.all_products().len(), 20);
    }

    #[test]
    fn test_no_paging_while_loading() {
        let mut controller = CatalogViewController::new(RecordingNotifier::default());
        let ticket = controller.begin_load();
        controller.apply_load(ticket, Ok((twenty_products(), Vec::new())));
        let sentinel = controller.notifier().watching.unwrap();

        controller.begin_load();
        assert!(controller.notifier().watching.is_none());
        assert!(!controller.on_boundary_visible(sentinel));
    }

    #[tokio::test]
    async fn test_deactivate_releases_notifier() {
        let mut controller = ready_controller(twenty_products()).await;
        let sentinel = controller.notifier().watching.unwrap();
        let disconnects = controller.notifier().disconnects;

        controller.deactivate();
        assert!(controller.notifier().watching.is_none());
        assert_eq!(controller.notifier().disconnects, disconnects + 1);
        assert!(!controller.on_boundary_visible(sentinel));
    }

    #[test]
    fn test_load_finishing_after_deactivate_is_dropped() {
        let mut controller = CatalogViewController::new(RecordingNotifier::default());
        let ticket = controller.begin_load();
        controller.deactivate();

        let categories = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert!(!controller.apply_load(ticket, Ok((twenty_products(), categories))));
        assert!(controller.notifier().observed.is_empty());
        assert!(controller.notifier().watching.is_none());
        assert!(controller.all_products().is_empty());
    }

    #[tokio::test]
    async fn test_scroll_notifier_fires_once_per_arming() {
        let mut controller = CatalogViewController::new(ScrollNotifier::new());
        controller.activate(&FakeCatalog::ok(twenty_products())).await;

        let sentinel = controller.notifier_mut().scrolled_to_end().unwrap();
        assert!(controller.notifier_mut().scrolled_to_end().is_none());
        assert!(controller.on_boundary_visible(sentinel));

        // Re-armed for the next page
        assert!(controller.notifier().is_armed());
        let sentinel = controller.notifier_mut().scrolled_to_end().unwrap();
        assert!(controller.on_boundary_visible(sentinel));
        assert_eq!(controller.reveal_count(), 20);
        assert!(!controller.notifier().is_armed());
    }

    #[test]
    fn test_category_filter_parse() {
        assert_eq!(CategoryFilter::parse("all"), CategoryFilter::All);
        assert_eq!(CategoryFilter::parse(" All "), CategoryFilter::All);
        assert_eq!(
            CategoryFilter::parse("jewelery"),
            CategoryFilter::Category("jewelery".to_string())
        );
        assert_eq!(CategoryFilter::All.label(), "all");
    }
}
