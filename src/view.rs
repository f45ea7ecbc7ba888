use std::cmp::Ordering;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use derive_setters::Setters;
use tracing::{debug, trace};

use crate::record::{FieldValue, Record};

pub const DEFAULT_PAGE_SIZE: usize = 25;

pub type Extractor = Arc<dyn Fn(&Record) -> FieldValue + Send + Sync>;
pub type Renderer = Arc<dyn Fn(&Record) -> String + Send + Sync>;

/// How one facet of a record is displayed, searched and sorted.
///
/// Screens describe their tables with plain arrays of these; there is no
/// per-screen table code. The optional extractor replaces direct field
/// access whenever the displayed value is itself derived.
#[derive(Clone, Setters)]
#[setters(into)]
pub struct ColumnSpec {
    #[setters(skip)]
    pub key: String,
    pub label: String,
    #[setters(skip)]
    pub extract: Option<Extractor>,
    #[setters(skip)]
    pub render: Option<Renderer>,
    pub sortable: bool,
    pub searchable: bool,
}

impl ColumnSpec {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        ColumnSpec {
            label: key.clone(),
            key,
            extract: None,
            render: None,
            sortable: true,
            searchable: true,
        }
    }

    /// Derived value used for search and sort in place of the raw field.
    pub fn extract(mut self, f: impl Fn(&Record) -> FieldValue + Send + Sync + 'static) -> Self {
        self.extract = Some(Arc::new(f));
        self
    }

    /// Custom cell renderer. Display only, search/sort are unaffected.
    pub fn render(mut self, f: impl Fn(&Record) -> String + Send + Sync + 'static) -> Self {
        self.render = Some(Arc::new(f));
        self
    }

    /// The value search and sort operate on: extractor first, raw field
    /// otherwise. Absent fields come back as Null.
    pub fn effective_value(&self, record: &Record) -> FieldValue {
        match &self.extract {
            Some(f) => f(record),
            None => record.value(&self.key),
        }
    }

    pub fn render_cell(&self, record: &Record) -> String {
        match &self.render {
            Some(f) => f(record),
            None => self.effective_value(record).to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
}

/// A named single-select narrowing criterion with enumerated options.
/// No selection (the "all" sentinel) leaves the filter inert.
#[derive(Clone, Debug)]
pub struct FilterSpec {
    pub key: String,
    pub label: String,
    pub options: Vec<FilterOption>,
}

impl FilterSpec {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        FilterSpec {
            key: key.into(),
            label: label.into(),
            options: Vec::new(),
        }
    }

    pub fn option(mut self, value: impl Into<String>, label: impl Into<String>) -> Self {
        self.options.push(FilterOption {
            value: value.into(),
            label: label.into(),
        });
        self
    }

    fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|o| o.value == value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SortState {
    pub key: Option<String>,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        SortState {
            key: None,
            direction: SortDirection::Ascending,
        }
    }
}

/// The only mutable state the view engine owns. Session local, created
/// with defaults on mount, never persisted.
#[derive(Clone, Debug)]
pub struct ViewState {
    pub search_text: String,
    pub filter_values: HashMap<String, String>,
    pub sort: SortState,
    /// Requested page. The rendered page is the clamped value in PageInfo.
    pub page: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            search_text: String::new(),
            filter_values: HashMap::new(),
            sort: SortState::default(),
            page: 1,
        }
    }
}

/// Page metadata for the current slice, 1-based inclusive row numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageInfo {
    pub page: usize,
    pub total_pages: usize,
    pub first_row: usize,
    pub last_row: usize,
    pub total_rows: usize,
}

impl PageInfo {
    fn empty() -> Self {
        PageInfo {
            page: 1,
            total_pages: 1,
            first_row: 0,
            last_row: 0,
            total_rows: 0,
        }
    }

    /// Human readable row range, e.g. "Showing 51-53 of 53".
    pub fn caption(&self) -> String {
        format!(
            "Showing {}-{} of {}",
            self.first_row, self.last_row, self.total_rows
        )
    }
}

// ------------------------- pipeline stages ---------------------------- //
//
// Each stage is a pure function over an index mask, the same row mapping
// idiom the rest of the app uses: positions into the record collection,
// never the records themselves.

fn search_stage(
    records: &[Record],
    columns: &[ColumnSpec],
    query: &str,
    mask: Vec<usize>,
) -> Vec<usize> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return mask;
    }
    mask.into_iter()
        .filter(|&ridx| {
            columns.iter().filter(|c| c.searchable).any(|column| {
                column
                    .effective_value(&records[ridx])
                    .text()
                    .map(|t| t.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
        })
        .collect()
}

fn filter_stage(
    records: &[Record],
    filters: &[FilterSpec],
    values: &HashMap<String, String>,
    mask: Vec<usize>,
) -> Vec<usize> {
    // Active = a selection exists and names a known option. A value not
    // present in the options is treated like the "all" sentinel.
    let active: Vec<(&str, &str)> = filters
        .iter()
        .filter_map(|f| {
            values
                .get(&f.key)
                .filter(|v| f.has_option(v))
                .map(|v| (f.key.as_str(), v.as_str()))
        })
        .collect();
    if active.is_empty() {
        return mask;
    }
    mask.into_iter()
        .filter(|&ridx| {
            active.iter().all(|(key, wanted)| {
                records[ridx]
                    .value(key)
                    .text()
                    .map(|t| t == *wanted)
                    .unwrap_or(false)
            })
        })
        .collect()
}

fn sort_stage(
    records: &[Record],
    columns: &[ColumnSpec],
    sort: &SortState,
    mask: Vec<usize>,
) -> Vec<usize> {
    let Some(key) = &sort.key else {
        return mask; // natural order
    };
    let Some(column) = columns.iter().find(|c| &c.key == key && c.sortable) else {
        debug!("Ignoring sort on unknown or unsortable column {key}");
        return mask;
    };

    let mut keyed: Vec<(usize, FieldValue)> = mask
        .into_iter()
        .map(|ridx| (ridx, column.effective_value(&records[ridx])))
        .collect();
    // Stable sort keeps equal keys in filtered order.
    keyed.sort_by(|(_, a), (_, b)| compare_values(a, b, sort.direction));
    keyed.into_iter().map(|(ridx, _)| ridx).collect()
}

// Nulls sort last in both directions; direction only reverses the
// comparison of two defined values.
fn compare_values(a: &FieldValue, b: &FieldValue, direction: SortDirection) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ord = match (a.number(), b.number()) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                _ => {
                    let at = a.text().unwrap_or_default().to_lowercase();
                    let bt = b.text().unwrap_or_default().to_lowercase();
                    at.cmp(&bt)
                }
            };
            match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        }
    }
}

fn paginate(total: usize, page_size: usize, requested: usize) -> (Range<usize>, PageInfo) {
    let page_size = page_size.max(1);
    let total_pages = std::cmp::max(1, total.div_ceil(page_size));
    let page = requested.clamp(1, total_pages);
    let start = (page - 1) * page_size;
    let end = std::cmp::min(start + page_size, total);
    let (first_row, last_row) = if total == 0 { (0, 0) } else { (start + 1, end) };
    (
        start..end,
        PageInfo {
            page,
            total_pages,
            first_row,
            last_row,
            total_rows: total,
        },
    )
}

/// The tabular view engine. One instance per open table; instances are
/// fully independent.
///
/// Holds the record collection the data layer already fetched, the column
/// and filter specification of the host screen, and the session-local
/// ViewState. Every state transition replaces part of the ViewState and
/// eagerly recomputes the derived pipeline
/// `search -> filter -> sort -> paginate`.
pub struct TableView {
    records: Vec<Record>,
    columns: Vec<ColumnSpec>,
    filters: Vec<FilterSpec>,
    page_size: usize,
    state: ViewState,
    // Derived, recomputed on every transition.
    filtered_count: usize,
    visible: Vec<usize>,
    page_info: PageInfo,
}

impl TableView {
    pub fn new(columns: Vec<ColumnSpec>, filters: Vec<FilterSpec>, page_size: usize) -> Self {
        let mut view = TableView {
            records: Vec::new(),
            columns,
            filters,
            page_size: page_size.max(1),
            state: ViewState::default(),
            filtered_count: 0,
            visible: Vec::new(),
            page_info: PageInfo::empty(),
        };
        view.refresh();
        view
    }

    /// Replace the record collection after a data refresh. The ViewState
    /// is deliberately kept so the operator does not lose their place;
    /// only the page is re-clamped. Hosts wanting a clean slate call
    /// [`TableView::reset_view`]. A missing collection is an empty table,
    /// not an error.
    pub fn replace_records(&mut self, records: Option<Vec<Record>>) {
        self.records = records.unwrap_or_default();
        self.refresh();
    }

    // ------------------------ control surface ------------------------- //

    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.state.search_text = text.into();
        self.state.page = 1;
        self.refresh();
    }

    /// Select one filter value, or None for the "all" sentinel.
    pub fn set_filter_value(&mut self, key: &str, value: Option<&str>) {
        match value {
            Some(v) => {
                self.state.filter_values.insert(key.to_string(), v.to_string());
            }
            None => {
                self.state.filter_values.remove(key);
            }
        }
        self.state.page = 1;
        self.refresh();
    }

    /// Reselecting the current sort key flips the direction; a new key
    /// resets it to ascending. The page is only re-clamped, not reset.
    pub fn request_sort(&mut self, key: &str) {
        if self.state.sort.key.as_deref() == Some(key) {
            self.state.sort.direction = match self.state.sort.direction {
                SortDirection::Ascending => SortDirection::Descending,
                SortDirection::Descending => SortDirection::Ascending,
            };
        } else {
            self.state.sort = SortState {
                key: Some(key.to_string()),
                direction: SortDirection::Ascending,
            };
        }
        self.refresh();
    }

    /// Store the requested page as-is; the rendered page is the clamped
    /// value, so out-of-range requests degrade gracefully.
    pub fn set_page(&mut self, page: usize) {
        self.state.page = page.max(1);
        self.refresh();
    }

    pub fn reset_view(&mut self) {
        self.state = ViewState::default();
        self.refresh();
    }

    // ------------------------- derived output ------------------------- //

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn filters(&self) -> &[FilterSpec] {
        &self.filters
    }

    pub fn active_filter_value(&self, key: &str) -> Option<&str> {
        self.state.filter_values.get(key).map(|s| s.as_str())
    }

    /// Row count after search and filters, before pagination. Hosts use
    /// this for their "N items" captions.
    pub fn filtered_count(&self) -> usize {
        self.filtered_count
    }

    pub fn page_info(&self) -> PageInfo {
        self.page_info
    }

    /// Records of the current page, in display order.
    pub fn visible_records(&self) -> impl Iterator<Item = &Record> {
        self.visible.iter().map(|&ridx| &self.records[ridx])
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn visible_record(&self, row: usize) -> Option<&Record> {
        self.visible.get(row).map(|&ridx| &self.records[ridx])
    }

    fn refresh(&mut self) {
        let mask: Vec<usize> = (0..self.records.len()).collect();
        let mask = search_stage(&self.records, &self.columns, &self.state.search_text, mask);
        let mask = filter_stage(&self.records, &self.filters, &self.state.filter_values, mask);
        let mask = sort_stage(&self.records, &self.columns, &self.state.sort, mask);
        self.filtered_count = mask.len();
        let (range, info) = paginate(mask.len(), self.page_size, self.state.page);
        self.visible = mask[range].to_vec();
        self.page_info = info;
        trace!(
            "View refreshed: {} of {} records, page {}/{}",
            self.filtered_count,
            self.records.len(),
            info.page,
            info.total_pages
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn property(id: i64, name: &str, status: &str, rate: Option<f64>) -> Record {
        let r = Record::new()
            .with("id", id)
            .with("name", name)
            .with("status", status);
        match rate {
            Some(rate) => r.with("nightly_rate", rate),
            None => r,
        }
    }

    fn columns() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::new("name").label("Name"),
            ColumnSpec::new("status").label("Status"),
            ColumnSpec::new("nightly_rate").label("Rate"),
        ]
    }

    fn status_filter() -> FilterSpec {
        FilterSpec::new("status", "Status")
            .option("active", "Active")
            .option("draft", "Draft")
    }

    fn sample_view() -> TableView {
        let mut view = TableView::new(columns(), vec![status_filter()], 25);
        view.replace_records(Some(vec![
            property(1, "Casa Azul", "active", Some(120.0)),
            property(2, "Harbor Loft", "draft", Some(95.0)),
            property(3, "Sunset Villa", "active", None),
            property(4, "casa verde", "draft", Some(120.0)),
        ]));
        view
    }

    fn visible_names(view: &TableView) -> Vec<String> {
        view.visible_records()
            .map(|r| r.value("name").to_string())
            .collect()
    }

    #[test]
    fn missing_collection_is_an_empty_table() {
        let mut view = TableView::new(columns(), vec![], 25);
        view.replace_records(None);
        assert_eq!(view.filtered_count(), 0);
        assert_eq!(view.page_info().caption(), "Showing 0-0 of 0");
        assert_eq!(view.page_info().total_pages, 1);
    }

    #[test]
    fn search_is_case_insensitive_substring_over_all_columns() {
        let mut view = sample_view();
        view.set_search_text("CASA");
        assert_eq!(visible_names(&view), vec!["Casa Azul", "casa verde"]);
        // matches through any column, not just name
        view.set_search_text("draft");
        assert_eq!(view.filtered_count(), 2);
    }

    #[test]
    fn blank_search_is_a_noop() {
        let mut view = sample_view();
        view.set_search_text("   ");
        assert_eq!(view.filtered_count(), 4);
    }

    #[test]
    fn null_fields_never_match_search() {
        let mut view = sample_view();
        // Sunset Villa has no nightly_rate; searching for a rate value
        // must neither match it nor panic.
        view.set_search_text("120");
        assert_eq!(visible_names(&view), vec!["Casa Azul", "casa verde"]);
    }

    #[test]
    fn non_searchable_columns_are_skipped() {
        let cols = vec![
            ColumnSpec::new("name").label("Name"),
            ColumnSpec::new("status").label("Status").searchable(false),
        ];
        let mut view = TableView::new(cols, vec![], 25);
        view.replace_records(Some(vec![property(1, "Casa", "active", None)]));
        view.set_search_text("active");
        assert_eq!(view.filtered_count(), 0);
    }

    #[test]
    fn search_uses_extractor_over_raw_field() {
        let cols = vec![
            ColumnSpec::new("status")
                .label("Status")
                .extract(|r| match r.value("status").text().as_deref() {
                    Some("active") => FieldValue::from("Live"),
                    other => other.map(FieldValue::from).unwrap_or(FieldValue::Null),
                }),
        ];
        let mut view = TableView::new(cols, vec![], 25);
        view.replace_records(Some(vec![property(1, "Casa", "active", None)]));
        view.set_search_text("live");
        assert_eq!(view.filtered_count(), 1);
        view.set_search_text("active");
        assert_eq!(view.filtered_count(), 0);
    }

    #[test]
    fn filters_compose_with_logical_and() {
        let filters = vec![
            status_filter(),
            FilterSpec::new("nightly_rate", "Rate").option("120", "120"),
        ];
        let mut view = TableView::new(columns(), filters, 25);
        view.replace_records(Some(vec![
            property(1, "Casa Azul", "active", Some(120.0)),
            property(2, "Harbor Loft", "draft", Some(120.0)),
            property(3, "Sunset Villa", "active", Some(80.0)),
        ]));
        view.set_filter_value("status", Some("active"));
        view.set_filter_value("nightly_rate", Some("120"));
        assert_eq!(visible_names(&view), vec!["Casa Azul"]);
    }

    #[test]
    fn clearing_a_filter_restores_the_sentinel() {
        let mut view = sample_view();
        view.set_filter_value("status", Some("draft"));
        assert_eq!(view.filtered_count(), 2);
        view.set_filter_value("status", None);
        assert_eq!(view.filtered_count(), 4);
    }

    #[test]
    fn unknown_filter_value_is_inert() {
        let mut view = sample_view();
        view.set_filter_value("status", Some("no-such-status"));
        assert_eq!(view.filtered_count(), 4);
    }

    #[test]
    fn sort_is_numeric_for_numbers_and_nulls_go_last() {
        let cols = vec![ColumnSpec::new("nightly_rate").label("Rate")];
        let mut view = TableView::new(cols, vec![], 25);
        view.replace_records(Some(vec![
            property(1, "a", "x", None),
            property(2, "b", "x", Some(3.0)),
            property(3, "c", "x", Some(1.0)),
            property(4, "d", "x", None),
            property(5, "e", "x", Some(2.0)),
        ]));
        view.request_sort("nightly_rate");
        assert_eq!(visible_names(&view), vec!["c", "e", "b", "a", "d"]);
        // descending reverses the defined values only; the two nulls keep
        // their original relative order and stay last
        view.request_sort("nightly_rate");
        assert_eq!(visible_names(&view), vec!["b", "e", "c", "a", "d"]);
    }

    #[test]
    fn numeric_sort_beats_lexicographic() {
        let cols = vec![ColumnSpec::new("nightly_rate").label("Rate")];
        let mut view = TableView::new(cols, vec![], 25);
        view.replace_records(Some(vec![
            property(1, "a", "x", Some(10.0)),
            property(2, "b", "x", Some(9.0)),
        ]));
        view.request_sort("nightly_rate");
        assert_eq!(visible_names(&view), vec!["b", "a"]);
    }

    #[test]
    fn text_sort_ignores_case() {
        let mut view = sample_view();
        view.request_sort("name");
        assert_eq!(
            visible_names(&view),
            vec!["Casa Azul", "casa verde", "Harbor Loft", "Sunset Villa"]
        );
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let cols = vec![ColumnSpec::new("status").label("Status")];
        let mut view = TableView::new(cols, vec![], 25);
        view.replace_records(Some(vec![
            property(1, "first", "draft", None),
            property(2, "second", "active", None),
            property(3, "third", "draft", None),
        ]));
        view.request_sort("status");
        assert_eq!(visible_names(&view), vec!["second", "first", "third"]);
    }

    #[test]
    fn selecting_a_new_sort_key_resets_direction() {
        let mut view = sample_view();
        view.request_sort("name");
        view.request_sort("name");
        assert_eq!(view.state().sort.direction, SortDirection::Descending);
        view.request_sort("status");
        assert_eq!(view.state().sort.key.as_deref(), Some("status"));
        assert_eq!(view.state().sort.direction, SortDirection::Ascending);
    }

    #[test]
    fn unsortable_columns_keep_natural_order() {
        let cols = vec![ColumnSpec::new("name").label("Name").sortable(false)];
        let mut view = TableView::new(cols, vec![], 25);
        view.replace_records(Some(vec![
            property(1, "b", "x", None),
            property(2, "a", "x", None),
        ]));
        view.request_sort("name");
        assert_eq!(visible_names(&view), vec!["b", "a"]);
    }

    #[test]
    fn pagination_clamps_out_of_range_requests() {
        let mut view = TableView::new(vec![ColumnSpec::new("name")], vec![], 25);
        let records: Vec<Record> = (0..53)
            .map(|i| property(i, &format!("p{i:02}"), "active", None))
            .collect();
        view.replace_records(Some(records));
        view.set_page(10);
        let info = view.page_info();
        assert_eq!(info.total_pages, 3);
        assert_eq!(info.page, 3);
        assert_eq!(info.caption(), "Showing 51-53 of 53");
        assert_eq!(view.visible_len(), 3);
        // same rows as an in-range request for the last page
        let clamped = visible_names(&view);
        view.set_page(3);
        assert_eq!(visible_names(&view), clamped);
    }

    #[test]
    fn search_and_filter_reset_the_page() {
        let mut view = TableView::new(columns(), vec![status_filter()], 1);
        view.replace_records(Some(vec![
            property(1, "a", "active", None),
            property(2, "b", "active", None),
            property(3, "c", "active", None),
        ]));
        view.set_page(3);
        assert_eq!(view.page_info().page, 3);
        view.set_search_text("");
        assert_eq!(view.page_info().page, 1);
        view.set_page(3);
        view.set_filter_value("status", Some("active"));
        assert_eq!(view.page_info().page, 1);
    }

    #[test]
    fn sort_keeps_the_page_but_reclamps_it() {
        let mut view = TableView::new(columns(), vec![status_filter()], 2);
        view.replace_records(Some(vec![
            property(1, "a", "active", None),
            property(2, "b", "active", None),
            property(3, "c", "active", None),
            property(4, "d", "draft", None),
        ]));
        view.set_page(2);
        view.request_sort("name");
        assert_eq!(view.page_info().page, 2);
        // shrink the result set below page 2, then sort again
        view.set_filter_value("status", Some("draft"));
        view.set_page(2);
        view.request_sort("name");
        assert_eq!(view.page_info().page, 1);
    }

    #[test]
    fn pipeline_is_idempotent() {
        let mut view = sample_view();
        view.set_search_text("casa");
        view.request_sort("name");
        let first = visible_names(&view);
        let info = view.page_info();
        view.replace_records(Some(vec![
            property(1, "Casa Azul", "active", Some(120.0)),
            property(2, "Harbor Loft", "draft", Some(95.0)),
            property(3, "Sunset Villa", "active", None),
            property(4, "casa verde", "draft", Some(120.0)),
        ]));
        assert_eq!(visible_names(&view), first);
        assert_eq!(view.page_info(), info);
    }

    #[test]
    fn data_refresh_keeps_the_view_state() {
        let mut view = sample_view();
        view.set_search_text("casa");
        view.replace_records(Some(vec![property(9, "Casa Nova", "active", None)]));
        assert_eq!(view.state().search_text, "casa");
        assert_eq!(visible_names(&view), vec!["Casa Nova"]);
        view.reset_view();
        assert_eq!(view.state().search_text, "");
    }

    #[test]
    fn renderer_changes_display_only() {
        let cols = vec![
            ColumnSpec::new("nightly_rate")
                .label("Rate")
                .render(|r| match r.value("nightly_rate").number() {
                    Some(n) => format!("${n:.0} / night"),
                    None => "-".to_string(),
                }),
        ];
        let mut view = TableView::new(cols, vec![], 25);
        view.replace_records(Some(vec![property(1, "Casa", "active", Some(120.0))]));
        let record = view.visible_record(0).unwrap();
        assert_eq!(view.columns()[0].render_cell(record), "$120 / night");
        // search still sees the effective value, not the rendered text
        view.set_search_text("night");
        assert_eq!(view.filtered_count(), 0);
    }
}
