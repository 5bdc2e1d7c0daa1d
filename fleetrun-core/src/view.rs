//! Filter, sort and paginate engine.
//!
//! One engine applied uniformly to runs, approvals and triggers: conjunctive
//! predicates (free-text substring over a fixed set of searchable fields,
//! plus an optional categorical equality filter), a sort key, and a clamped
//! page window. Pure functions over borrowed slices; the caller owns the
//! collections.

use std::collections::HashSet;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

/// Filter and window parameters for one table view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    /// Case-insensitive substring matched against every searchable field.
    pub search: String,
    /// Optional categorical equality filter (status, event type).
    pub category: Option<String>,
    pub direction: SortDirection,
    /// 1-based page index.
    pub page: usize,
    pub page_size: usize,
}

impl Default for TableQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            category: None,
            direction: SortDirection::Descending,
            page: 1,
            page_size: 25,
        }
    }
}

/// How a collection element exposes itself to the engine.
pub trait Viewable {
    /// Stable entity id, used for selection keying.
    fn entity_id(&self) -> i64;
    /// Fields matched by the free-text filter.
    fn searchable_fields(&self) -> Vec<String>;
    /// Value compared against the categorical filter, if the entity has one.
    fn category_value(&self) -> Option<String> {
        None
    }
    /// Sort key. Larger sorts later in ascending order.
    fn sort_key(&self) -> i64;
}

impl Viewable for crate::models::Run {
    fn entity_id(&self) -> i64 {
        self.id
    }
    fn searchable_fields(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.playbook_id.to_string(),
            self.triggered_by.clone(),
        ]
    }
    fn category_value(&self) -> Option<String> {
        Some(self.effective_status().to_string())
    }
    fn sort_key(&self) -> i64 {
        self.created_at.timestamp()
    }
}

impl Viewable for crate::models::Approval {
    fn entity_id(&self) -> i64 {
        self.id
    }
    fn searchable_fields(&self) -> Vec<String> {
        let mut fields = vec![self.id.to_string(), self.run_id.to_string()];
        if let Some(reason) = &self.reason {
            fields.push(reason.clone());
        }
        fields
    }
    fn category_value(&self) -> Option<String> {
        Some(self.status.to_string())
    }
    fn sort_key(&self) -> i64 {
        self.created_at.timestamp()
    }
}

impl Viewable for crate::models::Trigger {
    fn entity_id(&self) -> i64 {
        self.id
    }
    fn searchable_fields(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.playbook_id.to_string(),
            self.event.to_string(),
        ]
    }
    fn category_value(&self) -> Option<String> {
        Some(self.event.to_string())
    }
    fn sort_key(&self) -> i64 {
        self.created_at.timestamp()
    }
}

/// One materialized page plus the paging facts the toolbar needs.
#[derive(Debug, Clone)]
pub struct ViewPage<T> {
    pub page_items: Vec<T>,
    pub total_pages: usize,
    /// The (possibly clamped) page actually shown.
    pub page: usize,
    /// Item count after filtering, before paging.
    pub filtered_count: usize,
}

/// Apply filters, sort and the page window to a collection.
///
/// `total_pages` is never zero; a query pointing past the last page is
/// clamped down rather than returning an empty slice.
pub fn view<T: Viewable + Clone>(items: &[T], query: &TableQuery) -> ViewPage<T> {
    let needle = query.search.trim().to_lowercase();

    let mut filtered: Vec<T> = items
        .iter()
        .filter(|item| {
            let text_match = needle.is_empty()
                || item
                    .searchable_fields()
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle));
            let category_match = match &query.category {
                None => true,
                Some(wanted) => item.category_value().as_deref() == Some(wanted.as_str()),
            };
            text_match && category_match
        })
        .cloned()
        .collect();

    match query.direction {
        SortDirection::Ascending => filtered.sort_by_key(|item| item.sort_key()),
        SortDirection::Descending => filtered.sort_by_key(|item| std::cmp::Reverse(item.sort_key())),
    }

    let page_size = query.page_size.max(1);
    let filtered_count = filtered.len();
    let total_pages = total_pages(filtered_count, page_size);
    let page = query.page.clamp(1, total_pages);

    let start = (page - 1) * page_size;
    let page_items: Vec<T> = filtered.into_iter().skip(start).take(page_size).collect();

    ViewPage {
        page_items,
        total_pages,
        page,
        filtered_count,
    }
}

/// `max(1, ceil(count / page_size))`.
pub fn total_pages(count: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    count.div_ceil(page_size).max(1)
}

/// Checkbox state for bulk operations, keyed by entity id.
///
/// Stale cross-page selections are a correctness bug: the set is invalidated
/// whenever the filter, page size or underlying collection size changes.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    ids: HashSet<i64>,
    /// Fingerprint of the view the selection was made under.
    fingerprint: Option<(String, Option<String>, usize, usize)>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle one id, recording the view fingerprint. A fingerprint change
    /// clears the previous selection first.
    pub fn toggle(&mut self, id: i64, query: &TableQuery, collection_len: usize) {
        self.revalidate(query, collection_len);
        if !self.ids.insert(id) {
            self.ids.remove(&id);
        }
    }

    /// Drop the selection if the view it was made under no longer exists.
    pub fn revalidate(&mut self, query: &TableQuery, collection_len: usize) {
        let current = (
            query.search.clone(),
            query.category.clone(),
            query.page_size,
            collection_len,
        );
        if self.fingerprint.as_ref() != Some(&current) {
            self.ids.clear();
            self.fingerprint = Some(current);
        }
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    pub fn ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.ids.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.fingerprint = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Row {
        id: i64,
        name: String,
        status: String,
    }

    impl Viewable for Row {
        fn entity_id(&self) -> i64 {
            self.id
        }
        fn searchable_fields(&self) -> Vec<String> {
            vec![self.name.clone(), self.id.to_string()]
        }
        fn category_value(&self) -> Option<String> {
            Some(self.status.clone())
        }
        fn sort_key(&self) -> i64 {
            self.id
        }
    }

    fn rows(n: usize) -> Vec<Row> {
        (1..=n as i64)
            .map(|id| Row {
                id,
                name: format!("deploy-{id}"),
                status: if id % 2 == 0 { "success" } else { "failed" }.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_pagination_boundary_47_items_25_per_page() {
        let items = rows(47);
        let query = TableQuery {
            page_size: 25,
            ..TableQuery::default()
        };
        let page = view(&items, &query);
        assert_eq!(page.total_pages, 2);

        // Pointing past the end clamps down, never empties.
        let query = TableQuery {
            page: 5,
            page_size: 25,
            ..TableQuery::default()
        };
        let page = view(&items, &query);
        assert_eq!(page.page, 2);
        assert_eq!(page.page_items.len(), 22);
    }

    #[test]
    fn test_total_pages_never_zero() {
        assert_eq!(total_pages(0, 25), 1);
        assert_eq!(total_pages(25, 25), 1);
        assert_eq!(total_pages(26, 25), 2);
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let items = rows(10);
        let query = TableQuery {
            search: "DEPLOY-1".to_string(),
            ..TableQuery::default()
        };
        let page = view(&items, &query);
        // deploy-1 and deploy-10
        assert_eq!(page.filtered_count, 2);
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let items = rows(10);
        let query = TableQuery {
            search: "deploy-1".to_string(),
            category: Some("success".to_string()),
            ..TableQuery::default()
        };
        let page = view(&items, &query);
        // Of deploy-1 and deploy-10, only the even id has status success.
        assert_eq!(page.filtered_count, 1);
        assert_eq!(page.page_items[0].id, 10);
    }

    #[test]
    fn test_sort_directions() {
        let items = rows(5);
        let asc = view(
            &items,
            &TableQuery {
                direction: SortDirection::Ascending,
                ..TableQuery::default()
            },
        );
        assert_eq!(asc.page_items.first().unwrap().id, 1);

        let desc = view(&items, &TableQuery::default());
        assert_eq!(desc.page_items.first().unwrap().id, 5);
    }

    #[test]
    fn test_selection_survives_unchanged_view() {
        let query = TableQuery::default();
        let mut selection = Selection::new();
        selection.toggle(3, &query, 47);
        selection.toggle(9, &query, 47);
        assert_eq!(selection.len(), 2);
        assert!(selection.contains(3));

        selection.toggle(3, &query, 47);
        assert!(!selection.contains(3));
    }

    #[test]
    fn test_selection_cleared_on_filter_change() {
        let query = TableQuery::default();
        let mut selection = Selection::new();
        selection.toggle(3, &query, 47);

        let changed = TableQuery {
            search: "web".to_string(),
            ..TableQuery::default()
        };
        selection.revalidate(&changed, 47);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_selection_cleared_on_collection_size_change() {
        let query = TableQuery::default();
        let mut selection = Selection::new();
        selection.toggle(3, &query, 47);

        selection.revalidate(&query, 48);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_selection_cleared_on_page_size_change() {
        let query = TableQuery::default();
        let mut selection = Selection::new();
        selection.toggle(3, &query, 47);

        let resized = TableQuery {
            page_size: 50,
            ..TableQuery::default()
        };
        selection.revalidate(&resized, 47);
        assert!(selection.is_empty());
    }
}
