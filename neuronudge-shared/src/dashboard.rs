/// Dashboard aggregation
///
/// Turns one user's full task set into the dashboard view:
///
/// 1. Counts (`total`, `pending`, `completed`, `overdue`) over the
///    **unfiltered** set
/// 2. Filtering by status, priority and a case-insensitive title search
/// 3. Sorting by priority ascending, then due date ascending with undated
///    tasks last
/// 4. Pagination of the sorted result
///
/// Unknown filter values are ignored and behave like "all".
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use neuronudge_shared::dashboard::{aggregate, DashboardFilter, PageRequest};
///
/// let filter = DashboardFilter::from_params(Some("pending"), Some("1"), Some("rent"));
/// let dashboard = aggregate(Vec::new(), &filter, PageRequest::default(), Utc::now().naive_utc());
///
/// assert_eq!(dashboard.counts.total, 0);
/// assert!(dashboard.tasks.items.is_empty());
/// ```

use std::cmp::Ordering;

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};

use crate::models::task::{Priority, Task};

/// Tasks per dashboard page unless configured otherwise
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Status filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Completed,
    Pending,
}

impl StatusFilter {
    /// Parses a raw query value; anything unrecognized is `All`
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("completed") => StatusFilter::Completed,
            Some("pending") => StatusFilter::Pending,
            _ => StatusFilter::All,
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Completed => task.completed(),
            StatusFilter::Pending => !task.completed(),
        }
    }
}

/// Priority filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriorityFilter {
    #[default]
    All,
    Only(Priority),
}

impl PriorityFilter {
    /// Parses "1", "2" or "3"; anything else is `All`
    pub fn parse(raw: Option<&str>) -> Self {
        raw.and_then(Priority::parse)
            .map(PriorityFilter::Only)
            .unwrap_or_default()
    }

    pub fn matches(&self, task: &Task) -> bool {
        match self {
            PriorityFilter::All => true,
            PriorityFilter::Only(priority) => task.priority == priority.value(),
        }
    }
}

impl Serialize for PriorityFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PriorityFilter::All => serializer.serialize_str("all"),
            PriorityFilter::Only(priority) => serializer.serialize_i32(priority.value()),
        }
    }
}

/// Combined dashboard filters
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DashboardFilter {
    pub status: StatusFilter,
    pub priority: PriorityFilter,

    /// Lowercased, trimmed title search; None when empty
    pub search: Option<String>,
}

impl DashboardFilter {
    /// Builds filters from raw query parameters
    pub fn from_params(status: Option<&str>, priority: Option<&str>, search: Option<&str>) -> Self {
        Self {
            status: StatusFilter::parse(status),
            priority: PriorityFilter::parse(priority),
            search: search
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_lowercase),
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.status.matches(task)
            && self.priority.matches(task)
            && self
                .search
                .as_deref()
                .map_or(true, |needle| task.title.to_lowercase().contains(needle))
    }
}

/// Aggregate counts over a user's whole task set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TaskCounts {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,

    /// Not completed and due before now
    pub overdue: usize,
}

impl TaskCounts {
    pub fn tally<'a, I>(tasks: I, now: NaiveDateTime) -> Self
    where
        I: IntoIterator<Item = &'a Task>,
    {
        tasks.into_iter().fold(Self::default(), |mut counts, task| {
            counts.total += 1;
            if task.completed() {
                counts.completed += 1;
            } else {
                counts.pending += 1;
            }
            if task.is_overdue(now) {
                counts.overdue += 1;
            }
            counts
        })
    }
}

/// Requested page (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    /// Page numbers below 1 become 1; a zero page size becomes 1
    pub fn new(page: Option<u32>, per_page: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.max(1),
        }
    }

    fn offset(&self) -> usize {
        (self.page as usize - 1).saturating_mul(self.per_page as usize)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, DEFAULT_PAGE_SIZE)
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total_items: usize,
    pub total_pages: u32,
    pub has_prev: bool,
    pub has_next: bool,
}

impl<T> Page<T> {
    /// Slices `items` to the requested page; pages past the end are empty
    pub fn paginate(items: Vec<T>, request: PageRequest) -> Self {
        let total_items = items.len();
        let per_page = request.per_page as usize;
        let total_pages = total_items.div_ceil(per_page) as u32;

        let page_items = items
            .into_iter()
            .skip(request.offset())
            .take(per_page)
            .collect();

        Self {
            items: page_items,
            page: request.page,
            per_page: request.per_page,
            total_items,
            total_pages,
            has_prev: request.page > 1,
            has_next: request.page < total_pages,
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total_items: self.total_items,
            total_pages: self.total_pages,
            has_prev: self.has_prev,
            has_next: self.has_next,
        }
    }
}

/// Dashboard result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub tasks: Page<Task>,
    pub counts: TaskCounts,
    pub filter: DashboardFilter,
}

/// Orders by priority ascending, then due date ascending, undated last
pub fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then_with(|| match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

/// Stable sort in dashboard order
pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(compare_tasks);
}

/// Builds the dashboard for one user's tasks
///
/// * `tasks` - every task the user owns
/// * `filter` - status/priority/search filters
/// * `page` - requested page
/// * `now` - current instant as naive UTC, for the overdue count
pub fn aggregate(
    tasks: Vec<Task>,
    filter: &DashboardFilter,
    page: PageRequest,
    now: NaiveDateTime,
) -> Dashboard {
    let counts = TaskCounts::tally(&tasks, now);

    let mut filtered: Vec<Task> = tasks.into_iter().filter(|t| filter.matches(t)).collect();
    sort_tasks(&mut filtered);

    Dashboard {
        tasks: Page::paginate(filtered, page),
        counts,
        filter: filter.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::TaskStatus;
    use chrono::Utc;
    use uuid::Uuid;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn task(title: &str, priority: i32, due: Option<&str>, status: TaskStatus) -> Task {
        Task {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            title: title.to_string(),
            description: None,
            due_date: due.map(at),
            status,
            priority,
            reminder_set: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sample() -> Vec<Task> {
        vec![
            task("Pay rent", 1, Some("2024-06-01 06:59:00"), TaskStatus::NotStarted),
            task("Call dentist", 2, None, TaskStatus::InProgress),
            task("Buy groceries", 3, Some("2024-06-20 06:59:00"), TaskStatus::NotStarted),
            task("File taxes", 1, Some("2024-05-01 06:59:00"), TaskStatus::Completed),
            task("Rent a car", 1, None, TaskStatus::NotStarted),
            task("Water plants", 2, Some("2024-06-15 06:59:00"), TaskStatus::Completed),
        ]
    }

    fn now() -> NaiveDateTime {
        at("2024-06-10 12:00:00")
    }

    fn titles(page: &Page<Task>) -> Vec<&str> {
        page.items.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn test_counts_over_unfiltered_set() {
        let filter = DashboardFilter::from_params(Some("completed"), Some("1"), Some("taxes"));
        let dashboard = aggregate(sample(), &filter, PageRequest::default(), now());

        assert_eq!(
            dashboard.counts,
            TaskCounts {
                total: 6,
                pending: 4,
                completed: 2,
                overdue: 1,
            }
        );
        assert_eq!(titles(&dashboard.tasks), vec!["File taxes"]);
    }

    #[test]
    fn test_total_is_pending_plus_completed() {
        let counts = TaskCounts::tally(&sample(), now());
        assert_eq!(counts.total, counts.pending + counts.completed);
    }

    #[test]
    fn test_completed_task_never_changes_overdue() {
        let mut tasks = sample();
        let before = TaskCounts::tally(&tasks, now()).overdue;

        tasks.push(task("Old done thing", 1, Some("2020-01-01 00:00:00"), TaskStatus::Completed));
        let after = TaskCounts::tally(&tasks, now()).overdue;

        assert_eq!(before, after);
    }

    #[test]
    fn test_sort_priority_then_due_nulls_last() {
        let dashboard = aggregate(sample(), &DashboardFilter::default(), PageRequest::default(), now());

        assert_eq!(
            titles(&dashboard.tasks),
            vec![
                "File taxes",
                "Pay rent",
                "Rent a car",
                "Water plants",
                "Call dentist",
                "Buy groceries",
            ]
        );
    }

    #[test]
    fn test_priority_filter_exact() {
        let filter = DashboardFilter::from_params(None, Some("1"), None);
        let dashboard = aggregate(sample(), &filter, PageRequest::default(), now());

        assert_eq!(dashboard.tasks.items.len(), 3);
        assert!(dashboard.tasks.items.iter().all(|t| t.priority == 1));
    }

    #[test]
    fn test_status_filters() {
        let pending = aggregate(
            sample(),
            &DashboardFilter::from_params(Some("pending"), None, None),
            PageRequest::default(),
            now(),
        );
        assert!(pending.tasks.items.iter().all(|t| !t.completed()));
        assert_eq!(pending.tasks.total_items, 4);

        let completed = aggregate(
            sample(),
            &DashboardFilter::from_params(Some("completed"), None, None),
            PageRequest::default(),
            now(),
        );
        assert!(completed.tasks.items.iter().all(|t| t.completed()));
        assert_eq!(completed.tasks.total_items, 2);
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let filter = DashboardFilter::from_params(None, None, Some("  RENT "));
        let dashboard = aggregate(sample(), &filter, PageRequest::default(), now());

        assert_eq!(titles(&dashboard.tasks), vec!["Pay rent", "Rent a car"]);
    }

    #[test]
    fn test_malformed_filters_are_all() {
        let filter = DashboardFilter::from_params(Some("finished"), Some("urgent"), Some("   "));
        assert_eq!(filter, DashboardFilter::default());

        assert_eq!(PriorityFilter::parse(Some("0")), PriorityFilter::All);
        assert_eq!(PriorityFilter::parse(Some("all")), PriorityFilter::All);
        assert_eq!(StatusFilter::parse(Some("COMPLETED")), StatusFilter::Completed);
    }

    #[test]
    fn test_pagination() {
        let tasks: Vec<Task> = (0..23)
            .map(|i| task(&format!("Task {i}"), 2, None, TaskStatus::NotStarted))
            .collect();

        let first = aggregate(tasks.clone(), &DashboardFilter::default(), PageRequest::new(Some(1), 10), now());
        assert_eq!(first.tasks.items.len(), 10);
        assert_eq!(first.tasks.total_pages, 3);
        assert!(!first.tasks.has_prev);
        assert!(first.tasks.has_next);

        let last = aggregate(tasks.clone(), &DashboardFilter::default(), PageRequest::new(Some(3), 10), now());
        assert_eq!(last.tasks.items.len(), 3);
        assert!(last.tasks.has_prev);
        assert!(!last.tasks.has_next);
        assert_eq!(last.tasks.items[0].title, "Task 20");

        let beyond = aggregate(tasks, &DashboardFilter::default(), PageRequest::new(Some(9), 10), now());
        assert!(beyond.tasks.items.is_empty());
        assert_eq!(beyond.tasks.total_items, 23);
    }

    #[test]
    fn test_page_request_clamps() {
        assert_eq!(PageRequest::new(Some(0), 10).page, 1);
        assert_eq!(PageRequest::new(None, 0).per_page, 1);
        assert_eq!(PageRequest::default().per_page, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_empty_page() {
        let page: Page<Task> = Page::paginate(Vec::new(), PageRequest::default());
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next);
        assert!(!page.has_prev);
    }

    #[test]
    fn test_page_map_keeps_metadata() {
        let page = Page::paginate(vec![1, 2, 3], PageRequest::new(Some(2), 2)).map(|n| n * 10);

        assert_eq!(page.items, vec![30]);
        assert_eq!(page.page, 2);
        assert_eq!(page.total_items, 3);
        assert_eq!(page.total_pages, 2);
    }

    #[test]
    fn test_filter_serialization() {
        let filter = DashboardFilter::from_params(Some("pending"), Some("2"), None);
        let json = serde_json::to_value(&filter).unwrap();

        assert_eq!(json["status"], "pending");
        assert_eq!(json["priority"], 2);
        assert!(json["search"].is_null());

        let json = serde_json::to_value(DashboardFilter::default()).unwrap();
        assert_eq!(json["priority"], "all");
    }
}
