//! Standard incremental pagination inside a container: numbered pages with
//! a truncated link window, or continuation cursors.

use std::{iter, sync::Arc};

use parking_lot::Mutex;
use shared::protocol::PageResponse;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, warn};

use crate::{
    controller::{RequestSequence, Ticket},
    error::FetchError,
    render::{error_fragment, PageLink, PagerControls, PagerView, RenderTarget},
    transport::{RawResponse, Request, Transport},
};

pub const DEFAULT_PAGE_SIZE: u32 = 15;
pub const DEFAULT_WINDOW_DISTANCE: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    Number(u32),
    /// `None` requests the first page.
    Token(Option<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub cursor: PageCursor,
    pub page_size: u32,
    pub filters: Vec<(String, String)>,
}

impl PageRequest {
    /// `page` or `cursor`, followed by the filters.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let position = match &self.cursor {
            PageCursor::Number(page) => Some(("page".to_string(), page.to_string())),
            PageCursor::Token(Some(token)) => Some(("cursor".to_string(), token.clone())),
            PageCursor::Token(None) => None,
        };
        position
            .into_iter()
            .chain(self.filters.iter().cloned())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMode {
    Numbered { initial_page: u32 },
    Cursor,
}

impl Default for PageMode {
    fn default() -> Self {
        PageMode::Numbered { initial_page: 1 }
    }
}

pub type RequestBuilder = Arc<dyn Fn(&PageRequest) -> Request + Send + Sync>;
/// Runs after every render; must tolerate running on the same container
/// any number of times.
pub type PostRenderHook = Arc<dyn Fn(&dyn RenderTarget) + Send + Sync>;

pub struct PaginationOptions {
    pub page_size: u32,
    pub mode: PageMode,
    pub window_distance: u32,
    pub filters: Vec<(String, String)>,
    pub request_builder: RequestBuilder,
    pub post_render: Option<PostRenderHook>,
}

impl PaginationOptions {
    pub fn new(request_builder: impl Fn(&PageRequest) -> Request + Send + Sync + 'static) -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            mode: PageMode::default(),
            window_distance: DEFAULT_WINDOW_DISTANCE,
            filters: Vec::new(),
            request_builder: Arc::new(request_builder),
            post_render: None,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_mode(mut self, mode: PageMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_window_distance(mut self, distance: u32) -> Self {
        self.window_distance = distance;
        self
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((key.into(), value.into()));
        self
    }

    pub fn with_post_render(
        mut self,
        hook: impl Fn(&dyn RenderTarget) + Send + Sync + 'static,
    ) -> Self {
        self.post_render = Some(Arc::new(hook));
        self
    }
}

/// Where paginated items and their navigation controls are rendered.
#[derive(Clone)]
pub struct PageContainer {
    pub items: Arc<dyn RenderTarget>,
    pub pager: Arc<dyn PagerView>,
}

/// Links shown for `current` of `total` pages: the first and last page, every
/// page within `distance` of the current one, and an ellipsis for each gap.
pub fn page_window(current: u32, total: u32, distance: u32) -> Vec<PageLink> {
    if total == 0 {
        return Vec::new();
    }
    let low = current.saturating_sub(distance).max(1);
    let high = current.saturating_add(distance).min(total);

    let mut links = Vec::new();
    let mut last = 0;
    for page in iter::once(1).chain(low..=high).chain(iter::once(total)) {
        if page <= last {
            continue;
        }
        if page > last + 1 {
            links.push(PageLink::Ellipsis);
        }
        links.push(PageLink::Page {
            number: page,
            current: page == current,
        });
        last = page;
    }
    links
}

#[derive(Debug, Default)]
struct Position {
    page: u32,
    num_pages: Option<u32>,
    /// Cursor mode: cursors of the visited pages, the current one last.
    cursors: Vec<Option<String>>,
    next_cursor: Option<String>,
    has_more: bool,
}

struct PagerInner {
    sequence: RequestSequence,
    task: Option<JoinHandle<()>>,
    position: Position,
    /// Cursor stack to adopt once the pending cursor request succeeds.
    pending_cursors: Option<Vec<Option<String>>>,
    mounted: bool,
}

struct PagerShared {
    transport: Arc<dyn Transport>,
    container: PageContainer,
    options: PaginationOptions,
    inner: Mutex<PagerInner>,
    loading: watch::Sender<bool>,
}

pub struct Pagination {
    shared: Arc<PagerShared>,
}

impl Pagination {
    /// Mounts pagination on `container` and issues the initial page request.
    /// Must be called from within a tokio runtime.
    pub fn configure(
        container: PageContainer,
        transport: Arc<dyn Transport>,
        options: PaginationOptions,
    ) -> Self {
        let (loading, _) = watch::channel(false);
        let (initial, cursors) = match options.mode {
            PageMode::Numbered { initial_page } => (PageCursor::Number(initial_page.max(1)), None),
            PageMode::Cursor => (PageCursor::Token(None), Some(vec![None])),
        };
        let shared = Arc::new(PagerShared {
            transport,
            container,
            options,
            inner: Mutex::new(PagerInner {
                sequence: RequestSequence::default(),
                task: None,
                position: Position::default(),
                pending_cursors: None,
                mounted: true,
            }),
            loading,
        });

        {
            let mut inner = shared.inner.lock();
            PagerShared::issue(&shared, &mut inner, initial, cursors);
        }
        Self { shared }
    }

    /// Requests page `page`. Ignored outside `1..=num_pages` or in cursor mode.
    pub fn goto_page(&self, page: u32) -> bool {
        if matches!(self.shared.options.mode, PageMode::Cursor) {
            return false;
        }
        let mut inner = self.shared.inner.lock();
        let in_range = page >= 1 && inner.position.num_pages.map_or(true, |total| page <= total);
        if !inner.mounted || !in_range {
            debug!(page, "pagination: ignoring out-of-range page");
            return false;
        }
        PagerShared::issue(&self.shared, &mut inner, PageCursor::Number(page), None);
        true
    }

    /// Moves towards later items: the next page number, or the next cursor.
    /// Without a page count the next page must be announced by `has_more`.
    /// Cursor moves are relative to the displayed page, so repeated calls
    /// before the response arrives ask for the same page.
    pub fn older(&self) -> bool {
        match self.shared.options.mode {
            PageMode::Numbered { .. } => {
                let (current, known_more) = {
                    let inner = self.shared.inner.lock();
                    let position = &inner.position;
                    (position.page, position.num_pages.is_some() || position.has_more)
                };
                known_more && self.goto_page(current + 1)
            }
            PageMode::Cursor => {
                let mut inner = self.shared.inner.lock();
                let next = match (&inner.position.next_cursor, inner.position.has_more) {
                    (Some(next), true) if inner.mounted => next.clone(),
                    _ => return false,
                };
                let mut target = inner.position.cursors.clone();
                target.push(Some(next.clone()));
                PagerShared::issue(
                    &self.shared,
                    &mut inner,
                    PageCursor::Token(Some(next)),
                    Some(target),
                );
                true
            }
        }
    }

    /// Moves towards earlier items: the previous page number, or the cursor
    /// visited before the displayed one.
    pub fn newer(&self) -> bool {
        match self.shared.options.mode {
            PageMode::Numbered { .. } => {
                let current = self.current_page();
                current > 1 && self.goto_page(current - 1)
            }
            PageMode::Cursor => {
                let mut inner = self.shared.inner.lock();
                if !inner.mounted || inner.position.cursors.len() < 2 {
                    return false;
                }
                let mut target = inner.position.cursors.clone();
                target.pop();
                let previous = target.last().cloned().flatten();
                PagerShared::issue(
                    &self.shared,
                    &mut inner,
                    PageCursor::Token(previous),
                    Some(target),
                );
                true
            }
        }
    }

    pub fn current_page(&self) -> u32 {
        self.shared.inner.lock().position.page
    }

    pub fn num_pages(&self) -> Option<u32> {
        self.shared.inner.lock().position.num_pages
    }

    pub fn is_loading(&self) -> bool {
        *self.shared.loading.borrow()
    }

    /// Resolves once no page request is pending.
    pub async fn settled(&self) {
        let mut rx = self.shared.loading.subscribe();
        let _ = rx.wait_for(|loading| !*loading).await;
    }

    /// Cancels any pending request and empties the container.
    pub fn unmount(&self) {
        let mut inner = self.shared.inner.lock();
        if let Some(task) = inner.task.take() {
            task.abort();
        }
        inner.sequence.invalidate();
        inner.pending_cursors = None;
        inner.mounted = false;
        self.shared.container.items.clear();
        self.shared.container.pager.clear();
        self.shared.loading.send_replace(false);
    }
}

impl PagerShared {
    fn issue(
        shared: &Arc<Self>,
        inner: &mut PagerInner,
        cursor: PageCursor,
        cursors: Option<Vec<Option<String>>>,
    ) {
        if let Some(task) = inner.task.take() {
            task.abort();
        }
        let ticket = inner.sequence.issue();

        if let PageCursor::Number(page) = &cursor {
            inner.position.page = *page;
        }
        inner.pending_cursors = cursors;

        let request = (shared.options.request_builder)(&PageRequest {
            cursor,
            page_size: shared.options.page_size,
            filters: shared.options.filters.clone(),
        });
        debug!(seq = ticket.value(), url = %request.url, "pagination: requesting page");
        shared.loading.send_replace(true);

        let task_shared = Arc::clone(shared);
        inner.task = Some(tokio::spawn(async move {
            let result = task_shared
                .transport
                .fetch(request)
                .await
                .and_then(RawResponse::error_for_status)
                .and_then(|raw| raw.decode_json::<PageResponse>());
            task_shared.apply(ticket, result);
        }));
    }

    fn apply(&self, ticket: Ticket, result: Result<PageResponse, FetchError>) {
        let mut inner = self.inner.lock();
        if !inner.sequence.is_current(ticket) {
            debug!(seq = ticket.value(), "pagination: discarding stale page");
            return;
        }
        inner.task = None;
        let cursors = inner.pending_cursors.take();

        let rendered = match result {
            Ok(page) => {
                if let Some(cursors) = cursors {
                    inner.position.page = cursors.len() as u32;
                    inner.position.cursors = cursors;
                }
                self.render(&mut inner.position, page);
                true
            }
            Err(err) if err.is_cancellation() => false,
            Err(err) => {
                warn!(seq = ticket.value(), %err, "pagination: failed to load page");
                self.container
                    .items
                    .replace(&error_fragment(&format!("Failed to load page: {err}")));
                false
            }
        };
        self.loading.send_replace(false);
        drop(inner);

        if rendered {
            if let Some(hook) = &self.options.post_render {
                hook(self.container.items.as_ref());
            }
        }
    }

    fn render(&self, position: &mut Position, page: PageResponse) {
        if let Some(number) = page.page {
            position.page = number;
        }
        if page.num_pages.is_some() {
            position.num_pages = page.num_pages;
        }
        position.has_more = page.has_more.unwrap_or(false);
        position.next_cursor = page.next_cursor;

        self.container.items.replace(&page.items.concat());

        let controls = match self.options.mode {
            PageMode::Numbered { .. } => match position.num_pages {
                Some(total) => (total > 1).then(|| {
                    PagerControls::Numbered(page_window(
                        position.page,
                        total,
                        self.options.window_distance,
                    ))
                }),
                // Total unknown: step controls driven by `has_more`.
                None => {
                    let newer = position.page > 1;
                    (newer || position.has_more).then_some(PagerControls::Cursor {
                        newer,
                        older: position.has_more,
                    })
                }
            },
            PageMode::Cursor => Some(PagerControls::Cursor {
                newer: position.cursors.len() > 1,
                older: position.has_more && position.next_cursor.is_some(),
            }),
        };
        match controls {
            Some(controls) => self.container.pager.render(&controls),
            None => self.container.pager.clear(),
        }
    }
}

#[cfg(test)]
#[path = "tests/pagination_tests.rs"]
mod tests;
