//! Offset pagination state
//!
//! A page "possibly has more" when it came back full. Pages are appended
//! strictly after what is already loaded. Only one fetch may be in flight;
//! [`Paginator::next_request`] hands out a [`PageTicket`] and marks the
//! paginator busy until [`Paginator::complete`] or [`Paginator::fail`].
//!
//! [`Paginator::reset`] starts a new generation. Tickets from an earlier
//! generation are stale: completing or failing one changes nothing.

use crate::models::PageRequest;

/// A window handed out by [`Paginator::next_request`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTicket {
    pub request: PageRequest,
    generation: u64,
}

#[derive(Debug, Clone)]
pub struct Paginator<T> {
    page_size: usize,
    items: Vec<T>,
    next_skip: usize,
    has_more: bool,
    in_flight: Option<PageTicket>,
    started: bool,
    generation: u64,
}

impl<T> Paginator<T> {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            items: Vec::new(),
            next_skip: 0,
            has_more: true,
            in_flight: None,
            started: false,
            generation: 0,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether the first page has been requested
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Whether `ticket` is the request currently in flight
    pub fn is_current(&self, ticket: &PageTicket) -> bool {
        self.in_flight.as_ref() == Some(ticket)
    }

    /// Window for the next fetch, or `None` when exhausted or busy
    pub fn next_request(&mut self) -> Option<PageTicket> {
        if self.in_flight.is_some() || !self.has_more {
            return None;
        }
        let ticket = PageTicket {
            request: PageRequest::new(self.page_size, self.next_skip),
            generation: self.generation,
        };
        self.in_flight = Some(ticket);
        self.started = true;
        Some(ticket)
    }

    /// Append a fetched page. Returns how many items were appended;
    /// a stale ticket appends nothing.
    pub fn complete(&mut self, ticket: PageTicket, page: Vec<T>) -> usize {
        let Some(request) = self.take_current(&ticket) else {
            return 0;
        };

        self.has_more = page.len() == request.first;
        self.next_skip = request.skip + page.len();

        let appended = page.len();
        self.items.extend(page);
        appended
    }

    /// Append a fetched page, skipping items whose key is already loaded.
    /// Offsets still advance by the full page.
    pub fn complete_dedup<K, F>(&mut self, ticket: PageTicket, page: Vec<T>, key: F) -> usize
    where
        K: PartialEq,
        F: Fn(&T) -> K,
    {
        let Some(request) = self.take_current(&ticket) else {
            return 0;
        };

        self.has_more = page.len() == request.first;
        self.next_skip = request.skip + page.len();

        let before = self.items.len();
        for item in page {
            let k = key(&item);
            if !self.items.iter().any(|existing| key(existing) == k) {
                self.items.push(item);
            }
        }
        self.items.len() - before
    }

    /// Release the in-flight slot without changing loaded items
    pub fn fail(&mut self, ticket: PageTicket) {
        self.take_current(&ticket);
    }

    /// Drop everything and start from the first page
    pub fn reset(&mut self) {
        self.items.clear();
        self.next_skip = 0;
        self.has_more = true;
        self.in_flight = None;
        self.started = false;
        self.generation += 1;
    }

    fn take_current(&mut self, ticket: &PageTicket) -> Option<PageRequest> {
        if !self.is_current(ticket) {
            tracing::debug!(skip = ticket.request.skip, "Discarding stale page");
            return None;
        }
        self.in_flight.take().map(|t| t.request)
    }
}
