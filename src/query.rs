//! Cursor-driven infinite pagination.
//!
//! Inspired by TanStack Query's infinite queries, an [`InfiniteQuery`] owns a
//! page fetcher and the pages loaded so far. Each call to
//! [`InfiniteQuery::fetch_next_page`] loads the page after the last one and
//! works out from the response whether another page exists.
//!
//! # Example
//!
//! ```ignore
//! let mut query = client.infinite_orders(&filters, 20);
//! while let Some(page) = query.fetch_next_page().await? {
//!   println!("page {} of {}", page.page, page.total_pages);
//! }
//! ```

use futures::future::{BoxFuture, FutureExt};
use std::future::Future;

use crate::api::ApiError;

/// Pagination state of one loaded page. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
  pub page: u32,
  pub page_size: u32,
  pub total: u64,
  pub total_pages: u32,
}

impl PageCursor {
  pub fn new(page: u32, page_size: u32, total: u64) -> Self {
    Self {
      page,
      page_size,
      total,
      total_pages: total_pages(total, page_size),
    }
  }

  pub fn has_next(&self) -> bool {
    self.page < self.total_pages
  }

  /// The page after this one, or `None` once the last page is reached.
  pub fn next_page(&self) -> Option<u32> {
    self.has_next().then(|| self.page + 1)
  }
}

/// `ceil(total / page_size)`. A page size of zero has no pages.
pub fn total_pages(total: u64, page_size: u32) -> u32 {
  if page_size == 0 {
    return 0;
  }
  let pages = total.div_ceil(u64::from(page_size));
  u32::try_from(pages).unwrap_or(u32::MAX)
}

/// A response that is one page of a larger result set.
pub trait Paginated {
  type Item;

  fn cursor(&self) -> PageCursor;

  fn items(&self) -> &[Self::Item];
}

type PageFetcher<P> = Box<dyn Fn(u32) -> BoxFuture<'static, Result<P, ApiError>> + Send + Sync>;

/// Pages loaded so far plus the fetcher for the next one.
pub struct InfiniteQuery<P> {
  fetcher: PageFetcher<P>,
  pages: Vec<P>,
  next_page: Option<u32>,
}

impl<P: Paginated + Send + 'static> InfiniteQuery<P> {
  /// Create a query that starts at page 1. `fetcher` receives the page number.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn(u32) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<P, ApiError>> + Send + 'static,
  {
    Self {
      fetcher: Box::new(move |page| fetcher(page).boxed()),
      pages: Vec::new(),
      next_page: Some(1),
    }
  }

  /// Load the next page and return it, or `Ok(None)` when there is none.
  ///
  /// On error nothing changes, so the same page is requested again next time.
  pub async fn fetch_next_page(&mut self) -> Result<Option<&P>, ApiError> {
    let Some(page) = self.next_page else {
      return Ok(None);
    };

    let data = (self.fetcher)(page).await?;
    self.next_page = data.cursor().next_page();
    self.pages.push(data);
    Ok(self.pages.last())
  }

  pub fn has_next_page(&self) -> bool {
    self.next_page.is_some()
  }

  /// Page number the next fetch will request.
  pub fn next_page_param(&self) -> Option<u32> {
    self.next_page
  }

  pub fn pages(&self) -> &[P] {
    &self.pages
  }

  /// Items of every loaded page, in page order.
  pub fn items(&self) -> impl Iterator<Item = &P::Item> {
    self.pages.iter().flat_map(|p| p.items())
  }

  /// Forget loaded pages and start again from page 1.
  pub fn reset(&mut self) {
    self.pages.clear();
    self.next_page = Some(1);
  }
}

impl<P> std::fmt::Debug for InfiniteQuery<P> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("InfiniteQuery")
      .field("pages", &self.pages.len())
      .field("next_page", &self.next_page)
      .finish_non_exhaustive()
  }
}
