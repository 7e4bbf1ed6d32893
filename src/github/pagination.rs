//! Page requests and page results for GitHub listing endpoints.

use super::error::IntakeError;

/// Largest page size GitHub accepts.
pub const MAX_PER_PAGE: u8 = 100;

/// A validated 1-based page request.
///
/// # Example
///
/// ```
/// use hubcrawl::github::pagination::PageRequest;
///
/// let request = PageRequest::new(2, 50).expect("valid page");
/// assert_eq!(request.page(), 2);
/// assert!(PageRequest::new(0, 50).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    per_page: u8,
}

impl PageRequest {
    /// Validates a page number and size.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::InvalidPagination`] when `page` is 0 or
    /// `per_page` is outside `1..=100`.
    pub fn new(page: u32, per_page: u8) -> Result<Self, IntakeError> {
        if page == 0 {
            return Err(IntakeError::InvalidPagination {
                message: "page must be at least 1".to_owned(),
            });
        }

        if per_page == 0 {
            return Err(IntakeError::InvalidPagination {
                message: "per_page must be at least 1".to_owned(),
            });
        }

        if per_page > MAX_PER_PAGE {
            return Err(IntakeError::InvalidPagination {
                message: format!("per_page must not exceed {MAX_PER_PAGE}"),
            });
        }

        Ok(Self { page, per_page })
    }

    /// Current page number (1-based).
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Items per page.
    #[must_use]
    pub const fn per_page(&self) -> u8 {
        self.per_page
    }

    /// The following page with the same size.
    #[must_use]
    pub const fn next(self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            per_page: self.per_page,
        }
    }
}

/// One page of records and whether GitHub advertised another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing<T> {
    /// Records on this page.
    pub items: Vec<T>,
    /// True when the response carried a `rel="next"` link.
    pub has_next: bool,
}

impl<T> Listing<T> {
    /// Wraps a page of records.
    #[must_use]
    pub const fn new(items: Vec<T>, has_next: bool) -> Self {
        Self { items, has_next }
    }
}
