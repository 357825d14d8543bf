//! Pagination utilities shared by the service and HTTP layers
//!
//! Offset-based paging: `offset = (page - 1) * per_page`.

pub const DEFAULT_PER_PAGE: u32 = 50;
pub const MAX_PER_PAGE: u32 = 500;

/// Pagination parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based page index
    pub page: u32,
    /// items per page
    pub per_page: u32,
}

impl Pagination {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        let d = Self::default();
        Self { page: page.unwrap_or(d.page), per_page: per_page.unwrap_or(d.per_page) }
    }

    /// Clamp to sane bounds and return `(offset, limit)`
    pub fn normalize(self) -> (u64, u64) {
        let page = self.page.max(1);
        let per_page = self.per_page.clamp(1, MAX_PER_PAGE);
        ((page as u64 - 1) * per_page as u64, per_page as u64)
    }
}

impl Default for Pagination {
    fn default() -> Self { Self { page: 1, per_page: DEFAULT_PER_PAGE } }
}
