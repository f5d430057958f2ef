//! Page/limit pagination shared by list endpoints.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Query parameters for a paginated list.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageParams {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }.normalized()
    }

    /// Clamp page to >= 1 and limit to 1..=MAX_PAGE_SIZE.
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            limit: self.limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        let p = self.normalized();
        i64::from(p.page - 1) * i64::from(p.limit)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.normalized().limit)
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, params: PageParams) -> Self {
        let params = params.normalized();
        let total_pages = if total <= 0 {
            0
        } else {
            ((total as u64).div_ceil(u64::from(params.limit))) as u32
        };
        Self {
            items,
            total,
            page: params.page,
            limit: params.limit,
            total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, 0, 1, 1 ; "zeros are clamped up")]
    #[test_case(3, 500, 3, 100 ; "limit is capped")]
    #[test_case(2, 25, 2, 25 ; "in range is untouched")]
    fn normalizes(page: u32, limit: u32, want_page: u32, want_limit: u32) {
        let p = PageParams::new(page, limit);
        assert_eq!((p.page, p.limit), (want_page, want_limit));
    }

    #[test]
    fn offset_follows_page() {
        assert_eq!(PageParams::new(3, 20).offset(), 40);
    }

    #[test]
    fn total_pages_round_up() {
        let page = Page::new(vec![1, 2], 41, PageParams::new(1, 20));
        assert_eq!(page.total_pages, 3);
        let empty: Page<i32> = Page::new(vec![], 0, PageParams::default());
        assert_eq!(empty.total_pages, 0);
    }
}
