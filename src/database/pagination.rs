use serde::Serialize;

use super::{error::TypeError, form::Form};
use crate::constants::MAX_PAGE_SIZE;

#[derive(Serialize, Debug)]
pub struct PageContext<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// 1-based page number and page size taken from `?page=&limit=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    pub fn from_form(form: &Form, default_page_size: i64) -> Result<Self, TypeError> {
        let page = form.get_number::<i64>("page")?.unwrap_or(1);
        if page < 1 {
            return Err(TypeError::new("Invalid page"));
        }

        let page_size = match form.get_number::<i64>("limit")? {
            Some(limit) => Some(limit),
            None => form.get_number::<i64>("page_size")?,
        }
        .unwrap_or(default_page_size);
        if page_size < 1 {
            return Err(TypeError::new("Invalid page size"));
        }

        let page_size = page_size.min(MAX_PAGE_SIZE);

        // Both the row offset and the next page number must fit in an i64.
        if page.checked_add(1).is_none() || (page - 1).checked_mul(page_size).is_none() {
            return Err(TypeError::new("Invalid page"));
        }

        Ok(Self { page, page_size })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }
}

impl<T> PageContext<T> {
    /// `link` is the absolute URL of the listing without its query string.
    pub fn from_rows(
        results: Vec<T>,
        count: i64,
        request: &PageRequest,
        link: &str,
        form: &Form,
    ) -> Self {
        let has_next = request.offset().saturating_add(results.len() as i64) < count;
        let next = has_next.then(|| format!("{link}?{}", form.with_value("page", &(request.page + 1).to_string())));

        let previous = match request.page {
            1 => None,
            2 => {
                // First page is addressed without a page parameter.
                let query = form.without_value("page");
                Some(match query.is_empty() {
                    true => link.to_string(),
                    false => format!("{link}?{query}"),
                })
            }
            page => Some(format!("{link}?{}", form.with_value("page", &(page - 1).to_string()))),
        };

        Self {
            count,
            next,
            previous,
            results,
        }
    }

    pub fn no_rows() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: vec![],
        }
    }

    pub fn map<U, F>(self, f: F) -> PageContext<U>
    where
        F: FnMut(T) -> U,
    {
        PageContext {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}
