use serde::Serialize;

use crate::{
    error::TypeError,
    form::Form,
    MAX_PAGE_LIMIT,
};

/// Highest page whose offset still fits an `i64` at the largest limit.
const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_LIMIT;

/// Which slice of a listing to return. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.clamp(1, MAX_PAGE),
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn from_form(form: &Form, default_limit: i64) -> Result<Self, TypeError> {
        let page = form.get_number::<i64>("page")?.unwrap_or(1);
        let limit = form.get_number::<i64>("limit")?.unwrap_or(default_limit);

        Ok(Self::new(page, limit))
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn from_rows(results: Vec<T>, count: i64, request: PageRequest) -> Self {
        if results.is_empty() {
            return Self::no_rows(count, request);
        }

        let last_page = ((count + request.limit - 1) / request.limit).max(1);
        let next = (request.page < last_page).then_some(request.page + 1);
        let previous = (request.page > 1).then(|| (request.page - 1).min(last_page));

        Self {
            count,
            next,
            previous,
            results,
        }
    }

    /// A page past the end still reports where the listing can be resumed.
    pub fn no_rows(count: i64, request: PageRequest) -> Self {
        let last_page = (count + request.limit - 1) / request.limit;

        Self {
            count,
            next: None,
            previous: (request.page > 1 && last_page > 0).then_some(last_page),
            results: vec![],
        }
    }

    /// Swaps in results built elsewhere, e.g. views loaded in one batch.
    pub fn with_results<U>(self, results: Vec<U>) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results,
        }
    }
}
