//! Offset paging sorted by `created_at`, plus the listing filters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::asset::Asset;
use crate::order::Order;
use crate::types::OrderStatus;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    /// Accepts `asc`/`desc` in any case.
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("asc") {
            Some(SortDirection::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Some(SortDirection::Desc)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    pub direction: SortDirection,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            direction: SortDirection::Desc,
        }
    }
}

impl PageRequest {
    /// Size 0 falls back to the default, anything above the cap is clamped.
    pub fn new(page: u32, size: u32, direction: SortDirection) -> Self {
        let size = match size {
            0 => DEFAULT_PAGE_SIZE,
            s => s.min(MAX_PAGE_SIZE),
        };
        Self {
            page,
            size,
            direction,
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }

    /// Slice an already sorted, already filtered list.
    pub fn slice<T: Clone>(&self, all: &[T]) -> Page<T> {
        let start = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let content = all
            .iter()
            .skip(start)
            .take(self.size as usize)
            .cloned()
            .collect();
        Page::from_parts(content, *self, all.len() as u64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
    pub first: bool,
    pub last: bool,
}

impl<T> Page<T> {
    pub fn from_parts(content: Vec<T>, request: PageRequest, total_elements: u64) -> Self {
        let size = u64::from(request.size.max(1));
        let total_pages = u32::try_from(total_elements.div_ceil(size)).unwrap_or(u32::MAX);
        Self {
            content,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages,
            first: request.page == 0,
            last: request.page.saturating_add(1) >= total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            first: self.first,
            last: self.last,
        }
    }
}

/// Required customer + inclusive `created_at` window, optional status and
/// case-insensitive asset-name substring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderFilter {
    pub customer_id: Uuid,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub status: Option<OrderStatus>,
    pub asset_name: Option<String>,
}

impl OrderFilter {
    pub fn new(customer_id: Uuid, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            customer_id,
            from,
            to,
            status: None,
            asset_name: None,
        }
    }

    pub fn with_status(mut self, status: Option<OrderStatus>) -> Self {
        self.status = status;
        self
    }

    /// Blank needles are dropped.
    pub fn with_asset_name(mut self, needle: Option<&str>) -> Self {
        self.asset_name = needle
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        self
    }

    /// Lower-cased needle, ready for a `like` pattern.
    pub fn asset_needle(&self) -> Option<String> {
        self.asset_name.as_deref().map(str::to_lowercase)
    }

    pub fn matches(&self, order: &Order) -> bool {
        if order.customer_id != self.customer_id {
            return false;
        }
        if order.created_at < self.from || order.created_at > self.to {
            return false;
        }
        if let Some(status) = self.status {
            if order.status != status {
                return false;
            }
        }
        if let Some(needle) = self.asset_needle() {
            if !order.asset_name.to_lowercase().contains(&needle) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFilter {
    pub customer_id: Uuid,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl AssetFilter {
    pub fn matches(&self, asset: &Asset) -> bool {
        asset.customer_id == self.customer_id
            && asset.created_at >= self.from
            && asset.created_at <= self.to
    }
}
