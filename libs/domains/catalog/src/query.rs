//! Product query engine
//!
//! Queries run over a fully materialized product collection (the cached
//! `products:all` snapshot), never against the store. The engine sits behind
//! `ProductQueryEngine` so a store-side implementation can replace it
//! without touching call sites.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::models::Product;

/// Product filter predicates; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductFilter {
    /// Case-insensitive substring of the product name
    pub name: Option<String>,
    /// Exact category label
    pub category: Option<String>,
    /// Inclusive lower price bound in cents; `<= 0` means unbounded
    #[serde(default)]
    pub min_price: i64,
    /// Inclusive upper price bound in cents; `<= 0` means unbounded
    #[serde(default)]
    pub max_price: i64,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            if !product
                .name
                .to_lowercase()
                .contains(&name.to_lowercase())
            {
                return false;
            }
        }

        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            if product.category != category {
                return false;
            }
        }

        if self.min_price > 0 && product.price < self.min_price {
            return false;
        }
        if self.max_price > 0 && product.price > self.max_price {
            return false;
        }

        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SortField {
    Name,
    Price,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// Descending only when asked for explicitly; anything else sorts ascending
    pub fn parse(order: &str) -> Self {
        if order.eq_ignore_ascii_case("desc") || order.eq_ignore_ascii_case("descending") {
            SortOrder::Descending
        } else {
            SortOrder::Ascending
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductSort {
    pub field: SortField,
    pub order: SortOrder,
}

impl ProductSort {
    /// Build a sort from request strings; an unknown field means no sort
    pub fn parse(field: &str, order: &str) -> Option<Self> {
        let field = field.parse::<SortField>().ok()?;
        Some(Self {
            field,
            order: SortOrder::parse(order),
        })
    }

    fn compare(&self, a: &Product, b: &Product) -> Ordering {
        let ordering = match self.field {
            SortField::Name => a.name.cmp(&b.name),
            SortField::Price => a.price.cmp(&b.price),
        };
        match self.order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    pub filter: ProductFilter,
    pub sort: Option<ProductSort>,
    /// 1-indexed; values below 1 read as the first page
    pub page: i64,
    /// `<= 0` returns every match as one page
    pub page_size: i64,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            filter: ProductFilter::default(),
            sort: None,
            page: 1,
            page_size: 10,
        }
    }
}

impl ProductQuery {
    pub fn with_filter(mut self, filter: ProductFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_sort(mut self, sort: Option<ProductSort>) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_page(mut self, page: i64, page_size: i64) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }
}

/// One page of results plus the number of matches across all pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: i64,
    pub page_size: i64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> usize {
        if self.page_size <= 0 {
            return usize::from(self.total > 0);
        }
        self.total.div_ceil(self.page_size as usize)
    }
}

/// Answers product queries from a materialized collection
pub trait ProductQueryEngine: Send + Sync {
    fn query(&self, products: Vec<Product>, query: &ProductQuery) -> Page<Product>;
}

/// Filters, sorts and slices in process
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemoryQueryEngine;

impl ProductQueryEngine for InMemoryQueryEngine {
    fn query(&self, products: Vec<Product>, query: &ProductQuery) -> Page<Product> {
        let mut matched: Vec<Product> = products
            .into_iter()
            .filter(|product| query.filter.matches(product))
            .collect();

        if let Some(sort) = &query.sort {
            matched.sort_by(|a, b| sort.compare(a, b));
        }

        let total = matched.len();
        let page = query.page.max(1);

        if query.page_size <= 0 {
            return Page {
                items: matched,
                total,
                page: 1,
                page_size: query.page_size,
            };
        }

        let size = query.page_size as usize;
        let start = (page as usize - 1).saturating_mul(size);
        let items = if start >= total {
            Vec::new()
        } else {
            let end = start.saturating_add(size).min(total);
            matched.drain(start..end).collect()
        };

        Page {
            items,
            total,
            page,
            page_size: query.page_size,
        }
    }
}
