use std::cmp::Ordering;

use super::document::{Document, FieldValue, Fields};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Equal,
    GreaterThanOrEqual,
    LessThan,
}

/// A single field condition. A missing field never matches.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: FieldValue,
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<FieldValue>) -> Self {
        Self::new(field, FilterOp::Equal, value)
    }

    pub fn gte(field: &str, value: impl Into<FieldValue>) -> Self {
        Self::new(field, FilterOp::GreaterThanOrEqual, value)
    }

    pub fn lt(field: &str, value: impl Into<FieldValue>) -> Self {
        Self::new(field, FilterOp::LessThan, value)
    }

    fn new(field: &str, op: FilterOp, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.to_string(),
            op,
            value: value.into(),
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        let Some(ordering) = doc
            .get(&self.field)
            .and_then(|actual| actual.compare(&self.value))
        else {
            return false;
        };

        match self.op {
            FilterOp::Equal => ordering == Ordering::Equal,
            FilterOp::GreaterThanOrEqual => ordering != Ordering::Less,
            FilterOp::LessThan => ordering == Ordering::Less,
        }
    }
}

/// Conjunction of filters over one collection. No ordering, no limit.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
}

impl Query {
    pub fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            filters: Vec::new(),
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.filters.iter().all(|f| f.matches(doc))
    }
}

/// Overwrites the listed fields of an existing document.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub collection: String,
    pub id: String,
    pub fields: Fields,
}

/// Updates committed together as one all-or-nothing write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    updates: Vec<FieldUpdate>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, collection: &str, id: &str, fields: Fields) {
        self.updates.push(FieldUpdate {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
    }

    pub fn updates(&self) -> &[FieldUpdate] {
        &self.updates
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}
