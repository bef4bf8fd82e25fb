//! Listing order for stored filters.

use std::cmp::Ordering;

use sieve_schema::config::{ListingConfig, NullsOrder, OrderKey, SortOrder};

use crate::model_filter::ModelFilter;

/// Order by specification for a single stored-filter attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderByField {
    /// The attribute to order by.
    pub key: OrderKey,
    /// The sort order.
    pub order: SortOrder,
    /// Null handling (optional).
    pub nulls: Option<NullsOrder>,
    /// Compare text case-insensitively.
    pub ignore_case: bool,
}

impl OrderByField {
    /// Create a new order by field.
    pub const fn new(key: OrderKey, order: SortOrder) -> Self {
        Self {
            key,
            order,
            nulls: None,
            ignore_case: false,
        }
    }

    /// Create an ascending order.
    pub const fn asc(key: OrderKey) -> Self {
        Self::new(key, SortOrder::Asc)
    }

    /// Create a descending order.
    pub const fn desc(key: OrderKey) -> Self {
        Self::new(key, SortOrder::Desc)
    }

    /// Set null handling.
    pub fn nulls(mut self, nulls: NullsOrder) -> Self {
        self.nulls = Some(nulls);
        self
    }

    /// Compare case-insensitively.
    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    /// Write the SQL directly to a buffer.
    pub fn write_sql(&self, buffer: &mut String) {
        if self.ignore_case {
            buffer.push_str("lower(");
            buffer.push_str(self.key.as_str());
            buffer.push(')');
        } else {
            buffer.push_str(self.key.as_str());
        }
        buffer.push(' ');
        buffer.push_str(self.order.as_sql());
        if let Some(nulls) = self.nulls {
            buffer.push(' ');
            buffer.push_str(nulls.as_sql());
        }
    }

    /// Compare two filters on this attribute.
    ///
    /// Without an explicit null placement, missing values sort as the largest,
    /// which puts them last ascending and first descending.
    pub fn compare(&self, a: &ModelFilter, b: &ModelFilter) -> Ordering {
        match self.key {
            OrderKey::Name => {
                let name = |f: &ModelFilter| {
                    f.name.as_deref().map(|n| {
                        if self.ignore_case {
                            n.to_lowercase()
                        } else {
                            n.to_string()
                        }
                    })
                };
                match (name(a), name(b)) {
                    (Some(a), Some(b)) => self.directed(a.cmp(&b)),
                    (None, None) => Ordering::Equal,
                    (None, Some(_)) => self.null_first_or(Ordering::Greater),
                    (Some(_), None) => self.null_first_or(Ordering::Greater).reverse(),
                }
            }
            OrderKey::Created => self.directed(a.created.cmp(&b.created)),
            OrderKey::Id => self.directed(a.id.cmp(&b.id)),
        }
    }

    fn directed(&self, ordering: Ordering) -> Ordering {
        match self.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }

    /// Where a null sorts relative to a value; `natural` is its undirected order.
    fn null_first_or(&self, natural: Ordering) -> Ordering {
        match self.nulls {
            Some(NullsOrder::First) => Ordering::Less,
            Some(NullsOrder::Last) => Ordering::Greater,
            None => self.directed(natural),
        }
    }
}

/// Ordering applied when stored filters are listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingOrder {
    fields: Vec<OrderByField>,
}

impl ListingOrder {
    /// Build from explicit fields.
    pub fn from_fields(fields: impl IntoIterator<Item = OrderByField>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
        }
    }

    /// Build from the listing section of the configuration.
    pub fn from_config(config: &ListingConfig) -> Self {
        Self::from_fields(config.order.iter().map(|setting| OrderByField {
            key: setting.field,
            order: setting.direction,
            nulls: setting.nulls,
            ignore_case: setting.ignore_case,
        }))
    }

    /// The ordering fields.
    pub fn fields(&self) -> &[OrderByField] {
        &self.fields
    }

    /// Render as an `ORDER BY` list.
    pub fn to_sql(&self) -> String {
        let mut sql = String::with_capacity(self.fields.len() * 24);
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            field.write_sql(&mut sql);
        }
        sql
    }

    /// Compare two filters field by field.
    pub fn compare(&self, a: &ModelFilter, b: &ModelFilter) -> Ordering {
        self.fields
            .iter()
            .map(|field| field.compare(a, b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    /// Sort filters in place.
    pub fn sort(&self, filters: &mut [ModelFilter]) {
        filters.sort_by(|a, b| self.compare(a, b));
    }
}

impl Default for ListingOrder {
    fn default() -> Self {
        Self::from_config(&ListingConfig::default())
    }
}
