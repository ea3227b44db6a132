//! Sorted, index-assigned category and district names.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use crime_olap_source::reports::read_report_keys;

use crate::AggregateError;

/// One dimension's names in lexicographic order.
///
/// A name's index is its position in the sorted, deduplicated sequence,
/// so `index_of(name(i)) == Some(i)` for every valid `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dimension {
    names: Vec<String>,
    indices: HashMap<String, usize>,
}

impl Dimension {
    /// Builds a dimension from raw key values in any order, with duplicates.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sorted: BTreeSet<String> = keys.into_iter().map(Into::into).collect();
        let names: Vec<String> = sorted.into_iter().collect();
        let indices = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        Self { names, indices }
    }

    /// Position of `name`, or `None` if it is not in the catalog.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.indices.get(name).copied()
    }

    /// Name at `index`.
    #[must_use]
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// All names in index order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of distinct names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the dimension has no names.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Category and district dimensions for one pipeline run.
///
/// Built once, then shared read-only by the cross-tabulator and the star
/// schema loader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DimensionCatalog {
    /// Crime categories.
    pub categories: Dimension,
    /// Police districts.
    pub districts: Dimension,
}

impl DimensionCatalog {
    /// Builds the catalog from raw category and district keys.
    pub fn build<C, D, S, T>(categories: C, districts: D) -> Self
    where
        C: IntoIterator<Item = S>,
        D: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            categories: Dimension::from_keys(categories),
            districts: Dimension::from_keys(districts),
        }
    }

    /// Loads the catalog from the category and district frequency reports.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::Source`] if either report cannot be read.
    pub fn from_reports(
        category_report: &Path,
        district_report: &Path,
    ) -> Result<Self, AggregateError> {
        let categories = read_report_keys(category_report)?;
        let districts = read_report_keys(district_report)?;
        let catalog = Self::build(categories, districts);

        log::info!(
            "Loaded catalog with {} categories and {} districts",
            catalog.categories.len(),
            catalog.districts.len()
        );

        Ok(catalog)
    }

    /// Index of a category name.
    #[must_use]
    pub fn index_of_category(&self, name: &str) -> Option<usize> {
        self.categories.index_of(name)
    }

    /// Index of a district name.
    #[must_use]
    pub fn index_of_district(&self, name: &str) -> Option<usize> {
        self.districts.index_of(name)
    }
}
