//! Construction parameters of an index file.
//!
//! [`RTreeConfig`] is assembled through [`RTreeConfigBuilder`] and fully
//! validated by [`RTreeConfigBuilder::build`], before any file is touched.
//! The part that shapes the file layout, [`PageDefinition`], is stored in
//! the file header and must match on every reopen.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::disk_rtree::rtree_constants::{
    DEFAULT_CACHE_PAGES, DEFAULT_MAX_ENTRIES, DEFAULT_MIN_ENTRIES, DEFAULT_PAGE_SIZE,
    ENTRY_KEY_SIZE, MIN_PAGE_SIZE, NODE_OVERHEAD, PAGE_FRAME_OVERHEAD,
};
use crate::errors::{SpatialError, SpatialResult};

/// Node split heuristic applied when a node overflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SplitAlgorithm {
    Linear,
    Quadratic,
}

impl SplitAlgorithm {
    /// Identifier persisted in the file header.
    pub fn id(self) -> u8 {
        match self {
            SplitAlgorithm::Linear => 1,
            SplitAlgorithm::Quadratic => 2,
        }
    }

    pub fn from_id(id: u8) -> SpatialResult<SplitAlgorithm> {
        match id {
            1 => Ok(SplitAlgorithm::Linear),
            2 => Ok(SplitAlgorithm::Quadratic),
            other => Err(SpatialError::Configuration(format!(
                "unsupported split algorithm id {}",
                other
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SplitAlgorithm::Linear => "linear",
            SplitAlgorithm::Quadratic => "quadratic",
        }
    }
}

impl FromStr for SplitAlgorithm {
    type Err = SpatialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(SplitAlgorithm::Linear),
            "quadratic" => Ok(SplitAlgorithm::Quadratic),
            other => Err(SpatialError::Configuration(format!(
                "unsupported split algorithm '{}'",
                other
            ))),
        }
    }
}

impl Display for SplitAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Storage type of one field of the leaf data schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Integer,
    Long,
    Double,
    /// Fixed number of characters
    Character(u32),
}

impl FieldKind {
    /// Encoded size in bytes.
    pub fn encoded_len(self) -> usize {
        match self {
            FieldKind::Integer => 4,
            FieldKind::Long | FieldKind::Double => 8,
            FieldKind::Character(len) => len as usize,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Field {
        Field {
            name: name.into(),
            kind,
        }
    }
}

/// Schema of the data stored next to every leaf bounding box.
///
/// Leaf data is always a [`crate::RecordPointer`]; the definition describes
/// it to consumers, sizes leaf entries and guards against reopening a file
/// written with a different schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataDefinition {
    pub charset: String,
    pub fields: Vec<Field>,
}

impl DataDefinition {
    pub fn new(charset: impl Into<String>) -> DataDefinition {
        DataDefinition {
            charset: charset.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> DataDefinition {
        self.fields.push(Field::new(name, kind));
        self
    }

    /// The schema of a record pointer: block number and in-block offset.
    pub fn record_pointer() -> DataDefinition {
        DataDefinition::new("US-ASCII")
            .field("page", FieldKind::Integer)
            .field("offset", FieldKind::Integer)
    }

    /// Encoded size of one record in bytes.
    pub fn encoded_len(&self) -> usize {
        self.fields.iter().map(|f| f.kind.encoded_len()).sum()
    }

    pub fn validate(&self) -> SpatialResult<()> {
        if self.fields.is_empty() {
            return Err(SpatialError::Configuration(
                "data definition must declare at least one field".into(),
            ));
        }
        if self.charset.trim().is_empty() {
            return Err(SpatialError::Configuration(
                "data definition needs a charset".into(),
            ));
        }

        let mut names = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(SpatialError::Configuration(
                    "data definition contains an unnamed field".into(),
                ));
            }
            if !names.insert(field.name.as_str()) {
                return Err(SpatialError::Configuration(format!(
                    "duplicate field '{}' in data definition",
                    field.name
                )));
            }
            if field.kind == FieldKind::Character(0) {
                return Err(SpatialError::Configuration(format!(
                    "character field '{}' must have a positive length",
                    field.name
                )));
            }
        }
        Ok(())
    }
}

impl Default for DataDefinition {
    fn default() -> Self {
        DataDefinition::record_pointer()
    }
}

/// Layout parameters persisted in the file header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDefinition {
    pub page_size: u32,
    pub min_entries: u32,
    pub max_entries: u32,
    pub split_algorithm: u8,
    pub data_definition: DataDefinition,
}

impl PageDefinition {
    /// Bytes reserved for one entry. Leaf data never takes less room than a
    /// record pointer.
    pub fn entry_size(&self) -> usize {
        ENTRY_KEY_SIZE + self.data_definition.encoded_len().max(8)
    }

    /// Worst-case framed size of a full node.
    pub fn node_size(&self) -> usize {
        PAGE_FRAME_OVERHEAD + NODE_OVERHEAD + self.max_entries as usize * self.entry_size()
    }

    pub fn split_algorithm(&self) -> SpatialResult<SplitAlgorithm> {
        SplitAlgorithm::from_id(self.split_algorithm)
    }

    pub fn validate(&self) -> SpatialResult<()> {
        self.data_definition.validate()?;
        self.split_algorithm()?;

        if (self.page_size as usize) < MIN_PAGE_SIZE {
            return Err(SpatialError::Configuration(format!(
                "page size {} is below the minimum of {}",
                self.page_size, MIN_PAGE_SIZE
            )));
        }
        if self.max_entries < 2 {
            return Err(SpatialError::Configuration(format!(
                "max entries must be at least 2, got {}",
                self.max_entries
            )));
        }
        if self.min_entries < 1 || self.min_entries > self.max_entries / 2 {
            return Err(SpatialError::Configuration(format!(
                "min entries must be between 1 and max/2 ({}), got {}",
                self.max_entries / 2,
                self.min_entries
            )));
        }
        if self.node_size() > self.page_size as usize {
            return Err(SpatialError::Configuration(format!(
                "a node of {} entries needs {} bytes, page size is {}",
                self.max_entries,
                self.node_size(),
                self.page_size
            )));
        }
        Ok(())
    }
}

/// Validated configuration for creating or opening a [`crate::DiskRTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RTreeConfig {
    page_definition: PageDefinition,
    split_algorithm: SplitAlgorithm,
    cache_pages: usize,
}

impl RTreeConfig {
    pub fn builder() -> RTreeConfigBuilder {
        RTreeConfigBuilder::new()
    }

    pub fn page_definition(&self) -> &PageDefinition {
        &self.page_definition
    }

    pub fn page_size(&self) -> usize {
        self.page_definition.page_size as usize
    }

    pub fn min_entries(&self) -> usize {
        self.page_definition.min_entries as usize
    }

    pub fn max_entries(&self) -> usize {
        self.page_definition.max_entries as usize
    }

    pub fn split_algorithm(&self) -> SplitAlgorithm {
        self.split_algorithm
    }

    pub fn data_definition(&self) -> &DataDefinition {
        &self.page_definition.data_definition
    }

    /// Decoded nodes kept in memory; zero disables caching.
    pub fn cache_pages(&self) -> usize {
        self.cache_pages
    }
}

impl Default for RTreeConfig {
    fn default() -> Self {
        RTreeConfig {
            page_definition: PageDefinition {
                page_size: DEFAULT_PAGE_SIZE as u32,
                min_entries: DEFAULT_MIN_ENTRIES as u32,
                max_entries: DEFAULT_MAX_ENTRIES as u32,
                split_algorithm: SplitAlgorithm::Quadratic.id(),
                data_definition: DataDefinition::record_pointer(),
            },
            split_algorithm: SplitAlgorithm::Quadratic,
            cache_pages: DEFAULT_CACHE_PAGES,
        }
    }
}

/// Builder for [`RTreeConfig`].
///
/// Setters never fail; every check happens in [`RTreeConfigBuilder::build`].
pub struct RTreeConfigBuilder {
    page_size: usize,
    min_entries: usize,
    max_entries: usize,
    split_algorithm: SplitAlgorithm,
    split_algorithm_name: Option<String>,
    data_definition: DataDefinition,
    cache_pages: usize,
}

impl RTreeConfigBuilder {
    pub fn new() -> RTreeConfigBuilder {
        RTreeConfigBuilder {
            page_size: DEFAULT_PAGE_SIZE,
            min_entries: DEFAULT_MIN_ENTRIES,
            max_entries: DEFAULT_MAX_ENTRIES,
            split_algorithm: SplitAlgorithm::Quadratic,
            split_algorithm_name: None,
            data_definition: DataDefinition::record_pointer(),
            cache_pages: DEFAULT_CACHE_PAGES,
        }
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn min_entries(mut self, min_entries: usize) -> Self {
        self.min_entries = min_entries;
        self
    }

    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn split_algorithm(mut self, split_algorithm: SplitAlgorithm) -> Self {
        self.split_algorithm = split_algorithm;
        self.split_algorithm_name = None;
        self
    }

    /// Selects the split heuristic by name, as found in connection
    /// parameters. Unknown names are rejected by `build`.
    pub fn split_algorithm_name(mut self, name: impl Into<String>) -> Self {
        self.split_algorithm_name = Some(name.into());
        self
    }

    pub fn data_definition(mut self, data_definition: DataDefinition) -> Self {
        self.data_definition = data_definition;
        self
    }

    pub fn cache_pages(mut self, cache_pages: usize) -> Self {
        self.cache_pages = cache_pages;
        self
    }

    pub fn build(self) -> SpatialResult<RTreeConfig> {
        let split_algorithm = match &self.split_algorithm_name {
            Some(name) => name.parse::<SplitAlgorithm>()?,
            None => self.split_algorithm,
        };

        let page_definition = PageDefinition {
            page_size: narrow(self.page_size, "page size")?,
            min_entries: narrow(self.min_entries, "min entries")?,
            max_entries: narrow(self.max_entries, "max entries")?,
            split_algorithm: split_algorithm.id(),
            data_definition: self.data_definition,
        };
        page_definition.validate()?;

        Ok(RTreeConfig {
            page_definition,
            split_algorithm,
            cache_pages: self.cache_pages,
        })
    }
}

impl Default for RTreeConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn narrow(value: usize, what: &str) -> SpatialResult<u32> {
    u32::try_from(value)
        .map_err(|_| SpatialError::Configuration(format!("{} {} is too large", what, value)))
}
