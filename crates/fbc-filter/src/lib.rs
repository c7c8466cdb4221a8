//! Filter engine for file-based operator catalogs.
//!
//! Given a parsed catalog and a filter configuration naming packages (and
//! optionally channels, version ranges or explicit bundles), the engine
//! produces a sub-catalog in which every remaining channel is still a valid
//! upgrade graph: a single head, no cycles, no dangling references. Default
//! channels are reconciled and deprecation entries pruned to the surviving
//! objects.
//!
//! ```no_run
//! use fbc_filter::{load_filter_configuration, Catalog, Filter};
//!
//! # fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_filter_configuration(std::fs::File::open("filter.yaml")?)?;
//! let catalog: Catalog = serde_json::from_reader(std::fs::File::open("catalog.json")?)?;
//! let filtered = Filter::new(config).filter_catalog(&catalog)?;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
mod channel;
pub mod config;
mod error;
mod filter;
mod log;

pub use catalog::{
    Bundle, Catalog, Channel, ChannelEntry, Deprecation, DeprecationEntry, Meta, Package,
    PackageProperty, Property, Reference, PROPERTY_TYPE_PACKAGE, SCHEMA_BUNDLE, SCHEMA_CHANNEL,
    SCHEMA_DEPRECATIONS, SCHEMA_PACKAGE,
};
pub use config::{
    load_filter_configuration, ChannelFilter, ConfigError, FilterConfiguration, PackageFilter,
    SelectedBundle, FILTER_API_VERSION, FILTER_KIND,
};
pub use error::{FilterError, Result};
pub use filter::Filter;
pub use log::{FilterLog, NullLog, TracingLog};
