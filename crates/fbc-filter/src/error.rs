use thiserror::Error;

/// Errors raised while filtering a catalog.
///
/// Message texts are stable; callers and tests match on them.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("error parsing version range: {0}")]
    VersionRangeParse(#[source] fbc_semver::ParseError),

    #[error("no channel heads found in channel {channel:?} for package {package:?}")]
    NoChannelHead { package: String, channel: String },

    #[error("multiple channel heads found in channel {channel:?} for package {package:?}: {heads:?}")]
    MultipleChannelHeads {
        package: String,
        channel: String,
        heads: Vec<String>,
    },

    #[error("package {package:?} channel {channel:?} has version range {range:?} that results in an empty channel")]
    EmptyChannel {
        package: String,
        channel: String,
        range: String,
    },

    #[error("filtering on the selected bundles leads to invalidating channel {channel:?} for package {package:?}")]
    InvalidatedChannel { package: String, channel: String },

    #[error("invalid default channel configuration for package {package:?}: specified default channel override {channel:?} does not exist in the filtered output")]
    DefaultChannelOverrideMissing { package: String, channel: String },

    #[error("invalid default channel configuration for package {package:?}: the default channel {channel:?} was filtered out, a new default channel must be configured for this package")]
    DefaultChannelFilteredOut { package: String, channel: String },

    #[error("default channel {channel:?} not found for package {package:?}")]
    DefaultChannelNotFound { package: String, channel: String },

    #[error("Full: true cannot be mixed with versionRange")]
    FullWithVersionRange,

    #[error("Full: true cannot be mixed with filtering by bundle selection")]
    FullWithBundleSelection,

    #[error("filtering by versionRange cannot be mixed with filtering by bundle selection")]
    VersionRangeWithBundleSelection,

    #[error("bundle {bundle:?} in package {package:?} has no package property")]
    MissingPackageProperty { package: String, bundle: String },

    #[error("bundle {bundle:?} in package {package:?} has an invalid package property: {source}")]
    InvalidPackageProperty {
        package: String,
        bundle: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("bundle {bundle:?} in package {package:?} has an invalid version: {source}")]
    InvalidBundleVersion {
        package: String,
        bundle: String,
        #[source]
        source: fbc_semver::ParseError,
    },
}

pub type Result<T> = std::result::Result<T, FilterError>;
