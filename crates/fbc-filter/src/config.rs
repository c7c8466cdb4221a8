//! Filter configuration: model, YAML loading, and validation.

use std::io::Read;

use fbc_semver::VersionRange;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const FILTER_API_VERSION: &str = "olm.operatorframework.io/filter/mirror/v1alpha1";
pub const FILTER_KIND: &str = "FilterConfiguration";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read filter configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse filter configuration: {0}")]
    Parse(#[from] serde_yaml_ng::Error),

    #[error("invalid filter configuration:\n{}", .0.join("\n"))]
    Invalid(Vec<String>),
}

/// A filter configuration document, selecting packages (and optionally
/// channels, version ranges or explicit bundles) to keep in a catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterConfiguration {
    pub api_version: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<PackageFilter>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageFilter {
    pub name: String,

    /// New default channel for the package. Must survive filtering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_channel: Option<String>,

    /// Semver range applied to every channel of the package. Exclusive with
    /// per-channel ranges and with `bundles`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_range: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<ChannelFilter>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bundles: Vec<SelectedBundle>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelFilter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_range: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectedBundle {
    pub name: String,
}

/// Load and validate a filter configuration from a YAML byte stream.
pub fn load_filter_configuration<R: Read>(mut reader: R) -> Result<FilterConfiguration, ConfigError> {
    let mut raw = String::new();
    reader.read_to_string(&mut raw)?;
    let config = FilterConfiguration::from_yaml(&raw)?;
    config.validate()?;
    Ok(config)
}

impl FilterConfiguration {
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml_ng::Error> {
        serde_yaml_ng::from_str(content)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml_ng::Error> {
        serde_yaml_ng::to_string(self)
    }

    /// Check the whole document, aggregating every failure into one error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if self.api_version != FILTER_API_VERSION {
            problems.push(format!("unexpected API version {:?}", self.api_version));
        }
        if self.kind != FILTER_KIND {
            problems.push(format!("unexpected kind {:?}", self.kind));
        }

        for (i, pkg) in self.packages.iter().enumerate() {
            let invalid = |problem: String| {
                format!("package {:?} at index [{}] is invalid: {}", pkg.name, i, problem)
            };

            if pkg.name.is_empty() {
                problems.push(invalid("name must be specified".to_string()));
            }
            if !pkg.bundles.is_empty() && (!pkg.channels.is_empty() || pkg.version_range.is_some()) {
                problems.push(invalid(
                    "mixing both filtering by bundles and filtering by channels or versionRange is not allowed"
                        .to_string(),
                ));
            }
            if let Some(range) = &pkg.version_range {
                if let Err(err) = VersionRange::parse(range) {
                    problems.push(invalid(format!(
                        "versionRange is not in valid semantic versioning format: {}",
                        err
                    )));
                }
            }
            for (j, channel) in pkg.channels.iter().enumerate() {
                let invalid_channel = |problem: String| {
                    invalid(format!(
                        "channel {:?} at index [{}] is invalid: {}",
                        channel.name, j, problem
                    ))
                };

                if channel.name.is_empty() {
                    problems.push(invalid_channel("name must be specified".to_string()));
                }
                if let Some(range) = &channel.version_range {
                    if pkg.version_range.is_some() {
                        problems.push(invalid(format!(
                            "package specifies a versionRange, while channel {:?} at index [{}] equally specifies one: package.VersionRange and channel.VersionRange are exclusive",
                            channel.name, j
                        )));
                    }
                    if let Err(err) = VersionRange::parse(range) {
                        problems.push(invalid_channel(format!(
                            "versionRange is not in valid semantic versioning format: {}",
                            err
                        )));
                    }
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_YAML: &str = r#"
apiVersion: olm.operatorframework.io/filter/mirror/v1alpha1
kind: FilterConfiguration
packages:
  - name: 3scale-operator
    defaultChannel: threescale-2.11
    channels:
      - name: threescale-2.11
        versionRange: ">=0.8.1 <=0.8.3"
  - name: devworkspace-operator
    versionRange: ">=0.18.1"
  - name: jaeger-product
    bundles:
      - name: jaeger-operator.v1.51.0-1
"#;

    #[test]
    fn test_load_valid() {
        let config = load_filter_configuration(VALID_YAML.as_bytes()).unwrap();
        assert_eq!(config.api_version, FILTER_API_VERSION);
        assert_eq!(config.kind, FILTER_KIND);
        assert_eq!(config.packages.len(), 3);
        assert_eq!(
            config.packages[0].default_channel.as_deref(),
            Some("threescale-2.11")
        );
        assert_eq!(
            config.packages[0].channels[0].version_range.as_deref(),
            Some(">=0.8.1 <=0.8.3")
        );
        assert_eq!(config.packages[2].bundles[0].name, "jaeger-operator.v1.51.0-1");
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = load_filter_configuration(VALID_YAML.as_bytes()).unwrap();
        let reparsed = FilterConfiguration::from_yaml(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(reparsed, config);
    }

    fn base_config() -> FilterConfiguration {
        FilterConfiguration {
            api_version: FILTER_API_VERSION.to_string(),
            kind: FILTER_KIND.to_string(),
            packages: Vec::new(),
        }
    }

    #[test]
    fn test_unexpected_api_version_and_kind() {
        let config = FilterConfiguration {
            api_version: "example.com/v1".to_string(),
            kind: "Nonsense".to_string(),
            packages: Vec::new(),
        };
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("unexpected API version \"example.com/v1\""));
        assert!(err.contains("unexpected kind \"Nonsense\""));
    }

    #[test]
    fn test_name_must_be_specified() {
        let mut config = base_config();
        config.packages.push(PackageFilter::default());
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("package \"\" at index [0] is invalid: name must be specified"));
    }

    #[test]
    fn test_bundles_exclusive_with_channels_and_range() {
        let mut config = base_config();
        config.packages.push(PackageFilter {
            name: "pkg".to_string(),
            bundles: vec![SelectedBundle { name: "pkg.v1".to_string() }],
            channels: vec![ChannelFilter { name: "stable".to_string(), version_range: None }],
            ..Default::default()
        });
        config.packages.push(PackageFilter {
            name: "pkg2".to_string(),
            bundles: vec![SelectedBundle { name: "pkg2.v1".to_string() }],
            version_range: Some(">=1.0.0".to_string()),
            ..Default::default()
        });
        let err = config.validate().unwrap_err().to_string();
        assert_eq!(
            err.matches("mixing both filtering by bundles and filtering by channels or versionRange is not allowed")
                .count(),
            2
        );
    }

    #[test]
    fn test_invalid_version_ranges() {
        let mut config = base_config();
        config.packages.push(PackageFilter {
            name: "pkg".to_string(),
            version_range: Some("something-isnt-right".to_string()),
            ..Default::default()
        });
        config.packages.push(PackageFilter {
            name: "pkg2".to_string(),
            channels: vec![ChannelFilter {
                name: "stable".to_string(),
                version_range: Some(">>nope".to_string()),
            }],
            ..Default::default()
        });
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains(
            "package \"pkg\" at index [0] is invalid: versionRange is not in valid semantic versioning format"
        ));
        assert!(err.contains(
            "channel \"stable\" at index [0] is invalid: versionRange is not in valid semantic versioning format"
        ));
    }

    #[test]
    fn test_channel_name_must_be_specified() {
        let mut config = base_config();
        config.packages.push(PackageFilter {
            name: "pkg".to_string(),
            channels: vec![ChannelFilter::default()],
            ..Default::default()
        });
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("channel \"\" at index [0] is invalid: name must be specified"));
    }

    #[test]
    fn test_package_and_channel_ranges_are_exclusive() {
        let mut config = base_config();
        config.packages.push(PackageFilter {
            name: "pkg".to_string(),
            version_range: Some(">=1.0.0".to_string()),
            channels: vec![ChannelFilter {
                name: "stable".to_string(),
                version_range: Some("<2.0.0".to_string()),
            }],
            ..Default::default()
        });
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("package.VersionRange and channel.VersionRange are exclusive"));
    }

    #[test]
    fn test_load_rejects_invalid_document() {
        let yaml = r#"
apiVersion: olm.operatorframework.io/filter/mirror/v1alpha1
kind: FilterConfiguration
packages:
  - name: ""
"#;
        let err = load_filter_configuration(yaml.as_bytes()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
