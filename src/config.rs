use crate::model::{Layer, LayerMap, validate_glob};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE: &str = ".archaudit.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value for `{key}`: {message}")]
    Invalid { key: String, message: String },
    #[error("Unknown layer `{0}` (expected presentation, business or data)")]
    UnknownLayer(String),
}

impl ConfigError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelfLoopPolicy {
    /// Record a module importing itself as a one-node cycle.
    Report,
    /// Drop self-edges while building the graph.
    Suppress,
}

impl std::str::FromStr for SelfLoopPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "report" => Ok(SelfLoopPolicy::Report),
            "suppress" => Ok(SelfLoopPolicy::Suppress),
            _ => Err(format!("Unknown self-loop policy: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub thresholds: Thresholds,
    pub self_loops: SelfLoopPolicy,
    pub layers: LayerMap,
    pub layer_dependencies: HashMap<Layer, Vec<Layer>>,
    pub dip_markers: Vec<String>,
    pub business_markers: Vec<String>,
    pub exclude: Vec<String>,
    /// Expected-patterns document, relative to the project root.
    pub expected_patterns: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    pub max_class_loc: usize,
    pub max_method_count: usize,
    pub max_fan_out: usize,
    pub max_fan_in: usize,
    pub long_method_lines: usize,
    pub complex_method_branches: usize,
    pub lcom_threshold: f64,
    pub strategy_branch_threshold: usize,
    pub fat_interface_methods: usize,
    pub stub_method_min: usize,
    pub magic_number_min_occurrences: usize,
    pub factory_min_instantiations: usize,
    pub factory_min_arguments: usize,
    pub max_chain_depth: usize,
    pub max_file_bytes: usize,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    thresholds: Option<RawThresholds>,
    graph: Option<RawGraph>,
    layers: Option<BTreeMap<String, Vec<String>>>,
    layer_dependencies: Option<BTreeMap<String, Vec<String>>>,
    dip: Option<RawMarkers>,
    business_logic: Option<RawMarkers>,
    drift: Option<RawDrift>,
    exclude: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawThresholds {
    max_class_loc: Option<usize>,
    max_method_count: Option<usize>,
    max_fan_out: Option<usize>,
    max_fan_in: Option<usize>,
    long_method_lines: Option<usize>,
    complex_method_branches: Option<usize>,
    lcom_threshold: Option<f64>,
    strategy_branch_threshold: Option<usize>,
    fat_interface_methods: Option<usize>,
    stub_method_min: Option<usize>,
    magic_number_min_occurrences: Option<usize>,
    factory_min_instantiations: Option<usize>,
    factory_min_arguments: Option<usize>,
    max_chain_depth: Option<usize>,
    max_file_bytes: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawGraph {
    self_loops: Option<SelfLoopPolicy>,
}

#[derive(Debug, Deserialize)]
struct RawMarkers {
    markers: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawDrift {
    expected_patterns: Option<PathBuf>,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_class_loc: 500,
            max_method_count: 10,
            max_fan_out: 10,
            max_fan_in: 15,
            long_method_lines: 50,
            complex_method_branches: 10,
            lcom_threshold: 0.8,
            strategy_branch_threshold: 5,
            fat_interface_methods: 10,
            stub_method_min: 2,
            magic_number_min_occurrences: 3,
            factory_min_instantiations: 3,
            factory_min_arguments: 5,
            max_chain_depth: 5,
            max_file_bytes: 2_000_000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            self_loops: SelfLoopPolicy::Suppress,
            layers: LayerMap::default(),
            layer_dependencies: default_layer_dependencies(),
            dip_markers: default_dip_markers(),
            business_markers: default_business_markers(),
            exclude: default_excludes(),
            expected_patterns: None,
        }
    }
}

fn default_layer_dependencies() -> HashMap<Layer, Vec<Layer>> {
    Layer::all()
        .into_iter()
        .map(|l| (l, l.default_permitted()))
        .collect()
}

pub fn default_dip_markers() -> Vec<String> {
    [
        "db",
        "database",
        "client",
        "prisma",
        "sqlalchemy",
        "psycopg2",
        "pymongo",
        "mysql",
        "sqlite3",
        "redis",
        "mongoose",
        "sequelize",
        "typeorm",
        "knex",
        "pg",
        "boto3",
        "requests",
        "axios",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub fn default_business_markers() -> Vec<String> {
    [
        "validate",
        "validation",
        "is_valid",
        "isValid",
        "calculate",
        "apply_discount",
        "applyDiscount",
        "check_permission",
        "checkPermission",
        "business_rule",
        "ValidationError",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_excludes() -> Vec<String> {
    [
        "**/node_modules/**",
        "**/.venv/**",
        "**/venv/**",
        "**/__pycache__/**",
        "**/dist/**",
        "**/build/**",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Config {
    /// Load `.archaudit.toml` from the project root, or defaults when absent.
    pub fn load(project_path: &Path) -> Result<Self, ConfigError> {
        let config_path = project_path.join(CONFIG_FILE);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_file(&config_path)
    }

    pub fn load_file(config_path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(config_path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content)?;
        let defaults = Thresholds::default();

        let thresholds = match raw.thresholds {
            Some(t) => Thresholds {
                max_class_loc: t.max_class_loc.unwrap_or(defaults.max_class_loc),
                max_method_count: t.max_method_count.unwrap_or(defaults.max_method_count),
                max_fan_out: t.max_fan_out.unwrap_or(defaults.max_fan_out),
                max_fan_in: t.max_fan_in.unwrap_or(defaults.max_fan_in),
                long_method_lines: t.long_method_lines.unwrap_or(defaults.long_method_lines),
                complex_method_branches: t
                    .complex_method_branches
                    .unwrap_or(defaults.complex_method_branches),
                lcom_threshold: t.lcom_threshold.unwrap_or(defaults.lcom_threshold),
                strategy_branch_threshold: t
                    .strategy_branch_threshold
                    .unwrap_or(defaults.strategy_branch_threshold),
                fat_interface_methods: t
                    .fat_interface_methods
                    .unwrap_or(defaults.fat_interface_methods),
                stub_method_min: t.stub_method_min.unwrap_or(defaults.stub_method_min),
                magic_number_min_occurrences: t
                    .magic_number_min_occurrences
                    .unwrap_or(defaults.magic_number_min_occurrences),
                factory_min_instantiations: t
                    .factory_min_instantiations
                    .unwrap_or(defaults.factory_min_instantiations),
                factory_min_arguments: t
                    .factory_min_arguments
                    .unwrap_or(defaults.factory_min_arguments),
                max_chain_depth: t.max_chain_depth.unwrap_or(defaults.max_chain_depth),
                max_file_bytes: t.max_file_bytes.unwrap_or(defaults.max_file_bytes),
            },
            None => defaults,
        };

        let layers = match raw.layers {
            Some(map) => {
                let mut entries: HashMap<Layer, Vec<String>> = HashMap::new();
                for (name, patterns) in map {
                    let layer: Layer = name.parse().map_err(|_| ConfigError::UnknownLayer(name))?;
                    entries.insert(layer, patterns);
                }
                // Layers missing from the file keep their default patterns
                LayerMap::new(
                    Layer::all()
                        .into_iter()
                        .map(|l| {
                            let patterns = entries.remove(&l).unwrap_or_else(|| l.default_patterns());
                            (l, patterns)
                        })
                        .collect(),
                )
            }
            None => LayerMap::default(),
        };

        let mut layer_dependencies = default_layer_dependencies();
        if let Some(map) = raw.layer_dependencies {
            for (name, allowed) in map {
                let layer: Layer = name.parse().map_err(|_| ConfigError::UnknownLayer(name))?;
                let allowed = allowed
                    .into_iter()
                    .map(|a| a.parse::<Layer>().map_err(|_| ConfigError::UnknownLayer(a)))
                    .collect::<Result<Vec<_>, _>>()?;
                layer_dependencies.insert(layer, allowed);
            }
        }

        let config = Self {
            thresholds,
            self_loops: raw
                .graph
                .and_then(|g| g.self_loops)
                .unwrap_or(SelfLoopPolicy::Suppress),
            layers,
            layer_dependencies,
            dip_markers: raw
                .dip
                .and_then(|d| d.markers)
                .unwrap_or_else(default_dip_markers),
            business_markers: raw
                .business_logic
                .and_then(|b| b.markers)
                .unwrap_or_else(default_business_markers),
            exclude: raw.exclude.unwrap_or_else(default_excludes),
            expected_patterns: raw.drift.and_then(|d| d.expected_patterns),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would silently change what gets flagged.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.thresholds;
        let positive = [
            ("thresholds.max_class_loc", t.max_class_loc),
            ("thresholds.max_method_count", t.max_method_count),
            ("thresholds.max_fan_out", t.max_fan_out),
            ("thresholds.max_fan_in", t.max_fan_in),
            ("thresholds.long_method_lines", t.long_method_lines),
            ("thresholds.complex_method_branches", t.complex_method_branches),
            ("thresholds.strategy_branch_threshold", t.strategy_branch_threshold),
            ("thresholds.fat_interface_methods", t.fat_interface_methods),
            ("thresholds.stub_method_min", t.stub_method_min),
            (
                "thresholds.magic_number_min_occurrences",
                t.magic_number_min_occurrences,
            ),
            (
                "thresholds.factory_min_instantiations",
                t.factory_min_instantiations,
            ),
            ("thresholds.factory_min_arguments", t.factory_min_arguments),
            ("thresholds.max_chain_depth", t.max_chain_depth),
            ("thresholds.max_file_bytes", t.max_file_bytes),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::invalid(key, "must be greater than 0"));
            }
        }

        if !(t.lcom_threshold > 0.0 && t.lcom_threshold <= 1.0) {
            return Err(ConfigError::invalid(
                "thresholds.lcom_threshold",
                format!("{} is outside (0, 1]", t.lcom_threshold),
            ));
        }

        for layer in Layer::all() {
            for pattern in self.layers.patterns(layer) {
                validate_glob(pattern)
                    .map_err(|e| ConfigError::invalid(&format!("layers.{}", layer), e))?;
            }
        }
        for pattern in &self.exclude {
            validate_glob(pattern).map_err(|e| ConfigError::invalid("exclude", e))?;
        }

        // An empty alternative matches every line
        let marker_lists = [
            ("dip.markers", &self.dip_markers),
            ("business_logic.markers", &self.business_markers),
        ];
        for (key, markers) in marker_lists {
            if markers.is_empty() {
                return Err(ConfigError::invalid(key, "at least one marker is required"));
            }
            if markers.iter().any(|m| m.trim().is_empty()) {
                return Err(ConfigError::invalid(key, "markers must be non-empty"));
            }
        }

        Ok(())
    }

    pub fn permitted_layers(&self, layer: Layer) -> Vec<Layer> {
        self.layer_dependencies
            .get(&layer)
            .cloned()
            .unwrap_or_else(|| layer.default_permitted())
    }
}

/// Starter configuration written by `archaudit init`.
pub fn starter_config() -> String {
    let t = Thresholds::default();
    let layer_block: String = Layer::all()
        .into_iter()
        .map(|l| {
            let patterns: Vec<_> = l
                .default_patterns()
                .iter()
                .map(|p| format!("\"{}\"", p))
                .collect();
            format!("{} = [{}]\n", l, patterns.join(", "))
        })
        .collect();

    format!(
        r#"# archaudit configuration. Every key is optional.

[thresholds]
max_class_loc = {}
max_method_count = {}
max_fan_out = {}
max_fan_in = {}
long_method_lines = {}
complex_method_branches = {}
lcom_threshold = {}
strategy_branch_threshold = {}
max_chain_depth = {}

[graph]
# "report" flags a module importing itself; "suppress" drops the edge
self_loops = "suppress"

[layers]
{}
[layer_dependencies]
presentation = ["presentation", "business"]
business = ["business", "data"]
data = ["data"]

# [drift]
# expected_patterns = "docs/expected-patterns.toml"
"#,
        t.max_class_loc,
        t.max_method_count,
        t.max_fan_out,
        t.max_fan_in,
        t.long_method_lines,
        t.complex_method_branches,
        t.lcom_threshold,
        t.strategy_branch_threshold,
        t.max_chain_depth,
        layer_block,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_fall_back() {
        let config = Config::from_toml("[thresholds]\nmax_class_loc = 300\n").unwrap();
        assert_eq!(config.thresholds.max_class_loc, 300);
        assert_eq!(config.thresholds.max_method_count, 10);
        assert_eq!(config.self_loops, SelfLoopPolicy::Suppress);
        assert!(!config.layers.is_empty());
    }

    #[test]
    fn test_empty_file_is_default() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.thresholds, Thresholds::default());
    }

    #[test]
    fn test_zero_threshold_is_fatal() {
        let err = Config::from_toml("[thresholds]\nmax_fan_out = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "thresholds.max_fan_out"));
    }

    #[test]
    fn test_zero_factory_arguments_is_fatal() {
        let err = Config::from_toml("[thresholds]\nfactory_min_arguments = 0\n").unwrap_err();
        assert!(
            matches!(err, ConfigError::Invalid { ref key, .. } if key == "thresholds.factory_min_arguments")
        );
    }

    #[test]
    fn test_empty_marker_lists_rejected() {
        let err = Config::from_toml("[dip]\nmarkers = []\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "dip.markers"));

        let err = Config::from_toml("[business_logic]\nmarkers = []\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "business_logic.markers"));

        let err = Config::from_toml("[business_logic]\nmarkers = [\"validate\", \" \"]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "business_logic.markers"));
    }

    #[test]
    fn test_lcom_out_of_range() {
        assert!(Config::from_toml("[thresholds]\nlcom_threshold = 1.5\n").is_err());
    }

    #[test]
    fn test_unknown_layer_rejected() {
        let err = Config::from_toml("[layers]\ninfra = [\"**/infra/**\"]\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownLayer(ref l) if l == "infra"));
    }

    #[test]
    fn test_layer_override_keeps_other_defaults() {
        let config =
            Config::from_toml("[layers]\npresentation = [\"web/**\"]\n[graph]\nself_loops = \"report\"\n")
                .unwrap();
        assert_eq!(config.layers.patterns(Layer::Presentation), ["web/**"]);
        assert!(!config.layers.patterns(Layer::Data).is_empty());
        assert_eq!(config.self_loops, SelfLoopPolicy::Report);
    }

    #[test]
    fn test_wrong_type_is_parse_error() {
        let err = Config::from_toml("[thresholds]\nmax_fan_out = \"many\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_starter_config_round_trips() {
        let config = Config::from_toml(&starter_config()).unwrap();
        assert_eq!(config.thresholds.max_class_loc, 500);
    }
}
