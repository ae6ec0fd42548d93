use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Presentation,
    Business,
    Data,
}

impl Layer {
    pub fn all() -> [Layer; 3] {
        [Layer::Presentation, Layer::Business, Layer::Data]
    }

    /// Layers this layer may import from when nothing is configured.
    pub fn default_permitted(self) -> Vec<Layer> {
        match self {
            Layer::Presentation => vec![Layer::Presentation, Layer::Business],
            Layer::Business => vec![Layer::Business, Layer::Data],
            Layer::Data => vec![Layer::Data],
        }
    }

    pub fn default_patterns(self) -> Vec<String> {
        let patterns: &[&str] = match self {
            Layer::Presentation => &[
                "**/views/**",
                "**/view/**",
                "**/controllers/**",
                "**/components/**",
                "**/pages/**",
                "**/routes/**",
                "**/handlers/**",
                "**/templates/**",
                "**/ui/**",
                "**/views.py",
            ],
            Layer::Business => &[
                "**/services/**",
                "**/service/**",
                "**/domain/**",
                "**/usecases/**",
                "**/use_cases/**",
                "**/business/**",
                "**/core/**",
                "**/services.py",
            ],
            Layer::Data => &[
                "**/models/**",
                "**/repositories/**",
                "**/repository/**",
                "**/db/**",
                "**/database/**",
                "**/dal/**",
                "**/data/**",
                "**/entities/**",
                "**/models.py",
            ],
        };
        patterns.iter().map(|p| p.to_string()).collect()
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Layer::Presentation => write!(f, "presentation"),
            Layer::Business => write!(f, "business"),
            Layer::Data => write!(f, "data"),
        }
    }
}

impl std::str::FromStr for Layer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "presentation" | "ui" => Ok(Layer::Presentation),
            "business" | "domain" => Ok(Layer::Business),
            "data" | "persistence" => Ok(Layer::Data),
            _ => Err(format!("Unknown layer: {}", s)),
        }
    }
}

/// Ordered glob patterns per layer. The first layer with a matching pattern wins.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerMap {
    entries: Vec<(Layer, Vec<String>)>,
}

impl LayerMap {
    pub fn new(entries: Vec<(Layer, Vec<String>)>) -> Self {
        Self { entries }
    }

    pub fn classify(&self, path: &Path) -> Option<Layer> {
        let path_str = path.to_string_lossy();
        self.entries
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|p| glob_match(p, &path_str)))
            .map(|(layer, _)| *layer)
    }

    pub fn patterns(&self, layer: Layer) -> &[String] {
        self.entries
            .iter()
            .find(|(l, _)| *l == layer)
            .map(|(_, p)| p.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|(_, p)| p.is_empty())
    }
}

impl Default for LayerMap {
    fn default() -> Self {
        Self::new(
            Layer::all()
                .into_iter()
                .map(|l| (l, l.default_patterns()))
                .collect(),
        )
    }
}

/// Simple glob matching supporting ** and * wildcards.
/// This is language-independent - just path pattern matching.
pub fn glob_match(pattern: &str, path: &str) -> bool {
    // Normalize path separators
    let path = path.replace('\\', "/");
    let pattern = pattern.replace('\\', "/");

    glob_match_recursive(&pattern, &path)
}

fn glob_match_recursive(pattern: &str, path: &str) -> bool {
    // ** spans any number of path segments
    if let Some(pos) = pattern.find("**") {
        let prefix = &pattern[..pos];
        let suffix = &pattern[pos + 2..];
        let suffix = suffix.strip_prefix('/').unwrap_or(suffix);

        if !prefix.is_empty() && !path.starts_with(prefix) {
            return false;
        }

        let remaining = &path[prefix.len()..];
        if suffix.is_empty() {
            return true;
        }

        // Only try suffix matches at segment starts
        if glob_match_recursive(suffix, remaining) {
            return true;
        }
        for (i, c) in remaining.char_indices() {
            if c == '/' && glob_match_recursive(suffix, &remaining[i + 1..]) {
                return true;
            }
        }
        false
    } else if let Some(pos) = pattern.find('*') {
        let prefix = &pattern[..pos];
        let suffix = &pattern[pos + 1..];

        if !path.starts_with(prefix) {
            return false;
        }

        let remaining = &path[prefix.len()..];

        // * doesn't match path separators
        for (i, c) in remaining.char_indices() {
            if glob_match_recursive(suffix, &remaining[i..]) {
                return true;
            }
            if c == '/' {
                return false;
            }
        }
        glob_match_recursive(suffix, "")
    } else {
        pattern == path || path.ends_with(&format!("/{}", pattern))
    }
}

/// Reject patterns the matcher cannot interpret.
pub fn validate_glob(pattern: &str) -> Result<(), String> {
    if pattern.trim().is_empty() {
        return Err("empty pattern".to_string());
    }
    if pattern.contains("***") {
        return Err(format!("'{}' contains '***'", pattern));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("**/views/**", "app/views/home.py"));
        assert!(glob_match("**/views/**", "views/home.py"));
        assert!(glob_match("src/**/db.py", "src/db.py"));
        assert!(glob_match("src/**/db.py", "src/a/b/db.py"));

        assert!(glob_match("*.py", "db.py"));
        assert!(glob_match("src/*.ts", "src/app.ts"));
        assert!(!glob_match("src/*.ts", "src/ui/app.ts"));

        assert!(!glob_match("**/views/**", "app/reviews/home.py"));
        assert!(!glob_match("**/db/**", "src/database.rs"));
        assert!(glob_match("**/models.py", "shop/models.py"));
    }

    #[test]
    fn test_classify_first_match_wins() {
        let map = LayerMap::default();
        assert_eq!(
            map.classify(Path::new("app/views/user.py")),
            Some(Layer::Presentation)
        );
        assert_eq!(
            map.classify(Path::new("app/services/billing.ts")),
            Some(Layer::Business)
        );
        assert_eq!(
            map.classify(Path::new("app/repositories/user_repo.py")),
            Some(Layer::Data)
        );
        assert_eq!(map.classify(Path::new("scripts/seed.py")), None);
    }

    #[test]
    fn test_layer_parse() {
        assert_eq!("Presentation".parse::<Layer>().unwrap(), Layer::Presentation);
        assert!("infra".parse::<Layer>().is_err());
    }

    #[test]
    fn test_validate_glob() {
        assert!(validate_glob("**/x/**").is_ok());
        assert!(validate_glob("  ").is_err());
        assert!(validate_glob("a/***/b").is_err());
    }
}
