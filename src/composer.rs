/// Composer autoload maps.
///
/// This module reads the two autoload sources a Composer project exposes
/// without executing any PHP:
///
/// - the PSR-4 section of `composer.json` (`autoload` and `autoload-dev`)
/// - the generated classmap at `<vendor-dir>/composer/autoload_classmap.php`
///
/// # PSR-4 Resolution
///
/// Given a mapping like `"Acme\\" => "src/"`, a class name like
/// `Acme\Billing\Invoice` is resolved by:
///   1. Stripping the matching prefix (`Acme\`) from the class name
///   2. Converting remaining namespace separators to directory separators
///   3. Appending `.php`
///   4. Prepending the mapped base directory
///
/// Result: `<root>/src/Billing/Invoice.php`
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A single PSR-4 namespace-to-directory mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Psr4Mapping {
    /// The namespace prefix, always ending with `\` (e.g. `"Acme\"`), or
    /// empty for the root-namespace fallback.
    pub prefix: String,
    /// The base directory relative to the project root (e.g. `"src/"`).
    pub base_path: String,
}

/// Everything Composer knows about where classes live.
#[derive(Debug, Clone, Default)]
pub struct ComposerAutoload {
    pub root: PathBuf,
    /// Sorted longest prefix first.
    pub psr4: Vec<Psr4Mapping>,
    /// Lower-cased FQN → absolute file path.
    pub classmap: HashMap<String, PathBuf>,
}

impl ComposerAutoload {
    /// Load the autoload configuration of the project at `root`.
    ///
    /// Missing or malformed files yield empty maps; a project without
    /// Composer simply resolves nothing.
    pub fn load(root: &Path) -> Self {
        let json = read_composer_json(root);
        let vendor_dir = json
            .as_ref()
            .and_then(|j| j.pointer("/config/vendor-dir"))
            .and_then(|v| v.as_str())
            .unwrap_or("vendor");

        let psr4 = json.as_ref().map(psr4_mappings).unwrap_or_default();
        let classmap = parse_classmap_file(&root.join(vendor_dir).join("composer/autoload_classmap.php"))
            .unwrap_or_default();

        tracing::debug!(
            "composer autoload at {}: {} psr-4 prefixes, {} classmap entries",
            root.display(),
            psr4.len(),
            classmap.len()
        );

        Self {
            root: root.to_path_buf(),
            psr4,
            classmap,
        }
    }

    /// Resolve a class-like FQN to the file that declares it.  The
    /// classmap is authoritative; PSR-4 is tried afterwards.
    pub fn resolve(&self, class_name: &str) -> Option<PathBuf> {
        let name = class_name.strip_prefix('\\').unwrap_or(class_name);
        if let Some(path) = self.classmap.get(&name.to_ascii_lowercase()) {
            return Some(path.clone());
        }
        resolve_class_path(&self.psr4, &self.root, name)
    }
}

fn read_composer_json(root: &Path) -> Option<serde_json::Value> {
    let composer_path = root.join("composer.json");
    let content = std::fs::read_to_string(&composer_path).ok()?;
    match serde_json::from_str(&content) {
        Ok(json) => Some(json),
        Err(err) => {
            tracing::warn!("ignoring invalid {}: {}", composer_path.display(), err);
            None
        }
    }
}

/// Extract all PSR-4 mappings from both `autoload` and `autoload-dev`.
pub fn psr4_mappings(json: &serde_json::Value) -> Vec<Psr4Mapping> {
    let mut mappings = Vec::new();

    for section_key in ["autoload", "autoload-dev"] {
        if let Some(psr4_obj) = json
            .get(section_key)
            .and_then(|section| section.get("psr-4"))
            .and_then(|psr4| psr4.as_object())
        {
            for (prefix, paths) in psr4_obj {
                let prefix = normalise_prefix(prefix);
                let paths: Vec<&str> = match paths {
                    serde_json::Value::String(path) => vec![path.as_str()],
                    serde_json::Value::Array(arr) => arr.iter().filter_map(|p| p.as_str()).collect(),
                    _ => Vec::new(),
                };
                mappings.extend(paths.into_iter().map(|path| Psr4Mapping {
                    prefix: prefix.clone(),
                    base_path: normalise_path(path),
                }));
            }
        }
    }

    // Stable sort keeps declaration order among equal-length prefixes.
    mappings.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
    mappings
}

fn normalise_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_start_matches('\\');
    if trimmed.is_empty() || trimmed.ends_with('\\') {
        trimmed.to_string()
    } else {
        format!("{}\\", trimmed)
    }
}

/// Normalise a directory path: forward slashes and a trailing `/`.
fn normalise_path(path: &str) -> String {
    let p = path.replace('\\', "/");
    if p.ends_with('/') || p.is_empty() {
        p
    } else {
        format!("{}/", p)
    }
}

/// Resolve a class name through PSR-4 mappings.  Prefixes match
/// case-insensitively (PHP class names do); the remainder keeps its case
/// because it becomes a file path.
///
/// Returns the first candidate that exists on disk.
pub fn resolve_class_path(
    mappings: &[Psr4Mapping],
    root: &Path,
    class_name: &str,
) -> Option<PathBuf> {
    let name = class_name.strip_prefix('\\').unwrap_or(class_name);
    if name.is_empty() || is_builtin_type(name) {
        return None;
    }

    for mapping in mappings {
        let prefix_len = mapping.prefix.len();
        let matches = name.len() > prefix_len
            && name
                .get(..prefix_len)
                .is_some_and(|head| head.eq_ignore_ascii_case(&mapping.prefix));
        if !matches {
            continue;
        }

        let relative_path = name[prefix_len..].replace('\\', "/");
        let file_path = root
            .join(&mapping.base_path)
            .join(format!("{}.php", relative_path));
        if file_path.is_file() {
            return Some(file_path);
        }
    }

    None
}

/// Parse Composer's generated `autoload_classmap.php`.
///
/// The file has a fixed shape:
///
/// ```php
/// $vendorDir = dirname(__DIR__);
/// $baseDir = dirname($vendorDir);
///
/// return array(
///     'Acme\\Invoice' => $baseDir . '/src/Invoice.php',
/// );
/// ```
///
/// so it is read line by line rather than parsed.
pub fn parse_classmap_file(path: &Path) -> Option<HashMap<String, PathBuf>> {
    let content = std::fs::read_to_string(path).ok()?;
    let composer_dir = path.parent()?;
    let vendor_dir = composer_dir.parent()?;
    let base_dir = vendor_dir.parent()?;

    let mut map = HashMap::new();
    for line in content.lines() {
        let Some((key, value)) = line.trim().trim_end_matches(',').split_once("=>") else {
            continue;
        };
        let Some(class) = single_quoted(key.trim()) else {
            continue;
        };
        let value = value.trim();
        let (dir, rest) = if let Some(rest) = value.strip_prefix("$vendorDir") {
            (vendor_dir, rest)
        } else if let Some(rest) = value.strip_prefix("$baseDir") {
            (base_dir, rest)
        } else {
            continue;
        };
        let Some(relative) = rest
            .trim()
            .strip_prefix('.')
            .and_then(|r| single_quoted(r.trim()))
        else {
            continue;
        };

        let class = class.replace("\\\\", "\\");
        let file = dir.join(relative.trim_start_matches('/'));
        map.insert(class.to_ascii_lowercase(), file);
    }
    Some(map)
}

fn single_quoted(s: &str) -> Option<&str> {
    s.strip_prefix('\'')?.strip_suffix('\'')
}

/// Check if a name is a PHP built-in type (not a class).
pub fn is_builtin_type(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "self"
            | "static"
            | "parent"
            | "string"
            | "int"
            | "float"
            | "bool"
            | "array"
            | "object"
            | "mixed"
            | "void"
            | "never"
            | "null"
            | "true"
            | "false"
            | "callable"
            | "iterable"
    )
}

// ─── Tests ──────────────────────────────────────────────────────────────────
