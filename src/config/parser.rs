//! Bundle parser for locating and loading bundle files.
//!
//! This module resolves which `.dab` file and stack name a command refers to,
//! loads the bundle JSON and the optional `.env` file next to it.

use crate::error::{ConfigError, Result, WhaleprintError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::{Bundlefile, Stack};

/// Bundle file extension.
pub const BUNDLE_EXTENSION: &str = "dab";

/// Where a bundle lives and which stack it deploys into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleLocation {
    /// Stack name.
    pub stack: String,
    /// Path to the bundle file.
    pub path: PathBuf,
}

/// Parser for loading bundle files.
#[derive(Debug, Default)]
pub struct BundleParser {
    /// Directory bundles and `.env` are resolved against.
    base_path: Option<PathBuf>,
}

impl BundleParser {
    /// Creates a new bundle parser rooted at the current directory.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    fn base_dir(&self) -> PathBuf {
        self.base_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Resolves the bundle file and stack name from command arguments.
    ///
    /// An explicit file wins and names the stack after its file stem. A stack
    /// name alone implies `<stack>.dab`. With neither, the base directory must
    /// hold exactly one bundle file.
    ///
    /// # Errors
    ///
    /// Returns an error for remote locations or when no single bundle can be
    /// chosen.
    pub fn resolve(&self, stack: Option<&str>, file: Option<&str>) -> Result<BundleLocation> {
        if let Some(file) = file {
            reject_remote(file)?;
            let path = self.base_dir().join(file);
            let stack = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| ConfigError::validation("bundle file has no name", "file"))?;
            return Ok(BundleLocation { stack, path });
        }

        if let Some(stack) = stack {
            let file = format!("{stack}.{BUNDLE_EXTENSION}");
            reject_remote(&file)?;
            return Ok(BundleLocation {
                stack: stack.to_string(),
                path: self.base_dir().join(file),
            });
        }

        let path = find_bundle_file(self.base_dir())?;
        let stack = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(BundleLocation { stack, path })
    }

    /// Resolves and loads a stack, along with the `.env` file next to its bundle.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundle cannot be located, read or parsed, or if
    /// the `.env` file beside it is malformed.
    pub fn load_stack(&self, stack: Option<&str>, file: Option<&str>) -> Result<Stack> {
        let location = self.resolve(stack, file)?;

        if let Some(dir) = location.path.parent() {
            Self::new().with_base_path(dir).load_dotenv()?;
        }

        let bundle = self.load_file(&location.path)?;
        debug!("Loaded stack {} from {}", location.stack, location.path.display());
        Ok(Stack {
            name: location.stack,
            bundle,
        })
    }

    /// Loads a bundle from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Bundlefile> {
        let path = path.as_ref();
        info!("Loading bundle from: {}", path.display());

        if !path.exists() {
            return Err(WhaleprintError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            WhaleprintError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_json(&content, Some(path))
    }

    /// Parses a bundle from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid.
    pub fn parse_json(&self, content: &str, source: Option<&Path>) -> Result<Bundlefile> {
        debug!("Parsing bundle JSON");

        let bundle: Bundlefile = serde_json::from_str(content).map_err(|e| {
            let location = source.map(|p| format!("{}:{}:{}", p.display(), e.line(), e.column()));
            WhaleprintError::Config(ConfigError::ParseError {
                message: format!("JSON parse error: {e}"),
                location,
            })
        })?;

        debug!("Parsed bundle with {} services", bundle.services.len());
        Ok(bundle)
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self.base_dir().join(".env");

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                WhaleprintError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Fails for absolute URLs; only local files are supported.
fn reject_remote(location: &str) -> Result<()> {
    match reqwest::Url::parse(location) {
        Ok(url) if url.scheme().len() > 1 => Err(WhaleprintError::Config(
            ConfigError::RemoteBundleUnsupported {
                url: location.to_string(),
            },
        )),
        _ => Ok(()),
    }
}

/// Finds the single bundle file in a directory.
///
/// # Errors
///
/// Returns an error if the directory holds no bundle or more than one.
pub fn find_bundle_file(dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == BUNDLE_EXTENSION))
        .collect();
    candidates.sort();

    match candidates.len() {
        0 => Err(WhaleprintError::Config(ConfigError::NoBundleFound {
            dir: dir.to_path_buf(),
        })),
        1 => {
            let path = candidates.remove(0);
            info!("Found bundle file: {}", path.display());
            Ok(path)
        }
        _ => Err(WhaleprintError::Config(ConfigError::AmbiguousBundle {
            candidates: candidates
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(", "),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BUNDLE: &str = r#"{"Version":"0.1","Services":{"web":{"Image":"nginx"}}}"#;

    #[test]
    fn test_file_flag_names_the_stack() {
        let parser = BundleParser::new().with_base_path("/work");
        let location = parser.resolve(Some("ignored"), Some("bundles/shop.dab")).unwrap();

        assert_eq!(location.stack, "shop");
        assert_eq!(location.path, PathBuf::from("/work/bundles/shop.dab"));
    }

    #[test]
    fn test_stack_name_implies_file() {
        let parser = BundleParser::new().with_base_path("/work");
        let location = parser.resolve(Some("shop"), None).unwrap();

        assert_eq!(location.path, PathBuf::from("/work/shop.dab"));
    }

    #[test]
    fn test_single_bundle_in_directory_is_found() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("shop.dab"), BUNDLE).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let stack = BundleParser::new()
            .with_base_path(dir.path())
            .load_stack(None, None)
            .unwrap();

        assert_eq!(stack.name, "shop");
        assert_eq!(stack.bundle.services["web"].image, "nginx");
    }

    #[test]
    fn test_multiple_bundles_are_ambiguous() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.dab"), BUNDLE).unwrap();
        std::fs::write(dir.path().join("b.dab"), BUNDLE).unwrap();

        let err = find_bundle_file(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            WhaleprintError::Config(ConfigError::AmbiguousBundle { ref candidates })
                if candidates == "a.dab, b.dab"
        ));
    }

    #[test]
    fn test_empty_directory_has_no_bundle() {
        let dir = TempDir::new().unwrap();
        let err = find_bundle_file(dir.path()).unwrap_err();

        assert!(matches!(err, WhaleprintError::Config(ConfigError::NoBundleFound { .. })));
    }

    #[test]
    fn test_remote_bundle_is_rejected() {
        let err = BundleParser::new()
            .resolve(None, Some("https://example.com/shop.dab"))
            .unwrap_err();

        assert!(matches!(
            err,
            WhaleprintError::Config(ConfigError::RemoteBundleUnsupported { .. })
        ));
    }

    #[test]
    fn test_dotenv_beside_bundle_is_loaded() {
        let dir = TempDir::new().unwrap();
        let bundles = dir.path().join("bundles");
        std::fs::create_dir(&bundles).unwrap();
        std::fs::write(bundles.join("shop.dab"), BUNDLE).unwrap();
        let dotenv = "WHALEPRINT_PARSER_DOTENV_MARKER=beside\n";
        std::fs::write(bundles.join(".env"), dotenv).unwrap();

        let stack = BundleParser::new()
            .with_base_path(dir.path())
            .load_stack(None, Some("bundles/shop.dab"))
            .unwrap();

        assert_eq!(stack.name, "shop");
        assert_eq!(
            std::env::var("WHALEPRINT_PARSER_DOTENV_MARKER").as_deref(),
            Ok("beside")
        );
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = BundleParser::new()
            .with_base_path(dir.path())
            .load_stack(Some("nope"), None)
            .unwrap_err();

        assert!(matches!(err, WhaleprintError::Config(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_parse_error_carries_location() {
        let err = BundleParser::new()
            .parse_json("{\"Services\": [", Some(Path::new("shop.dab")))
            .unwrap_err();

        let WhaleprintError::Config(ConfigError::ParseError { location, .. }) = err else {
            panic!("expected a parse error");
        };
        assert!(location.unwrap().starts_with("shop.dab:1:"));
    }
}
