// src/config/resolver.rs
// DOCUMENTATION: Layered configuration resolution
// PURPOSE: Resolve named settings from ordered sources (env, .env, properties)

use std::collections::HashMap;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use crate::errors::ConfigError;

/// A single place a setting can come from.
/// DOCUMENTATION: Sources are consulted in order; the first one returning a
/// non-empty value wins. Each lookup carries both key spellings because the
/// environment-style sources and the properties file use different names
/// (e.g. DB_URL vs db.url).
pub trait ConfigSource: Send + Sync {
    /// Human-readable source name for diagnostics
    fn name(&self) -> &str;

    /// Value for this key, or None if the source does not have it
    fn get(&self, env_key: &str, property_key: &str) -> Option<String>;
}

/// Process environment variables (highest priority)
pub struct EnvSource;

impl ConfigSource for EnvSource {
    fn name(&self) -> &str {
        "env"
    }

    fn get(&self, env_key: &str, _property_key: &str) -> Option<String> {
        std::env::var(env_key).ok()
    }
}

/// Developer-only `.env` override file (optional middle layer)
/// DOCUMENTATION: A missing file just disables the layer; malformed lines are
/// skipped rather than failing the load
pub struct DotenvSource {
    entries: HashMap<String, String>,
}

impl DotenvSource {
    /// Load a `.env` file, or None if the file does not exist
    pub fn from_path(path: &Path) -> Option<Self> {
        let iter = dotenv::from_path_iter(path).ok()?;
        let entries: HashMap<String, String> = iter.filter_map(Result::ok).collect();

        if entries.is_empty() {
            log::debug!(".env file at {} is empty", path.display());
        } else {
            log::info!(
                ".env file loaded from {} with {} entries",
                path.display(),
                entries.len()
            );
        }

        Some(Self { entries })
    }
}

impl ConfigSource for DotenvSource {
    fn name(&self) -> &str {
        ".env"
    }

    fn get(&self, env_key: &str, _property_key: &str) -> Option<String> {
        self.entries.get(env_key).cloned()
    }
}

/// Static `key=value` properties file (lowest priority, the defaults layer)
#[derive(Debug)]
pub struct PropertiesSource {
    entries: HashMap<String, String>,
}

impl PropertiesSource {
    /// Load a properties file.
    /// A missing file is a warning and yields an empty source; an existing
    /// file that cannot be read is fatal because the defaults layer would be
    /// silently absent.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("Properties file not found: {}", path.display());
                return Ok(Self {
                    entries: HashMap::new(),
                });
            }
            Err(e) => {
                return Err(ConfigError::PropertiesIo {
                    path: path.display().to_string(),
                    source: e,
                });
            }
        };

        let entries = Self::parse(&text);
        log::info!(
            "Loaded {} properties from {}",
            entries.len(),
            path.display()
        );
        Ok(Self { entries })
    }

    fn parse(text: &str) -> HashMap<String, String> {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
            .filter_map(|line| {
                let (key, value) = line.split_once('=')?;
                Some((key.trim().to_string(), value.trim().to_string()))
            })
            .collect()
    }

    /// Direct access by property key, ignoring the rest of the chain
    pub fn get_raw(&self, property_key: &str) -> Option<&str> {
        self.entries.get(property_key).map(String::as_str)
    }
}

impl ConfigSource for PropertiesSource {
    fn name(&self) -> &str {
        "properties"
    }

    fn get(&self, _env_key: &str, property_key: &str) -> Option<String> {
        self.entries.get(property_key).cloned()
    }
}

/// Mask sensitive values in diagnostics (passwords, secrets, tokens)
/// DOCUMENTATION: Pure function applied at every logging boundary; keyed on
/// the setting name, not the value
pub fn mask_sensitive<'a>(key: &str, value: &'a str) -> &'a str {
    let key = key.to_lowercase();
    if key.contains("password") || key.contains("secret") || key.contains("token") {
        "***"
    } else {
        value
    }
}

/// Ordered chain of configuration sources.
/// Load with ConfigResolver::load() at application startup.
pub struct ConfigResolver {
    sources: Vec<Box<dyn ConfigSource>>,
}

impl ConfigResolver {
    /// Build the default three-tier chain: process env, `.env`, then
    /// `config/application.properties`
    pub fn load() -> Result<Self, ConfigError> {
        Self::with_paths(
            Path::new(".env"),
            Path::new("config/application.properties"),
            true,
        )
    }

    /// Build the chain with explicit file locations.
    /// `load_dotenv` disables the override layer entirely (tests use this so a
    /// local `.env` cannot leak into assertions).
    pub fn with_paths(
        dotenv_path: &Path,
        properties_path: &Path,
        load_dotenv: bool,
    ) -> Result<Self, ConfigError> {
        let mut sources: Vec<Box<dyn ConfigSource>> = vec![Box::new(EnvSource)];

        if load_dotenv {
            match DotenvSource::from_path(dotenv_path) {
                Some(source) => sources.push(Box::new(source)),
                None => log::debug!(".env file not found at {}", dotenv_path.display()),
            }
        } else {
            log::debug!(".env loading disabled for this resolver");
        }

        sources.push(Box::new(PropertiesSource::load(properties_path)?));

        Ok(Self { sources })
    }

    /// Build a resolver from an explicit source chain (highest priority first)
    pub fn from_sources(sources: Vec<Box<dyn ConfigSource>>) -> Self {
        Self { sources }
    }

    /// Resolve a setting, first non-empty source wins
    pub fn get(&self, env_key: &str, property_key: &str) -> Option<String> {
        for source in &self.sources {
            if let Some(value) = source.get(env_key, property_key) {
                if value.is_empty() {
                    continue;
                }
                log::debug!(
                    "Using {}: {} = {}",
                    source.name(),
                    env_key,
                    mask_sensitive(env_key, &value)
                );
                return Some(value);
            }
        }

        log::warn!(
            "Configuration not found: env={}, property={}",
            env_key,
            property_key
        );
        None
    }

    /// Resolve a setting with a default fallback
    pub fn get_or(&self, env_key: &str, property_key: &str, default: &str) -> String {
        self.get(env_key, property_key)
            .unwrap_or_else(|| default.to_string())
    }

    /// Resolve an integer setting.
    /// A malformed value is logged and replaced by the default - never an error.
    pub fn get_int<T>(&self, env_key: &str, property_key: &str, default: T) -> T
    where
        T: FromStr + Display,
    {
        let Some(value) = self.get(env_key, property_key) else {
            return default;
        };

        match value.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                log::error!(
                    "Invalid integer value for {}/{}: {}, using default {}",
                    env_key,
                    property_key,
                    mask_sensitive(env_key, &value),
                    default
                );
                default
            }
        }
    }

    /// Resolve a boolean setting ("true"/"false", case-insensitive).
    /// A malformed value is logged and replaced by the default.
    pub fn get_bool(&self, env_key: &str, property_key: &str, default: bool) -> bool {
        let Some(value) = self.get(env_key, property_key) else {
            return default;
        };

        match value.to_lowercase().as_str() {
            "true" => true,
            "false" => false,
            other => {
                log::error!(
                    "Invalid boolean value for {}/{}: {}, using default {}",
                    env_key,
                    property_key,
                    mask_sensitive(env_key, other),
                    default
                );
                default
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::ConfigSource;
    use std::collections::HashMap;

    /// In-memory source for tests, keyed by either spelling
    pub struct MapSource {
        entries: HashMap<String, String>,
    }

    impl MapSource {
        pub fn new(pairs: &[(&str, &str)]) -> Self {
            Self {
                entries: pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            }
        }
    }

    impl ConfigSource for MapSource {
        fn name(&self) -> &str {
            "map"
        }

        fn get(&self, env_key: &str, property_key: &str) -> Option<String> {
            self.entries
                .get(env_key)
                .or_else(|| self.entries.get(property_key))
                .cloned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::MapSource;
    use super::*;
    use std::io::Write;

    fn resolver_with(sources: Vec<Box<dyn ConfigSource>>) -> ConfigResolver {
        ConfigResolver::from_sources(sources)
    }

    #[test]
    fn env_beats_properties() {
        std::env::set_var("SKYRIMGRADE_TEST_PRIORITY", "from-env");
        let resolver = resolver_with(vec![
            Box::new(EnvSource),
            Box::new(MapSource::new(&[("test.priority", "from-properties")])),
        ]);

        let value = resolver.get("SKYRIMGRADE_TEST_PRIORITY", "test.priority");
        std::env::remove_var("SKYRIMGRADE_TEST_PRIORITY");

        assert_eq!(value.as_deref(), Some("from-env"));
    }

    #[test]
    fn empty_value_falls_through_to_next_source() {
        let resolver = resolver_with(vec![
            Box::new(MapSource::new(&[("KEY", "")])),
            Box::new(MapSource::new(&[("KEY", "fallback")])),
        ]);

        assert_eq!(resolver.get("KEY", "key").as_deref(), Some("fallback"));
    }

    #[test]
    fn absent_everywhere_returns_none_and_default() {
        let resolver = resolver_with(vec![Box::new(MapSource::new(&[]))]);

        assert_eq!(resolver.get("NON_EXISTENT", "non.existent"), None);
        assert_eq!(
            resolver.get_or("NON_EXISTENT", "non.existent", "default-value"),
            "default-value"
        );
    }

    #[test]
    fn parses_integer_values() {
        let resolver = resolver_with(vec![Box::new(MapSource::new(&[("test.int", "42")]))]);

        assert_eq!(resolver.get_int("TEST_INT", "test.int", 999), 42);
    }

    #[test]
    fn malformed_integer_uses_default() {
        let resolver = resolver_with(vec![Box::new(MapSource::new(&[(
            "test.invalid.int",
            "not-a-number",
        )]))]);

        assert_eq!(resolver.get_int("INVALID_INT", "test.invalid.int", 100), 100);
    }

    #[test]
    fn missing_integer_uses_default() {
        let resolver = resolver_with(vec![Box::new(MapSource::new(&[]))]);

        assert_eq!(resolver.get_int("NON_EXISTENT", "non.existent", 100u32), 100);
    }

    #[test]
    fn parses_boolean_values() {
        let resolver = resolver_with(vec![Box::new(MapSource::new(&[
            ("test.bool.true", "true"),
            ("test.bool.false", "FALSE"),
        ]))]);

        assert!(resolver.get_bool("TEST_BOOL_TRUE", "test.bool.true", false));
        assert!(!resolver.get_bool("TEST_BOOL_FALSE", "test.bool.false", true));
    }

    #[test]
    fn malformed_boolean_uses_default() {
        let resolver = resolver_with(vec![Box::new(MapSource::new(&[("test.bool", "yes")]))]);

        assert!(resolver.get_bool("TEST_BOOL", "test.bool", true));
    }

    #[test]
    fn masks_passwords_secrets_and_tokens() {
        assert_eq!(mask_sensitive("DB_PASSWORD", "hunter2"), "***");
        assert_eq!(mask_sensitive("api.secret", "abc"), "***");
        assert_eq!(mask_sensitive("AUTH_TOKEN", "abc"), "***");
        assert_eq!(mask_sensitive("db.url", "postgres://host/db"), "postgres://host/db");
    }

    #[test]
    fn properties_parsing_skips_comments_and_blank_lines() {
        let text = "\n# comment\n! also a comment\ndb.url = postgres://host/db\n  server.port=8080  \n";
        let entries = PropertiesSource::parse(text);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries["db.url"], "postgres://host/db");
        assert_eq!(entries["server.port"], "8080");
    }

    #[test]
    fn missing_properties_file_is_empty_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let source = PropertiesSource::load(&dir.path().join("does-not-exist.properties")).unwrap();

        assert_eq!(source.get("DB_URL", "db.url"), None);
    }

    #[test]
    fn unreadable_properties_file_is_fatal() {
        // A directory at the path forces a read error that is not NotFound
        let dir = tempfile::tempdir().unwrap();
        let err = PropertiesSource::load(dir.path()).unwrap_err();

        assert!(matches!(err, ConfigError::PropertiesIo { .. }));
    }

    #[test]
    fn get_raw_reads_properties_directly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.properties");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "test.property=test-value").unwrap();

        let source = PropertiesSource::load(&path).unwrap();
        assert_eq!(source.get_raw("test.property"), Some("test-value"));
        assert_eq!(source.get_raw("non.existent"), None);
    }

    #[test]
    fn dotenv_source_skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "DB_URL=postgres://dotenv/db").unwrap();
        writeln!(file, "this line is malformed").unwrap();

        let source = DotenvSource::from_path(&path).unwrap();
        assert_eq!(
            source.get("DB_URL", "db.url").as_deref(),
            Some("postgres://dotenv/db")
        );
    }

    #[test]
    fn dotenv_source_absent_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DotenvSource::from_path(&dir.path().join(".env")).is_none());
    }
}
