// src/ingest/config.rs
//! Ordered list of enabled sources. Order matters: when two sources report the
//! same story, the one listed first is kept.
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const ENV_PATH: &str = "TRENDS_SOURCES_PATH";

/// Registry order used when no sources file is present.
pub const DEFAULT_SOURCES: &[&str] = &[
    "hacker_news",
    "github",
    "reddit",
    "techcrunch",
    "stack_overflow",
    "dev_to",
    "lobsters",
    "slashdot",
    "bbc",
    "youtube",
    "ars_technica",
    "wired",
    "goodreads",
    "steam_charts",
    "spotify_charts",
];

/// Load the source list from an explicit path. Supports TOML or JSON formats.
pub fn load_sources_from(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, ext.as_str())
}

/// Load the source list using env var + fallbacks:
/// 1) $TRENDS_SOURCES_PATH
/// 2) config/sources.toml
/// 3) config/sources.json
/// 4) [`DEFAULT_SOURCES`]
pub fn load_sources_default() -> Result<Vec<String>> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        } else {
            return Err(anyhow!("{ENV_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/sources.toml");
    if toml_p.exists() {
        return load_sources_from(&toml_p);
    }
    let json_p = PathBuf::from("config/sources.json");
    if json_p.exists() {
        return load_sources_from(&json_p);
    }
    Ok(DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect())
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<Vec<String>> {
    if hint_ext == "toml" {
        return parse_toml(s);
    }
    if hint_ext == "json" {
        return parse_json(s);
    }
    parse_json(s)
        .or_else(|_| parse_toml(s))
        .map_err(|_| anyhow!("unsupported sources format"))
}

fn parse_toml(s: &str) -> Result<Vec<String>> {
    #[derive(serde::Deserialize)]
    struct TomlSources {
        sources: Vec<String>,
    }
    let v: TomlSources = toml::from_str(s).context("parsing sources toml")?;
    Ok(clean_list(v.sources))
}

fn parse_json(s: &str) -> Result<Vec<String>> {
    let v: Vec<String> = serde_json::from_str(s).context("parsing sources json")?;
    Ok(clean_list(v))
}

/// Trim, drop blanks, and drop repeats keeping the first position.
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim().to_ascii_lowercase();
        if !t.is_empty() && seen.insert(t.clone()) {
            out.push(t);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn order_is_kept_and_repeats_dropped() {
        let toml = r#"sources = [" reddit ", "", "hacker_news", "Reddit"]"#;
        let json = r#"["github", "  wired  ", ""]"#;
        assert_eq!(
            parse_toml(toml).unwrap(),
            vec!["reddit".to_string(), "hacker_news".to_string()]
        );
        assert_eq!(
            parse_json(json).unwrap(),
            vec!["github".to_string(), "wired".to_string()]
        );
        assert!(parse_sources("not a list", "").is_err());
    }

    #[test]
    fn shipped_sources_file_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/sources.toml");
        assert_eq!(load_sources_from(&path).unwrap(), DEFAULT_SOURCES);
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        // Isolate CWD so the repo's own config/ does not interfere
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_PATH);

        let v = load_sources_default().unwrap();
        assert_eq!(v.len(), DEFAULT_SOURCES.len());
        assert_eq!(v[0], "hacker_news");

        fs::create_dir(tmp.path().join("config")).unwrap();
        fs::write(tmp.path().join("config/sources.toml"), r#"sources = ["wired"]"#).unwrap();
        assert_eq!(load_sources_default().unwrap(), vec!["wired".to_string()]);

        let p_json = tmp.path().join("sources.json");
        fs::write(&p_json, r#"["steam_charts", "github"]"#).unwrap();
        env::set_var(ENV_PATH, p_json.display().to_string());
        assert_eq!(
            load_sources_default().unwrap(),
            vec!["steam_charts".to_string(), "github".to_string()]
        );

        env::set_var(ENV_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(load_sources_default().is_err());
        env::remove_var(ENV_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
