// src/config/strategies.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// One discovery strategy as configured on disk.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StrategySpec {
    pub name: String,
    /// Search term; empty for a pure channel listing.
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub max_pages: Option<u32>,
}

impl StrategySpec {
    pub fn channel(username: &str) -> Self {
        Self {
            name: format!("channel:{username}"),
            query: String::new(),
            username: Some(username.to_string()),
            rating: None,
            page_size: None,
            max_pages: None,
        }
    }

    pub fn keyword(query: &str) -> Self {
        Self {
            name: format!("search:{query}"),
            query: query.to_string(),
            username: None,
            rating: None,
            page_size: None,
            max_pages: None,
        }
    }
}

/// Load strategies from an explicit path. Supports TOML (`[[strategy]]`) or a JSON array.
pub fn load_strategies_from(path: &Path) -> Result<Vec<StrategySpec>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading strategies from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_strategies(&content, ext.as_str())
}

/// Load strategies using an explicit path + fallbacks:
/// 1) `explicit` (must exist when given)
/// 2) config/strategies.toml
/// 3) config/strategies.json
///
/// No file at all is not an error: strategies then come from env keys.
pub fn load_strategies_default(explicit: Option<&Path>) -> Result<Vec<StrategySpec>> {
    if let Some(p) = explicit {
        if p.exists() {
            return load_strategies_from(p);
        } else {
            return Err(anyhow!(
                "STRATEGIES_PATH points to non-existent path {}",
                p.display()
            ));
        }
    }
    let toml_p = PathBuf::from("config/strategies.toml");
    if toml_p.exists() {
        return load_strategies_from(&toml_p);
    }
    let json_p = PathBuf::from("config/strategies.json");
    if json_p.exists() {
        return load_strategies_from(&json_p);
    }
    Ok(Vec::new())
}

fn parse_strategies(s: &str, hint_ext: &str) -> Result<Vec<StrategySpec>> {
    // Try TOML first if hinted or content looks like toml.
    let try_toml = hint_ext == "toml" || s.contains("[[strategy]]");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported strategies format"))
}

fn parse_toml(s: &str) -> Result<Vec<StrategySpec>> {
    #[derive(Deserialize)]
    struct TomlStrategies {
        #[serde(default)]
        strategy: Vec<StrategySpec>,
    }
    let v: TomlStrategies = toml::from_str(s)?;
    Ok(clean_list(v.strategy))
}

fn parse_json(s: &str) -> Result<Vec<StrategySpec>> {
    let v: Vec<StrategySpec> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

/// Trim names, drop unnamed entries and repeated names (first wins, order kept).
fn clean_list(items: Vec<StrategySpec>) -> Vec<StrategySpec> {
    use std::collections::HashSet;
    let mut names = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for mut it in items {
        it.name = it.name.trim().to_string();
        it.query = it.query.trim().to_string();
        if it.name.is_empty() || !names.insert(it.name.clone()) {
            continue;
        }
        out.push(it);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn toml_and_json_formats_parse() {
        let toml = r#"
[[strategy]]
name = " channel "
username = "drop-team"

[[strategy]]
name = "keyword"
query = " xrp "
max_pages = 3

[[strategy]]
name = "channel"
query = "duplicate name"
"#;
        let v = parse_strategies(toml, "toml").unwrap();
        assert_eq!(v.len(), 2);
        assert_eq!(v[0].name, "channel");
        assert_eq!(v[0].username.as_deref(), Some("drop-team"));
        assert_eq!(v[1].query, "xrp");
        assert_eq!(v[1].max_pages, Some(3));

        let json = r#"[{"name":"a","query":"cats"},{"name":"","query":"x"}]"#;
        let v = parse_strategies(json, "json").unwrap();
        assert_eq!(v, vec![StrategySpec {
            name: "a".into(),
            query: "cats".into(),
            username: None,
            rating: None,
            page_size: None,
            max_pages: None,
        }]);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_strategies("not = [valid", "").is_err());
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_explicit_then_fallbacks() {
        // Isolate CWD so the repo's own config/ is not read
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();

        assert!(load_strategies_default(None).unwrap().is_empty());

        fs::create_dir_all("config").unwrap();
        fs::write(
            "config/strategies.json",
            r#"[{"name":"from-json","query":"q"}]"#,
        )
        .unwrap();
        let v = load_strategies_default(None).unwrap();
        assert_eq!(v[0].name, "from-json");

        let explicit = tmp.path().join("mine.toml");
        fs::write(&explicit, "[[strategy]]\nname = \"mine\"\n").unwrap();
        let v = load_strategies_default(Some(&explicit)).unwrap();
        assert_eq!(v[0].name, "mine");

        assert!(load_strategies_default(Some(&tmp.path().join("missing.toml"))).is_err());

        env::set_current_dir(&old).unwrap();
    }
}
