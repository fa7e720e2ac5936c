// Ecosystem validation
// Collects every problem of a deployment set instead of stopping at the first

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::domain::env_keys::{self, *};
use crate::domain::launch::{validate_name, ScriptRef};
use crate::domain::{AgentRole, Ecosystem, LaunchConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One finding, optionally tied to an app and an env key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub severity: Severity,
    pub app: Option<String>,
    pub key: Option<String>,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}", level)?;
        if let Some(app) = &self.app {
            write!(f, " [{}]", app)?;
        }
        if let Some(key) = &self.key {
            write!(f, " {}", key)?;
        }
        write!(f, ": {}", self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    fn push(&mut self, severity: Severity, app: Option<&str>, key: Option<&str>, message: String) {
        self.issues.push(Issue {
            severity,
            app: app.map(str::to_string),
            key: key.map(str::to_string),
            message,
        });
    }
}

/// Check a whole deployment set
pub fn validate_ecosystem(ecosystem: &Ecosystem) -> ValidationReport {
    let mut report = ValidationReport::default();

    if ecosystem.is_empty() {
        report.push(Severity::Error, None, None, "no apps defined".to_string());
        return report;
    }

    for name in ecosystem.duplicate_names() {
        report.push(
            Severity::Error,
            Some(&name),
            None,
            "name is used by more than one app".to_string(),
        );
    }

    for app in &ecosystem.apps {
        validate_app(app, &mut report);
    }

    check_shared_private_keys(ecosystem, &mut report);
    report
}

/// Check one launch configuration
pub fn validate_app(app: &LaunchConfig, report: &mut ValidationReport) {
    let name = Some(app.name.as_str());

    if let Err(e) = validate_name(&app.name) {
        report.push(Severity::Error, name, None, e.to_string());
    }
    if let Err(e) = ScriptRef::parse(&app.script) {
        report.push(Severity::Error, name, None, e.to_string());
    }

    for (key, value) in &app.env {
        check_env_entry(key, value, name, report);
    }

    if let Some(role) = AgentRole::infer(app) {
        for key in role.required_keys() {
            if !app.env.contains_key(*key) {
                report.push(
                    Severity::Warning,
                    name,
                    Some(key),
                    format!("{} agents read this key but it is not set", role),
                );
            }
        }
    }
}

fn check_env_entry(key: &str, value: &str, app: Option<&str>, report: &mut ValidationReport) {
    if key.is_empty() || key.contains('=') || key.contains('\0') {
        report.push(
            Severity::Error,
            app,
            Some(key),
            "env key must be non-empty and contain no '=' or NUL".to_string(),
        );
        return;
    }
    if !is_upper_snake_case(key) {
        report.push(
            Severity::Warning,
            app,
            Some(key),
            "env key is not UPPER_SNAKE_CASE".to_string(),
        );
    }
    if value.contains('\0') {
        report.push(
            Severity::Error,
            app,
            Some(key),
            "env value contains NUL".to_string(),
        );
        return;
    }

    if let Err(message) = check_known_value(key, value) {
        report.push(Severity::Error, app, Some(key), message);
    }
}

/// Format checks for the keys agents understand
fn check_known_value(key: &str, value: &str) -> Result<(), String> {
    match key {
        RPC_URL | SUBGRAPH_URL => check_url(value),
        PAIR_FILTER => env_keys::parse_pairs(value).map(drop).map_err(|e| e.to_string()),
        TIMEFRAME_FILTER => env_keys::parse_timeframes(value)
            .map(drop)
            .map_err(|e| e.to_string()),
        SOURCE_FILTER => env_keys::parse_sources(value).map(drop).map_err(|e| e.to_string()),
        STAKE_TOKEN => env_keys::parse_address(key, value)
            .map(drop)
            .map_err(|e| e.to_string()),
        OWNER_ADDRS => env_keys::parse_addresses(key, value)
            .map(drop)
            .map_err(|e| e.to_string()),
        STAKE_AMOUNT | POSITION_SIZE => match value.trim().parse::<f64>() {
            Ok(v) if v.is_finite() && v > 0.0 => Ok(()),
            _ => Err(format!("'{}' is not a positive number", value)),
        },
        SECONDS_TILL_EPOCH_END => value
            .trim()
            .parse::<u64>()
            .map(drop)
            .map_err(|_| format!("'{}' is not a whole number of seconds", value)),
        _ if key.ends_with(PRIVATE_KEY) => {
            if env_keys::is_private_key(value) {
                Ok(())
            } else {
                Err("not a 32-byte hex private key".to_string())
            }
        }
        _ => Ok(()),
    }
}

fn check_url(value: &str) -> Result<(), String> {
    let parsed = url::Url::parse(value).map_err(|e| format!("'{}' is not a URL: {}", value, e))?;
    match parsed.scheme() {
        "http" | "https" | "ws" | "wss" => Ok(()),
        other => Err(format!("unsupported URL scheme '{}'", other)),
    }
}

fn is_upper_snake_case(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase() || c == '_')
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Two agents signing with one key race each other on-chain nonces
fn check_shared_private_keys(ecosystem: &Ecosystem, report: &mut ValidationReport) {
    let mut owners: HashMap<String, Vec<&str>> = HashMap::new();
    for app in &ecosystem.apps {
        if let Some(key) = app.env.get(PRIVATE_KEY) {
            let normalized = key.trim_start_matches("0x").to_ascii_lowercase();
            owners.entry(normalized).or_default().push(&app.name);
        }
    }

    let mut shared: Vec<Vec<&str>> = owners.into_values().filter(|apps| apps.len() > 1).collect();
    shared.sort();
    for apps in shared {
        report.push(
            Severity::Warning,
            None,
            Some(PRIVATE_KEY),
            format!("same private key used by {}", apps.join(", ")),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";

    fn predictoor(name: &str) -> LaunchConfig {
        LaunchConfig::new(name, "pdr_backend/predictoor/main.py")
            .with_args(["3"])
            .with_env(RPC_URL, "https://testnet.sapphire.oasis.dev")
            .with_env(
                SUBGRAPH_URL,
                "https://v4.subgraph.sapphire-testnet.oceanprotocol.com/subgraphs/name/oceanprotocol/ocean-subgraph",
            )
            .with_env(PRIVATE_KEY, KEY)
            .with_env(PAIR_FILTER, "BTC/USDT")
            .with_env(TIMEFRAME_FILTER, "5m")
            .with_env(SOURCE_FILTER, "binance")
            .with_env(STAKE_TOKEN, "0x973e69303259B0c2543a38665122b773D28405fB")
            .with_env(OWNER_ADDRS, "0x4ac2e51f9b1b0ca9e000dfe6032b24639b172703")
    }

    #[test]
    fn test_valid_set_is_clean() {
        let eco = Ecosystem::new(vec![predictoor("pm2-predictoor-btc")]);
        let report = validate_ecosystem(&eco);
        assert!(report.is_clean(), "{:?}", report);
    }

    #[test]
    fn test_empty_set_is_an_error() {
        assert!(validate_ecosystem(&Ecosystem::default()).has_errors());
    }

    #[test]
    fn test_duplicate_names_and_shared_keys() {
        let eco = Ecosystem::new(vec![predictoor("p1"), predictoor("p1"), predictoor("p2")]);
        let report = validate_ecosystem(&eco);

        assert_eq!(report.errors().count(), 1);
        assert_eq!(report.errors().next().unwrap().app.as_deref(), Some("p1"));

        let warning = report.warnings().next().unwrap();
        assert_eq!(warning.key.as_deref(), Some(PRIVATE_KEY));
        assert!(warning.message.contains("p1, p1, p2"));
    }

    #[test]
    fn test_bad_values_are_errors() {
        let app = predictoor("p1")
            .with_env(RPC_URL, "ftp://example.com")
            .with_env(PAIR_FILTER, "BTC/EUR")
            .with_env(PRIVATE_KEY, "0x1234")
            .with_env(STAKE_AMOUNT, "-1")
            .with_env(SECONDS_TILL_EPOCH_END, "soon");
        let report = validate_ecosystem(&Ecosystem::new(vec![app]));

        let keys: Vec<_> = report.errors().filter_map(|i| i.key.clone()).collect();
        assert_eq!(
            keys,
            vec![PAIR_FILTER, PRIVATE_KEY, RPC_URL, SECONDS_TILL_EPOCH_END, STAKE_AMOUNT]
        );
    }

    #[test]
    fn test_bad_name_and_script() {
        let mut app = predictoor("-bad name");
        app.script = "pdr_backend//main.py".to_string();
        let report = validate_ecosystem(&Ecosystem::new(vec![app]));
        assert_eq!(report.errors().count(), 2);
    }

    #[test]
    fn test_missing_required_keys_are_warnings() {
        let app = LaunchConfig::new("trader-1", "pdr_backend/trader/main.py")
            .with_env("lower_key", "x");
        let report = validate_ecosystem(&Ecosystem::new(vec![app]));

        assert!(!report.has_errors());
        let keys: Vec<_> = report.warnings().filter_map(|i| i.key.clone()).collect();
        assert!(keys.contains(&"lower_key".to_string()));
        assert!(keys.contains(&RPC_URL.to_string()));
        assert!(keys.contains(&PRIVATE_KEY.to_string()));
    }

    #[test]
    fn test_issue_display() {
        let issue = Issue {
            severity: Severity::Error,
            app: Some("p1".to_string()),
            key: Some(RPC_URL.to_string()),
            message: "bad".to_string(),
        };
        assert_eq!(issue.to_string(), "error [p1] RPC_URL: bad");
    }
}
