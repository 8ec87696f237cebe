//! Deprecated configuration pattern checker
//!
//! Scans YAML (or pretty-printed JSON) automation and script configuration
//! line by line against a fixed table of patterns Home Assistant has renamed
//! or removed.

use crate::intelligence::anomaly::Severity;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One deprecated usage found in the input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeprecationFinding {
    pub rule_id: String,
    /// 1-based line number
    pub line: usize,
    /// 1-based column of the match
    pub column: usize,
    pub matched: String,
    pub message: String,
    pub replacement: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
}

struct Rule {
    id: &'static str,
    /// Pattern with a `m` group spanning the deprecated text
    pattern: Regex,
    message: &'static str,
    /// Replacement, may reference capture groups as `$name`
    replacement: &'static str,
    severity: Severity,
    since: Option<&'static str>,
}

fn rule(
    id: &'static str,
    pattern: &str,
    message: &'static str,
    replacement: &'static str,
    severity: Severity,
    since: Option<&'static str>,
) -> Rule {
    Rule {
        id,
        pattern: Regex::new(pattern).unwrap_or_else(|e| panic!("invalid rule {id}: {e}")),
        message,
        replacement,
        severity,
        since,
    }
}

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule(
            "service_to_action",
            r#"^\s*(?:-\s+)?(?P<m>"?service"?\s*:)"#,
            "`service:` in actions has been renamed to `action:`",
            "action:",
            Severity::Info,
            Some("2024.8"),
        ),
        rule(
            "service_template",
            r#"(?P<m>"?service_template"?\s*:)"#,
            "`service_template:` is deprecated; templates are accepted directly in `action:`",
            "action:",
            Severity::Warning,
            None,
        ),
        rule(
            "data_template",
            r#"(?P<m>"?data_template"?\s*:)"#,
            "`data_template:` is deprecated; templates are accepted directly in `data:`",
            "data:",
            Severity::Warning,
            None,
        ),
        rule(
            "trigger_platform",
            r#"^\s*(?:-\s+)?(?P<m>"?platform"?\s*:)"#,
            "`platform:` in triggers has been renamed to `trigger:`",
            "trigger:",
            Severity::Info,
            Some("2024.10"),
        ),
        rule(
            "singular_top_level_key",
            r#"^\s{0,2}(?P<m>"?(?P<key>trigger|condition|action)"?\s*:)\s*(?:\[.*)?$"#,
            "Top-level `trigger`/`condition`/`action` keys are now plural",
            "${key}s:",
            Severity::Info,
            Some("2024.10"),
        ),
        rule(
            "white_value",
            r#"(?P<m>\bwhite_value\b)"#,
            "`white_value` has been removed; use `rgbw_color` or `white`",
            "rgbw_color",
            Severity::Critical,
            None,
        ),
        rule(
            "color_temp_mireds",
            r#"(?:^|[^A-Za-z0-9_])(?P<m>"?color_temp"?\s*:)"#,
            "`color_temp` (mireds) is deprecated; use `color_temp_kelvin`",
            "color_temp_kelvin:",
            Severity::Warning,
            None,
        ),
        rule(
            "kelvin",
            r#"(?:^|[^A-Za-z0-9_])(?P<m>"?kelvin"?\s*:)"#,
            "`kelvin` is deprecated; use `color_temp_kelvin`",
            "color_temp_kelvin:",
            Severity::Warning,
            None,
        ),
        rule(
            "states_object_access",
            r#"(?P<m>\bstates\.(?P<domain>[a-z0-9_]+)\.(?P<object>[a-z0-9_]+)\.state\b)"#,
            "Direct `states.x.y.state` access errors when the entity is missing; use `states('x.y')`",
            "states('${domain}.${object}')",
            Severity::Info,
            None,
        ),
        rule(
            "relative_time",
            r#"(?P<m>\brelative_time\s*\()"#,
            "`relative_time` is deprecated; use `time_since`",
            "time_since(",
            Severity::Warning,
            None,
        ),
    ]
});

/// Find deprecated patterns in configuration text, ordered by position
pub fn check_deprecations(text: &str) -> Vec<DeprecationFinding> {
    let mut findings = Vec::new();

    for (index, line) in text.lines().enumerate() {
        if line.trim_start().starts_with('#') {
            continue;
        }
        for rule in RULES.iter() {
            for captures in rule.pattern.captures_iter(line) {
                let Some(m) = captures.name("m") else {
                    continue;
                };
                let mut replacement = String::new();
                captures.expand(rule.replacement, &mut replacement);
                findings.push(DeprecationFinding {
                    rule_id: rule.id.to_string(),
                    line: index + 1,
                    column: line[..m.start()].chars().count() + 1,
                    matched: m.as_str().trim().to_string(),
                    message: rule.message.to_string(),
                    replacement,
                    severity: rule.severity,
                    since: rule.since.map(str::to_string),
                });
            }
        }
    }

    findings.sort_by(|a, b| {
        a.line
            .cmp(&b.line)
            .then_with(|| a.column.cmp(&b.column))
            .then_with(|| a.rule_id.cmp(&b.rule_id))
    });
    findings
}
