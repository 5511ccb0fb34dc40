//! Request authorization policy.
//!
//! The policy is a prepared rule set compiled once at startup from a JSON
//! file and evaluated against a structured request descriptor on every
//! call. Evaluation runs over immutable compiled state and is safe for
//! unbounded concurrent invocation.
//!
//! Rules are matched first-to-last; the first rule whose method set and
//! path pattern match decides the request. A rule with `require_token`
//! only matches when a non-empty bearer token is present, which lets a
//! policy itself reject unauthenticated requests while keeping selected
//! routes public.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// What a rule (or the policy default) decides for a matched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyAction {
    /// Allow the request.
    Allow,
    /// Deny the request.
    Deny,
}

/// Policy file format.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// Action when no rule matches.
    pub default: PolicyAction,

    /// Ordered rules; first match wins.
    #[serde(default)]
    pub rules: Vec<PolicyRuleConfig>,
}

/// A single rule as written in the policy file.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyRuleConfig {
    /// HTTP methods this rule applies to; `"*"` matches any method.
    pub methods: Vec<String>,

    /// Exact path, or a `prefix*` pattern.
    pub path: String,

    /// Decision when the rule matches.
    pub action: PolicyAction,

    /// When true, the rule only matches requests carrying a non-empty
    /// bearer token.
    #[serde(default)]
    pub require_token: bool,

    /// Optional label surfaced in server-side logs.
    #[serde(default)]
    pub name: Option<String>,
}

/// Structured, read-only request descriptor handed to the evaluator.
///
/// The token is the raw (unverified, possibly empty) bearer string;
/// policy evaluation is deliberately independent of token verification.
#[derive(Debug, Clone)]
pub struct RequestDescriptor<'a> {
    /// HTTP method, uppercase.
    pub method: &'a str,

    /// Request path.
    pub path: &'a str,

    /// Raw bearer token, empty when absent.
    pub token: &'a str,
}

/// Outcome of a policy evaluation.
#[derive(Debug, Clone)]
pub struct PolicyDecision {
    /// The allow/deny bit.
    pub allowed: bool,

    /// Label of the matching rule, for server-side logs only.
    pub rule: Option<String>,
}

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read policy file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse policy file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Path pattern compiled from a rule.
#[derive(Debug, Clone)]
enum PathMatcher {
    Exact(String),
    Prefix(String),
}

impl PathMatcher {
    fn compile(pattern: &str) -> Self {
        match pattern.strip_suffix('*') {
            Some(prefix) => PathMatcher::Prefix(prefix.to_string()),
            None => PathMatcher::Exact(pattern.to_string()),
        }
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            PathMatcher::Exact(exact) => path == exact,
            PathMatcher::Prefix(prefix) => path.starts_with(prefix),
        }
    }
}

/// A rule compiled for runtime evaluation.
#[derive(Debug, Clone)]
struct CompiledRule {
    /// Uppercased method set; `None` means any method.
    methods: Option<Vec<String>>,
    matcher: PathMatcher,
    action: PolicyAction,
    require_token: bool,
    label: Option<String>,
}

impl CompiledRule {
    fn matches(&self, descriptor: &RequestDescriptor<'_>) -> bool {
        if self.require_token && descriptor.token.is_empty() {
            return false;
        }
        if let Some(methods) = &self.methods {
            if !methods.iter().any(|m| m == descriptor.method) {
                return false;
            }
        }
        self.matcher.matches(descriptor.path)
    }
}

/// Prepared, reusable policy query.
#[derive(Debug, Clone)]
pub struct PolicyEvaluator {
    default_action: PolicyAction,
    rules: Vec<CompiledRule>,
}

impl PolicyEvaluator {
    /// Load and compile a policy from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `PolicyError` when the file cannot be read or parsed; both
    /// are fatal at startup.
    pub fn from_file(path: &Path) -> Result<Self, PolicyError> {
        let raw = std::fs::read_to_string(path).map_err(|e| PolicyError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        let config: PolicyConfig =
            serde_json::from_str(&raw).map_err(|e| PolicyError::Parse {
                path: path.display().to_string(),
                source: e,
            })?;

        tracing::info!(
            target: "roster.auth.policy",
            rule_count = config.rules.len(),
            default = ?config.default,
            "Policy loaded"
        );

        Ok(Self::from_config(&config))
    }

    /// Compile a policy from configuration.
    pub fn from_config(config: &PolicyConfig) -> Self {
        let rules = config
            .rules
            .iter()
            .map(|rule| {
                let any_method = rule.methods.iter().any(|m| m == "*");
                CompiledRule {
                    methods: if any_method {
                        None
                    } else {
                        Some(rule.methods.iter().map(|m| m.to_uppercase()).collect())
                    },
                    matcher: PathMatcher::compile(&rule.path),
                    action: rule.action,
                    require_token: rule.require_token,
                    label: rule.name.clone(),
                }
            })
            .collect();

        Self {
            default_action: config.default,
            rules,
        }
    }

    /// Evaluate a request descriptor against the prepared rules.
    ///
    /// # Errors
    ///
    /// Engine-internal failures surface as `PolicyError`; they are never
    /// coerced to allow or deny.
    pub fn evaluate(
        &self,
        descriptor: &RequestDescriptor<'_>,
    ) -> Result<PolicyDecision, PolicyError> {
        for rule in &self.rules {
            if rule.matches(descriptor) {
                let allowed = rule.action == PolicyAction::Allow;
                if !allowed {
                    tracing::debug!(
                        target: "roster.auth.policy",
                        method = %descriptor.method,
                        path = %descriptor.path,
                        rule = rule.label.as_deref().unwrap_or("<unnamed>"),
                        "Request denied by policy rule"
                    );
                }
                return Ok(PolicyDecision {
                    allowed,
                    rule: rule.label.clone(),
                });
            }
        }

        Ok(PolicyDecision {
            allowed: self.default_action == PolicyAction::Allow,
            rule: None,
        })
    }
}
