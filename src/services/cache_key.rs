//! Deterministic cache key derivation.
//!
//! The default key is `namespace:operation:{positional}:{named}` with named
//! parameters rendered in name order, so the same logical call always yields
//! the same key no matter how its arguments were assembled. A custom
//! [`KeyPolicy`] replaces the parameter part when literal stringification
//! would split or merge the wrong equivalence classes.

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Display;
use std::sync::Arc;

/// Name of the partition parameter used by the metric read path.
pub const PRIMARY_PARAM: &str = "primary";

/// Name of the secondary-key parameter used by the metric read path.
pub const SECONDARY_PARAM: &str = "secondary";

/// Parameters of one logical fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyParams {
    positional: Vec<String>,
    named: BTreeMap<String, Option<String>>,
}

impl KeyParams {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn arg(mut self, value: impl Display) -> Self {
        self.positional.push(value.to_string());
        self
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>, value: impl Display) -> Self {
        self.named.insert(name.into(), Some(value.to_string()));
        self
    }

    /// Record a named parameter that may be absent.
    ///
    /// Absent values still take part in the default key (as the bare
    /// name), so "not given" and "given" never collide.
    #[must_use]
    pub fn named_opt<V: Display>(mut self, name: impl Into<String>, value: Option<V>) -> Self {
        self.named.insert(name.into(), value.map(|v| v.to_string()));
        self
    }

    /// Value of a named parameter, `None` when absent or never set.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.named.get(name).and_then(Option::as_deref)
    }

    pub fn positional(&self) -> &[String] {
        &self.positional
    }
}

/// Custom mapping from parameters to the variable part of a key.
pub type KeyPolicy = Arc<dyn Fn(&KeyParams) -> String + Send + Sync>;

/// Builds keys for one `namespace:operation` key space.
#[derive(Clone)]
pub struct CacheKeyBuilder {
    namespace: String,
    operation: String,
    policy: Option<KeyPolicy>,
}

impl fmt::Debug for CacheKeyBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheKeyBuilder")
            .field("namespace", &self.namespace)
            .field("operation", &self.operation)
            .field("custom_policy", &self.policy.is_some())
            .finish()
    }
}

impl CacheKeyBuilder {
    pub fn new(namespace: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            operation: operation.into(),
            policy: None,
        }
    }

    /// Replace the default parameter rendering with `policy`.
    ///
    /// The `namespace:operation:` prefix is kept so distinct operations never
    /// share keys.
    #[must_use]
    pub fn with_policy<F>(mut self, policy: F) -> Self
    where
        F: Fn(&KeyParams) -> String + Send + Sync + 'static,
    {
        self.policy = Some(Arc::new(policy));
        self
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn build(&self, params: &KeyParams) -> String {
        let suffix = self
            .policy
            .as_ref()
            .map_or_else(|| default_suffix(params), |policy| policy(params));
        format!("{}:{}:{}", self.namespace, self.operation, suffix)
    }
}

/// Build a key with the default policy.
pub fn build_key(namespace: &str, operation: &str, params: &KeyParams) -> String {
    format!("{namespace}:{operation}:{}", default_suffix(params))
}

fn default_suffix(params: &KeyParams) -> String {
    let positional = params
        .positional
        .iter()
        .map(String::as_str)
        .map(escape)
        .collect::<Vec<_>>()
        .join(":");
    let named = params
        .named
        .iter()
        .map(|(name, value)| match value {
            Some(value) => format!("{}={}", escape(name), escape(value)),
            None => escape(name),
        })
        .collect::<Vec<_>>()
        .join(":");
    format!("{positional}:{named}")
}

/// Percent-encode the separators so a value can never read as extra
/// parameters.
fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '%' => escaped.push_str("%25"),
            ':' => escaped.push_str("%3A"),
            '=' => escaped.push_str("%3D"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Key policy that distinguishes only which filters are present.
///
/// - neither → `all`
/// - secondary only → `secondary:{v}`
/// - primary only → `primary:{v}`
/// - both → `primary:{v},secondary:{v}`
pub fn filter_presence_key(params: &KeyParams) -> String {
    match (params.get(PRIMARY_PARAM), params.get(SECONDARY_PARAM)) {
        (None, None) => "all".to_string(),
        (None, Some(secondary)) => format!("secondary:{secondary}"),
        (Some(primary), None) => format!("primary:{primary}"),
        (Some(primary), Some(secondary)) => format!("primary:{primary},secondary:{secondary}"),
    }
}
