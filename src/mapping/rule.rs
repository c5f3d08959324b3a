use std::collections::{HashMap, HashSet};

use crate::error::MapperError;

/// When a field takes part in a conversion.
///
/// `DecodeOnly` is the write-only case (a password): accepted from the
/// wire, never emitted. `EncodeOnly` fields are emitted and, like every
/// other rule, still accepted on input; visibility restricts output only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Always,
    EncodeOnly,
    DecodeOnly,
}

/// What a decoder does with a key that matches no rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownFieldPolicy {
    /// Raise [`MapperError::UnknownField`].
    Fail,
    /// Drop the key.
    #[default]
    Ignore,
    /// Stash the key/value pair in the record's capture map.
    Capture,
}

/// Declarative mapping for one logical field of a record type.
///
/// Built fluently and handed to a [`RuleTableBuilder`]:
///
/// ```
/// use json_mapper_rs::mapping::rule::{FieldRule, Visibility};
///
/// let rule = FieldRule::new("username", "username")
///     .alias("login")
///     .alias("user");
/// let secret = FieldRule::new("password", "password")
///     .visibility(Visibility::DecodeOnly);
/// ```
#[derive(Debug, Clone)]
pub struct FieldRule {
    field: String,
    wire: String,
    aliases: Vec<String>,
    visibility: Visibility,
    views: Vec<String>,
    include_null: bool,
    order: Option<i32>,
    unwrap_prefix: Option<String>,
}

impl FieldRule {
    /// A rule mapping the source field `field` to the wire name `wire`.
    pub fn new(field: impl Into<String>, wire: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            wire: wire.into(),
            aliases: Vec::new(),
            visibility: Visibility::Always,
            views: Vec::new(),
            include_null: false,
            order: None,
            unwrap_prefix: None,
        }
    }

    /// An additional accepted input name for this field.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Restricts emission of this field to the given view tag.
    /// May be repeated; a field with no tags is emitted for every view.
    pub fn view(mut self, tag: impl Into<String>) -> Self {
        self.views.push(tag.into());
        self
    }

    /// Emit an explicit `null` instead of dropping an absent value.
    pub fn include_null(mut self) -> Self {
        self.include_null = true;
        self
    }

    /// Explicit emission rank. Ranked fields come first; unranked fields
    /// follow in declaration order.
    pub fn order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    /// Flatten the nested record's own fields into the parent object,
    /// each child wire name prefixed with `prefix`.
    pub fn unwrap(mut self, prefix: impl Into<String>) -> Self {
        self.unwrap_prefix = Some(prefix.into());
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn wire(&self) -> &str {
        &self.wire
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn visibility_mode(&self) -> Visibility {
        self.visibility
    }

    pub fn views(&self) -> &[String] {
        &self.views
    }

    pub fn includes_null(&self) -> bool {
        self.include_null
    }

    pub fn unwrap_prefix(&self) -> Option<&str> {
        self.unwrap_prefix.as_deref()
    }

    fn matches(&self, key: &str) -> bool {
        self.wire == key || self.aliases.iter().any(|alias| alias == key)
    }
}

/// Immutable per-record-type mapping metadata.
///
/// Built once at startup through [`RuleTable::builder`], then shared
/// read-only by every encode and decode call.
#[derive(Debug)]
pub struct RuleTable {
    record_type: String,
    rules: Vec<FieldRule>,
    unknown_fields: UnknownFieldPolicy,
    identity_field: Option<String>,
    discriminator: Option<String>,
    view_closures: HashMap<String, HashSet<String>>,
}

impl RuleTable {
    pub fn builder(record_type: impl Into<String>) -> RuleTableBuilder {
        RuleTableBuilder {
            record_type: record_type.into(),
            rules: Vec::new(),
            unknown_fields: UnknownFieldPolicy::default(),
            identity_field: None,
            discriminator: None,
            view_includes: HashMap::new(),
        }
    }

    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// Rules in emission order.
    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    pub fn unknown_fields(&self) -> UnknownFieldPolicy {
        self.unknown_fields
    }

    /// Wire name of the discriminator property, if this type is part of
    /// an open sum-type family.
    pub fn discriminator(&self) -> Option<&str> {
        self.discriminator.as_deref()
    }

    /// The rule backing the identity key, if identity dedup is enabled.
    pub fn identity_rule(&self) -> Option<&FieldRule> {
        let field = self.identity_field.as_deref()?;
        self.rules.iter().find(|rule| rule.field() == field)
    }

    /// Resolves an input key by exact wire name, then by alias.
    pub fn rule_for_key(&self, key: &str) -> Option<&FieldRule> {
        self.rules
            .iter()
            .find(|rule| rule.wire() == key)
            .or_else(|| self.rules.iter().find(|rule| rule.matches(key)))
    }

    /// Resolves an input key against unwrap prefixes, returning the rule
    /// and the key with the prefix stripped.
    pub fn rule_for_prefix<'a>(&self, key: &'a str) -> Option<(&FieldRule, &'a str)> {
        self.rules.iter().find_map(|rule| {
            let prefix = rule.unwrap_prefix()?;
            key.strip_prefix(prefix).map(|stripped| (rule, stripped))
        })
    }

    /// Whether a rule is emitted under the requested view.
    ///
    /// Untagged rules are always emitted. Tagged rules require a view
    /// whose declared closure intersects the rule's tags; with no view
    /// requested, tagged rules are suppressed.
    pub fn view_allows(&self, requested: Option<&str>, rule: &FieldRule) -> bool {
        if rule.views().is_empty() {
            return true;
        }
        let Some(view) = requested else {
            return false;
        };
        match self.view_closures.get(view) {
            Some(closure) => rule.views().iter().any(|tag| closure.contains(tag)),
            None => rule.views().iter().any(|tag| tag == view),
        }
    }
}

/// Builder for [`RuleTable`]. Collisions are a configuration error
/// reported by [`RuleTableBuilder::build`], never at call time.
pub struct RuleTableBuilder {
    record_type: String,
    rules: Vec<FieldRule>,
    unknown_fields: UnknownFieldPolicy,
    identity_field: Option<String>,
    discriminator: Option<String>,
    view_includes: HashMap<String, Vec<String>>,
}

impl RuleTableBuilder {
    pub fn rule(mut self, rule: FieldRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn unknown_fields(mut self, policy: UnknownFieldPolicy) -> Self {
        self.unknown_fields = policy;
        self
    }

    /// Enables identity dedup keyed by the given source field.
    pub fn identity(mut self, field: impl Into<String>) -> Self {
        self.identity_field = Some(field.into());
        self
    }

    /// Declares the discriminator property for a sum-type family member.
    pub fn discriminator(mut self, property: impl Into<String>) -> Self {
        self.discriminator = Some(property.into());
        self
    }

    /// Declares that `view` is a superset of the listed views. Inheritance
    /// is explicit; no implicit hierarchy is derived.
    pub fn view_includes<I, S>(mut self, view: impl Into<String>, includes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.view_includes
            .entry(view.into())
            .or_default()
            .extend(includes.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Result<RuleTable, MapperError> {
        let config_error = |message: String| MapperError::Configuration {
            record: self.record_type.clone(),
            message,
        };

        let mut emitted_wires: HashSet<&str> = HashSet::new();
        for rule in &self.rules {
            if rule.visibility_mode() == Visibility::DecodeOnly {
                continue;
            }
            if !emitted_wires.insert(rule.wire()) {
                return Err(config_error(format!(
                    "duplicate wire name '{}'",
                    rule.wire()
                )));
            }
        }

        if let Some(field) = &self.identity_field {
            if !self.rules.iter().any(|rule| rule.field() == field.as_str()) {
                return Err(config_error(format!(
                    "identity field '{field}' has no rule"
                )));
            }
        }

        // Ranked rules first, unranked behind them in declaration order.
        let mut indexed: Vec<(usize, FieldRule)> = self.rules.into_iter().enumerate().collect();
        indexed.sort_by_key(|(index, rule)| (rule.order.unwrap_or(i32::MAX), *index));
        let rules = indexed.into_iter().map(|(_, rule)| rule).collect();

        let mut view_closures: HashMap<String, HashSet<String>> = HashMap::new();
        for view in self.view_includes.keys() {
            let mut closure = HashSet::new();
            let mut pending = vec![view.clone()];
            while let Some(current) = pending.pop() {
                if closure.insert(current.clone()) {
                    if let Some(included) = self.view_includes.get(&current) {
                        pending.extend(included.iter().cloned());
                    }
                }
            }
            view_closures.insert(view.clone(), closure);
        }

        Ok(RuleTable {
            record_type: self.record_type,
            rules,
            unknown_fields: self.unknown_fields,
            identity_field: self.identity_field,
            discriminator: self.discriminator,
            view_closures,
        })
    }
}
