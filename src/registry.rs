use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::FieldError;
use crate::phone::PhoneNumbers;
use crate::validator::{CharacterWhitelist, EndpointRule, FieldValidator, RuleOptions};

/// A validator paired with its options.
#[derive(Clone)]
pub struct FieldRule {
    validator: Arc<dyn FieldValidator>,
    options: RuleOptions,
}

impl FieldRule {
    /// Pairs `validator` with `options`.
    pub fn new(validator: Arc<dyn FieldValidator>, options: RuleOptions) -> Self {
        Self { validator, options }
    }

    /// The options this rule runs with.
    pub fn options(&self) -> &RuleOptions {
        &self.options
    }

    /// Runs the rule against `value`.
    pub fn check(&self, value: Option<&str>) -> Result<(), crate::ValidationError> {
        self.validator.validate(value, &self.options)
    }
}

impl fmt::Debug for FieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRule")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Immutable lookup table from form field name to [`FieldRule`].
///
/// Built once through [`ValidatorRegistry::builder`] and then shared,
/// typically behind an `Arc`, by every request. Fields without a rule are
/// not validated.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use twiml_core::{CharacterWhitelist, LibPhoneNumbers, RuleOptions, ValidatorRegistry};
///
/// let registry = ValidatorRegistry::standard(Arc::new(LibPhoneNumbers::default()));
/// assert!(registry.contains("From"));
/// assert!(registry.validate("Digits", Some("12#")).is_ok());
/// assert!(registry.validate("CallSid", Some("anything")).is_ok());
///
/// let custom = ValidatorRegistry::builder()
///     .rule_with("Digits", CharacterWhitelist::keypad(), RuleOptions::allowing_empty())
///     .build();
/// assert!(custom.validate("Digits", Some("")).is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ValidatorRegistry {
    rules: HashMap<String, FieldRule>,
}

impl ValidatorRegistry {
    /// Starts an empty registry.
    pub fn builder() -> ValidatorRegistryBuilder {
        ValidatorRegistryBuilder::default()
    }

    /// The default rules for voice callbacks: `From` and `To` must be a
    /// phone number or SIP URI, `Digits` must be a keypad entry.
    pub fn standard(phones: Arc<dyn PhoneNumbers>) -> Self {
        let endpoint = Arc::new(EndpointRule::new(phones));

        Self::builder()
            .shared_rule("From", endpoint.clone(), RuleOptions::default())
            .shared_rule("To", endpoint, RuleOptions::default())
            .rule("Digits", CharacterWhitelist::keypad())
            .build()
    }

    /// Returns the rule registered for `field`.
    pub fn get(&self, field: &str) -> Option<&FieldRule> {
        self.rules.get(field)
    }

    /// True if `field` has a rule.
    pub fn contains(&self, field: &str) -> bool {
        self.rules.contains_key(field)
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True if no rules are registered.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Validates one field value. Unregistered fields always pass.
    ///
    /// # Errors
    ///
    /// Returns a [`FieldError`] naming `field` if its rule rejects `value`.
    pub fn validate(&self, field: &str, value: Option<&str>) -> Result<(), FieldError> {
        match self.rules.get(field) {
            Some(rule) => rule
                .check(value)
                .map_err(|cause| FieldError::new(field, cause)),
            None => Ok(()),
        }
    }
}

/// Builder for [`ValidatorRegistry`]. Registering a field twice keeps the
/// last rule.
#[derive(Debug, Default)]
pub struct ValidatorRegistryBuilder {
    rules: HashMap<String, FieldRule>,
}

impl ValidatorRegistryBuilder {
    /// Registers `validator` for `field` with default options.
    pub fn rule(self, field: impl Into<String>, validator: impl FieldValidator + 'static) -> Self {
        self.rule_with(field, validator, RuleOptions::default())
    }

    /// Registers `validator` for `field` with `options`.
    pub fn rule_with(
        self,
        field: impl Into<String>,
        validator: impl FieldValidator + 'static,
        options: RuleOptions,
    ) -> Self {
        self.shared_rule(field, Arc::new(validator), options)
    }

    /// Registers an already shared validator.
    pub fn shared_rule(
        mut self,
        field: impl Into<String>,
        validator: Arc<dyn FieldValidator>,
        options: RuleOptions,
    ) -> Self {
        self.rules
            .insert(field.into(), FieldRule::new(validator, options));
        self
    }

    /// Freezes the rules.
    pub fn build(self) -> ValidatorRegistry {
        ValidatorRegistry { rules: self.rules }
    }
}
