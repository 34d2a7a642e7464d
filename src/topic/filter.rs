//! Attribute filter engine
//!
//! A filter policy maps attribute keys to allow-lists of exact-match values.
//! A message matches when, for every key in the policy, it carries that key
//! with one of the allowed values. Keys the policy does not mention are
//! ignored, and an empty policy matches everything.

use crate::queue::api::{AttributeValue, Attributes, Message};
use crate::topic::error::FilterEvaluationError;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct FilterPolicy {
    conditions: BTreeMap<String, Vec<AttributeValue>>,
}

impl FilterPolicy {
    /// Policy that matches every message
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the allow-list for one attribute
    pub fn allow<V>(mut self, key: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self
    where
        V: Into<AttributeValue>,
    {
        self.conditions
            .insert(key.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.conditions.keys().map(String::as_str)
    }

    pub fn allowed_values(&self, key: &str) -> Option<&[AttributeValue]> {
        self.conditions.get(key).map(Vec::as_slice)
    }

    /// Check the policy is well formed
    pub fn validate(&self) -> Result<(), FilterEvaluationError> {
        for (key, values) in &self.conditions {
            if key.is_empty() {
                return Err(FilterEvaluationError::EmptyKey);
            }
            if values.is_empty() {
                return Err(FilterEvaluationError::EmptyAllowList { key: key.clone() });
            }
        }
        Ok(())
    }

    /// Evaluate the policy against a set of message attributes
    ///
    /// Values compare by exact equality, so a number never matches a string
    /// and NaN matches nothing.
    pub fn evaluate(&self, attributes: &Attributes) -> Result<bool, FilterEvaluationError> {
        self.validate()?;
        Ok(self.conditions.iter().all(|(key, allowed)| {
            attributes
                .get(key)
                .is_some_and(|value| allowed.iter().any(|candidate| candidate == value))
        }))
    }

    /// Evaluate against a message, treating a malformed policy as no match
    pub fn matches(&self, message: &Message) -> bool {
        match self.evaluate(&message.attributes) {
            Ok(matched) => matched,
            Err(e) => {
                log::warn!(
                    "Filter evaluation failed for message {}: {}",
                    message.id(),
                    e
                );
                false
            }
        }
    }
}

/// Check a message against an optional predicate; no predicate matches all
pub fn matches(message: &Message, predicate: Option<&FilterPolicy>) -> bool {
    predicate.is_none_or(|policy| policy.matches(message))
}
