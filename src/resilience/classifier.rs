//! Failure classification.
//!
//! Typed `OperationError` variants classify themselves. Timeouts and opaque
//! errors are matched against three independent, case-insensitive rule sets.
//! All three sets are always evaluated, so one message can be both critical
//! and retryable.

use regex::{RegexSet, RegexSetBuilder};
use serde::Serialize;

use crate::config::ClassificationRules;
use crate::resilience::errors::OperationError;

/// Recovery strategy chosen for a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorClass {
    Retryable,
    Degradable,
    Critical,
    Unknown,
}

/// Which rule sets matched a failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classification {
    pub retryable: bool,
    pub degradable: bool,
    pub critical: bool,
}

impl Classification {
    /// Strategy in recovery priority order: retry, then degrade. A failure
    /// that is only critical has no recovery path.
    pub fn strategy(&self) -> ErrorClass {
        if self.retryable {
            ErrorClass::Retryable
        } else if self.degradable {
            ErrorClass::Degradable
        } else if self.critical {
            ErrorClass::Critical
        } else {
            ErrorClass::Unknown
        }
    }
}

#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    retryable: RegexSet,
    degradable: RegexSet,
    critical: RegexSet,
}

impl ErrorClassifier {
    /// Compile the rule sets.
    pub fn new(rules: &ClassificationRules) -> Result<Self, regex::Error> {
        fn build(patterns: &[String]) -> Result<RegexSet, regex::Error> {
            RegexSetBuilder::new(patterns).case_insensitive(true).build()
        }

        Ok(Self {
            retryable: build(&rules.retryable)?,
            degradable: build(&rules.degradable)?,
            critical: build(&rules.critical)?,
        })
    }

    /// Match a raw message against every rule set.
    pub fn match_message(&self, message: &str) -> Classification {
        Classification {
            retryable: self.retryable.is_match(message),
            degradable: self.degradable.is_match(message),
            critical: self.critical.is_match(message),
        }
    }

    /// Classify an operation failure.
    pub fn inspect(&self, error: &OperationError) -> Classification {
        match error {
            OperationError::Retryable(_) => Classification { retryable: true, ..Default::default() },
            OperationError::Degradable(_) => Classification { degradable: true, ..Default::default() },
            OperationError::Critical(_) => Classification { critical: true, ..Default::default() },
            OperationError::Timeout(_) | OperationError::Opaque(_) => self.match_message(&error.to_string()),
        }
    }

    pub fn classify(&self, error: &OperationError) -> ErrorClass {
        self.inspect(error).strategy()
    }
}
