use logmux_types::{Classified, LogLevel, PendingEntry, Record};

use crate::error::FilterError;
use crate::predicate::{Predicate, minimal_record};

/// Compiled keep/drop rules for classified lines
#[derive(Clone, Debug, Default)]
pub struct RecordFilter {
    /// Minimum numeric level (if any)
    min_level: Option<i64>,

    /// Conditions every kept record must satisfy
    predicates: Vec<Predicate>,

    /// Drop lines that are not valid records instead of passing them on
    strict: bool,
}

impl RecordFilter {
    /// A filter that keeps everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum level
    pub fn with_min_level(mut self, level: i64) -> Self {
        self.min_level = Some(level);
        self
    }

    /// Set the minimum level from a name (case-insensitive) or integer
    pub fn with_level_name(self, level: &str) -> Result<Self, FilterError> {
        let threshold = LogLevel::parse_threshold(level)
            .ok_or_else(|| FilterError::UnknownLevel(level.to_string()))?;
        Ok(self.with_min_level(threshold))
    }

    /// Add a condition. The expression is compiled and then run once against
    /// a minimal synthetic record so that mistakes surface before any input
    /// is read.
    pub fn with_condition(mut self, expression: &str) -> Result<Self, FilterError> {
        let predicate = Predicate::compile(expression).map_err(|source| FilterError::Compile {
            expression: expression.to_string(),
            source,
        })?;

        let record = minimal_record();
        if let Err(source) = predicate.evaluate(&record) {
            return Err(FilterError::Validate {
                expression: expression.to_string(),
                record: serde_json::to_string(&record).unwrap_or_default(),
                source,
            });
        }

        self.predicates.push(predicate);
        Ok(self)
    }

    /// Drop pass-through and invalid lines
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn min_level(&self) -> Option<i64> {
        self.min_level
    }

    /// Check if a record is kept. A condition failing to evaluate drops only
    /// this record.
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(threshold) = self.min_level {
            match record.level() {
                Some(level) if level >= threshold => {}
                _ => return false,
            }
        }

        self.predicates.iter().all(|predicate| match predicate.test(record) {
            Ok(keep) => keep,
            Err(e) => {
                tracing::trace!(condition = predicate.source(), error = %e, "condition failed, dropping record");
                false
            }
        })
    }

    /// Turn a classified line into a pending entry, or None if dropped
    pub fn admit(&self, line: String, classified: Classified) -> Option<PendingEntry> {
        match classified {
            Classified::PassThrough(_) | Classified::Invalid(_) => {
                (!self.strict).then(|| PendingEntry::raw(line))
            }
            Classified::Valid(record) => self
                .matches(&record)
                .then(|| PendingEntry::structured(line, record)),
        }
    }

    /// Whether this filter keeps everything
    pub fn is_empty(&self) -> bool {
        self.min_level.is_none() && self.predicates.is_empty() && !self.strict
    }
}
