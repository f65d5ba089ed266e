//! Events: the sparse `(variable_id, value)` lists the matcher reads from.
//!
//! Generalizes the teacher's `events.rs` `Event`/`EventBuilder` (a dense,
//! by-id vector) into the sparse ordered list spec.md §4.4.1 requires,
//! since an event is expected to carry only the attributes it actually has
//! a value for, not every attribute ever registered in `Config`.

use itertools::Itertools;

use crate::domain::ValueType;
use crate::interner::{Config, VariableId};
use crate::value::{FrequencyCapEntry, SegmentEntry, StringValue, Value};

/// Recoverable: the caller tried to build an event with a value that does
/// not match its attribute's declared type, or assigned the same
/// attribute twice.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EventError {
    #[error("attribute {0:?} is not registered in this Config")]
    UnknownAttribute(String),
    #[error("attribute {name:?} expects {expected:?}, got {actual:?}")]
    WrongType { name: String, expected: ValueType, actual: ValueType },
    #[error("attribute {0:?} was already set on this event")]
    AlreadyPresent(String),
}

/// An event: an ordered, sparse list of `(variable_id, value)` pairs. The
/// matcher resolves an attribute by scanning this list (spec.md §4.4.1),
/// not by indexing a dense by-id vector, since most events only carry a
/// small subset of all registered attributes.
#[derive(Clone, Debug, Default)]
pub struct Event {
    entries: Vec<(VariableId, Value)>,
}

impl Event {
    pub fn get(&self, var: VariableId) -> Option<&Value> {
        self.entries.iter().find(|(id, _)| *id == var).map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds an [`Event`] against a `Config`, validating each assignment's
/// declared type before accepting it. Resolves `String`/`StringList`
/// values' interned ids eagerly (via `Config`'s non-mutating lookup) so
/// the matcher never needs mutable access to `Config` at match time.
pub struct EventBuilder<'a> {
    config: &'a Config,
    entries: Vec<(VariableId, Value)>,
}

impl<'a> EventBuilder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config, entries: Vec::new() }
    }

    fn attr(&self, name: &str) -> Result<VariableId, EventError> {
        self.config
            .domain_by_name(name)
            .map(|d| d.var_id)
            .ok_or_else(|| EventError::UnknownAttribute(name.to_owned()))
    }

    fn check_absent(&self, var: VariableId, name: &str) -> Result<(), EventError> {
        if self.entries.iter().any(|(id, _)| *id == var) {
            return Err(EventError::AlreadyPresent(name.to_owned()));
        }
        Ok(())
    }

    fn check_type(&self, name: &str, var: VariableId, attempted: ValueType) -> Result<(), EventError> {
        let declared = self.config.domain(var).value_type;
        if declared != attempted {
            return Err(EventError::WrongType { name: name.to_owned(), expected: declared, actual: attempted });
        }
        Ok(())
    }

    pub fn with_bool(mut self, name: &str, value: bool) -> Result<Self, EventError> {
        let var = self.attr(name)?;
        self.check_absent(var, name)?;
        self.check_type(name, var, ValueType::Bool)?;
        self.entries.push((var, Value::Bool(value)));
        Ok(self)
    }

    pub fn with_int64(mut self, name: &str, value: i64) -> Result<Self, EventError> {
        let var = self.attr(name)?;
        self.check_absent(var, name)?;
        self.check_type(name, var, ValueType::Int64)?;
        self.entries.push((var, Value::Int64(value)));
        Ok(self)
    }

    pub fn with_float64(mut self, name: &str, value: f64) -> Result<Self, EventError> {
        let var = self.attr(name)?;
        self.check_absent(var, name)?;
        self.check_type(name, var, ValueType::Float64)?;
        self.entries.push((var, Value::Float64(value)));
        Ok(self)
    }

    pub fn with_string(mut self, name: &str, value: &str) -> Result<Self, EventError> {
        let var = self.attr(name)?;
        self.check_absent(var, name)?;
        self.check_type(name, var, ValueType::String)?;
        let id = self.config.lookup_string(var, value);
        self.entries.push((var, Value::String(StringValue::new(var, id, value))));
        Ok(self)
    }

    pub fn with_int_list(mut self, name: &str, values: Vec<i64>) -> Result<Self, EventError> {
        let var = self.attr(name)?;
        self.check_absent(var, name)?;
        self.check_type(name, var, ValueType::IntList)?;
        let sorted = values.into_iter().sorted().dedup().collect();
        self.entries.push((var, Value::IntList(sorted)));
        Ok(self)
    }

    pub fn with_string_list(mut self, name: &str, values: &[&str]) -> Result<Self, EventError> {
        let var = self.attr(name)?;
        self.check_absent(var, name)?;
        self.check_type(name, var, ValueType::StringList)?;
        let resolved: Vec<StringValue> = values
            .iter()
            .map(|text| StringValue::new(var, self.config.lookup_string(var, text), *text))
            .sorted()
            .dedup_by(|a, b| a.id == b.id)
            .collect();
        self.entries.push((var, Value::StringList(resolved)));
        Ok(self)
    }

    pub fn with_segment_list(mut self, name: &str, values: Vec<SegmentEntry>) -> Result<Self, EventError> {
        let var = self.attr(name)?;
        self.check_absent(var, name)?;
        self.check_type(name, var, ValueType::SegmentList)?;
        self.entries.push((var, Value::SegmentList(values)));
        Ok(self)
    }

    pub fn with_frequency_cap_list(
        mut self,
        name: &str,
        values: Vec<FrequencyCapEntry>,
    ) -> Result<Self, EventError> {
        let var = self.attr(name)?;
        self.check_absent(var, name)?;
        self.check_type(name, var, ValueType::FrequencyCapList)?;
        self.entries.push((var, Value::FrequencyCapList(values)));
        Ok(self)
    }

    pub fn build(self) -> Event {
        Event { entries: self.entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bound;

    fn config_with_age_and_country() -> Config {
        let mut config = Config::new();
        config.add_attr_domain("age", ValueType::Int64, Bound::unbounded_int(), false).unwrap();
        config
            .add_attr_domain("country", ValueType::String, Bound::unbounded_string(), true)
            .unwrap();
        config
    }

    #[test]
    fn builder_round_trips_values_by_attribute_name() {
        let config = config_with_age_and_country();
        let country = config.domain_by_name("country").unwrap().var_id;
        let event = EventBuilder::new(&config)
            .with_int64("age", 30)
            .unwrap()
            .with_string("country", "US")
            .unwrap()
            .build();

        assert_eq!(30, event.get(config.domain_by_name("age").unwrap().var_id).unwrap().as_int64());
        assert_eq!("US", &*event.get(country).unwrap().as_string().text);
    }

    #[test]
    fn builder_rejects_wrong_type_assignment() {
        let config = config_with_age_and_country();
        let result = EventBuilder::new(&config).with_string("age", "thirty");
        assert!(matches!(result, Err(EventError::WrongType { .. })));
    }

    #[test]
    fn builder_rejects_unknown_attribute() {
        let config = config_with_age_and_country();
        let result = EventBuilder::new(&config).with_int64("height", 180);
        assert!(matches!(result, Err(EventError::UnknownAttribute(_))));
    }

    #[test]
    fn builder_rejects_duplicate_assignment() {
        let config = config_with_age_and_country();
        let result = EventBuilder::new(&config).with_int64("age", 30).unwrap().with_int64("age", 40);
        assert!(matches!(result, Err(EventError::AlreadyPresent(_))));
    }

    #[test]
    fn string_list_values_are_sorted_and_deduped_by_interned_id() {
        let mut config = Config::new();
        config
            .add_attr_domain("tags", ValueType::StringList, Bound::unbounded_string(), false)
            .unwrap();
        let tags = config.domain_by_name("tags").unwrap().var_id;
        config.get_id_for_string(tags, "b");
        config.get_id_for_string(tags, "a");

        let event =
            EventBuilder::new(&config).with_string_list("tags", &["b", "a", "a"]).unwrap().build();
        let list = event.get(tags).unwrap().as_string_list();
        assert_eq!(2, list.len());
        assert!(list[0].id.0 < list[1].id.0);
    }

    #[test]
    fn get_returns_none_for_an_absent_attribute() {
        let config = config_with_age_and_country();
        let event = EventBuilder::new(&config).with_int64("age", 30).unwrap().build();
        let country = config.domain_by_name("country").unwrap().var_id;
        assert!(event.get(country).is_none());
    }
}
