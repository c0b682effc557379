use std::{
    fmt::{Debug, Display},
    ops::RangeInclusive,
    sync::Arc,
};

use four_cc::FourCC;

use super::{Parameter, ParameterType, ParameterValueUpdate};

// -------------------------------------------------------------------------------------------------

/// A continuous (float) parameter descriptor.
#[derive(Clone)]
pub struct FloatParameter {
    id: FourCC,
    name: &'static str,
    range: RangeInclusive<f32>,
    default: f32,
    unit: &'static str,
    #[allow(clippy::type_complexity)]
    value_to_string: Option<Arc<dyn Fn(f32) -> String + Send + Sync>>,
    #[allow(clippy::type_complexity)]
    string_to_value: Option<Arc<dyn Fn(&str) -> Option<f32> + Send + Sync>>,
}

impl Debug for FloatParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FloatParameter")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("range", &self.range)
            .field("default", &self.default)
            .field("unit", &self.unit)
            .field("value_to_string", &self.value_to_string.is_some())
            .field("string_to_value", &self.string_to_value.is_some())
            .finish()
    }
}

impl FloatParameter {
    /// Create a new float parameter descriptor.
    pub const fn new(
        id: FourCC,
        name: &'static str,
        range: RangeInclusive<f32>,
        default: f32,
    ) -> Self {
        assert!(
            default >= *range.start() && default <= *range.end(),
            "Invalid parameter default value"
        );
        Self {
            id,
            name,
            range,
            default,
            unit: "",
            value_to_string: None,
            string_to_value: None,
        }
    }

    /// Optional unit for string displays.
    pub const fn with_unit(mut self, unit: &'static str) -> Self {
        self.unit = unit;
        self
    }

    /// Optional custom conversion functions to convert a plain value to a string and string
    /// to a plain value.
    ///
    /// Returned strings should not contain a unit, if a unit already was set for this parameter.
    /// If strings cannot be parsed, the callback should return `None`. Returned values will be
    /// clamped automatically.
    pub fn with_display<
        ValueToString: Fn(f32) -> String + Send + Sync + 'static,
        StringToValue: Fn(&str) -> Option<f32> + Send + Sync + 'static,
    >(
        mut self,
        value_to_string: ValueToString,
        string_to_value: StringToValue,
    ) -> Self {
        self.value_to_string = Some(Arc::new(value_to_string));
        self.string_to_value = Some(Arc::new(string_to_value));
        self
    }

    /// Create a raw, ParameterValueUpdate for this parameter.
    #[must_use]
    pub fn value_update(&self, value: f32) -> (FourCC, ParameterValueUpdate) {
        (self.id, ParameterValueUpdate::Raw(Box::new(value)))
    }

    /// The parameter's identifier.
    pub const fn id(&self) -> FourCC {
        self.id
    }

    /// The parameter's value range.
    pub fn range(&self) -> &RangeInclusive<f32> {
        &self.range
    }

    /// The parameter's default value.
    pub const fn default_value(&self) -> f32 {
        self.default
    }

    /// Clamp the given plain value to the parameter's range. NaN values fall back to the
    /// parameter's default value.
    pub fn clamp_value(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.default
        } else {
            value.clamp(*self.range.start(), *self.range.end())
        }
    }

    /// Normalize the given plain value to a 0.0-1.0 range.
    pub fn normalize_value(&self, value: f32) -> f32 {
        let (start, end) = (*self.range.start(), *self.range.end());
        if end > start {
            (self.clamp_value(value) - start) / (end - start)
        } else {
            0.0
        }
    }

    /// Denormalize a 0.0-1.0 ranged value to the corresponding plain value.
    pub fn denormalize_value(&self, normalized: f32) -> f32 {
        assert!((0.0..=1.0).contains(&normalized));
        *self.range.start() + normalized * (*self.range.end() - *self.range.start())
    }

    /// Convert the given plain value to a string, using a custom conversion function if provided.
    pub fn value_to_string(&self, value: f32, include_unit: bool) -> String {
        match (&self.value_to_string, include_unit && !self.unit.is_empty()) {
            (Some(f), true) => format!("{} {}", f(value), self.unit),
            (Some(f), false) => f(value),
            (None, true) => format!("{:.2} {}", value, self.unit),
            (None, false) => format!("{:.2}", value),
        }
    }

    /// Convert the given string to a plain value, using a custom conversion function if provided.
    pub fn string_to_value(&self, string: &str) -> Option<f32> {
        let value = match &self.string_to_value {
            Some(f) => f(string.trim()),
            None => string.trim().trim_end_matches(self.unit).trim().parse().ok(),
        }?;
        Some(self.clamp_value(value))
    }

    /// Convert a raw (`f32` or `f64`) or normalized parameter update into a clamped plain value.
    /// Unsupported updates are logged and yield `None`.
    pub fn value_from_update(&self, update: &ParameterValueUpdate) -> Option<f32> {
        match update {
            ParameterValueUpdate::Raw(raw) => {
                if let Some(value) = raw.downcast_ref::<f32>() {
                    Some(self.clamp_value(*value))
                } else if let Some(value) = raw.downcast_ref::<f64>() {
                    Some(self.clamp_value(*value as f32))
                } else {
                    log::warn!("Invalid value type for float parameter '{}'", self.id);
                    None
                }
            }
            ParameterValueUpdate::Normalized(normalized) => {
                if normalized.is_nan() {
                    log::warn!("Invalid normalized value for float parameter '{}'", self.id);
                    None
                } else {
                    Some(self.denormalize_value(normalized.clamp(0.0, 1.0)))
                }
            }
        }
    }
}

impl Parameter for FloatParameter {
    fn id(&self) -> FourCC {
        self.id
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn parameter_type(&self) -> ParameterType {
        ParameterType::Float
    }

    fn default_value(&self) -> f32 {
        self.normalize_value(self.default)
    }

    fn value_to_string(&self, normalized: f32, include_unit: bool) -> String {
        let value = self.denormalize_value(normalized.clamp(0.0, 1.0));
        self.value_to_string(value, include_unit)
    }

    fn string_to_value(&self, string: String) -> Option<f32> {
        let value = self.string_to_value(&string)?;
        Some(self.normalize_value(value))
    }
}

// -------------------------------------------------------------------------------------------------

/// Holds a float parameter value and its description.
#[derive(Debug, Clone)]
pub struct FloatParameterValue {
    /// The parameter's description and constraints.
    description: FloatParameter,
    /// The current value of the parameter.
    value: f32,
}

impl FloatParameterValue {
    /// Create a new parameter value with the given parameter description, initialized to the
    /// parameter's default value.
    pub fn from_description(description: FloatParameter) -> Self {
        let value = description.default_value();
        Self { value, description }
    }

    /// Access the parameter value's description.
    pub fn description(&self) -> &FloatParameter {
        &self.description
    }

    /// Access to the current value.
    #[inline(always)]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Set a new value, clamping the given value into the parameter's value bounds if necessary.
    pub fn set_value_clamped(&mut self, value: f32) {
        self.value = self.description.clamp_value(value);
    }

    /// Applies a parameter update.
    pub fn apply_update(&mut self, update: &ParameterValueUpdate) {
        if let Some(value) = self.description.value_from_update(update) {
            self.value = value;
        }
    }
}

impl From<FloatParameter> for FloatParameterValue {
    fn from(description: FloatParameter) -> Self {
        Self::from_description(description)
    }
}

impl Display for FloatParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let include_unit = true;
        f.write_str(&self.description.value_to_string(self.value, include_unit))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const DURATION: FloatParameter =
        FloatParameter::new(FourCC(*b"dur "), "Duration", 1.0..=1000.0, 50.0).with_unit("ms");

    #[test]
    fn clamping() {
        assert_eq!(DURATION.clamp_value(0.0), 1.0);
        assert_eq!(DURATION.clamp_value(5000.0), 1000.0);
        assert_eq!(DURATION.clamp_value(f32::NAN), 50.0);
        assert_eq!(DURATION.clamp_value(f32::INFINITY), 1000.0);

        let mut value = FloatParameterValue::from_description(DURATION);
        assert_eq!(value.value(), 50.0);
        value.set_value_clamped(-1.0);
        assert_eq!(value.value(), 1.0);
    }

    #[test]
    fn updates() {
        let mut value = FloatParameterValue::from(DURATION);
        value.apply_update(&ParameterValueUpdate::Raw(Box::new(100.0f32)));
        assert_eq!(value.value(), 100.0);
        value.apply_update(&ParameterValueUpdate::Raw(Box::new(20000.0f64)));
        assert_eq!(value.value(), 1000.0);
        value.apply_update(&ParameterValueUpdate::Normalized(0.0));
        assert_eq!(value.value(), 1.0);
        value.apply_update(&ParameterValueUpdate::Normalized(f32::NAN));
        assert_eq!(value.value(), 1.0);
        // wrong types are ignored
        value.apply_update(&ParameterValueUpdate::Raw(Box::new("100")));
        assert_eq!(value.value(), 1.0);
    }

    #[test]
    fn strings() {
        assert_eq!(DURATION.value_to_string(50.0, true), "50.00 ms");
        assert_eq!(DURATION.string_to_value("20 ms"), Some(20.0));
        assert_eq!(DURATION.string_to_value("20000"), Some(1000.0));
        assert_eq!(DURATION.string_to_value("abc"), None);

        let percent = FloatParameter::new(FourCC(*b"mix "), "Mix", 0.0..=1.0, 1.0)
            .with_unit("%")
            .with_display(
                |v| format!("{:.0}", v * 100.0),
                |s| s.parse::<f32>().map(|f| f / 100.0).ok(),
            );
        assert_eq!(percent.value_to_string(0.5, true), "50 %");
        assert_eq!(percent.string_to_value("25"), Some(0.25));
        assert_eq!(Parameter::default_value(&percent), 1.0);
    }
}
