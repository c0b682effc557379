use std::{fmt::Display, str::FromStr};

use four_cc::FourCC;
use strum::IntoEnumIterator;

use super::{Parameter, ParameterType, ParameterValueUpdate};

// -------------------------------------------------------------------------------------------------

/// An enum parameter descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumParameter {
    id: FourCC,
    name: &'static str,
    values: Vec<String>,
    default_index: usize,
}

impl EnumParameter {
    /// Create a new enum parameter descriptor from all variants of the given enum type.
    pub fn new<E: IntoEnumIterator + ToString + PartialEq>(
        id: FourCC,
        name: &'static str,
        default: E,
    ) -> Self {
        let values = E::iter().map(|v| v.to_string()).collect::<Vec<_>>();
        let default_index = E::iter().position(|r| r == default).unwrap_or(0);
        Self {
            id,
            name,
            values,
            default_index,
        }
    }

    /// Create a raw, ParameterValueUpdate for this parameter.
    #[must_use]
    pub fn value_update<E: Send + Sync + 'static>(
        &self,
        value: E,
    ) -> (FourCC, ParameterValueUpdate) {
        (self.id, ParameterValueUpdate::Raw(Box::new(value)))
    }

    /// The parameter's identifier.
    pub const fn id(&self) -> FourCC {
        self.id
    }

    /// All possible values as strings.
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// The parameter's default value as string.
    pub fn default_value(&self) -> &String {
        &self.values[self.default_index]
    }

    /// Normalize the given string value to a 0.0-1.0 range.
    pub fn normalize_value(&self, value: &str) -> f32 {
        if self.values.len() > 1 {
            if let Some(index) = self.values.iter().position(|v| v == value) {
                return index as f32 / (self.values.len() - 1) as f32;
            }
        }
        0.0
    }

    /// Denormalize a 0.0-1.0 ranged value to the corresponding string value.
    pub fn denormalize_value(&self, normalized: f32) -> &String {
        assert!((0.0..=1.0).contains(&normalized));
        let index = (normalized * (self.values.len() - 1) as f32).round() as usize;
        &self.values[index]
    }

    /// Convert a raw (`T` or `String`) or normalized parameter update into a plain enum value.
    /// Unsupported or unparsable updates are logged and yield `None`.
    pub fn value_from_update<T: FromStr + Clone + 'static>(
        &self,
        update: &ParameterValueUpdate,
    ) -> Option<T> {
        let value = match update {
            ParameterValueUpdate::Raw(raw) => {
                if let Some(value) = raw.downcast_ref::<T>() {
                    return Some(value.clone());
                } else if let Some(value_str) = raw.downcast_ref::<String>() {
                    T::from_str(value_str).ok()
                } else {
                    log::warn!("Invalid value type for enum parameter '{}'", self.id);
                    return None;
                }
            }
            ParameterValueUpdate::Normalized(normalized) => {
                if normalized.is_nan() {
                    log::warn!("Invalid normalized value for enum parameter '{}'", self.id);
                    return None;
                }
                T::from_str(self.denormalize_value(normalized.clamp(0.0, 1.0))).ok()
            }
        };
        if value.is_none() {
            log::warn!("Invalid string value for enum parameter '{}'", self.id);
        }
        value
    }
}

impl Parameter for EnumParameter {
    fn id(&self) -> FourCC {
        self.id
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn parameter_type(&self) -> ParameterType {
        ParameterType::Enum {
            values: self.values.clone(),
        }
    }

    fn default_value(&self) -> f32 {
        self.normalize_value(self.default_value())
    }

    fn value_to_string(&self, normalized: f32, _include_unit: bool) -> String {
        self.denormalize_value(normalized.clamp(0.0, 1.0)).clone()
    }

    fn string_to_value(&self, string: String) -> Option<f32> {
        let string = string.trim();
        self.values
            .iter()
            .find(|v| v.eq_ignore_ascii_case(string))
            .map(|v| self.normalize_value(v))
    }
}

// -------------------------------------------------------------------------------------------------

/// Holds an enum parameter value and its description.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumParameterValue<T: Sized + Clone> {
    /// The current value of the parameter.
    value: T,
    /// The parameter's description and constraints.
    description: EnumParameter,
}

impl<T: Sized + FromStr + Default + Clone + 'static> EnumParameterValue<T> {
    /// Create a new parameter value with the given parameter description, initialized to the
    /// parameter's default value.
    pub fn from_description(description: EnumParameter) -> Self {
        let value = T::from_str(description.default_value()).unwrap_or_default();
        Self { value, description }
    }

    /// Access the parameter value's description.
    pub fn description(&self) -> &EnumParameter {
        &self.description
    }

    /// Access to the current value.
    #[inline(always)]
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Set a new value.
    pub fn set_value(&mut self, value: T) {
        self.value = value;
    }

    /// Applies a parameter update.
    pub fn apply_update(&mut self, update: &ParameterValueUpdate) {
        if let Some(value) = self.description.value_from_update(update) {
            self.value = value;
        }
    }
}

impl<T: Sized + FromStr + Default + Clone + 'static> From<EnumParameter>
    for EnumParameterValue<T>
{
    fn from(description: EnumParameter) -> Self {
        Self::from_description(description)
    }
}

impl<T: Sized + Clone + Display> Display for EnumParameterValue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.value, f)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DistortionAlgorithm;

    #[test]
    fn enum_updates() {
        let description = EnumParameter::new(
            FourCC(*b"algo"),
            "Algorithm",
            DistortionAlgorithm::Diode,
        );
        assert_eq!(description.values().len(), 5);
        assert_eq!(description.default_value(), "Diode");
        assert_eq!(Parameter::default_value(&description), 0.5);
        assert_eq!(
            description.string_to_value(" foldback ".to_string()),
            Some(1.0)
        );
        assert_eq!(description.string_to_value("Overdrive".to_string()), None);

        let mut value = EnumParameterValue::<DistortionAlgorithm>::from_description(description);
        assert_eq!(*value.value(), DistortionAlgorithm::Diode);
        value.apply_update(&ParameterValueUpdate::Normalized(0.0));
        assert_eq!(*value.value(), DistortionAlgorithm::SoftClip);
        value.apply_update(&ParameterValueUpdate::Raw(Box::new("Fuzz".to_string())));
        assert_eq!(*value.value(), DistortionAlgorithm::Fuzz);
        value.apply_update(&ParameterValueUpdate::Raw(Box::new(3u8)));
        assert_eq!(*value.value(), DistortionAlgorithm::Fuzz);
        assert_eq!(value.to_string(), "Fuzz");
    }
}
