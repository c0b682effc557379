use std::fmt::{Debug, Display};

use crate::utils::smoothing::{ExponentialSmoothedValue, SmoothedValue};

use super::{FloatParameter, ParameterValueUpdate};

// -------------------------------------------------------------------------------------------------

/// Holds a float parameter value and its description, using a [`SmoothedValue`] instance to
/// smoothly update the value on changes.
///
/// The smoothed value needs a valid sample rate set. So make sure to call [`Self::set_sample_rate`]
/// as soon as the parameter's owner gets prepared.
///
/// To configure step sizes or inertia of the smoother, use [`Self::with_smoother`].
#[derive(Debug, Clone)]
pub struct SmoothedParameterValue<Value: SmoothedValue = ExponentialSmoothedValue> {
    /// The parameter's description and constraints.
    description: FloatParameter,
    /// The smoothed value of the parameter.
    value: Value,
}

impl<Value: SmoothedValue> SmoothedParameterValue<Value> {
    /// Create a new SmoothedParameterValue with the given parameter, using
    /// a default instance of a smoother, initialized to the parameter's default value.
    ///
    /// NB: Call `set_sample_rate` before using the parameter value to properly set up
    /// the default constructed smoother!
    pub fn from_description(description: FloatParameter) -> Self
    where
        Value: From<f32>,
    {
        let value = Value::from(description.default_value());
        Self { value, description }
    }

    /// Create a smoothed value with the given smoother instance. The instance's value
    /// will be set to the parameter's default value - all other smoother properties
    /// are kept intact.
    pub fn with_smoother(mut self, value: Value) -> Self {
        self.value = value;
        self.value.init(self.description.default_value());
        self
    }

    /// Access the parameter value's description.
    pub fn description(&self) -> &FloatParameter {
        &self.description
    }

    /// Set a sample rate for the smoother. Must be called before using the value!
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.value.set_sample_rate(sample_rate)
    }

    /// Test if ramping is necessary. When not, `target_value` can be used directly without
    /// ramping to avoid processing overhead.
    pub fn value_need_ramp(&self) -> bool {
        self.value.need_ramp()
    }

    /// Apply smoothing, if needed, and return current value. This should be called once
    /// per sample frame.
    #[inline(always)]
    pub fn next_value(&mut self) -> f32 {
        self.value.next()
    }

    /// Access to the smoothed current value.
    #[inline(always)]
    pub fn current_value(&self) -> f32 {
        self.value.current()
    }

    /// Access to the smoothed target value.
    #[inline(always)]
    pub fn target_value(&self) -> f32 {
        self.value.target()
    }

    /// Set a new smoothed target value, clamping the given value into the
    /// parameter's value bounds if necessary.
    pub fn set_target_value_clamped(&mut self, value: f32) {
        self.value.set_target(self.description.clamp_value(value));
    }

    /// Initialize the smoothed value so that no smoothing is performed, clamping the
    /// given value into the parameter's value bounds if necessary.
    pub fn init_value_clamped(&mut self, value: f32) {
        self.value.init(self.description.clamp_value(value));
    }

    /// Skip pending ramps: move the current value to the target value.
    pub fn snap_to_target(&mut self) {
        let target = self.value.target();
        self.value.init(target);
    }

    /// Applies a parameter update by setting a new target value.
    pub fn apply_update(&mut self, update: &ParameterValueUpdate) {
        if let Some(value) = self.description.value_from_update(update) {
            self.value.set_target(value);
        }
    }
}

impl<Value: SmoothedValue> From<FloatParameter> for SmoothedParameterValue<Value>
where
    Value: From<f32>,
{
    fn from(description: FloatParameter) -> Self {
        Self::from_description(description)
    }
}

impl<Value: SmoothedValue> Display for SmoothedParameterValue<Value> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let include_unit = true;
        f.write_str(
            &self
                .description
                .value_to_string(self.value.target(), include_unit),
        )
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use four_cc::FourCC;

    use super::*;
    use crate::utils::smoothing::LinearSmoothedValue;

    #[test]
    fn smoothed_updates() {
        let mut drive = SmoothedParameterValue::from_description(FloatParameter::new(
            FourCC(*b"driv"),
            "Drive",
            0.0..=2.0,
            0.5,
        ))
        .with_smoother(LinearSmoothedValue::with_step(0.0, 0.01, 44100));
        assert_eq!(drive.current_value(), 0.5);
        assert!(!drive.value_need_ramp());

        drive.apply_update(&ParameterValueUpdate::Raw(Box::new(5.0f32)));
        assert_eq!(drive.target_value(), 2.0);
        assert!(drive.value_need_ramp());
        let first = drive.next_value();
        assert!(first > 0.5 && first < 2.0);

        drive.snap_to_target();
        assert!(!drive.value_need_ramp());
        assert_eq!(drive.next_value(), 2.0);

        drive.init_value_clamped(-1.0);
        assert_eq!(drive.current_value(), 0.0);
        assert_eq!(drive.target_value(), 0.0);
    }
}
