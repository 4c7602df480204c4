//! Generation parameters and the stream request built from them.

use std::fmt;

use crate::core::message::SessionId;

pub const DEFAULT_MAX_TOKENS: u32 = 100;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Per-request generation settings. The backend clamps both further
/// (max tokens to 200, temperature to 0.0..=1.0); we only reject nonsense.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamsError {
    /// `max_tokens` must be at least 1.
    ZeroMaxTokens,
    /// `temperature` must be finite and non-negative.
    InvalidTemperature(f64),
}

impl fmt::Display for ParamsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamsError::ZeroMaxTokens => write!(f, "max tokens must be positive"),
            ParamsError::InvalidTemperature(t) => {
                write!(f, "temperature must be a non-negative number (got {t})")
            }
        }
    }
}

impl std::error::Error for ParamsError {}

impl GenerationParams {
    pub fn new(max_tokens: u32, temperature: f64) -> Result<Self, ParamsError> {
        let params = Self {
            max_tokens,
            temperature,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.max_tokens == 0 {
            return Err(ParamsError::ZeroMaxTokens);
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(ParamsError::InvalidTemperature(self.temperature));
        }
        Ok(())
    }

    /// Steps max tokens by `delta`, never below 1.
    pub fn step_max_tokens(self, delta: i64) -> Self {
        let stepped = (self.max_tokens as i64 + delta).clamp(1, u32::MAX as i64);
        Self {
            max_tokens: stepped as u32,
            ..self
        }
    }

    /// Steps temperature by `delta`, never below 0, rounded to one decimal.
    pub fn step_temperature(self, delta: f64) -> Self {
        let stepped = ((self.temperature + delta) * 10.0).round() / 10.0;
        Self {
            temperature: stepped.max(0.0),
            ..self
        }
    }
}

/// Everything needed to open one reply stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequest {
    pub prompt: String,
    pub session_id: SessionId,
    pub params: GenerationParams,
}
