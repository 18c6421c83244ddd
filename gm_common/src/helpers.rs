use std::{fmt::Display, str::FromStr};

/// The outcome of reading an optional, typed setting from a string source such as an environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedSetting<T> {
    /// The value was not supplied; the default was used.
    Missing(T),
    /// The value was supplied and parsed.
    Parsed(T),
    /// The value was supplied but could not be parsed; the default was used. Holds the parse error message.
    Invalid(T, String),
}

impl<T> ParsedSetting<T> {
    pub fn value(self) -> T {
        match self {
            Self::Missing(v) | Self::Parsed(v) | Self::Invalid(v, _) => v,
        }
    }
}

/// Parse a setting from an optional string, falling back to `default` when it is absent or malformed.
pub fn parse_setting<T>(value: Option<String>, default: T) -> ParsedSetting<T>
where
    T: FromStr,
    T::Err: Display,
{
    match value {
        None => ParsedSetting::Missing(default),
        Some(s) => match s.trim().parse::<T>() {
            Ok(v) => ParsedSetting::Parsed(v),
            Err(e) => ParsedSetting::Invalid(default, e.to_string()),
        },
    }
}
