mod points;

pub mod helpers;
pub mod luhn;
pub mod op;
mod secret;

pub use points::{Points, PointsConversionError};
pub use secret::Secret;
