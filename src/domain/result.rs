//! Result type alias for the intake pipeline

use super::errors::IntakeError;

/// Result type alias for intake operations
///
/// # Examples
///
/// ```
/// use emr_intake::domain::result::Result;
/// use emr_intake::domain::errors::IntakeError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(IntakeError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, IntakeError>;
