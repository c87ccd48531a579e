//! Result type alias for the pseudonymizer

use super::errors::PseudonymizerError;

/// Result type alias for pseudonymizer operations
///
/// # Examples
///
/// ```
/// use pseudonymizer::domain::result::Result;
/// use pseudonymizer::domain::errors::PseudonymizerError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(PseudonymizerError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, PseudonymizerError>;
