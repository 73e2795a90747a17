use thiserror::Error;

macro_rules! invariant_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::InvariantViolation {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::InvariantViolation {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// # Error Categories
///
/// ## Input Errors
/// - [`Error::StructuralInput`] - The handed-over IR is malformed or empty
///
/// ## Pipeline Errors
/// - [`Error::Scheduling`] - Pass declarations are circular or illegal
///
/// ## Contract Errors
/// - [`Error::InvariantViolation`] - An internal consistency check failed
/// - [`Error::Report`] - Writing a verbose report to its sink failed
///
/// # Examples
///
/// ```rust
/// use tacflow::{ir::CfgBuilder, Error};
///
/// match CfgBuilder::new().finish() {
///     Ok(_) => println!("built"),
///     Err(Error::StructuralInput(message)) => eprintln!("bad input: {message}"),
///     Err(e) => eprintln!("other error: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The IR handed to the engine is malformed.
    ///
    /// Raised for an empty program, a conditional branch without two targets,
    /// edges touching the sentinels in the wrong direction, or an unknown
    /// operator symbol. Fatal: no analysis runs on such input.
    #[error("Structural input error - {0}")]
    StructuralInput(String),

    /// The pass declarations cannot be scheduled.
    ///
    /// Raised before anything executes for circular dependencies, references
    /// to passes that are not registered, or a dependency/invalidation that
    /// targets a pass of an illegal kind.
    #[error("Scheduling error - {0}")]
    Scheduling(String),

    /// A programming contract was broken.
    ///
    /// Bit-set length mismatches, instructions or expressions missing from a
    /// table they should have been registered in, and dangling block or
    /// instruction handles all end up here. The error includes the source
    /// location where the violation was detected.
    ///
    /// # Fields
    ///
    /// * `message` - Description of the violated invariant
    /// * `file` - Source file where the violation was detected
    /// * `line` - Source line where the violation was detected
    #[error("Invariant violation - {file}:{line}: {message}")]
    InvariantViolation {
        /// The message to be printed for the violation
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Writing a verbose report failed.
    #[error("{0}")]
    Report(#[from] std::fmt::Error),
}
