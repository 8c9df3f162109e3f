//! Error handling utilities

use tracing::error;

/// Handle fatal errors and exit with appropriate status code
///
/// - For `ClaudoError`: shows the user message, plus the developer message
///   with its context chain when `verbose >= 1`
/// - For other errors: shows the message and, in verbose mode, the cause chain
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    use crate::error::ClaudoError;

    error!("Fatal error: {}", error);

    let exit_code = if let Some(claudo_err) = error.downcast_ref::<ClaudoError>() {
        eprintln!("{}", claudo_err.user_message());

        if verbose >= 1 {
            eprintln!("\nContext Chain:\n{}", claudo_err.developer_message());
        }

        claudo_err.exit_code()
    } else {
        eprintln!("Error: {error}");

        if verbose >= 1 {
            eprintln!("\nError chain:");
            for (i, cause) in error.chain().enumerate() {
                eprintln!("  {}: {}", i, cause);
            }
        }

        1
    };

    std::process::exit(exit_code)
}
