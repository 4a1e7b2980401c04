//! History error types.

use crate::HistoryMode;
use thiserror::Error;

/// Errors raised by history adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
	/// The requested mode cannot be used on this host and no fallback is allowed.
	#[error("invalid history mode: {0}")]
	InvalidMode(String),

	/// The mode needs a browser host but none was provided.
	#[error("history mode '{0}' requires a browser host")]
	UnsupportedMode(HistoryMode),

	/// The adapter was torn down and no longer accepts writes.
	#[error("history adapter has been torn down")]
	TornDown,
}
