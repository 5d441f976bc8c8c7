pub mod session_error;

pub use session_error::{ErrorCode, SessionError, SessionResult};
