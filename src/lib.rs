pub mod config;
pub mod error;
pub mod kernel;
pub mod nlu;
pub mod outputs;
pub mod services;
pub mod speech;

// Re-export specific items if needed for convenient access
pub use config::SignupConfig;
pub use error::{Result, SignupError};
pub use kernel::reactor::SignupReactor;
pub use kernel::session::{
    session_channel, SessionHandle, SessionIo, SessionOutcome, SignupSession, UiUpdate,
};
