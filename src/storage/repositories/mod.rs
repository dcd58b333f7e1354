//! Repository implementations over the SQLite pool.

pub mod account;
pub mod session_token;

pub use account::{AccountRepository, SqlxAccountRepository};
pub use session_token::{SessionTokenRepository, SqlxSessionTokenRepository};
