//! Pieces shared by every connector

pub mod error;
pub mod retry;

pub use error::{DatabaseError, DatabaseResult};
pub use retry::{RetryPolicy, connect_with_retry};
