//! Token models: the durable [`StoredToken`](record::StoredToken) row and the in-memory
//! [`AccessToken`](access::AccessToken) view handed to callers.

pub mod access;
pub mod record;
pub mod secret;
