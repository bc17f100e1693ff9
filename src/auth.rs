//! Identifiers, token secrets, and the stored/cached token models.

pub mod id;
pub mod token;

pub use id::*;
pub use token::{access::*, record::*, secret::*};
