//! Marketplace-facing descriptor data.
//!
//! `descriptor` exposes validated metadata (`MarketplaceDescriptor`) covering the HTTPS-only
//! OAuth endpoints, the REST API base, and the redirect URI registered for the seller
//! application.

pub mod descriptor;

pub use descriptor::*;
