//! Thin pass-throughs over Google's REST APIs.
//!
//! Each wrapper maps request parameters straight onto the corresponding
//! Google endpoint and reshapes the response into the small models the
//! routes serve. No state, no caching; every wrapper borrows a
//! request-scoped [`client::AuthorizedClient`].

pub mod analytics;
pub mod calendar;
pub mod client;
pub mod gmail;

pub use analytics::AnalyticsApi;
pub use calendar::CalendarApi;
pub use client::AuthorizedClient;
pub use gmail::GmailApi;
