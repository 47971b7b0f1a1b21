//! Galleria Application - Use cases and ports
//!
//! This crate holds the client's behaviour: the authenticated request
//! pipeline with refresh coordination, the upload pipeline, the notification
//! socket client and the view tracker. All I/O goes through the traits in
//! [`ports`], implemented by the infrastructure layer.

pub mod auth;
pub mod error;
pub mod notify;
pub mod ports;
pub mod upload;
pub mod views;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{expect_success, ApplicationError, ApplicationResult};
