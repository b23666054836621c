//! Base types and error handling.
//!
//! - [`NetError`](neterror::NetError): the error taxonomy for a single
//!   connection attempt

pub mod neterror;
