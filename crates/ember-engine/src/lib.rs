//! Ember engine crate.
//!
//! CPU staging and GPU upload of particle vertex streams, plus the device and
//! logging plumbing around it.

pub mod backend;
pub mod buffers;
pub mod device;
pub mod logging;
