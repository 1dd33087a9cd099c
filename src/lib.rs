//! FBT: FOLIO Batch Toolkit
//!
//! A command-line utility for inspecting and bulk-editing inventory,
//! loan, and user records on a FOLIO library services platform, backing
//! up every record before it is touched.

pub mod cli;
pub mod core;
pub mod records;
