//! Cafe photo uploads
//!
//! Request parsing, rating of the new cafe against the catalog and the
//! receipts handed back to clients.

pub mod receipt;
pub mod request;
pub mod service;

pub use receipt::{CafeSummary, UploadReceipt};
pub use request::{GeoOverrides, UploadRequest, ValidatedUpload};
pub use service::UploadService;
