//! Data models for the loader

pub mod data_point;
pub mod subject;

pub use data_point::{DataPoint, SUBJECT_TAG};
pub use subject::{derive_subject_key, Demographics, SubjectRecord};
