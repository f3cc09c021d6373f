//! Backend specializations of the shared S3 implementation.

pub mod r2;
pub mod s3;
