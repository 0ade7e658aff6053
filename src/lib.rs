//! Verify that the RPMs installed in container images are signed.
//!
//! Given an image (possibly a multi-architecture index), this crate extracts the RPM database of
//! every image it stands for, classifies each installed package as signed or unsigned, and
//! summarizes the signing keys seen.  The heavy lifting is left to external tools: skopeo for
//! registry inspection, `oc image extract` for pulling the database out of an image and rpm for
//! reading it.  See [`tools::RpmTools`].
//!
//! The entry point is [`verify::verify`].

pub mod classify;
pub mod cmd;
pub mod config;
pub mod error;
pub mod fanout;
pub mod image;
pub mod report;
pub mod resolve;
pub mod snapshot;
pub mod tools;
pub mod verify;
