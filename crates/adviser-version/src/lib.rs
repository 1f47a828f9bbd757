//! Version parsing, ordering and requirement specifiers for Python packages
//!
//! This crate implements the subset of PEP 440 the stack adviser needs to
//! order candidate releases and to filter them against requirement
//! specifiers such as `>=1.2,<2.0` or `~=1.4`.

mod error;
mod operator;
mod specifier;
mod version;

pub use error::VersionError;
pub use operator::Operator;
pub use specifier::{Specifier, SpecifierSet};
pub use version::{PreRelease, Version};
