//! IO modules - side effects (network, filesystem)

pub mod bundle;
pub mod extract;
pub mod fetch;
