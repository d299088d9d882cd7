//! Concrete decode engines.

pub mod symphonia;

#[cfg(test)]
pub(crate) mod scripted;
