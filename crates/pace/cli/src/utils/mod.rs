//! Utility functions for the eid-pace CLI

pub(crate) mod display;
pub(crate) mod reader;
