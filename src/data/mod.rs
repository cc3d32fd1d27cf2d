//! Exchange metadata shared by the trading components

pub mod symbols;

pub use symbols::*;
