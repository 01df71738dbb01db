//! Handlers 模块

pub mod points;

pub use points::*;
