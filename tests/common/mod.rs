#![allow(dead_code)]

pub mod analyzers;
pub mod builders;
pub mod strategies;

pub use analyzers::*;
pub use builders::*;
