//! the test_utils folder here will share utils or test components between unit
//! tests
mod common;
mod rule_builder;

pub use common::*;
pub use rule_builder::*;
