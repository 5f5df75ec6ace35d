pub mod bootstrap;
pub mod common;
pub mod domain;
pub mod grid;
pub mod modules;
pub mod parallel;
