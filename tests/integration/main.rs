//! Integration tests for the jcrgraph session cache, editor and locking

mod common;
mod editing;
mod identity;
mod items;
mod locking;
mod path_resolution;
mod repository;
