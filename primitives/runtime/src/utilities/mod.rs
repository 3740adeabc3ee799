//! Utilities referenced from generated code.

mod double_array;

pub use double_array::DoubleArray;
