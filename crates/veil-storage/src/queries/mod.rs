pub mod mapping_ops;
pub mod sequence_ops;
