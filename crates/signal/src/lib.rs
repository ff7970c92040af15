pub mod consensus;
pub mod machine;
