pub mod common;
pub mod naming;
pub mod pvc;
