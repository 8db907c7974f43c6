pub mod errors;
pub mod structs;
pub mod utils;
