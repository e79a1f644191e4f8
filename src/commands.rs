pub mod call;
pub mod interactive;
