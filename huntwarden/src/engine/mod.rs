pub mod audit;
pub mod fusion;
