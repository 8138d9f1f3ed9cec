pub mod cli;
pub mod pordisto;
