pub mod address;
pub mod date;
pub mod name;
pub mod normalizer;

pub use normalizer::Normalizer;
