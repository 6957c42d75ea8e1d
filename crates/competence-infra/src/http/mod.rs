//! HTTP adapters.

pub mod character;

pub use character::HttpCharacterRepository;
