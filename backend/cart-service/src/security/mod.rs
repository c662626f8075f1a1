pub mod permissions;

pub use permissions::{authorize, require, Decision, Requirement};
