pub mod claim;
pub mod general;
