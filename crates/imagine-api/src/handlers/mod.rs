pub mod health;
pub mod transform;
