pub mod health;
pub mod recommendation;
