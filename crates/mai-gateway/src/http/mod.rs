pub mod conversations;
pub mod email;
pub mod health;
pub mod memory;
pub mod schedule;
pub mod settings;
