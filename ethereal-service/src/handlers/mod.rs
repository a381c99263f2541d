pub mod documents;
pub mod health;
pub mod join;
pub mod locks;
pub mod messages;
pub mod pin;
pub mod room;
