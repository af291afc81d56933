pub mod clans;
pub mod health;
pub mod players;
