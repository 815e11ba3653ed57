pub mod action;
pub mod config;
pub mod event;
pub mod game;
pub mod player;
pub mod role;
pub mod room;
pub mod window;
