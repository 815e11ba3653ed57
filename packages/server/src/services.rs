pub mod ability_chain;
pub mod day;
pub mod death;
pub(crate) mod game_driver;
pub mod game_service;
pub mod night;
pub mod room_service;
pub mod store;
pub mod timer;
pub mod vote;
pub mod win_condition;
