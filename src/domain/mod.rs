pub mod board;
pub mod game;
pub mod models;
pub mod snapshot;
