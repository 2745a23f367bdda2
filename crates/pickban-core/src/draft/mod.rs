pub mod role;
pub mod seat;
pub mod state;
