pub mod lichess;
pub mod review;
