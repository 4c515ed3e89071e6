pub mod coordinate;
pub mod difficulty;
pub mod distance;
pub mod landmark;
pub mod results;
pub mod score;
