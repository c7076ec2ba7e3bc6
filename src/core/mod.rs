pub mod calculation;
pub mod memory;
pub mod registry;
pub mod scoreboard;
pub mod tictoc;
