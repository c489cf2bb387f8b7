pub mod fetch;
pub mod logging;
pub mod menu;
pub mod refresh;
pub mod scheduler;
