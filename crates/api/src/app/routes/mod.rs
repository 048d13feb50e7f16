pub mod local;
pub mod providers;
pub mod session;
pub mod system;
