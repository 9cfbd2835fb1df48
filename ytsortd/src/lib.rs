pub mod daemon;
pub mod notify;
pub mod sort;
