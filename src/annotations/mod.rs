pub mod detection;
pub mod point;
pub mod rectangle;
