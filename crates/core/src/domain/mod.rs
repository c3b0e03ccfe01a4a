pub mod analysis;
pub mod contract;
pub mod news;
pub mod series;
pub mod ticker;
