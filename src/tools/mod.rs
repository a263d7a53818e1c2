pub mod review;

pub use review::MrReviewer;
