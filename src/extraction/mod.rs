//! Signal extraction from rendered HTML: visible text, images, SEO metadata,
//! style mining, the business identity record, and heuristic section
//! segmentation.

pub mod business;
pub mod page;
pub mod sections;
pub mod styles;
