mod mt29f;

pub use mt29f::{MT29F1G01ABAFD, MT29F};
