pub mod dialog;
pub mod product;
pub mod slots;
