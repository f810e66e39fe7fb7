pub mod detail;
pub mod html;
pub mod listing;
pub mod text;


pub use listing::{CARD_SELECTOR, ListingField, ListingParser};
