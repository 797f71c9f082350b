pub mod catalog;
pub mod hsv;
pub mod matcher;

pub use catalog::{PrimaryColor, PrimaryColorCatalog};
pub use hsv::{parse_hex, rgb_to_hex, Hsv};
pub use matcher::{find_closest_primary_color, ColorMatcher};
