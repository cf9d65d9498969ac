pub mod product;
pub mod snapshot;

pub use product::*;
pub use snapshot::*;

// Emoji used across chat messages
pub const EMOJI_SHOP: &str = "🛍️";
pub const EMOJI_PRICE: &str = "💰";
pub const EMOJI_LINK: &str = "🔗";
pub const EMOJI_NEW: &str = "🆕";
pub const EMOJI_PRICE_CHANGE: &str = "💱";
pub const EMOJI_SEARCH: &str = "🔍";
pub const EMOJI_CHECK: &str = "✅";
pub const EMOJI_CROSS: &str = "❌";
pub const EMOJI_WARNING: &str = "❗";
pub const EMOJI_EMPTY: &str = "🚫";
pub const EMOJI_ROBOT: &str = "🤖";
pub const EMOJI_BOOK: &str = "📖";
