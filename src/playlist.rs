//! M3U playlist parsing into channel records

mod parser;
mod slug;
mod structs;

pub use parser::{
    DEFAULT_GROUP, DEFAULT_STRIP_PREFIXES, DEFAULT_URL_SCHEMES, ParseOptions, UNKNOWN_CHANNEL_NAME,
    parse, parse_with,
};
pub use slug::slugify;
pub use structs::ChannelRecord;
