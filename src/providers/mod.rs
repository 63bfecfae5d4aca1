pub mod steam_market;
pub mod util;
