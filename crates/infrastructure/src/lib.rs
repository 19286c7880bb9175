pub mod dns;
pub mod prefix;
