pub mod dns_cache;
pub mod probe;

pub use dns_cache::DnsCache;
pub use probe::PlatformChecker;
