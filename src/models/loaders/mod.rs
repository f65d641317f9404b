pub mod list_loader;

pub use list_loader::{load_identities, load_proxies, parse_identities, parse_list, parse_proxies};
