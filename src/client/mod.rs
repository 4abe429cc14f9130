pub mod ad_client;

pub use ad_client::AdClient;
