pub mod http_balance_client;

pub use http_balance_client::HttpBalanceClient;
