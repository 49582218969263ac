pub mod bcv;
pub mod binance_p2p;
pub mod coinmarketcap;
pub mod util;
