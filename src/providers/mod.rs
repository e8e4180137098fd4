pub mod currency_api;
pub mod util;

pub use currency_api::CurrencyApiProvider;
