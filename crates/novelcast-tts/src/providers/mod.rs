//! Speech provider implementations.

mod google;

pub use google::GoogleTranslateProvider;
