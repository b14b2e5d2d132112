//! The `utils` module collects the pieces shared by every layer of the
//! broker: the error taxonomy and the logging setup.

pub mod error;
pub mod logging;

pub use error::BrokerError;

#[cfg(test)]
mod tests {
    use super::logging;

    #[test]
    fn logging_init_accepts_levels() {
        // Should not panic
        logging::init("info");
        logging::init("debug");
        logging::init("not-a-level");
    }
}
