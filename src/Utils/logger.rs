use chrono::Local;
use simplelog::{
    ColorChoice, CombinedLogger, Config, LevelFilter, TermLogger, TerminalMode, WriteLogger,
};
use std::fs::File;

/// install a combined terminal + timestamped-file logger. Returns false when
/// a logger was already installed (the call is then a no-op, which keeps
/// repeated initialization in tests harmless).
pub fn init_combined_logger(loglevel: Option<&str>) -> bool {
    let log_option = if let Some(level) = loglevel {
        match level {
            "debug" => LevelFilter::Debug,
            "info" => LevelFilter::Info,
            "warn" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            _ => panic!("loglevel must be debug, info, warn or error"),
        }
    } else {
        LevelFilter::Info
    };
    let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let name = format!("log_{}.txt", date_and_time);
    let logger_instance = CombinedLogger::init(vec![
        TermLogger::new(
            log_option,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(log_option, Config::default(), File::create(name).unwrap()),
    ]);
    logger_instance.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_init_is_harmless() {
        let first = init_combined_logger(Some("warn"));
        let second = init_combined_logger(Some("warn"));
        // whichever call came first won; the other must report failure
        assert!(!(first && second));
    }

    #[test]
    #[should_panic]
    fn test_unknown_loglevel_panics() {
        init_combined_logger(Some("loud"));
    }
}
