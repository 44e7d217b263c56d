//! Logging setup shared by the command line programs.
use std::path::Path;

use error_stack::ResultExt;
use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        file::FileAppender,
    },
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    Config,
};

use crate::error::LoggingError;

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} [{l}] from line {L} in {M} - {m}{n}";

/// Log to stderr at `level`. If `log_file` is given, the same messages are
/// also appended to that file, so that a record of every warning raised
/// while processing a case survives the terminal session.
pub fn init_logging(level: log::LevelFilter, log_file: Option<&Path>) -> error_stack::Result<(), LoggingError> {
    let stderr = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(&format!("{{h({PATTERN})}}"))))
        .target(Target::Stderr)
        .build();

    let mut config = Config::builder().appender(Appender::builder().build("stderr", Box::new(stderr)));
    let mut root = Root::builder().appender("stderr");

    if let Some(log_file) = log_file {
        let file = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(PATTERN)))
            .build(log_file)
            .change_context_lazy(|| LoggingError::LogFile(log_file.to_path_buf()))?;
        config = config.appender(Appender::builder().build("file", Box::new(file)));
        root = root.appender("file");
    }

    let config = config
        .build(root.build(level))
        .change_context(LoggingError::Config)?;

    log4rs::init_config(config).change_context(LoggingError::Init)?;
    Ok(())
}
