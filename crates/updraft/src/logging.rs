use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

pub fn init(debug_enabled: bool) {
    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .add_filter_allow_str("updraft")
        .build();

    let level = if debug_enabled {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    // Progress output owns stdout; logs go to stderr.
    let _ = TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto);
}
