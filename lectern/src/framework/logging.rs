use env_logger::{Builder, Env};
use log::{Level, LevelFilter};
use std::io::Write;
use termcolor::{BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

pub use log::{debug, error, info, trace, warn};

/// Used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str =
    "lectern=info,presenter_window=info,talks=info";

/// Windowing and file watching crates are chatty below warn.
const QUIET_MODULES: [&str; 4] = ["notify", "tao", "winit", "wry"];

/// Safe to call from both the runtime and the presenter process; only the
/// first call installs the logger.
pub fn init_logger() {
    let mut builder =
        Builder::from_env(Env::default().default_filter_or(DEFAULT_FILTER));

    for module in QUIET_MODULES {
        builder.filter_module(module, LevelFilter::Warn);
    }

    builder.format(|_buf, record| {
        let writer = BufferWriter::stdout(ColorChoice::Auto);
        let mut buffer = writer.buffer();
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(level_color(record.level())));

        buffer.set_color(&spec)?;
        write!(
            buffer,
            "[{}][{}]",
            record.level(),
            record.module_path().unwrap_or("<unknown>")
        )?;
        buffer.reset()?;
        writeln!(buffer, " {}", record.args())?;
        writer.print(&buffer)?;
        Ok(())
    });

    let _ = builder.try_init();
}

fn level_color(level: Level) -> Color {
    match level {
        Level::Trace => Color::Cyan,
        Level::Debug => Color::Blue,
        Level::Info => Color::Green,
        Level::Warn => Color::Yellow,
        Level::Error => Color::Red,
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn default_filter_covers_every_binary() {
        for target in ["lectern", "presenter_window", "talks"] {
            assert!(DEFAULT_FILTER.contains(&format!("{}=info", target)));
        }
    }

    #[test]
    fn problems_stand_out_from_routine_output() {
        assert_eq!(level_color(Level::Warn), Color::Yellow);
        assert_eq!(level_color(Level::Error), Color::Red);
        assert_ne!(level_color(Level::Info), level_color(Level::Debug));
    }

    #[test]
    #[serial]
    fn repeated_init_is_harmless() {
        init_logger();
        init_logger();
        log::info!("logger installed once");
    }
}
