use colored::ColoredString;
use env_logger::Env;
use log::warn;
use std::io::Write;

/// Benchmark progress (per-100k-row lines, report paths, batch failures) at
/// `info`. The blocking `postgres` client and the `tokio_postgres` connection
/// it drives internally log every statement at `debug`; both are held at
/// `warn`.
const DEFAULT_FILTER: &str = "info,postgres=warn,tokio_postgres=warn";

/// Installs the global logger for the `ingest-bench` binaries.
///
/// Lines look like `2024-05-01 12:00:00.123 INFO [ingest] message`, where
/// `tag` tells the ingestion run and the results comparison apart.
/// `RUST_LOG` replaces the default filter. A second call keeps the logger
/// installed first.
pub fn init_logging(tag: ColoredString) {
    let installed = env_logger::Builder::from_env(Env::default().default_filter_or(DEFAULT_FILTER))
        .format(move |buf, record| {
            let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f");
            let style = buf.default_level_style(record.level());
            writeln!(
                buf,
                "{now} {style}{:<5}{style:#} {tag} {}",
                record.level(),
                record.args()
            )
        })
        .try_init();

    if installed.is_err() {
        warn!("logger already initialized, keeping the existing one");
    }
}
