use std::str::FromStr;

pub fn init_logger(level: &str) -> eyre::Result<()> {
    let level = log::LevelFilter::from_str(level).unwrap_or(log::LevelFilter::Info);

    simple_logger::SimpleLogger::new()
        .with_level(level)
        .env()
        .init()?;

    Ok(())
}
