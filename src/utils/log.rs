use chrono::Local;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

/// Appends a timestamped message to a log file under `logs/`.
///
/// # Arguments
///
/// * `filename` - The name of the log file inside the logs directory
/// * `message` - The message to log
///
/// # Returns
///
/// * `io::Result<()>` - Success or error result
pub fn log_to_file(filename: &str, message: &str) -> io::Result<()> {
    let log_dir = "logs";
    if !Path::new(log_dir).exists() {
        std::fs::create_dir_all(log_dir)?;
    }

    let path = format!("{}/{}", log_dir, filename);

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    writeln!(file, "[{}] {}", timestamp, message)?;
    file.flush()?;

    Ok(())
}

/// Appends a row to a CSV file under `logs/`, writing headers first when the
/// file is new.
pub fn log_csv(filename: &str, headers: &[&str], data: &[&str]) -> io::Result<()> {
    let log_dir = "logs";
    if !Path::new(log_dir).exists() {
        std::fs::create_dir_all(log_dir)?;
    }

    let path = format!("{}/{}", log_dir, filename);
    let file_exists = Path::new(&path).exists();

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    if !file_exists && !headers.is_empty() {
        writeln!(file, "{}", headers.join(","))?;
    }

    writeln!(file, "{}", data.join(","))?;
    file.flush()?;

    Ok(())
}
