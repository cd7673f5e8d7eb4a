use std::io::{BufRead, Write};

use shelfmark::{application::error::AppError, infra::error::InfraError};
use time::{Date, OffsetDateTime};

/// Ask a yes/no question; anything but an explicit yes declines.
pub fn confirm<R: BufRead, W: Write>(
    prompt: &str,
    input: &mut R,
    output: &mut W,
) -> Result<bool, AppError> {
    write!(output, "{prompt} [y/N] ").map_err(InfraError::from)?;
    output.flush().map_err(InfraError::from)?;

    let mut answer = String::new();
    input.read_line(&mut answer).map_err(InfraError::from)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}
