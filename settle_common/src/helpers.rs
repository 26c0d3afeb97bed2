use std::{env, str::FromStr, time::Duration};

/// Reads `name` from the environment and parses it. Missing or unparseable values yield `Err` with a human-readable
/// reason, so the caller can decide how loudly to complain before falling back to a default.
pub fn env_parse<T>(name: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(name).map_err(|e| format!("{name}: {e}"))?;
    raw.trim().parse::<T>().map_err(|e| format!("{name}={raw} is invalid: {e}"))
}

/// Reads a whole number of seconds from `name`. Zero is rejected, since every duration we configure drives a timer.
pub fn env_seconds(name: &str) -> Result<Duration, String> {
    match env_parse::<u64>(name)? {
        0 => Err(format!("{name} must be greater than zero")),
        secs => Ok(Duration::from_secs(secs)),
    }
}
