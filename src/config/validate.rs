// src/config/validate.rs

use crate::config::duration::parse_duration;
use crate::config::model::{default_artifact_dir, Config, RawConfigFile, RawSourceSection, RunSection};
use crate::errors::{BinvisorError, Result};
use crate::exec::RunnerOptions;
use crate::source::SourceDescriptor;

impl TryFrom<RawConfigFile> for Config {
    type Error = BinvisorError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let source = validate_source(&raw.source)?;
        let runner = validate_run(&raw.run)?;

        if raw.provision.chunk_size == 0 {
            return Err(BinvisorError::ConfigError(
                "[provision].chunk_size must be >= 1 (got 0)".to_string(),
            ));
        }
        let file_name = raw.provision.file_name.trim();
        if file_name.is_empty() || file_name.contains(['/', '\\']) {
            return Err(BinvisorError::ConfigError(format!(
                "[provision].file_name must be a plain file name (got '{}')",
                raw.provision.file_name
            )));
        }

        let dir = raw.provision.dir.clone().unwrap_or_else(default_artifact_dir);

        Ok(Config {
            source,
            length_header: raw.source.length_header.clone(),
            local_path: dir.join(file_name),
            chunk_size: raw.provision.chunk_size,
            runner,
        })
    }
}

fn validate_source(src: &RawSourceSection) -> Result<SourceDescriptor> {
    let digest = hex::decode(src.digest.trim()).map_err(|e| {
        BinvisorError::ConfigError(format!("[source].digest is not valid hex: {e}"))
    })?;
    let expected_len = src.algorithm.digest_len();
    if digest.len() != expected_len {
        return Err(BinvisorError::ConfigError(format!(
            "[source].digest must be {} bytes for {:?} (got {})",
            expected_len,
            src.algorithm,
            digest.len()
        )));
    }

    if src.length_header.trim().is_empty() {
        return Err(BinvisorError::ConfigError(
            "[source].length_header must not be empty".to_string(),
        ));
    }

    match (&src.url, &src.host, &src.path) {
        (Some(url), host, None) => {
            let url = match host {
                Some(host) => override_url_host(url, host)?,
                None => url.clone(),
            };
            SourceDescriptor::new(url, digest, src.algorithm)
        }
        (None, Some(host), Some(path)) => {
            SourceDescriptor::from_host(&src.scheme, host, path, digest, src.algorithm)
        }
        (Some(_), _, Some(_)) => Err(BinvisorError::ConfigError(
            "[source] must set either `url` or `host` + `path`, not both".to_string(),
        )),
        _ => Err(BinvisorError::ConfigError(
            "[source] must set either `url` or `host` + `path`".to_string(),
        )),
    }
}

fn override_url_host(url: &str, host: &str) -> Result<String> {
    let mut parsed = reqwest::Url::parse(url)
        .map_err(|e| BinvisorError::ConfigError(format!("[source].url '{url}' is invalid: {e}")))?;
    parsed.set_host(Some(host.trim())).map_err(|e| {
        BinvisorError::ConfigError(format!("host override '{host}' is invalid: {e}"))
    })?;
    Ok(parsed.to_string())
}

fn validate_run(run: &RunSection) -> Result<RunnerOptions> {
    if run.sentinel.is_empty() {
        return Err(BinvisorError::ConfigError(
            "[run].sentinel must not be empty".to_string(),
        ));
    }

    let parse = |field: &str, value: &str| {
        parse_duration(value)
            .map_err(|e| BinvisorError::ConfigError(format!("[run].{field}: {e}")))
    };

    let poll_interval = parse("poll_interval", &run.poll_interval)?;
    if poll_interval.is_zero() {
        return Err(BinvisorError::ConfigError(
            "[run].poll_interval must be greater than zero".to_string(),
        ));
    }

    Ok(RunnerOptions {
        sentinel: run.sentinel.clone(),
        grace_period: parse("grace_period", &run.grace_period)?,
        poll_interval,
        exit_timeout: parse("exit_timeout", &run.exit_timeout)?,
    })
}
