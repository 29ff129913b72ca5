//! Filtering of generated Go sources, which carry a
//! `// Code generated … DO NOT EDIT.` header and are outside the
//! project's direct control.

use std::fs;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;

use regex::Regex;

fn generated_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^// Code generated .* DO NOT EDIT\.").unwrap())
}

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Whether `source` starts with a generated-code header on its first
/// non-empty line.
pub fn is_generated(source: &str) -> bool {
    source
        .lines()
        .find(|line| !line.trim().is_empty())
        .is_some_and(|line| generated_header().is_match(line))
}

/// Returns the subsequence of `paths` whose contents are not generated,
/// preserving input order. Multiple files are read concurrently by up to
/// one worker per logical CPU; survivors are re-ordered by an explicit
/// position tag. A read error aborts the whole filter.
pub fn filter_generated(paths: &[PathBuf]) -> Result<Vec<PathBuf>, FilterError> {
    match paths.len() {
        0 => Ok(Vec::new()),
        1 => {
            let path = &paths[0];
            if read_is_generated(path)? {
                Ok(Vec::new())
            } else {
                Ok(vec![path.clone()])
            }
        }
        _ => filter_concurrently(paths),
    }
}

fn read_is_generated(path: &PathBuf) -> Result<bool, FilterError> {
    let blob = fs::read(path).map_err(|source| FilterError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(is_generated(&String::from_utf8_lossy(&blob)))
}

fn filter_concurrently(paths: &[PathBuf]) -> Result<Vec<PathBuf>, FilterError> {
    let workers = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(paths.len());

    let (job_tx, job_rx) = mpsc::channel::<(usize, &PathBuf)>();
    for job in paths.iter().enumerate() {
        // The receiver outlives this loop; sends cannot fail.
        let _ = job_tx.send(job);
    }
    drop(job_tx);
    let job_rx = Arc::new(Mutex::new(job_rx));

    let (keep_tx, keep_rx) = mpsc::channel::<(usize, PathBuf)>();

    thread::scope(|scope| -> Result<(), FilterError> {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let jobs = Arc::clone(&job_rx);
                let keep = keep_tx.clone();
                scope.spawn(move || -> Result<(), FilterError> {
                    loop {
                        let job = {
                            let guard = jobs.lock().expect("filter queue poisoned");
                            guard.recv()
                        };
                        let Ok((pos, path)) = job else {
                            return Ok(());
                        };
                        if !read_is_generated(path)? {
                            let _ = keep.send((pos, path.clone()));
                        }
                    }
                })
            })
            .collect();
        drop(keep_tx);

        for handle in handles {
            handle.join().expect("filter worker panicked")?;
        }
        Ok(())
    })?;

    let mut kept: Vec<(usize, PathBuf)> = keep_rx.iter().collect();
    kept.sort_by_key(|(pos, _)| *pos);
    Ok(kept.into_iter().map(|(_, path)| path).collect())
}
