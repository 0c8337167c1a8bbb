use crate::core::config::NameConfig;
use anyhow::{Context, Result, bail};
use glob::Pattern;
use log::{debug, warn};
use memchr::memmem;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Bytes of each file inspected for a content marker.
const HEAD_BYTES: usize = 64 * 1024;

/// How a module recognises its input files.
#[derive(Clone, Copy, Debug)]
pub struct SearchPattern {
    pub module: &'static str,
    pub fn_suffix: Option<&'static str>,
    pub contents: Option<&'static str>,
}

impl SearchPattern {
    pub fn matches(&self, file_name: &str, head: &[u8]) -> bool {
        if let Some(suffix) = self.fn_suffix
            && !file_name.ends_with(suffix)
        {
            return false;
        }
        if let Some(marker) = self.contents
            && memmem::find(head, marker.as_bytes()).is_none()
        {
            return false;
        }
        self.fn_suffix.is_some() || self.contents.is_some()
    }
}

/// A discovered input file together with its cleaned sample name.
#[derive(Clone, Debug)]
pub struct SampleFile {
    pub path: PathBuf,
    pub file_name: String,
    pub s_name: String,
    pub contents: String,
}

/// Expand the command line inputs into a sorted list of candidate files.
pub fn collect_candidates(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for input in inputs {
        if input.is_dir() {
            walk_dir(input, &mut out)
                .with_context(|| format!("failed to scan directory {}", input.display()))?;
        } else if input.is_file() {
            out.push(input.clone());
        } else {
            bail!("input not found: {}", input.display());
        }
    }
    out.sort();
    out.dedup();
    debug!("{} candidate files", out.len());
    Ok(out)
}

/// Symlinked files are followed; symlinked directories are not, so a link
/// cycle cannot repeat a subtree.
fn walk_dir(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = fs::read_dir(dir)?
        .map(|e| e.and_then(|e| Ok((e.path(), e.file_type()?))))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    for (path, file_type) in entries {
        if file_type.is_dir() {
            walk_dir(&path, out)?;
        } else if file_type.is_file() {
            out.push(path);
        } else if file_type.is_symlink() {
            if path.is_file() {
                out.push(path);
            } else if path.is_dir() {
                debug!("not following directory link {}", path.display());
            }
        }
    }
    Ok(())
}

/// Return every candidate matching `pattern`, read into memory.
pub fn find_files(
    candidates: &[PathBuf],
    pattern: &SearchPattern,
    names: &NameConfig,
    max_size: u64,
) -> Vec<SampleFile> {
    let mut found = Vec::new();
    for path in candidates {
        let file_name = match path.file_name().and_then(|s| s.to_str()) {
            Some(s) => s.to_string(),
            None => continue,
        };
        if let Some(suffix) = pattern.fn_suffix
            && !file_name.ends_with(suffix)
        {
            continue;
        }
        let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        if size > max_size {
            debug!(
                "{}: skipping {} ({} bytes exceeds limit)",
                pattern.module,
                path.display(),
                size
            );
            continue;
        }
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                warn!("{}: could not read {}: {}", pattern.module, path.display(), e);
                continue;
            }
        };
        let head = &bytes[..bytes.len().min(HEAD_BYTES)];
        if !pattern.matches(&file_name, head) {
            continue;
        }
        let contents = match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(_) => {
                warn!("{}: {} is not valid UTF-8, skipping", pattern.module, path.display());
                continue;
            }
        };
        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let s_name = clean_sample_name(&file_name, &root, names);
        debug!("{}: found {} ({})", pattern.module, path.display(), s_name);
        found.push(SampleFile {
            path: path.clone(),
            file_name,
            s_name,
            contents,
        });
    }
    found
}

const TRIM_CHARS: &[char] = &['.', ':', '_', '-', ' '];

/// Derive a sample name from a file name: truncate at the first occurrence of
/// each configured extension, then trim separators.
pub fn clean_sample_name(file_name: &str, root: &Path, cfg: &NameConfig) -> String {
    let mut name = file_name;
    for ext in &cfg.clean_exts {
        if ext.is_empty() {
            continue;
        }
        if let Some(pos) = name.find(ext.as_str()) {
            name = &name[..pos];
        }
    }
    let mut name = name.trim_matches(TRIM_CHARS).to_string();
    if name.is_empty() {
        name = file_name.to_string();
    }
    if cfg.prepend_dirs
        && let Some(dir) = root.file_name().and_then(|s| s.to_str())
    {
        name = format!("{} | {}", dir, name);
    }
    name
}

/// Compile `--ignore-samples` globs (`*`, `?`, `[...]`).
pub fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| Pattern::new(p).with_context(|| format!("invalid sample name pattern '{}'", p)))
        .collect()
}

pub fn is_ignored(s_name: &str, patterns: &[Pattern]) -> bool {
    patterns.iter().any(|p| p.matches(s_name))
}

/// Drop samples whose names match any ignore pattern.
pub fn ignore_samples<T>(data: BTreeMap<String, T>, patterns: &[Pattern]) -> BTreeMap<String, T> {
    if patterns.is_empty() {
        return data;
    }
    data.into_iter()
        .filter(|(s_name, _)| {
            let ignored = is_ignored(s_name, patterns);
            if ignored {
                debug!("ignoring sample {}", s_name);
            }
            !ignored
        })
        .collect()
}
