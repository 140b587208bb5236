use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub fn write_file<F: AsRef<Path> + ?Sized>(f: &F) -> io::Result<io::BufWriter<fs::File>> {
    Ok(io::BufWriter::new(fs::File::create(f)?))
}

pub fn make_sure_dir_exists<F: AsRef<Path> + ?Sized>(f: &F) -> io::Result<()> {
    let path = f.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Finds `name` inside `dir`, first exactly, then ignoring ASCII case.
pub fn find_file_ignore_case(dir: &Path, name: &str) -> Option<PathBuf> {
    let exact = dir.join(name);
    if exact.is_file() {
        return Some(exact);
    }
    let entries = fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|file| file.eq_ignore_ascii_case(name))
        {
            return Some(path);
        }
    }
    None
}

/// Makes a single path component safe to create on any platform.
pub fn sanitize_component(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        String::from("_")
    } else {
        trimmed.to_string()
    }
}

/// Turns a game-side logical path (either separator) into a relative path.
///
/// Empty, `.` and `..` segments are dropped so the result never leaves the
/// directory it is joined to.
pub fn sanitize_relative_path(logical: &str) -> PathBuf {
    logical
        .split(['\\', '/'])
        .map(str::trim)
        .filter(|seg| !seg.is_empty() && *seg != "." && *seg != "..")
        .map(sanitize_component)
        .collect()
}

#[test]
fn test_sanitize_relative_path() {
    assert_eq!(
        sanitize_relative_path("Monsters\\Wolf\\..\\Idle"),
        PathBuf::from("Monsters").join("Wolf").join("Idle")
    );
    assert_eq!(sanitize_relative_path("\\\\"), PathBuf::new());
    assert_eq!(sanitize_relative_path("a/b:c"), PathBuf::from("a").join("b_c"));
}

#[test]
fn test_sanitize_component() {
    assert_eq!(sanitize_component("Wolf02-a (shadow)"), "Wolf02-a (shadow)");
    assert_eq!(sanitize_component("a?b*"), "a_b_");
    assert_eq!(sanitize_component(".."), "_");
    assert_eq!(sanitize_component(""), "_");
}
