use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use semver::Version;

/// Strict-weak-ordering predicate over two version strings.
///
/// The default is case-insensitive natural ordering: runs of digits compare
/// by numeric value, so `"2.9"` sorts before `"2.10"`. Any two strings are
/// comparable; there is no failure state.
#[derive(Clone)]
pub struct VersionComparator(Arc<dyn Fn(&str, &str) -> bool + Send + Sync>);

impl VersionComparator {
    /// Case-insensitive, numeric-aware comparison.
    #[must_use]
    pub fn natural() -> Self {
        Self(Arc::new(|a, b| natural_order(a, b) == Ordering::Less))
    }

    /// Semver comparison with lenient parsing (`1.2` is widened to `1.2.0`).
    /// Strings that still fail to parse fall back to natural ordering.
    #[must_use]
    pub fn lenient_semver() -> Self {
        Self(Arc::new(|a, b| match (parse_semver(a), parse_semver(b)) {
            (Some(a), Some(b)) => a < b,
            _ => natural_order(a, b) == Ordering::Less,
        }))
    }

    /// Wrap a caller-supplied `less_than` predicate.
    pub fn custom(less_than: impl Fn(&str, &str) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(less_than))
    }

    #[must_use]
    pub fn less_than(&self, a: &str, b: &str) -> bool {
        (self.0)(a, b)
    }
}

impl Default for VersionComparator {
    fn default() -> Self {
        Self::natural()
    }
}

impl fmt::Debug for VersionComparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VersionComparator(..)")
    }
}

fn natural_order(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();

    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let ordering = compare_digit_runs(&mut a, &mut b);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(x), Some(y)) => {
                let ordering = x.to_ascii_lowercase().cmp(&y.to_ascii_lowercase());
                if ordering != Ordering::Equal {
                    return ordering;
                }
                a.next();
                b.next();
            }
        }
    }
}

fn compare_digit_runs(
    a: &mut std::iter::Peekable<std::str::Chars<'_>>,
    b: &mut std::iter::Peekable<std::str::Chars<'_>>,
) -> Ordering {
    let run_a = take_digit_run(a);
    let run_b = take_digit_run(b);

    let trimmed_a = run_a.trim_start_matches('0');
    let trimmed_b = run_b.trim_start_matches('0');

    // Compare by magnitude without parsing, so arbitrarily long runs work.
    trimmed_a
        .len()
        .cmp(&trimmed_b.len())
        .then_with(|| trimmed_a.cmp(trimmed_b))
}

fn take_digit_run(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(&ch) = chars.peek() {
        if !ch.is_ascii_digit() {
            break;
        }
        run.push(ch);
        chars.next();
    }
    run
}

fn parse_semver(version: &str) -> Option<Version> {
    if let Ok(parsed) = Version::parse(version) {
        return Some(parsed);
    }

    let (core, suffix) = split_semver_core_and_suffix(version);
    let mut parts = core.split('.');
    let major = parts.next()?.parse::<u64>().ok()?;
    let minor = parts.next().and_then(|part| part.parse::<u64>().ok());
    let patch = parts.next().and_then(|part| part.parse::<u64>().ok());

    if parts.next().is_some() {
        return None;
    }

    let normalized = match (minor, patch) {
        (None, None) => format!("{major}.0.0{suffix}"),
        (Some(minor), None) => format!("{major}.{minor}.0{suffix}"),
        (Some(minor), Some(patch)) => format!("{major}.{minor}.{patch}{suffix}"),
        (None, Some(_)) => return None,
    };

    Version::parse(&normalized).ok()
}

fn split_semver_core_and_suffix(version: &str) -> (&str, &str) {
    let suffix_idx = version.find(['-', '+']).unwrap_or(version.len());
    (&version[..suffix_idx], &version[suffix_idx..])
}
