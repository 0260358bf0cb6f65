//! Passphrase statistics: lengths and reuse.
//!
//! The first line of a secret is its passphrase.  Secrets sharing the
//! same first line form one group; groups of two or more are reuse.

use std::collections::BTreeMap;

use serde::Serialize;
use zeroize::Zeroizing;

/// Secrets sharing one first line.
///
/// `length` is the character length of that shared line, stored once
/// per group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassphraseGroup {
    pub length: usize,
    pub secrets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub count: usize,
    pub sum_length: usize,
    pub max_length: usize,
    pub groups: Vec<PassphraseGroup>,
}

impl Statistics {
    /// Build statistics from `(secret name, first line)` pairs.
    ///
    /// Groups come out ordered by their first member name, members
    /// sorted by name; nothing about the passphrases themselves leaks
    /// through the ordering.
    pub fn from_first_lines(entries: Vec<(String, Zeroizing<String>)>) -> Self {
        let mut stats = Statistics::default();
        let mut by_line: Vec<(Zeroizing<String>, String)> = Vec::with_capacity(entries.len());

        for (name, first_line) in entries {
            let length = first_line.chars().count();
            stats.count += 1;
            stats.sum_length += length;
            stats.max_length = stats.max_length.max(length);
            by_line.push((first_line, name));
        }

        by_line.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));

        let mut current: Option<(Zeroizing<String>, PassphraseGroup)> = None;
        for (line, name) in by_line {
            match current.as_mut() {
                Some((shared, group)) if shared.as_str() == line.as_str() => {
                    group.secrets.push(name);
                }
                _ => {
                    if let Some((_, group)) = current.take() {
                        stats.groups.push(group);
                    }
                    let group = PassphraseGroup {
                        length: line.chars().count(),
                        secrets: vec![name],
                    };
                    current = Some((line, group));
                }
            }
        }
        if let Some((_, group)) = current {
            stats.groups.push(group);
        }

        for group in &mut stats.groups {
            group.secrets.sort();
        }
        stats.groups.sort_by(|a, b| a.secrets.cmp(&b.secrets));
        stats
    }

    /// Groups with more than one member.
    pub fn duplicates(&self) -> impl Iterator<Item = &PassphraseGroup> {
        self.groups.iter().filter(|g| g.secrets.len() > 1)
    }

    /// Number of secrets per first-line length.
    pub fn length_histogram(&self) -> BTreeMap<usize, usize> {
        let mut histogram = BTreeMap::new();
        for group in &self.groups {
            *histogram.entry(group.length).or_insert(0) += group.secrets.len();
        }
        histogram
    }

    /// Mean first-line length, `None` for an empty ward.
    pub fn average_length(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum_length as f64 / self.count as f64)
        }
    }
}

/// The text before the first `\n`, or all of it.
pub fn first_line(text: &str) -> &str {
    text.split('\n').next().unwrap_or_default()
}
