//! Measurement histograms.

use std::collections::BTreeMap;
use std::fmt;

/// Occurrences of measured basis states over `num_wires` wires.
///
/// Keys are basis indices with wire `i` as bit `i`. Bitstrings are printed
/// highest wire first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Counts {
    num_wires: usize,
    counts: BTreeMap<usize, usize>,
}

impl Counts {
    pub fn new(num_wires: usize) -> Self {
        Self {
            num_wires,
            counts: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, index: usize) {
        *self.counts.entry(index).or_insert(0) += 1;
    }

    pub fn num_wires(&self) -> usize {
        self.num_wires
    }

    pub fn get(&self, index: usize) -> usize {
        self.counts.get(&index).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.counts.iter().map(|(&k, &v)| (k, v))
    }

    /// Most frequent outcome, lowest index on ties.
    pub fn most_frequent(&self) -> Option<usize> {
        self.counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(&k, _)| k)
    }

    /// Relative frequency of `index`.
    pub fn frequency(&self, index: usize) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.get(index) as f64 / total as f64,
        }
    }

    /// Keep only outcomes where `wire` reads `bit`.
    pub fn post_select(&self, wire: usize, bit: bool) -> Counts {
        Counts {
            num_wires: self.num_wires,
            counts: self
                .counts
                .iter()
                .filter(|&(&k, _)| ((k >> wire) & 1 == 1) == bit)
                .map(|(&k, &v)| (k, v))
                .collect(),
        }
    }

    /// Histogram over `wires` alone; `wires[j]` becomes bit `j`.
    pub fn marginal(&self, wires: &[usize]) -> Counts {
        let mut marginal = Counts::new(wires.len());
        for (&k, &v) in &self.counts {
            let index = wires
                .iter()
                .enumerate()
                .fold(0, |acc, (j, &w)| acc | (((k >> w) & 1) << j));
            *marginal.counts.entry(index).or_insert(0) += v;
        }
        marginal
    }

    pub fn bitstring(&self, index: usize) -> String {
        format!("{:0width$b}", index, width = self.num_wires)
    }
}

impl fmt::Display for Counts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (&k, &v) in &self.counts {
            writeln!(f, "{}: {}", self.bitstring(k), v)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Counts {
        let mut counts = Counts::new(3);
        for (index, n) in [(0b000, 5), (0b101, 3), (0b100, 2), (0b011, 1)] {
            for _ in 0..n {
                counts.record(index);
            }
        }
        counts
    }

    #[test]
    fn test_post_select_and_marginal() {
        let counts = sample();
        assert_eq!(counts.total(), 11);

        let selected = counts.post_select(2, true);
        assert_eq!(selected.total(), 5);
        assert_eq!(selected.get(0b101), 3);

        let marginal = selected.marginal(&[0, 1]);
        assert_eq!(marginal.num_wires(), 2);
        assert_eq!(marginal.get(0b01), 3);
        assert_eq!(marginal.get(0b00), 2);
        assert_eq!(marginal.frequency(0b01), 0.6);
    }

    #[test]
    fn test_display_and_mode() {
        let counts = sample();
        assert_eq!(counts.most_frequent(), Some(0));
        let text = counts.to_string();
        assert!(text.starts_with("000: 5\n"));
        assert!(text.contains("101: 3\n"));
        assert_eq!(Counts::new(2).frequency(1), 0.0);
    }
}
